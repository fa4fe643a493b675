//! Tick-grid aggregation engine
//!
//! Turns each book observation into one tick-aligned row of scaled sizes
//! centred on the current mid-price and prepends it to a bounded history.
//!
//! Lifecycle:
//! `Uninitialized → Configured → Calibrating → Calibrated`
//!
//! - `configure` validates a `GridConfig` and installs fresh state.
//! - The first observation carrying any nonzero size fixes the scaling
//!   factor at `1 / mean(nonzero sizes)` and backfills the price history
//!   with that mid-price. The factor is never recalibrated afterwards, so
//!   bar heights stay comparable across the whole history.
//! - `reset` drops calibration and all history but keeps the config.
//!
//! `recalculate` validates and computes everything before touching state,
//! so a rejected observation leaves the engine exactly as it was.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::book::BookObservation;
use types::errors::GridError;
use types::numeric::{infer_precision, round_down_to_tick, round_to_precision};
use types::side::Side;

use crate::config::GridConfig;
use crate::history::RingHistory;

/// Visible lifecycle phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnginePhase {
    /// `configure` has never succeeded.
    Uninitialized,
    /// Configured (or reset) and no observation seen since.
    Configured,
    /// Observations seen, none of them with a nonzero size yet.
    Calibrating,
    /// Scaling factor fixed.
    Calibrated,
}

/// One observation's snapshot across all tick offsets.
///
/// Columns `0..num_ticks` are buy ticks (furthest from mid first), columns
/// `num_ticks..2·num_ticks` are sell ticks (closest to mid first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub sizes: Vec<Decimal>,
    pub sides: Vec<Side>,
}

impl GridRow {
    /// Row of zero sizes on the buy side.
    pub fn empty(width: usize) -> Self {
        Self {
            sizes: vec![Decimal::ZERO; width],
            sides: vec![Side::Buy; width],
        }
    }

    pub fn width(&self) -> usize {
        self.sizes.len()
    }
}

/// What a successful `recalculate` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recalculation {
    /// Mid-price the new row is centred on.
    pub mid_price: Decimal,
    /// True only on the call that fixed the scaling factor.
    pub calibrated_now: bool,
}

/// Rolling state owned by the engine. Read-only outside this module.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    config: GridConfig,
    precision: u32,
    scaling_factor: Decimal,
    calibrated: bool,
    observations: u64,
    price_history: RingHistory<Decimal>,
    rows: RingHistory<GridRow>,
}

impl EngineState {
    fn new(config: GridConfig) -> Self {
        let precision = infer_precision(config.tick_size);
        let depth = config.depth;
        Self {
            config,
            precision,
            scaling_factor: Decimal::ONE,
            calibrated: false,
            observations: 0,
            price_history: RingHistory::new(depth),
            rows: RingHistory::new(depth),
        }
    }

    fn clear(&mut self) {
        self.scaling_factor = Decimal::ONE;
        self.calibrated = false;
        self.observations = 0;
        self.price_history.clear();
        self.rows.clear();
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Fractional digits every derived price is rounded to.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scaling_factor(&self) -> Decimal {
        self.scaling_factor
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Observations ingested since the last configure or reset.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Mid-prices, newest first.
    pub fn price_history(&self) -> &RingHistory<Decimal> {
        &self.price_history
    }

    /// Grid rows, newest first.
    pub fn rows(&self) -> &RingHistory<GridRow> {
        &self.rows
    }

    /// Current mid-price, if any observation has been ingested.
    pub fn mid_price(&self) -> Option<Decimal> {
        self.price_history.newest().copied()
    }

    /// Scaled size at `(row, column)`; zero where no row has been written.
    pub fn size_at(&self, row: usize, column: usize) -> Decimal {
        self.rows
            .get(row)
            .and_then(|r| r.sizes.get(column))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Side at `(row, column)`; `Buy` where no row has been written.
    pub fn side_at(&self, row: usize, column: usize) -> Side {
        self.rows
            .get(row)
            .and_then(|r| r.sides.get(column))
            .copied()
            .unwrap_or_default()
    }

    /// Scaled sizes, newest row first.
    pub fn size_matrix(&self) -> Vec<Vec<Decimal>> {
        self.rows.iter().map(|row| row.sizes.clone()).collect()
    }

    /// Sides, newest row first.
    pub fn side_matrix(&self) -> Vec<Vec<Side>> {
        self.rows.iter().map(|row| row.sides.clone()).collect()
    }

    pub fn phase(&self) -> EnginePhase {
        if self.calibrated {
            EnginePhase::Calibrated
        } else if self.observations == 0 {
            EnginePhase::Configured
        } else {
            EnginePhase::Calibrating
        }
    }

    /// Mid-price for an observation.
    ///
    /// Always rounded down to a tick: best bid and ask can sit one tick
    /// apart and there is no cell halfway between them.
    fn mid_price_for(&self, observation: &BookObservation) -> Result<Decimal, GridError> {
        let tick = self.config.tick_size;
        match (observation.best_bid(), observation.best_ask()) {
            (None, None) => Ok(Decimal::ZERO),
            (Some(bid), None) => Ok(bid),
            (None, Some(ask)) => ask.checked_sub(tick).ok_or_else(|| overflow("mid-price")),
            (Some(bid), Some(ask)) => {
                let mid = bid
                    .checked_add(ask)
                    .map(|sum| sum / Decimal::TWO)
                    .ok_or_else(|| overflow("mid-price"))?;
                Ok(round_to_precision(round_down_to_tick(tick, mid), self.precision))
            }
        }
    }

    /// Price `offset` ticks away from `mid`, rounded to the grid precision.
    fn price_at(&self, mid: Decimal, offset: i64) -> Result<Decimal, GridError> {
        Decimal::from(offset)
            .checked_mul(self.config.tick_size)
            .and_then(|delta| mid.checked_add(delta))
            .map(|price| round_to_precision(price, self.precision))
            .ok_or_else(|| overflow("tick price"))
    }

    /// `1 / mean(nonzero sizes)`, or `None` when the observation has no size at all.
    fn scaling_factor_for(observation: &BookObservation) -> Result<Option<Decimal>, GridError> {
        let mut total = Decimal::ZERO;
        let mut count: u64 = 0;
        for size in observation.nonzero_sizes() {
            total = total
                .checked_add(size)
                .ok_or_else(|| overflow("total size"))?;
            count += 1;
        }
        if count == 0 {
            return Ok(None);
        }
        let mean = total / Decimal::from(count);
        Decimal::ONE
            .checked_div(mean)
            .map(Some)
            .ok_or_else(|| GridError::invalid_observation(format!("cannot scale mean size {mean}")))
    }

    fn cumulative_row(
        &self,
        observation: &BookObservation,
        mid: Decimal,
        scaling: Decimal,
    ) -> Result<GridRow, GridError> {
        let n = self.config.num_ticks;
        let mut row = GridRow::empty(self.config.row_width());

        let mut cum_bid = Decimal::ZERO;
        let mut cum_ask = Decimal::ZERO;
        for i in 0..n {
            let bid_price = self.price_at(mid, -(i as i64))?;
            let ask_price = self.price_at(mid, i as i64 + 1)?;
            cum_bid = cum_bid
                .checked_add(observation.size_at(Side::Buy, bid_price))
                .ok_or_else(|| overflow("cumulative bid size"))?;
            cum_ask = cum_ask
                .checked_add(observation.size_at(Side::Sell, ask_price))
                .ok_or_else(|| overflow("cumulative ask size"))?;

            row.sizes[n - 1 - i] = scaled(scaling, cum_bid)?;
            row.sides[n - 1 - i] = Side::Buy;
            row.sizes[n + i] = scaled(scaling, cum_ask)?;
            row.sides[n + i] = Side::Sell;
        }
        Ok(row)
    }

    fn per_tick_row(
        &self,
        observation: &BookObservation,
        mid: Decimal,
        scaling: Decimal,
    ) -> Result<GridRow, GridError> {
        let n = self.config.num_ticks as i64;
        let mut row = GridRow::empty(self.config.row_width());

        for (column, offset) in (-n..n).enumerate() {
            let price = self.price_at(mid, offset)?;
            // Bid and ask prices are assumed never to overlap; a bid wins if they do.
            let bid_size = observation.size_at(Side::Buy, price);
            let size = if bid_size.is_zero() {
                observation.size_at(Side::Sell, price)
            } else {
                bid_size
            };
            row.sizes[column] = scaled(scaling, size)?;
            row.sides[column] = if offset <= 0 { Side::Buy } else { Side::Sell };
        }
        Ok(row)
    }

    fn apply(&mut self, observation: &BookObservation) -> Result<Recalculation, GridError> {
        observation.validate()?;

        let mid = self.mid_price_for(observation)?;
        let calibration = if self.calibrated {
            None
        } else {
            Self::scaling_factor_for(observation)?
        };
        let scaling = calibration.unwrap_or(self.scaling_factor);

        let row = if self.config.cumulative {
            self.cumulative_row(observation, mid, scaling)?
        } else {
            self.per_tick_row(observation, mid, scaling)?
        };

        // Nothing below can fail
        if let Some(factor) = calibration {
            self.scaling_factor = factor;
            self.calibrated = true;
            self.price_history.fill(mid);
            info!(
                scaling_factor = %factor,
                mid_price = %mid,
                depth = self.config.depth,
                "Scaling factor calibrated"
            );
        }
        self.price_history.push(mid);
        self.rows.push(row);
        self.observations += 1;

        Ok(Recalculation {
            mid_price: mid,
            calibrated_now: calibration.is_some(),
        })
    }
}

fn overflow(what: &str) -> GridError {
    GridError::invalid_observation(format!("{what} overflows"))
}

/// Size after applying the frozen scaling factor.
fn scaled(scaling: Decimal, size: Decimal) -> Result<Decimal, GridError> {
    scaling
        .checked_mul(size)
        .ok_or_else(|| overflow(&format!("scaled size {size}")))
}

/// Owns the rolling state and exposes the configure/reset/recalculate contract.
#[derive(Debug, Clone, Default)]
pub struct TickGridEngine {
    state: Option<EngineState>,
}

impl TickGridEngine {
    /// Create an unconfigured engine.
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Create and configure in one step.
    pub fn with_config(config: GridConfig) -> Result<Self, GridError> {
        let mut engine = Self::new();
        engine.configure(config)?;
        Ok(engine)
    }

    /// Install a validated configuration with fresh, uncalibrated state.
    ///
    /// On error the previous configuration and state are kept.
    pub fn configure(&mut self, config: GridConfig) -> Result<(), GridError> {
        if let Err(err) = config.validate() {
            warn!(error = %err, "Rejected grid configuration");
            return Err(err);
        }
        let state = EngineState::new(config);
        info!(
            tick_size = %state.config.tick_size,
            precision = state.precision,
            num_ticks = state.config.num_ticks,
            depth = state.config.depth,
            cumulative = state.config.cumulative,
            "Tick grid configured"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Switch between cumulative and per-tick rows. Existing rows are kept.
    pub fn set_cumulative(&mut self, cumulative: bool) -> Result<(), GridError> {
        let state = self.state.as_mut().ok_or(GridError::NotConfigured)?;
        state.config.cumulative = cumulative;
        debug!(cumulative, "Aggregation mode changed");
        Ok(())
    }

    /// Drop calibration and all history, keeping the configuration.
    pub fn reset(&mut self) -> Result<(), GridError> {
        let state = self.state.as_mut().ok_or(GridError::NotConfigured)?;
        state.clear();
        info!("Tick grid reset");
        Ok(())
    }

    /// Ingest one observation and prepend its row to the history.
    pub fn recalculate(&mut self, observation: &BookObservation) -> Result<Recalculation, GridError> {
        let state = self.state.as_mut().ok_or(GridError::NotConfigured)?;
        match state.apply(observation) {
            Ok(outcome) => {
                debug!(
                    mid_price = %outcome.mid_price,
                    rows = state.rows.len(),
                    observations = state.observations,
                    "Row recalculated"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "Rejected book observation");
                Err(err)
            }
        }
    }

    pub fn state(&self) -> Result<&EngineState, GridError> {
        self.state.as_ref().ok_or(GridError::NotConfigured)
    }

    pub fn phase(&self) -> EnginePhase {
        self.state
            .as_ref()
            .map_or(EnginePhase::Uninitialized, EngineState::phase)
    }
}


// ── Property-Based Tests ────────────────────────────────────────────
