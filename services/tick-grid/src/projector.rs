//! Frame projection
//!
//! Reads the engine state and emits one placement per populated grid cell.
//! Each history row is shifted horizontally by whole ticks so that cells
//! representing the same absolute price line up with the current row,
//! however far the mid-price has drifted since that row was recorded.
//!
//! Projection is a pure read of `EngineState`: it can run at any cadence,
//! any number of times, and repeated calls on unchanged state produce
//! identical frames.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::errors::GridError;
use types::numeric::{round_half_up, round_to_precision};
use types::side::Side;

use crate::config::ProjectorConfig;
use crate::engine::EngineState;

/// Colour classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellColor {
    /// Zero size. The renderer draws a negligible, non-degenerate bar.
    Empty,
    Buy,
    Sell,
}

impl From<Side> for CellColor {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => CellColor::Buy,
            Side::Sell => CellColor::Sell,
        }
    }
}

/// Render-ready placement of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFrame {
    /// History row, 0 = most recent.
    pub row: usize,
    /// Tick column within the row.
    pub column: usize,
    /// Drift compensation applied to the whole row.
    pub horizontal_offset: Decimal,
    /// Bar centre along the price axis, drift included.
    pub x: Decimal,
    /// Bar position along the time axis.
    pub z: Decimal,
    /// Scaled size; exactly zero for empty cells.
    pub height: Decimal,
    pub color: CellColor,
}

/// Text label on the price axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLabel {
    pub price: Decimal,
    pub x: Decimal,
    pub text: String,
    /// The label sitting on the current mid-price.
    pub is_mid: bool,
}

/// Everything a renderer needs for one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub mid_price: Option<Decimal>,
    pub cells: Vec<CellFrame>,
    pub labels: Vec<PriceLabel>,
}

impl Frame {
    /// Export as JSON for a renderer in another process.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Projects engine state into cell placements.
#[derive(Debug, Clone, Default)]
pub struct FrameProjector {
    config: ProjectorConfig,
}

impl FrameProjector {
    pub fn new(config: ProjectorConfig) -> Result<Self, GridError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Shift for `row`: `round((history[row] − history[0]) / tick) · level_width`.
    ///
    /// A row whose mid sat above the current mid moves right, one level per tick.
    pub fn horizontal_offset(&self, state: &EngineState, row: usize) -> Decimal {
        let history = state.price_history();
        let (Some(current), Some(past)) = (history.get(0), history.get(row)) else {
            return Decimal::ZERO;
        };
        let offset = past
            .checked_sub(*current)
            .and_then(|drift| drift.checked_div(state.config().tick_size))
            .and_then(|ticks| round_half_up(ticks, 0).checked_mul(self.config.level_width));
        match offset {
            Some(offset) => offset,
            None => {
                warn!(
                    row,
                    past_mid = %past,
                    current_mid = %current,
                    "Row drift not representable, leaving row unshifted"
                );
                Decimal::ZERO
            }
        }
    }

    /// One `CellFrame` per populated `(row, column)`, newest row first.
    pub fn project(&self, state: &EngineState) -> Vec<CellFrame> {
        let num_ticks = state.config().num_ticks as i64;
        let level_width = self.config.level_width;
        let level_depth = self.config.level_depth;

        let mut cells = Vec::with_capacity(state.rows().len() * state.config().row_width());
        for (row_index, row) in state.rows().iter().enumerate() {
            let horizontal_offset = self.horizontal_offset(state, row_index);
            let z = Decimal::ZERO - Decimal::from(row_index) * level_depth;

            for (column, (height, side)) in row.sizes.iter().zip(&row.sides).enumerate() {
                let color = if height.is_zero() {
                    CellColor::Empty
                } else {
                    CellColor::from(*side)
                };
                cells.push(CellFrame {
                    row: row_index,
                    column,
                    horizontal_offset,
                    x: horizontal_offset + Decimal::from(column as i64 - num_ticks) * level_width,
                    z,
                    height: *height,
                    color,
                });
            }
        }

        debug!(
            rows = state.rows().len(),
            cells = cells.len(),
            "Frame projected"
        );
        cells
    }

    /// Price-axis labels every `ticks_per_label` ticks around the current mid.
    pub fn labels(&self, state: &EngineState) -> Vec<PriceLabel> {
        let Some(mid) = state.mid_price() else {
            return Vec::new();
        };
        let precision = state.precision();
        let ticks_per_label = Decimal::from(self.config.ticks_per_label);
        let per_side = (state.config().num_ticks / self.config.ticks_per_label) as i64;
        let label_step = ticks_per_label * state.config().tick_size;

        (-per_side..=per_side)
            .map(|k| {
                let steps = Decimal::from(k);
                let price = round_to_precision(mid + steps * label_step, precision);
                PriceLabel {
                    price,
                    x: steps * self.config.level_width * ticks_per_label,
                    text: format!("{:.*}", precision as usize, price),
                    is_mid: k == 0,
                }
            })
            .collect()
    }

    /// Cells, labels and current mid in one bundle.
    pub fn frame(&self, state: &EngineState) -> Frame {
        Frame {
            mid_price: state.mid_price(),
            cells: self.project(state),
            labels: self.labels(state),
        }
    }
}
