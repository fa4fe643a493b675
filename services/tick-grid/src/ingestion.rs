//! Ingestion path for book updates
//!
//! `GridDriver` owns one instrument's book mirror, engine and projector.
//! Updates are applied strictly in sequence order, each one producing
//! exactly one `recalculate`, run to completion before the next update is
//! looked at. Taking `&mut self` is what keeps the engine from being
//! re-entered; hosts that share a driver across threads wrap it in a
//! mutex themselves.
//!
//! An update is written into the book in place; if the engine then rejects
//! the resulting observation the overwritten levels are restored, so a
//! rejected update changes neither the book nor the grid.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use types::errors::GridError;

use crate::config::{GridConfig, ProjectorConfig};
use crate::engine::{EnginePhase, Recalculation, TickGridEngine};
use crate::events::{BookUpdate, BookUpdatePayload};
use crate::metrics::GridMetrics;
use crate::order_book::OrderBook;
use crate::projector::{Frame, FrameProjector};

/// Errors that can occur while ingesting an update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestionError {
    #[error("stale update: last={last}, received={received}")]
    Stale { last: u64, received: u64 },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Drives one instrument from feed updates to render frames.
pub struct GridDriver {
    book: OrderBook,
    engine: TickGridEngine,
    projector: FrameProjector,
    metrics: Arc<GridMetrics>,
    /// Last accepted sequence number.
    last_sequence: Option<u64>,
}

impl GridDriver {
    pub fn new(grid: GridConfig, projector: ProjectorConfig) -> Result<Self, GridError> {
        let engine = TickGridEngine::with_config(grid)?;
        let projector = FrameProjector::new(projector)?;
        Ok(Self {
            book: OrderBook::new(),
            engine,
            projector,
            metrics: Arc::new(GridMetrics::new()),
            last_sequence: None,
        })
    }

    /// Apply one update and append its row to the grid.
    pub fn ingest(&mut self, update: &BookUpdate) -> Result<Recalculation, IngestionError> {
        let seq = update.sequence;
        if let Some(last) = self.last_sequence {
            if seq <= last {
                warn!(
                    last_sequence = last,
                    received_sequence = seq,
                    "Stale book update dropped"
                );
                self.metrics.record_rejected();
                return Err(IngestionError::Stale { last, received: seq });
            }
        }

        let started = Instant::now();
        let applied = match &update.payload {
            BookUpdatePayload::Snapshot { bids, asks } => self.book.apply_snapshot(bids, asks),
            BookUpdatePayload::Levels { changes } => self.book.apply_changes(changes),
        };
        let outcome = applied.and_then(|rollback| {
            self.engine
                .recalculate(self.book.observation())
                .map_err(|err| {
                    self.book.rollback(rollback);
                    err
                })
        });
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    sequence = seq,
                    update_type = update.update_type_label(),
                    error = %err,
                    "Book update rejected"
                );
                self.metrics.record_rejected();
                return Err(err.into());
            }
        };

        self.last_sequence = Some(seq);
        let elapsed = started.elapsed().as_nanos() as u64;
        self.metrics.record_observation(elapsed, outcome.calibrated_now);

        debug!(
            sequence = seq,
            update_type = update.update_type_label(),
            mid_price = %outcome.mid_price,
            elapsed_ns = elapsed,
            "Book update ingested"
        );
        Ok(outcome)
    }

    /// Project the current grid for the renderer.
    pub fn frame(&self) -> Result<Frame, GridError> {
        let frame = self.projector.frame(self.engine.state()?);
        self.metrics.record_frame();
        Ok(frame)
    }

    /// Switch instrument or grid shape: clears the book and all history.
    pub fn reconfigure(&mut self, grid: GridConfig) -> Result<(), GridError> {
        self.engine.configure(grid)?;
        self.book.clear();
        self.last_sequence = None;
        info!("Grid driver reconfigured");
        Ok(())
    }

    /// Switch between cumulative and per-tick rows.
    pub fn set_cumulative(&mut self, cumulative: bool) -> Result<(), GridError> {
        self.engine.set_cumulative(cumulative)
    }

    /// Drop calibration and history, keeping the book and sequence position.
    pub fn reset(&mut self) -> Result<(), GridError> {
        self.engine.reset()
    }

    pub fn engine(&self) -> &TickGridEngine {
        &self.engine
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn phase(&self) -> EnginePhase {
        self.engine.phase()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Shared handle for an exporter.
    pub fn metrics(&self) -> Arc<GridMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_book::LevelChange;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use types::book::PriceLevel;
    use types::side::Side;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn driver() -> GridDriver {
        GridDriver::new(
            GridConfig::new(d("0.5"), 3, 4, true),
            ProjectorConfig::default(),
        )
        .unwrap()
    }

    fn snapshot(seq: u64, bid: &str, ask: &str) -> BookUpdate {
        BookUpdate::snapshot(
            seq,
            0,
            vec![PriceLevel::new(d(bid), d("2"))],
            vec![PriceLevel::new(d(ask), d("2"))],
        )
    }

    #[test]
    fn test_sequential_ingestion() {
        let mut driver = driver();
        for seq in 1..=6 {
            driver.ingest(&snapshot(seq, "100", "100.5")).unwrap();
        }

        assert_eq!(driver.last_sequence(), Some(6));
        assert_eq!(driver.phase(), EnginePhase::Calibrated);
        let state = driver.engine().state().unwrap();
        assert_eq!(state.rows().len(), 4);
        assert_eq!(driver.metrics().export()["observations_processed"], 6);
        assert_eq!(driver.metrics().export()["calibrations"], 1);
    }

    #[test]
    fn test_stale_update_rejected() {
        let mut driver = driver();
        driver.ingest(&snapshot(5, "100", "100.5")).unwrap();

        let err = driver.ingest(&snapshot(5, "101", "101.5")).unwrap_err();
        assert_eq!(err, IngestionError::Stale { last: 5, received: 5 });

        let err = driver.ingest(&snapshot(3, "101", "101.5")).unwrap_err();
        assert_eq!(err, IngestionError::Stale { last: 5, received: 3 });

        assert_eq!(driver.book().best_bid(), Some(d("100")));
        assert_eq!(driver.engine().state().unwrap().rows().len(), 1);
        assert_eq!(driver.metrics().export()["observations_rejected"], 2);
    }

    #[test]
    fn test_sequence_gaps_are_accepted() {
        let mut driver = driver();
        driver.ingest(&snapshot(1, "100", "100.5")).unwrap();
        driver.ingest(&snapshot(10, "100", "100.5")).unwrap();
        assert_eq!(driver.last_sequence(), Some(10));
    }

    #[test]
    fn test_level_updates_apply_to_mirror() {
        let mut driver = driver();
        driver.ingest(&snapshot(1, "100", "100.5")).unwrap();

        let outcome = driver
            .ingest(&BookUpdate::levels(
                2,
                0,
                vec![
                    LevelChange { side: Side::Sell, price: d("100.5"), size: Decimal::ZERO },
                    LevelChange { side: Side::Sell, price: d("101.5"), size: d("4") },
                    LevelChange { side: Side::Buy, price: d("101"), size: d("1") },
                ],
            ))
            .unwrap();

        assert_eq!(driver.book().best_bid(), Some(d("101")));
        assert_eq!(driver.book().best_ask(), Some(d("101.5")));
        // (101 + 101.5) / 2 = 101.25, rounded down to the tick
        assert_eq!(outcome.mid_price, d("101"));
    }

    #[test]
    fn test_invalid_update_changes_nothing() {
        let mut driver = driver();
        driver.ingest(&snapshot(1, "100", "100.5")).unwrap();
        let rows_before = driver.engine().state().unwrap().clone();

        let bad = BookUpdate::levels(
            2,
            0,
            vec![
                LevelChange { side: Side::Buy, price: d("100.5"), size: d("9") },
                LevelChange { side: Side::Sell, price: d("101"), size: d("-1") },
            ],
        );
        let err = driver.ingest(&bad).unwrap_err();

        assert!(matches!(
            err,
            IngestionError::Grid(GridError::InvalidObservation { .. })
        ));
        assert_eq!(driver.book().best_bid(), Some(d("100")));
        assert_eq!(driver.last_sequence(), Some(1));
        assert_eq!(driver.engine().state().unwrap(), &rows_before);

        // The same sequence number can be retried once corrected
        driver.ingest(&snapshot(2, "100", "100.5")).unwrap();
    }

    #[test]
    fn test_engine_rejection_restores_book() {
        let mut driver = driver();
        // Scaling factor becomes 1e19
        driver
            .ingest(&BookUpdate::snapshot(
                1,
                0,
                vec![PriceLevel::new(d("100"), d("0.0000000000000000001"))],
                vec![],
            ))
            .unwrap();
        let book_before = driver.book().observation().clone();
        let state_before = driver.engine().state().unwrap().clone();

        let oversized = BookUpdate::levels(
            2,
            0,
            vec![
                LevelChange { side: Side::Buy, price: d("100"), size: d("100000000000") },
                LevelChange { side: Side::Sell, price: d("100.5"), size: d("1") },
            ],
        );
        let err = driver.ingest(&oversized).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::Grid(GridError::InvalidObservation { .. })
        ));
        assert_eq!(driver.book().observation(), &book_before);
        assert_eq!(driver.book().best_ask(), None);

        let oversized = BookUpdate::snapshot(
            3,
            0,
            vec![PriceLevel::new(d("99"), d("100000000000"))],
            vec![],
        );
        assert!(driver.ingest(&oversized).is_err());
        assert_eq!(driver.book().observation(), &book_before);
        assert_eq!(driver.book().best_bid(), Some(d("100")));

        assert_eq!(driver.engine().state().unwrap(), &state_before);
        assert_eq!(driver.last_sequence(), Some(1));
        assert_eq!(driver.metrics().export()["observations_rejected"], 2);
    }

    #[test]
    fn test_frame() {
        let mut driver = driver();
        driver.ingest(&snapshot(1, "100", "100.5")).unwrap();

        let frame = driver.frame().unwrap();
        assert_eq!(frame.mid_price, Some(d("100")));
        assert_eq!(frame.cells.len(), 6);
        assert_eq!(driver.metrics().export()["frames_projected"], 1);
    }

    #[test]
    fn test_reconfigure_clears_everything() {
        let mut driver = driver();
        driver.ingest(&snapshot(7, "100", "100.5")).unwrap();

        driver
            .reconfigure(GridConfig::new(d("0.25"), 4, 8, false))
            .unwrap();

        assert_eq!(driver.phase(), EnginePhase::Configured);
        assert!(driver.book().observation().is_empty());
        assert_eq!(driver.last_sequence(), None);
        // Sequence numbering restarts with the new instrument
        driver.ingest(&snapshot(1, "100", "100.25")).unwrap();
        assert_eq!(driver.engine().state().unwrap().config().row_width(), 8);
    }

    #[test]
    fn test_reconfigure_rejects_invalid_config() {
        let mut driver = driver();
        driver.ingest(&snapshot(1, "100", "100.5")).unwrap();

        assert!(driver
            .reconfigure(GridConfig::new(d("0.5"), 0, 8, true))
            .is_err());
        assert_eq!(driver.phase(), EnginePhase::Calibrated);
        assert_eq!(driver.last_sequence(), Some(1));
    }

    #[test]
    fn test_reset_keeps_book() {
        let mut driver = driver();
        driver.ingest(&snapshot(1, "100", "100.5")).unwrap();
        driver.reset().unwrap();

        assert_eq!(driver.phase(), EnginePhase::Configured);
        assert_eq!(driver.book().best_bid(), Some(d("100")));

        driver.set_cumulative(false).unwrap();
        driver.ingest(&snapshot(2, "100", "100.5")).unwrap();
        assert_eq!(driver.phase(), EnginePhase::Calibrated);
    }
}
