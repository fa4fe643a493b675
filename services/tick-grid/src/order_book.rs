//! In-memory order book state
//!
//! Mirrors one already-merged book from a feed that reports the absolute
//! resting size per price. Uses `BTreeMap` (inside `BookObservation`) for
//! sorted iteration and O(log n) best-price and point lookups.
//!
//! A level update with size zero removes the level. Negative sizes are
//! rejected before anything is written, so a bad update never leaves the
//! book half-applied.

use rust_decimal::Decimal;
use types::book::{BookObservation, PriceLevel};
use types::errors::GridError;
use types::side::Side;

/// One absolute-size change to a single price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LevelChange {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// Book contents an update overwrote, enough to undo it.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback {
    /// Previous size of every touched level, in undo order.
    Levels(Vec<LevelChange>),
    /// The whole book a snapshot replaced.
    Snapshot(BookObservation),
}

/// Order book mirror for a single instrument.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    levels: BookObservation,
    /// Current best bid price.
    best_bid: Option<Decimal>,
    /// Current best ask price.
    best_ask: Option<Decimal>,
}

impl OrderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute size at one price. Zero removes the level.
    pub fn set_level(&mut self, side: Side, price: Decimal, size: Decimal) -> Result<(), GridError> {
        check_size(side, price, size)?;
        self.write_level(side, price, size);
        self.update_best_prices();
        Ok(())
    }

    /// Apply several level changes, all or nothing.
    ///
    /// Touches only the listed levels; the returned `Rollback` restores them.
    pub fn apply_changes(&mut self, changes: &[LevelChange]) -> Result<Rollback, GridError> {
        for change in changes {
            check_size(change.side, change.price, change.size)?;
        }
        let mut previous = Vec::with_capacity(changes.len());
        for change in changes {
            previous.push(LevelChange {
                size: self.levels.size_at(change.side, change.price),
                ..*change
            });
            self.write_level(change.side, change.price, change.size);
        }
        previous.reverse();
        self.update_best_prices();
        Ok(Rollback::Levels(previous))
    }

    /// Replace the whole book with a snapshot.
    pub fn apply_snapshot(
        &mut self,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> Result<Rollback, GridError> {
        for level in bids {
            check_size(Side::Buy, level.price, level.size)?;
        }
        for level in asks {
            check_size(Side::Sell, level.price, level.size)?;
        }
        let next = BookObservation::from_levels(
            bids.iter()
                .filter(|level| !level.size.is_zero())
                .map(|level| (level.price, level.size)),
            asks.iter()
                .filter(|level| !level.size.is_zero())
                .map(|level| (level.price, level.size)),
        );
        let previous = std::mem::replace(&mut self.levels, next);
        self.update_best_prices();
        Ok(Rollback::Snapshot(previous))
    }

    /// Undo an update returned by `apply_changes` or `apply_snapshot`.
    ///
    /// Only valid while no other update has been applied since.
    pub fn rollback(&mut self, rollback: Rollback) {
        match rollback {
            Rollback::Levels(previous) => {
                for change in previous {
                    self.write_level(change.side, change.price, change.size);
                }
            }
            Rollback::Snapshot(previous) => self.levels = previous,
        }
        self.update_best_prices();
    }

    /// Remove every level.
    pub fn clear(&mut self) {
        self.levels = BookObservation::new();
        self.best_bid = None;
        self.best_ask = None;
    }

    /// Current state as handed to the engine.
    pub fn observation(&self) -> &BookObservation {
        &self.levels
    }

    /// Get the current best bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.best_bid
    }

    /// Get the current best ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.best_ask
    }

    /// Get the spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Number of bid price levels.
    pub fn bid_depth(&self) -> usize {
        self.levels.bids.len()
    }

    /// Number of ask price levels.
    pub fn ask_depth(&self) -> usize {
        self.levels.asks.len()
    }

    fn write_level(&mut self, side: Side, price: Decimal, size: Decimal) {
        let levels = match side {
            Side::Buy => &mut self.levels.bids,
            Side::Sell => &mut self.levels.asks,
        };
        if size.is_zero() {
            levels.remove(&price);
        } else {
            levels.insert(price, size);
        }
    }

    /// Recalculate best bid and best ask from the book state.
    fn update_best_prices(&mut self) {
        // Zero levels are never stored, so the map ends are the best prices
        self.best_bid = self.levels.bids.keys().next_back().copied();
        self.best_ask = self.levels.asks.keys().next().copied();
    }
}

fn check_size(side: Side, price: Decimal, size: Decimal) -> Result<(), GridError> {
    if size < Decimal::ZERO {
        return Err(GridError::invalid_observation(format!(
            "negative size {size} at {side:?} price {price}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn level(price: &str, size: &str) -> PriceLevel {
        PriceLevel::new(d(price), d(size))
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new();
        assert_eq!(book.bid_depth(), 0);
        assert_eq!(book.ask_depth(), 0);
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert!(book.spread().is_none());
        assert!(book.observation().is_empty());
    }

    #[test]
    fn test_set_level_and_best_prices() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("99"), d("1")).unwrap();
        book.set_level(Side::Buy, d("100"), d("2")).unwrap();
        book.set_level(Side::Sell, d("102"), d("1")).unwrap();
        book.set_level(Side::Sell, d("101"), d("3")).unwrap();

        assert_eq!(book.best_bid(), Some(d("100")));
        assert_eq!(book.best_ask(), Some(d("101")));
        assert_eq!(book.spread(), Some(d("1")));
        assert_eq!(book.observation().size_at(Side::Sell, d("101")), d("3"));
    }

    #[test]
    fn test_set_level_overwrites_absolute_size() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("100"), d("2")).unwrap();
        book.set_level(Side::Buy, d("100"), d("5")).unwrap();
        assert_eq!(book.observation().size_at(Side::Buy, d("100")), d("5"));
        assert_eq!(book.bid_depth(), 1);
    }

    #[test]
    fn test_zero_size_removes_level() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("100"), d("2")).unwrap();
        book.set_level(Side::Buy, d("99"), d("2")).unwrap();
        book.set_level(Side::Buy, d("100"), Decimal::ZERO).unwrap();

        assert_eq!(book.bid_depth(), 1);
        assert_eq!(book.best_bid(), Some(d("99")));
    }

    #[test]
    fn test_negative_size_rejected() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("100"), d("2")).unwrap();

        let err = book.set_level(Side::Buy, d("100"), d("-1")).unwrap_err();
        assert!(matches!(err, GridError::InvalidObservation { .. }));
        assert_eq!(book.observation().size_at(Side::Buy, d("100")), d("2"));
    }

    #[test]
    fn test_apply_changes_is_atomic() {
        let mut book = OrderBook::new();
        let changes = [
            LevelChange { side: Side::Buy, price: d("100"), size: d("1") },
            LevelChange { side: Side::Sell, price: d("101"), size: d("-2") },
        ];

        assert!(book.apply_changes(&changes).is_err());
        assert!(book.observation().is_empty());

        let changes = [
            LevelChange { side: Side::Buy, price: d("100"), size: d("1") },
            LevelChange { side: Side::Sell, price: d("101"), size: d("2") },
        ];
        book.apply_changes(&changes).unwrap();
        assert_eq!(book.best_bid(), Some(d("100")));
        assert_eq!(book.best_ask(), Some(d("101")));
    }

    #[test]
    fn test_rollback_level_changes() {
        let mut book = OrderBook::new();
        book.apply_snapshot(&[level("100", "1"), level("99", "4")], &[level("101", "2")])
            .unwrap();
        let before = book.observation().clone();

        let rollback = book
            .apply_changes(&[
                LevelChange { side: Side::Buy, price: d("100"), size: Decimal::ZERO },
                LevelChange { side: Side::Buy, price: d("100.5"), size: d("3") },
                LevelChange { side: Side::Buy, price: d("100.5"), size: d("7") },
                LevelChange { side: Side::Sell, price: d("101"), size: d("5") },
            ])
            .unwrap();
        assert_eq!(book.best_bid(), Some(d("100.5")));

        book.rollback(rollback);
        assert_eq!(book.observation(), &before);
        assert_eq!(book.best_bid(), Some(d("100")));
        assert_eq!(book.best_ask(), Some(d("101")));
        assert_eq!(book.bid_depth(), 2);
    }

    #[test]
    fn test_rollback_snapshot() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("50"), d("1")).unwrap();

        let rollback = book.apply_snapshot(&[level("100", "1")], &[]).unwrap();
        assert_eq!(book.best_bid(), Some(d("100")));

        book.rollback(rollback);
        assert_eq!(book.best_bid(), Some(d("50")));
        assert_eq!(book.bid_depth(), 1);
    }

    #[test]
    fn test_apply_snapshot_replaces_book() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("50"), d("1")).unwrap();

        book.apply_snapshot(
            &[level("100", "1"), level("99", "0")],
            &[level("101", "2")],
        )
        .unwrap();

        assert_eq!(book.bid_depth(), 1);
        assert_eq!(book.best_bid(), Some(d("100")));
        assert_eq!(book.observation().size_at(Side::Buy, d("50")), Decimal::ZERO);
    }

    #[test]
    fn test_apply_snapshot_rejects_negative() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("50"), d("1")).unwrap();

        assert!(book.apply_snapshot(&[], &[level("101", "-2")]).is_err());
        assert_eq!(book.best_bid(), Some(d("50")));
    }

    #[test]
    fn test_clear() {
        let mut book = OrderBook::new();
        book.set_level(Side::Buy, d("100"), d("2")).unwrap();
        book.set_level(Side::Sell, d("101"), d("2")).unwrap();
        book.clear();

        assert!(book.observation().is_empty());
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
    }
}
