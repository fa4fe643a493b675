//! Order book observations
//!
//! A `BookObservation` is what the book container hands the engine on every
//! update: the current absolute resting size at each observed price, per
//! side. Sides are kept in `BTreeMap`s so best/worst prices come from the
//! ends of the map and point lookups are O(log n).
//!
//! A size of zero is equivalent to the price being absent.

use std::collections::BTreeMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::GridError;
use crate::side::Side;

/// A single `(price, size)` pair on one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Convert from floating point feed values, rejecting NaN and infinities.
    pub fn try_from_f64(price: f64, size: f64) -> Result<Self, GridError> {
        let price = Decimal::from_f64(price)
            .ok_or_else(|| GridError::invalid_observation(format!("non-finite price {price}")))?;
        let size = Decimal::from_f64(size)
            .ok_or_else(|| GridError::invalid_observation(format!("non-finite size {size}")))?;
        Ok(Self { price, size })
    }
}

/// Snapshot of both sides of one book at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookObservation {
    /// Bid levels: price → size.
    pub bids: BTreeMap<Decimal, Decimal>,
    /// Ask levels: price → size.
    pub asks: BTreeMap<Decimal, Decimal>,
}

impl BookObservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(price, size)` pairs. Later duplicates overwrite earlier ones.
    pub fn from_levels<B, A>(bids: B, asks: A) -> Self
    where
        B: IntoIterator<Item = (Decimal, Decimal)>,
        A: IntoIterator<Item = (Decimal, Decimal)>,
    {
        Self {
            bids: bids.into_iter().collect(),
            asks: asks.into_iter().collect(),
        }
    }

    /// Build from floating point `(price, size)` pairs as most feeds deliver them.
    pub fn from_f64_levels(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> Result<Self, GridError> {
        let convert = |levels: &[(f64, f64)]| -> Result<BTreeMap<Decimal, Decimal>, GridError> {
            levels
                .iter()
                .map(|&(price, size)| {
                    PriceLevel::try_from_f64(price, size).map(|level| (level.price, level.size))
                })
                .collect()
        };
        let observation = Self {
            bids: convert(bids)?,
            asks: convert(asks)?,
        };
        observation.validate()?;
        Ok(observation)
    }

    /// Reject negative sizes. Sizes are never clamped.
    pub fn validate(&self) -> Result<(), GridError> {
        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            if let Some((price, size)) = levels.iter().find(|(_, size)| **size < Decimal::ZERO) {
                return Err(GridError::invalid_observation(format!(
                    "negative size {size} at {side:?} price {price}"
                )));
            }
        }
        Ok(())
    }

    fn levels(&self, side: Side) -> &BTreeMap<Decimal, Decimal> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Best price on `side`: highest bid, lowest ask.
    pub fn best_price(&self, side: Side) -> Option<Decimal> {
        let mut populated = self
            .levels(side)
            .iter()
            .filter(|(_, size)| !size.is_zero())
            .map(|(price, _)| *price);
        match side {
            Side::Buy => populated.next_back(),
            Side::Sell => populated.next(),
        }
    }

    /// Worst price on `side`: lowest bid, highest ask.
    pub fn worst_price(&self, side: Side) -> Option<Decimal> {
        let mut populated = self
            .levels(side)
            .iter()
            .filter(|(_, size)| !size.is_zero())
            .map(|(price, _)| *price);
        match side {
            Side::Buy => populated.next(),
            Side::Sell => populated.next_back(),
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.best_price(Side::Buy)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.best_price(Side::Sell)
    }

    /// Resting size at `price` on `side`, zero if absent.
    pub fn size_at(&self, side: Side, price: Decimal) -> Decimal {
        self.levels(side).get(&price).copied().unwrap_or(Decimal::ZERO)
    }

    /// Every nonzero size across both sides.
    pub fn nonzero_sizes(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.bids
            .values()
            .chain(self.asks.values())
            .copied()
            .filter(|size| !size.is_zero())
    }

    /// Bid levels in descending price order (best first).
    pub fn bid_levels(&self) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .rev()
            .filter(|(_, size)| !size.is_zero())
            .map(|(price, size)| PriceLevel::new(*price, *size))
            .collect()
    }

    /// Ask levels in ascending price order (best first).
    pub fn ask_levels(&self) -> Vec<PriceLevel> {
        self.asks
            .iter()
            .filter(|(_, size)| !size.is_zero())
            .map(|(price, size)| PriceLevel::new(*price, *size))
            .collect()
    }

    /// True when neither side holds any nonzero size.
    pub fn is_empty(&self) -> bool {
        self.nonzero_sizes().next().is_none()
    }
}
