//! Book update events
//!
//! What a feed delivers to the ingestion path. Each update carries a
//! monotonic sequence number assigned by the feed, and `Ord` on sequence
//! gives the delivery order the engine must see.

use serde::{Deserialize, Serialize};
use types::book::PriceLevel;

use crate::order_book::LevelChange;

/// A single update from the book feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUpdate {
    /// Feed sequence number; strictly increasing in delivery order.
    pub sequence: u64,
    /// Unix nanoseconds timestamp from the feed.
    pub timestamp: i64,
    pub payload: BookUpdatePayload,
}

/// Update-specific payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "update_type")]
pub enum BookUpdatePayload {
    /// Full replacement of both sides.
    Snapshot {
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    /// Absolute sizes for a handful of levels; zero removes a level.
    Levels { changes: Vec<LevelChange> },
}

impl BookUpdate {
    pub fn snapshot(sequence: u64, timestamp: i64, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            sequence,
            timestamp,
            payload: BookUpdatePayload::Snapshot { bids, asks },
        }
    }

    pub fn levels(sequence: u64, timestamp: i64, changes: Vec<LevelChange>) -> Self {
        Self {
            sequence,
            timestamp,
            payload: BookUpdatePayload::Levels { changes },
        }
    }

    /// Get the update type as a string label for logging.
    pub fn update_type_label(&self) -> &'static str {
        match &self.payload {
            BookUpdatePayload::Snapshot { .. } => "Snapshot",
            BookUpdatePayload::Levels { .. } => "Levels",
        }
    }
}

/// Ordering by sequence number
impl Ord for BookUpdate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for BookUpdate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
