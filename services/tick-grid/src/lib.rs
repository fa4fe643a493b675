//! Tick Grid Service
//!
//! Turns a live order book into a fixed-shape, tick-aligned, time-windowed
//! grid of bar sizes for a 3D depth visualization:
//! - Book mirror fed by absolute-size snapshots and level changes
//! - One grid row per observation, centred on a tick-rounded mid-price
//! - One-time scaling calibration so bar heights stay comparable
//! - Bounded history with drift compensation between rows
//! - Render-ready cell placements, colours and price labels
//!
//! # Architecture
//!
//! ```text
//!   Feed updates
//!        │
//!   ┌────▼────┐
//!   │ Driver  │  ← Orders updates, rejects stale/invalid ones
//!   └────┬────┘
//!        │
//!   ┌────▼────┐
//!   │  Book   │  ← price → size per side
//!   └────┬────┘
//!        │ BookObservation
//!   ┌────▼────┐
//!   │ Engine  │  ← recalculate: one row per observation
//!   └────┬────┘
//!        │ EngineState (read only)
//!   ┌────▼──────┐
//!   │ Projector │  ← cells, offsets, colours, labels
//!   └───────────┘
//! ```

pub mod config;
pub mod engine;
pub mod events;
pub mod history;
pub mod ingestion;
pub mod metrics;
pub mod order_book;
pub mod projector;

pub use config::{GridConfig, ProjectorConfig};
pub use engine::{EnginePhase, EngineState, GridRow, Recalculation, TickGridEngine};
pub use ingestion::{GridDriver, IngestionError};
pub use projector::{CellColor, CellFrame, Frame, FrameProjector, PriceLabel};

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
