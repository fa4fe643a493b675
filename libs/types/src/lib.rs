//! Types library for the tick-grid order book visualizer
//!
//! Shared vocabulary between the book container, the aggregation engine
//! and whatever host feeds it.
//!
//! # Modules
//! - `side`: Book side (buy/sell)
//! - `book`: Order book observations (price → size maps per side)
//! - `numeric`: Tick rounding and fixed-precision helpers
//! - `errors`: Error taxonomy

// Public modules
pub mod side;
pub mod book;
pub mod numeric;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::side::*;
    pub use crate::book::*;
    pub use crate::numeric::*;
    pub use crate::errors::*;
}
