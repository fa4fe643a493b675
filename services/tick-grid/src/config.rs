//! Engine and projector configuration
//!
//! Both structs derive serde so a host can embed them in its own config
//! file. `validate` is the only gate: nothing downstream re-checks ranges.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::GridError;

/// Shape and resolution of the tick grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid resolution; every derived price is a multiple of this.
    pub tick_size: Decimal,
    /// Ticks shown on each side of the mid-price.
    pub num_ticks: usize,
    /// Number of historical rows retained.
    pub depth: usize,
    /// Cumulative depth per side instead of per-tick size.
    pub cumulative: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            // ETHBTC
            tick_size: Decimal::new(1, 6),
            num_ticks: 50,
            depth: 200,
            cumulative: true,
        }
    }
}

impl GridConfig {
    pub fn new(tick_size: Decimal, num_ticks: usize, depth: usize, cumulative: bool) -> Self {
        Self {
            tick_size,
            num_ticks,
            depth,
            cumulative,
        }
    }

    /// Parse from JSON and validate. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GridError> {
        let config: GridConfig = serde_json::from_str(json)
            .map_err(|e| GridError::invalid_configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if self.tick_size <= Decimal::ZERO {
            return Err(GridError::invalid_configuration(format!(
                "tick_size must be > 0, got {}",
                self.tick_size
            )));
        }
        if self.num_ticks == 0 {
            return Err(GridError::invalid_configuration("num_ticks must be > 0"));
        }
        if self.depth == 0 {
            return Err(GridError::invalid_configuration("depth must be > 0"));
        }
        Ok(())
    }

    /// Cells per row: `num_ticks` buy ticks followed by `num_ticks` sell ticks.
    pub fn row_width(&self) -> usize {
        2 * self.num_ticks
    }
}

/// Spatial layout used when turning grid cells into placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Width of one tick column.
    pub level_width: Decimal,
    /// Distance between consecutive history rows.
    pub level_depth: Decimal,
    /// Ticks between consecutive price-axis labels.
    pub ticks_per_label: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            level_width: Decimal::ONE,
            level_depth: Decimal::ONE,
            ticks_per_label: 10,
        }
    }
}

impl ProjectorConfig {
    pub fn validate(&self) -> Result<(), GridError> {
        if self.level_width <= Decimal::ZERO {
            return Err(GridError::invalid_configuration(format!(
                "level_width must be > 0, got {}",
                self.level_width
            )));
        }
        if self.level_depth <= Decimal::ZERO {
            return Err(GridError::invalid_configuration(format!(
                "level_depth must be > 0, got {}",
                self.level_depth
            )));
        }
        if self.ticks_per_label == 0 {
            return Err(GridError::invalid_configuration("ticks_per_label must be > 0"));
        }
        Ok(())
    }
}

impl FromStr for GridConfig {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}
