use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::types::PriceSource;

pub const BRICK_FEED_SIZES: RangeInclusive<i32> = 5..=200;
pub const RENKO_SIZES: RangeInclusive<i32> = 5..=200;
pub const GRID_RENKO_SIZES: RangeInclusive<i32> = 1..=200;

pub const DEFAULT_RETAINED_BRICKS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrickFeedSettings {
    pub ticks_per_brick: i32,
    pub retained_bricks: usize,
}

impl Default for BrickFeedSettings {
    fn default() -> Self {
        Self {
            ticks_per_brick: 10,
            retained_bricks: DEFAULT_RETAINED_BRICKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenkoSettings {
    pub brick_ticks: i32,
    pub price: PriceSource,
    pub raise_open_bricks: bool,
    pub retained_bricks: usize,
}

impl Default for RenkoSettings {
    fn default() -> Self {
        Self {
            brick_ticks: 10,
            price: PriceSource::Mid,
            raise_open_bricks: true,
            retained_bricks: DEFAULT_RETAINED_BRICKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridRenkoSettings {
    pub ticks_per_brick: i32,
    pub retained_bricks: usize,
}

impl Default for GridRenkoSettings {
    fn default() -> Self {
        Self {
            ticks_per_brick: 10,
            retained_bricks: DEFAULT_RETAINED_BRICKS,
        }
    }
}

/// Feed parameters, usually read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub brick_feed: BrickFeedSettings,
    pub renko: RenkoSettings,
    pub grid_renko: GridRenkoSettings,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigurationError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        debug!(?settings, "loaded settings");
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_size("brick_feed", self.brick_feed.ticks_per_brick, BRICK_FEED_SIZES)?;
        validate_retention("brick_feed", self.brick_feed.retained_bricks)?;
        validate_size("renko", self.renko.brick_ticks, RENKO_SIZES)?;
        validate_retention("renko", self.renko.retained_bricks)?;
        validate_size("grid_renko", self.grid_renko.ticks_per_brick, GRID_RENKO_SIZES)?;
        validate_retention("grid_renko", self.grid_renko.retained_bricks)
    }
}

pub(crate) fn validate_size(
    feed: &'static str,
    value: i32,
    range: RangeInclusive<i32>,
) -> Result<(), ConfigurationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidBrickSize {
            feed,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

pub(crate) fn validate_retention(
    feed: &'static str,
    value: usize,
) -> Result<(), ConfigurationError> {
    if value == 0 {
        Err(ConfigurationError::InvalidRetention { feed })
    } else {
        Ok(())
    }
}
