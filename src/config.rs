// Stream settings plus book shape and tick cadence, from an optional file and LOBVIZ__* env vars

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::book::BookParams;
use crate::market_data::venue::Venue;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("price range is inverted: min {min} > max {max}")]
    InvertedPriceRange { min: f64, max: f64 },
    #[error("quantity threshold must be a finite non-negative number, got {0}")]
    InvalidThreshold(f64),
    #[error("tick period must be greater than zero")]
    ZeroTickPeriod,
    #[error("unknown time range {0:?}, expected one of 1m, 5m, 15m, 1h")]
    UnknownTimeRange(String),
    #[error("book must have at least one level per side")]
    NoLevels,
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    #[default]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::OneMinute,
        TimeRange::FiveMinutes,
        TimeRange::FifteenMinutes,
        TimeRange::OneHour,
    ];

    pub fn window(&self) -> Duration {
        match self {
            TimeRange::OneMinute => Duration::from_secs(60),
            TimeRange::FiveMinutes => Duration::from_secs(5 * 60),
            TimeRange::FifteenMinutes => Duration::from_secs(15 * 60),
            TimeRange::OneHour => Duration::from_secs(60 * 60),
        }
    }

    // 100ms period: 1m -> 600, 5m -> 3000, 15m -> 9000, 1h -> 36000
    pub fn history_cap(&self, tick_period: Duration) -> usize {
        let period = tick_period.as_millis().max(1);
        ((self.window().as_millis() / period) as usize).max(1)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::OneMinute => "1m",
            TimeRange::FiveMinutes => "5m",
            TimeRange::FifteenMinutes => "15m",
            TimeRange::OneHour => "1h",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::ALL
            .into_iter()
            .find(|r| r.label() == s.trim())
            .ok_or_else(|| ConfigError::UnknownTimeRange(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub time_range: TimeRange,
    // inclusive [min, max]; None keeps every price
    pub price_range: Option<(f64, f64)>,
    // 0 keeps every level
    pub quantity_threshold: f64,
    pub real_time_mode: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            time_range: TimeRange::FiveMinutes,
            price_range: None,
            quantity_threshold: 0.0,
            real_time_mode: true,
        }
    }
}

impl StreamSettings {
    // Dashboard's opening preset
    pub fn dashboard() -> Self {
        Self {
            time_range: TimeRange::FiveMinutes,
            price_range: Some((60_000.0, 70_000.0)),
            quantity_threshold: 1.0,
            real_time_mode: true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((min, max)) = self.price_range {
            if min > max || min.is_nan() || max.is_nan() {
                return Err(ConfigError::InvertedPriceRange { min, max });
            }
        }
        if !self.quantity_threshold.is_finite() || self.quantity_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.quantity_threshold));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamSettings,
    pub tick_period_ms: u64,
    pub symbol: String,
    pub reference_price: f64,
    pub levels_per_side: usize,
    pub price_step: f64,
    pub seed: Option<u64>,
    // None means the built-in demo venues
    pub venues: Option<Vec<Venue>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let book = BookParams::default();
        Self {
            stream: StreamSettings::default(),
            tick_period_ms: DEFAULT_TICK_PERIOD.as_millis() as u64,
            symbol: book.symbol,
            reference_price: book.reference_price,
            levels_per_side: book.levels_per_side,
            price_step: book.price_step,
            seed: None,
            venues: None,
        }
    }
}

impl AppConfig {
    // Env vars override the file
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("LOBVIZ").prefix_separator("__").separator("__"))
            .build()?;

        let cfg: AppConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stream.validate()?;
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.levels_per_side == 0 {
            return Err(ConfigError::NoLevels);
        }
        if !(self.reference_price > 0.0) {
            return Err(ConfigError::NonPositive { field: "reference_price", value: self.reference_price });
        }
        if !(self.price_step > 0.0) {
            return Err(ConfigError::NonPositive { field: "price_step", value: self.price_step });
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn book_params(&self) -> BookParams {
        BookParams {
            symbol: self.symbol.clone(),
            reference_price: self.reference_price,
            price_step: self.price_step,
            levels_per_side: self.levels_per_side,
        }
    }
}
