//! Forecast engine capability.
//!
//! The pipeline only relies on the contract below: fit a frame, extend the horizon,
//! predict point and interval values. [`additive::AdditiveModel`] is the bundled
//! implementation; anything satisfying the traits can be swapped in.

use crate::config::{Settings, DEFAULT_INTERVAL_WIDTH};
use crate::domain::forecast::ForecastPoint;
use crate::domain::series::TrainingFrame;
use anyhow::Result;
use chrono::NaiveDate;

pub mod additive;
mod linalg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityMode {
    /// Enabled when the history is long enough to observe the cycle.
    Auto,
    On,
    Off,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalityConfig {
    pub daily: bool,
    pub weekly: SeasonalityMode,
    pub yearly: SeasonalityMode,
    /// Coverage of the uncertainty interval, in (0, 1).
    pub interval_width: f64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            daily: false,
            weekly: SeasonalityMode::Auto,
            yearly: SeasonalityMode::Auto,
            interval_width: DEFAULT_INTERVAL_WIDTH,
        }
    }
}

impl SeasonalityConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval_width: settings.interval_width,
            ..Self::default()
        }
    }

    pub fn with_daily(mut self, daily: bool) -> Self {
        self.daily = daily;
        self
    }
}

pub trait ForecastEngine: Send + Sync {
    fn engine_name(&self) -> &'static str;

    /// Fits a model to `frame`. Fails when the fit cannot converge or the data is unusable.
    fn fit(&self, frame: &TrainingFrame, config: &SeasonalityConfig) -> Result<Box<dyn FittedModel>>;
}

pub trait FittedModel {
    /// Training dates followed by `periods` consecutive calendar days after the last one.
    fn make_future_dates(&self, periods: usize) -> Vec<NaiveDate>;

    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>>;
}
