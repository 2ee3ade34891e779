use crate::domain::request::ForecastRequest;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single forecaster output row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Parallel arrays aligned by index. `y` is `None` past the last observed row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastColumns {
    pub ds: Vec<NaiveDate>,
    pub y: Vec<Option<f64>>,
    pub yhat: Vec<f64>,
    pub yhat_upper: Vec<f64>,
    pub yhat_lower: Vec<f64>,
}

impl ForecastColumns {
    pub fn len(&self) -> usize {
        self.ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ds.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub symbol: String,
    pub requested_at: DateTime<Utc>,
    pub periods: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub forecast: ForecastColumns,
}

impl ForecastResult {
    pub fn new(
        request: ForecastRequest,
        requested_at: DateTime<Utc>,
        forecast: ForecastColumns,
    ) -> Self {
        Self {
            symbol: request.symbol,
            requested_at,
            periods: request.periods,
            start: request.start,
            end: request.end,
            forecast,
        }
    }
}
