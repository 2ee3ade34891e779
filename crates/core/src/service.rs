use crate::config::{Settings, DEFAULT_MIN_HISTORY};
use crate::domain::forecast::{ForecastColumns, ForecastPoint, ForecastResult};
use crate::domain::request::ForecastRequest;
use crate::domain::series::{HistoricalSeries, PricePoint, TrainingFrame};
use crate::engine::{ForecastEngine, SeasonalityConfig};
use crate::error::ForecastError;
use crate::market::HistoricalSeriesFetcher;
use crate::normalize::normalize;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ForecastOptions {
    /// Fewer training rows than this is `InsufficientHistory`.
    pub min_history: usize,
    pub seasonality: SeasonalityConfig,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            min_history: DEFAULT_MIN_HISTORY,
            seasonality: SeasonalityConfig::default(),
        }
    }
}

impl ForecastOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_history: settings.min_history,
            seasonality: SeasonalityConfig::from_settings(settings),
        }
    }
}

/// Request-to-forecast pipeline: fetch, normalize, fit, merge.
///
/// Holds only the collaborators and static options; every call re-fetches and re-fits.
#[derive(Clone)]
pub struct ForecastService {
    fetcher: Arc<dyn HistoricalSeriesFetcher>,
    engine: Arc<dyn ForecastEngine>,
    options: ForecastOptions,
}

impl ForecastService {
    pub fn new(
        fetcher: Arc<dyn HistoricalSeriesFetcher>,
        engine: Arc<dyn ForecastEngine>,
        options: ForecastOptions,
    ) -> Self {
        Self {
            fetcher,
            engine,
            options,
        }
    }

    pub async fn produce_forecast(
        &self,
        request: ForecastRequest,
        requested_at: DateTime<Utc>,
    ) -> Result<ForecastResult, ForecastError> {
        request.validate()?;

        let symbol = request.symbol.as_str();
        let periods = request.periods as usize;
        tracing::info!(
            %symbol,
            periods,
            start = %request.start_date(),
            end = %request.end_date(),
            horizon_end = %request.horizon_end().date_naive(),
            provider = self.fetcher.provider_name(),
            engine = self.engine.engine_name(),
            "forecast requested"
        );

        let bars = self
            .fetcher
            .fetch_daily(symbol, request.start_date(), request.end_date())
            .await
            .map_err(|err| ForecastError::data_unavailable(symbol, format!("{err:#}")))?;
        if bars.is_empty() {
            return Err(ForecastError::data_unavailable(
                symbol,
                "no trading data in the requested window",
            ));
        }

        let points = bars
            .iter()
            .map(|b| PricePoint {
                date: b.date,
                adj_close: b.adj_close,
            })
            .collect();
        let series = HistoricalSeries::new(points)
            .map_err(|err| ForecastError::data_unavailable(symbol, format!("malformed series: {err}")))?;

        let earliest = series.first_date();
        tracing::info!(%symbol, rows = series.len(), earliest = ?earliest, "history fetched");

        let frame = normalize(&series)
            .map_err(|err| ForecastError::data_unavailable(symbol, err.to_string()))?;
        if frame.len() < self.options.min_history {
            return Err(ForecastError::InsufficientHistory {
                required: self.options.min_history,
                actual: frame.len(),
            });
        }

        let engine = Arc::clone(&self.engine);
        let config = self.options.seasonality.clone().with_daily(true);
        let (frame, predictions) = tokio::task::spawn_blocking(move || {
            let model = engine.fit(&frame, &config)?;
            let dates = model.make_future_dates(periods);
            let predictions = model.predict(&dates)?;
            Ok::<_, anyhow::Error>((frame, predictions))
        })
        .await
        .map_err(|err| ForecastError::FitFailure(format!("fit task did not complete: {err}")))?
        .map_err(|err| ForecastError::FitFailure(format!("{err:#}")))?;

        let forecast = merge(&frame, predictions, periods)?;
        tracing::info!(
            %symbol,
            rows = forecast.len(),
            last = ?forecast.ds.last(),
            "forecast assembled"
        );

        Ok(ForecastResult::new(request, requested_at, forecast))
    }
}

/// Joins training actuals with the engine's rows. The first `frame.len()` predictions
/// must line up with the training dates; the rest are the horizon.
fn merge(
    frame: &TrainingFrame,
    predictions: Vec<ForecastPoint>,
    periods: usize,
) -> Result<ForecastColumns, ForecastError> {
    let expected = frame.len() + periods;
    if predictions.len() != expected {
        return Err(ForecastError::FitFailure(format!(
            "engine returned {} rows, expected {expected}",
            predictions.len()
        )));
    }

    let rows = frame.rows();
    let mut out = ForecastColumns {
        ds: Vec::with_capacity(expected),
        y: Vec::with_capacity(expected),
        yhat: Vec::with_capacity(expected),
        yhat_upper: Vec::with_capacity(expected),
        yhat_lower: Vec::with_capacity(expected),
    };

    for (i, p) in predictions.into_iter().enumerate() {
        if let Some(prev) = out.ds.last() {
            if p.ds <= *prev {
                return Err(ForecastError::FitFailure(format!(
                    "engine dates out of order: {} after {prev}",
                    p.ds
                )));
            }
        }
        if !(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper) {
            return Err(ForecastError::FitFailure(format!(
                "interval does not contain the estimate on {}",
                p.ds
            )));
        }

        let actual = match rows.get(i) {
            Some(row) if row.ds == p.ds => Some(row.y),
            Some(row) => {
                return Err(ForecastError::FitFailure(format!(
                    "engine row {i} is {}, expected training date {}",
                    p.ds, row.ds
                )))
            }
            None => None,
        };

        out.ds.push(p.ds);
        out.y.push(actual);
        out.yhat.push(p.yhat);
        out.yhat_upper.push(p.yhat_upper);
        out.yhat_lower.push(p.yhat_lower);
    }

    Ok(out)
}
