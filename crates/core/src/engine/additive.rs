//! Additive trend + seasonality model.
//!
//! `y(t) = trend(t) + sum of Fourier seasonalities`, where the trend is piecewise linear
//! with changepoints spread over the first 80% of the history. Coefficients come from a
//! ridge-regularised least squares fit on max-abs scaled `y`, so the fit is closed form
//! and deterministic. Intervals use the in-sample residual spread and widen with the
//! distance past the last observation.

use super::linalg::solve_spd;
use super::{FittedModel, ForecastEngine, SeasonalityConfig, SeasonalityMode};
use crate::domain::forecast::ForecastPoint;
use crate::domain::series::TrainingFrame;
use anyhow::{bail, ensure, Context, Result};
use chrono::{Duration, NaiveDate};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const DAILY: Seasonality = Seasonality {
    period_days: 1.0,
    order: 4,
};
const WEEKLY: Seasonality = Seasonality {
    period_days: 7.0,
    order: 3,
};
const YEARLY: Seasonality = Seasonality {
    period_days: 365.25,
    order: 10,
};

const WEEKLY_MIN_SPAN_DAYS: i64 = 14;
const YEARLY_MIN_SPAN_DAYS: i64 = 730;

const MAX_CHANGEPOINTS: usize = 25;
const CHANGEPOINT_RANGE: f64 = 0.8;

// Ridge penalties, in units of scaled y.
const CHANGEPOINT_PENALTY: f64 = 2.0;
const SEASONALITY_PENALTY: f64 = 0.1;

const MIN_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Seasonality {
    period_days: f64,
    order: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveModel;

impl ForecastEngine for AdditiveModel {
    fn engine_name(&self) -> &'static str {
        "additive"
    }

    fn fit(&self, frame: &TrainingFrame, config: &SeasonalityConfig) -> Result<Box<dyn FittedModel>> {
        Ok(Box::new(FittedAdditive::fit(frame, config)?))
    }
}

#[derive(Debug, Clone)]
pub struct FittedAdditive {
    history: Vec<NaiveDate>,
    origin: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    coefficients: Vec<f64>,
    sigma: f64,
    z: f64,
}

impl FittedAdditive {
    pub fn fit(frame: &TrainingFrame, config: &SeasonalityConfig) -> Result<Self> {
        let rows = frame.rows();
        ensure!(
            rows.len() >= MIN_ROWS,
            "need at least {MIN_ROWS} rows to fit (got {})",
            rows.len()
        );
        ensure!(
            config.interval_width > 0.0 && config.interval_width < 1.0,
            "interval_width must be between 0 and 1 (got {})",
            config.interval_width
        );
        if let Some(row) = rows.iter().find(|r| !r.y.is_finite()) {
            bail!("non-finite training value on {}", row.ds);
        }

        let origin = rows[0].ds;
        let span = (rows[rows.len() - 1].ds - origin).num_days();
        ensure!(span > 0, "training dates must span more than one day");

        let y_scale = rows.iter().map(|r| r.y.abs()).fold(0.0, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let mut model = Self {
            history: frame.ds(),
            origin,
            span_days: span as f64,
            y_scale,
            changepoints: Vec::new(),
            seasonalities: active_seasonalities(config, span),
            coefficients: Vec::new(),
            sigma: 0.0,
            z: 0.0,
        };
        let scaled_t: Vec<f64> = rows.iter().map(|r| model.scaled_time(r.ds)).collect();
        model.changepoints = changepoints(&scaled_t);

        let p = model.n_features();
        let mut xtx = vec![0.0; p * p];
        let mut xty = vec![0.0; p];
        let mut x = vec![0.0; p];
        for row in rows {
            model.features(row.ds, &mut x);
            let y = row.y / y_scale;
            for i in 0..p {
                xty[i] += x[i] * y;
                for j in 0..p {
                    xtx[i * p + j] += x[i] * x[j];
                }
            }
        }

        let first_seasonal = 2 + model.changepoints.len();
        for i in 2..p {
            let penalty = if i < first_seasonal {
                CHANGEPOINT_PENALTY
            } else {
                SEASONALITY_PENALTY
            };
            xtx[i * p + i] += penalty;
        }

        let coefficients = solve_spd(&xtx, &xty, p).context("design matrix is singular")?;
        ensure!(
            coefficients.iter().all(|c| c.is_finite()),
            "fit produced non-finite coefficients"
        );
        model.coefficients = coefficients;

        let sse: f64 = rows
            .iter()
            .map(|r| {
                let e = r.y - model.point(r.ds);
                e * e
            })
            .sum();
        let dof = rows.len().saturating_sub(2).max(1);
        let sigma = (sse / dof as f64).sqrt();
        ensure!(sigma.is_finite(), "residual spread is not finite");

        let normal = Normal::new(0.0, 1.0).context("failed to build standard normal")?;
        model.sigma = sigma;
        model.z = normal.inverse_cdf((1.0 + config.interval_width) / 2.0);

        tracing::debug!(
            rows = rows.len(),
            features = p,
            changepoints = model.changepoints.len(),
            seasonalities = model.seasonalities.len(),
            sigma,
            "additive model fitted"
        );

        Ok(model)
    }

    fn n_features(&self) -> usize {
        2 + self.changepoints.len() + self.seasonalities.iter().map(|s| 2 * s.order).sum::<usize>()
    }

    fn scaled_time(&self, ds: NaiveDate) -> f64 {
        (ds - self.origin).num_days() as f64 / self.span_days
    }

    // Layout: [intercept, slope, changepoint hinges.., (sin, cos) per seasonal harmonic..]
    fn features(&self, ds: NaiveDate, out: &mut [f64]) {
        let t = self.scaled_time(ds);
        out[0] = 1.0;
        out[1] = t;

        let mut col = 2;
        for &c in &self.changepoints {
            out[col] = (t - c).max(0.0);
            col += 1;
        }

        let days = days_since_epoch(ds);
        for s in &self.seasonalities {
            for k in 1..=s.order {
                let arg = 2.0 * PI * k as f64 * days / s.period_days;
                out[col] = arg.sin();
                out[col + 1] = arg.cos();
                col += 2;
            }
        }
    }

    fn point(&self, ds: NaiveDate) -> f64 {
        let mut x = vec![0.0; self.coefficients.len()];
        self.features(ds, &mut x);
        let scaled: f64 = x.iter().zip(&self.coefficients).map(|(a, b)| a * b).sum();
        scaled * self.y_scale
    }

    fn last_date(&self) -> NaiveDate {
        self.history.last().copied().unwrap_or(self.origin)
    }
}

impl FittedModel for FittedAdditive {
    fn make_future_dates(&self, periods: usize) -> Vec<NaiveDate> {
        let last = self.last_date();
        let mut dates = Vec::with_capacity(self.history.len() + periods);
        dates.extend_from_slice(&self.history);
        dates.extend((1..=periods as i64).map(|i| last + Duration::days(i)));
        dates
    }

    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>> {
        let last = self.last_date();
        let n = self.history.len() as f64;

        dates
            .iter()
            .map(|&ds| {
                let yhat = self.point(ds);
                ensure!(yhat.is_finite(), "non-finite prediction on {ds}");

                let ahead = (ds - last).num_days().max(0) as f64;
                let half_width = self.z * self.sigma * (1.0 + ahead / n).sqrt();
                Ok(ForecastPoint {
                    ds,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                })
            })
            .collect()
    }
}

fn active_seasonalities(config: &SeasonalityConfig, span_days: i64) -> Vec<Seasonality> {
    let enabled = |mode: SeasonalityMode, min_span: i64| match mode {
        SeasonalityMode::On => true,
        SeasonalityMode::Off => false,
        SeasonalityMode::Auto => span_days >= min_span,
    };

    let mut out = Vec::new();
    if config.daily {
        out.push(DAILY);
    }
    if enabled(config.weekly, WEEKLY_MIN_SPAN_DAYS) {
        out.push(WEEKLY);
    }
    if enabled(config.yearly, YEARLY_MIN_SPAN_DAYS) {
        out.push(YEARLY);
    }
    out
}

// Evenly spaced over the rows of the first CHANGEPOINT_RANGE of history, excluding the first row.
fn changepoints(scaled_t: &[f64]) -> Vec<f64> {
    let hist = (scaled_t.len() as f64 * CHANGEPOINT_RANGE).floor() as usize;
    let count = MAX_CHANGEPOINTS.min(hist.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    (1..=count)
        .map(|j| {
            let idx = ((j * (hist - 1)) as f64 / count as f64).round() as usize;
            scaled_t[idx]
        })
        .collect()
}

fn days_since_epoch(ds: NaiveDate) -> f64 {
    (ds - NaiveDate::default()).num_days() as f64
}
