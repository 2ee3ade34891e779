use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series has no points")]
    EmptySeries,

    #[error("series is not strictly ascending: {next} follows {prev}")]
    OutOfOrder { prev: NaiveDate, next: NaiveDate },

    #[error("non-finite adjusted close on {date}")]
    NonFinite { date: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

/// Daily adjusted prices, ascending by date with unique dates.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSeries {
    points: Vec<PricePoint>,
}

impl HistoricalSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if points.is_empty() {
            return Err(SeriesError::EmptySeries);
        }
        for p in &points {
            if !p.adj_close.is_finite() {
                return Err(SeriesError::NonFinite { date: p.date });
            }
        }
        for w in points.windows(2) {
            if w[1].date <= w[0].date {
                return Err(SeriesError::OutOfOrder {
                    prev: w[0].date,
                    next: w[1].date,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }
}

/// One training row in the forecaster's schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub ds: NaiveDate,
    pub y: f64,
}

/// Two-column training frame. Built by [`crate::normalize::normalize`] and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    rows: Vec<TrainingRow>,
}

impl TrainingFrame {
    pub(crate) fn from_rows(rows: Vec<TrainingRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[TrainingRow] {
        &self.rows
    }

    pub fn ds(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.ds).collect()
    }

    pub fn y(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.y).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.ds)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 7, day).unwrap()
    }

    #[test]
    fn rejects_duplicate_and_descending_dates() {
        let dup = vec![
            PricePoint { date: d(12), adj_close: 1.0 },
            PricePoint { date: d(12), adj_close: 2.0 },
        ];
        assert_eq!(
            HistoricalSeries::new(dup),
            Err(SeriesError::OutOfOrder { prev: d(12), next: d(12) })
        );

        let desc = vec![
            PricePoint { date: d(13), adj_close: 1.0 },
            PricePoint { date: d(12), adj_close: 2.0 },
        ];
        assert!(HistoricalSeries::new(desc).is_err());
    }

    #[test]
    fn rejects_nan_prices() {
        let pts = vec![PricePoint { date: d(12), adj_close: f64::NAN }];
        assert_eq!(
            HistoricalSeries::new(pts),
            Err(SeriesError::NonFinite { date: d(12) })
        );
    }

    #[test]
    fn empty_is_an_error() {
        assert_eq!(HistoricalSeries::new(vec![]), Err(SeriesError::EmptySeries));
    }
}
