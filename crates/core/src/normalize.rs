use crate::domain::series::{HistoricalSeries, SeriesError, TrainingFrame, TrainingRow};

/// Projects a price series onto the forecaster's `(ds, y)` schema.
///
/// One row per point, same order. No resampling or gap filling: weekends and holidays
/// stay missing and are left to the engine.
pub fn normalize(series: &HistoricalSeries) -> Result<TrainingFrame, SeriesError> {
    if series.is_empty() {
        return Err(SeriesError::EmptySeries);
    }

    let rows = series
        .points()
        .iter()
        .map(|p| TrainingRow {
            ds: p.date,
            y: p.adj_close,
        })
        .collect();

    Ok(TrainingFrame::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::PricePoint;
    use chrono::NaiveDate;

    #[test]
    fn keeps_order_length_and_values() {
        // 2021-07-16 is a Friday; the weekend gap is passed through.
        let points = vec![
            PricePoint {
                date: NaiveDate::from_ymd_opt(2021, 7, 15).unwrap(),
                adj_close: 281.03,
            },
            PricePoint {
                date: NaiveDate::from_ymd_opt(2021, 7, 16).unwrap(),
                adj_close: 280.75,
            },
            PricePoint {
                date: NaiveDate::from_ymd_opt(2021, 7, 19).unwrap(),
                adj_close: 277.01,
            },
        ];
        let series = HistoricalSeries::new(points.clone()).unwrap();

        let frame = normalize(&series).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.ds(), points.iter().map(|p| p.date).collect::<Vec<_>>());
        assert_eq!(frame.y(), vec![281.03, 280.75, 277.01]);
        assert_eq!(frame.first_date(), Some(points[0].date));
        assert_eq!(frame.last_date(), Some(points[2].date));
    }
}
