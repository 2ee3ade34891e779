use crate::error::ForecastError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIODS: i64 = 10;
pub const MAX_PERIODS: i64 = 3650;

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Inbound request as it arrives on the wire. Every field except `symbol` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub symbol: String,
    #[serde(default)]
    pub periods: Option<i64>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// A validated forecast request. Defaults are already bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub symbol: String,
    pub periods: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ForecastPayload {
    /// Binds defaults against `now` (the time this request is being handled) and validates.
    pub fn resolve(self, now: DateTime<Utc>) -> Result<ForecastRequest, ForecastError> {
        let symbol = self.symbol.trim().to_ascii_uppercase();

        let periods = self.periods.unwrap_or(DEFAULT_PERIODS);
        if !(1..=MAX_PERIODS).contains(&periods) {
            return Err(ForecastError::InvalidRequest(format!(
                "periods must be between 1 and {MAX_PERIODS} (got {periods})"
            )));
        }

        let start = match self.start.as_deref() {
            Some(raw) => parse_field("start", raw)?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        let end = match self.end.as_deref() {
            Some(raw) => parse_field("end", raw)?,
            None => now,
        };

        let request = ForecastRequest {
            symbol,
            periods: periods as u32,
            start,
            end,
        };
        request.validate()?;
        Ok(request)
    }
}

impl ForecastRequest {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.symbol.is_empty() {
            return Err(ForecastError::InvalidRequest(
                "symbol must be non-empty".to_string(),
            ));
        }
        if !self.symbol.chars().all(is_ticker_char) {
            return Err(ForecastError::InvalidRequest(format!(
                "symbol contains unsupported characters: {}",
                self.symbol
            )));
        }
        if self.periods == 0 || i64::from(self.periods) > MAX_PERIODS {
            return Err(ForecastError::InvalidRequest(format!(
                "periods must be between 1 and {MAX_PERIODS} (got {})",
                self.periods
            )));
        }
        if self.start > self.end {
            return Err(ForecastError::InvalidRequest(format!(
                "start ({}) must not be after end ({})",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// `end + periods` days. Informational only; the forecast horizon is anchored on the
    /// last observed row, not on `end`.
    pub fn horizon_end(&self) -> DateTime<Utc> {
        self.end + Duration::days(i64::from(self.periods))
    }
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]` or `YYYY-MM-DD`.
/// Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let t = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = NaiveDate::parse_from_str(t, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn parse_field(name: &str, raw: &str) -> Result<DateTime<Utc>, ForecastError> {
    parse_timestamp(raw)
        .ok_or_else(|| ForecastError::InvalidRequest(format!("{name} is not a timestamp: {raw}")))
}

fn is_ticker_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '^' | '=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn defaults_bind_to_handling_time() {
        let payload: ForecastPayload = serde_json::from_value(json!({"symbol": "msft"})).unwrap();
        let req = payload.resolve(now()).unwrap();
        assert_eq!(req.symbol, "MSFT");
        assert_eq!(req.periods, 10);
        assert_eq!(req.start, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(req.end, now());

        let later = now() + Duration::hours(5);
        let payload: ForecastPayload = serde_json::from_value(json!({"symbol": "msft"})).unwrap();
        assert_eq!(payload.resolve(later).unwrap().end, later);
    }

    #[test]
    fn accepts_legacy_timestamp_format() {
        let payload: ForecastPayload = serde_json::from_value(json!({
            "symbol": "MSFT",
            "periods": 365,
            "start": "2021-07-10 00:00:00.000000",
            "end": "2021-07-20T00:00:00Z",
        }))
        .unwrap();
        let req = payload.resolve(now()).unwrap();
        assert_eq!(req.start_date(), NaiveDate::from_ymd_opt(2021, 7, 10).unwrap());
        assert_eq!(req.end_date(), NaiveDate::from_ymd_opt(2021, 7, 20).unwrap());
        assert_eq!(
            req.horizon_end().date_naive(),
            NaiveDate::from_ymd_opt(2022, 7, 20).unwrap()
        );
    }

    #[test]
    fn parses_supported_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2021, 7, 10, 0, 0, 0).unwrap();
        for raw in [
            "2021-07-10",
            "2021-07-10 00:00:00",
            "2021-07-10T00:00:00.000",
            "2021-07-10T02:00:00+02:00",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp("10/07/2021"), None);
    }

    #[test]
    fn rejects_non_positive_periods() {
        for periods in [0, -3] {
            let payload = ForecastPayload {
                symbol: "MSFT".into(),
                periods: Some(periods),
                ..Default::default()
            };
            let err = payload.resolve(now()).unwrap_err();
            assert!(matches!(err, ForecastError::InvalidRequest(_)));
        }
    }

    #[test]
    fn rejects_inverted_window() {
        let payload = ForecastPayload {
            symbol: "MSFT".into(),
            start: Some("2021-07-20".into()),
            end: Some("2021-07-10".into()),
            ..Default::default()
        };
        let err = payload.resolve(now()).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidRequest(_)));
    }

    #[test]
    fn rejects_blank_or_odd_symbol() {
        for symbol in ["   ", "MS FT", "A/B"] {
            let payload = ForecastPayload {
                symbol: symbol.into(),
                ..Default::default()
            };
            assert!(payload.resolve(now()).is_err(), "{symbol:?}");
        }
        let payload = ForecastPayload {
            symbol: " brk-b ".into(),
            ..Default::default()
        };
        assert_eq!(payload.resolve(now()).unwrap().symbol, "BRK-B");
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        let payload = ForecastPayload {
            symbol: "MSFT".into(),
            start: Some("yesterday".into()),
            ..Default::default()
        };
        let err = payload.resolve(now()).unwrap_err();
        assert!(err.to_string().contains("start"));
    }
}
