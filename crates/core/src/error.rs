use thiserror::Error;

/// Failure kinds surfaced to callers of the forecast pipeline.
///
/// The first failure aborts the remaining stages; no partial result is returned.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no usable price history for {symbol}: {detail}")]
    DataUnavailable { symbol: String, detail: String },

    #[error("insufficient history: need at least {required} daily rows, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("forecast fit failed: {0}")]
    FitFailure(String),
}

impl ForecastError {
    /// Stable identifier for the failure kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InvalidRequest(_) => "invalid_request",
            ForecastError::DataUnavailable { .. } => "data_unavailable",
            ForecastError::InsufficientHistory { .. } => "insufficient_history",
            ForecastError::FitFailure(_) => "fit_failure",
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ForecastError::FitFailure(_))
    }

    pub(crate) fn data_unavailable(symbol: &str, detail: impl Into<String>) -> Self {
        ForecastError::DataUnavailable {
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errs = [
            ForecastError::InvalidRequest("x".into()),
            ForecastError::data_unavailable("MSFT", "empty"),
            ForecastError::InsufficientHistory {
                required: 5,
                actual: 2,
            },
            ForecastError::FitFailure("singular".into()),
        ];
        let mut kinds: Vec<_> = errs.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 4);
        assert!(!errs[3].is_client_error());
        assert!(errs[1].is_client_error());
    }

    #[test]
    fn message_includes_counts() {
        let err = ForecastError::InsufficientHistory {
            required: 5,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history: need at least 5 daily rows, got 2"
        );
    }
}
