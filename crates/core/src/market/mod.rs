use anyhow::Result;
use chrono::NaiveDate;

pub mod types;
pub mod yahoo;

pub use types::DailyBar;

/// Source of daily price history.
///
/// Implementations return bars sorted ascending by date with no duplicates. An unknown
/// symbol or a window with no trading days yields `Ok(vec![])`, not an error.
#[async_trait::async_trait]
pub trait HistoricalSeriesFetcher: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Fetches daily bars for the closed interval `[start, end]`.
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;
}
