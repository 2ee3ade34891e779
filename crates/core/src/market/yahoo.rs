use crate::config::Settings;
use crate::market::types::{ChartResponse, DailyBar};
use crate::market::HistoricalSeriesFetcher;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) stockcast/0.1";
const NOT_FOUND_CODE: &str = "Not Found";
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Daily history from the Yahoo chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooChartFetcher {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
    backoff_base: Duration,
}

impl YahooChartFetcher {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .market_data_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self::new(
            base_url,
            Duration::from_secs(settings.market_data_timeout_secs),
            settings.market_data_retries,
        )
    }

    pub fn new(base_url: String, timeout: Duration, retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            retries: retries.max(1),
            backoff_base: DEFAULT_BACKOFF_BASE,
        })
    }

    /// Base delay for exponential backoff between attempts.
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (1 << (attempt - 1).min(5))
    }

    fn url(&self, symbol: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), symbol)
    }
}

#[async_trait::async_trait]
impl HistoricalSeriesFetcher for YahooChartFetcher {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        let url = self.url(symbol);
        let params = query_params(start, end);

        let mut attempt: u32 = 0;
        let text = loop {
            attempt += 1;

            let res = match self.http.get(&url).query(&params).send().await {
                Ok(r) => r,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("market data request failed");
                    }
                    let backoff = self.backoff(attempt);
                    tracing::warn!(attempt, ?backoff, %symbol, error = %err, "market data request failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            let status = res.status();
            let text = match res.text().await {
                Ok(t) => t,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).context("failed to read market data response");
                    }
                    let backoff = self.backoff(attempt);
                    tracing::warn!(attempt, ?backoff, %symbol, error = %err, "market data response read failed; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };

            if status == StatusCode::NOT_FOUND {
                tracing::info!(%symbol, "symbol not known to market data provider");
                return Ok(Vec::new());
            }

            if !status.is_success() {
                let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if retryable && attempt < self.retries {
                    let backoff = self.backoff(attempt);
                    tracing::warn!(attempt, ?backoff, %symbol, http_status = %status, "market data HTTP error; retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                anyhow::bail!("market data HTTP {status}: {text}");
            }

            break text;
        };

        parse_chart(&text, start, end)
    }
}

// `period2` is exclusive upstream, so push it one day past `end`.
fn query_params(start: NaiveDate, end: NaiveDate) -> [(&'static str, String); 4] {
    let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let period2 = end
        .succ_opt()
        .unwrap_or(end)
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp();

    [
        ("period1", period1.to_string()),
        ("period2", period2.to_string()),
        ("interval", "1d".to_string()),
        ("events", "div,split".to_string()),
    ]
}

/// Decodes a chart payload into bars within `[start, end]`, ascending and unique by date.
pub(crate) fn parse_chart(text: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBar>> {
    let body = serde_json::from_str::<ChartResponse>(text)
        .with_context(|| format!("market data response is not a chart payload: {text}"))?;

    if let Some(err) = body.chart.error {
        if err.code == NOT_FOUND_CODE {
            return Ok(Vec::new());
        }
        anyhow::bail!("market data error [{}]: {}", err.code, err.description);
    }

    let Some(data) = body.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let quote = data.indicators.quote.first();
    let adj = data.indicators.adjclose.first();
    let column = |col: Option<&Vec<Option<f64>>>, i: usize| col.and_then(|c| c.get(i).copied().flatten());

    let mut by_date = BTreeMap::<NaiveDate, DailyBar>::new();
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let Some(close) = column(quote.map(|q| &q.close), i) else {
            continue;
        };

        // Bars are stamped at the exchange-local session open. `gmtoffset` is the exchange's
        // offset today, not on the bar's date; that only matters for stamps within an hour
        // of local midnight, which session opens never are.
        let date = DateTime::from_timestamp(ts + data.meta.gmtoffset, 0)
            .with_context(|| format!("timestamp out of range: {ts}"))?
            .date_naive();
        if date < start || date > end {
            continue;
        }

        let adj_close = column(adj.map(|a| &a.adjclose), i).unwrap_or(close);
        by_date.insert(
            date,
            DailyBar {
                date,
                open: column(quote.map(|q| &q.open), i),
                high: column(quote.map(|q| &q.high), i),
                low: column(quote.map(|q| &q.low), i),
                close,
                adj_close,
                volume: column(quote.map(|q| &q.volume), i).map(|v| v.max(0.0) as u64),
            },
        );
    }

    Ok(by_date.into_values().collect())
}
