pub mod domain;
pub mod engine;
pub mod error;
pub mod market;
pub mod normalize;
pub mod service;

pub mod config {
    use anyhow::Context;
    use std::str::FromStr;

    const DEFAULT_PORT: u16 = 8000;
    const DEFAULT_MARKET_DATA_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MARKET_DATA_RETRIES: u32 = 3;
    pub const DEFAULT_INTERVAL_WIDTH: f64 = 0.80;
    pub const DEFAULT_MIN_HISTORY: usize = 5;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub port: u16,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub market_data_timeout_secs: u64,
        pub market_data_retries: u32,
        pub interval_width: f64,
        pub min_history: usize,
        pub cors_allow_origins: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from an arbitrary key lookup. Blank values count as unset.
        pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
        where
            F: Fn(&str) -> Option<String>,
        {
            let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            let interval_width =
                parse_key(&get, "FORECAST_INTERVAL_WIDTH")?.unwrap_or(DEFAULT_INTERVAL_WIDTH);
            anyhow::ensure!(
                interval_width > 0.0 && interval_width < 1.0,
                "FORECAST_INTERVAL_WIDTH must be between 0 and 1 (got {interval_width})"
            );

            let min_history = parse_key(&get, "FORECAST_MIN_HISTORY")?.unwrap_or(DEFAULT_MIN_HISTORY);
            anyhow::ensure!(
                min_history >= 2,
                "FORECAST_MIN_HISTORY must be at least 2 (got {min_history})"
            );

            Ok(Self {
                port: parse_key(&get, "PORT")?.unwrap_or(DEFAULT_PORT),
                sentry_dsn: get("SENTRY_DSN"),
                market_data_base_url: get("MARKET_DATA_BASE_URL"),
                market_data_timeout_secs: parse_key(&get, "MARKET_DATA_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_MARKET_DATA_TIMEOUT_SECS),
                market_data_retries: parse_key(&get, "MARKET_DATA_RETRIES")?
                    .unwrap_or(DEFAULT_MARKET_DATA_RETRIES)
                    .max(1),
                interval_width,
                min_history,
                cors_allow_origins: get("CORS_ALLOW_ORIGINS"),
            })
        }
    }

    fn parse_key<T, G>(get: &G, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
        G: Fn(&str) -> Option<String>,
    {
        get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .with_context(|| format!("{key} has an invalid value: {raw}"))
            })
            .transpose()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn settings_from(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|key| map.get(key).cloned())
        }

        #[test]
        fn defaults_apply_when_unset() {
            let s = settings_from(&[]).unwrap();
            assert_eq!(s.port, 8000);
            assert_eq!(s.market_data_retries, 3);
            assert_eq!(s.min_history, 5);
            assert!((s.interval_width - 0.8).abs() < 1e-12);
            assert!(s.sentry_dsn.is_none());
        }

        #[test]
        fn blank_values_count_as_unset() {
            let s = settings_from(&[("PORT", "  "), ("SENTRY_DSN", "")]).unwrap();
            assert_eq!(s.port, 8000);
            assert!(s.sentry_dsn.is_none());
        }

        #[test]
        fn malformed_number_names_the_key() {
            let err = settings_from(&[("PORT", "eighty")]).unwrap_err();
            assert!(format!("{err:#}").contains("PORT"));
        }

        #[test]
        fn rejects_out_of_range_interval_width() {
            assert!(settings_from(&[("FORECAST_INTERVAL_WIDTH", "1.5")]).is_err());
            assert!(settings_from(&[("FORECAST_MIN_HISTORY", "1")]).is_err());
        }
    }
}
