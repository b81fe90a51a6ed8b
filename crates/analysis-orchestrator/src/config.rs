use analysis_core::AnalysisError;
use chrono::Duration;
use ml_client::MLConfig;
use std::str::FromStr;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 64;
pub const DEFAULT_NEWS_LIMIT: u32 = 20;
/// Polygon free tier.
pub const DEFAULT_RATE_LIMIT: usize = 5;

/// Runtime settings for a dashboard process, read from the environment
/// (after `.env` has been loaded by the binary).
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub polygon_api_key: String,
    /// Requests per minute.
    pub polygon_rate_limit: usize,
    pub ml: MLConfig,
    pub cache_ttl_secs: i64,
    pub cache_max_entries: usize,
    /// Headlines requested from the news source before dedup.
    pub news_limit: u32,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        let polygon_api_key = std::env::var("POLYGON_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AnalysisError::InvalidData("POLYGON_API_KEY must be set".to_string()))?;

        Ok(Self {
            polygon_api_key,
            polygon_rate_limit: env_or("POLYGON_RATE_LIMIT", DEFAULT_RATE_LIMIT).max(1),
            ml: MLConfig::from_env(),
            cache_ttl_secs: env_or("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS).max(0),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES).max(1),
            news_limit: env_or("NEWS_LIMIT", DEFAULT_NEWS_LIMIT).max(1),
        })
    }

    /// Cache lifetime; a value chrono cannot represent falls back to the default.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_seconds(self.cache_ttl_secs).unwrap_or_else(|| {
            tracing::warn!(
                "CACHE_TTL_SECS={} is out of range, using {}",
                self.cache_ttl_secs,
                DEFAULT_CACHE_TTL_SECS
            );
            Duration::seconds(DEFAULT_CACHE_TTL_SECS)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_ttl(cache_ttl_secs: i64) -> DashboardConfig {
        DashboardConfig {
            polygon_api_key: "key".to_string(),
            polygon_rate_limit: DEFAULT_RATE_LIMIT,
            ml: MLConfig::default(),
            cache_ttl_secs,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            news_limit: DEFAULT_NEWS_LIMIT,
        }
    }

    #[test]
    fn test_cache_ttl_out_of_range_uses_default() {
        assert_eq!(config_with_ttl(60).cache_ttl(), Duration::seconds(60));
        assert_eq!(config_with_ttl(0).cache_ttl(), Duration::zero());
        assert_eq!(config_with_ttl(i64::MAX).cache_ttl(), Duration::seconds(DEFAULT_CACHE_TTL_SECS));
    }

    // Only this test touches these variables; the others are read with defaults.
    #[test]
    fn test_from_env_requires_key_and_parses_overrides() {
        std::env::remove_var("POLYGON_API_KEY");
        assert!(matches!(DashboardConfig::from_env(), Err(AnalysisError::InvalidData(_))));

        std::env::set_var("POLYGON_API_KEY", "  test-key ");
        std::env::set_var("CACHE_TTL_SECS", "60");
        std::env::set_var("NEWS_LIMIT", "not-a-number");

        let config = DashboardConfig::from_env().unwrap();
        assert_eq!(config.polygon_api_key, "test-key");
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.news_limit, DEFAULT_NEWS_LIMIT);

        std::env::remove_var("POLYGON_API_KEY");
        std::env::remove_var("CACHE_TTL_SECS");
        std::env::remove_var("NEWS_LIMIT");
    }
}
