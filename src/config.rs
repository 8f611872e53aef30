use std::time::Duration;

/// Runtime configuration, read from the environment with defaults
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// When absent the in-memory store is used
    pub redis_url: Option<String>,
    pub room_ttl: Duration,
    /// Network timeout applied to every store call
    pub store_timeout: Duration,
    pub secure_cookies: bool,
}

pub const DEFAULT_ROOM_TTL_SECONDS: u64 = 60 * 10;

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            redis_url: std::env::var("REDIS_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            room_ttl: env_parse("ROOM_TTL_SECONDS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_ttl),
            store_timeout: env_parse("STORE_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            secure_cookies: env_parse("COOKIE_SECURE").unwrap_or(defaults.secure_cookies),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            redis_url: None,
            room_ttl: Duration::from_secs(DEFAULT_ROOM_TTL_SECONDS),
            store_timeout: Duration::from_millis(2000),
            secure_cookies: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.room_ttl, Duration::from_secs(600));
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.redis_url.is_none());
        assert!(config.secure_cookies);
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        std::env::set_var("GHOSTROOM_TEST_GARBAGE", "ten minutes");
        assert_eq!(env_parse::<u64>("GHOSTROOM_TEST_GARBAGE"), None);

        std::env::set_var("GHOSTROOM_TEST_NUMBER", " 42 ");
        assert_eq!(env_parse::<u64>("GHOSTROOM_TEST_NUMBER"), Some(42));
    }
}
