use std::num::NonZeroU32;
use time::Duration;
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 30;
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;
pub const DEFAULT_PASSWORD_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub password_iterations: NonZeroU32,
    pub cors_origin: Option<String>,
    pub admin: Option<AdminSeed>,
    pub seed_options: Vec<String>,
}

impl AppConfig {
    /// Reads settings through `lookup`, normally the shuttle secret store.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl_hours = match get("TOKEN_TTL_HOURS") {
            Some(value) => value.parse::<i64>().ok().filter(|h| (1..=MAX_TOKEN_TTL_HOURS).contains(h))
                .ok_or(ConfigError::Invalid { key: "TOKEN_TTL_HOURS", value })?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        let password_iterations = match get("PASSWORD_ITERATIONS") {
            Some(value) => value.parse::<u32>().ok().and_then(NonZeroU32::new)
                .ok_or(ConfigError::Invalid { key: "PASSWORD_ITERATIONS", value })?,
            None => DEFAULT_PASSWORD_ITERATIONS,
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
                email,
                password,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        let seed_options = get("VOTE_OPTIONS")
            .map(|raw| raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect())
            .unwrap_or_default();

        Ok(Self {
            jwt_secret,
            token_ttl: Duration::hours(token_ttl_hours),
            password_iterations,
            cors_origin: get("CORS_ORIGIN"),
            admin,
            seed_options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let secrets: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| secrets.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl, Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
        assert_eq!(config.password_iterations, DEFAULT_PASSWORD_ITERATIONS);
        assert_eq!(config.cors_origin, None);
        assert_eq!(config.admin, None);
        assert!(config.seed_options.is_empty());
    }

    #[test]
    fn test_secret_is_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert_eq!(config(&[("JWT_SECRET", "  ")]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_HOURS", "2"),
            ("PASSWORD_ITERATIONS", "1000"),
            ("CORS_ORIGIN", "https://vote.example.com"),
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "hunter22"),
            ("VOTE_OPTIONS", "Option A, Option B,,"),
        ]).unwrap();

        assert_eq!(config.token_ttl, Duration::hours(2));
        assert_eq!(config.password_iterations.get(), 1000);
        assert_eq!(config.cors_origin.as_deref(), Some("https://vote.example.com"));
        assert_eq!(config.admin, Some(AdminSeed {
            username: "admin".into(),
            email: "root@example.com".into(),
            password: "hunter22".into(),
        }));
        assert_eq!(config.seed_options, ["Option A", "Option B"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("JWT_SECRET", "x"), ("TOKEN_TTL_HOURS", "soon")]),
            Err(ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. })
        ));
        for hours in ["0", "-5", "1000000000", "87601"] {
            assert!(matches!(
                config(&[("JWT_SECRET", "x"), ("TOKEN_TTL_HOURS", hours)]),
                Err(ConfigError::Invalid { key: "TOKEN_TTL_HOURS", .. })
            ), "accepted TOKEN_TTL_HOURS={}", hours);
        }
        let longest = MAX_TOKEN_TTL_HOURS.to_string();
        assert!(config(&[("JWT_SECRET", "x"), ("TOKEN_TTL_HOURS", longest.as_str())]).is_ok());
        assert!(matches!(
            config(&[("JWT_SECRET", "x"), ("PASSWORD_ITERATIONS", "0")]),
            Err(ConfigError::Invalid { key: "PASSWORD_ITERATIONS", .. })
        ));
        assert_eq!(
            config(&[("JWT_SECRET", "x"), ("ADMIN_EMAIL", "root@example.com")]).unwrap_err(),
            ConfigError::Missing("ADMIN_PASSWORD")
        );
    }
}
