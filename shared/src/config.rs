use std::env;

use chrono::Duration;

pub const TABLE_NAME_VAR: &str = "TABLE_NAME";
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
pub const TOKEN_TTL_VAR: &str = "TOKEN_TTL_SECONDS";

/// Access tokens live for 30 days unless overridden.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Process configuration, read once at cold start.
///
/// Missing values are kept as `None` rather than failing startup: handlers
/// that need them answer 500 and everything else keeps working.
#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: Option<String>,
    pub jwt_secret: Option<String>,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let default_ttl = Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS);
        let token_ttl = match non_empty(TOKEN_TTL_VAR).map(|v| v.parse::<i64>()) {
            Some(Ok(secs)) if secs > 0 && secs <= MAX_TOKEN_TTL_SECONDS => {
                Duration::try_seconds(secs).unwrap_or(default_ttl)
            }
            Some(_) => {
                tracing::warn!(
                    "{} is not a number of seconds between 1 and {}, using default",
                    TOKEN_TTL_VAR,
                    MAX_TOKEN_TTL_SECONDS
                );
                default_ttl
            }
            None => default_ttl,
        };

        let config = Self {
            table_name: non_empty(TABLE_NAME_VAR),
            jwt_secret: non_empty(JWT_SECRET_VAR),
            token_ttl,
        };

        if config.table_name.is_none() {
            tracing::error!("{} is not set; data routes will fail", TABLE_NAME_VAR);
        }
        if config.jwt_secret.is_none() {
            tracing::error!("{} is not set; tokens cannot be issued or verified", JWT_SECRET_VAR);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn reads_all_values() {
        let config = Config::from_lookup(lookup(&[
            ("TABLE_NAME", "listings"),
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_SECONDS", "3600"),
        ]));
        assert_eq!(config.table_name.as_deref(), Some("listings"));
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.token_ttl, Duration::hours(1));
    }

    #[test]
    fn missing_and_blank_values_are_none() {
        let config = Config::from_lookup(lookup(&[("TABLE_NAME", "  ")]));
        assert!(config.table_name.is_none());
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.token_ttl, Duration::days(30));
    }

    #[test]
    fn bad_ttl_falls_back_to_default() {
        for raw in ["soon", "-5", "0", "9300000000000000", "10000000000000", "9223372036854775807"] {
            let config = Config::from_lookup(lookup(&[("TOKEN_TTL_SECONDS", raw)]));
            assert_eq!(config.token_ttl, Duration::days(30));
        }
    }

    #[test]
    fn ttl_up_to_ten_years_is_accepted() {
        let ten_years = MAX_TOKEN_TTL_SECONDS.to_string();
        let config = Config::from_lookup(lookup(&[("TOKEN_TTL_SECONDS", ten_years.as_str())]));
        assert_eq!(config.token_ttl, Duration::seconds(MAX_TOKEN_TTL_SECONDS));

        let over = (MAX_TOKEN_TTL_SECONDS + 1).to_string();
        let config = Config::from_lookup(lookup(&[("TOKEN_TTL_SECONDS", over.as_str())]));
        assert_eq!(config.token_ttl, Duration::days(30));
    }
}
