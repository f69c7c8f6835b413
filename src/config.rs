//! Runtime configuration from environment variables (and an optional `.env`).

use crate::constants::{
    KEEP_GRACE_HOURS, MAX_HELPS_PER_USER, MAX_SUBSCRIPTIONS_PER_USER, NOTIFY_ENQUEUE_TIMEOUT_MS,
    NOTIFY_QUEUE_CAPACITY, RETENTION_DAYS, SHUTDOWN_DRAIN_SECS, SWEEP_INTERVAL_SECS,
};
use crate::i18n::Lang;
use chrono::TimeDelta;
use chrono_tz::Tz;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StorageKind::Postgres),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!("expected `postgres` or `memory`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub language: Lang,
    pub timezone: Tz,
    pub max_helps_per_user: i64,
    pub max_subscriptions_per_user: i64,
    pub retention: TimeDelta,
    pub keep_grace: TimeDelta,
    /// Never zero.
    pub sweep_interval: Duration,
    pub notify_queue_capacity: usize,
    pub notify_enqueue_timeout: Duration,
    pub shutdown_drain: Duration,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token =
            get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let storage = parse_or(&get, "STORAGE", StorageKind::Postgres)?;
        let database_url = get("DATABASE_URL");
        if storage == StorageKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            telegram_token,
            storage,
            database_url,
            database_max_connections: positive_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?,
            language: parse_or(&get, "BOT_LANGUAGE", Lang::Ua)?,
            timezone: parse_or(&get, "BOT_TIMEZONE", chrono_tz::Europe::Kyiv)?,
            max_helps_per_user: parse_or(&get, "MAX_HELPS_PER_USER", MAX_HELPS_PER_USER)?,
            max_subscriptions_per_user: parse_or(
                &get,
                "MAX_SUBSCRIPTIONS_PER_USER",
                MAX_SUBSCRIPTIONS_PER_USER,
            )?,
            retention: span_or(&get, "RETENTION_DAYS", RETENTION_DAYS, TimeDelta::try_days)?,
            keep_grace: span_or(&get, "KEEP_GRACE_HOURS", KEEP_GRACE_HOURS, TimeDelta::try_hours)?,
            sweep_interval: Duration::from_secs(positive_or(
                &get,
                "SWEEP_INTERVAL_SECS",
                SWEEP_INTERVAL_SECS,
            )?),
            notify_queue_capacity: parse_or(&get, "NOTIFY_QUEUE_CAPACITY", NOTIFY_QUEUE_CAPACITY)?,
            notify_enqueue_timeout: Duration::from_millis(parse_or(
                &get,
                "NOTIFY_ENQUEUE_TIMEOUT_MS",
                NOTIFY_ENQUEUE_TIMEOUT_MS,
            )?),
            shutdown_drain: Duration::from_secs(parse_or(
                &get,
                "SHUTDOWN_DRAIN_SECS",
                SHUTDOWN_DRAIN_SECS,
            )?),
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Like `parse_or`, rejecting zero.
fn positive_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq + ToString,
    T::Err: Display,
{
    let value = parse_or(get, var, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

/// A positive count of days / hours that fits in a `TimeDelta`.
fn span_or(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
    make: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta, ConfigError> {
    let count: i64 = parse_or(get, var, default)?;
    match make(count) {
        Some(span) if count > 0 => Ok(span),
        _ => Err(ConfigError::Invalid {
            var,
            value: count.to_string(),
            reason: "must be a positive number within range".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("TELEGRAM_BOT_TOKEN", "t"), ("DATABASE_URL", "postgres://x")]).unwrap();
        assert_eq!(cfg.storage, StorageKind::Postgres);
        assert_eq!(cfg.max_helps_per_user, 2);
        assert_eq!(cfg.max_subscriptions_per_user, 5);
        assert_eq!(cfg.language, Lang::Ua);
        assert_eq!(cfg.timezone, chrono_tz::Europe::Kyiv);
        assert_eq!(cfg.sweep_interval, Duration::from_secs(86_400));
        assert_eq!(cfg.retention, TimeDelta::days(10));
        assert_eq!(cfg.keep_grace, TimeDelta::hours(24));
        assert_eq!(cfg.notify_queue_capacity, 100);
    }

    #[test]
    fn memory_storage_needs_no_database() {
        let cfg = config(&[("TELEGRAM_BOT_TOKEN", "t"), ("STORAGE", "memory")]).unwrap();
        assert_eq!(cfg.storage, StorageKind::Memory);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn missing_token_and_database_are_reported() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))));
        assert!(matches!(
            config(&[("TELEGRAM_BOT_TOKEN", "t")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = config(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("STORAGE", "memory"),
            ("MAX_HELPS_PER_USER", "many"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("MAX_HELPS_PER_USER"));
    }

    #[test]
    fn language_and_timezone_overrides() {
        let cfg = config(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("STORAGE", "memory"),
            ("BOT_LANGUAGE", "en"),
            ("BOT_TIMEZONE", "Europe/Warsaw"),
        ])
        .unwrap();
        assert_eq!(cfg.language, Lang::En);
        assert_eq!(cfg.timezone, chrono_tz::Europe::Warsaw);
    }

    fn rejected(var: &'static str, value: &str) -> ConfigError {
        config(&[("TELEGRAM_BOT_TOKEN", "t"), ("STORAGE", "memory"), (var, value)]).unwrap_err()
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = rejected("SWEEP_INTERVAL_SECS", "0");
        assert!(matches!(err, ConfigError::Invalid { var: "SWEEP_INTERVAL_SECS", .. }));
    }

    #[test]
    fn sweep_spans_must_be_positive_and_in_range() {
        for (var, value) in [
            ("RETENTION_DAYS", "0"),
            ("RETENTION_DAYS", "-3"),
            ("RETENTION_DAYS", "9223372036854775807"),
            ("KEEP_GRACE_HOURS", "0"),
            ("KEEP_GRACE_HOURS", "9223372036854775807"),
        ] {
            let err = rejected(var, value);
            assert!(
                matches!(&err, ConfigError::Invalid { var: v, .. } if *v == var),
                "{var}={value}: {err}"
            );
        }
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err = rejected("DATABASE_MAX_CONNECTIONS", "0");
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
    }
}
