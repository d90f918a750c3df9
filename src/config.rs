use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::FixedOffset;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from `SALAT_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub api_base: String,
    pub method: u8,
    pub school: u8,
    pub cache_ttl_secs: i64,
    /// Offset of the local clock prayer times are expressed in.
    pub utc_offset: FixedOffset,
    pub notifications_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let offset_minutes: i32 = parse_or(&lookup, "SALAT_UTC_OFFSET_MINUTES", 60)?;
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or(ConfigError::Invalid {
            key: "SALAT_UTC_OFFSET_MINUTES",
            value: offset_minutes.to_string(),
        })?;

        let cache_ttl_secs: i64 = parse_or(&lookup, "SALAT_CACHE_TTL_SECS", 3600)?;
        if cache_ttl_secs < 0 {
            return Err(ConfigError::Invalid {
                key: "SALAT_CACHE_TTL_SECS",
                value: cache_ttl_secs.to_string(),
            });
        }

        Ok(Self {
            addr: parse_or(&lookup, "SALAT_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            db_path: lookup("SALAT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/db/salat.sqlite")),
            api_base: lookup("SALAT_API_BASE").unwrap_or_else(|| "https://api.aladhan.com".to_string()),
            method: parse_or(&lookup, "SALAT_METHOD", 3)?,
            school: parse_or(&lookup, "SALAT_SCHOOL", 0)?,
            cache_ttl_secs,
            utc_offset,
            notifications_enabled: parse_or(&lookup, "SALAT_NOTIFICATIONS", false)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.addr.to_string(), "127.0.0.1:3000");
        assert_eq!(cfg.method, 3);
        assert_eq!(cfg.school, 0);
        assert_eq!(cfg.cache_ttl_secs, 3600);
        assert_eq!(cfg.utc_offset.local_minus_utc(), 3600);
        assert!(!cfg.notifications_enabled);
        assert_eq!(cfg.api_base, "https://api.aladhan.com");
    }

    #[test]
    fn overrides() {
        let cfg = from_pairs(&[
            ("SALAT_ADDR", "0.0.0.0:8080"),
            ("SALAT_SCHOOL", "1"),
            ("SALAT_UTC_OFFSET_MINUTES", "-300"),
            ("SALAT_NOTIFICATIONS", "true"),
            ("SALAT_DB_PATH", "/tmp/x.sqlite"),
        ])
        .unwrap();
        assert_eq!(cfg.addr.port(), 8080);
        assert_eq!(cfg.school, 1);
        assert_eq!(cfg.utc_offset.local_minus_utc(), -300 * 60);
        assert!(cfg.notifications_enabled);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.sqlite"));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            from_pairs(&[("SALAT_METHOD", "isna")]).unwrap_err(),
            ConfigError::Invalid { key: "SALAT_METHOD", value: "isna".into() }
        );
        assert!(from_pairs(&[("SALAT_UTC_OFFSET_MINUTES", "100000")]).is_err());
        assert!(from_pairs(&[("SALAT_CACHE_TTL_SECS", "-1")]).is_err());
    }
}
