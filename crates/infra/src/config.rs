//! Process settings, read from the environment (and an optional `.env`).

use std::net::SocketAddr;

use thiserror::Error;

use surety_observability::LogFormat;

pub const PROJECT_NAME_VAR: &str = "SURETY_PROJECT_NAME";
pub const BIND_ADDR_VAR: &str = "SURETY_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const LOG_FORMAT_VAR: &str = "SURETY_LOG_FORMAT";

const DEFAULT_PROJECT_NAME: &str = "SuretyDAO";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub project_name: String,
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection string. In-memory stores when absent.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load from the process environment, after applying `.env` if present.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is the normal case outside local development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_name =
            non_blank(PROJECT_NAME_VAR).unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

        let bind_raw = non_blank(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.trim().parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            var: BIND_ADDR_VAR,
            reason: format!("{bind_raw:?}: {e}"),
        })?;

        let log_format = match non_blank(LOG_FORMAT_VAR) {
            Some(raw) => raw.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                var: LOG_FORMAT_VAR,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            project_name,
            bind_addr,
            database_url: non_blank(DATABASE_URL_VAR),
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.project_name, "SuretyDAO");
        assert_eq!(s.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(s.database_url, None);
        assert_eq!(s.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let s = settings(&[(DATABASE_URL_VAR, "  "), (PROJECT_NAME_VAR, "")]).unwrap();
        assert_eq!(s.database_url, None);
        assert_eq!(s.project_name, "SuretyDAO");
    }

    #[test]
    fn explicit_values_are_used() {
        let s = settings(&[
            (PROJECT_NAME_VAR, "Surety Staging"),
            (BIND_ADDR_VAR, "127.0.0.1:9000"),
            (DATABASE_URL_VAR, "postgres://localhost/surety"),
            (LOG_FORMAT_VAR, "pretty"),
        ])
        .unwrap();
        assert_eq!(s.project_name, "Surety Staging");
        assert_eq!(s.bind_addr.port(), 9000);
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/surety"));
        assert_eq!(s.log_format, LogFormat::Pretty);
    }

    #[test]
    fn invalid_values_are_typed_errors() {
        let err = settings(&[(BIND_ADDR_VAR, "not-an-addr")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: BIND_ADDR_VAR, .. }));

        let err = settings(&[(LOG_FORMAT_VAR, "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: LOG_FORMAT_VAR, .. }));
    }
}
