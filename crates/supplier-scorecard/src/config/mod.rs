use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::scorecard::reference::ReferenceSources;
use crate::scorecard::service::ScorecardSettings;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub sheets: SheetsConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let sheets = SheetsConfig {
            questions_document: non_empty_var("SCORECARD_QUESTIONS_SHEET_ID").unwrap_or_default(),
            access_document: non_empty_var("SCORECARD_ACCESS_SHEET_ID").unwrap_or_default(),
            responses_document: non_empty_var("SCORECARD_RESPONSES_SHEET_ID").unwrap_or_default(),
            questions_table: non_empty_var("SCORECARD_QUESTIONS_TABLE")
                .unwrap_or_else(|| "Perguntas".to_string()),
            access_table: non_empty_var("SCORECARD_ACCESS_TABLE")
                .unwrap_or_else(|| "Acessos".to_string()),
            categories_table: non_empty_var("SCORECARD_CATEGORIES_TABLE")
                .unwrap_or_else(|| "Categorias".to_string()),
            credentials_path: non_empty_var("SCORECARD_CREDENTIALS_PATH").map(PathBuf::from),
        };

        if sheets.credentials_path.is_some() {
            sheets.validate()?;
        }

        let admin = AdminConfig {
            password: non_empty_var("SCORECARD_ADMIN_PASSWORD"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            sheets,
            admin,
        })
    }

    /// Settings consumed by the scorecard service.
    pub fn scorecard_settings(&self) -> ScorecardSettings {
        ScorecardSettings {
            sources: ReferenceSources {
                questions_document: self.sheets.questions_document.clone(),
                questions_table: self.sheets.questions_table.clone(),
                access_document: self.sheets.access_document.clone(),
                access_table: self.sheets.access_table.clone(),
                categories_table: self.sheets.categories_table.clone(),
            },
            responses_document: self.sheets.responses_document.clone(),
            admin_password: self.admin.password.clone(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Spreadsheet documents and tables holding the scorecard data.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub questions_document: String,
    pub access_document: String,
    pub responses_document: String,
    pub questions_table: String,
    pub access_table: String,
    pub categories_table: String,
    /// Service-account key. Without it the server runs on an in-memory store.
    pub credentials_path: Option<PathBuf>,
}

impl SheetsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("SCORECARD_QUESTIONS_SHEET_ID", &self.questions_document),
            ("SCORECARD_ACCESS_SHEET_ID", &self.access_document),
            ("SCORECARD_RESPONSES_SHEET_ID", &self.responses_document),
        ];

        match required.iter().find(|(_, value)| value.is_empty()) {
            Some((key, _)) => Err(ConfigError::MissingDocument { key }),
            None => Ok(()),
        }
    }
}

/// Administrator credential. Admin login is disabled when no password is set.
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    pub password: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingDocument { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingDocument { key } => {
                write!(f, "{key} is required when SCORECARD_CREDENTIALS_PATH is set")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::MissingDocument { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SCORECARD_QUESTIONS_SHEET_ID",
            "SCORECARD_ACCESS_SHEET_ID",
            "SCORECARD_RESPONSES_SHEET_ID",
            "SCORECARD_QUESTIONS_TABLE",
            "SCORECARD_ACCESS_TABLE",
            "SCORECARD_CATEGORIES_TABLE",
            "SCORECARD_CREDENTIALS_PATH",
            "SCORECARD_ADMIN_PASSWORD",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.sheets.questions_table, "Perguntas");
        assert_eq!(config.sheets.access_table, "Acessos");
        assert_eq!(config.sheets.categories_table, "Categorias");
        assert!(config.sheets.credentials_path.is_none());
        assert!(config.admin.password.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn credentials_require_document_ids() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORECARD_CREDENTIALS_PATH", "/tmp/key.json");
        env::set_var("SCORECARD_QUESTIONS_SHEET_ID", "questions");
        match AppConfig::load() {
            Err(ConfigError::MissingDocument { key }) => {
                assert_eq!(key, "SCORECARD_ACCESS_SHEET_ID")
            }
            other => panic!("expected missing document error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn settings_carry_admin_password_and_sources() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORECARD_ADMIN_PASSWORD", "  s3cret ");
        env::set_var("SCORECARD_RESPONSES_SHEET_ID", "responses");
        let settings = AppConfig::load().expect("config loads").scorecard_settings();
        assert_eq!(settings.admin_password.as_deref(), Some("s3cret"));
        assert_eq!(settings.responses_document, "responses");
        assert_eq!(settings.sources.access_table, "Acessos");
        reset_env();
    }
}
