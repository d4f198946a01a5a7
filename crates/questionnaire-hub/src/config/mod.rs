use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use jsonwebtoken::Algorithm;

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
    pub auth: AuthConfig,
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
        let base_path = optional("APP_BASE_PATH")
            .map(|path| normalize_base_path(&path))
            .transpose()?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = optional("APP_LOG_FORMAT")
            .map(|raw| LogFormat::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        let jwks_refresh_secs = match optional("AUTH_JWKS_REFRESH_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidRefreshInterval)?,
            None => DEFAULT_JWKS_REFRESH_SECS,
        };
        let algorithms = match optional("AUTH_ALLOWED_ALGORITHMS") {
            Some(raw) => parse_algorithms(&raw)?,
            None => vec![Algorithm::RS256],
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                base_path,
            },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            auth: AuthConfig {
                jwks_url: optional("AUTH_JWKS_URL"),
                issuer: optional("AUTH_ISSUER"),
                audience: optional("AUTH_AUDIENCE"),
                jwks_refresh_secs,
                algorithms,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every API route is nested under, e.g. `/questionnaire-service`.
    pub base_path: Option<String>,
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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Full,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "full" => Ok(Self::Full),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

pub const DEFAULT_JWKS_REFRESH_SECS: u64 = 24 * 60 * 60;

/// Identity provider settings. Without a key-set URL every bearer token is refused.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub jwks_refresh_secs: u64,
    pub algorithms: Vec<Algorithm>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_base_path(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(ConfigError::InvalidBasePath(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            Algorithm::from_str(name).map_err(|_| ConfigError::InvalidAlgorithm(name.to_string()))
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBasePath(String),
    InvalidLogFormat(String),
    InvalidRefreshInterval,
    InvalidAlgorithm(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBasePath(value) => {
                write!(f, "APP_BASE_PATH must start with '/' (got '{value}')")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be compact, pretty, or full (got '{value}')")
            }
            ConfigError::InvalidRefreshInterval => {
                write!(f, "AUTH_JWKS_REFRESH_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidAlgorithm(value) => {
                write!(f, "AUTH_ALLOWED_ALGORITHMS contains unknown algorithm '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
