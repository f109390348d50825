use chrono::Duration;
use chrono_tz::Tz;
use regex::Regex;
use std::env;
use std::sync::OnceLock;

#[derive(Clone, Debug)]
pub struct Config {
    pub service_name: String,
    pub out_of_office_suppression_window: Duration,
    pub default_timezone: Tz,
    pub metrics_port: Option<u16>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "convopulse".to_string(),
            out_of_office_suppression_window: Duration::minutes(5),
            default_timezone: Tz::UTC,
            metrics_port: None,
            log_filter: "convopulse=info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let service_name = env::var("SERVICE_NAME").unwrap_or(defaults.service_name);

        let out_of_office_suppression_window = match env::var("OUT_OF_OFFICE_SUPPRESSION_WINDOW") {
            Ok(raw) => parse_duration(&raw)?,
            Err(_) => defaults.out_of_office_suppression_window,
        };

        let default_timezone = match env::var("DEFAULT_TIMEZONE") {
            Ok(raw) => raw
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(raw))?,
            Err(_) => defaults.default_timezone,
        };

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidPort)?),
            Err(_) => None,
        };

        let log_filter = env::var("LOG_FILTER").unwrap_or(defaults.log_filter);

        Ok(Config {
            service_name,
            out_of_office_suppression_window,
            default_timezone,
            metrics_port,
            log_filter,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid duration {0:?}, expected a positive <number><m|h|d>")]
    InvalidDuration(String),
}

/// Parse a window such as `90m`, `4h` or `2d`. Zero and values too large to
/// represent are rejected.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    static WINDOW: OnceLock<Regex> = OnceLock::new();
    let window = WINDOW.get_or_init(|| {
        Regex::new(r"^\s*(?P<amount>\d+)\s*(?P<unit>[mhd])\s*$").expect("Invalid window regex")
    });
    let invalid = || ConfigError::InvalidDuration(raw.to_string());

    let caps = window.captures(raw).ok_or_else(invalid)?;
    let amount: i64 = caps["amount"].parse().map_err(|_| invalid())?;
    let unit_seconds: i64 = match &caps["unit"] {
        "m" => 60,
        "h" => 60 * 60,
        _ => 24 * 60 * 60,
    };

    amount
        .checked_mul(unit_seconds)
        .filter(|seconds| *seconds > 0)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}
