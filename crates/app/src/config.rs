//! Client configuration

use std::{num::NonZeroU32, path::PathBuf, time::Duration};

use clap::{Args, Parser};
use storefront::catalog::DEFAULT_PAGE_SIZE;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    #[default]
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
}

/// Storefront client settings, flattened into the command line parser.
#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// Base URL of the storefront REST service
    #[arg(
        long,
        env = "STOREFRONT_API_URL",
        default_value = "http://127.0.0.1:3000",
        global = true
    )]
    pub api_url: String,

    /// Directory holding the persisted cart
    #[arg(
        long,
        env = "STOREFRONT_DATA_DIR",
        default_value = ".storefront",
        global = true
    )]
    pub data_dir: PathBuf,

    /// Bearer credential; guest mode when omitted
    #[arg(long, env = "STOREFRONT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Products per catalog page
    #[arg(long, env = "STOREFRONT_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    pub page_size: NonZeroU32,

    /// ISO currency code used to format prices
    #[arg(long, env = "STOREFRONT_CURRENCY", default_value = "VND", global = true)]
    pub currency: String,

    /// How long notifications stay visible, in milliseconds
    #[arg(
        long,
        env = "STOREFRONT_NOTIFICATION_TTL_MS",
        default_value_t = 3_000,
        global = true
    )]
    pub notification_ttl_ms: u64,

    /// HTTP request timeout, in milliseconds
    #[arg(
        long,
        env = "STOREFRONT_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        global = true
    )]
    pub request_timeout_ms: u64,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Load configuration from environment and CLI arguments
///
/// # Errors
///
/// Returns an error if configuration cannot be parsed
pub fn load<P: Parser>() -> Result<P, clap::Error> {
    // Load .env file if present (ignore if missing)
    _ = dotenvy::dotenv();

    P::try_parse()
}

impl ClientConfig {
    /// Notification time to live.
    #[must_use]
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    /// HTTP request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
#[derive(Debug, Parser)]
struct TestCli {
    #[command(flatten)]
    config: ClientConfig,
}

/// Parses settings from an argument list, without reading `.env`.
#[cfg(test)]
pub(crate) fn parse_from<I, T>(args: I) -> Result<ClientConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    TestCli::try_parse_from(args).map(|cli| cli.config)
}
