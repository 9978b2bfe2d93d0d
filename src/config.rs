//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparseable numeric and
//! boolean values fall back to defaults; an invalid listen address, data
//! source or log format is a startup error.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Default snapshot lifetime: 15 days.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 15 * 24 * 60 * 60;

/// Default bound on a whole BigQuery fetch, polling and paging included.
pub const DEFAULT_QUERY_DEADLINE_SECS: u64 = 300;

/// Where the homeowners table is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Google BigQuery REST API.
    BigQuery,
    /// Local JSON file containing an array of row objects.
    File,
}

impl FromStr for DataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bigquery" | "bq" => Ok(Self::BigQuery),
            "file" | "json" => Ok(Self::File),
            other => anyhow::bail!("unknown data source: {other}"),
        }
    }
}

/// Log output format for `tracing-subscriber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("text") || s.eq_ignore_ascii_case("pretty") {
            Ok(Self::Text)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            anyhow::bail!("unknown log format: {s}")
        }
    }
}

/// BigQuery table coordinates and REST client settings.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// GCP project that owns the table and runs the query job.
    pub project: String,
    /// Dataset containing the table.
    pub dataset: String,
    /// Table name.
    pub table: String,
    /// OAuth2 bearer token. Requests are sent unauthenticated when absent.
    pub access_token: Option<String>,
    /// REST API base URL, without trailing slash.
    pub api_base: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Upper bound on one full fetch, across every poll and page.
    pub query_deadline: Duration,
}

impl BigQueryConfig {
    /// Fully qualified table reference in standard SQL form.
    #[must_use]
    pub fn table_ref(&self) -> String {
        format!("`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// Which loader backs the dataset cache.
    pub data_source: DataSource,

    /// BigQuery settings, used when `data_source` is [`DataSource::BigQuery`].
    pub bigquery: BigQueryConfig,

    /// JSON file path, used when `data_source` is [`DataSource::File`].
    pub data_file: PathBuf,

    /// Maximum snapshot age before the next read refreshes it.
    pub cache_ttl: Duration,

    /// Whether to load the dataset once before accepting requests.
    pub cache_warm_on_start: bool,

    /// Log output format.
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` cannot be parsed as a
    /// [`SocketAddr`], `DATA_SOURCE` names an unknown loader, or
    /// `LOG_FORMAT` is neither `text` nor `json`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "0.0.0.0:8000")
            .parse()
            .context("invalid LISTEN_ADDR")?;

        let data_source: DataSource = env_or("DATA_SOURCE", "bigquery")
            .parse()
            .context("invalid DATA_SOURCE")?;

        let bigquery = BigQueryConfig {
            project: env_or("BQ_PROJECT", "rfmdmarketing"),
            dataset: env_or("BQ_DATASET", "rfmdAnalysis"),
            table: env_or("BQ_TABLE", "homeowners"),
            access_token: std::env::var("BQ_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            api_base: env_or("BQ_API_BASE", "https://bigquery.googleapis.com/bigquery/v2")
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(parse_env("BQ_TIMEOUT_SECS", 60)),
            query_deadline: Duration::from_secs(parse_env(
                "BQ_QUERY_DEADLINE_SECS",
                DEFAULT_QUERY_DEADLINE_SECS,
            )),
        };

        let data_file = PathBuf::from(env_or("DATA_FILE", "data/homeowners.json"));
        let cache_ttl = Duration::from_secs(parse_env("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS));
        let cache_warm_on_start = parse_env_bool("CACHE_WARM_ON_START", true);

        let log_format: LogFormat = env_or("LOG_FORMAT", "text")
            .parse()
            .context("invalid LOG_FORMAT")?;

        Ok(Self {
            listen_addr,
            data_source,
            bigquery,
            data_file,
            cache_ttl,
            cache_warm_on_start,
            log_format,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
