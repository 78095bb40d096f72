//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::*;

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "matchday";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DATABASE_URL: &str = "sqlite://matchday.sqlite?mode=rwc";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_REMOTE_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_REMOTE_READ_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_REMOTE_WRITE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REMOTE_READ_RETRIES: u32 = 2;
const DEFAULT_REMOTE_RETRY_BACKOFF_MS: u64 = 300;
const MAX_REMOTE_READ_RETRIES: u32 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 5;
const DEFAULT_CACHE_STATS_TTL_SECS: u64 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub remote: RemoteSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
}

/// How the match service is reached.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: Url,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub read_retries: u32,
    pub retry_backoff: Duration,
    pub check_eligibility: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub stats_ttl: Duration,
    pub serve_stale: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MATCHDAY").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::SyncMirror(args)) => {
            raw.apply_database_override(&args.database);
            raw.apply_remote_override(&args.remote);
        }
        Some(Command::PurgeVotes(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    remote: RawRemoteSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_database_override(&overrides.database);
        self.apply_remote_override(&overrides.remote);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(value) = overrides.remote_read_timeout_ms {
            self.remote.read_timeout_ms = Some(value);
        }
        if let Some(value) = overrides.remote_write_timeout_ms {
            self.remote.write_timeout_ms = Some(value);
        }
        if let Some(value) = overrides.remote_read_retries {
            self.remote.read_retries = Some(value);
        }
        if let Some(value) = overrides.remote_retry_backoff_ms {
            self.remote.retry_backoff_ms = Some(value);
        }
        if let Some(value) = overrides.remote_check_eligibility {
            self.remote.check_eligibility = Some(value);
        }
        if let Some(value) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(value);
        }
        if let Some(value) = overrides.cache_stats_ttl_seconds {
            self.cache.stats_ttl_seconds = Some(value);
        }
        if let Some(value) = overrides.cache_serve_stale {
            self.cache.serve_stale = Some(value);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }

    fn apply_remote_override(&mut self, overrides: &RemoteOverride) {
        if let Some(url) = overrides.remote_base_url.as_ref() {
            self.remote.base_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            remote,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            remote: build_remote_settings(remote)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    if url.is_empty() {
        return Err(LoadError::invalid("database.url", "must not be empty"));
    }

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_remote_settings(remote: RawRemoteSettings) -> Result<RemoteSettings, LoadError> {
    let raw_base = remote
        .base_url
        .unwrap_or_else(|| DEFAULT_REMOTE_BASE_URL.to_string());
    let trimmed = raw_base.trim();
    if trimmed.is_empty() {
        return Err(LoadError::invalid("remote.base_url", "must not be empty"));
    }
    let base_url = Url::parse(trimmed)
        .map_err(|err| LoadError::invalid("remote.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "remote.base_url",
            "scheme must be http or https",
        ));
    }

    let read_timeout = positive_millis(
        remote
            .read_timeout_ms
            .unwrap_or(DEFAULT_REMOTE_READ_TIMEOUT_MS),
        "remote.read_timeout_ms",
    )?;
    let write_timeout = positive_millis(
        remote
            .write_timeout_ms
            .unwrap_or(DEFAULT_REMOTE_WRITE_TIMEOUT_MS),
        "remote.write_timeout_ms",
    )?;
    if read_timeout >= write_timeout {
        return Err(LoadError::invalid(
            "remote.read_timeout_ms",
            "must be shorter than remote.write_timeout_ms",
        ));
    }

    let read_retries = remote.read_retries.unwrap_or(DEFAULT_REMOTE_READ_RETRIES);
    if read_retries > MAX_REMOTE_READ_RETRIES {
        return Err(LoadError::invalid(
            "remote.read_retries",
            format!("must not exceed {MAX_REMOTE_READ_RETRIES}"),
        ));
    }

    let retry_backoff = Duration::from_millis(
        remote
            .retry_backoff_ms
            .unwrap_or(DEFAULT_REMOTE_RETRY_BACKOFF_MS),
    );

    Ok(RemoteSettings {
        base_url,
        read_timeout,
        write_timeout,
        read_retries,
        retry_backoff,
        check_eligibility: remote.check_eligibility.unwrap_or(true),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let stats_ttl_seconds = cache
        .stats_ttl_seconds
        .unwrap_or(DEFAULT_CACHE_STATS_TTL_SECS);
    if stats_ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.stats_ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_seconds),
        stats_ttl: Duration::from_secs(stats_ttl_seconds),
        serve_stale: cache.serve_stale.unwrap_or(true),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRemoteSettings {
    base_url: Option<String>,
    read_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    read_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    check_eligibility: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    stats_ttl_seconds: Option<u64>,
    serve_stale: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn positive_millis(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_millis(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
