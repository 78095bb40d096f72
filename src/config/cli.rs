use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the matchday binary.
#[derive(Debug, Parser)]
#[command(
    name = "matchday",
    version,
    about = "Vote ledger and catalog cache in front of the match service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MATCHDAY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP surface.
    Serve(Box<ServeArgs>),
    /// Refresh the local catalog mirror from the match service.
    #[command(name = "sync-mirror")]
    SyncMirror(SyncMirrorArgs),
    /// Remove recorded votes from the local ledger.
    #[command(name = "purge-votes")]
    PurgeVotes(PurgeVotesArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RemoteOverride {
    /// Override the match service base URL.
    #[arg(long = "remote-base-url", value_name = "URL")]
    pub remote_base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub remote: RemoteOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the timeout applied to each read attempt.
    #[arg(long = "remote-read-timeout-ms", value_name = "MS")]
    pub remote_read_timeout_ms: Option<u64>,

    /// Override the timeout applied to vote submissions.
    #[arg(long = "remote-write-timeout-ms", value_name = "MS")]
    pub remote_write_timeout_ms: Option<u64>,

    /// Override how many times a failed read is retried.
    #[arg(long = "remote-read-retries", value_name = "COUNT")]
    pub remote_read_retries: Option<u32>,

    /// Override the pause between read retries.
    #[arg(long = "remote-retry-backoff-ms", value_name = "MS")]
    pub remote_retry_backoff_ms: Option<u64>,

    /// Toggle the open-match check before a vote is submitted.
    #[arg(
        long = "remote-check-eligibility",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub remote_check_eligibility: Option<bool>,

    /// Override the lifetime of cached catalog responses.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the lifetime of cached site statistics.
    #[arg(long = "cache-stats-ttl-seconds", value_name = "SECONDS")]
    pub cache_stats_ttl_seconds: Option<u64>,

    /// Toggle serving expired entries when the match service is unreachable.
    #[arg(
        long = "cache-serve-stale",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_serve_stale: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncMirrorArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub remote: RemoteOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PurgeVotesArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Only remove votes cast by this actor.
    #[arg(long = "actor", value_name = "ID", conflicts_with = "all")]
    pub actor: Option<i64>,

    /// Remove every recorded vote.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub all: bool,
}
