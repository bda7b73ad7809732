use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the quaderno binary.
#[derive(Debug, Parser)]
#[command(name = "quaderno", version, about = "Notion-backed personal site")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUADERNO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
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

    /// Development mode: local stores, local image prefix, images served in-process.
    #[arg(
        long = "dev",
        env = "DEV",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub dev: Option<bool>,

    /// Notion integration token.
    #[arg(long = "notion-token", env = "NOTION_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub notion_token: Option<String>,

    /// Database listed on the index page.
    #[arg(long = "notion-database-id", env = "NOTION_DATABASE_ID", value_name = "ID")]
    pub notion_database_id: Option<String>,

    /// Block whose children make up the reading-now page.
    #[arg(long = "reading-now-block-id", env = "READING_NOW_BLOCK_ID", value_name = "ID")]
    pub reading_now_block_id: Option<String>,

    /// Override the cache staleness interval.
    #[arg(long = "cache-staleness-seconds", value_name = "SECONDS")]
    pub cache_staleness_seconds: Option<u64>,

    /// Override the redis connection URL.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Keep the cache as JSON files in this directory (development only).
    #[arg(long = "cache-directory", env = "CACHE_DIR", value_name = "PATH")]
    pub cache_directory: Option<PathBuf>,

    /// Override the relocated image directory.
    #[arg(long = "assets-directory", value_name = "PATH")]
    pub assets_directory: Option<PathBuf>,

    /// Override the markdown reviews directory.
    #[arg(long = "reviews-directory", value_name = "PATH")]
    pub reviews_directory: Option<PathBuf>,
}
