//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::CorruptEntryPolicy;

mod cli;

pub use cli::*;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quaderno";
const ENV_PREFIX: &str = "QUADERNO";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_NOTION_API_BASE_URL: &str = "https://api.notion.com/v1/";
const DEFAULT_NOTION_API_VERSION: &str = "2022-06-28";
const DEFAULT_NOTION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STALENESS_SECS: u64 = 60 * 60;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
const DEFAULT_FIXTURE_DIR: &str = "local/sampleData";
const DEFAULT_ASSET_DIR: &str = "images";
const DEFAULT_PUBLIC_PREFIX: &str = "https://cloud.shaikzhafir.com/images/";
const DEFAULT_LOCAL_PREFIX: &str = "/images/";
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REVIEWS_DIR: &str = "reviews";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub environment: EnvironmentSettings,
    pub notion: NotionSettings,
    pub cache: CacheSettings,
    pub assets: AssetSettings,
    pub reviews: ReviewSettings,
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

#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSettings {
    /// Selects local stores and the local asset prefix.
    pub dev: bool,
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub token: String,
    pub database_id: String,
    pub reading_now_block_id: String,
    /// Always ends with `/` so endpoint paths join beneath it.
    pub api_base_url: Url,
    pub api_version: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub staleness: Duration,
    pub redis_url: String,
    pub directory: Option<PathBuf>,
    pub fixture_directory: PathBuf,
    pub corrupt_entry_policy: CorruptEntryPolicy,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub directory: PathBuf,
    pub public_prefix: String,
    pub local_prefix: String,
    pub download_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ReviewSettings {
    /// Markdown reviews with front matter, read on every request.
    pub directory: PathBuf,
}

/// Which cache backend the composing layer should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSelection {
    Redis { url: String },
    Filesystem { directory: PathBuf },
    Fixture { directory: PathBuf },
}

impl Settings {
    pub fn store_selection(&self) -> StoreSelection {
        if !self.environment.dev {
            return StoreSelection::Redis {
                url: self.cache.redis_url.clone(),
            };
        }
        match self.cache.directory.as_ref() {
            Some(directory) => StoreSelection::Filesystem {
                directory: directory.clone(),
            },
            None => StoreSelection::Fixture {
                directory: self.cache.fixture_directory.clone(),
            },
        }
    }
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Parse the process arguments and load settings from them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    environment: RawEnvironmentSettings,
    notion: RawNotionSettings,
    cache: RawCacheSettings,
    assets: RawAssetSettings,
    reviews: RawReviewSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
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
        if let Some(dev) = overrides.dev {
            self.environment.dev = Some(dev);
        }
        if let Some(token) = overrides.notion_token.as_ref() {
            self.notion.token = Some(token.clone());
        }
        if let Some(id) = overrides.notion_database_id.as_ref() {
            self.notion.database_id = Some(id.clone());
        }
        if let Some(id) = overrides.reading_now_block_id.as_ref() {
            self.notion.reading_now_block_id = Some(id.clone());
        }
        if let Some(seconds) = overrides.cache_staleness_seconds {
            self.cache.staleness_seconds = Some(seconds);
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(directory) = overrides.cache_directory.as_ref() {
            self.cache.directory = Some(directory.clone());
        }
        if let Some(directory) = overrides.assets_directory.as_ref() {
            self.assets.directory = Some(directory.clone());
        }
        if let Some(directory) = overrides.reviews_directory.as_ref() {
            self.reviews.directory = Some(directory.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            environment,
            notion,
            cache,
            assets,
            reviews,
        } = raw;

        let environment = EnvironmentSettings {
            dev: environment.dev.unwrap_or(false),
        };
        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let notion = build_notion_settings(notion, environment)?;
        let cache = build_cache_settings(cache)?;
        let assets = build_asset_settings(assets)?;
        let reviews = build_review_settings(reviews)?;

        Ok(Self {
            server,
            logging,
            environment,
            notion,
            cache,
            assets,
            reviews,
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

    Ok(ServerSettings {
        addr,
        graceful_shutdown: positive_seconds(graceful_secs, "server.graceful_shutdown_seconds")?,
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

fn build_notion_settings(
    notion: RawNotionSettings,
    environment: EnvironmentSettings,
) -> Result<NotionSettings, LoadError> {
    let token = trimmed(notion.token);
    // The fixture and filesystem stores never reach the origin on a warm cache.
    if token.is_empty() && !environment.dev {
        return Err(LoadError::invalid(
            "notion.token",
            "must be set outside development",
        ));
    }

    let raw_url = notion
        .api_base_url
        .unwrap_or_else(|| DEFAULT_NOTION_API_BASE_URL.to_string());
    let api_base_url = parse_base_url(&raw_url)
        .map_err(|reason| LoadError::invalid("notion.api_base_url", reason))?;

    let api_version = notion
        .api_version
        .map(|version| version.trim().to_string())
        .unwrap_or_else(|| DEFAULT_NOTION_API_VERSION.to_string());
    if api_version.is_empty() {
        return Err(LoadError::invalid(
            "notion.api_version",
            "must not be empty",
        ));
    }

    let timeout_secs = notion
        .timeout_seconds
        .unwrap_or(DEFAULT_NOTION_TIMEOUT_SECS);

    Ok(NotionSettings {
        token,
        database_id: trimmed(notion.database_id),
        reading_now_block_id: trimmed(notion.reading_now_block_id),
        api_base_url,
        api_version,
        timeout: positive_seconds(timeout_secs, "notion.timeout_seconds")?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let staleness_secs = cache.staleness_seconds.unwrap_or(DEFAULT_STALENESS_SECS);

    let redis_url = cache
        .redis_url
        .map(|url| url.trim().to_string())
        .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
    if redis_url.is_empty() {
        return Err(LoadError::invalid("cache.redis_url", "must not be empty"));
    }

    let directory = cache
        .directory
        .filter(|directory| !directory.as_os_str().is_empty());

    let fixture_directory = cache
        .fixture_directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_DIR));
    if fixture_directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.fixture_directory",
            "path must not be empty",
        ));
    }

    let corrupt_entry_policy = match cache.corrupt_entry_policy {
        Some(policy) => CorruptEntryPolicy::from_str(&policy)
            .map_err(|reason| LoadError::invalid("cache.corrupt_entry_policy", reason))?,
        None => CorruptEntryPolicy::default(),
    };

    Ok(CacheSettings {
        staleness: positive_seconds(staleness_secs, "cache.staleness_seconds")?,
        redis_url,
        directory,
        fixture_directory,
        corrupt_entry_policy,
    })
}

fn build_asset_settings(assets: RawAssetSettings) -> Result<AssetSettings, LoadError> {
    let directory = assets
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "assets.directory",
            "path must not be empty",
        ));
    }

    let public_prefix = assets
        .public_prefix
        .unwrap_or_else(|| DEFAULT_PUBLIC_PREFIX.to_string());
    let local_prefix = assets
        .local_prefix
        .unwrap_or_else(|| DEFAULT_LOCAL_PREFIX.to_string());
    if !local_prefix.ends_with('/') {
        return Err(LoadError::invalid(
            "assets.local_prefix",
            "must end with `/`",
        ));
    }
    if !public_prefix.ends_with('/') {
        return Err(LoadError::invalid(
            "assets.public_prefix",
            "must end with `/`",
        ));
    }

    let timeout_secs = assets
        .download_timeout_seconds
        .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);

    Ok(AssetSettings {
        directory,
        public_prefix,
        local_prefix,
        download_timeout: positive_seconds(timeout_secs, "assets.download_timeout_seconds")?,
    })
}

fn build_review_settings(reviews: RawReviewSettings) -> Result<ReviewSettings, LoadError> {
    let directory = reviews
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REVIEWS_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "reviews.directory",
            "path must not be empty",
        ));
    }
    Ok(ReviewSettings { directory })
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
struct RawEnvironmentSettings {
    dev: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    token: Option<String>,
    database_id: Option<String>,
    reading_now_block_id: Option<String>,
    api_base_url: Option<String>,
    api_version: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    staleness_seconds: Option<u64>,
    redis_url: Option<String>,
    directory: Option<PathBuf>,
    fixture_directory: Option<PathBuf>,
    corrupt_entry_policy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    directory: Option<PathBuf>,
    public_prefix: Option<String>,
    local_prefix: Option<String>,
    download_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawReviewSettings {
    directory: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|err| format!("invalid url `{raw}`: {err}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn trimmed(value: Option<String>) -> String {
    value
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}
