//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    CliArgs, Command, DatabaseOverride, ExportArgs, ExportFormat, MaintenanceArgs, ServeArgs,
    ServeOverrides,
};

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroU64},
    path::PathBuf,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::plaques::DEFAULT_PLAQUESET;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "plaqueboard";
const ENV_PREFIX: &str = "PLAQUEBOARD";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CACHE_ENTRY_LIMIT: usize = 1000;
const DEFAULT_CACHE_CONSUME_BATCH_LIMIT: usize = 100;
const DEFAULT_BLOB_DIR: &str = "blobs";
const DEFAULT_BLOB_PUBLIC_BASE_URL: &str = "/images";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_SITE_TITLE: &str = "Plaqueboard";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_PER_PAGE: u32 = 20;
const DEFAULT_PENDING_PREVIEW: u32 = 5;
const DEFAULT_FEED_SIZE: u32 = 10;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub blobs: BlobSettings,
    pub notifier: NotifierSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
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
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub entry_limit: usize,
    pub consume_batch_limit: usize,
}

#[derive(Debug, Clone)]
pub struct BlobSettings {
    pub directory: PathBuf,
    /// Prefix joined with a blob path to form its serving url.
    pub public_base_url: String,
    pub max_upload_bytes: NonZeroU64,
}

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub admin_recipient: Option<String>,
    /// Notices are posted here as JSON; without it they are only logged.
    pub webhook_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub plaqueset: String,
    pub title: String,
    pub public_base_url: String,
    pub per_page: NonZeroU32,
    pub pending_preview: NonZeroU32,
    pub feed_size: NonZeroU32,
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
    raw.apply_command_overrides(cli.command.as_ref());

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    blobs: RawBlobSettings,
    notifier: RawNotifierSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_command_overrides(&mut self, command: Option<&Command>) {
        match command {
            Some(Command::Serve(args)) => self.apply_serve_overrides(&args.overrides),
            Some(Command::Reindex(args)) | Some(Command::Backfill(args)) => {
                self.apply_maintenance_overrides(args)
            }
            Some(Command::Export(args)) => self.apply_maintenance_overrides(&args.maintenance),
            None => self.apply_serve_overrides(&ServeOverrides::default()),
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.cache_entry_limit {
            self.cache.entry_limit = Some(limit);
        }
        if let Some(directory) = overrides.blobs_directory.as_ref() {
            self.blobs.directory = Some(directory.clone());
        }
        if let Some(limit) = overrides.blobs_max_upload_bytes {
            self.blobs.max_upload_bytes = Some(limit);
        }
        if let Some(plaqueset) = overrides.site_plaqueset.as_ref() {
            self.site.plaqueset = Some(plaqueset.clone());
        }
        if let Some(url) = overrides.site_public_base_url.as_ref() {
            self.site.public_base_url = Some(url.clone());
        }
    }

    fn apply_maintenance_overrides(&mut self, overrides: &MaintenanceArgs) {
        self.apply_database_override(&overrides.database);
        if let Some(plaqueset) = overrides.plaqueset.as_ref() {
            self.site.plaqueset = Some(plaqueset.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            cache,
            blobs,
            notifier,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            blobs: build_blob_settings(blobs)?,
            notifier: build_notifier_settings(notifier)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_addr",
            "admin listener must not share the public address",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
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
    let url = non_blank(database.url);
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

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let entry_limit = cache.entry_limit.unwrap_or(DEFAULT_CACHE_ENTRY_LIMIT);
    if entry_limit == 0 {
        return Err(LoadError::invalid(
            "cache.entry_limit",
            "must be greater than zero",
        ));
    }

    let consume_batch_limit = cache
        .consume_batch_limit
        .unwrap_or(DEFAULT_CACHE_CONSUME_BATCH_LIMIT);
    if consume_batch_limit == 0 {
        return Err(LoadError::invalid(
            "cache.consume_batch_limit",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        entry_limit,
        consume_batch_limit,
    })
}

fn build_blob_settings(blobs: RawBlobSettings) -> Result<BlobSettings, LoadError> {
    let directory = blobs
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "blobs.directory",
            "path must not be empty",
        ));
    }

    let public_base_url = non_blank(blobs.public_base_url)
        .unwrap_or_else(|| DEFAULT_BLOB_PUBLIC_BASE_URL.to_string());

    let max_upload_bytes_value = blobs.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    let max_upload_bytes = NonZeroU64::new(max_upload_bytes_value).ok_or_else(|| {
        LoadError::invalid("blobs.max_upload_bytes", "must be greater than zero")
    })?;
    usize::try_from(max_upload_bytes_value).map_err(|_| {
        LoadError::invalid(
            "blobs.max_upload_bytes",
            "value exceeds supported range for usize",
        )
    })?;

    Ok(BlobSettings {
        directory,
        public_base_url,
        max_upload_bytes,
    })
}

fn build_notifier_settings(notifier: RawNotifierSettings) -> Result<NotifierSettings, LoadError> {
    let webhook_url = match non_blank(notifier.webhook_url) {
        Some(raw) => Some(Url::parse(&raw).map_err(|err| {
            LoadError::invalid("notifier.webhook_url", format!("failed to parse: {err}"))
        })?),
        None => None,
    };

    Ok(NotifierSettings {
        admin_recipient: non_blank(notifier.admin_recipient),
        webhook_url,
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let plaqueset = non_blank(site.plaqueset).unwrap_or_else(|| DEFAULT_PLAQUESET.to_string());
    let public_base_url =
        non_blank(site.public_base_url).unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
    Url::parse(&public_base_url).map_err(|err| {
        LoadError::invalid("site.public_base_url", format!("failed to parse: {err}"))
    })?;

    Ok(SiteSettings {
        plaqueset,
        title: non_blank(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        public_base_url,
        per_page: non_zero_u32(
            site.per_page.unwrap_or(DEFAULT_PER_PAGE).into(),
            "site.per_page",
        )?,
        pending_preview: non_zero_u32(
            site.pending_preview.unwrap_or(DEFAULT_PENDING_PREVIEW).into(),
            "site.pending_preview",
        )?,
        feed_size: non_zero_u32(
            site.feed_size.unwrap_or(DEFAULT_FEED_SIZE).into(),
            "site.feed_size",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
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
struct RawCacheSettings {
    enabled: Option<bool>,
    entry_limit: Option<usize>,
    consume_batch_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBlobSettings {
    directory: Option<PathBuf>,
    public_base_url: Option<String>,
    max_upload_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotifierSettings {
    admin_recipient: Option<String>,
    webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    plaqueset: Option<String>,
    title: Option<String>,
    public_base_url: Option<String>,
    per_page: Option<u32>,
    pending_preview: Option<u32>,
    feed_size: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
