use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the plaqueboard binary.
#[derive(Debug, Parser)]
#[command(name = "plaqueboard", version, about = "Plaqueboard catalogue server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PLAQUEBOARD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Rebuild the search index from stored plaques.
    Reindex(MaintenanceArgs),
    /// Fill missing `updated_on` values and title urls.
    Backfill(MaintenanceArgs),
    /// Write the JSON export of approved plaques to a file.
    Export(ExportArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the derived cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the number of cached values kept.
    #[arg(long = "cache-entry-limit", value_name = "COUNT")]
    pub cache_entry_limit: Option<usize>,

    /// Override the image storage directory.
    #[arg(long = "blobs-directory", value_name = "PATH")]
    pub blobs_directory: Option<PathBuf>,

    /// Override the largest accepted image upload in bytes.
    #[arg(long = "blobs-max-upload-bytes", value_name = "BYTES")]
    pub blobs_max_upload_bytes: Option<u64>,

    /// Override the plaqueset served.
    #[arg(long = "site-plaqueset", value_name = "NAME")]
    pub site_plaqueset: Option<String>,

    /// Override the public base url used in feeds and notifications.
    #[arg(long = "site-public-base-url", value_name = "URL")]
    pub site_public_base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MaintenanceArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Operate on this plaqueset instead of the configured one.
    #[arg(long = "plaqueset", value_name = "NAME")]
    pub plaqueset: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Summary,
    Full,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub maintenance: MaintenanceArgs,

    /// Representation written for each plaque.
    #[arg(long = "detail", value_enum, default_value_t = ExportFormat::Summary)]
    pub detail: ExportFormat,

    /// Path to the export file to write.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
