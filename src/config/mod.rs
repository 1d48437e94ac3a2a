//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{BackendOverrides, CliArgs, Command, ServeArgs, ServeOverrides, WarmArgs};

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "kvedge";
const ENV_PREFIX: &str = "KVEDGE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_REST_PATH: &str = "/rest/v1";
const DEFAULT_TABLE: &str = "articles";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_KV_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub origin: OriginSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub debug_routes: bool,
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
pub struct OriginSettings {
    pub table: String,
    pub backend: OriginBackend,
}

#[derive(Debug, Clone)]
pub enum OriginBackend {
    Rest(RestOriginSettings),
    Postgres(PostgresOriginSettings),
}

#[derive(Debug, Clone)]
pub struct RestOriginSettings {
    pub url: Url,
    pub api_key: SecretString,
    pub rest_path: String,
}

#[derive(Debug, Clone)]
pub struct PostgresOriginSettings {
    pub database_url: SecretString,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub warm_on_startup: bool,
}

#[derive(Debug, Clone)]
pub enum CacheBackend {
    Memory,
    Cloudflare(CloudflareKvSettings),
}

#[derive(Debug, Clone)]
pub struct CloudflareKvSettings {
    pub api_base: Url,
    pub account_id: String,
    pub namespace_id: String,
    pub api_token: SecretString,
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
        Some(Command::Warm(args)) => raw.apply_warm_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
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
    origin: RawOriginSettings,
    cache: RawCacheSettings,
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
        if let Some(enabled) = overrides.server_debug_routes {
            self.server.debug_routes = Some(enabled);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(warm) = overrides.cache_warm_on_startup {
            self.cache.warm_on_startup = Some(warm);
        }
        self.apply_backend_overrides(&overrides.backends);
    }

    fn apply_warm_overrides(&mut self, args: &WarmArgs) {
        if let Some(level) = args.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        self.apply_backend_overrides(&args.backends);
    }

    fn apply_backend_overrides(&mut self, overrides: &BackendOverrides) {
        if let Some(backend) = overrides.origin_backend.as_ref() {
            self.origin.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.origin_url.as_ref() {
            self.origin.url = Some(url.clone());
        }
        if let Some(table) = overrides.origin_table.as_ref() {
            self.origin.table = Some(table.clone());
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.origin.database_url = Some(url.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            origin,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            origin: build_origin_settings(origin)?,
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
        .map_err(|reason| LoadError::invalid("server.host", reason))?;

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
        debug_routes: server.debug_routes.unwrap_or(true),
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

fn build_origin_settings(origin: RawOriginSettings) -> Result<OriginSettings, LoadError> {
    let table = non_empty(origin.table).unwrap_or_else(|| DEFAULT_TABLE.to_string());

    let backend = match non_empty(origin.backend).as_deref().unwrap_or("rest") {
        "rest" => {
            let raw_url = non_empty(origin.url).ok_or_else(|| {
                LoadError::invalid("origin.url", "required for the rest backend")
            })?;
            let url = Url::parse(&raw_url).map_err(|err| {
                LoadError::invalid("origin.url", format!("failed to parse: {err}"))
            })?;
            if url.cannot_be_a_base() {
                return Err(LoadError::invalid(
                    "origin.url",
                    "must be an absolute http(s) url",
                ));
            }
            let api_key = non_empty(origin.api_key).ok_or_else(|| {
                LoadError::invalid("origin.api_key", "required for the rest backend")
            })?;
            OriginBackend::Rest(RestOriginSettings {
                url,
                api_key: SecretString::from(api_key),
                rest_path: origin
                    .rest_path
                    .unwrap_or_else(|| DEFAULT_REST_PATH.to_string()),
            })
        }
        "postgres" => {
            let database_url = non_empty(origin.database_url).ok_or_else(|| {
                LoadError::invalid("origin.database_url", "required for the postgres backend")
            })?;
            let max_connections = non_zero_u32(
                origin
                    .max_connections
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS.into()),
                "origin.max_connections",
            )?;
            OriginBackend::Postgres(PostgresOriginSettings {
                database_url: SecretString::from(database_url),
                max_connections,
            })
        }
        other => {
            return Err(LoadError::invalid(
                "origin.backend",
                format!("unknown backend `{other}` (expected rest|postgres)"),
            ));
        }
    };

    Ok(OriginSettings { table, backend })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match non_empty(cache.backend).as_deref().unwrap_or("memory") {
        "memory" => CacheBackend::Memory,
        "cloudflare" => {
            let raw_base =
                non_empty(cache.api_base).unwrap_or_else(|| DEFAULT_KV_API_BASE.to_string());
            let api_base = Url::parse(&raw_base).map_err(|err| {
                LoadError::invalid("cache.api_base", format!("failed to parse: {err}"))
            })?;
            let account_id = non_empty(cache.account_id).ok_or_else(|| {
                LoadError::invalid("cache.account_id", "required for the cloudflare backend")
            })?;
            let namespace_id = non_empty(cache.namespace_id).ok_or_else(|| {
                LoadError::invalid("cache.namespace_id", "required for the cloudflare backend")
            })?;
            let api_token = non_empty(cache.api_token).ok_or_else(|| {
                LoadError::invalid("cache.api_token", "required for the cloudflare backend")
            })?;
            CacheBackend::Cloudflare(CloudflareKvSettings {
                api_base,
                account_id,
                namespace_id,
                api_token: SecretString::from(api_token),
            })
        }
        other => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("unknown backend `{other}` (expected memory|cloudflare)"),
            ));
        }
    };

    Ok(CacheSettings {
        backend,
        warm_on_startup: cache.warm_on_startup.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    debug_routes: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOriginSettings {
    backend: Option<String>,
    url: Option<String>,
    api_key: Option<String>,
    rest_path: Option<String>,
    table: Option<String>,
    database_url: Option<String>,
    max_connections: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    account_id: Option<String>,
    namespace_id: Option<String>,
    api_token: Option<String>,
    api_base: Option<String>,
    warm_on_startup: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
