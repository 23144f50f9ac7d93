use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4620;
const DEFAULT_REST_PORT: u16 = 4621;
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_RECONNECT_SECS: u64 = 3;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Realtime channel (WebSocket) port (default: 4620).
    port: Option<u16>,
    /// REST API port (default: 4621).
    rest_port: Option<u16>,
    /// Bind address for both servers (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,driftmail=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured).
    log_format: Option<String>,
    /// Fabricate one message of each kind when a connection subscribes (default: true).
    simulate_on_subscribe: Option<bool>,
    /// Sync-client full-refetch interval in seconds (default: 30).
    refresh_interval_secs: Option<u64>,
    /// Sync-client reconnect delay in seconds (default: 3).
    reconnect_delay_secs: Option<u64>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Realtime channel (WebSocket) port.
    pub port: u16,
    /// REST API port.
    pub rest_port: u16,
    /// Bind address for both servers.
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// "pretty" | "json".
    pub log_format: String,
    /// Fabricate one message of each kind when a connection subscribes.
    pub simulate_on_subscribe: bool,
    /// Sync-client full-refetch interval.
    pub refresh_interval_secs: u64,
    /// Sync-client reconnect delay.
    pub reconnect_delay_secs: u64,
}

impl DaemonConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        rest_port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let rest_port = rest_port.or(toml.rest_port).unwrap_or(DEFAULT_REST_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("DRIFTMAIL_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let simulate_on_subscribe = toml.simulate_on_subscribe.unwrap_or(true);
        let refresh_interval_secs = toml
            .refresh_interval_secs
            .unwrap_or(DEFAULT_REFRESH_SECS);
        let reconnect_delay_secs = toml
            .reconnect_delay_secs
            .unwrap_or(DEFAULT_RECONNECT_SECS);

        Self {
            port,
            rest_port,
            bind_address,
            data_dir,
            log,
            log_format,
            simulate_on_subscribe,
            refresh_interval_secs,
            reconnect_delay_secs,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/driftmail
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("driftmail");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/driftmail or ~/.local/share/driftmail
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("driftmail");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("driftmail");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\driftmail
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("driftmail");
        }
    }
    // Fallback
    PathBuf::from(".driftmail")
}

// ─── Tests ────────────────────────────────────────────────────────────────────
