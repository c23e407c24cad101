use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "gateway-server", about = "qbridge request-ingestion gateway")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Path to a TOML config file. Built-in defaults apply when omitted.
    #[arg(long, env = "GATEWAY_CONFIG")]
    pub config: Option<String>,

    /// HTTP listen address (overrides `listen`).
    #[arg(long, env = "GATEWAY_LISTEN")]
    pub listen: Option<String>,

    /// Queue backend URL (overrides `queue.url`).
    #[arg(long, env = "GATEWAY_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Queue name (overrides `queue.name`).
    #[arg(long, env = "GATEWAY_QUEUE_NAME")]
    pub queue_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  TOML Config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Per-request bound on the queue append, in milliseconds.
    #[serde(default = "default_append_timeout_ms")]
    pub append_timeout_ms: u64,
    /// Header carrying an upstream trace id. Unset = generate locally.
    #[serde(default)]
    pub trace_header: Option<String>,
    /// How long to wait for in-flight requests after a shutdown signal.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    RedisList,
    RedisStream,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    #[serde(default = "default_queue_kind")]
    pub kind: QueueKind,
    #[serde(default = "default_queue_url")]
    pub url: String,
    #[serde(default = "default_queue_name")]
    pub name: String,
    /// Entry field for `redis_stream`.
    #[serde(default = "default_stream_field")]
    pub stream_field: String,
    /// Capacity for `memory`. 0 = unbounded.
    #[serde(default)]
    pub max_entries: usize,
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_append_timeout_ms() -> u64 {
    5000
}
fn default_shutdown_grace_secs() -> u64 {
    5
}
fn default_queue_kind() -> QueueKind {
    QueueKind::RedisList
}
fn default_queue_url() -> String {
    "redis://127.0.0.1/".into()
}
fn default_queue_name() -> String {
    "qbridge_simple_request_queue".into()
}
fn default_stream_field() -> String {
    queue_redis::DEFAULT_STREAM_FIELD.into()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            kind: default_queue_kind(),
            url: default_queue_url(),
            name: default_queue_name(),
            stream_field: default_stream_field(),
            max_entries: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            append_timeout_ms: default_append_timeout_ms(),
            trace_header: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
            queue: QueueConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// File (if any) → defaults, then CLI/env overrides, then validation.
    pub fn resolve(args: &ServeArgs) -> Result<Self, ServerError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(listen) = &args.listen {
            config.listen = listen.clone();
        }
        if let Some(url) = &args.queue_url {
            config.queue.url = url.clone();
        }
        if let Some(name) = &args.queue_name {
            config.queue.name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        let invalid = |detail: &str| ServerError::Config { context: "validate", detail: detail.to_string() };

        if self.listen.trim().is_empty() {
            return Err(invalid("listen must not be empty"));
        }
        if self.append_timeout_ms == 0 {
            return Err(invalid("append_timeout_ms must be > 0"));
        }
        if self.queue.name.trim().is_empty() {
            return Err(invalid("queue.name must not be empty"));
        }
        if matches!(self.queue.kind, QueueKind::RedisList | QueueKind::RedisStream) && self.queue.url.trim().is_empty() {
            return Err(invalid("queue.url is required for redis queues"));
        }
        if self.queue.kind == QueueKind::RedisStream && self.queue.stream_field.is_empty() {
            return Err(invalid("queue.stream_field must not be empty"));
        }
        if let Some(header) = &self.trace_header {
            if parse_header_name(header).is_none() {
                return Err(invalid(&format!("trace_header '{header}' is not a valid header name")));
            }
        }
        Ok(())
    }

    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn settings(&self) -> gateway_http::GatewaySettings {
        let settings = gateway_http::GatewaySettings::new(self.queue.name.clone())
            .with_append_timeout(self.append_timeout());
        match self.trace_header.as_deref().and_then(parse_header_name) {
            Some(header) => settings.with_trace_header(header),
            None => settings,
        }
    }
}

fn parse_header_name(name: &str) -> Option<gateway_http::HeaderName> {
    gateway_http::HeaderName::from_bytes(name.trim().as_bytes()).ok()
}
