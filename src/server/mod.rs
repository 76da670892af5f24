//! HTTP server for SQL-Air
//!
//! Accepts connections forever, runs each one on its own thread, and keeps
//! at most `max_connections` handlers active at a time. Requests to
//! `/sql-air?query=...` run a command; anything else is served as a file.

pub mod files;
pub mod gate;
pub mod http;

use std::fs;
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::TableCache;
use crate::error::{Error, Result};
use crate::executor::ExecutionEngine;

pub use gate::{ConcurrencyGate, GatePermit};

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default bound on concurrently active handlers
pub const DEFAULT_MAX_CONNECTIONS: usize = 20;

/// Default time a client has to send its request, in seconds
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum concurrently active connections
    pub max_connections: usize,
    /// Directory static files are served from
    pub document_root: PathBuf,
    /// Seconds to wait for a client's request; 0 waits forever
    pub read_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            document_root: PathBuf::from("."),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("unable to read '{}': {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Set the host address
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the maximum number of concurrently active connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the static file directory
    pub fn document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.document_root = root.into();
        self
    }

    /// Set the request read timeout in seconds (0 disables it)
    pub fn read_timeout_secs(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Request read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }

    /// Get the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQL-Air HTTP server
pub struct Server {
    config: ServerConfig,
    engine: ExecutionEngine,
    gate: Arc<ConcurrencyGate>,
}

impl Server {
    /// Create a new server with an empty table cache
    pub fn new(config: ServerConfig) -> Self {
        Self::with_cache(config, Arc::new(TableCache::new()))
    }

    /// Create a server over an existing table cache
    pub fn with_cache(config: ServerConfig, cache: Arc<TableCache>) -> Self {
        let gate = Arc::new(ConcurrencyGate::new(config.max_connections));
        Self {
            config,
            engine: ExecutionEngine::new(cache),
            gate,
        }
    }

    /// The engine requests are dispatched to
    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// The gate bounding active handlers
    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    /// Bind the configured address and serve forever
    pub fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address())?;
        self.serve(listener)
    }

    /// Serve connections from `listener` forever.
    ///
    /// Only returns if accepting a connection or spawning its handler fails.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            address = %listener.local_addr()?,
            max_connections = self.gate.max(),
            "SQL-Air server listening"
        );

        loop {
            let permit = self.gate.acquire();
            let (stream, peer) = listener.accept()?;
            debug!(%peer, active = self.gate.active(), "connection accepted");

            let engine = self.engine.clone();
            let root = self.config.document_root.clone();
            let timeout = self.config.read_timeout();
            thread::Builder::new()
                .name("sqlair-conn".to_string())
                .spawn(move || {
                    let _permit = permit;
                    if let Err(e) = handle_connection(stream, &engine, &root, timeout) {
                        warn!(%peer, error = %e, "connection error");
                    }
                })?;
        }
    }
}

/// Handle one request on a connection, then close it
fn handle_connection(
    stream: TcpStream,
    engine: &ExecutionEngine,
    root: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    stream.set_read_timeout(timeout)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    let request = match http::read_request(&mut reader)? {
        Some(request) => request,
        None => return Ok(()),
    };
    debug!(
        method = %request.method,
        target = %request.target,
        version = %request.version,
        "request received"
    );

    match request.query() {
        Some(query) => {
            let query = http::percent_decode(query);
            debug!(%query, "dispatching query");
            let body = run_query(engine, &query);
            http::write_text_response(&mut writer, &body)?;
        }
        None => files::serve(&mut writer, root, &request.target)?,
    }

    Ok(())
}

/// Run a query, rendering any failure into the response body
fn run_query(engine: &ExecutionEngine, query: &str) -> Vec<u8> {
    let mut body = Vec::new();
    if let Err(e) = engine.process(query, &mut body) {
        debug!(%query, error = %e, "query failed");
        writeln!(body, "Error: {}", e).ok();
    }
    body
}
