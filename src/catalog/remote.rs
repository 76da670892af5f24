//! Remote table retrieval
//!
//! Fetches CSV data from a plain HTTP server. The returned reader is
//! positioned just after the response headers.

use crate::error::{Error, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use tracing::debug;

/// Port used when the URL does not name one
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Parsed source URL components
/// Format: scheme://host[:port][/path]
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUrl {
    /// URL scheme (e.g., "http")
    pub scheme: String,
    /// Host name or address
    pub host: String,
    /// Optional port number
    pub port: Option<u16>,
    /// Absolute path, always starting with '/'
    pub path: String,
}

impl SourceUrl {
    /// Parse a source URL string
    pub fn parse(url: &str) -> Result<Self> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::Transport(format!("Invalid URL '{}': missing scheme", url)))?;

        // Split host:port from path
        let (host_port, path) = match rest.find('/') {
            Some(slash_pos) => rest.split_at(slash_pos),
            None => (rest, "/"),
        };

        // Parse host and port
        let (host, port) = match host_port.rsplit_once(':') {
            Some((h, p)) if !h.contains('[') => {
                let port_num = p
                    .parse::<u16>()
                    .map_err(|_| Error::Transport(format!("Invalid port '{}' in '{}'", p, url)))?;
                (h.to_string(), Some(port_num))
            }
            _ => (host_port.to_string(), None),
        };

        if host.is_empty() {
            return Err(Error::Transport(format!("Invalid URL '{}': missing host", url)));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            port,
            path: path.to_string(),
        })
    }

    /// Port to connect to, falling back to the HTTP default
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_HTTP_PORT)
    }
}

/// Download `url` and return a reader over the response body
pub fn fetch(url: &str) -> Result<BufReader<TcpStream>> {
    let url = SourceUrl::parse(url)?;
    if !url.scheme.eq_ignore_ascii_case("http") {
        return Err(Error::Transport(format!(
            "Unsupported URL scheme '{}', only http is supported",
            url.scheme
        )));
    }
    let port = url.port_or_default();

    debug!(host = %url.host, port, path = %url.path, "fetching remote table");

    let mut stream = TcpStream::connect((url.host.as_str(), port)).map_err(|_| {
        Error::Transport(format!("Unable to connect to {} at port {}", url.host, port))
    })?;

    write!(
        stream,
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: Close\r\n\r\n",
        url.path, url.host
    )?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);

    let mut status = String::new();
    reader.read_line(&mut status)?;
    if !status.contains("200 OK") {
        return Err(Error::Transport(format!(
            "Error ({}) getting {} from {} at port {}",
            status.trim(),
            url.path,
            url.host,
            port
        )));
    }

    // Skip the remaining header lines
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || header.trim().is_empty() {
            break;
        }
    }

    Ok(reader)
}
