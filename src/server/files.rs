//! Static file serving
//!
//! Requests that are not addressed to the query endpoint are answered from a
//! document root on the local filesystem.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::http::{percent_decode, write_response};
use crate::error::Result;

/// Guess a content type from the file extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Map a request target onto a file under `root`.
///
/// Returns `None` for targets that would escape the root.
pub fn resolve(root: &Path, target: &str) -> Option<PathBuf> {
    let target = target.split(['?', '#']).next().unwrap_or_default();
    let relative = PathBuf::from(percent_decode(target.trim_start_matches('/')));

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let path = root.join(relative);
    if path.is_dir() {
        Some(path.join("index.html"))
    } else {
        Some(path)
    }
}

/// Answer a file request, with `404 Not Found` when the file is unavailable
pub fn serve(out: &mut dyn Write, root: &Path, target: &str) -> Result<()> {
    let file = resolve(root, target).and_then(|path| {
        let body = std::fs::read(&path).ok()?;
        Some((content_type(&path), body))
    });

    match file {
        Some((content_type, body)) => {
            debug!(path = %target, bytes = body.len(), "serving file");
            write_response(out, "200 OK", content_type, &body)
        }
        None => {
            debug!(path = %target, "file not found");
            let body = format!("File not found: {}\n", target);
            write_response(out, "404 Not Found", "text/plain", body.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.HTML")), "text/html");
        assert_eq!(content_type(Path::new("data/people.csv")), "text/csv");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let root = Path::new("/srv/www");
        assert_eq!(
            resolve(root, "/docs/a%20b.txt?x=1"),
            Some(PathBuf::from("/srv/www/docs/a b.txt"))
        );
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/docs/%2E%2E/%2E%2E/secret"), None);
    }

    #[test]
    fn test_serve_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi there").unwrap();

        let mut out = Vec::new();
        serve(&mut out, dir.path(), "/hello.txt").unwrap();
        let response = String::from_utf8(out).unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain\r\n"));
        assert!(response.ends_with("Content-Length: 8\r\n\r\nhi there"));

        let mut out = Vec::new();
        serve(&mut out, dir.path(), "/nope.txt").unwrap();
        let response = String::from_utf8(out).unwrap();
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("File not found: /nope.txt\n"));
    }
}
