//! Minimal HTTP/1.1 handling for the SQL-Air server
//!
//! Only what the dispatcher needs: read a request line, skip headers,
//! percent-decode the query text and write a close-delimited response.

use std::io::{self, BufRead, Read, Write};

use crate::error::Result;

/// Request targets starting with this prefix carry a query
pub const QUERY_PREFIX: &str = "/sql-air?query=";

/// Longest request or header line accepted, in bytes
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// Most header lines read before the request is rejected
pub const MAX_HEADER_LINES: usize = 100;

/// The first line of an HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

impl RequestLine {
    /// Parse `METHOD TARGET [VERSION]`
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let method = parts.next()?.to_string();
        let target = parts.next()?.to_string();
        let version = parts.next().unwrap_or("HTTP/1.0").to_string();

        Some(Self {
            method,
            target,
            version,
        })
    }

    /// The undecoded query text, if this request is addressed to the query endpoint
    pub fn query(&self) -> Option<&str> {
        self.target.strip_prefix(QUERY_PREFIX)
    }
}

/// Read the request line and skip the headers.
///
/// Returns `None` when the client sent nothing usable. Lines longer than
/// [`MAX_LINE_LEN`] or more than [`MAX_HEADER_LINES`] headers fail with
/// `InvalidData`.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<RequestLine>> {
    let mut line = String::new();
    if read_line_capped(reader, &mut line)? == 0 {
        return Ok(None);
    }
    let request = RequestLine::parse(&line);

    let mut header = String::new();
    for _ in 0..MAX_HEADER_LINES {
        header.clear();
        if read_line_capped(reader, &mut header)? == 0 || header.trim().is_empty() {
            return Ok(request);
        }
    }

    Err(io::Error::new(io::ErrorKind::InvalidData, "too many request headers").into())
}

fn read_line_capped<R: BufRead>(reader: &mut R, line: &mut String) -> io::Result<usize> {
    let read = reader.by_ref().take(MAX_LINE_LEN as u64).read_line(line)?;
    if read == MAX_LINE_LEN && !line.ends_with('\n') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request line too long",
        ));
    }
    Ok(read)
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes are kept as-is.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => decoded.push(b' '),
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    decoded.push(hi << 4 | lo);
                    i += 2;
                }
                _ => decoded.push(b'%'),
            },
            b => decoded.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Write a complete response with a computed `Content-Length`
pub fn write_response(
    out: &mut dyn Write,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    write!(
        out,
        "HTTP/1.1 {}\r\nServer: localhost\r\nConnection: Close\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        status,
        content_type,
        body.len()
    )?;
    out.write_all(body)?;
    out.flush()?;
    Ok(())
}

/// Write a `200 OK` plain-text response
pub fn write_text_response(out: &mut dyn Write, body: &[u8]) -> Result<()> {
    write_response(out, "200 OK", "text/plain", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_line() {
        let line = RequestLine::parse("GET /sql-air?query=select%20* HTTP/1.1\r\n").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.version, "HTTP/1.1");
        assert_eq!(line.query(), Some("select%20*"));

        let line = RequestLine::parse("GET /index.html").unwrap();
        assert_eq!(line.query(), None);
        assert!(RequestLine::parse("GET").is_none());
    }

    #[test]
    fn test_read_request_skips_headers() {
        let raw = "GET /a.txt HTTP/1.1\r\nHost: x\r\nAccept: */*\r\n\r\nleftover";
        let mut reader = raw.as_bytes();

        let request = read_request(&mut reader).unwrap().unwrap();
        assert_eq!(request.target, "/a.txt");
        assert_eq!(reader, b"leftover");

        let mut empty: &[u8] = b"";
        assert_eq!(read_request(&mut empty).unwrap(), None);
    }

    #[test]
    fn test_read_request_caps_lines() {
        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_LINE_LEN));
        let mut reader = raw.as_bytes();
        assert!(read_request(&mut reader).is_err());

        let raw = format!("GET / HTTP/1.1\r\n{}\r\n", "X-Filler: 1\r\n".repeat(MAX_HEADER_LINES));
        let mut reader = raw.as_bytes();
        assert!(read_request(&mut reader).is_err());

        let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(MAX_LINE_LEN / 2));
        let mut reader = raw.as_bytes();
        assert!(read_request(&mut reader).unwrap().is_some());
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(
            percent_decode("select+*+from+%22a.csv%22+where+col0%3D%27b%27"),
            "select * from \"a.csv\" where col0='b'"
        );
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        // Malformed or truncated escapes pass through
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
    }

    #[test]
    fn test_write_text_response() {
        let mut out = Vec::new();
        write_text_response(&mut out, b"1 row(s) selected.\n").unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\r\nServer: localhost\r\nConnection: Close\r\n\
             Content-Type: text/plain\r\nContent-Length: 19\r\n\r\n1 row(s) selected.\n"
        );
    }
}
