//! Minimal HTTP wire handling for the control API
//!
//! The control surface is a small fixed route table over persistent-less
//! HTTP/1.1: read one request, write one response (or one SSE stream),
//! close. Every response is CORS-open.

use std::collections::HashMap;
use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Response status line text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub &'static str);

impl Status {
    pub const OK: Status = Status("200 OK");
    pub const NO_CONTENT: Status = Status("204 No Content");
    pub const BAD_REQUEST: Status = Status("400 Bad Request");
    pub const UNAUTHORIZED: Status = Status("401 Unauthorized");
    pub const NOT_FOUND: Status = Status("404 Not Found");
    pub const INTERNAL: Status = Status("500 Internal Server Error");
    pub const STORAGE_FULL: Status = Status("507 Insufficient Storage");
}

/// Parsed request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// No body (or an empty one)
    None,

    /// Parsed JSON document
    Json(serde_json::Value),

    /// A body was present but was not valid JSON
    Invalid,
}

/// Outcome of reading the request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLine {
    /// Peer sent nothing; close without a response
    Empty,

    /// Something arrived but it was not `METHOD TARGET ...`
    Malformed,

    Request { method: String, target: String },
}

/// Read and split the request line
pub async fn read_request_line<R>(reader: &mut R) -> io::Result<RequestLine>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 || line.trim().is_empty() {
        return Ok(RequestLine::Empty);
    }

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(RequestLine::Malformed);
    };

    Ok(RequestLine::Request {
        method: method.to_string(),
        target: target.to_string(),
    })
}

/// Read headers until the blank line; keys are lowercased
pub async fn read_headers<R>(reader: &mut R) -> io::Result<HashMap<String, String>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut headers = HashMap::new();

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        let line = line.trim();
        if n == 0 || line.is_empty() {
            break;
        }

        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(headers)
}

/// Read a content-length body and parse it as JSON
pub async fn read_body<R>(
    reader: &mut R,
    headers: &HashMap<String, String>,
) -> io::Result<Body>
where
    R: AsyncReadExt + Unpin,
{
    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    if content_length == 0 {
        return Ok(Body::None);
    }

    let mut buf = vec![0u8; content_length];
    reader.read_exact(&mut buf).await?;

    match serde_json::from_slice(&buf) {
        Ok(value) => Ok(Body::Json(value)),
        Err(e) => {
            warn!(error = %e, "failed to parse JSON body");
            Ok(Body::Invalid)
        }
    }
}

/// Write a JSON response and close out the exchange
pub async fn write_json<W>(
    writer: &mut W,
    status: Status,
    body: &serde_json::Value,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let text = body.to_string();
    let head = format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Connection: close\r\n\r\n",
        status.0,
        text.len()
    );

    writer.write_all(head.as_bytes()).await?;
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}

/// Write a JSON error body: {"error": message}
pub async fn write_error<W>(writer: &mut W, status: Status, message: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_json(writer, status, &serde_json::json!({ "error": message })).await
}

/// Answer a CORS preflight; always succeeds, never authenticated
pub async fn write_preflight<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, DELETE, OPTIONS, PUT, PATCH\r\n\
         Access-Control-Allow-Headers: Content-Type, Authorization\r\n\
         Access-Control-Max-Age: 86400\r\n\
         Content-Length: 0\r\n\r\n",
        Status::NO_CONTENT.0
    );

    writer.write_all(head.as_bytes()).await?;
    writer.flush().await
}

/// Open a server-sent-event stream
pub async fn write_sse_headers<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = "HTTP/1.1 200 OK\r\n\
         Content-Type: text/event-stream\r\n\
         Cache-Control: no-cache\r\n\
         Connection: keep-alive\r\n\
         Access-Control-Allow-Origin: *\r\n\r\n";

    writer.write_all(head.as_bytes()).await?;
    writer.flush().await
}

/// Write one SSE message carrying a JSON payload
pub async fn write_sse_event<W, T>(writer: &mut W, payload: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    writer.write_all(format!("data: {}\n\n", json).as_bytes()).await?;
    writer.flush().await
}

/// Write the head of a plain-text file response
pub async fn write_file_head<W>(writer: &mut W, len: u64) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Connection: close\r\n\r\n",
        Status::OK.0,
        len
    );

    writer.write_all(head.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_read_request_line() {
        let mut reader = BufReader::new(&b"GET /fingerprints HTTP/1.1\r\n"[..]);
        let line = read_request_line(&mut reader).await.unwrap();

        assert_eq!(
            line,
            RequestLine::Request {
                method: "GET".to_string(),
                target: "/fingerprints".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_read_request_line_empty() {
        let mut reader = BufReader::new(&b""[..]);
        assert_eq!(
            read_request_line(&mut reader).await.unwrap(),
            RequestLine::Empty
        );
    }

    #[tokio::test]
    async fn test_read_request_line_malformed() {
        let mut reader = BufReader::new(&b"GARBAGE\r\n"[..]);
        assert_eq!(
            read_request_line(&mut reader).await.unwrap(),
            RequestLine::Malformed
        );
    }

    #[tokio::test]
    async fn test_read_headers_lowercases_keys() {
        let raw = b"Authorization: Bearer abc\r\nContent-Length: 12\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);

        let headers = read_headers(&mut reader).await.unwrap();
        assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer abc"));
        assert_eq!(headers.get("content-length").map(String::as_str), Some("12"));
    }

    #[tokio::test]
    async fn test_read_body_json() {
        let payload = br#"{"name":"alice"}"#;
        let mut headers = HashMap::new();
        headers.insert("content-length".to_string(), payload.len().to_string());

        let mut reader = BufReader::new(&payload[..]);
        let body = read_body(&mut reader, &headers).await.unwrap();

        assert_eq!(body, Body::Json(serde_json::json!({"name": "alice"})));
    }

    #[tokio::test]
    async fn test_read_body_invalid_json() {
        let payload = b"not json";
        let mut headers = HashMap::new();
        headers.insert("content-length".to_string(), payload.len().to_string());

        let mut reader = BufReader::new(&payload[..]);
        let body = read_body(&mut reader, &headers).await.unwrap();

        assert_eq!(body, Body::Invalid);
    }

    #[tokio::test]
    async fn test_read_body_absent() {
        let headers = HashMap::new();
        let mut reader = BufReader::new(&b""[..]);

        let body = read_body(&mut reader, &headers).await.unwrap();
        assert_eq!(body, Body::None);
    }
}
