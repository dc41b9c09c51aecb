use anyhow::Result;
use reqwest::{Client, Response};
use std::time::Duration;

/// Cap for error bodies echoed into logs and error messages (4 KB).
pub const ERROR_BODY_BYTES: usize = 4 * 1024;

/// Build a `reqwest::Client` with a 10 s connect timeout and the given overall timeout.
///
/// Falls back to the default client if the builder fails.
pub fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Client for short request/response calls (30 s overall).
pub fn default_http_client() -> Client {
    http_client(Duration::from_secs(30))
}

/// Client for streaming bodies: only the connect phase is bounded.
pub fn streaming_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Read a response body as UTF-8 text, keeping at most `max_bytes`.
///
/// Appends a `[truncated]` marker when the body was cut.
pub async fn limited_text(resp: Response, max_bytes: usize) -> Result<String> {
    let mut buf = Vec::new();
    let mut stream = resp;
    let mut truncated = false;
    while let Some(chunk) = stream.chunk().await? {
        if buf.len() + chunk.len() > max_bytes {
            let remaining = max_bytes.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..remaining]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str("\n[truncated]");
    }
    Ok(text)
}
