//! Error types for the metadata feed client

use std::time::Duration;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while connecting to or reading the metadata feed
///
/// None of these are fatal to the supervisor: connection-level failures
/// trigger a reconnect cycle, parse failures discard a single event.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening or reading the feed connection failed (DNS/TLS/socket)
    #[error("feed connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    /// I/O failure while reading the event stream
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The feed endpoint answered with a non-success status
    #[error("feed returned HTTP status {0}")]
    Status(reqwest::StatusCode),

    /// Invalid feed URL
    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A single event could not be parsed (discard it, keep streaming)
    #[error("malformed feed event: {0}")]
    Parse(#[from] ParseError),

    /// No heartbeat arrived within the watchdog window; the connection
    /// is presumed silently dead even though the socket looks healthy
    #[error("no heartbeat within {timeout:?}, connection presumed stale")]
    Stale { timeout: Duration },
}

/// Errors from decoding one raw feed event
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Payload is not valid JSON, or element 0 is not an object
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Payload decoded, but is not a non-empty JSON array
    #[error("payload is not a non-empty JSON array")]
    MissingPayload,
}
