//! One live connection to the SSE metadata feed
//!
//! A [`FeedConnection`] wraps a single streaming HTTP response and yields
//! decoded events one at a time. Connections are single-use: after the
//! server closes the stream or [`FeedConnection::close`] is called, the
//! supervisor opens a fresh one.

use std::io;

use futures::stream::BoxStream;
use futures::TryStreamExt;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::models::RawEvent;

/// MIME type requested from the feed endpoint
pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "nightride/0.1.0";

/// Default timeout for establishing the feed connection
///
/// IMPORTANT: this only bounds connection setup. The stream itself stays
/// open for hours between events, so no overall request timeout is set;
/// liveness is the watchdog's job, not the HTTP client's.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

type EventByteStream = BoxStream<'static, io::Result<bytes::Bytes>>;

/// One live connection to the metadata feed
///
/// Produces a lazy, sequential, non-restartable sequence of [`RawEvent`]s.
/// [`next_event`](Self::next_event) suspends the calling task between
/// messages and returns `Ok(None)` once the server closes the stream or
/// the connection is closed from another task via a [`ConnectionCloser`].
pub struct FeedConnection {
    lines: Lines<BufReader<StreamReader<EventByteStream, bytes::Bytes>>>,
    token: CancellationToken,
    /// `data:` lines of the event currently being assembled
    pending: Vec<String>,
}

impl FeedConnection {
    /// Open a streaming GET against the feed URL
    ///
    /// Sends `Accept: text/event-stream`; a non-success status is a
    /// connection error (the body is not consumed).
    pub async fn open(client: &reqwest::Client, url: Url) -> Result<Self> {
        let response = client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT_EVENT_STREAM)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let stream: EventByteStream = Box::pin(response.bytes_stream().map_err(io::Error::other));
        Ok(Self::from_byte_stream(stream))
    }

    fn from_byte_stream(stream: EventByteStream) -> Self {
        Self {
            lines: BufReader::new(StreamReader::new(stream)).lines(),
            token: CancellationToken::new(),
            pending: Vec::new(),
        }
    }

    /// Next event off the stream
    ///
    /// `Ok(None)` means end-of-stream: the server closed the connection
    /// or [`close`](Self::close) was called. An event still being
    /// assembled when the stream ends is discarded, matching SSE framing
    /// rules (events are only complete at a blank line).
    pub async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        loop {
            let line = tokio::select! {
                _ = self.token.cancelled() => return Ok(None),
                line = self.lines.next_line() => line?,
            };

            let Some(line) = line else {
                self.pending.clear();
                return Ok(None);
            };
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if !self.pending.is_empty() {
                    let data = self.pending.join("\n");
                    self.pending.clear();
                    return Ok(Some(RawEvent::new(data)));
                }
                continue;
            }

            // Only `data:` fields carry payload; comments (`:`) and the
            // other SSE fields (`event:`, `id:`, `retry:`) are skipped.
            if let Some(value) = line.strip_prefix("data:") {
                self.pending
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            } else if line == "data" {
                self.pending.push(String::new());
            }
        }
    }

    /// Close the connection; idempotent
    ///
    /// Unblocks a task currently suspended in [`next_event`](Self::next_event).
    pub fn close(&self) {
        self.token.cancel();
    }

    /// Clonable handle that can close this connection from another task
    pub fn closer(&self) -> ConnectionCloser {
        ConnectionCloser {
            token: self.token.clone(),
        }
    }
}

impl std::fmt::Debug for FeedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedConnection")
            .field("closed", &self.token.is_cancelled())
            .field("pending_lines", &self.pending.len())
            .finish()
    }
}

/// Handle for closing a [`FeedConnection`] from outside the reading task
#[derive(Debug, Clone)]
pub struct ConnectionCloser {
    token: CancellationToken,
}

impl ConnectionCloser {
    /// Close the connection; idempotent
    pub fn close(&self) {
        self.token.cancel();
    }
}

/// Opens [`FeedConnection`]s against a configured feed URL
///
/// This is the production transport the supervisor drives; tests inject
/// scripted sources instead.
///
/// # Example
///
/// ```no_run
/// use nrfeed::SseTransport;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = SseTransport::builder()
///     .user_agent("nightride/0.1.0")
///     .build("https://nightride.fm/eventsource")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SseTransport {
    pub(crate) client: reqwest::Client,
    pub(crate) url: Url,
}

impl SseTransport {
    /// Transport with default settings for the given feed URL
    ///
    /// Fails fast on an unparseable URL so a misconfigured feed is caught
    /// at startup, not inside the reconnect loop.
    pub fn new(url: &str) -> Result<Self> {
        Self::builder().build(url)
    }

    pub fn builder() -> SseTransportBuilder {
        SseTransportBuilder::default()
    }

    /// The configured feed URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Builder for configuring an [`SseTransport`]
#[derive(Debug)]
pub struct SseTransportBuilder {
    user_agent: String,
    connect_timeout: std::time::Duration,
    verify_tls: bool,
}

impl Default for SseTransportBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: std::time::Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            verify_tls: true,
        }
    }
}

impl SseTransportBuilder {
    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connection setup timeout
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Disable TLS certificate verification
    ///
    /// Only for upstreams with misconfigured certificates; default is on.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Build the transport for the given feed URL
    pub fn build(self, url: &str) -> Result<SseTransport> {
        let url = Url::parse(url)?;
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .danger_accept_invalid_certs(!self.verify_tls)
            .build()?;

        Ok(SseTransport { client, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn chunked(chunks: &[&str]) -> EventByteStream {
        let owned: Vec<io::Result<bytes::Bytes>> = chunks
            .iter()
            .map(|chunk| Ok(bytes::Bytes::from(chunk.to_string())))
            .collect();
        futures::stream::iter(owned).boxed()
    }

    async fn collect_events(chunks: &[&str]) -> Vec<String> {
        let mut conn = FeedConnection::from_byte_stream(chunked(chunks));
        let mut events = Vec::new();
        while let Some(event) = conn.next_event().await.unwrap() {
            events.push(event.data);
        }
        events
    }

    #[tokio::test]
    async fn assembles_data_events() {
        let events = collect_events(&["data: keepalive\n\ndata: [{}]\n\n"]).await;
        assert_eq!(events, vec!["keepalive", "[{}]"]);
    }

    #[tokio::test]
    async fn joins_multiline_data() {
        let events = collect_events(&["data: first\ndata: second\n\n"]).await;
        assert_eq!(events, vec!["first\nsecond"]);
    }

    #[tokio::test]
    async fn handles_chunk_boundaries_inside_lines() {
        let events = collect_events(&["data: keep", "alive\n", "\n"]).await;
        assert_eq!(events, vec!["keepalive"]);
    }

    #[tokio::test]
    async fn strips_carriage_returns() {
        let events = collect_events(&["data: keepalive\r\n\r\n"]).await;
        assert_eq!(events, vec!["keepalive"]);
    }

    #[tokio::test]
    async fn ignores_comments_and_other_fields() {
        let events =
            collect_events(&[": ping\nevent: np\nid: 7\nretry: 500\ndata: keepalive\n\n"]).await;
        assert_eq!(events, vec!["keepalive"]);
    }

    #[tokio::test]
    async fn data_without_space_or_value() {
        let events = collect_events(&["data:compact\n\ndata\n\n"]).await;
        assert_eq!(events, vec!["compact", ""]);
    }

    #[tokio::test]
    async fn incomplete_event_is_discarded_at_stream_end() {
        let events = collect_events(&["data: truncated"]).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn blank_lines_without_data_are_skipped() {
        let events = collect_events(&["\n\n\ndata: keepalive\n\n"]).await;
        assert_eq!(events, vec!["keepalive"]);
    }

    #[tokio::test]
    async fn close_unblocks_pending_read() {
        let mut conn = FeedConnection::from_byte_stream(futures::stream::pending().boxed());
        let closer = conn.closer();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            closer.close();
            closer.close(); // idempotent
        });

        assert_eq!(conn.next_event().await.unwrap(), None);
        // Closed connections stay closed.
        assert_eq!(conn.next_event().await.unwrap(), None);
        handle.await.unwrap();
    }

    #[test]
    fn transport_rejects_invalid_url() {
        assert!(matches!(
            SseTransport::new("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
