//! Self-healing supervisor for the metadata feed
//!
//! The upstream feed sends a `keepalive` event at a fixed cadence. When a
//! network path dies silently there is no TCP-level signal, so the only
//! liveness indication is the absence of that heartbeat: the supervisor
//! arms a watchdog deadline and treats its expiry exactly like a
//! connection loss. The whole lifecycle runs in one task, so the watchdog
//! is a plain deadline inside the event loop; there is never a second
//! timer armed concurrently.
//!
//! The loop moves through `Connecting -> Streaming -> Reconnecting` and
//! only ever stops on explicit shutdown. No feed event, parse failure, or
//! I/O error is fatal.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::connection::{FeedConnection, SseTransport};
use crate::error::{Error, Result};
use crate::models::{FeedEvent, RawEvent};
use crate::parser::parse_event;
use crate::store::NowPlayingStore;

/// Default watchdog window; the feed's keepalive cadence is well below this
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

/// First delay after a failed connect attempt
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Cap for the connect retry delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// A source of raw feed events, one live connection's worth
///
/// Implemented by [`FeedConnection`] in production; tests substitute
/// scripted sources.
#[async_trait]
pub trait EventSource: Send {
    /// Next raw event; `Ok(None)` is end-of-stream
    async fn next_event(&mut self) -> Result<Option<RawEvent>>;

    /// Tear the connection down; idempotent, must unblock a pending read
    fn close(&mut self);
}

/// Opens a fresh [`EventSource`] for every connection attempt
#[async_trait]
pub trait FeedTransport: Send + Sync + 'static {
    type Source: EventSource;

    async fn connect(&self) -> Result<Self::Source>;
}

#[async_trait]
impl EventSource for FeedConnection {
    async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        FeedConnection::next_event(self).await
    }

    fn close(&mut self) {
        FeedConnection::close(self);
    }
}

#[async_trait]
impl FeedTransport for SseTransport {
    type Source = FeedConnection;

    async fn connect(&self) -> Result<FeedConnection> {
        FeedConnection::open(&self.client, self.url.clone()).await
    }
}

/// Bounded exponential backoff between failed connect attempts
///
/// Doubles from 500 ms to a 30 s cap; reset after a successful connect.
#[derive(Debug)]
struct RetryDelay {
    current: Duration,
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self {
            current: INITIAL_RETRY_DELAY,
        }
    }
}

impl RetryDelay {
    /// Delay to apply now; the next one will be twice as long, capped
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_RETRY_DELAY);
        delay
    }

    fn reset(&mut self) {
        self.current = INITIAL_RETRY_DELAY;
    }
}

/// Lifecycle of the supervised connection
enum State<S> {
    /// Opening a fresh connection
    Connecting,
    /// Live connection, watchdog armed
    Streaming(S),
    /// Tearing down a dead or stale connection before reopening
    Reconnecting {
        source: S,
        /// `None` when the server ended the stream cleanly
        cause: Option<Error>,
    },
    /// Shutdown requested
    Stopped,
}

/// Long-running driver of the metadata feed
///
/// Owns the connection lifecycle and is the store's only writer. Spawn
/// [`run`](Self::run) as a background task; cancel the token from
/// [`shutdown_token`](Self::shutdown_token) to stop it.
///
/// # Example
///
/// ```no_run
/// use nrfeed::{FeedSupervisor, NowPlayingStore, SseTransport};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = NowPlayingStore::new();
/// let transport = SseTransport::new("https://nightride.fm/eventsource")?;
/// let supervisor = FeedSupervisor::new(transport, store.clone());
/// let shutdown = supervisor.shutdown_token();
///
/// tokio::spawn(supervisor.run());
/// // ... read `store` from the display task ...
/// shutdown.cancel();
/// # Ok(())
/// # }
/// ```
pub struct FeedSupervisor<T: FeedTransport> {
    transport: T,
    store: NowPlayingStore,
    heartbeat_timeout: Duration,
    shutdown: CancellationToken,
}

impl<T: FeedTransport> FeedSupervisor<T> {
    pub fn new(transport: T, store: NowPlayingStore) -> Self {
        Self {
            transport,
            store,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    /// Override the watchdog window
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Token that stops the supervisor when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Drive the feed until shutdown
    ///
    /// Never returns because of feed trouble; every failure path leads
    /// back to `Connecting`.
    pub async fn run(self) {
        let mut retry = RetryDelay::default();
        let mut state: State<T::Source> = State::Connecting;

        loop {
            state = match state {
                State::Connecting => self.connect(&mut retry).await,
                State::Streaming(source) => self.stream(source).await,
                State::Reconnecting { mut source, cause } => {
                    match &cause {
                        Some(Error::Stale { timeout }) => {
                            warn!(?timeout, "no heartbeat from feed, dropping stale connection")
                        }
                        Some(err) => warn!(error = %err, "feed read failed, reconnecting"),
                        None => info!("feed stream ended, reconnecting"),
                    }
                    source.close();
                    State::Connecting
                }
                State::Stopped => break,
            };
        }

        debug!("feed supervisor stopped");
    }

    async fn connect(&self, retry: &mut RetryDelay) -> State<T::Source> {
        let result = tokio::select! {
            _ = self.shutdown.cancelled() => return State::Stopped,
            result = self.transport.connect() => result,
        };

        match result {
            Ok(source) => {
                retry.reset();
                debug!("feed connected");
                State::Streaming(source)
            }
            Err(err) => {
                let delay = retry.next_delay();
                warn!(error = %err, ?delay, "feed connect failed");
                tokio::select! {
                    _ = self.shutdown.cancelled() => State::Stopped,
                    _ = time::sleep(delay) => State::Connecting,
                }
            }
        }
    }

    async fn stream(&self, mut source: T::Source) -> State<T::Source> {
        // Armed on entry; only heartbeats re-arm it. Track updates keep
        // the display fresh but say nothing about keepalive cadence.
        let mut deadline = Instant::now() + self.heartbeat_timeout;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    source.close();
                    return State::Stopped;
                }
                _ = time::sleep_until(deadline) => {
                    return State::Reconnecting {
                        source,
                        cause: Some(Error::Stale { timeout: self.heartbeat_timeout }),
                    };
                }
                event = source.next_event() => match event {
                    Ok(Some(raw)) => match parse_event(&raw.data) {
                        Ok(FeedEvent::Heartbeat) => {
                            trace!("feed heartbeat");
                            deadline = Instant::now() + self.heartbeat_timeout;
                        }
                        Ok(FeedEvent::Track(update)) => {
                            debug!(
                                station = %update.station,
                                artist = %update.artist,
                                title = %update.title,
                                "now playing"
                            );
                            let (station, info) = update.into_entry();
                            self.store.upsert(station, info);
                        }
                        Err(err) => warn!(error = %err, "discarding malformed feed event"),
                    },
                    Ok(None) => return State::Reconnecting { source, cause: None },
                    Err(err) => return State::Reconnecting { source, cause: Some(err) },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_to_cap() {
        let mut retry = RetryDelay::default();
        assert_eq!(retry.next_delay(), Duration::from_millis(500));
        assert_eq!(retry.next_delay(), Duration::from_secs(1));
        assert_eq!(retry.next_delay(), Duration::from_secs(2));
        for _ in 0..10 {
            retry.next_delay();
        }
        assert_eq!(retry.next_delay(), MAX_RETRY_DELAY);
    }

    #[test]
    fn retry_delay_resets() {
        let mut retry = RetryDelay::default();
        retry.next_delay();
        retry.next_delay();
        retry.reset();
        assert_eq!(retry.next_delay(), INITIAL_RETRY_DELAY);
    }
}
