//! Now-playing metadata feed client for the Nightride terminal radio
//!
//! The station feed is one long-lived SSE connection carrying track
//! changes for every station plus a periodic `keepalive` heartbeat. This
//! crate owns that connection end to end:
//!
//! - **Connection**: a single streaming GET, decoded into raw events
//!   ([`FeedConnection`])
//! - **Parsing**: raw payloads into heartbeats and track updates,
//!   including the combined-title quirk of the `rekt` stations
//!   ([`parse_event`])
//! - **State**: a concurrency-safe map of the latest track per station,
//!   shared with the display ([`NowPlayingStore`])
//! - **Supervision**: a watchdog-driven reconnect loop that survives
//!   silent server-side drops without losing state
//!   ([`FeedSupervisor`])
//!
//! # Example
//!
//! ```no_run
//! use nrfeed::{FeedSupervisor, NowPlayingStore, SseTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = NowPlayingStore::new();
//!     let transport = SseTransport::new("https://nightride.fm/eventsource")?;
//!     let supervisor = FeedSupervisor::new(transport, store.clone());
//!     let shutdown = supervisor.shutdown_token();
//!     tokio::spawn(supervisor.run());
//!
//!     // The display side polls the store at its own cadence.
//!     if let Some(track) = store.get("chillsynth") {
//!         println!("{} - {}", track.artist, track.title);
//!     }
//!
//!     shutdown.cancel();
//!     Ok(())
//! }
//! ```
//!
//! # Liveness
//!
//! A dead upstream often keeps the socket open without sending anything,
//! so connection health is judged purely by the application-level
//! heartbeat: if none arrives within the watchdog window (90 s by
//! default), the supervisor drops the connection and opens a new one.
//! The display keeps showing the last known track throughout.

pub mod connection;
pub mod error;
pub mod models;
pub mod parser;
pub mod store;
pub mod supervisor;

// Re-exports
pub use connection::{ConnectionCloser, FeedConnection, SseTransport, SseTransportBuilder};
pub use error::{Error, ParseError, Result};
pub use models::{FeedEvent, RawEvent, TrackInfo, TrackUpdate, KEEPALIVE};
pub use parser::parse_event;
pub use store::NowPlayingStore;
pub use supervisor::{EventSource, FeedSupervisor, FeedTransport, DEFAULT_HEARTBEAT_TIMEOUT};
