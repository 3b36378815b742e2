//! Data models for the now-playing metadata feed
//!
//! The feed delivers one SSE event per track change across all stations,
//! plus a periodic `keepalive` marker used for liveness detection.

use std::time::Instant;

use serde::Deserialize;

/// Literal payload the feed sends as an application-level heartbeat
pub const KEEPALIVE: &str = "keepalive";

/// One raw event read off the feed connection
///
/// `data` is the decoded payload of a single SSE event: either the
/// [`KEEPALIVE`] marker or a JSON array describing a track change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Joined `data:` lines of the event
    pub data: String,
}

impl RawEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

/// What is currently playing on one station
///
/// Immutable once constructed; a new track replaces the entry wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Artist name; empty when the feed did not provide one
    pub artist: String,
    /// Track title; empty when the feed did not provide one
    pub title: String,
    /// Monotonic timestamp of when the track was first observed,
    /// used to estimate elapsed playtime on the interface
    pub started_at: Instant,
}

/// A parsed track change for one station
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackUpdate {
    /// Station slug (e.g. "chillsynth")
    pub station: String,
    pub artist: String,
    pub title: String,
    /// Monotonic timestamp of when the event was parsed
    pub observed_at: Instant,
}

impl TrackUpdate {
    /// Split into a store key and the [`TrackInfo`] value to insert
    pub fn into_entry(self) -> (String, TrackInfo) {
        (
            self.station,
            TrackInfo {
                artist: self.artist,
                title: self.title,
                started_at: self.observed_at,
            },
        )
    }
}

/// A single feed event after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Keepalive marker; re-arms the supervisor's watchdog and is discarded
    Heartbeat,
    /// A track change on one station
    Track(TrackUpdate),
}

/// Wire format of element 0 of a now-playing payload
///
/// All fields are optional upstream and default to empty rather than
/// failing the whole event.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WirePayload {
    #[serde(default)]
    pub station: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_update_into_entry() {
        let now = Instant::now();
        let update = TrackUpdate {
            station: "chillsynth".into(),
            artist: "Timecop1983".into(),
            title: "On the Run".into(),
            observed_at: now,
        };

        let (station, info) = update.into_entry();
        assert_eq!(station, "chillsynth");
        assert_eq!(info.artist, "Timecop1983");
        assert_eq!(info.title, "On the Run");
        assert_eq!(info.started_at, now);
    }

    #[test]
    fn wire_payload_defaults_missing_fields() {
        let payload: WirePayload = serde_json::from_str(r#"{"station":"rekt"}"#).unwrap();
        assert_eq!(payload.station, "rekt");
        assert_eq!(payload.artist, "");
        assert_eq!(payload.title, "");
    }
}
