//! Shared now-playing state
//!
//! One writer (the feed supervisor), many readers (the dashboard and any
//! auxiliary display sink). Entries are replaced wholesale under a short
//! lock, so a reader sees either the previous track or the complete new
//! one, never a partially written value.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::TrackInfo;

/// Concurrency-safe mapping from station slug to its current track
///
/// A station appears only once a first event for it has arrived; a
/// missing key means "no data yet", not an error. Only the latest track
/// per station is kept.
///
/// Cloning is cheap and shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct NowPlayingStore {
    inner: Arc<RwLock<HashMap<String, TrackInfo>>>,
}

impl NowPlayingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current track for `station`
    pub fn upsert(&self, station: impl Into<String>, track: TrackInfo) {
        let mut map = self.inner.write().unwrap();
        map.insert(station.into(), track);
    }

    /// Current track for `station`, if any data has arrived for it
    pub fn get(&self, station: &str) -> Option<TrackInfo> {
        self.inner.read().unwrap().get(station).cloned()
    }

    /// Number of stations with data
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn track(artist: &str, title: &str) -> TrackInfo {
        TrackInfo {
            artist: artist.into(),
            title: title.into(),
            started_at: Instant::now(),
        }
    }

    #[test]
    fn read_your_write() {
        let store = NowPlayingStore::new();
        let info = track("Kavinsky", "Nightcall");
        store.upsert("nightride", info.clone());
        assert_eq!(store.get("nightride"), Some(info));
    }

    #[test]
    fn missing_station_is_none() {
        let store = NowPlayingStore::new();
        assert_eq!(store.get("chillsynth"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn upsert_replaces_wholesale() {
        let store = NowPlayingStore::new();
        store.upsert("datawave", track("FM-84", "Running in the Night"));
        store.upsert("datawave", track("The Midnight", "Vampires"));

        let current = store.get("datawave").unwrap();
        assert_eq!(current.artist, "The Midnight");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let store = NowPlayingStore::new();
        let reader = store.clone();
        store.upsert("rekt", track("", "Perturbator - Future Club"));
        assert!(reader.get("rekt").is_some());
    }
}
