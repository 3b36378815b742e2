//! Parsing of raw feed events
//!
//! One raw event is either the literal keepalive marker or a JSON array
//! whose first element describes a track change. Parsing is pure: the
//! caller decides what to do with a [`ParseError`] (the supervisor logs
//! and discards the event).

use std::time::Instant;

use crate::error::ParseError;
use crate::models::{FeedEvent, TrackUpdate, WirePayload, KEEPALIVE};

/// Stations whose `title` field carries "<artist> - <title>" combined.
///
/// Upstream quirk on the two `rekt`-family stations; matched by
/// substring, not equality, so both of them are covered. Do not
/// generalize this beyond the marker.
const COMBINED_TITLE_MARKER: &str = "rekt";

/// Separator between artist and title on combined-title stations
const TITLE_SEPARATOR: &str = " - ";

/// Parse one raw feed payload into a [`FeedEvent`]
///
/// Missing `station`/`artist`/`title` fields default to the empty string.
/// A payload that is not valid JSON, not an array, or empty is a
/// [`ParseError`]; the event should be discarded and the stream kept.
pub fn parse_event(raw: &str) -> Result<FeedEvent, ParseError> {
    if raw == KEEPALIVE {
        return Ok(FeedEvent::Heartbeat);
    }

    let value: serde_json::Value = serde_json::from_str(raw)?;
    let first = value
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or(ParseError::MissingPayload)?;
    let entry: WirePayload = serde_json::from_value(first.clone())?;

    let (artist, title) = if entry.station.contains(COMBINED_TITLE_MARKER) {
        split_combined_title(&entry.title)
    } else {
        (entry.artist, entry.title)
    };

    Ok(FeedEvent::Track(TrackUpdate {
        station: entry.station,
        artist,
        title,
        observed_at: Instant::now(),
    }))
}

/// Split "<artist> - <title>" on the first separator.
///
/// Without a separator the whole field is the title and the artist is
/// left empty.
fn split_combined_title(combined: &str) -> (String, String) {
    match combined.split_once(TITLE_SEPARATOR) {
        Some((artist, title)) => (artist.to_string(), title.to_string()),
        None => (String::new(), combined.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_track(raw: &str) -> TrackUpdate {
        match parse_event(raw).unwrap() {
            FeedEvent::Track(update) => update,
            other => panic!("expected track update, got {other:?}"),
        }
    }

    #[test]
    fn keepalive_is_heartbeat() {
        assert_eq!(parse_event("keepalive").unwrap(), FeedEvent::Heartbeat);
    }

    #[test]
    fn regular_station_reads_fields_directly() {
        let update = expect_track(
            r#"[{"station":"chillsynth","artist":"Timecop1983","title":"On the Run"}]"#,
        );
        assert_eq!(update.station, "chillsynth");
        assert_eq!(update.artist, "Timecop1983");
        assert_eq!(update.title, "On the Run");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let update = expect_track(r#"[{"station":"datawave"}]"#);
        assert_eq!(update.artist, "");
        assert_eq!(update.title, "");

        let update = expect_track(r#"[{"title":"Untitled"}]"#);
        assert_eq!(update.station, "");
        assert_eq!(update.title, "Untitled");
    }

    #[test]
    fn rekt_station_splits_combined_title() {
        let update = expect_track(r#"[{"station":"rekt","title":"Dance With The Dead - Riot"}]"#);
        assert_eq!(update.artist, "Dance With The Dead");
        assert_eq!(update.title, "Riot");
    }

    #[test]
    fn rekt_split_uses_first_separator() {
        let update = expect_track(r#"[{"station":"rektory","title":"GOST - Behemoth - Reborn"}]"#);
        assert_eq!(update.artist, "GOST");
        assert_eq!(update.title, "Behemoth - Reborn");
    }

    #[test]
    fn rekt_without_separator_keeps_whole_title() {
        let update = expect_track(r#"[{"station":"rekt","title":"Interstellar"}]"#);
        assert_eq!(update.artist, "");
        assert_eq!(update.title, "Interstellar");
    }

    #[test]
    fn rekt_ignores_artist_field() {
        // The combined-title stations put everything in `title`; a stray
        // `artist` field must not leak through.
        let update =
            expect_track(r#"[{"station":"rekt","artist":"ignored","title":"Carpenter Brut - Turbo Killer"}]"#);
        assert_eq!(update.artist, "Carpenter Brut");
        assert_eq!(update.title, "Turbo Killer");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            parse_event("{not json"),
            Err(ParseError::MalformedJson(_))
        ));
    }

    #[test]
    fn non_array_payload_is_missing_payload() {
        assert!(matches!(
            parse_event(r#"{"station":"chillsynth"}"#),
            Err(ParseError::MissingPayload)
        ));
        assert!(matches!(parse_event("[]"), Err(ParseError::MissingPayload)));
    }

    #[test]
    fn non_object_first_element_is_malformed() {
        assert!(matches!(
            parse_event(r#"["keepalive"]"#),
            Err(ParseError::MalformedJson(_))
        ));
    }

    #[test]
    fn extra_elements_are_ignored() {
        let update = expect_track(
            r#"[{"station":"nightride","artist":"Lost Years","title":"Converter"},{"station":"other"}]"#,
        );
        assert_eq!(update.station, "nightride");
    }
}
