//! Terminal dashboard for the Nightride terminal radio
//!
//! Renders the radio face (station, volume, now playing, elapsed time,
//! VU meter) at a fixed cadence and owns the keyboard: station digits,
//! volume keys and the about/station popups. The dashboard is a pure
//! consumer of the now-playing store; the feed task never waits on it.

mod app;
mod ui;

pub use app::run;
