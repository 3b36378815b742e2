//! Dashboard rendering
//!
//! A retro radio face: double-line frame, station and volume row, the
//! current track, elapsed playtime and a cosmetic VU meter, with the
//! about/station popups layered on top.

use std::time::Duration;

use rand::seq::IndexedRandom;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph};
use ratatui::Frame;

use crate::app::{App, Popup};

/// Smallest terminal the dashboard fits in
const MIN_COLS: u16 = 52;
const MIN_ROWS: u16 = 11;

/// Widest artist/song string drawn on the dashboard
const TRACK_WIDTH: usize = 29;

/// Widest artist/song string drawn inside the station picker
const PICKER_TRACK_WIDTH: usize = 37;

const VU_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const VU_WIDTH: usize = 10;

fn accent() -> Style {
    Style::default().fg(Color::Cyan)
}

fn highlight() -> Style {
    Style::default().fg(Color::Black).bg(Color::Cyan)
}

fn song_style() -> Style {
    Style::default().fg(Color::Black).bg(Color::Magenta)
}

fn menu_style() -> Style {
    Style::default().fg(Color::Black).bg(Color::White)
}

pub(crate) fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if area.width < MIN_COLS || area.height < MIN_ROWS {
        frame.render_widget(
            Paragraph::new(format!(
                "Window too small to draw the interface ({MIN_COLS}x{MIN_ROWS} needed)"
            )),
            area,
        );
        return;
    }

    let [menu_area, radio_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(MIN_ROWS - 1)]).areas(area);

    draw_menu_bar(frame, menu_area, app.popup);
    draw_radio(frame, radio_area, app);

    match app.popup {
        Popup::About => draw_about(frame, radio_area),
        Popup::Stations { selected } => draw_station_picker(frame, radio_area, app, selected),
        Popup::None => {}
    }
}

fn draw_menu_bar(frame: &mut Frame, area: Rect, popup: Popup) {
    let text = match popup {
        Popup::Stations { .. } => "F1: ABOUT | F2: STATION | ↑/↓: MOVE | F12: QUIT",
        _ => "F1: ABOUT | F2: STATION | -/+: VOLUME | F12: QUIT",
    };
    frame.render_widget(Paragraph::new(text).style(menu_style()), area);
}

fn draw_radio(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::bordered()
        .border_type(BorderType::Double)
        .title(Span::styled(" NIGHTRIDE FM ", accent()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [station_row, divider, artist_row, song_row, _, status_row] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    // station N: name                VOL: <----4----->
    let [station_area, volume_area] =
        Layout::horizontal([Constraint::Min(26), Constraint::Length(18)]).areas(station_row);
    frame.render_widget(
        Paragraph::new(format!(
            "station {}: {}",
            app.station_index + 1,
            app.station()
        )),
        station_area,
    );
    frame.render_widget(Paragraph::new(volume_slider(app.volume)), volume_area);

    frame.render_widget(
        Paragraph::new(".".repeat(inner.width as usize)),
        divider,
    );

    // Missing store entry simply means no event for this station yet.
    let track = app.store.get(app.station());
    let (artist, song) = match &track {
        Some(track) => (
            shorten(&track.artist, TRACK_WIDTH),
            shorten(&track.title, TRACK_WIDTH),
        ),
        None => (String::new(), String::new()),
    };

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw("Artist: "),
            Span::styled(format!(" {artist} "), highlight()),
        ])),
        artist_row,
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::raw("  Song: "),
            Span::styled(format!(" {song} "), song_style()),
        ])),
        song_row,
    );

    let [played_area, vu_area] =
        Layout::horizontal([Constraint::Min(20), Constraint::Length(VU_WIDTH as u16)])
            .areas(status_row);
    let elapsed = track
        .map(|track| track.started_at.elapsed())
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(format!("Played: {}", format_elapsed(elapsed))),
        played_area,
    );
    if app.vu_meter {
        frame.render_widget(Paragraph::new(vu_meter_line()).style(accent()), vu_area);
    }
}

fn draw_about(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(area, 49, 9);
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().title(Span::styled(" >>ABOUT<< ", menu_style()));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Nightride terminal radio ", highlight())),
        Line::from(format!(" version {}", env!("CARGO_PKG_VERSION"))),
        Line::from(""),
        Line::from(" Player for Nightride.fm (https://nightride.fm)"),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ENTER: [OK] ", Style::default().fg(Color::Green)),
            Span::raw("                   "),
            Span::styled(" F1: [CLOSE] ", Style::default().fg(Color::Red)),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_station_picker(frame: &mut Frame, area: Rect, app: &App, selected: usize) {
    let popup_area = centered_rect(area, 49, 9);
    frame.render_widget(Clear, popup_area);

    let block = Block::bordered().title(Span::styled(" >>SELECT STATION<< ", menu_style()));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let prev = selected
        .checked_sub(1)
        .map(|index| app.stations[index].as_str())
        .unwrap_or("");
    let current = app.stations[selected].as_str();
    let next = app
        .stations
        .get(selected + 1)
        .map(String::as_str)
        .unwrap_or("");

    // Now-playing preview for the highlighted station
    let track = app.store.get(current);
    let (artist, song) = match &track {
        Some(track) => (
            shorten(&track.artist, PICKER_TRACK_WIDTH),
            shorten(&track.title, PICKER_TRACK_WIDTH),
        ),
        None => (String::new(), String::new()),
    };

    let neighbor = Style::default().fg(Color::Blue);
    let lines = vec![
        Line::from(Span::styled(
            format!("                  {:^13}  ", prev),
            neighbor,
        )),
        Line::from(vec![
            Span::raw(format!(" Station {}: ", selected + 1)),
            Span::raw("      "),
            Span::styled(format!("→ {current:^13} ←"), highlight()),
        ]),
        Line::from(Span::styled(
            format!("                  {:^13}  ", next),
            neighbor,
        )),
        Line::from("...NOW.PLAYING................................."),
        Line::from(vec![
            Span::raw(" Artist: "),
            Span::styled(artist, highlight()),
        ]),
        Line::from(vec![
            Span::raw("   Song: "),
            Span::styled(song, song_style()),
        ]),
        Line::from(vec![
            Span::styled(" ENTER: [OK] ", Style::default().fg(Color::Green)),
            Span::raw("                   "),
            Span::styled(" F2: [CLOSE] ", Style::default().fg(Color::Red)),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Fixed-size rect centered inside `area`, clamped to fit
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// The volume slider, with the dial digit in its slot
///
/// `VOL: ◄----4-----►` for position 4.
fn volume_slider(volume: u8) -> String {
    let mut slider: Vec<char> = "VOL: ◄----------►".chars().collect();
    let slot = 6 + volume.min(9) as usize;
    slider[slot] = char::from(b'0' + volume.min(9));
    slider.into_iter().collect()
}

/// Elapsed playtime as `MM:SS`
fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Truncate long artist/song names with an ellipsis
fn shorten(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_length {
        return text.to_string();
    }
    let mut truncated: String = chars[..max_length.saturating_sub(3)].iter().collect();
    truncated.push_str("...");
    truncated
}

/// Ten random bars; the meter is purely cosmetic, as it always was
fn vu_meter_line() -> String {
    let mut rng = rand::rng();
    (0..VU_WIDTH)
        .map(|_| *VU_GLYPHS.choose(&mut rng).expect("glyphs are non-empty"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_slider_places_digit() {
        assert_eq!(volume_slider(0), "VOL: ◄0---------►");
        assert_eq!(volume_slider(4), "VOL: ◄----4-----►");
        assert_eq!(volume_slider(9), "VOL: ◄---------9►");
    }

    #[test]
    fn format_elapsed_pads() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(754)), "12:34");
    }

    #[test]
    fn shorten_keeps_short_names() {
        assert_eq!(shorten("Kavinsky", 29), "Kavinsky");
    }

    #[test]
    fn shorten_truncates_long_names() {
        let long = "A Really Quite Excessively Long Song Title";
        let short = shorten(long, 29);
        assert_eq!(short.chars().count(), 29);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn vu_meter_has_fixed_width() {
        assert_eq!(vu_meter_line().chars().count(), VU_WIDTH);
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 6);
        let rect = centered_rect(area, 49, 9);
        assert!(rect.width <= area.width);
        assert!(rect.height <= area.height);
    }
}
