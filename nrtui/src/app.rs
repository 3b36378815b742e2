//! Dashboard state and event loop
//!
//! The foreground task owns the terminal and the playback controller;
//! the feed supervisor writes the store from its own task. Each tick the
//! dashboard re-reads the store, so a reconnecting feed simply keeps
//! showing the last known track.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::execute;
use nrconfig::Config;
use nrfeed::NowPlayingStore;
use nrplayer::AudioPlayer;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, warn};

use crate::ui;

/// Redraw cadence of the dashboard
const TICK: Duration = Duration::from_millis(100);

/// The original hardware dial goes 0-9; times eleven lands just short
/// of 100%, and at least it's linear
const VOLUME_STEP_PERCENT: u8 = 11;

/// Modal state of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Popup {
    None,
    About,
    /// Station picker with the currently highlighted list index
    Stations { selected: usize },
}

pub(crate) struct App {
    config: Arc<Config>,
    pub(crate) store: NowPlayingStore,
    player: AudioPlayer,
    pub(crate) stations: Vec<String>,
    pub(crate) station_index: usize,
    /// Volume dial position, 0-9
    pub(crate) volume: u8,
    pub(crate) vu_meter: bool,
    pub(crate) popup: Popup,
    should_quit: bool,
}

impl App {
    fn new(config: Arc<Config>, store: NowPlayingStore, player: AudioPlayer) -> Self {
        let stations = config.stations();
        let station_index = stations
            .iter()
            .position(|station| *station == config.default_station())
            .unwrap_or(0);

        Self {
            volume: config.volume(),
            vu_meter: config.vu_meter(),
            config,
            store,
            player,
            stations,
            station_index,
            popup: Popup::None,
            should_quit: false,
        }
    }

    pub(crate) fn station(&self) -> &str {
        &self.stations[self.station_index]
    }

    async fn tune(&mut self, index: usize) {
        if index >= self.stations.len() {
            return;
        }
        self.station_index = index;
        let station = self.stations[index].clone();
        debug!(%station, "tuning");

        if let Err(err) = self.player.stop() {
            warn!(error = %err, "stop failed");
        }
        if let Err(err) = self.player.play(&station).await {
            warn!(error = %err, %station, "playback failed");
        }

        self.config.set_default_station(station);
        self.persist();
    }

    fn apply_volume(&mut self, volume: u8) {
        self.volume = volume;
        if let Err(err) = self.player.set_volume(volume * VOLUME_STEP_PERCENT) {
            warn!(error = %err, "volume change failed");
        }
        self.config.set_volume(volume);
        self.persist();
    }

    fn persist(&self) {
        if let Err(err) = self.config.save() {
            warn!(error = %err, "cannot save configuration");
        }
    }

    async fn on_key(&mut self, code: KeyCode) {
        match self.popup {
            Popup::Stations { selected } => self.on_station_picker_key(code, selected).await,
            Popup::About => match code {
                KeyCode::F(1) | KeyCode::Enter | KeyCode::Esc => self.popup = Popup::None,
                KeyCode::F(12) => self.should_quit = true,
                _ => {}
            },
            Popup::None => self.on_dashboard_key(code).await,
        }
    }

    async fn on_dashboard_key(&mut self, code: KeyCode) {
        match code {
            // Direct station selection on the digit keys
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                if index < self.stations.len() {
                    self.tune(index).await;
                }
            }
            KeyCode::Char('+') => {
                if self.volume < nrconfig::MAX_VOLUME {
                    self.apply_volume(self.volume + 1);
                }
            }
            KeyCode::Char('-') => {
                if self.volume > 0 {
                    self.apply_volume(self.volume - 1);
                }
            }
            KeyCode::Char('v') => {
                self.vu_meter = !self.vu_meter;
                self.config.set_vu_meter(self.vu_meter);
                self.persist();
            }
            KeyCode::F(1) => self.popup = Popup::About,
            KeyCode::F(2) => {
                self.popup = Popup::Stations {
                    selected: self.station_index,
                }
            }
            KeyCode::F(12) | KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    async fn on_station_picker_key(&mut self, code: KeyCode, selected: usize) {
        match code {
            KeyCode::Up => {
                if selected > 0 {
                    self.popup = Popup::Stations {
                        selected: selected - 1,
                    };
                }
            }
            KeyCode::Down => {
                if selected + 1 < self.stations.len() {
                    self.popup = Popup::Stations {
                        selected: selected + 1,
                    };
                }
            }
            KeyCode::Enter => {
                self.popup = Popup::None;
                self.tune(selected).await;
            }
            KeyCode::F(2) | KeyCode::Esc => self.popup = Popup::None,
            KeyCode::F(12) => self.should_quit = true,
            _ => {}
        }
    }
}

/// Run the dashboard until the user quits
///
/// Takes over the terminal; playback starts on the configured default
/// station. Returns once F12/q is pressed and the terminal is restored.
pub async fn run(config: Arc<Config>, store: NowPlayingStore, player: AudioPlayer) -> Result<()> {
    let mut app = App::new(config, store, player);

    enable_raw_mode().context("cannot enable raw mode")?;
    execute!(std::io::stdout(), EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let initial = app.station_index;
    app.tune(initial).await;
    app.apply_volume(app.volume);

    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode().ok();
    execute!(std::io::stdout(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    if let Err(err) = app.player.stop() {
        warn!(error = %err, "stop on exit failed");
    }

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut ticker = tokio::time::interval(TICK);

    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Drain whatever input arrived during the last tick; polling with
        // a zero timeout keeps this task from blocking the runtime.
        while crossterm::event::poll(Duration::ZERO)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code).await;
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
        ticker.tick().await;
    }
}
