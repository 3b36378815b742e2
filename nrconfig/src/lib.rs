//! # Nightride Configuration Module
//!
//! Configuration management for the Nightride terminal radio:
//! - Loading configuration from a YAML file
//! - Merging with the embedded default configuration
//! - Environment variable overrides
//! - Type-safe access to configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use nrconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let url = config.sse_url();
//! let stations = config.stations();
//!
//! // Update and persist configuration values
//! config.set_volume(7);
//! config.save()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("nightride.yaml");

const ENV_CONFIG_DIR: &str = "NIGHTRIDE_CONFIG";
const ENV_PREFIX: &str = "NIGHTRIDE_CONFIG__";

const CONFIG_DIR_NAME: &str = ".nightride";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Highest position on the volume dial
pub const MAX_VOLUME: u8 = 9;

lazy_static! {
    // The embedded file must define every field: the per-section Default
    // impls read from DEFAULTS, so a hole here would recurse into its own
    // initialization. User files may omit anything.
    static ref DEFAULTS: Settings =
        serde_yaml::from_str(DEFAULT_CONFIG).expect("embedded default configuration is valid");
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_default().expect("Failed to load Nightride configuration"));
}

/// Get the global configuration singleton
///
/// Loads the configuration on first access; a broken user file fails
/// fast here rather than later inside the running application.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

// ============================================================================
// Settings model
// ============================================================================

/// Feed and audio endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Urls {
    /// SSE metadata feed endpoint
    pub sse_url: String,
    /// Base URL the station stream URL is built from
    pub audio_stream_base_url: String,
}

impl Default for Urls {
    fn default() -> Self {
        DEFAULTS.urls.clone()
    }
}

/// Playback state carried across sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Playback {
    /// Station tuned in at startup
    pub default_station: String,
    /// Volume dial position, 0-9
    pub volume: u8,
}

impl Default for Playback {
    fn default() -> Self {
        DEFAULTS.playback.clone()
    }
}

/// Metadata feed tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Feed {
    /// Watchdog window for the keepalive heartbeat, in seconds
    pub heartbeat_timeout_secs: u64,
    /// TLS certificate verification for the feed connection
    pub verify_tls: bool,
}

impl Default for Feed {
    fn default() -> Self {
        DEFAULTS.feed.clone()
    }
}

/// Dashboard toggles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Interface {
    /// Draw the (purely cosmetic) VU meter
    pub vu_meter: bool,
}

impl Default for Interface {
    fn default() -> Self {
        DEFAULTS.interface.clone()
    }
}

/// The complete configuration tree
///
/// Every section and field is optional in the user's file; missing
/// pieces are filled in from the embedded defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub urls: Urls,
    /// Display order of the station selector
    pub stations: Vec<String>,
    pub playback: Playback,
    pub feed: Feed,
    pub interface: Interface,
}

impl Default for Settings {
    fn default() -> Self {
        DEFAULTS.clone()
    }
}

// ============================================================================
// Config manager
// ============================================================================

/// Configuration manager for the Nightride terminal radio
///
/// Wraps the [`Settings`] tree with file persistence and runtime
/// mutation (volume, VU toggle and station selection survive restarts).
///
/// # Examples
///
/// ```no_run
/// use nrconfig::get_config;
///
/// let config = get_config();
/// println!("feed: {}", config.sse_url());
/// ```
#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    state: Mutex<Settings>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// The directory is `$NIGHTRIDE_CONFIG` when set, `~/.nightride`
    /// otherwise; the file is created from the embedded defaults on
    /// first run.
    pub fn load_default() -> Result<Self> {
        Self::load(Self::config_dir()?)
    }

    /// Load configuration from `config.yaml` inside `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create config directory {}", dir.display()))?;
        let path = dir.join(CONFIG_FILE_NAME);

        let mut settings = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid configuration in {}", path.display()))?
        } else {
            info!(path = %path.display(), "writing default configuration");
            fs::write(&path, DEFAULT_CONFIG)
                .with_context(|| format!("cannot write {}", path.display()))?;
            Settings::default()
        };

        apply_env_overrides(&mut settings);
        validate(&mut settings)?;

        Ok(Self {
            path,
            state: Mutex::new(settings),
        })
    }

    fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = env::var(ENV_CONFIG_DIR) {
            return Ok(PathBuf::from(dir));
        }
        home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .ok_or_else(|| anyhow!("cannot determine home directory"))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the current state to the backing file
    pub fn save(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        let raw = serde_yaml::to_string(&*state)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("cannot write {}", self.path.display()))?;
        Ok(())
    }

    /// A full copy of the current settings tree
    pub fn settings(&self) -> Settings {
        self.state.lock().unwrap().clone()
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn sse_url(&self) -> String {
        self.state.lock().unwrap().urls.sse_url.clone()
    }

    pub fn audio_stream_base_url(&self) -> String {
        self.state.lock().unwrap().urls.audio_stream_base_url.clone()
    }

    /// Stations in display order
    pub fn stations(&self) -> Vec<String> {
        self.state.lock().unwrap().stations.clone()
    }

    pub fn default_station(&self) -> String {
        self.state.lock().unwrap().playback.default_station.clone()
    }

    /// Volume dial position, 0-9
    pub fn volume(&self) -> u8 {
        self.state.lock().unwrap().playback.volume
    }

    pub fn vu_meter(&self) -> bool {
        self.state.lock().unwrap().interface.vu_meter
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.state.lock().unwrap().feed.heartbeat_timeout_secs)
    }

    pub fn verify_tls(&self) -> bool {
        self.state.lock().unwrap().feed.verify_tls
    }

    // ------------------------------------------------------------------
    // Setters (call `save()` to persist)
    // ------------------------------------------------------------------

    /// Set the volume dial position, clamped to 0-9
    pub fn set_volume(&self, volume: u8) {
        self.state.lock().unwrap().playback.volume = volume.min(MAX_VOLUME);
    }

    pub fn set_vu_meter(&self, enabled: bool) {
        self.state.lock().unwrap().interface.vu_meter = enabled;
    }

    pub fn set_default_station(&self, station: impl Into<String>) {
        self.state.lock().unwrap().playback.default_station = station.into();
    }
}

/// Apply `NIGHTRIDE_CONFIG__*` environment overrides
fn apply_env_overrides(settings: &mut Settings) {
    for (key, value) in env::vars() {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        match name {
            "SSE_URL" => settings.urls.sse_url = value,
            "AUDIO_STREAM_BASE_URL" => settings.urls.audio_stream_base_url = value,
            "DEFAULT_STATION" => settings.playback.default_station = value,
            "HEARTBEAT_TIMEOUT_SECS" => match value.parse() {
                Ok(secs) => settings.feed.heartbeat_timeout_secs = secs,
                Err(_) => warn!(%key, %value, "ignoring non-numeric override"),
            },
            "VERIFY_TLS" => match value.parse() {
                Ok(verify) => settings.feed.verify_tls = verify,
                Err(_) => warn!(%key, %value, "ignoring non-boolean override"),
            },
            _ => warn!(%key, "ignoring unknown configuration override"),
        }
    }
}

/// Reject configurations the application cannot start with
fn validate(settings: &mut Settings) -> Result<()> {
    if settings.stations.is_empty() {
        return Err(anyhow!("station list is empty"));
    }
    if settings.playback.volume > MAX_VOLUME {
        settings.playback.volume = MAX_VOLUME;
    }
    if !settings.stations.contains(&settings.playback.default_station) {
        warn!(
            station = %settings.playback.default_station,
            "default station is not in the station list, using the first entry"
        );
        settings.playback.default_station = settings.stations[0].clone();
    }
    Ok(())
}
