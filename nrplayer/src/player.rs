//! Audio playback over a dedicated thread
//!
//! rodio's `OutputStream` is tied to the thread it was created on, so a
//! single audio thread owns the output device and the active sink. The
//! controller half is cheap to share: commands cross over a channel, and
//! `play` hands the thread a fully prepared network reader.

use std::num::NonZeroUsize;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rodio::{Decoder, OutputStream, Sink};
use stream_download::http::reqwest::Client;
use stream_download::http::HttpStream;
use stream_download::source::DecodeError;
use stream_download::storage::adaptive::AdaptiveStorageProvider;
use stream_download::storage::temp::TempStorageProvider;
use stream_download::{Settings, StreamDownload};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Audio kept in temp storage; live streams have no content length
const TEMP_BUFFER_SIZE: usize = 512 * 1024;

/// Bytes buffered before playback starts
const PREFETCH_BYTES: u64 = 64 * 1024;

/// Prefix for the temp files backing the stream buffer
const TEMP_PREFIX: &str = "nightride";

type StreamReader =
    StreamDownload<AdaptiveStorageProvider<TempStorageProvider, TempStorageProvider>>;

enum Command {
    Play(Box<StreamReader>),
    Stop,
    SetVolume(f32),
    Shutdown,
}

/// Playback controller for the station audio streams
///
/// Streams `<base_url>/<station>.m4a` through a buffering HTTP reader
/// into the audio device. Replacing the station replaces the whole
/// pipeline; the previous sink is stopped first.
///
/// # Example
///
/// ```no_run
/// use nrplayer::AudioPlayer;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let player = AudioPlayer::new("https://stream.nightride.fm")?;
/// player.set_volume(44)?;
/// player.play("chillsynth").await?;
/// # Ok(())
/// # }
/// ```
pub struct AudioPlayer {
    base_url: String,
    client: Client,
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl AudioPlayer {
    /// Start the audio thread and open the default output device
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let (commands, receiver) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("audio".into())
            .spawn(move || audio_thread(receiver, ready_tx))?;

        // The device is opened on the audio thread; surface its failure
        // here so a missing sound card is caught at startup.
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(Error::Closed),
        }

        Ok(Self {
            base_url: base_url.into(),
            client: Client::new(),
            commands,
            handle: Some(handle),
        })
    }

    /// Tune to a station, replacing whatever is playing
    pub async fn play(&self, station: &str) -> Result<()> {
        let url = stream_url(&self.base_url, station);
        debug!(%url, "opening audio stream");

        let stream = match HttpStream::new(self.client.clone(), url.parse()?).await {
            Ok(stream) => stream,
            Err(err) => return Err(Error::Stream(err.decode_error().await.to_string())),
        };

        let reader = StreamDownload::from_stream(
            stream,
            AdaptiveStorageProvider::new(
                TempStorageProvider::with_prefix(TEMP_PREFIX),
                NonZeroUsize::new(TEMP_BUFFER_SIZE).expect("nonzero"),
            ),
            Settings::default().prefetch_bytes(PREFETCH_BYTES),
        )
        .await
        .map_err(|err| Error::Stream(err.to_string()))?;

        info!(station, "playing");
        self.send(Command::Play(Box::new(reader)))
    }

    /// Stop playback; the sink is dropped, the device stays open
    pub fn stop(&self) -> Result<()> {
        debug!("stopping playback");
        self.send(Command::Stop)
    }

    /// Set the playback volume as a percentage, clamped to 0-100
    pub fn set_volume(&self, percent: u8) -> Result<()> {
        let gain = volume_gain(percent);
        debug!(percent, gain, "setting volume");
        self.send(Command::SetVolume(gain))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Closed)
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPlayer")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// URL of a station's audio stream
fn stream_url(base_url: &str, station: &str) -> String {
    format!("{}/{}.m4a", base_url.trim_end_matches('/'), station)
}

/// Convert a 0-100 percentage into a rodio gain
fn volume_gain(percent: u8) -> f32 {
    f32::from(percent.min(100)) / 100.0
}

fn audio_thread(commands: Receiver<Command>, ready: Sender<Result<()>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(err) => {
            let _ = ready.send(Err(Error::Device(err)));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut sink: Option<Sink> = None;
    let mut volume = 1.0_f32;

    while let Ok(command) = commands.recv() {
        match command {
            Command::Play(reader) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                let new_sink = match Sink::try_new(&handle) {
                    Ok(new_sink) => new_sink,
                    Err(err) => {
                        error!(error = %err, "cannot open audio sink");
                        continue;
                    }
                };
                // Blocks until the prefetch buffer fills; that is the
                // point of doing this on the audio thread.
                match Decoder::new(*reader) {
                    Ok(source) => {
                        new_sink.set_volume(volume);
                        new_sink.append(source);
                        new_sink.play();
                        sink = Some(new_sink);
                    }
                    Err(err) => error!(error = %err, "cannot decode audio stream"),
                }
            }
            Command::Stop => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
            }
            Command::SetVolume(gain) => {
                volume = gain;
                if let Some(sink) = &sink {
                    sink.set_volume(gain);
                }
            }
            Command::Shutdown => break,
        }
    }

    debug!("audio thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_appends_station_and_extension() {
        assert_eq!(
            stream_url("https://stream.nightride.fm", "chillsynth"),
            "https://stream.nightride.fm/chillsynth.m4a"
        );
        // Trailing slash in the configured base does not double up
        assert_eq!(
            stream_url("https://stream.nightride.fm/", "rekt"),
            "https://stream.nightride.fm/rekt.m4a"
        );
    }

    #[test]
    fn volume_gain_maps_and_clamps() {
        assert_eq!(volume_gain(0), 0.0);
        assert_eq!(volume_gain(44), 0.44);
        assert_eq!(volume_gain(100), 1.0);
        assert_eq!(volume_gain(255), 1.0);
    }
}
