//! Error types for the playback controller

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving audio playback
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable audio output device
    #[error("no audio output device available: {0}")]
    Device(#[from] rodio::StreamError),

    /// Opening the HTTP audio stream failed
    #[error("cannot open audio stream: {0}")]
    Stream(String),

    /// Invalid stream URL
    #[error("invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The audio thread has shut down
    #[error("audio thread is not running")]
    Closed,

    /// Spawning the audio thread failed
    #[error("cannot spawn audio thread: {0}")]
    Io(#[from] std::io::Error),
}
