use std::fs::File;

use nrconfig::get_config;
use nrfeed::{FeedSupervisor, NowPlayingStore, SseTransport};
use nrplayer::AudioPlayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// The dashboard owns the terminal, so logs go to a file
const LOG_FILE: &str = "radio.log";

fn init_logging() -> Result<WorkerGuard, std::io::Error> {
    // Truncate the previous session's log
    let file = File::create(LOG_FILE)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_logging()?;

    // ========== Configuration ==========
    // A broken or missing configuration fails here, before any task or
    // the terminal takeover starts.
    let config = get_config();
    info!("configuration loaded from {}", config.path().display());

    // ========== Metadata feed ==========
    let store = NowPlayingStore::new();
    let transport = SseTransport::builder()
        .verify_tls(config.verify_tls())
        .build(&config.sse_url())?;
    let supervisor = FeedSupervisor::new(transport, store.clone())
        .with_heartbeat_timeout(config.heartbeat_timeout());
    let shutdown = supervisor.shutdown_token();

    info!(url = %config.sse_url(), "starting metadata feed");
    let feed_task = tokio::spawn(supervisor.run());

    // ========== Audio ==========
    let player = AudioPlayer::new(config.audio_stream_base_url())?;

    // ========== Dashboard ==========
    // Runs until the user quits; playback starts on the default station.
    let result = nrtui::run(config, store, player).await;

    shutdown.cancel();
    feed_task.await?;
    info!("shut down cleanly");

    result?;
    Ok(())
}
