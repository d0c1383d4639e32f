use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use framepulse::app::{App, AppConfig};
use framepulse::constants::LOOP_TIME;
use framepulse::formatter::FrameFormatter;

/// The main entry point of the demo binary.
///
/// Initializes the tracing subscriber, builds the app, and drives the host
/// loop until the scheduler drains or the demo window elapses.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .event_format(FrameFormatter)
        .with_env_filter(filter)
        .init();

    let mut app = App::new(AppConfig::default())?;

    info!(loop_time = ?LOOP_TIME, "Starting host loop");
    loop {
        if !app.run() {
            break;
        }
    }

    for line in app.scheduler().metrics_summary() {
        info!("{line}");
    }
    Ok(())
}
