use glider::ipc::{parse_host_line, HostMessage, JsonLineSink};
use glider::logging;
use glider::selection::GliderService;
use glider::settings::Settings;
use std::io::BufRead;
use std::sync::Arc;

/// Host bridge: JSON lines from the host on stdin, overlay content on stdout.
fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "settings.json".to_string());
    let settings = Settings::load(&settings_path)?;
    logging::init(settings.debug_logging, settings.resolved_log_file());
    tracing::info!(path = %settings_path, enabled = settings.glider_enabled, "glider starting");

    let sink = Arc::new(JsonLineSink::new(std::io::stdout()));
    let mut service = GliderService::new(settings.clone(), sink);
    if settings.glider_enabled {
        service.start();
    }

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_host_line(&line) {
            Ok(message) => {
                if let HostMessage::Settings { data } = &message {
                    if let Err(err) = data.save(&settings_path) {
                        tracing::warn!(?err, "failed to persist settings");
                    }
                }
                service.handle_host_message(message);
            }
            Err(err) => tracing::warn!(?err, "ignoring host message"),
        }
    }

    tracing::info!("host closed the bridge, shutting down");
    service.stop();
    Ok(())
}
