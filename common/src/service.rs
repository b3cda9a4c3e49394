use tracing::{info, warn};

/// Tell systemd the service is up. A no-op outside of systemd.
pub fn notify_ready() {
  match sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
    Ok(()) => info!("Readiness reported to service manager"),
    Err(e) => warn!("Failed to notify service manager: {}", e),
  }
}
