use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::TelemetryEvent;

use super::HosSession;

// Set to false to silence the per-iteration loop logs
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Periodic snapshot refresh. The first poll fires immediately.
pub(super) async fn poll_loop(session: HosSession, period: Duration, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = session.refresh().await {
                    log_warn!("snapshot poll failed, keeping previous snapshot: {err:#}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("poll loop shutting down");
                break;
            }
        }
    }
}

/// Feeds telemetry to the detector.
///
/// A proposal is submitted inline, so the loop does not read the channel
/// while a submission and its refresh are in flight. The `watch` channel
/// keeps only the newest event, and samples that arrived in the meantime
/// collapse into that one reading.
pub(super) async fn detector_loop(
    session: HosSession,
    mut telemetry_rx: watch::Receiver<Option<TelemetryEvent>>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            changed = telemetry_rx.changed() => {
                if changed.is_err() {
                    log_info!("telemetry source closed; detector loop exiting");
                    break;
                }
                let event = telemetry_rx.borrow_and_update().clone();
                // no reading, no request: position and odometer context would be missing
                let Some(event) = event else {
                    continue;
                };
                if let Err(err) = session.on_telemetry(event).await {
                    log_warn!("automatic status change failed: {err:#}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("detector loop shutting down");
                break;
            }
        }
    }
}

/// Retries a submission parked behind an in-flight one. Runs whether or
/// not automatic detection is enabled.
pub(super) async fn retry_loop(session: HosSession, period: Duration, cancel_token: CancellationToken) {
    let mut retry = tokio::time::interval(period);
    retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = retry.tick() => {
                if let Err(err) = session.flush_pending().await {
                    log_warn!("parked status change failed: {err:#}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("retry loop shutting down");
                break;
            }
        }
    }
}
