//! Periodic removal of revocation entries whose token has expired anyway.
//!
//! Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use obmin_core::store::{with_timeout, RevocationStore};
use tokio_util::sync::CancellationToken;

/// Run the reaper loop until `cancel` is triggered.
pub async fn run(
    revocations: Arc<dyn RevocationStore>,
    every: Duration,
    store_timeout: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Revocation reaper started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Revocation reaper stopping");
                break;
            }
            _ = interval.tick() => {
                match with_timeout(store_timeout, revocations.reap(Utc::now())).await {
                    Ok(reaped) => {
                        if reaped > 0 {
                            tracing::info!(reaped, "Revocation reaper: dropped expired entries");
                        } else {
                            tracing::debug!("Revocation reaper: nothing to drop");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Revocation reaper: reap failed");
                    }
                }
            }
        }
    }
}
