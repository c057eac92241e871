//! Daily purge of confirmation codes past their grace period.
//!
//! Fires once a day at a configured UTC time of day. Each run reads the clock
//! once and issues exactly one purge. Runs never overlap: a run triggered
//! while another is in flight (for example the admin endpoint during the
//! scheduled tick) is skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use obmin_core::scheduling::next_daily_run;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::confirmation::ConfirmationService;

/// Outcome of a single purge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeRun {
    Completed { deleted: u64 },
    /// Another run held the guard.
    Skipped,
    Failed(String),
}

pub struct ConfirmationScheduler {
    service: Arc<ConfirmationService>,
    run_at: NaiveTime,
    grace_hours: i64,
    guard: Mutex<()>,
}

impl ConfirmationScheduler {
    pub fn new(service: Arc<ConfirmationService>, run_at: NaiveTime, grace_hours: i64) -> Self {
        Self {
            service,
            run_at,
            grace_hours,
            guard: Mutex::new(()),
        }
    }

    /// Execute one purge now unless a run is already in progress.
    pub async fn run_once(&self) -> PurgeRun {
        let Ok(_running) = self.guard.try_lock() else {
            tracing::warn!("Confirmation purge already running, skipping");
            return PurgeRun::Skipped;
        };

        let now = Utc::now();
        match self.service.purge_expired(now, self.grace_hours).await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(
                        deleted,
                        grace_hours = self.grace_hours,
                        "Confirmation purge: removed codes"
                    );
                } else {
                    tracing::debug!("Confirmation purge: nothing to remove");
                }
                PurgeRun::Completed { deleted }
            }
            Err(e) => {
                tracing::error!(error = %e, "Confirmation purge failed");
                PurgeRun::Failed(e.to_string())
            }
        }
    }

    /// Sleep until each daily fire time and run, until `cancel` is triggered.
    ///
    /// The next fire time is computed after a run completes, so a run that
    /// overruns a fire time causes that tick to be skipped.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            run_at = %self.run_at,
            grace_hours = self.grace_hours,
            "Confirmation purge job started"
        );

        loop {
            let now = Utc::now();
            let next = next_daily_run(now, self.run_at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, "Confirmation purge scheduled");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Confirmation purge job stopping");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.run_once().await;
                }
            }
        }
    }

    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obmin_core::confirmation::ConfirmationCode;
    use obmin_core::store::memory::InMemoryStore;
    use obmin_core::store::ConfirmationCodeStore;

    fn scheduler(store: &Arc<InMemoryStore>, grace_hours: i64) -> Arc<ConfirmationScheduler> {
        let service = Arc::new(ConfirmationService::new(
            store.clone(),
            24,
            Duration::from_secs(1),
        ));
        Arc::new(ConfirmationScheduler::new(
            service,
            NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
            grace_hours,
        ))
    }

    #[tokio::test]
    async fn run_once_purges_past_grace_only() {
        let store = Arc::new(InMemoryStore::new());
        let old = ConfirmationCode::generate(1, 1, Utc::now() - chrono::Duration::days(10));
        let fresh = ConfirmationCode::generate(1, 1, Utc::now() - chrono::Duration::hours(5));
        store.insert(&old).await.unwrap();
        store.insert(&fresh).await.unwrap();

        let scheduler = scheduler(&store, 48);
        assert_eq!(scheduler.run_once().await, PurgeRun::Completed { deleted: 1 });
        assert!(store.find(fresh.id).await.unwrap().is_some());
        assert_eq!(scheduler.run_once().await, PurgeRun::Completed { deleted: 0 });
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = scheduler(&store, 48);

        let held = scheduler.guard.lock().await;
        assert_eq!(scheduler.run_once().await, PurgeRun::Skipped);
        drop(held);

        assert_eq!(scheduler.run_once().await, PurgeRun::Completed { deleted: 0 });
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = scheduler(&store, 48);
        store.set_available(false);

        assert!(matches!(scheduler.run_once().await, PurgeRun::Failed(_)));
    }

    #[tokio::test]
    async fn spawned_job_stops_on_cancel() {
        let store = Arc::new(InMemoryStore::new());
        let scheduler = scheduler(&store, 48);
        let cancel = CancellationToken::new();

        let handle = scheduler.spawn(cancel.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("job should stop on cancel")
            .unwrap();
    }
}
