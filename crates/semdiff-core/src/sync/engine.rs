//! Push/pull sync engine.
//!
//! A sync drains the change log to the remote endpoint, then pulls every
//! record changed since the stored watermark and merges it with
//! last-write-wins. Failures are logged and reported, never raised.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::status::SyncStatus;
use super::types::{MergeReport, PushBatch, SyncStore, SyncTransport};
use crate::error::{Result, SemdiffError};
use crate::now_ms;
use crate::storage::types::settings_keys;

/// Result of the push half of a sync.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The change log was empty; no request was made.
    Skipped,
    /// The server accepted `count` changes; rows up to `cleared_through`
    /// were removed from the log.
    Pushed { count: usize, cleared_through: i64 },
    /// The push failed; the change log is intact.
    Failed(String),
}

/// Result of the pull half of a sync.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// Remote changes were merged and the watermark moved to `watermark`.
    Pulled { merge: MergeReport, watermark: i64 },
    /// The pull failed; the watermark is unchanged.
    Failed(String),
}

/// Outcome of one [`SyncEngine::sync_now`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub push: PushOutcome,
    pub pull: PullOutcome,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.push, PushOutcome::Failed(_)) && !matches!(self.pull, PullOutcome::Failed(_))
    }
}

/// Drives synchronization of a [`SyncStore`] through a [`SyncTransport`].
pub struct SyncEngine<S: SyncStore> {
    store: Arc<S>,
    transport: Arc<dyn SyncTransport>,
    status: Arc<SyncStatus>,
}

impl<S: SyncStore> SyncEngine<S> {
    pub fn new(store: Arc<S>, transport: Arc<dyn SyncTransport>) -> Self {
        Self::with_status(store, transport, Arc::new(SyncStatus::default()))
    }

    /// Share an existing status object (e.g. with a UI badge).
    pub fn with_status(
        store: Arc<S>,
        transport: Arc<dyn SyncTransport>,
        status: Arc<SyncStatus>,
    ) -> Self {
        Self {
            store,
            transport,
            status,
        }
    }

    pub fn status(&self) -> &Arc<SyncStatus> {
        &self.status
    }

    /// Last pull watermark in epoch milliseconds; 0 when never synced.
    pub fn watermark(&self) -> Result<i64> {
        read_watermark(self.store.as_ref())
    }

    /// Push, then pull. Both halves run even if the other fails.
    pub async fn sync_now(&self) -> SyncReport {
        let _guard = self.status.begin();

        let push = match self.push().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "sync push failed");
                PushOutcome::Failed(e.to_string())
            }
        };

        let pull = match self.pull().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "sync pull failed");
                PullOutcome::Failed(e.to_string())
            }
        };

        let report = SyncReport { push, pull };
        info!(success = report.is_success(), "sync finished");
        report
    }

    /// Record connectivity; an offline to online transition triggers a sync.
    pub async fn on_connectivity_change(&self, online: bool) -> Option<SyncReport> {
        let was_online = self.status.set_online(online);
        if online && !was_online {
            debug!("connectivity regained");
            Some(self.sync_now().await)
        } else {
            None
        }
    }

    async fn push(&self) -> Result<PushOutcome> {
        let pending = self.store.pending_changes()?;
        let Some(last) = pending.last() else {
            debug!("change log empty, push skipped");
            return Ok(PushOutcome::Skipped);
        };
        let cleared_through = last.id;

        let batch = PushBatch::from_changes(&pending);
        self.transport.push(&batch).await?;

        self.store.clear_changes_through(cleared_through)?;
        info!(count = batch.len(), "pushed local changes");
        Ok(PushOutcome::Pushed {
            count: batch.len(),
            cleared_through,
        })
    }

    async fn pull(&self) -> Result<PullOutcome> {
        let since = read_watermark(self.store.as_ref())?;
        let started = now_ms();

        let payload = self.transport.pull(since).await?;
        let merge = self.store.apply_remote(&payload)?;

        let watermark = since.max(started);
        self.store
            .set_setting(settings_keys::LAST_SYNC, &watermark.to_string())?;
        info!(
            since,
            applied = merge.applied(),
            skipped = merge.skipped(),
            "pulled remote changes"
        );
        Ok(PullOutcome::Pulled { merge, watermark })
    }
}

fn read_watermark<S: SyncStore + ?Sized>(store: &S) -> Result<i64> {
    match store.get_setting(settings_keys::LAST_SYNC)? {
        None => Ok(0),
        Some(value) => value.trim().parse::<i64>().map_err(|e| {
            SemdiffError::Storage(format!("Invalid sync watermark '{}': {}", value, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_success_requires_both_halves() {
        let ok = SyncReport {
            push: PushOutcome::Skipped,
            pull: PullOutcome::Pulled {
                merge: MergeReport::default(),
                watermark: 1,
            },
        };
        assert!(ok.is_success());
        let failed = SyncReport {
            push: PushOutcome::Failed("down".into()),
            ..ok
        };
        assert!(!failed.is_success());
    }
}
