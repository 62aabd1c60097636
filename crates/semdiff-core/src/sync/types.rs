//! Sync-specific types: transport trait, store trait, and the wire payloads
//! exchanged with the remote endpoint.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SemdiffError};
use crate::storage::traits::{ChangeLog, StorageEngine};
use crate::storage::types::{ChangeRecord, ChangeRow, Note, Rating, Scale, ScaleInput, Student};

// ============================================================================
// SyncTransport: network layer
// ============================================================================

/// Network layer used by the sync engine.
///
/// Implementations talk to the remote endpoint; [`super::HttpTransport`] is
/// the reqwest-based one.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Upload a batch of local changes. `Ok` means the server accepted all of
    /// them.
    async fn push(&self, batch: &PushBatch) -> std::result::Result<(), TransportError>;

    /// Fetch every record changed since `since` (epoch milliseconds).
    async fn pull(&self, since: i64) -> std::result::Result<PullPayload, TransportError>;
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, timeout.
    Network,
    /// Non-2xx response.
    Status(u16),
    /// Response body did not match the expected shape.
    Decode,
}

/// Transport-level error.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
    pub kind: TransportErrorKind,
}

impl TransportError {
    pub fn new(message: impl Into<String>, kind: TransportErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(message, TransportErrorKind::Network)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(message, TransportErrorKind::Status(status))
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(message, TransportErrorKind::Decode)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Status(code) => write!(f, "HTTP {}: {}", code, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for SemdiffError {
    fn from(err: TransportError) -> Self {
        SemdiffError::Transport(err.to_string())
    }
}

// ============================================================================
// SyncStore: storage interface for sync
// ============================================================================

/// Storage used by the sync engine: the repository, the change log, and a
/// last-write-wins merge of pulled records.
pub trait SyncStore: StorageEngine + ChangeLog {
    /// Merge remote records in one transaction.
    ///
    /// A record is written when no local row exists or its `updated_at` is
    /// strictly greater than the local one. Merged records do not enter the
    /// change log.
    fn apply_remote(&self, payload: &PullPayload) -> Result<MergeReport>;
}

// ============================================================================
// Wire payloads
// ============================================================================

/// Body of `POST {api_base}/sync`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushBatch {
    pub students: Vec<Student>,
    pub scales: Vec<Scale>,
    pub ratings: Vec<Rating>,
    pub notes: Vec<Note>,
}

impl PushBatch {
    /// Group queued changes by entity, keeping queue order within each group.
    pub fn from_changes(changes: &[ChangeRow]) -> Self {
        let mut batch = Self::default();
        for change in changes {
            match &change.record {
                ChangeRecord::Student(s) => batch.students.push(s.clone()),
                ChangeRecord::Scale(s) => batch.scales.push(s.clone()),
                ChangeRecord::Rating(r) => batch.ratings.push(r.clone()),
                ChangeRecord::Note(n) => batch.notes.push(n.clone()),
            }
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.students.len() + self.scales.len() + self.ratings.len() + self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body of `GET {api_base}/sync?since=...`.
///
/// Scales may omit optional fields; they are defaulted when merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullPayload {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub scales: Vec<ScaleInput>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl PullPayload {
    pub fn len(&self) -> usize {
        self.students.len() + self.scales.len() + self.ratings.len() + self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applied/skipped counts for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCount {
    pub applied: usize,
    pub skipped: usize,
}

impl MergeCount {
    pub(crate) fn record(&mut self, applied: bool) {
        if applied {
            self.applied += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Outcome of [`SyncStore::apply_remote`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub students: MergeCount,
    pub scales: MergeCount,
    pub ratings: MergeCount,
    pub notes: MergeCount,
}

impl MergeReport {
    pub fn applied(&self) -> usize {
        self.students.applied + self.scales.applied + self.ratings.applied + self.notes.applied
    }

    pub fn skipped(&self) -> usize {
        self.students.skipped + self.scales.skipped + self.ratings.skipped + self.notes.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_payload_missing_lists_default_to_empty() {
        let payload: PullPayload = serde_json::from_str(r#"{"ratings": []}"#).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_pull_payload_rejects_wrong_shape() {
        let result: std::result::Result<PullPayload, _> =
            serde_json::from_str(r#"{"students": [{"id": "not-a-number"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pull_payload_scale_optional_fields() {
        let payload: PullPayload = serde_json::from_str(
            r#"{"scales": [{"id": "s", "left_label": "a", "right_label": "b", "min": null}]}"#,
        )
        .unwrap();
        assert_eq!(payload.scales[0].min, None);
        assert_eq!(payload.scales[0].sort_index, None);
    }

    #[test]
    fn test_push_batch_groups_in_queue_order() {
        let rating = |id: &str, updated_at| Rating {
            id: id.to_string(),
            student_id: 1,
            scale_id: "s".into(),
            value: 1.0,
            recorded_at: updated_at,
            updated_at,
        };
        let changes = vec![
            ChangeRow {
                id: 1,
                record: ChangeRecord::Rating(rating("r1", 10)),
                updated_at: 10,
            },
            ChangeRow {
                id: 2,
                record: ChangeRecord::Rating(rating("r2", 20)),
                updated_at: 20,
            },
        ];
        let batch = PushBatch::from_changes(&changes);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ratings[0].id, "r1");
        assert_eq!(batch.ratings[1].id, "r2");
        assert!(batch.students.is_empty());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::status(401, "unauthorized");
        assert_eq!(err.to_string(), "HTTP 401: unauthorized");
        let core: SemdiffError = err.into();
        assert!(matches!(core, SemdiffError::Transport(_)));
    }
}
