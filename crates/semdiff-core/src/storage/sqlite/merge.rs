//! Last-write-wins merge of pulled records.

use tracing::debug;

use super::{
    fetch_note, fetch_rating, fetch_scale, fetch_student, next_sort_index, write_note,
    write_rating, write_scale, write_student, SqliteStorage,
};
use crate::error::Result;
use crate::storage::types::normalize_tags;
use crate::sync::types::{MergeReport, PullPayload, SyncStore};

/// Incoming wins only when strictly newer than the local row.
fn incoming_wins(local_updated_at: Option<i64>, incoming_updated_at: i64) -> bool {
    match local_updated_at {
        None => true,
        Some(local) => incoming_updated_at > local,
    }
}

impl SyncStore for SqliteStorage {
    fn apply_remote(&self, payload: &PullPayload) -> Result<MergeReport> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        let mut report = MergeReport::default();

        for student in &payload.students {
            let local = fetch_student(&tx, student.id)?;
            let wins = incoming_wins(local.map(|s| s.updated_at), student.updated_at);
            if wins {
                write_student(&tx, student)?;
            }
            report.students.record(wins);
        }

        for input in &payload.scales {
            let local = fetch_scale(&tx, &input.id)?;
            let incoming_updated_at = input.updated_at.unwrap_or(0);
            let wins = incoming_wins(
                local.as_ref().map(|s| s.updated_at),
                incoming_updated_at,
            );
            if wins {
                let fallback = match &local {
                    Some(existing) => existing.sort_index,
                    None => next_sort_index(&tx, "scales")?,
                };
                let scale = input.clone().normalize(fallback, incoming_updated_at);
                write_scale(&tx, &scale)?;
            }
            report.scales.record(wins);
        }

        for note in &payload.notes {
            let local = fetch_note(&tx, &note.id)?;
            let wins = incoming_wins(local.map(|n| n.updated_at), note.updated_at);
            if wins {
                let mut normalized = note.clone();
                normalized.tags = normalize_tags(&note.tags);
                write_note(&tx, &normalized)?;
            }
            report.notes.record(wins);
        }

        for rating in &payload.ratings {
            let local = fetch_rating(&tx, &rating.id)?;
            let wins = incoming_wins(local.map(|r| r.updated_at), rating.updated_at)
                && rating.value.is_finite();
            if wins {
                write_rating(&tx, rating)?;
            }
            report.ratings.record(wins);
        }

        tx.commit()?;
        debug!(
            applied = report.applied(),
            skipped = report.skipped(),
            "remote changes merged"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_wins_is_strict() {
        assert!(incoming_wins(None, 0));
        assert!(incoming_wins(Some(100), 150));
        assert!(!incoming_wins(Some(100), 100));
        assert!(!incoming_wins(Some(100), 50));
    }
}
