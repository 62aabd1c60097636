//! Change log on the `changes` table.

use rusqlite::params;

use super::row::ChangeRowRaw;
use super::SqliteStorage;
use crate::error::Result;
use crate::storage::traits::ChangeLog;
use crate::storage::types::{ChangeRecord, ChangeRow};

impl ChangeLog for SqliteStorage {
    fn enqueue_change(&self, record: &ChangeRecord) -> Result<i64> {
        let conn = self.lock_conn()?;
        let data = record.to_json()?;
        conn.execute(
            "INSERT INTO changes (entity, data, updated_at) VALUES (?1, ?2, ?3)",
            params![record.entity().as_str(), data, record.updated_at()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn pending_changes(&self) -> Result<Vec<ChangeRow>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id, entity, data, updated_at FROM changes ORDER BY id")?;
        let rows = stmt
            .query_map([], ChangeRowRaw::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(ChangeRow::try_from).collect()
    }

    fn change_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM changes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear_changes_through(&self, max_id: i64) -> Result<usize> {
        let conn = self.lock_conn()?;
        let removed = conn.execute("DELETE FROM changes WHERE id <= ?1", [max_id])?;
        Ok(removed)
    }
}
