//! Ledger storage: bulk insert, scoped reset and reads of ledger entries.

use jiff::Timestamp;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::model::{Action, EntryDraft, LedgerEntry, Scope};

use super::activity::scope_params;
use super::{
    Result, Storage, StorageError, parse_opt_timestamp, parse_opt_uuid, parse_timestamp,
    parse_uuid,
};

/// Outcome of writing a synthesized batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisWrite {
    /// The batch was written; `inserted` excludes drafts the unique index rejected.
    Written { removed: usize, inserted: usize },

    /// Another writer populated the scope first; nothing was written.
    AlreadyPresent { existing: usize },
}

const ENTRY_COLUMNS: &str = "id, workspace_id, project_id, user_id, action, description, \
     trust_points, action_date, metadata, created_at";

impl Storage {
    /// Counts the entries in exactly this scope.
    pub fn count_entries(&self, scope: Scope) -> Result<usize> {
        count_in(&self.conn, scope)
    }

    /// Loads the entries in exactly this scope.
    pub fn load_entries(&self, scope: Scope) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries
             WHERE workspace_id = ?1 AND project_id IS ?2"
        ))?;
        let rows = stmt
            .query_map(scope_params(scope), RawEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawEntry::into_entry).collect()
    }

    /// Loads every entry in a workspace, across the workspace-wide and all project scopes.
    pub fn load_workspace_entries(&self, workspace_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE workspace_id = ?1"
        ))?;
        let rows = stmt
            .query_map([workspace_id.to_string()], RawEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawEntry::into_entry).collect()
    }

    /// Writes a synthesized batch for one scope in a single write transaction.
    ///
    /// With `reset`, the scope's existing entries are deleted first. Without it,
    /// the scope is re-checked under the write lock and left alone if another
    /// writer already filled it. Either everything commits or nothing does.
    pub fn write_synthesized(
        &self,
        scope: Scope,
        drafts: &[EntryDraft],
        reset: bool,
    ) -> Result<SynthesisWrite> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let removed = if reset {
            delete_in(&tx, scope)?
        } else {
            let existing = count_in(&tx, scope)?;
            if existing > 0 {
                return Ok(SynthesisWrite::AlreadyPresent { existing });
            }
            0
        };

        let now = Timestamp::now();
        let mut inserted = 0;
        for draft in drafts {
            if draft.scope != scope {
                return Err(StorageError::Corrupt(format!(
                    "draft for {} written to {scope}",
                    draft.scope
                )));
            }
            inserted += insert_in(&tx, draft, now)?.map_or(0, |_| 1);
        }

        tx.commit()?;
        Ok(SynthesisWrite::Written { removed, inserted })
    }

    /// Appends a single entry and returns it as stored.
    ///
    /// Returns `None` if an entry for the same source already exists in the scope.
    pub fn append_entry(&self, draft: &EntryDraft) -> Result<Option<LedgerEntry>> {
        let now = Timestamp::now();
        let Some(id) = insert_in(&self.conn, draft, now)? else {
            return Ok(None);
        };
        Ok(Some(LedgerEntry {
            id,
            scope: draft.scope,
            user_id: draft.user_id,
            action: draft.action,
            description: draft.description.clone(),
            trust_points: draft.trust_points,
            action_date: draft.action_date,
            metadata: draft.metadata.clone(),
            created_at: now,
        }))
    }
}

fn count_in(conn: &Connection, scope: Scope) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ledger_entries WHERE workspace_id = ?1 AND project_id IS ?2",
        scope_params(scope),
        |row| row.get(0),
    )?;
    usize::try_from(count).map_err(|e| StorageError::Corrupt(format!("entry count: {e}")))
}

fn delete_in(conn: &Connection, scope: Scope) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM ledger_entries WHERE workspace_id = ?1 AND project_id IS ?2",
        scope_params(scope),
    )?)
}

/// Inserts one draft, returning its new id, or `None` if the source is already recorded.
fn insert_in(conn: &Connection, draft: &EntryDraft, now: Timestamp) -> Result<Option<Uuid>> {
    let id = Uuid::new_v4();
    let (source_type, source_id) = match draft.metadata.source() {
        Some((kind, id)) => (Some(kind.as_str()), Some(id.to_string())),
        None => (None, None),
    };
    let rows = conn.execute(
        "INSERT OR IGNORE INTO ledger_entries
         (id, workspace_id, project_id, user_id, action, description, trust_points,
          action_date, metadata, source_type, source_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            id.to_string(),
            draft.scope.workspace_id.to_string(),
            draft.scope.project_id.map(|p| p.to_string()),
            draft.user_id.to_string(),
            draft.action.code(),
            &draft.description,
            draft.trust_points,
            draft.action_date.map(|t| t.to_string()),
            serde_json::to_string(&draft.metadata)?,
            source_type,
            source_id,
            now.to_string(),
        ],
    )?;
    Ok((rows > 0).then_some(id))
}

struct RawEntry {
    id: String,
    workspace_id: String,
    project_id: Option<String>,
    user_id: String,
    action: String,
    description: String,
    trust_points: i64,
    action_date: Option<String>,
    metadata: String,
    created_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            project_id: row.get(2)?,
            user_id: row.get(3)?,
            action: row.get(4)?,
            description: row.get(5)?,
            trust_points: row.get(6)?,
            action_date: row.get(7)?,
            metadata: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_entry(self) -> Result<LedgerEntry> {
        let action = Action::from_code(&self.action)
            .ok_or_else(|| StorageError::Corrupt(format!("unknown action: {}", self.action)))?;
        Ok(LedgerEntry {
            id: parse_uuid(&self.id, "entry id")?,
            scope: Scope {
                workspace_id: parse_uuid(&self.workspace_id, "entry workspace_id")?,
                project_id: parse_opt_uuid(self.project_id, "entry project_id")?,
            },
            user_id: parse_uuid(&self.user_id, "entry user_id")?,
            action,
            description: self.description,
            trust_points: self.trust_points,
            action_date: parse_opt_timestamp(self.action_date, "entry action_date")?,
            metadata: serde_json::from_str(&self.metadata)?,
            created_at: parse_timestamp(&self.created_at, "entry created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{EntryMetadata, TaskStatus};
    use crate::storage::test_support::test_storage;

    fn task_draft(scope: Scope, task_id: Uuid, points: i64) -> EntryDraft {
        EntryDraft {
            scope,
            user_id: Uuid::new_v4(),
            action: Action::CompletedTask,
            description: "Completed task: Ship MVP".into(),
            trust_points: points,
            action_date: Some(Timestamp::new(1_700_000_000, 0).unwrap()),
            metadata: EntryMetadata::Task {
                task_id,
                title: "Ship MVP".into(),
                status: TaskStatus::Completed,
                priority: None,
            },
        }
    }

    fn manual_draft(scope: Scope) -> EntryDraft {
        EntryDraft {
            scope,
            user_id: Uuid::new_v4(),
            action: Action::ManualAdjustment,
            description: "Closed the first customer".into(),
            trust_points: 2,
            action_date: None,
            metadata: EntryMetadata::Manual {
                note: "Closed the first customer".into(),
                recorded_by: Uuid::new_v4(),
            },
        }
    }

    #[test]
    fn write_and_load_entries() {
        let (_dir, storage) = test_storage();
        let scope = Scope::project(Uuid::new_v4(), Uuid::new_v4());
        let drafts = vec![task_draft(scope, Uuid::new_v4(), 3)];

        let outcome = storage.write_synthesized(scope, &drafts, false).unwrap();
        assert_eq!(
            outcome,
            SynthesisWrite::Written {
                removed: 0,
                inserted: 1
            }
        );

        let entries = storage.load_entries(scope).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, Action::CompletedTask);
        assert_eq!(entries[0].trust_points, 3);
        assert_eq!(entries[0].metadata, drafts[0].metadata);
        assert_eq!(entries[0].scope, scope);
    }

    #[test]
    fn second_write_without_reset_is_skipped() {
        let (_dir, storage) = test_storage();
        let scope = Scope::workspace(Uuid::new_v4());
        let drafts = vec![task_draft(scope, Uuid::new_v4(), 3)];

        storage.write_synthesized(scope, &drafts, false).unwrap();
        let outcome = storage.write_synthesized(scope, &drafts, false).unwrap();

        assert_eq!(outcome, SynthesisWrite::AlreadyPresent { existing: 1 });
        assert_eq!(storage.count_entries(scope).unwrap(), 1);
    }

    #[test]
    fn duplicate_source_in_one_batch_is_ignored() {
        let (_dir, storage) = test_storage();
        let scope = Scope::workspace(Uuid::new_v4());
        let task_id = Uuid::new_v4();
        let drafts = vec![task_draft(scope, task_id, 3), task_draft(scope, task_id, 3)];

        let outcome = storage.write_synthesized(scope, &drafts, false).unwrap();

        assert_eq!(
            outcome,
            SynthesisWrite::Written {
                removed: 0,
                inserted: 1
            }
        );
    }

    #[test]
    fn same_source_may_appear_in_different_scopes() {
        let (_dir, storage) = test_storage();
        let ws = Uuid::new_v4();
        let task_id = Uuid::new_v4();
        let a = Scope::project(ws, Uuid::new_v4());
        let b = Scope::workspace(ws);

        storage
            .write_synthesized(a, &[task_draft(a, task_id, 3)], false)
            .unwrap();
        storage
            .write_synthesized(b, &[task_draft(b, task_id, 3)], false)
            .unwrap();

        assert_eq!(storage.load_workspace_entries(ws).unwrap().len(), 2);
    }

    #[test]
    fn reset_only_touches_its_own_scope() {
        let (_dir, storage) = test_storage();
        let ws = Uuid::new_v4();
        let a = Scope::project(ws, Uuid::new_v4());
        let b = Scope::project(ws, Uuid::new_v4());
        storage
            .write_synthesized(a, &[task_draft(a, Uuid::new_v4(), 3)], false)
            .unwrap();
        storage
            .write_synthesized(b, &[task_draft(b, Uuid::new_v4(), 1)], false)
            .unwrap();
        let before_b = storage.load_entries(b).unwrap();

        let outcome = storage
            .write_synthesized(a, &[task_draft(a, Uuid::new_v4(), 2)], true)
            .unwrap();

        assert_eq!(
            outcome,
            SynthesisWrite::Written {
                removed: 1,
                inserted: 1
            }
        );
        assert_eq!(storage.load_entries(a).unwrap()[0].trust_points, 2);
        assert_eq!(storage.load_entries(b).unwrap(), before_b);
    }

    #[test]
    fn draft_for_wrong_scope_rolls_back_batch() {
        let (_dir, storage) = test_storage();
        let ws = Uuid::new_v4();
        let scope = Scope::workspace(ws);
        let stray = Scope::project(ws, Uuid::new_v4());
        let drafts = vec![
            task_draft(scope, Uuid::new_v4(), 3),
            task_draft(stray, Uuid::new_v4(), 3),
        ];

        let err = storage.write_synthesized(scope, &drafts, false).unwrap_err();

        assert!(matches!(err, StorageError::Corrupt(_)));
        assert_eq!(storage.count_entries(scope).unwrap(), 0);
    }

    #[test]
    fn manual_entries_are_never_deduplicated() {
        let (_dir, storage) = test_storage();
        let scope = Scope::workspace(Uuid::new_v4());

        let first = storage.append_entry(&manual_draft(scope)).unwrap();
        let second = storage.append_entry(&manual_draft(scope)).unwrap();

        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(storage.count_entries(scope).unwrap(), 2);
    }
}
