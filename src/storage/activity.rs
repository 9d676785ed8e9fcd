//! Activity storage: tasks and documents, read by scope.
//!
//! The collaboration feature owns these rows. The upserts exist so
//! fixtures can be imported; the ledger itself only reads.

use rusqlite::Row;

use crate::model::{Document, DocumentStatus, Scope, Task, TaskStatus};

use super::{Result, Storage, parse_opt_timestamp, parse_opt_uuid, parse_timestamp, parse_uuid};

impl Storage {
    /// Inserts or replaces a task.
    pub fn upsert_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO tasks
             (id, title, status, priority, workspace_id, project_id, assigned_to, created_by,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                task.id.to_string(),
                &task.title,
                task.status.as_str(),
                &task.priority,
                task.workspace_id.to_string(),
                task.project_id.map(|id| id.to_string()),
                task.assigned_to.map(|id| id.to_string()),
                task.created_by.map(|id| id.to_string()),
                task.created_at.to_string(),
                task.updated_at.map(|t| t.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Inserts or replaces a document.
    pub fn upsert_document(&self, document: &Document) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO documents
             (id, title, doc_type, status, workspace_id, project_id, uploaded_by,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                document.id.to_string(),
                &document.title,
                &document.doc_type,
                document.status.as_ref().map(DocumentStatus::as_str),
                document.workspace_id.to_string(),
                document.project_id.map(|id| id.to_string()),
                document.uploaded_by.map(|id| id.to_string()),
                document.created_at.to_string(),
                document.updated_at.map(|t| t.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Loads the tasks belonging to exactly this scope.
    pub fn load_tasks(&self, scope: Scope) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, status, priority, workspace_id, project_id, assigned_to,
                    created_by, created_at, updated_at
             FROM tasks WHERE workspace_id = ?1 AND project_id IS ?2",
        )?;
        let rows = stmt
            .query_map(scope_params(scope), RawTask::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawTask::into_task).collect()
    }

    /// Loads the documents belonging to exactly this scope.
    pub fn load_documents(&self, scope: Scope) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, doc_type, status, workspace_id, project_id, uploaded_by,
                    created_at, updated_at
             FROM documents WHERE workspace_id = ?1 AND project_id IS ?2",
        )?;
        let rows = stmt
            .query_map(scope_params(scope), RawDocument::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RawDocument::into_document).collect()
    }
}

/// `project_id IS ?2` matches NULL against NULL, so one query covers both scope kinds.
pub(super) fn scope_params(scope: Scope) -> [Option<String>; 2] {
    [
        Some(scope.workspace_id.to_string()),
        scope.project_id.map(|id| id.to_string()),
    ]
}

struct RawTask {
    id: String,
    title: String,
    status: String,
    priority: Option<String>,
    workspace_id: String,
    project_id: Option<String>,
    assigned_to: Option<String>,
    created_by: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl RawTask {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            status: row.get(2)?,
            priority: row.get(3)?,
            workspace_id: row.get(4)?,
            project_id: row.get(5)?,
            assigned_to: row.get(6)?,
            created_by: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        Ok(Task {
            id: parse_uuid(&self.id, "task id")?,
            title: self.title,
            status: TaskStatus::from(self.status),
            priority: self.priority,
            workspace_id: parse_uuid(&self.workspace_id, "task workspace_id")?,
            project_id: parse_opt_uuid(self.project_id, "task project_id")?,
            assigned_to: parse_opt_uuid(self.assigned_to, "task assigned_to")?,
            created_by: parse_opt_uuid(self.created_by, "task created_by")?,
            created_at: parse_timestamp(&self.created_at, "task created_at")?,
            updated_at: parse_opt_timestamp(self.updated_at, "task updated_at")?,
        })
    }
}

struct RawDocument {
    id: String,
    title: String,
    doc_type: Option<String>,
    status: Option<String>,
    workspace_id: String,
    project_id: Option<String>,
    uploaded_by: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl RawDocument {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            doc_type: row.get(2)?,
            status: row.get(3)?,
            workspace_id: row.get(4)?,
            project_id: row.get(5)?,
            uploaded_by: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_document(self) -> Result<Document> {
        Ok(Document {
            id: parse_uuid(&self.id, "document id")?,
            title: self.title,
            doc_type: self.doc_type,
            status: self.status.map(DocumentStatus::from),
            workspace_id: parse_uuid(&self.workspace_id, "document workspace_id")?,
            project_id: parse_opt_uuid(self.project_id, "document project_id")?,
            uploaded_by: parse_opt_uuid(self.uploaded_by, "document uploaded_by")?,
            created_at: parse_timestamp(&self.created_at, "document created_at")?,
            updated_at: parse_opt_timestamp(self.updated_at, "document updated_at")?,
        })
    }
}
