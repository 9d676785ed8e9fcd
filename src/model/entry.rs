//! Ledger entries: the persisted unit of trust accounting.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DocumentStatus, TaskStatus};

/// Where an entry lives: a whole workspace, or one project inside it.
///
/// Synthesis, emptiness checks and resets always operate on an exact scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub workspace_id: Uuid,
    pub project_id: Option<Uuid>,
}

impl Scope {
    /// The workspace-wide scope (entries not tied to any project).
    pub fn workspace(workspace_id: Uuid) -> Self {
        Self {
            workspace_id,
            project_id: None,
        }
    }

    /// A project scope inside a workspace.
    pub fn project(workspace_id: Uuid, project_id: Uuid) -> Self {
        Self {
            workspace_id,
            project_id: Some(project_id),
        }
    }

    /// Whether a record owned by the given workspace/project falls in this scope.
    pub fn contains(&self, workspace_id: Uuid, project_id: Option<Uuid>) -> bool {
        self.workspace_id == workspace_id && self.project_id == project_id
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.project_id {
            Some(p) => write!(f, "project {p} in workspace {}", self.workspace_id),
            None => write!(f, "workspace {}", self.workspace_id),
        }
    }
}

/// What an entry records. A closed set of codes, stored as snake_case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CompletedTask,
    SubmittedTaskForReview,
    StartedTask,
    CancelledTask,
    UpdatedTask,
    DocumentApproved,
    DocumentUploaded,
    DocumentRejected,
    ManualAdjustment,
}

impl Action {
    pub const ALL: [Self; 9] = [
        Self::CompletedTask,
        Self::SubmittedTaskForReview,
        Self::StartedTask,
        Self::CancelledTask,
        Self::UpdatedTask,
        Self::DocumentApproved,
        Self::DocumentUploaded,
        Self::DocumentRejected,
        Self::ManualAdjustment,
    ];

    /// The stored code, e.g. `completed_task`.
    pub const fn code(self) -> &'static str {
        match self {
            Self::CompletedTask => "completed_task",
            Self::SubmittedTaskForReview => "submitted_task_for_review",
            Self::StartedTask => "started_task",
            Self::CancelledTask => "cancelled_task",
            Self::UpdatedTask => "updated_task",
            Self::DocumentApproved => "document_approved",
            Self::DocumentUploaded => "document_uploaded",
            Self::DocumentRejected => "document_rejected",
            Self::ManualAdjustment => "manual_adjustment",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    /// Short readable label for feed display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CompletedTask => "Completed task",
            Self::SubmittedTaskForReview => "Submitted task for review",
            Self::StartedTask => "Started task",
            Self::CancelledTask => "Cancelled task",
            Self::UpdatedTask => "Updated task",
            Self::DocumentApproved => "Document approved",
            Self::DocumentUploaded => "Uploaded document",
            Self::DocumentRejected => "Document rejected",
            Self::ManualAdjustment => "Trust adjustment",
        }
    }

    pub const fn is_task(self) -> bool {
        matches!(
            self,
            Self::CompletedTask
                | Self::SubmittedTaskForReview
                | Self::StartedTask
                | Self::CancelledTask
                | Self::UpdatedTask
        )
    }

    pub const fn is_document(self) -> bool {
        matches!(
            self,
            Self::DocumentApproved | Self::DocumentUploaded | Self::DocumentRejected
        )
    }
}

/// Provenance of an entry, enough to narrate it without re-reading sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum EntryMetadata {
    Task {
        task_id: Uuid,
        title: String,
        status: TaskStatus,
        priority: Option<String>,
    },
    Document {
        document_id: Uuid,
        title: String,
        doc_type: Option<String>,
        status: Option<DocumentStatus>,
    },
    /// Recorded by hand rather than derived from activity.
    Manual { note: String, recorded_by: Uuid },
}

/// Kind of source record an entry was synthesized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Task,
    Document,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Document => "document",
        }
    }
}

impl EntryMetadata {
    /// The source record this entry was derived from, if any.
    pub fn source(&self) -> Option<(SourceKind, Uuid)> {
        match self {
            Self::Task { task_id, .. } => Some((SourceKind::Task, *task_id)),
            Self::Document { document_id, .. } => Some((SourceKind::Document, *document_id)),
            Self::Manual { .. } => None,
        }
    }
}

/// An entry ready to persist. Id and creation time are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub scope: Scope,
    pub user_id: Uuid,
    pub action: Action,
    pub description: String,
    pub trust_points: i64,
    pub action_date: Option<Timestamp>,
    pub metadata: EntryMetadata,
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub scope: Scope,
    pub user_id: Uuid,
    pub action: Action,
    pub description: String,
    pub trust_points: i64,
    pub action_date: Option<Timestamp>,
    pub metadata: EntryMetadata,
    pub created_at: Timestamp,
}

impl LedgerEntry {
    /// The instant used for scoring and ordering.
    pub fn effective_date(&self) -> Timestamp {
        self.action_date.unwrap_or(self.created_at)
    }
}
