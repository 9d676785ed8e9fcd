//! Activity records: the raw tasks and documents the ledger is derived from.
//!
//! These are owned by the collaboration feature. The ledger only reads them.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task in a workspace, optionally inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<String>,
    pub workspace_id: Uuid,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Task {
    /// The user credited for this task: the assignee, else the creator.
    pub fn subject(&self) -> Option<Uuid> {
        self.assigned_to.or(self.created_by)
    }

    /// When the task last changed state.
    pub fn effective_date(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// A document uploaded to a workspace, optionally inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    pub workspace_id: Uuid,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub uploaded_by: Option<Uuid>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Document {
    /// The user credited for this document: whoever uploaded it.
    pub fn subject(&self) -> Option<Uuid> {
        self.uploaded_by
    }

    /// When the document last changed state.
    pub fn effective_date(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Task lifecycle status.
///
/// Unrecognized values are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
    Cancelled,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "todo" => Self::Todo,
            "in_progress" => Self::InProgress,
            "review" => Self::Review,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Document review status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
    Other(String),
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for DocumentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Other(s),
        }
    }
}

impl From<DocumentStatus> for String {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}
