//! Entry synthesis: deriving ledger entries from raw activity.
//!
//! Synthesis runs once per scope. Its output is cached in the ledger table,
//! so later activity changes do not rewrite entries unless a reset is forced.

use tracing::{debug, info};

use crate::model::{
    Action, Document, DocumentStatus, EntryDraft, EntryMetadata, Scope, Task, TaskStatus,
};
use crate::storage::{self, Storage, SynthesisWrite};

/// Points and action code for a task in the given status.
pub fn task_rule(status: &TaskStatus) -> (Action, i64) {
    match status {
        TaskStatus::Completed => (Action::CompletedTask, 3),
        TaskStatus::Review => (Action::SubmittedTaskForReview, 2),
        TaskStatus::InProgress => (Action::StartedTask, 1),
        TaskStatus::Cancelled => (Action::CancelledTask, -1),
        TaskStatus::Todo | TaskStatus::Other(_) => (Action::UpdatedTask, 0),
    }
}

/// Points and action code for a document in the given status.
///
/// A missing status counts as a fresh upload.
pub fn document_rule(status: Option<&DocumentStatus>) -> (Action, i64) {
    match status {
        Some(DocumentStatus::Approved) => (Action::DocumentApproved, 2),
        Some(DocumentStatus::Rejected) => (Action::DocumentRejected, -1),
        Some(DocumentStatus::Pending | DocumentStatus::Other(_)) | None => {
            (Action::DocumentUploaded, 1)
        }
    }
}

/// Derive entry drafts for a scope from its tasks and documents.
///
/// Records without a subject user are skipped, as are records that belong
/// to a different scope.
pub fn synthesize(scope: Scope, tasks: &[Task], documents: &[Document]) -> Vec<EntryDraft> {
    let from_tasks = tasks
        .iter()
        .filter(|t| scope.contains(t.workspace_id, t.project_id))
        .filter_map(|t| task_draft(scope, t));
    let from_documents = documents
        .iter()
        .filter(|d| scope.contains(d.workspace_id, d.project_id))
        .filter_map(|d| document_draft(scope, d));
    from_tasks.chain(from_documents).collect()
}

fn task_draft(scope: Scope, task: &Task) -> Option<EntryDraft> {
    let Some(user_id) = task.subject() else {
        debug!(task_id = %task.id, "skipping task with no assignee or creator");
        return None;
    };
    let (action, trust_points) = task_rule(&task.status);
    Some(EntryDraft {
        scope,
        user_id,
        action,
        description: format!("{}: {}", action.label(), task.title),
        trust_points,
        action_date: Some(task.effective_date()),
        metadata: EntryMetadata::Task {
            task_id: task.id,
            title: task.title.clone(),
            status: task.status.clone(),
            priority: task.priority.clone(),
        },
    })
}

fn document_draft(scope: Scope, document: &Document) -> Option<EntryDraft> {
    let Some(user_id) = document.subject() else {
        debug!(document_id = %document.id, "skipping document with no uploader");
        return None;
    };
    let (action, trust_points) = document_rule(document.status.as_ref());
    Some(EntryDraft {
        scope,
        user_id,
        action,
        description: format!("{}: {}", action.label(), document.title),
        trust_points,
        action_date: Some(document.effective_date()),
        metadata: EntryMetadata::Document {
            document_id: document.id,
            title: document.title.clone(),
            doc_type: document.doc_type.clone(),
            status: document.status.clone(),
        },
    })
}

/// What [`ensure_entries`] did for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synthesis {
    /// Entries already existed and were reused.
    Reused { existing: usize },

    /// Entries were (re)generated from activity.
    Generated { removed: usize, inserted: usize },
}

/// Make sure a scope has ledger entries, synthesizing them if it has none.
///
/// With `force`, the scope's entries are deleted and regenerated regardless.
/// The write is a single transaction: a failure leaves the scope as it was,
/// and the next read tries again. A scope with no activity is left untouched
/// and reported as `Reused { existing: 0 }`.
pub fn ensure_entries(storage: &Storage, scope: Scope, force: bool) -> storage::Result<Synthesis> {
    if !force {
        let existing = storage.count_entries(scope)?;
        if existing > 0 {
            return Ok(Synthesis::Reused { existing });
        }
    }

    let tasks = storage.load_tasks(scope)?;
    let documents = storage.load_documents(scope)?;
    let drafts = synthesize(scope, &tasks, &documents);
    if drafts.is_empty() && !force {
        debug!(%scope, "no activity to synthesize");
        return Ok(Synthesis::Reused { existing: 0 });
    }

    match storage.write_synthesized(scope, &drafts, force)? {
        SynthesisWrite::Written { removed, inserted } => {
            info!(%scope, removed, inserted, "synthesized ledger entries");
            Ok(Synthesis::Generated { removed, inserted })
        }
        SynthesisWrite::AlreadyPresent { existing } => {
            debug!(%scope, existing, "scope synthesized concurrently, reusing entries");
            Ok(Synthesis::Reused { existing })
        }
    }
}
