//! Ledger reads and writes, as the surrounding application calls them.
//!
//! Each call is independent: check access, make sure the scope is
//! synthesized, then aggregate and annotate from storage. Access and
//! storage failures fail the call; generation failures never do.

use std::collections::{BTreeMap, HashMap};

use jiff::Zoned;
use jiff::tz::TimeZone;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::annotate::{Annotator, Narrative, UNKNOWN_ACTOR, categories};
use crate::model::{
    Action, ActivityItem, CategoryScore, DocumentStatus, EntryDraft, EntryMetadata, Insight,
    ItemKind, LedgerEntry, MemberStatus, Scope, TaskStatus, TrustScore,
};
use crate::score::{self, Cutoffs, ScorePolicy};
use crate::storage::{Storage, StorageError};
use crate::synthesize::{self, Synthesis};

/// Largest page a workspace read may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Largest adjustment, either way, a single manual entry may carry.
pub const MAX_MANUAL_POINTS: i64 = 100;

/// Errors surfaced to callers. Generation problems never appear here.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("access denied: {user} is not an active member of workspace {workspace}")]
    AccessDenied { user: Uuid, workspace: Uuid },

    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("time error: {0}")]
    Time(#[from] jiff::Error),
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ProjectNotFound(id) => Self::ProjectNotFound(id),
            other => Self::Storage(other),
        }
    }
}

pub type Result<T> = core::result::Result<T, LedgerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceRequest {
    pub workspace_id: Uuid,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRequest {
    pub project_id: Uuid,
    /// Delete and resynthesize the project's entries.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualEntryRequest {
    pub workspace_id: Uuid,
    pub project_id: Option<Uuid>,
    pub user_id: Uuid,
    pub points: i64,
    pub note: String,
}

/// Workspace-wide view: a page of the feed plus bounded scores.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLedger {
    pub workspace_id: Uuid,
    pub activities: Vec<ActivityItem>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub trust_scores: BTreeMap<Uuid, TrustScore>,
    pub insights: Vec<Insight>,
    pub categories: Vec<CategoryScore>,
}

/// Project view: the full feed plus unbounded scores.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLedger {
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    /// Whether entries were (re)generated by this read.
    pub synthesized: bool,
    pub activities: Vec<ActivityItem>,
    pub trust_scores: BTreeMap<Uuid, TrustScore>,
    pub insights: Vec<Insight>,
    pub categories: Vec<CategoryScore>,
}

/// Ledger operations over one datastore and one annotator.
pub struct Ledger<'a> {
    storage: &'a Storage,
    annotator: &'a Annotator,
    time_zone: TimeZone,
}

impl<'a> Ledger<'a> {
    pub fn new(storage: &'a Storage, annotator: &'a Annotator, time_zone: TimeZone) -> Self {
        Self {
            storage,
            annotator,
            time_zone,
        }
    }

    /// Workspace-scoped read: every entry in the workspace, scored on the bounded scale.
    ///
    /// Feed items are all `trust_entry` and always verified.
    pub async fn workspace(
        &self,
        requester: Option<Uuid>,
        request: WorkspaceRequest,
    ) -> Result<WorkspaceLedger> {
        let requester = requester.ok_or(LedgerError::Unauthenticated)?;
        self.authorize(request.workspace_id, requester)?;
        if request.page == 0 {
            return Err(LedgerError::InvalidRequest("page starts at 1".into()));
        }
        if request.page_size == 0 || request.page_size > MAX_PAGE_SIZE {
            return Err(LedgerError::InvalidRequest(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        synthesize::ensure_entries(self.storage, Scope::workspace(request.workspace_id), false)?;

        let mut entries = self.storage.load_workspace_entries(request.workspace_id)?;
        sort_newest_first(&mut entries);
        let names = self.display_names(&entries)?;
        let cutoffs = self.cutoffs()?;
        let trust_scores = score::aggregate(&entries, ScorePolicy::Bounded, &cutoffs);

        let total = entries.len();
        let start = (request.page - 1).saturating_mul(request.page_size).min(total);
        let end = start.saturating_add(request.page_size).min(total);
        let page = &entries[start..end];

        let (activities, insights) = futures::join!(
            self.annotate(page, &names, |_| (ItemKind::TrustEntry, true)),
            self.annotator.insights(&entries, &names),
        );

        Ok(WorkspaceLedger {
            workspace_id: request.workspace_id,
            activities,
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages: total.div_ceil(request.page_size),
            trust_scores,
            insights,
            categories: current_categories(&entries, &cutoffs),
        })
    }

    /// Project-scoped read: the project's entries, scored on the unbounded scale.
    ///
    /// `verified` reflects whether the underlying task was completed or the
    /// document approved.
    pub async fn project(
        &self,
        requester: Option<Uuid>,
        request: ProjectRequest,
    ) -> Result<ProjectLedger> {
        let requester = requester.ok_or(LedgerError::Unauthenticated)?;
        let project = self.storage.load_project(request.project_id)?;
        self.authorize(project.workspace_id, requester)?;

        let scope = Scope::project(project.workspace_id, project.id);
        let synthesis = synthesize::ensure_entries(self.storage, scope, request.force)?;

        let mut entries = self.storage.load_entries(scope)?;
        sort_newest_first(&mut entries);
        let names = self.display_names(&entries)?;
        let cutoffs = self.cutoffs()?;
        let trust_scores = score::aggregate(&entries, ScorePolicy::Unbounded, &cutoffs);

        let sources = SourceStatus::load(self.storage, scope)?;
        let (activities, insights) = futures::join!(
            self.annotate(&entries, &names, |entry| sources.classify(entry)),
            self.annotator.insights(&entries, &names),
        );

        Ok(ProjectLedger {
            project_id: project.id,
            workspace_id: project.workspace_id,
            synthesized: matches!(synthesis, Synthesis::Generated { .. }),
            activities,
            trust_scores,
            insights,
            categories: current_categories(&entries, &cutoffs),
        })
    }

    /// Record a manual trust adjustment for a workspace member.
    ///
    /// The target scope is synthesized first, so a manual entry never stands
    /// in for activity that has not been derived yet.
    pub fn add_manual_entry(
        &self,
        requester: Option<Uuid>,
        request: &ManualEntryRequest,
    ) -> Result<LedgerEntry> {
        let requester = requester.ok_or(LedgerError::Unauthenticated)?;
        self.authorize(request.workspace_id, requester)?;

        let note = request.note.trim();
        if note.is_empty() {
            return Err(LedgerError::InvalidRequest("note must not be empty".into()));
        }
        if request.points == 0 {
            return Err(LedgerError::InvalidRequest("points must be non-zero".into()));
        }
        if !(-MAX_MANUAL_POINTS..=MAX_MANUAL_POINTS).contains(&request.points) {
            return Err(LedgerError::InvalidRequest(format!(
                "points must be between -{MAX_MANUAL_POINTS} and {MAX_MANUAL_POINTS}"
            )));
        }
        if self
            .storage
            .member_status(request.workspace_id, request.user_id)?
            != Some(MemberStatus::Active)
        {
            return Err(LedgerError::InvalidRequest(format!(
                "{} is not an active member of workspace {}",
                request.user_id, request.workspace_id
            )));
        }

        let scope = match request.project_id {
            Some(project_id) => {
                let project = self.storage.load_project(project_id)?;
                if project.workspace_id != request.workspace_id {
                    return Err(LedgerError::InvalidRequest(format!(
                        "project {project_id} does not belong to workspace {}",
                        request.workspace_id
                    )));
                }
                Scope::project(request.workspace_id, project_id)
            }
            None => Scope::workspace(request.workspace_id),
        };
        synthesize::ensure_entries(self.storage, scope, false)?;

        let draft = EntryDraft {
            scope,
            user_id: request.user_id,
            action: Action::ManualAdjustment,
            description: note.to_string(),
            trust_points: request.points,
            action_date: Some(jiff::Timestamp::now()),
            metadata: EntryMetadata::Manual {
                note: note.to_string(),
                recorded_by: requester,
            },
        };
        let entry = self.storage.append_entry(&draft)?.ok_or_else(|| {
            StorageError::Corrupt("manual entry rejected as a duplicate".into())
        })?;
        info!(%scope, entry_id = %entry.id, points = entry.trust_points, "recorded manual entry");
        Ok(entry)
    }

    fn authorize(&self, workspace_id: Uuid, user_id: Uuid) -> Result<()> {
        match self.storage.member_status(workspace_id, user_id)? {
            Some(MemberStatus::Active) => Ok(()),
            _ => Err(LedgerError::AccessDenied {
                user: user_id,
                workspace: workspace_id,
            }),
        }
    }

    fn cutoffs(&self) -> Result<Cutoffs> {
        let now = Zoned::now().with_time_zone(self.time_zone.clone());
        Ok(Cutoffs::at(&now)?)
    }

    fn display_names(&self, entries: &[LedgerEntry]) -> Result<HashMap<Uuid, String>> {
        let ids: Vec<Uuid> = entries.iter().map(|e| e.user_id).collect();
        Ok(self.storage.display_names(&ids)?)
    }

    /// Narrate entries and build feed items, newest first.
    async fn annotate(
        &self,
        entries: &[LedgerEntry],
        names: &HashMap<Uuid, String>,
        classify: impl Fn(&LedgerEntry) -> (ItemKind, bool),
    ) -> Vec<ActivityItem> {
        let pairs: Vec<(&LedgerEntry, &str)> = entries
            .iter()
            .map(|e| {
                let actor = names.get(&e.user_id).map_or(UNKNOWN_ACTOR, String::as_str);
                (e, actor)
            })
            .collect();
        let narratives = self.annotator.narrate_all(&pairs).await;

        let mut items: Vec<ActivityItem> = pairs
            .into_iter()
            .zip(narratives)
            .map(|((entry, actor), Narrative { title, description })| {
                let (kind, verified) = classify(entry);
                ActivityItem {
                    id: entry.id,
                    kind,
                    actor: actor.to_string(),
                    action: title,
                    description,
                    timestamp: entry.effective_date(),
                    verified,
                    trust_points: entry.trust_points,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items
    }
}

fn sort_newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| {
        b.effective_date()
            .cmp(&a.effective_date())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Category scores over entries dated up to the end of today, matching the
/// window member scores are computed over.
fn current_categories(entries: &[LedgerEntry], cutoffs: &Cutoffs) -> Vec<CategoryScore> {
    let current: Vec<LedgerEntry> = entries
        .iter()
        .filter(|e| e.effective_date() <= cutoffs.end_of_today)
        .cloned()
        .collect();
    categories::breakdown(&current)
}

/// Current status of the tasks and documents in a project, for `verified`.
struct SourceStatus {
    tasks: HashMap<Uuid, TaskStatus>,
    documents: HashMap<Uuid, Option<DocumentStatus>>,
}

impl SourceStatus {
    fn load(storage: &Storage, scope: Scope) -> Result<Self> {
        let tasks = storage
            .load_tasks(scope)?
            .into_iter()
            .map(|t| (t.id, t.status))
            .collect();
        let documents = storage
            .load_documents(scope)?
            .into_iter()
            .map(|d| (d.id, d.status))
            .collect();
        Ok(Self { tasks, documents })
    }

    /// Item kind, and whether the source reached its terminal good state.
    ///
    /// Falls back to the status captured at synthesis if the source is gone.
    fn classify(&self, entry: &LedgerEntry) -> (ItemKind, bool) {
        match &entry.metadata {
            EntryMetadata::Task {
                task_id, status, ..
            } => {
                let status = self.tasks.get(task_id).unwrap_or(status);
                (ItemKind::Task, *status == TaskStatus::Completed)
            }
            EntryMetadata::Document {
                document_id,
                status,
                ..
            } => {
                let status = self.documents.get(document_id).unwrap_or(status);
                (
                    ItemKind::Document,
                    *status == Some(DocumentStatus::Approved),
                )
            }
            EntryMetadata::Manual { .. } => (ItemKind::TrustEntry, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use jiff::{SignedDuration, Timestamp};

    use crate::generate::mock::MockGenerator;
    use crate::model::{CategoryName, Document, Member, Profile, Project, Task};
    use crate::storage::test_support::test_storage;

    struct Fixture {
        workspace: Uuid,
        project: Uuid,
        other_project: Uuid,
        founder: Uuid,
        mentor: Uuid,
        outsider: Uuid,
    }

    fn seed(storage: &Storage) -> Fixture {
        let f = Fixture {
            workspace: Uuid::new_v4(),
            project: Uuid::new_v4(),
            other_project: Uuid::new_v4(),
            founder: Uuid::new_v4(),
            mentor: Uuid::new_v4(),
            outsider: Uuid::new_v4(),
        };
        for project in [f.project, f.other_project] {
            storage
                .upsert_project(&Project {
                    id: project,
                    workspace_id: f.workspace,
                    name: "Launch".into(),
                })
                .unwrap();
        }
        for user in [f.founder, f.mentor] {
            storage
                .upsert_member(&Member {
                    workspace_id: f.workspace,
                    user_id: user,
                    status: MemberStatus::Active,
                })
                .unwrap();
        }
        storage
            .upsert_profile(&Profile {
                user_id: f.founder,
                display_name: "Ada".into(),
            })
            .unwrap();

        let yesterday = Timestamp::now() - SignedDuration::from_hours(48);
        for (i, status) in [
            TaskStatus::Completed,
            TaskStatus::InProgress,
            TaskStatus::Cancelled,
        ]
        .into_iter()
        .enumerate()
        {
            storage
                .upsert_task(&Task {
                    id: Uuid::new_v4(),
                    title: format!("Task {i}"),
                    status,
                    priority: None,
                    workspace_id: f.workspace,
                    project_id: Some(f.project),
                    assigned_to: Some(f.founder),
                    created_by: None,
                    created_at: yesterday,
                    updated_at: None,
                })
                .unwrap();
        }
        storage
            .upsert_document(&Document {
                id: Uuid::new_v4(),
                title: "Pitch deck".into(),
                doc_type: Some("pitch deck".into()),
                status: Some(DocumentStatus::Approved),
                workspace_id: f.workspace,
                project_id: Some(f.project),
                uploaded_by: Some(f.mentor),
                created_at: yesterday,
                updated_at: None,
            })
            .unwrap();
        storage
            .upsert_task(&Task {
                id: Uuid::new_v4(),
                title: "Other project task".into(),
                status: TaskStatus::Completed,
                priority: None,
                workspace_id: f.workspace,
                project_id: Some(f.other_project),
                assigned_to: Some(f.mentor),
                created_by: None,
                created_at: yesterday,
                updated_at: None,
            })
            .unwrap();
        f
    }

    fn offline() -> Annotator {
        Annotator::new(Arc::new(MockGenerator::failing()), 4)
    }

    fn ledger<'a>(storage: &'a Storage, annotator: &'a Annotator) -> Ledger<'a> {
        Ledger::new(storage, annotator, TimeZone::UTC)
    }

    #[tokio::test]
    async fn project_read_requires_identity_and_membership() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        let request = ProjectRequest {
            project_id: f.project,
            force: false,
        };

        let err = ledger.project(None, request).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthenticated));

        let err = ledger.project(Some(f.outsider), request).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccessDenied { .. }));

        // Rejected before anything was synthesized.
        assert_eq!(
            storage
                .count_entries(Scope::project(f.workspace, f.project))
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn inactive_member_is_denied() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        storage
            .upsert_member(&Member {
                workspace_id: f.workspace,
                user_id: f.mentor,
                status: MemberStatus::Removed,
            })
            .unwrap();
        let annotator = offline();

        let err = ledger(&storage, &annotator)
            .project(
                Some(f.mentor),
                ProjectRequest {
                    project_id: f.project,
                    force: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let (_dir, storage) = test_storage();
        let annotator = offline();

        let err = ledger(&storage, &annotator)
            .project(
                Some(Uuid::new_v4()),
                ProjectRequest {
                    project_id: Uuid::new_v4(),
                    force: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn project_read_synthesizes_once() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        let request = ProjectRequest {
            project_id: f.project,
            force: false,
        };
        let scope = Scope::project(f.workspace, f.project);

        let first = ledger.project(Some(f.founder), request).await.unwrap();
        assert!(first.synthesized);
        assert_eq!(first.activities.len(), 4);
        let count = storage.count_entries(scope).unwrap();

        let second = ledger.project(Some(f.founder), request).await.unwrap();
        assert!(!second.synthesized);
        assert_eq!(storage.count_entries(scope).unwrap(), count);
    }

    #[tokio::test]
    async fn project_scores_are_unbounded_and_verified_tracks_status() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();

        let view = ledger(&storage, &annotator)
            .project(
                Some(f.founder),
                ProjectRequest {
                    project_id: f.project,
                    force: false,
                },
            )
            .await
            .unwrap();

        // Founder: completed +3, in progress +1, cancelled -1.
        assert_eq!(view.trust_scores[&f.founder].score, 3);
        assert_eq!(view.trust_scores[&f.mentor].score, 2);
        assert!(!view.trust_scores.contains_key(&f.outsider));

        let verified: Vec<(&str, bool)> = view
            .activities
            .iter()
            .map(|a| (a.description.as_str(), a.verified))
            .collect();
        assert!(verified.contains(&("Ada completed task: Task 0", true)));
        assert!(verified.contains(&("Ada started working on: Task 1", false)));
        assert!(verified.contains(&("Unknown member's pitch deck was approved: Pitch deck", true)));
        assert!(
            view.activities
                .iter()
                .all(|a| a.kind != ItemKind::TrustEntry)
        );
    }

    #[tokio::test]
    async fn forced_read_leaves_other_projects_alone() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        let other_scope = Scope::project(f.workspace, f.other_project);

        ledger
            .project(
                Some(f.founder),
                ProjectRequest {
                    project_id: f.other_project,
                    force: false,
                },
            )
            .await
            .unwrap();
        let other_before = storage.load_entries(other_scope).unwrap();

        let forced = ledger
            .project(
                Some(f.founder),
                ProjectRequest {
                    project_id: f.project,
                    force: true,
                },
            )
            .await
            .unwrap();

        assert!(forced.synthesized);
        assert_eq!(storage.load_entries(other_scope).unwrap(), other_before);
    }

    #[tokio::test]
    async fn failing_generator_still_renders_full_feed() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = Annotator::new(
            Arc::new(MockGenerator::new(|_| Ok(String::new()))),
            2,
        );

        let view = ledger(&storage, &annotator)
            .project(
                Some(f.mentor),
                ProjectRequest {
                    project_id: f.project,
                    force: false,
                },
            )
            .await
            .unwrap();

        assert!(!view.activities.is_empty());
        assert!(
            view.activities
                .iter()
                .all(|a| !a.action.is_empty() && !a.description.is_empty())
        );
        assert!(!view.insights.is_empty());
        assert_eq!(view.categories.len(), 4);
    }

    #[tokio::test]
    async fn workspace_read_is_paginated_bounded_and_verified() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        for project_id in [f.project, f.other_project] {
            ledger
                .project(
                    Some(f.founder),
                    ProjectRequest {
                        project_id,
                        force: false,
                    },
                )
                .await
                .unwrap();
        }

        let view = ledger
            .workspace(
                Some(f.mentor),
                WorkspaceRequest {
                    workspace_id: f.workspace,
                    page: 2,
                    page_size: 3,
                },
            )
            .await
            .unwrap();

        assert_eq!(view.total, 5);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.activities.len(), 2);
        assert!(view.activities.iter().all(|a| a.verified));
        assert!(
            view.activities
                .iter()
                .all(|a| a.kind == ItemKind::TrustEntry)
        );
        // Founder +3, bounded around the base of 50.
        assert_eq!(view.trust_scores[&f.founder].score, 53);
        // Mentor: approved deck +2 and other project's completed task +3.
        assert_eq!(view.trust_scores[&f.mentor].score, 55);
    }

    #[tokio::test]
    async fn workspace_read_rejects_bad_paging_and_outsiders() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);

        let err = ledger
            .workspace(
                Some(f.founder),
                WorkspaceRequest {
                    workspace_id: f.workspace,
                    page: 0,
                    page_size: 20,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));

        let err = ledger
            .workspace(
                Some(f.outsider),
                WorkspaceRequest {
                    workspace_id: f.workspace,
                    page: 1,
                    page_size: 20,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();

        let view = ledger(&storage, &annotator)
            .workspace(
                Some(f.founder),
                WorkspaceRequest {
                    workspace_id: f.workspace,
                    page: 9,
                    page_size: 20,
                },
            )
            .await
            .unwrap();

        assert!(view.activities.is_empty());
    }

    #[tokio::test]
    async fn manual_entry_is_scored_after_synthesis() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);

        let entry = ledger
            .add_manual_entry(
                Some(f.founder),
                &ManualEntryRequest {
                    workspace_id: f.workspace,
                    project_id: Some(f.project),
                    user_id: f.mentor,
                    points: 5,
                    note: "Introduced two angel investors".into(),
                },
            )
            .unwrap();
        assert_eq!(entry.action, Action::ManualAdjustment);

        let view = ledger
            .project(
                Some(f.founder),
                ProjectRequest {
                    project_id: f.project,
                    force: false,
                },
            )
            .await
            .unwrap();

        // Synthesized activity is still there alongside the manual entry.
        assert_eq!(view.activities.len(), 5);
        assert_eq!(view.trust_scores[&f.mentor].score, 7);
        let manual = view
            .activities
            .iter()
            .find(|a| a.id == entry.id)
            .unwrap();
        assert_eq!(manual.kind, ItemKind::TrustEntry);
        assert!(!manual.verified);
    }

    #[test]
    fn manual_entry_validates_target() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        let request = ManualEntryRequest {
            workspace_id: f.workspace,
            project_id: None,
            user_id: f.outsider,
            points: 1,
            note: "Helped out".into(),
        };

        let err = ledger
            .add_manual_entry(Some(f.founder), &request)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));

        let err = ledger
            .add_manual_entry(
                Some(f.founder),
                &ManualEntryRequest {
                    user_id: f.mentor,
                    points: 0,
                    ..request.clone()
                },
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));

        let err = ledger
            .add_manual_entry(
                Some(f.founder),
                &ManualEntryRequest {
                    user_id: f.mentor,
                    project_id: Some(Uuid::new_v4()),
                    ..request
                },
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::ProjectNotFound(_)));
    }

    #[test]
    fn manual_points_outside_range_are_rejected() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        let request = ManualEntryRequest {
            workspace_id: f.workspace,
            project_id: None,
            user_id: f.mentor,
            points: MAX_MANUAL_POINTS,
            note: "Closed the bridge round".into(),
        };

        for points in [MAX_MANUAL_POINTS + 1, -MAX_MANUAL_POINTS - 1, 10_000, i64::MIN, i64::MAX] {
            let err = ledger
                .add_manual_entry(
                    Some(f.founder),
                    &ManualEntryRequest {
                        points,
                        ..request.clone()
                    },
                )
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidRequest(_)), "{points}");
        }

        ledger.add_manual_entry(Some(f.founder), &request).unwrap();
        ledger
            .add_manual_entry(
                Some(f.founder),
                &ManualEntryRequest {
                    points: -MAX_MANUAL_POINTS,
                    ..request
                },
            )
            .unwrap();
    }

    #[tokio::test]
    async fn future_entries_are_left_out_of_trust_category() {
        let (_dir, storage) = test_storage();
        let f = seed(&storage);
        let annotator = offline();
        let ledger = ledger(&storage, &annotator);
        let request = ProjectRequest {
            project_id: f.project,
            force: false,
        };
        ledger.project(Some(f.founder), request).await.unwrap();

        storage
            .append_entry(&EntryDraft {
                scope: Scope::project(f.workspace, f.project),
                user_id: f.mentor,
                action: Action::ManualAdjustment,
                description: "Scheduled bonus".into(),
                trust_points: 40,
                action_date: Some(Timestamp::now() + SignedDuration::from_hours(72)),
                metadata: EntryMetadata::Manual {
                    note: "Scheduled bonus".into(),
                    recorded_by: f.founder,
                },
            })
            .unwrap();

        let view = ledger.project(Some(f.founder), request).await.unwrap();
        let trust = view
            .categories
            .iter()
            .find(|c| c.name == CategoryName::Trust)
            .unwrap();
        // Founder 3 and mentor 2; the future bonus counts nowhere yet.
        assert_eq!(trust.score, 55);
        assert_eq!(view.trust_scores[&f.mentor].score, 2);

        let view = ledger
            .workspace(
                Some(f.founder),
                WorkspaceRequest {
                    workspace_id: f.workspace,
                    page: 1,
                    page_size: 20,
                },
            )
            .await
            .unwrap();
        let trust = view
            .categories
            .iter()
            .find(|c| c.name == CategoryName::Trust)
            .unwrap();
        assert_eq!(trust.score, 55);
    }
}
