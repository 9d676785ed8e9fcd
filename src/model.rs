//! Core data model for the trust ledger.
//!
//! Raw activity (tasks, documents) is synthesized into ledger entries,
//! which aggregate into trust scores and an annotated activity feed.

mod activity;
mod entry;
mod feed;
mod score;
mod workspace;

pub use activity::{Document, DocumentStatus, Task, TaskStatus};
pub use entry::{Action, EntryDraft, EntryMetadata, LedgerEntry, Scope};
pub use feed::{
    ActivityItem, CategoryName, CategoryScore, Insight, InsightCategory, InsightType, ItemKind,
    Priority,
};
pub use score::{TrustScore, Trend};
pub use workspace::{Member, MemberStatus, Profile, Project, Workspace};
