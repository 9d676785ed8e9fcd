//! Fixture import: load the records the ledger is derived from.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::model::{Document, Member, Profile, Project, Task, Workspace};
use crate::storage::{self, Storage};

/// The JSON document `trustledger import` reads. Every list is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct Fixture {
    workspaces: Vec<Workspace>,
    members: Vec<Member>,
    profiles: Vec<Profile>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    documents: Vec<Document>,
}

pub(super) fn cmd_import(storage: &Storage, path: &Path) -> Result<(), String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let fixture: Fixture = serde_json::from_str(&contents)
        .map_err(|e| format!("invalid fixture {}: {e}", path.display()))?;

    import(storage, &fixture).map_err(|e| format!("failed to import fixture: {e}"))?;

    eprintln!(
        "Imported {} workspace(s), {} member(s), {} profile(s), {} project(s), \
         {} task(s), {} document(s)",
        fixture.workspaces.len(),
        fixture.members.len(),
        fixture.profiles.len(),
        fixture.projects.len(),
        fixture.tasks.len(),
        fixture.documents.len(),
    );
    Ok(())
}

/// Upsert every record. Parents go first so ids resolve in order.
fn import(storage: &Storage, fixture: &Fixture) -> storage::Result<()> {
    for workspace in &fixture.workspaces {
        storage.upsert_workspace(workspace)?;
    }
    for project in &fixture.projects {
        storage.upsert_project(project)?;
    }
    for member in &fixture.members {
        storage.upsert_member(member)?;
    }
    for profile in &fixture.profiles {
        storage.upsert_profile(profile)?;
    }
    for task in &fixture.tasks {
        storage.upsert_task(task)?;
    }
    for document in &fixture.documents {
        storage.upsert_document(document)?;
    }
    info!(
        tasks = fixture.tasks.len(),
        documents = fixture.documents.len(),
        "imported fixture"
    );
    Ok(())
}
