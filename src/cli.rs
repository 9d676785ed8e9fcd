//! CLI interface for the trust ledger.
//!
//! Each subcommand is non-interactive: arguments in, structured output out.
//! Ledger views go to stdout as JSON; human-readable summaries go to stderr.
//!
//! Commands that read or write the ledger act as the requesting user
//! resolved from `--as`, `TRUSTLEDGER_IDENTITY` or the config file.

mod format;
mod import;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::annotate::Annotator;
use crate::config::Config;
use crate::identity::resolve_identity;
use crate::ledger::{Ledger, ManualEntryRequest, ProjectRequest, WorkspaceRequest};
use crate::storage::Storage;

use format::{format_entry, format_scores};

/// Trust ledger: reputation scores and activity feeds for startup workspaces.
#[derive(Debug, Parser)]
#[command(name = "trustledger", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Requesting user id. Falls back to `TRUSTLEDGER_IDENTITY`, then the config file.
    #[arg(long = "as", global = true)]
    identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow:
  1. trustledger import fixture.json
  2. trustledger --as <user> project <project-id>
     → synthesizes the project's entries on first read, prints the feed as JSON
  3. trustledger --as <user> entry add --workspace <id> --user <id> --points 2 \
       'Closed the seed round paperwork'
  4. trustledger --as <user> workspace <workspace-id> --page 1

Regenerate a project's entries after its tasks changed:
  trustledger --as <user> project <project-id> --force";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load workspaces, members, profiles, projects, tasks and documents from JSON.
    ///
    /// Records are upserted by id. Existing ledger entries are not touched:
    /// re-read a project with `--force` to pick up changed activity.
    Import {
        /// Fixture file.
        path: PathBuf,
    },

    /// Workspace-wide ledger: bounded scores and a paginated, annotated feed.
    Workspace {
        /// Workspace id.
        id: Uuid,

        /// Page number, starting at 1.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Items per page.
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },

    /// Project ledger: unbounded scores and the full annotated feed.
    Project {
        /// Project id.
        id: Uuid,

        /// Delete and resynthesize this project's entries first.
        #[arg(long)]
        force: bool,
    },

    /// Manual ledger entries.
    Entry {
        #[command(subcommand)]
        command: EntryCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum EntryCommand {
    /// Record a manual trust adjustment for a member. Prints the entry as JSON.
    Add {
        /// Workspace id.
        #[arg(long)]
        workspace: Uuid,

        /// Project id, for an adjustment scoped to one project.
        #[arg(long)]
        project: Option<Uuid>,

        /// The member whose score is adjusted.
        #[arg(long)]
        user: Uuid,

        /// Points to add; negative to subtract.
        #[arg(long, allow_negative_numbers = true)]
        points: i64,

        /// Why the adjustment was made.
        note: String,
    },
}

/// Run the CLI, returning an error message on failure.
pub async fn run(
    cli: Cli,
    config: &Config,
    storage: &Storage,
    annotator: &Annotator,
) -> Result<(), String> {
    let open_session = || session(cli.identity.as_deref(), config, storage, annotator);

    match cli.command {
        Command::Import { path } => import::cmd_import(storage, &path),
        Command::Workspace {
            id,
            page,
            page_size,
        } => {
            let (requester, ledger) = open_session()?;
            let request = WorkspaceRequest {
                workspace_id: id,
                page,
                page_size,
            };
            cmd_workspace(&ledger, requester, request).await
        }
        Command::Project { id, force } => {
            let (requester, ledger) = open_session()?;
            let request = ProjectRequest {
                project_id: id,
                force,
            };
            cmd_project(&ledger, requester, request).await
        }
        Command::Entry {
            command:
                EntryCommand::Add {
                    workspace,
                    project,
                    user,
                    points,
                    note,
                },
        } => {
            let (requester, ledger) = open_session()?;
            let request = ManualEntryRequest {
                workspace_id: workspace,
                project_id: project,
                user_id: user,
                points,
                note,
            };
            cmd_entry_add(&ledger, requester, &request)
        }
    }
}

/// The requesting user and a ledger bound to the configured time zone.
fn session<'a>(
    identity: Option<&str>,
    config: &Config,
    storage: &'a Storage,
    annotator: &'a Annotator,
) -> Result<(Option<Uuid>, Ledger<'a>), String> {
    let requester = resolve_identity(identity, config)?;
    Ok((requester, Ledger::new(storage, annotator, config.time_zone()?)))
}

async fn cmd_workspace(
    ledger: &Ledger<'_>,
    requester: Option<Uuid>,
    request: WorkspaceRequest,
) -> Result<(), String> {
    let view = ledger
        .workspace(requester, request)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&view)?;

    eprintln!(
        "Workspace {}: page {} of {}, {} activities",
        short_id(view.workspace_id),
        view.page,
        view.total_pages.max(1),
        view.total
    );
    eprint!("{}", format_scores(&view.trust_scores));
    Ok(())
}

async fn cmd_project(
    ledger: &Ledger<'_>,
    requester: Option<Uuid>,
    request: ProjectRequest,
) -> Result<(), String> {
    let view = ledger
        .project(requester, request)
        .await
        .map_err(|e| e.to_string())?;
    print_json(&view)?;

    let origin = if view.synthesized {
        "synthesized"
    } else {
        "cached"
    };
    eprintln!(
        "Project {}: {} activities ({origin})",
        short_id(view.project_id),
        view.activities.len()
    );
    eprint!("{}", format_scores(&view.trust_scores));
    Ok(())
}

fn cmd_entry_add(
    ledger: &Ledger<'_>,
    requester: Option<Uuid>,
    request: &ManualEntryRequest,
) -> Result<(), String> {
    let entry = ledger
        .add_manual_entry(requester, request)
        .map_err(|e| e.to_string())?;
    print_json(&entry)?;
    eprintln!("Recorded {}", format_entry(&entry));
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize output: {e}"))?;
    println!("{json}");
    Ok(())
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
