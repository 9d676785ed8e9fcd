//! Deterministic narratives and insights, used whenever generation fails.
//!
//! Everything here is built purely from entry data, so the feed always
//! has something to say.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::model::{
    Action, EntryMetadata, Insight, InsightCategory, InsightType, LedgerEntry, Priority,
};

use super::{INSIGHT_COUNT, Narrative, UNKNOWN_ACTOR};

/// Template narrative from the action, metadata and actor name.
pub fn narrative(entry: &LedgerEntry, actor: &str) -> Narrative {
    let actor = non_blank(actor, UNKNOWN_ACTOR);
    let description = match &entry.metadata {
        EntryMetadata::Task { title, .. } => {
            let title = non_blank(title, "untitled task");
            match entry.action {
                Action::CompletedTask => format!("{actor} completed task: {title}"),
                Action::SubmittedTaskForReview => {
                    format!("{actor} submitted task for review: {title}")
                }
                Action::StartedTask => format!("{actor} started working on: {title}"),
                Action::CancelledTask => format!("{actor} cancelled task: {title}"),
                _ => format!("{actor} updated task: {title}"),
            }
        }
        EntryMetadata::Document {
            title, doc_type, ..
        } => {
            let title = non_blank(title, "untitled document");
            let doc_type = doc_type
                .as_deref()
                .map_or("document", |t| non_blank(t, "document"));
            match entry.action {
                Action::DocumentApproved => format!("{actor}'s {doc_type} was approved: {title}"),
                Action::DocumentRejected => format!("{actor}'s {doc_type} was rejected: {title}"),
                _ => format!("{actor} uploaded {doc_type}: {title}"),
            }
        }
        EntryMetadata::Manual { note, .. } => {
            let note = non_blank(note, "no note given");
            format!(
                "{actor} received a trust adjustment of {:+}: {note}",
                entry.trust_points
            )
        }
    };
    Narrative {
        title: entry.action.label().to_string(),
        description,
    }
}

fn non_blank<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Rule-based insights. Each rule adds at most one insight, and only when it applies.
///
/// The activity-count rule always applies, so the result is never empty.
pub fn insights(entries: &[LedgerEntry], names: &HashMap<Uuid, String>) -> Vec<Insight> {
    let mut insights = Vec::new();
    insights.push(activity_count(entries));
    insights.extend(balance(entries));
    insights.extend(completion(entries));
    insights.extend(negative_activity(entries));
    insights.extend(top_contributor(entries, names));
    insights.truncate(INSIGHT_COUNT);
    insights
}

fn activity_count(entries: &[LedgerEntry]) -> Insight {
    if entries.is_empty() {
        return Insight {
            kind: InsightType::Suggestion,
            category: InsightCategory::Growth,
            priority: Priority::High,
            title: "No activity recorded yet".into(),
            description: "Create tasks or upload documents to start building a track record."
                .into(),
        };
    }
    let members = entries
        .iter()
        .map(|e| e.user_id)
        .collect::<std::collections::HashSet<_>>()
        .len();
    Insight {
        kind: InsightType::Positive,
        category: InsightCategory::Growth,
        priority: Priority::Low,
        title: format!("{} activities recorded", entries.len()),
        description: format!(
            "{members} member(s) have contributed {} ledger activities so far.",
            entries.len()
        ),
    }
}

fn balance(entries: &[LedgerEntry]) -> Option<Insight> {
    if entries.is_empty() {
        return None;
    }
    let tasks = entries.iter().filter(|e| e.action.is_task()).count();
    let documents = entries.iter().filter(|e| e.action.is_document()).count();

    let insight = if documents == 0 {
        Insight {
            kind: InsightType::Suggestion,
            category: InsightCategory::Transparency,
            priority: Priority::Medium,
            title: "Add supporting documents".into(),
            description: "No documents have been shared yet. Uploading plans, decks or \
                          agreements makes progress visible to partners."
                .into(),
        }
    } else if tasks == 0 {
        Insight {
            kind: InsightType::Suggestion,
            category: InsightCategory::Execution,
            priority: Priority::Medium,
            title: "Track work as tasks".into(),
            description: "Documents are flowing but no tasks are tracked. Break the work \
                          into tasks so execution shows up in the ledger."
                .into(),
        }
    } else if tasks > documents * 3 {
        Insight {
            kind: InsightType::Suggestion,
            category: InsightCategory::Transparency,
            priority: Priority::Medium,
            title: "Documentation is lagging".into(),
            description: format!(
                "{tasks} task activities against {documents} document activities. \
                 Document outcomes to keep stakeholders informed."
            ),
        }
    } else if documents > tasks * 3 {
        Insight {
            kind: InsightType::Suggestion,
            category: InsightCategory::Execution,
            priority: Priority::Low,
            title: "Execution trails paperwork".into(),
            description: format!(
                "{documents} document activities against {tasks} task activities. \
                 Turn plans into tracked tasks."
            ),
        }
    } else {
        Insight {
            kind: InsightType::Positive,
            category: InsightCategory::Transparency,
            priority: Priority::Low,
            title: "Balanced execution and documentation".into(),
            description: format!(
                "{tasks} task activities and {documents} document activities keep work \
                 both moving and visible."
            ),
        }
    };
    Some(insight)
}

fn completion(entries: &[LedgerEntry]) -> Option<Insight> {
    let tasks = entries.iter().filter(|e| e.action.is_task()).count();
    if tasks == 0 {
        return None;
    }
    let completed = entries
        .iter()
        .filter(|e| e.action == Action::CompletedTask)
        .count();

    Some(if completed * 2 >= tasks {
        Insight {
            kind: InsightType::Positive,
            category: InsightCategory::Execution,
            priority: Priority::Low,
            title: "Strong follow-through".into(),
            description: format!("{completed} of {tasks} tracked tasks are completed."),
        }
    } else {
        Insight {
            kind: InsightType::Suggestion,
            category: InsightCategory::Execution,
            priority: Priority::Medium,
            title: "Close out open tasks".into(),
            description: format!(
                "Only {completed} of {tasks} tracked tasks are completed. \
                 Finishing in-flight work raises execution scores."
            ),
        }
    })
}

fn negative_activity(entries: &[LedgerEntry]) -> Option<Insight> {
    let negative: Vec<&LedgerEntry> = entries.iter().filter(|e| e.trust_points < 0).collect();
    if negative.is_empty() {
        return None;
    }
    let lost = negative
        .iter()
        .fold(0_i64, |sum, e| sum.saturating_add(e.trust_points));
    let cancelled = negative
        .iter()
        .filter(|e| e.action == Action::CancelledTask)
        .count();
    let rejected = negative
        .iter()
        .filter(|e| e.action == Action::DocumentRejected)
        .count();
    Some(Insight {
        kind: InsightType::Warning,
        category: InsightCategory::Trust,
        priority: Priority::High,
        title: format!("{} activities cost trust points", negative.len()),
        description: format!(
            "{cancelled} cancelled task(s) and {rejected} rejected document(s) \
             account for {lost} points. Review what went wrong before it becomes a pattern."
        ),
    })
}

fn top_contributor(entries: &[LedgerEntry], names: &HashMap<Uuid, String>) -> Option<Insight> {
    let mut totals: BTreeMap<Uuid, i64> = BTreeMap::new();
    for entry in entries {
        let total = totals.entry(entry.user_id).or_default();
        *total = total.saturating_add(entry.trust_points);
    }
    // Ties resolve to the lowest user id, so the pick is stable across reads.
    let (user, points) = totals
        .into_iter()
        .fold(None, |best: Option<(Uuid, i64)>, (user, points)| match best {
            Some((_, top)) if top >= points => best,
            _ => Some((user, points)),
        })?;
    if points <= 0 {
        return None;
    }
    let name = names.get(&user).map_or(UNKNOWN_ACTOR, String::as_str);
    Some(Insight {
        kind: InsightType::Positive,
        category: InsightCategory::Collaboration,
        priority: Priority::Medium,
        title: format!("{name} leads the ledger"),
        description: format!("{name} has earned {points} trust points, the most in this scope."),
    })
}
