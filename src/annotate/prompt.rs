//! Prompts for the text generator, and parsing of what comes back.
//!
//! Generators are asked for JSON. Replies are accepted with or without
//! markdown code fences; anything else is treated as unusable.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use uuid::Uuid;

use crate::model::{EntryMetadata, Insight, InsightCategory, InsightType, LedgerEntry, Priority};

use super::{INSIGHT_COUNT, MIN_INSIGHTS, Narrative, UNKNOWN_ACTOR};

/// Entries beyond this many are summarized only by the aggregate counts.
const MAX_LISTED_ENTRIES: usize = 40;

pub(super) fn narrative(entry: &LedgerEntry, actor: &str) -> String {
    let mut prompt = String::from(
        "You write the activity feed for a startup workspace's trust ledger.\n\
         Write a short title (at most six words) and a one-sentence description \
         of this activity. Be factual and specific; do not invent details.\n\n",
    );
    prompt.push_str(&format!(
        "Actor: {actor}\nAction: {}\nTrust points: {:+}\n{}\n",
        entry.action.code(),
        entry.trust_points,
        describe_metadata(&entry.metadata)
    ));
    prompt.push_str(
        "\nRespond with only a JSON object of the form \
         {\"title\": \"...\", \"description\": \"...\"}.",
    );
    prompt
}

pub(super) fn insights(entries: &[LedgerEntry], names: &HashMap<Uuid, String>) -> String {
    let tasks = entries.iter().filter(|e| e.action.is_task()).count();
    let documents = entries.iter().filter(|e| e.action.is_document()).count();
    let negative = entries.iter().filter(|e| e.trust_points < 0).count();

    let mut per_user: BTreeMap<&str, i64> = BTreeMap::new();
    for entry in entries {
        let name = names
            .get(&entry.user_id)
            .map_or(UNKNOWN_ACTOR, String::as_str);
        let total = per_user.entry(name).or_default();
        *total = total.saturating_add(entry.trust_points);
    }

    let mut prompt = format!(
        "You analyze the trust ledger of a startup workspace.\n\
         Generate exactly {INSIGHT_COUNT} insights about the activity below: \
         task/document balance, standout contributors, activities that lost \
         trust points, and concrete next steps.\n\n\
         Total activities: {}\nTask activities: {tasks}\nDocument activities: {documents}\n\
         Activities with negative points: {negative}\n\nPoints by member:\n",
        entries.len()
    );
    for (name, points) in &per_user {
        prompt.push_str(&format!("- {name}: {points:+}\n"));
    }

    prompt.push_str("\nRecent activities:\n");
    let mut recent: Vec<&LedgerEntry> = entries.iter().collect();
    recent.sort_by_key(|e| std::cmp::Reverse(e.effective_date()));
    for entry in recent.into_iter().take(MAX_LISTED_ENTRIES) {
        let name = names
            .get(&entry.user_id)
            .map_or(UNKNOWN_ACTOR, String::as_str);
        prompt.push_str(&format!(
            "- {name}: {} ({:+}) {}\n",
            entry.action.code(),
            entry.trust_points,
            describe_metadata(&entry.metadata)
        ));
    }

    prompt.push_str(
        "\nRespond with only a JSON array. Each item must be an object with:\n\
         \"type\": \"positive\" | \"warning\" | \"suggestion\",\n\
         \"category\": \"execution\" | \"collaboration\" | \"transparency\" | \"trust\" | \"growth\",\n\
         \"priority\": \"low\" | \"medium\" | \"high\",\n\
         \"title\": short string, \"description\": one or two sentences.",
    );
    prompt
}

fn describe_metadata(metadata: &EntryMetadata) -> String {
    match metadata {
        EntryMetadata::Task {
            title,
            status,
            priority,
            ..
        } => match priority {
            Some(p) => format!("Task \"{title}\" (status: {}, priority: {p})", status.as_str()),
            None => format!("Task \"{title}\" (status: {})", status.as_str()),
        },
        EntryMetadata::Document {
            title,
            doc_type,
            status,
            ..
        } => format!(
            "Document \"{title}\" (type: {}, status: {})",
            doc_type.as_deref().unwrap_or("document"),
            status.as_ref().map_or("pending", |s| s.as_str())
        ),
        EntryMetadata::Manual { note, .. } => format!("Manual note: \"{note}\""),
    }
}

#[derive(Deserialize)]
struct RawNarrative {
    title: String,
    description: String,
}

/// Parse a `{"title", "description"}` reply. Blank fields make it unusable.
pub(super) fn parse_narrative(text: &str) -> Option<Narrative> {
    let json = slice_between(strip_fences(text), '{', '}')?;
    let raw: RawNarrative = serde_json::from_str(json).ok()?;
    let title = raw.title.trim();
    let description = raw.description.trim();
    if title.is_empty() || description.is_empty() {
        return None;
    }
    Some(Narrative {
        title: title.to_string(),
        description: description.to_string(),
    })
}

#[derive(Deserialize)]
struct RawInsight {
    #[serde(rename = "type")]
    kind: InsightType,
    category: InsightCategory,
    priority: Priority,
    title: String,
    description: String,
}

/// Parse an insight array, keeping only well-formed items.
///
/// Returns `None` unless at least [`MIN_INSIGHTS`] items are well-formed;
/// at most [`INSIGHT_COUNT`] are kept.
pub(super) fn parse_insights(text: &str) -> Option<Vec<Insight>> {
    let json = slice_between(strip_fences(text), '[', ']')?;
    let items: Vec<serde_json::Value> = serde_json::from_str(json).ok()?;
    let insights: Vec<Insight> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawInsight>(item).ok())
        .filter(|raw| !raw.title.trim().is_empty() && !raw.description.trim().is_empty())
        .map(|raw| Insight {
            kind: raw.kind,
            category: raw.category,
            priority: raw.priority,
            title: raw.title.trim().to_string(),
            description: raw.description.trim().to_string(),
        })
        .take(INSIGHT_COUNT)
        .collect();
    (insights.len() >= MIN_INSIGHTS).then_some(insights)
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn slice_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
