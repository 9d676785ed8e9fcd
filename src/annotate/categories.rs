//! Category breakdown: four fixed scores computed straight from entries.

use std::collections::HashSet;

use crate::model::{Action, CategoryName, CategoryScore, LedgerEntry, Trend};
use crate::score;

/// A category trends up once its score passes this midpoint.
const UP_THRESHOLD: u32 = 50;

/// Execution, Collaboration, Transparency and Trust scores for a set of entries.
pub fn breakdown(entries: &[LedgerEntry]) -> Vec<CategoryScore> {
    let tasks = entries.iter().filter(|e| e.action.is_task()).count();
    let completed = entries
        .iter()
        .filter(|e| e.action == Action::CompletedTask)
        .count();
    let documents = entries.iter().filter(|e| e.action.is_document()).count();
    let users = entries
        .iter()
        .map(|e| e.user_id)
        .collect::<HashSet<_>>()
        .len();
    let points: i64 = entries
        .iter()
        .fold(0_i64, |sum, e| sum.saturating_add(e.trust_points));

    // Completion percentage, rounded.
    let execution = if tasks == 0 {
        0
    } else {
        (completed * 100 + tasks / 2) / tasks
    };
    // Ten points per average activity per member, rounded.
    let collaboration = if users == 0 {
        0
    } else {
        ((entries.len() * 10 + users / 2) / users).min(100)
    };
    let transparency = (documents * 20).min(100);
    let trust = score::bounded(points);

    vec![
        category(CategoryName::Execution, to_score(execution), tasks),
        category(
            CategoryName::Collaboration,
            to_score(collaboration),
            entries.len(),
        ),
        category(CategoryName::Transparency, to_score(transparency), documents),
        category(
            CategoryName::Trust,
            u32::try_from(trust).unwrap_or(0),
            entries.len(),
        ),
    ]
}

fn category(name: CategoryName, score: u32, activities: usize) -> CategoryScore {
    CategoryScore {
        name,
        score,
        activities,
        trend: if score > UP_THRESHOLD {
            Trend::Up
        } else {
            Trend::Stable
        },
    }
}

fn to_score(value: usize) -> u32 {
    u32::try_from(value.min(100)).unwrap_or(100)
}
