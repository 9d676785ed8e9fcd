//! Output formatting for CLI display.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::model::{LedgerEntry, TrustScore, Trend};

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Up => "↑",
        Trend::Down => "↓",
        Trend::Stable => "→",
    }
}

/// One line per scored user, highest score first.
pub(super) fn format_scores(scores: &BTreeMap<Uuid, TrustScore>) -> String {
    if scores.is_empty() {
        return "No scores yet\n".to_string();
    }

    let mut rows: Vec<(&Uuid, &TrustScore)> = scores.iter().collect();
    rows.sort_by(|a, b| b.1.score.cmp(&a.1.score).then_with(|| a.0.cmp(b.0)));

    rows.into_iter()
        .map(|(user, score)| {
            let short_id = &user.to_string()[..8];
            format!(
                "  {short_id}  {:>4} {} (yesterday {})\n",
                score.score,
                trend_arrow(score.trend),
                score.previous_score
            )
        })
        .collect()
}

pub(super) fn format_entry(entry: &LedgerEntry) -> String {
    format!(
        "{:+} for {} in {}: {}",
        entry.trust_points,
        &entry.user_id.to_string()[..8],
        entry.scope,
        entry.description
    )
}
