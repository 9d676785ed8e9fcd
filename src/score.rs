//! Score aggregation: folding ledger entries into per-user trust scores.
//!
//! Scores are recomputed from the full entry history on every read.
//! Nothing here touches storage.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use jiff::{SignedDuration, Timestamp, Zoned};
use uuid::Uuid;

use crate::model::{LedgerEntry, TrustScore};

/// Reputation every member starts from in the bounded variant.
pub const BASE_REPUTATION: i64 = 50;

/// Bounded scores never leave this range.
pub const SCORE_RANGE: RangeInclusive<i64> = 0..=100;

/// How raw point totals become displayed scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorePolicy {
    /// The raw total. Used for project views.
    Unbounded,

    /// `BASE_REPUTATION + total`, clamped to `SCORE_RANGE`. Used for workspace views.
    Bounded,
}

impl ScorePolicy {
    pub fn apply(self, total: i64) -> i64 {
        match self {
            Self::Unbounded => total,
            Self::Bounded => bounded(total),
        }
    }
}

/// `BASE_REPUTATION + total`, clamped to `SCORE_RANGE`.
pub fn bounded(total: i64) -> i64 {
    BASE_REPUTATION
        .saturating_add(total)
        .clamp(*SCORE_RANGE.start(), *SCORE_RANGE.end())
}

/// The two instants a score is measured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoffs {
    /// 23:59:59.999 today, local time.
    pub end_of_today: Timestamp,
    /// 23:59:59.999 yesterday, local time.
    pub end_of_yesterday: Timestamp,
}

impl Cutoffs {
    /// Cutoffs for the local day containing `now`.
    pub fn at(now: &Zoned) -> Result<Self, jiff::Error> {
        let tz = now.time_zone().clone();
        let today = now.date();
        let start_of_today = today.to_zoned(tz.clone())?.timestamp();
        let start_of_tomorrow = today.tomorrow()?.to_zoned(tz)?.timestamp();
        let one_ms = SignedDuration::from_millis(1);
        Ok(Self {
            end_of_today: start_of_tomorrow.checked_sub(one_ms)?,
            end_of_yesterday: start_of_today.checked_sub(one_ms)?,
        })
    }
}

/// Compute a score for every user with at least one entry.
///
/// Users without entries are absent from the map. Entries dated after the
/// end of today count toward neither total.
pub fn aggregate(
    entries: &[LedgerEntry],
    policy: ScorePolicy,
    cutoffs: &Cutoffs,
) -> BTreeMap<Uuid, TrustScore> {
    let mut totals: BTreeMap<Uuid, (i64, i64)> = BTreeMap::new();
    for entry in entries {
        let (current, previous) = totals.entry(entry.user_id).or_default();
        let at = entry.effective_date();
        if at <= cutoffs.end_of_today {
            *current = current.saturating_add(entry.trust_points);
        }
        if at <= cutoffs.end_of_yesterday {
            *previous = previous.saturating_add(entry.trust_points);
        }
    }

    totals
        .into_iter()
        .map(|(user, (current, previous))| {
            (
                user,
                TrustScore::new(policy.apply(current), policy.apply(previous)),
            )
        })
        .collect()
}
