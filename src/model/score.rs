//! Trust scores: derived on every read, never stored.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A user's score now and as of the end of yesterday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustScore {
    pub score: i64,
    pub previous_score: i64,
    pub trend: Trend,
}

impl TrustScore {
    pub fn new(score: i64, previous_score: i64) -> Self {
        Self {
            score,
            previous_score,
            trend: Trend::between(score, previous_score),
        }
    }
}

/// Direction of change between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn between(current: i64, previous: i64) -> Self {
        match current.cmp(&previous) {
            Ordering::Greater => Self::Up,
            Ordering::Less => Self::Down,
            Ordering::Equal => Self::Stable,
        }
    }
}
