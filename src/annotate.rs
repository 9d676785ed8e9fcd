//! Narrative annotation: readable titles, descriptions and insights for the feed.
//!
//! Text comes from a [`TextGenerator`] when it cooperates and from
//! [`fallback`] when it doesn't. Generation failures are logged and
//! absorbed here; callers always get usable text back.

pub mod categories;
pub mod fallback;
mod prompt;

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::generate::{GenerateError, GenerationRequest, TextGenerator};
use crate::model::{Insight, LedgerEntry};

/// Number of insights requested from the generator.
pub const INSIGHT_COUNT: usize = 5;

/// Fewest well-formed generated insights accepted before falling back.
pub const MIN_INSIGHTS: usize = 3;

/// Display name for users without a profile.
pub const UNKNOWN_ACTOR: &str = "Unknown member";

/// A readable title and description for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub title: String,
    pub description: String,
}

/// Annotates entries through a text generator, with bounded fan-out.
pub struct Annotator {
    generator: Arc<dyn TextGenerator>,
    concurrency: usize,
}

impl Annotator {
    /// `concurrency` caps in-flight generator calls; zero is treated as one.
    pub fn new(generator: Arc<dyn TextGenerator>, concurrency: usize) -> Self {
        Self {
            generator,
            concurrency: concurrency.max(1),
        }
    }

    /// Narrate a single entry. Never fails: falls back to the template.
    pub async fn narrate(&self, entry: &LedgerEntry, actor: &str) -> Narrative {
        let request = GenerationRequest::new(prompt::narrative(entry, actor))
            .with_max_tokens(150)
            .with_temperature(0.7);

        match self.generator.generate(request).await {
            Ok(text) => prompt::parse_narrative(&text).unwrap_or_else(|| {
                warn!(
                    entry_id = %entry.id,
                    generator = self.generator.id(),
                    "unusable narrative from generator, using fallback"
                );
                fallback::narrative(entry, actor)
            }),
            Err(e) => {
                log_generation_failure(self.generator.id(), &e, "narrative");
                fallback::narrative(entry, actor)
            }
        }
    }

    /// Narrate many entries concurrently.
    ///
    /// Results line up with the input by index, whatever order the calls finish in.
    pub async fn narrate_all(&self, entries: &[(&LedgerEntry, &str)]) -> Vec<Narrative> {
        let mut indexed: Vec<(usize, Narrative)> = stream::iter(entries.iter().enumerate())
            .map(|(i, (entry, actor))| async move { (i, self.narrate(entry, actor).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        indexed.sort_unstable_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, n)| n).collect()
    }

    /// Portfolio-level insights for a set of entries.
    ///
    /// Uses the generator's answer only when at least [`MIN_INSIGHTS`] of its
    /// items are well-formed; otherwise the rule-based insights.
    pub async fn insights(
        &self,
        entries: &[LedgerEntry],
        names: &HashMap<Uuid, String>,
    ) -> Vec<Insight> {
        let request = GenerationRequest::new(prompt::insights(entries, names))
            .with_max_tokens(800)
            .with_temperature(0.7);

        match self.generator.generate(request).await {
            Ok(text) => prompt::parse_insights(&text).unwrap_or_else(|| {
                warn!(
                    generator = self.generator.id(),
                    "too few well-formed insights from generator, using rules"
                );
                fallback::insights(entries, names)
            }),
            Err(e) => {
                log_generation_failure(self.generator.id(), &e, "insights");
                fallback::insights(entries, names)
            }
        }
    }
}

fn log_generation_failure(generator: &str, error: &GenerateError, what: &str) {
    // An unconfigured generator fails every call; that is expected, not news.
    if matches!(error, GenerateError::Unavailable(_)) {
        debug!(generator, error = %error, "{what} generation unavailable, using fallback");
    } else {
        warn!(generator, error = %error, "{what} generation failed, using fallback");
    }
}
