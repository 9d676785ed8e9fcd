//! Trust ledger configuration.
//!
//! Loaded from `~/.trustledger/config.toml`. Every key is optional and a
//! missing file means defaults: the default database path, the system time
//! zone, and no text generator (narratives come from templates).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};

use jiff::tz::TimeZone;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::annotate::Annotator;
use crate::generate::{OfflineGenerator, OpenAiGenerator, TextGenerator};
use crate::storage::Storage;

/// Trust ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// SQLite database file. Defaults to `~/.trustledger/ledger.sqlite`.
    pub database: Option<PathBuf>,

    /// Default requesting user, when neither `--as` nor
    /// `TRUSTLEDGER_IDENTITY` is given.
    pub identity: Option<String>,

    /// IANA time zone for the day boundaries scores are measured at.
    pub time_zone: Option<String>,

    /// OpenAI-compatible text generator. Absent means offline.
    pub generator: Option<GeneratorConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key. The key itself never goes in the file.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Cap on in-flight generator calls per request.
    pub max_concurrency: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            max_concurrency: 4,
        }
    }
}

impl Config {
    /// Load config from `~/.trustledger/config.toml`.
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        Self::parse(&contents, &path)
    }

    /// Parse config text; `path` is only used in error messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.trustledger/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".trustledger").join("config.toml"))
    }

    pub fn database_path(&self) -> Result<PathBuf, String> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Storage::default_path()
                .ok_or_else(|| "could not determine home directory".to_string()),
        }
    }

    pub fn time_zone(&self) -> Result<TimeZone, String> {
        match self.time_zone.as_deref() {
            Some(name) => {
                TimeZone::get(name).map_err(|e| format!("unknown time-zone '{name}': {e}"))
            }
            None => Ok(TimeZone::system()),
        }
    }

    /// Build the text generator.
    ///
    /// Without a `[generator]` table, or when its API key variable is unset,
    /// the offline generator is used and every narrative is a template.
    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>, String> {
        self.generator_with(|name| env::var(name).ok())
    }

    fn generator_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn TextGenerator>, String> {
        let Some(generator) = &self.generator else {
            debug!("no generator configured, narratives will use templates");
            return Ok(Arc::new(OfflineGenerator));
        };

        let Some(api_key) = lookup(&generator.api_key_env).filter(|k| !k.is_empty()) else {
            warn!(
                variable = %generator.api_key_env,
                "generator API key not set, narratives will use templates"
            );
            return Ok(Arc::new(OfflineGenerator));
        };

        let backend = OpenAiGenerator::new(
            generator.base_url.clone(),
            generator.model.clone(),
            Some(api_key),
            Duration::from_secs(generator.timeout_secs),
        )
        .map_err(|e| format!("failed to set up generator: {e}"))?;
        Ok(Arc::new(backend))
    }

    pub fn annotator(&self) -> Result<Annotator, String> {
        let concurrency = self
            .generator
            .as_ref()
            .map_or_else(|| GeneratorConfig::default().max_concurrency, |g| g.max_concurrency);
        Ok(Annotator::new(self.generator()?, concurrency))
    }
}
