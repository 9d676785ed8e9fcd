//! Identity resolution for ledger commands.
//!
//! Ledger reads and writes act on behalf of a requesting user. Rather than
//! requiring `--as` on every invocation, the user is resolved through a chain:
//!
//! 1. `--as <user>`: explicit per-command override
//! 2. `TRUSTLEDGER_IDENTITY` env var: process/session level
//! 3. `identity` in `~/.trustledger/config.toml`: global default
//!
//! An unresolved identity is not an error here. The ledger itself rejects
//! anonymous requests as unauthenticated.

use std::env;

use uuid::Uuid;

use crate::config::Config;

/// Environment variable checked after `--as`.
pub const IDENTITY_ENV: &str = "TRUSTLEDGER_IDENTITY";

/// Resolve the requesting user from the tiered resolution chain.
///
/// Returns `Ok(None)` when no source yields a value, and an error when the
/// first source that does is not a UUID.
pub fn resolve_identity(explicit: Option<&str>, config: &Config) -> Result<Option<Uuid>, String> {
    let from_env = env::var(IDENTITY_ENV).ok();
    resolve_from(explicit, from_env.as_deref(), config.identity.as_deref())
}

fn resolve_from(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_config: Option<&str>,
) -> Result<Option<Uuid>, String> {
    let sources = [
        ("--as", explicit),
        (IDENTITY_ENV, from_env),
        ("config identity", from_config),
    ];
    let Some((source, value)) = sources
        .into_iter()
        .find_map(|(source, value)| Some((source, value?.trim())).filter(|(_, v)| !v.is_empty()))
    else {
        return Ok(None);
    };

    value
        .parse::<Uuid>()
        .map(Some)
        .map_err(|e| format!("{source} is not a valid user id '{value}': {e}"))
}
