//! All-or-nothing commits
//!
//! A mutation runs against a working copy of the state. The copy replaces
//! the live state only when the mutation returns `Ok`; on `Err` it is
//! dropped and the live state is exactly as it was before the call.
//!
//! The resolution log is append-only and lives outside the copied state.
//! Records produced during a mutation are staged and appended on commit.

use crate::core::error::{EngineError, Result};
use crate::effect::{ResolutionLog, ResolutionRecord};

fn report(e: &EngineError) {
    if e.is_fatal() {
        tracing::error!("Aborted: {}; no changes applied", e);
    } else {
        tracing::warn!("Rolled back: {}", e);
    }
}

pub fn atomically<S: Clone, T>(state: &mut S, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
    let mut working = state.clone();
    match f(&mut working) {
        Ok(value) => {
            *state = working;
            Ok(value)
        }
        Err(e) => {
            report(&e);
            Err(e)
        }
    }
}

/// Like `atomically`, appending the staged records to `log` on commit
pub fn atomically_logged<S: Clone, T>(
    state: &mut S,
    log: &mut ResolutionLog,
    f: impl FnOnce(&mut S, &mut Vec<ResolutionRecord>) -> Result<T>,
) -> Result<T> {
    let mut staged = Vec::new();
    let value = atomically(state, |working| f(working, &mut staged))?;
    for record in staged {
        log.push(record);
    }
    Ok(value)
}
