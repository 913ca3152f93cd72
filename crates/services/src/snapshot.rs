//! Envelope for the persisted progress snapshot.

use quiz_core::model::ProgressState;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Storage key used when no namespace is configured.
pub const DEFAULT_NAMESPACE: &str = "quizz";

/// Layout version written alongside every snapshot.
pub const SNAPSHOT_VERSION: u32 = 0;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    state: &'a ProgressState,
    version: u32,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    state: ProgressState,
    version: u32,
}

/// Serialize `state` into the versioned snapshot envelope.
///
/// # Errors
///
/// Returns `SnapshotError::Json` if serialization fails.
pub fn encode(state: &ProgressState) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&SnapshotRef {
        state,
        version: SNAPSHOT_VERSION,
    })?)
}

/// Parse a snapshot envelope back into a `ProgressState`.
///
/// # Errors
///
/// Returns `SnapshotError::Json` for malformed input and
/// `SnapshotError::Version` when the envelope was written by another layout version.
/// Returns `SnapshotError::Invalid` when the decoded state breaks an invariant
/// the transitions keep, such as a cursor past the last question.
pub fn decode(raw: &str) -> Result<ProgressState, SnapshotError> {
    let snapshot: SnapshotOwned = serde_json::from_str(raw)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    snapshot.state.validate()?;
    Ok(snapshot.state)
}
