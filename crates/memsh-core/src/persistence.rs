//! JSON persistence of filesystem snapshots.
//!
//! Loading is forgiving: an empty, unreadable or malformed document is
//! logged and treated as "no saved state" so callers can start fresh.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::models::NodeSnapshot;

/// Parse a snapshot document, or `None` if it is empty or malformed.
pub fn from_json(json: &str) -> Option<NodeSnapshot> {
    if json.trim().is_empty() {
        warn!("snapshot document is empty, ignoring it");
        return None;
    }

    match serde_json::from_str(json) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(error = %e, "discarding malformed snapshot");
            None
        }
    }
}

/// Render a snapshot as pretty-printed JSON.
pub fn to_json(snapshot: &NodeSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

/// Read a snapshot file. Missing or unusable files yield `None`.
pub fn read_snapshot(path: &Path) -> Option<NodeSnapshot> {
    match fs::read_to_string(path) {
        Ok(json) => from_json(&json),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no saved snapshot");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read snapshot");
            None
        }
    }
}

/// Write a snapshot file, replacing any previous contents.
pub fn write_snapshot(path: &Path, snapshot: &NodeSnapshot) -> io::Result<()> {
    let json = to_json(snapshot)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "saved snapshot");
    Ok(())
}
