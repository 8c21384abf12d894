//! Timestamp editing and edit-session persistence.
//!
//! Cut bounds are edited in the UI as human-readable timestamps. A string
//! only becomes authoritative when it parses AND respects the ordering of
//! its immediate neighbors; anything else is held as a pending,
//! uncommitted value (shown as invalid) instead of being rejected. The
//! edit-session file uses versioned JSON with sequential migration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use trimdeck_core::{
    format_timestamp, parse_timestamp, Orientation, Region, Result, TrimdeckError,
};

use crate::cuts::Cut;

/// Which bound of a cut a text field edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutField {
    Start,
    End,
}

/// Pending (not-yet-valid) timestamp edits, keyed by cut index and field.
#[derive(Debug, Clone, Default)]
pub struct CutEditBuffer {
    pending: HashMap<(usize, CutField), String>,
}

impl CutEditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text a field should display: the pending edit if one is held,
    /// otherwise the committed value formatted as a timestamp.
    pub fn display_text(&self, cuts: &[Cut], index: usize, field: CutField) -> String {
        if let Some(text) = self.pending.get(&(index, field)) {
            return text.clone();
        }
        match (cuts.get(index), field) {
            (Some(cut), CutField::Start) => format_timestamp(cut.start_ms),
            (Some(cut), CutField::End) => format_timestamp(cut.end_ms),
            (None, _) => String::new(),
        }
    }

    /// Whether a field currently holds an uncommitted (invalid) edit.
    pub fn is_pending(&self, index: usize, field: CutField) -> bool {
        self.pending.contains_key(&(index, field))
    }

    /// Try to commit an edited string into the cut list.
    ///
    /// Returns the updated list on success (the pending entry, if any, is
    /// cleared). On parse failure or a neighbor-ordering violation the
    /// text is held as pending and `None` is returned; this is never an
    /// error.
    pub fn apply_edit(
        &mut self,
        cuts: &[Cut],
        index: usize,
        field: CutField,
        text: &str,
        duration_ms: f64,
    ) -> Option<Vec<Cut>> {
        let committed = parse_timestamp(text)
            .filter(|&ms| ms <= duration_ms)
            .filter(|&ms| ordering_holds(cuts, index, field, ms));

        match committed {
            Some(ms) => {
                let mut result = cuts.to_vec();
                match field {
                    CutField::Start => result[index].start_ms = ms,
                    CutField::End => result[index].end_ms = ms,
                }
                self.pending.remove(&(index, field));
                Some(result)
            }
            None => {
                self.pending.insert((index, field), text.to_string());
                None
            }
        }
    }

    /// Drop all pending edits (e.g. after the cut list itself changed).
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// A bound edit is orderly when it stays inside its own cut and does not
/// cross the neighboring cut.
fn ordering_holds(cuts: &[Cut], index: usize, field: CutField, ms: f64) -> bool {
    let Some(cut) = cuts.get(index) else {
        return false;
    };
    match field {
        CutField::Start => {
            ms < cut.end_ms && (index == 0 || ms >= cuts[index - 1].end_ms)
        }
        CutField::End => {
            ms > cut.start_ms
                && cuts
                    .get(index + 1)
                    .map_or(true, |next| ms <= next.start_ms)
        }
    }
}

// ── Edit session files ──────────────────────────────────────────

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Everything handed to the encode pipeline on submit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditResult {
    /// Crop in raw source coordinates, if any.
    pub crop: Option<Region>,
    #[serde(flatten)]
    pub orientation: Orientation,
    /// Trim regions; `None` keeps the whole timeline.
    pub cuts: Option<Vec<Cut>>,
}

/// Versioned edit-session file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionFile {
    /// Schema version for migration.
    pub version: u32,
    /// The edit data.
    pub edit: EditResult,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl SessionFile {
    /// Wrap an edit result for persistence.
    pub fn new(edit: EditResult) -> Self {
        Self {
            version: CURRENT_VERSION,
            edit,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| TrimdeckError::Serialization(format!("failed to serialize session: {e}")))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| TrimdeckError::Serialization(format!("invalid JSON: {e}")))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(TrimdeckError::Serialization(format!(
                "session file version {version} is newer than supported version {CURRENT_VERSION}"
            )));
        }

        let migrated = migrate(raw, version)?;
        serde_json::from_value(migrated)
            .map_err(|e| TrimdeckError::Serialization(format!("failed to parse session: {e}")))
    }

    /// Save the session to a file path.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a session from a file path.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations up to [`CURRENT_VERSION`].
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;
    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 files were a bare EditResult with no wrapper.
                if data.get("version").is_none() {
                    data = serde_json::json!({
                        "version": 1,
                        "edit": data,
                        "app_version": "0.1.0",
                    });
                }
                version = 1;
            }
            _ => {
                return Err(TrimdeckError::Serialization(format!(
                    "no migration path from version {version}"
                )));
            }
        }
    }
    Ok(data)
}
