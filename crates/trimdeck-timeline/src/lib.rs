//! TrimDeck Timeline - the combined multi-clip timeline and cut list
//!
//! Implements the editing surface over the single-clip players:
//! - Global↔local time mapping with player handoff and clip chaining
//! - The cut-list engine (sanitize, edit, split, navigate)
//! - Timestamp editing with pending-edit buffering
//! - Cross-clip crop-detect rescaling and the edit-result export

pub mod combined;
pub mod cuts;
pub mod serialization;

pub use combined::{CombinedPlayer, CombinedState};
pub use cuts::{
    cut_boundaries, delete_cut, end_cut, find_current_cut, sanitize_cuts, split_cuts_at_time,
    start_cut, Cut, BOUNDARY_TOLERANCE_MS, MIN_CUT_GAP_MS,
};
pub use serialization::{
    CutEditBuffer, CutField, EditResult, SessionFile, CURRENT_VERSION,
};
