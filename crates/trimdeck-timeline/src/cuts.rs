//! Cut-list editing.
//!
//! A cut is a `[start, end)` trim region on the global timeline, in
//! milliseconds. The list is kept sorted, non-overlapping and bounded by
//! re-sanitizing after every edit; `None` at the holder means "no
//! trimming, whole timeline kept" and an empty list always collapses to
//! it. All operations here are free functions over plain data.

use serde::{Deserialize, Serialize};

/// Minimum spacing between consecutive cuts; anything closer is merged
/// into its predecessor. Zero merges only true overlaps, which keeps the
/// adjacent pair produced by a split intact.
pub const MIN_CUT_GAP_MS: f64 = 0.0;

/// Edits this close to the timeline boundary are no-ops, so zero-length
/// cuts cannot be created at the edges.
pub const BOUNDARY_TOLERANCE_MS: f64 = 1.0;

/// One trim region on the global timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub start_ms: f64,
    pub end_ms: f64,
}

impl Cut {
    pub fn new(start_ms: f64, end_ms: f64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Whether a time lies within `[start, end)`.
    pub fn contains(&self, time_ms: f64) -> bool {
        time_ms >= self.start_ms && time_ms < self.end_ms
    }
}

/// Sort, clamp and de-overlap a cut list.
///
/// Degenerate entries (end ≤ start after clamping) are dropped; an entry
/// closer than `min_gap_ms` to its predecessor is merged into it.
/// Idempotent: sanitizing a sanitized list returns it unchanged.
pub fn sanitize_cuts(cuts: &[Cut], duration_ms: f64, min_gap_ms: f64) -> Vec<Cut> {
    let mut clamped: Vec<Cut> = cuts
        .iter()
        .map(|cut| Cut {
            start_ms: cut.start_ms.clamp(0.0, duration_ms),
            end_ms: cut.end_ms.clamp(0.0, duration_ms),
        })
        .filter(|cut| cut.end_ms > cut.start_ms)
        .collect();
    clamped.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));

    let mut result: Vec<Cut> = Vec::with_capacity(clamped.len());
    for cut in clamped {
        match result.last_mut() {
            Some(prev) if cut.start_ms - prev.end_ms < min_gap_ms => {
                // Overlapping or too close: absorb into the previous cut.
                prev.end_ms = prev.end_ms.max(cut.end_ms);
            }
            _ => result.push(cut),
        }
    }
    result
}

/// Index of the cut containing `time_ms`, if any.
pub fn find_current_cut(cuts: &[Cut], time_ms: f64) -> Option<usize> {
    cuts.iter().position(|cut| cut.contains(time_ms))
}

/// Begin (or re-anchor) a cut at `time_ms`.
///
/// Priority: a cut containing the time has its start moved; a time ahead
/// of every cut pulls the first cut's start back; otherwise a new cut
/// from the time to the end of the timeline is appended. Within 1 ms of
/// the timeline end this is a no-op.
pub fn start_cut(cuts: &[Cut], time_ms: f64, duration_ms: f64) -> Vec<Cut> {
    if time_ms >= duration_ms - BOUNDARY_TOLERANCE_MS {
        return cuts.to_vec();
    }
    let mut result = cuts.to_vec();

    if let Some(index) = result
        .iter()
        .position(|cut| time_ms >= cut.start_ms && time_ms < cut.end_ms)
    {
        result[index].start_ms = time_ms;
    } else if let Some(first) = result.first_mut().filter(|first| time_ms < first.start_ms) {
        // Ahead of every cut: extend the first one backward.
        first.start_ms = time_ms;
    } else {
        result.push(Cut::new(time_ms, duration_ms));
    }
    result
}

/// End (or re-anchor) a cut at `time_ms`.
///
/// Priority: a cut containing the time has its end moved; a cut ending
/// before the time has its end pushed forward; otherwise a cut from the
/// timeline start to the time is prepended. Within 1 ms of the timeline
/// start this is a no-op.
pub fn end_cut(cuts: &[Cut], time_ms: f64, duration_ms: f64) -> Vec<Cut> {
    if time_ms <= BOUNDARY_TOLERANCE_MS {
        return cuts.to_vec();
    }
    let time_ms = time_ms.min(duration_ms);
    let mut result = cuts.to_vec();

    if let Some(index) = result
        .iter()
        .position(|cut| time_ms > cut.start_ms && time_ms <= cut.end_ms)
    {
        result[index].end_ms = time_ms;
    } else if let Some(index) = result
        .iter()
        .enumerate()
        .filter(|(_, cut)| cut.end_ms < time_ms)
        .map(|(i, _)| i)
        .last()
    {
        // The nearest cut ending before the time extends forward.
        result[index].end_ms = time_ms;
    } else {
        result.insert(0, Cut::new(0.0, time_ms));
    }
    result
}

/// Remove the cut at `index`. `None` means the list collapsed to "no
/// trimming".
pub fn delete_cut(cuts: &[Cut], index: usize) -> Option<Vec<Cut>> {
    let mut result = cuts.to_vec();
    if index < result.len() {
        result.remove(index);
    }
    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Split the cut containing `time_ms` into two at that point. A time not
/// strictly inside any cut leaves the list unchanged.
pub fn split_cuts_at_time(cuts: &[Cut], time_ms: f64) -> Vec<Cut> {
    let mut result = Vec::with_capacity(cuts.len() + 1);
    for cut in cuts {
        if time_ms > cut.start_ms && time_ms < cut.end_ms {
            result.push(Cut::new(cut.start_ms, time_ms));
            result.push(Cut::new(time_ms, cut.end_ms));
        } else {
            result.push(*cut);
        }
    }
    result
}

/// All cut start/end boundaries, in list order.
pub fn cut_boundaries(cuts: &[Cut]) -> Vec<f64> {
    cuts.iter()
        .flat_map(|cut| [cut.start_ms, cut.end_ms])
        .collect()
}
