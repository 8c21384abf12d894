//! Integration tests for a full editing session.
//!
//! Drives the combined timeline the way the editor shell does: seek,
//! carve cuts, fix one up through the timestamp edit buffer, then export
//! and round-trip the session file.

use std::sync::Arc;

use trimdeck_core::{FrameRate, Region, Rotation};
use trimdeck_media::{synthetic_descriptor, SyntheticFrameSource, SyntheticWaveforms};
use trimdeck_player::{ClipPlayer, ManualClock, MockSurface, NativeSupport, PlayerDeps};
use trimdeck_timeline::{
    CombinedPlayer, Cut, CutEditBuffer, CutField, SessionFile,
};

// ── Helpers ────────────────────────────────────────────────────

fn player(name: &str, duration_ms: f64, clock: &ManualClock) -> Arc<ClipPlayer> {
    ClipPlayer::new(
        synthetic_descriptor(name, duration_ms, FrameRate::FPS_25, 640, 480),
        PlayerDeps {
            surface: MockSurface::new(NativeSupport::None),
            frames: Arc::new(SyntheticFrameSource::instant()),
            waveforms: Arc::new(SyntheticWaveforms::default()),
            clock: Arc::new(clock.clone()),
        },
    )
}

fn build_timeline() -> Arc<CombinedPlayer> {
    let clock = ManualClock::new();
    CombinedPlayer::new(vec![
        player("intro", 5000.0, &clock),
        player("body", 30_000.0, &clock),
        player("outro", 10_000.0, &clock),
    ])
}

// ── Timeline assembly ──────────────────────────────────────────

#[test]
fn total_duration_is_sum_of_clips() {
    let combined = build_timeline();
    assert_eq!(combined.total_duration_ms(), 45_000.0);
}

#[test]
fn seeks_resolve_into_the_right_clip() {
    let combined = build_timeline();

    combined.seek_to(4000.0);
    assert_eq!(combined.state().active_index, 0);

    combined.seek_to(20_000.0);
    assert_eq!(combined.state().active_index, 1);
    assert_eq!(combined.players()[1].state().current_time_ms, 15_000.0);

    combined.seek_to(44_000.0);
    assert_eq!(combined.state().active_index, 2);
}

// ── Cut editing session ────────────────────────────────────────

#[test]
fn carve_cuts_and_edit_one_bound_by_text() {
    let combined = build_timeline();

    // Carve [2000, 8000] with the transport.
    combined.seek_to(2000.0);
    combined.start_cut_at_current();
    combined.seek_to(8000.0);
    combined.end_cut_at_current();
    assert_eq!(
        combined.state().cuts,
        Some(vec![Cut::new(2000.0, 8000.0)])
    );

    // Carve a second region, then pull its start back via the timestamp
    // field the way the cut table does.
    combined.seek_to(20_000.0);
    combined.start_cut_at_current();
    combined.seek_to(25_000.0);
    combined.end_cut_at_current();
    let cuts = combined.state().cuts.unwrap();
    assert_eq!(cuts, vec![Cut::new(2000.0, 8000.0), Cut::new(20_000.0, 25_000.0)]);

    let mut buffer = CutEditBuffer::new();
    let updated = buffer
        .apply_edit(&cuts, 1, CutField::Start, "00:00:15.000", 45_000.0)
        .expect("valid edit commits");
    combined.set_cuts(Some(updated));
    assert_eq!(
        combined.state().cuts,
        Some(vec![Cut::new(2000.0, 8000.0), Cut::new(15_000.0, 25_000.0)])
    );

    // A misordered edit stays pending and the authoritative list is
    // untouched.
    let cuts = combined.state().cuts.clone().unwrap();
    assert!(buffer
        .apply_edit(&cuts, 1, CutField::Start, "00:00:01.000", 45_000.0)
        .is_none());
    assert!(buffer.is_pending(1, CutField::Start));
    assert_eq!(combined.state().cuts.as_ref().unwrap()[1].start_ms, 15_000.0);
}

#[test]
fn breakpoints_span_cuts_and_clip_seams() {
    let combined = build_timeline();
    combined.set_cuts(Some(vec![Cut::new(2000.0, 8000.0)]));

    let mut stops = Vec::new();
    for _ in 0..5 {
        combined.seek_to_next_cut_point();
        stops.push(combined.state().current_time_ms);
    }
    // Cut bounds at 2000/8000, seams at 5000/35000, then the end.
    assert_eq!(stops, vec![2000.0, 5000.0, 8000.0, 35_000.0, 45_000.0]);
}

// ── Export round trip ──────────────────────────────────────────

#[test]
fn session_export_and_reload() {
    let combined = build_timeline();
    combined.set_cuts(Some(vec![
        Cut::new(2000.0, 8000.0),
        Cut::new(15_000.0, 25_000.0),
    ]));
    combined.set_rotation(Rotation::R90);
    combined.toggle_flip_horizontal();
    combined.set_crop_raw(Some(Region::new(40, 0, 560, 480, 640, 480)));

    let result = combined.edit_result();
    let path = std::env::temp_dir().join(format!("trimdeck-session-{}.json", uuid::Uuid::new_v4()));
    SessionFile::new(result.clone())
        .save_to_file(&path)
        .unwrap();
    let loaded = SessionFile::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.edit, result);
    assert_eq!(loaded.edit.cuts.as_ref().unwrap().len(), 2);
    assert_eq!(loaded.edit.orientation.rotation, Rotation::R90);
    assert!(loaded.edit.orientation.flip_horizontal);
    assert_eq!(
        loaded.edit.crop,
        Some(Region::new(40, 0, 560, 480, 640, 480))
    );
}
