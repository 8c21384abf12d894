//! Integration tests for playback across the player and timeline crates.
//!
//! Exercises the fallback timing loop, native proxying and the handoff
//! protocol end to end, with synthetic media and a manual clock.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use trimdeck_core::FrameRate;
use trimdeck_media::{synthetic_descriptor, SyntheticFrameSource, SyntheticWaveforms};
use trimdeck_player::{
    ClipPlayer, ManualClock, MockSurface, NativeSupport, PlaybackMode, PlayerDeps, SurfaceCall,
};
use trimdeck_timeline::CombinedPlayer;

// ── Helpers ────────────────────────────────────────────────────

fn fallback_deps(clock: &ManualClock) -> PlayerDeps {
    PlayerDeps {
        surface: MockSurface::new(NativeSupport::None),
        frames: Arc::new(SyntheticFrameSource::instant()),
        waveforms: Arc::new(SyntheticWaveforms::default()),
        clock: Arc::new(clock.clone()),
    }
}

fn fallback_player(name: &str, duration_ms: f64, clock: &ManualClock) -> Arc<ClipPlayer> {
    ClipPlayer::new(
        synthetic_descriptor(name, duration_ms, FrameRate::FPS_25, 64, 64),
        fallback_deps(clock),
    )
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("condition not reached in time");
}

// ── Fallback playback through the combined timeline ────────────

#[test]
fn double_speed_playback_crosses_the_seam() {
    let clock = ManualClock::new();
    let combined = CombinedPlayer::new(vec![
        fallback_player("a", 1000.0, &clock),
        fallback_player("b", 1000.0, &clock),
    ]);

    combined.set_speed(2.0).unwrap();
    combined.play();
    wait_for(|| clock.scheduled_count() > 0);

    // 600 ms of wall clock at 2x covers 1200 ms of media: clip 0 ends and
    // clip 1 takes over.
    clock.advance(Duration::from_millis(600));
    assert_eq!(combined.state().active_index, 1);
    assert!(combined.state().is_playing);

    // The incoming player runs at the timeline speed.
    assert_eq!(combined.players()[1].state().speed, 2.0);
}

#[test]
fn exactly_one_player_playing_during_scrub() {
    let clock = ManualClock::new();
    let combined = CombinedPlayer::new(vec![
        fallback_player("a", 2000.0, &clock),
        fallback_player("b", 2000.0, &clock),
        fallback_player("c", 2000.0, &clock),
    ]);

    combined.play();
    for target in [500.0, 2500.0, 4500.0, 1500.0, 5500.0] {
        combined.seek_to(target);
        let playing: usize = combined
            .players()
            .iter()
            .filter(|p| p.state().is_playing)
            .count();
        assert_eq!(playing, 1, "seek to {target} left {playing} players playing");
    }
}

// ── Mixed native and fallback clips ────────────────────────────

#[test]
fn native_clip_hands_off_to_fallback_clip() {
    let clock = ManualClock::new();
    let surface = MockSurface::new(NativeSupport::Full);
    let native = ClipPlayer::new(
        synthetic_descriptor("native", 3000.0, FrameRate::FPS_25, 64, 64),
        PlayerDeps {
            surface: surface.clone(),
            frames: Arc::new(SyntheticFrameSource::instant()),
            waveforms: Arc::new(SyntheticWaveforms::default()),
            clock: Arc::new(clock.clone()),
        },
    );
    let fallback = fallback_player("fallback", 3000.0, &clock);
    assert_eq!(native.mode(), PlaybackMode::Native);
    assert_eq!(fallback.mode(), PlaybackMode::Fallback);

    let combined = CombinedPlayer::new(vec![native, fallback]);
    combined.play();
    assert_eq!(surface.calls().last(), Some(&SurfaceCall::Play));

    // Crossing the seam pauses the native surface before the fallback
    // stream starts.
    combined.seek_to(4000.0);
    assert_eq!(surface.calls().last(), Some(&SurfaceCall::Pause));
    let players = combined.players();
    assert!(players[1].state().is_playing);
    assert_eq!(players[1].state().current_time_ms, 1000.0);
}

// ── Failure recovery ───────────────────────────────────────────

#[test]
fn stream_failure_reports_and_editing_continues() {
    let clock = ManualClock::new();
    let broken = ClipPlayer::new(
        synthetic_descriptor("broken", 2000.0, FrameRate::FPS_25, 64, 64),
        PlayerDeps {
            surface: MockSurface::new(NativeSupport::None),
            frames: Arc::new(SyntheticFrameSource::failing()),
            waveforms: Arc::new(SyntheticWaveforms::default()),
            clock: Arc::new(clock.clone()),
        },
    );
    let combined = CombinedPlayer::new(vec![broken]);

    combined.play();
    // The stream failed synchronously: playback stopped, a report is up.
    let player_state = combined.players()[0].state();
    assert!(!player_state.is_playing);
    assert!(player_state.last_fallback_error.is_some());
    assert!(!combined.state().is_playing);

    // Cut editing is unaffected by the decode failure.
    combined.start_cut_at_current();
    assert!(combined.state().cuts.is_some());
    combined.players()[0].dismiss_fallback_error();
    assert!(combined.players()[0].state().last_fallback_error.is_none());
}

#[test]
fn teardown_releases_all_scheduled_work() {
    let clock = ManualClock::new();
    let combined = CombinedPlayer::new(vec![
        fallback_player("a", 5000.0, &clock),
        fallback_player("b", 5000.0, &clock),
    ]);

    combined.play();
    wait_for(|| clock.scheduled_count() > 0);
    combined.close();

    // No timing loop survives teardown; leaking one is the primary
    // resource-leak risk of the fallback path.
    assert_eq!(clock.scheduled_count(), 0);
}
