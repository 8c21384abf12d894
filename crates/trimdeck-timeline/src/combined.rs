//! Combined multi-clip timeline player.
//!
//! Composes N single-clip players into one virtual timeline. Global time
//! maps to (player, local time) by walking clip durations; the mapping is
//! derived on every lookup, never stored. At most one player is ever
//! playing: every handoff fully pauses the outgoing player before the
//! incoming one is touched.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, info};

use trimdeck_core::{
    rescale_to_canvas, CropDetectOptions, Disposer, Orientation, Region, Result, Rotation,
    StateCell, TrimdeckError,
};
use trimdeck_player::{ClipPlaybackState, ClipPlayer, MAX_SPEED, MIN_SPEED};

use crate::cuts::{
    cut_boundaries, delete_cut, end_cut, find_current_cut, sanitize_cuts, split_cuts_at_time,
    start_cut, Cut, MIN_CUT_GAP_MS,
};
use crate::serialization::EditResult;

/// Observable state of the combined timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedState {
    /// Position on the global timeline in milliseconds.
    pub current_time_ms: f64,
    pub is_playing: bool,
    pub speed: f64,
    /// Index of the player owning the current position.
    pub active_index: usize,
    /// Trim regions; `None` keeps the whole timeline.
    pub cuts: Option<Vec<Cut>>,
    /// Cut containing the current time. Recomputed in the same state
    /// update as every time or cut-list change, never lazily.
    pub current_cut_index: Option<usize>,
    pub orientation: Orientation,
    /// Crop in raw source coordinates.
    pub crop_raw: Option<Region>,
}

impl Default for CombinedState {
    fn default() -> Self {
        Self {
            current_time_ms: 0.0,
            is_playing: false,
            speed: 1.0,
            active_index: 0,
            cuts: None,
            current_cut_index: None,
            orientation: Orientation::IDENTITY,
            crop_raw: None,
        }
    }
}

/// The combined timeline player.
pub struct CombinedPlayer {
    players: Mutex<Vec<Arc<ClipPlayer>>>,
    state: StateCell<CombinedState>,
    /// Per-player event subscriptions, torn down and rebuilt on reorder.
    wiring: Mutex<Vec<Disposer>>,
    canvas_width: u32,
    canvas_height: u32,
}

impl CombinedPlayer {
    /// Build a timeline over an ordered list of players.
    pub fn new(players: Vec<Arc<ClipPlayer>>) -> Arc<Self> {
        let canvas_width = players
            .iter()
            .map(|p| p.descriptor().display_width)
            .max()
            .unwrap_or(0);
        let canvas_height = players
            .iter()
            .map(|p| p.descriptor().display_height)
            .max()
            .unwrap_or(0);

        let combined = Arc::new(Self {
            players: Mutex::new(players),
            state: StateCell::new(CombinedState::default()),
            wiring: Mutex::new(Vec::new()),
            canvas_width,
            canvas_height,
        });
        combined.wire_players();
        info!(
            clips = combined.players.lock().len(),
            canvas_width, canvas_height, "combined timeline ready"
        );
        combined
    }

    /// Snapshot of the timeline state.
    pub fn state(&self) -> CombinedState {
        self.state.get()
    }

    pub fn subscribe_state(
        &self,
        listener: impl Fn(&CombinedState) + Send + Sync + 'static,
    ) -> Disposer {
        self.state.subscribe(listener)
    }

    /// The common display canvas all clips are letterboxed into.
    pub fn canvas(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn players(&self) -> Vec<Arc<ClipPlayer>> {
        self.players.lock().clone()
    }

    /// Sum of all clip durations.
    pub fn total_duration_ms(&self) -> f64 {
        self.players.lock().iter().map(|p| p.duration_ms()).sum()
    }

    // ── Time mapping ────────────────────────────────────────────

    /// Map a global time to (player index, local time).
    ///
    /// Total over all inputs: times at or past the end clamp to the last
    /// clip's final position.
    pub fn global_to_local(&self, global_ms: f64) -> (usize, f64) {
        let players = self.players();
        if players.is_empty() {
            return (0, 0.0);
        }
        let mut offset = 0.0;
        for (index, player) in players.iter().enumerate() {
            let duration = player.duration_ms();
            if global_ms < offset + duration {
                return (index, (global_ms - offset).max(0.0));
            }
            offset += duration;
        }
        let last = players.len() - 1;
        (last, players[last].duration_ms())
    }

    /// Map (player index, local time) back to global time.
    pub fn local_to_global(&self, index: usize, local_ms: f64) -> f64 {
        let players = self.players();
        let offset: f64 = players
            .iter()
            .take(index)
            .map(|p| p.duration_ms())
            .sum();
        offset + local_ms
    }

    // ── Transport ───────────────────────────────────────────────

    pub fn play(self: &Arc<Self>) {
        let players = self.players();
        if players.is_empty() {
            return;
        }
        let active = self.state.get().active_index;
        self.state.update(|s| s.is_playing = true);
        players[active].play();
    }

    pub fn pause(self: &Arc<Self>) {
        let players = self.players();
        if players.is_empty() {
            return;
        }
        let active = self.state.get().active_index;
        self.state.update(|s| s.is_playing = false);
        players[active].pause();
    }

    /// Seek the global timeline.
    ///
    /// When the target resolves to a different player, the outgoing
    /// player is paused before the incoming one is sought or started.
    pub fn seek_to(self: &Arc<Self>, global_ms: f64) {
        let players = self.players();
        if players.is_empty() {
            return;
        }
        let global_ms = global_ms.clamp(0.0, self.total_duration_ms());
        let (index, local_ms) = self.global_to_local(global_ms);
        let snapshot = self.state.get();

        if index != snapshot.active_index {
            players[snapshot.active_index].pause();
            self.state.update(|s| {
                s.active_index = index;
                s.current_time_ms = global_ms;
                s.current_cut_index =
                    s.cuts.as_deref().and_then(|c| find_current_cut(c, global_ms));
            });
            if snapshot.is_playing {
                players[index].play_from(local_ms);
            } else {
                players[index].seek_to(local_ms);
            }
            debug!(from = snapshot.active_index, to = index, "player handoff");
        } else {
            self.state.update(|s| {
                s.current_time_ms = global_ms;
                s.current_cut_index =
                    s.cuts.as_deref().and_then(|c| find_current_cut(c, global_ms));
            });
            players[index].seek_to(local_ms);
        }
    }

    /// Change timeline speed; propagates to every constituent player.
    ///
    /// Out-of-range values fail without touching any state.
    pub fn set_speed(self: &Arc<Self>, speed: f64) -> Result<()> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(TrimdeckError::InvalidSpeed(speed));
        }
        self.state.update(|s| s.speed = speed);
        for player in self.players() {
            player.set_speed(speed)?;
        }
        Ok(())
    }

    /// Reorder a clip. All per-clip event wiring is torn down and rebuilt
    /// in the new order, and the active player and time re-resolve before
    /// playback resumes.
    pub fn move_player(self: &Arc<Self>, from: usize, to: usize) {
        let snapshot = self.state.get();
        {
            let players = self.players.lock();
            if from >= players.len() || to >= players.len() {
                return;
            }
        }
        if from == to {
            return;
        }

        self.players()[snapshot.active_index].pause();
        {
            let mut players = self.players.lock();
            let moved = players.remove(from);
            players.insert(to, moved);
        }
        self.wire_players();

        let (index, local_ms) = self.global_to_local(snapshot.current_time_ms);
        self.state.update(|s| s.active_index = index);
        let players = self.players();
        if snapshot.is_playing {
            players[index].play_from(local_ms);
        } else {
            players[index].seek_to(local_ms);
        }
        debug!(from, to, active = index, "clips reordered");
    }

    // ── Cut list ────────────────────────────────────────────────

    /// Replace the cut list. Input is sanitized; an empty result
    /// collapses to `None`. The current-cut index is recomputed in the
    /// same update.
    pub fn set_cuts(&self, cuts: Option<Vec<Cut>>) {
        let duration = self.total_duration_ms();
        let clean = cuts
            .map(|c| sanitize_cuts(&c, duration, MIN_CUT_GAP_MS))
            .filter(|c| !c.is_empty());
        self.state.update(|s| {
            s.current_cut_index = clean
                .as_deref()
                .and_then(|c| find_current_cut(c, s.current_time_ms));
            s.cuts = clean;
        });
    }

    /// Begin a cut at the current time.
    pub fn start_cut_at_current(&self) {
        let s = self.state.get();
        let existing = s.cuts.unwrap_or_default();
        let next = start_cut(&existing, s.current_time_ms, self.total_duration_ms());
        self.set_cuts(Some(next));
    }

    /// End a cut at the current time.
    pub fn end_cut_at_current(&self) {
        let s = self.state.get();
        let existing = s.cuts.unwrap_or_default();
        let next = end_cut(&existing, s.current_time_ms, self.total_duration_ms());
        self.set_cuts(Some(next));
    }

    /// Split the cut containing the current time.
    pub fn split_cut_at_current(&self) {
        let s = self.state.get();
        let Some(cuts) = s.cuts else { return };
        self.set_cuts(Some(split_cuts_at_time(&cuts, s.current_time_ms)));
    }

    /// Remove the cut at an index.
    pub fn delete_cut(&self, index: usize) {
        let s = self.state.get();
        let Some(cuts) = s.cuts else { return };
        self.set_cuts(delete_cut(&cuts, index));
    }

    /// Remove the cut containing the current time, if any.
    pub fn delete_current_cut(&self) {
        if let Some(index) = self.state.get().current_cut_index {
            self.delete_cut(index);
        }
    }

    // ── Breakpoint navigation ───────────────────────────────────

    /// Cut boundaries plus clip seams, unordered.
    fn breakpoints(&self) -> SmallVec<[f64; 16]> {
        let s = self.state.get();
        let mut points: SmallVec<[f64; 16]> = s
            .cuts
            .as_deref()
            .map(|c| cut_boundaries(c).into())
            .unwrap_or_default();
        let players = self.players();
        let mut offset = 0.0;
        for player in players.iter().take(players.len().saturating_sub(1)) {
            offset += player.duration_ms();
            points.push(offset);
        }
        points
    }

    /// Half a frame of the active clip: the tolerance that keeps
    /// navigation from re-selecting the current position.
    fn seek_tolerance_ms(&self) -> f64 {
        let players = self.players();
        let active = self.state.get().active_index;
        players
            .get(active)
            .map(|p| p.descriptor().frame_rate.half_frame_ms())
            .unwrap_or(0.0)
    }

    /// Jump to the nearest edit point after the current time, or the
    /// timeline end when there is none.
    pub fn seek_to_next_cut_point(self: &Arc<Self>) {
        let now = self.state.get().current_time_ms;
        let tolerance = self.seek_tolerance_ms();
        let target = self
            .breakpoints()
            .into_iter()
            .filter(|b| *b > now + tolerance)
            .fold(f64::INFINITY, f64::min);
        if target.is_finite() {
            self.seek_to(target);
        } else {
            self.seek_to(self.total_duration_ms());
        }
    }

    /// Jump to the nearest edit point before the current time, or the
    /// timeline start when there is none.
    pub fn seek_to_prev_cut_point(self: &Arc<Self>) {
        let now = self.state.get().current_time_ms;
        let tolerance = self.seek_tolerance_ms();
        let target = self
            .breakpoints()
            .into_iter()
            .filter(|b| *b < now - tolerance)
            .fold(f64::NEG_INFINITY, f64::max);
        self.seek_to(if target.is_finite() { target } else { 0.0 });
    }

    // ── Crop, orientation, export ───────────────────────────────

    /// Detect the content crop against the active clip and rescale it
    /// into the common display canvas.
    ///
    /// Clips with different native resolutions are letterboxed into the
    /// canvas, so the detected region is uniformly scaled from the
    /// constraining axis, shifted by the letterbox offset and clamped.
    pub fn crop_detect(&self, options: CropDetectOptions) -> Result<Option<Region>> {
        let players = self.players();
        if players.is_empty() {
            return Ok(None);
        }
        let active = self.state.get().active_index;
        let detected = players[active].crop_detect(options)?;
        Ok(detected.map(|region| rescale_to_canvas(region, self.canvas_width, self.canvas_height)))
    }

    pub fn set_rotation(&self, rotation: Rotation) {
        self.state.update(|s| s.orientation.rotation = rotation);
    }

    pub fn toggle_flip_horizontal(&self) {
        self.state
            .update(|s| s.orientation.flip_horizontal = !s.orientation.flip_horizontal);
    }

    pub fn toggle_flip_vertical(&self) {
        self.state
            .update(|s| s.orientation.flip_vertical = !s.orientation.flip_vertical);
    }

    /// Set (or clear) the crop, given in raw source coordinates.
    pub fn set_crop_raw(&self, crop: Option<Region>) {
        self.state.update(|s| s.crop_raw = crop);
    }

    /// Set the crop from a region in aware (as-rendered) coordinates;
    /// stored internally in raw space so orientation changes do not
    /// invalidate it.
    pub fn set_crop_aware(&self, crop: Region) {
        let orientation = self.state.get().orientation;
        self.set_crop_raw(Some(orientation.aware_to_raw(crop)));
    }

    /// The crop as currently rendered.
    pub fn crop_aware(&self) -> Option<Region> {
        let s = self.state.get();
        s.crop_raw.map(|r| s.orientation.raw_to_aware(r))
    }

    /// Everything the encode pipeline needs on submit.
    pub fn edit_result(&self) -> EditResult {
        let s = self.state.get();
        EditResult {
            crop: s.crop_raw,
            orientation: s.orientation,
            cuts: s.cuts,
        }
    }

    /// Tear down event wiring and close every player.
    pub fn close(&self) {
        self.wiring.lock().clear();
        for player in self.players() {
            player.close();
        }
        self.state.update(|s| s.is_playing = false);
    }

    // ── Event wiring ────────────────────────────────────────────

    fn wire_players(self: &Arc<Self>) {
        let players = self.players();
        let mut wiring = Vec::with_capacity(players.len() * 2);
        for (index, player) in players.iter().enumerate() {
            let weak = Arc::downgrade(self);
            wiring.push(player.subscribe_state(move |st| {
                if let Some(combined) = weak.upgrade() {
                    combined.on_player_state(index, st.clone());
                }
            }));
            let weak = Arc::downgrade(self);
            wiring.push(player.subscribe_ended(move || {
                if let Some(combined) = weak.upgrade() {
                    combined.on_clip_ended(index);
                }
            }));
        }
        // Replacing the vec disposes the previous subscriptions.
        *self.wiring.lock() = wiring;
    }

    /// Mirror the active player's local time into global time. The cut
    /// index is recomputed inside the same update.
    fn on_player_state(&self, index: usize, st: ClipPlaybackState) {
        let snapshot = self.state.get();
        if index != snapshot.active_index {
            return;
        }
        let global = self.local_to_global(index, st.current_time_ms);
        let errored = st.last_fallback_error.is_some() && !st.is_playing;
        self.state.update(|s| {
            s.current_time_ms = global;
            s.current_cut_index = s.cuts.as_deref().and_then(|c| find_current_cut(c, global));
            if errored {
                s.is_playing = false;
            }
        });
    }

    /// Clip chaining: when the active clip ends, the next one starts from
    /// zero (if the timeline was playing); the last clip ending stops
    /// global playback.
    fn on_clip_ended(self: &Arc<Self>, index: usize) {
        let players = self.players();
        let snapshot = self.state.get();
        if index != snapshot.active_index {
            return;
        }

        if index + 1 < players.len() {
            let next = players[index + 1].clone();
            next.clear_frame();
            let next_offset = self.local_to_global(index + 1, 0.0);
            self.state.update(|s| {
                s.active_index = index + 1;
                s.current_time_ms = next_offset;
                s.current_cut_index = s
                    .cuts
                    .as_deref()
                    .and_then(|c| find_current_cut(c, next_offset));
            });
            if snapshot.is_playing {
                next.play_from(0.0);
            } else {
                next.seek_to(0.0);
            }
            debug!(from = index, to = index + 1, "clip chained");
        } else {
            self.state.update(|s| s.is_playing = false);
            info!("combined timeline reached its end");
        }
    }
}

impl std::fmt::Debug for CombinedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedPlayer")
            .field("clips", &self.players.lock().len())
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use trimdeck_core::{FrameBuffer, FrameRate};
    use trimdeck_media::{
        synthetic_descriptor, SyntheticFrameSource, SyntheticWaveforms,
    };
    use trimdeck_player::{ManualClock, MockSurface, NativeSupport, PlayerDeps};

    fn deps(clock: &ManualClock) -> PlayerDeps {
        PlayerDeps {
            surface: MockSurface::new(NativeSupport::None),
            frames: Arc::new(SyntheticFrameSource::instant()),
            waveforms: Arc::new(SyntheticWaveforms::default()),
            clock: Arc::new(clock.clone()),
        }
    }

    fn make_combined(durations: &[f64]) -> (Arc<CombinedPlayer>, ManualClock) {
        let clock = ManualClock::new();
        let players = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                ClipPlayer::new(
                    synthetic_descriptor(&format!("clip{i}"), d, FrameRate::FPS_25, 64, 64),
                    deps(&clock),
                )
            })
            .collect();
        (CombinedPlayer::new(players), clock)
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

    #[test]
    fn test_seek_resolves_across_clip_boundary() {
        // Scenario: clips of 5000 ms and 3000 ms; 6000 global = clip 1 @ 1000.
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        combined.seek_to(6000.0);

        let st = combined.state();
        assert_eq!(st.active_index, 1);
        assert_eq!(combined.players()[1].state().current_time_ms, 1000.0);
        assert_eq!(st.current_time_ms, 6000.0);
    }

    #[test]
    fn test_global_to_local_is_total_and_monotonic() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);

        assert_eq!(combined.global_to_local(0.0), (0, 0.0));
        assert_eq!(combined.global_to_local(4999.0), (0, 4999.0));
        assert_eq!(combined.global_to_local(5000.0), (1, 0.0));
        // At/after the end clamps to the last clip's final position.
        assert_eq!(combined.global_to_local(8000.0), (1, 3000.0));
        assert_eq!(combined.global_to_local(99_999.0), (1, 3000.0));

        let mut last_index = 0;
        for step in 0..=80 {
            let (index, local) = combined.global_to_local(step as f64 * 100.0);
            assert!(index >= last_index);
            assert!(local >= 0.0);
            let duration = combined.players()[index].duration_ms();
            assert!(local <= duration);
            last_index = index;
        }
    }

    #[test]
    fn test_handoff_pauses_outgoing_player() {
        let (combined, clock) = make_combined(&[5000.0, 3000.0]);
        combined.play();
        wait_for(|| clock.scheduled_count() > 0);
        assert!(combined.players()[0].state().is_playing);

        combined.seek_to(6000.0);
        let players = combined.players();
        assert!(!players[0].state().is_playing);
        assert!(players[1].state().is_playing);
        assert_eq!(combined.state().active_index, 1);
    }

    #[test]
    fn test_clip_chaining_and_final_stop() {
        let (combined, clock) = make_combined(&[200.0, 300.0]);
        combined.play();
        wait_for(|| clock.scheduled_count() > 0);

        // Finish clip 0; the timeline chains into clip 1 and keeps playing.
        clock.advance(Duration::from_millis(250));
        assert_eq!(combined.state().active_index, 1);
        assert!(combined.state().is_playing);
        let players = combined.players();
        assert!(!players[0].state().is_playing);
        wait_for(|| players[1].state().is_playing);

        // Finish clip 1; the last clip ending stops global playback.
        wait_for(|| clock.scheduled_count() > 0);
        clock.advance(Duration::from_millis(400));
        assert!(!combined.state().is_playing);
        assert!(!combined.players()[1].state().is_playing);
    }

    #[test]
    fn test_cut_index_tracks_time_and_cut_changes() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        combined.set_cuts(Some(vec![Cut::new(1000.0, 2000.0)]));
        assert_eq!(combined.state().current_cut_index, None);

        combined.seek_to(1500.0);
        assert_eq!(combined.state().current_cut_index, Some(0));

        combined.seek_to(2500.0);
        assert_eq!(combined.state().current_cut_index, None);

        // A cut-list change at a fixed time recomputes the index too.
        combined.set_cuts(Some(vec![Cut::new(2400.0, 2600.0)]));
        assert_eq!(combined.state().current_cut_index, Some(0));
    }

    #[test]
    fn test_delete_only_cut_collapses_to_none() {
        let (combined, _clock) = make_combined(&[5000.0]);
        combined.set_cuts(Some(vec![Cut::new(1000.0, 2000.0)]));
        combined.seek_to(1500.0);

        combined.delete_current_cut();
        let st = combined.state();
        assert_eq!(st.cuts, None);
        assert_eq!(st.current_cut_index, None);
    }

    #[test]
    fn test_breakpoint_navigation_over_cuts_and_seams() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        combined.set_cuts(Some(vec![Cut::new(1000.0, 2000.0)]));

        combined.seek_to_next_cut_point();
        assert_eq!(combined.state().current_time_ms, 1000.0);
        combined.seek_to_next_cut_point();
        assert_eq!(combined.state().current_time_ms, 2000.0);
        // The clip seam at 5000 is a breakpoint too.
        combined.seek_to_next_cut_point();
        assert_eq!(combined.state().current_time_ms, 5000.0);
        // Nothing after: default to the timeline end.
        combined.seek_to_next_cut_point();
        assert_eq!(combined.state().current_time_ms, 8000.0);

        combined.seek_to_prev_cut_point();
        assert_eq!(combined.state().current_time_ms, 5000.0);
        combined.seek_to_prev_cut_point();
        combined.seek_to_prev_cut_point();
        combined.seek_to_prev_cut_point();
        // Nothing before: default to the timeline start.
        assert_eq!(combined.state().current_time_ms, 0.0);
    }

    #[test]
    fn test_move_player_rewires_and_re_resolves() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        let original = combined.players();
        combined.seek_to(6000.0);
        assert_eq!(combined.state().active_index, 1);

        combined.move_player(1, 0);
        // New order: [3000, 5000]. Global 6000 now lands in the second
        // player, which is the original first clip.
        let players = combined.players();
        assert!(Arc::ptr_eq(&players[0], &original[1]));
        assert!(Arc::ptr_eq(&players[1], &original[0]));
        assert_eq!(combined.state().active_index, 1);
        assert_eq!(players[1].state().current_time_ms, 3000.0);
    }

    #[test]
    fn test_invalid_speed_is_fatal_and_stateless() {
        // Scenario: timeline speed 0.4 must fail without touching state.
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        let before = combined.state();

        assert!(matches!(
            combined.set_speed(0.4),
            Err(TrimdeckError::InvalidSpeed(_))
        ));
        assert_eq!(combined.state(), before);
        assert_eq!(combined.players()[0].state().speed, 1.0);
    }

    #[test]
    fn test_speed_propagates_to_all_players() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        combined.set_speed(2.0).unwrap();
        assert_eq!(combined.state().speed, 2.0);
        for player in combined.players() {
            assert_eq!(player.state().speed, 2.0);
        }
    }

    #[test]
    fn test_crop_detect_rescales_into_canvas() {
        let clock = ManualClock::new();
        let frames = SyntheticFrameSource::instant().with_generator(|_, _, _| {
            let mut frame = FrameBuffer::solid(100, 100, [0, 0, 0]);
            for y in 40..60 {
                for x in 40..60 {
                    frame.set_pixel_rgb(x, y, [255, 255, 255]);
                }
            }
            frame
        });
        let small = ClipPlayer::new(
            synthetic_descriptor("small", 4000.0, FrameRate::FPS_25, 100, 100),
            PlayerDeps {
                surface: MockSurface::new(NativeSupport::None),
                frames: Arc::new(frames),
                waveforms: Arc::new(SyntheticWaveforms::default()),
                clock: Arc::new(clock.clone()),
            },
        );
        let wide = ClipPlayer::new(
            synthetic_descriptor("wide", 4000.0, FrameRate::FPS_25, 200, 100),
            deps(&clock),
        );
        let combined = CombinedPlayer::new(vec![small, wide]);
        assert_eq!(combined.canvas(), (200, 100));

        // Detected (40,40,20,20) in a 100x100 clip, pillarboxed into
        // 200x100: scale 1, x offset (200-100)/2 = 50.
        let region = combined
            .crop_detect(CropDetectOptions { threshold: 0.1 })
            .unwrap()
            .unwrap();
        assert_eq!(region, Region::new(90, 40, 20, 20, 200, 100));
    }

    #[test]
    fn test_crop_round_trips_through_orientation() {
        let (combined, _clock) = make_combined(&[5000.0]);
        combined.set_rotation(Rotation::R90);
        combined.toggle_flip_horizontal();

        let raw = Region::new(4, 8, 30, 20, 64, 64);
        combined.set_crop_raw(Some(raw));
        let aware = combined.crop_aware().unwrap();
        combined.set_crop_aware(aware);
        assert_eq!(combined.state().crop_raw, Some(raw));
    }

    #[test]
    fn test_edit_result_collects_everything() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        combined.set_cuts(Some(vec![Cut::new(1000.0, 2000.0)]));
        combined.set_rotation(Rotation::R180);
        combined.toggle_flip_vertical();
        combined.set_crop_raw(Some(Region::new(0, 0, 32, 32, 64, 64)));

        let result = combined.edit_result();
        assert_eq!(result.cuts.unwrap().len(), 1);
        assert_eq!(result.orientation.rotation, Rotation::R180);
        assert!(result.orientation.flip_vertical);
        assert!(result.crop.is_some());
    }

    #[test]
    fn test_start_and_end_cut_at_current() {
        let (combined, _clock) = make_combined(&[5000.0, 3000.0]);
        combined.seek_to(1000.0);
        combined.start_cut_at_current();
        // New cut runs to the end of the timeline.
        assert_eq!(
            combined.state().cuts,
            Some(vec![Cut::new(1000.0, 8000.0)])
        );

        combined.seek_to(3000.0);
        combined.end_cut_at_current();
        assert_eq!(
            combined.state().cuts,
            Some(vec![Cut::new(1000.0, 3000.0)])
        );
    }

    #[test]
    fn test_split_cut_at_current() {
        let (combined, _clock) = make_combined(&[5000.0]);
        combined.set_cuts(Some(vec![Cut::new(1000.0, 4000.0)]));
        combined.seek_to(2000.0);
        combined.split_cut_at_current();
        assert_eq!(
            combined.state().cuts,
            Some(vec![Cut::new(1000.0, 2000.0), Cut::new(2000.0, 4000.0)])
        );
    }

    #[test]
    fn test_close_stops_everything() {
        let (combined, clock) = make_combined(&[5000.0, 3000.0]);
        combined.play();
        wait_for(|| clock.scheduled_count() > 0);
        combined.close();
        assert_eq!(clock.scheduled_count(), 0);
        assert!(!combined.state().is_playing);
        for player in combined.players() {
            assert!(!player.state().is_playing);
        }
    }
}
