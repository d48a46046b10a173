use crate::config::Config;
use crate::game::events::{EventBus, GameEvent};
use crate::game::hold::{self, HoldChain, HoldGeometry};
use crate::game::input::{ButtonParams, InputEdge, PressState, RingColors, RingState};
use crate::game::judge::{NoteJudge, Registration};
use crate::game::level_map::HoldEntry;
use crate::game::note::{HoldTiming, NoteDistance, NoteType};
use crate::game::note_kind::NoteMeta;
use crate::game::path::MovementPath;
use crate::game::pool::{NoteHandle, NotePool};
use crate::game::scheduler::{LaneScheduler, SpawnRequest};
use log::{debug, error, info, warn};
use std::collections::VecDeque;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LaneSettings {
    pub move_speed: f32,
    pub game_speed: f32,
    pub boundary_start_point: usize,
    pub boundary_end_point: usize,
    pub note_length: f32,
    pub head_length: f32,
    pub tail_length: f32,
    pub unit_segment_length: f32,
    pub growth_tolerance: f32,
    pub ring: RingColors,
}

impl From<&Config> for LaneSettings {
    fn from(config: &Config) -> Self {
        Self {
            move_speed: config.move_speed,
            game_speed: config.game_speed,
            boundary_start_point: config.boundary_start_point,
            boundary_end_point: config.boundary_end_point,
            note_length: config.note_length,
            head_length: config.head_length,
            tail_length: config.tail_length,
            unit_segment_length: config.unit_segment_length,
            growth_tolerance: config.growth_tolerance,
            ring: config.ring,
        }
    }
}

/// Everything a lane borrows from its level for one tick.
pub struct TickContext<'a> {
    pub pool: &'a mut NotePool,
    pub bus: &'a mut EventBus,
    pub judge: &'a mut dyn NoteJudge,
    pub metas: &'a [NoteMeta],
}

pub struct Lane {
    idx: usize,
    path: Box<dyn MovementPath>,
    settings: LaneSettings,
    boundary_start: f32,
    boundary_end: f32,
    button_percentage: f32,
    spawn_time_offset: f32,
    scheduler: LaneScheduler,
    notes: Vec<NoteHandle>,
    note_within_bounds: Option<NoteHandle>,
    press: PressState,
    pending_edges: VecDeque<InputEdge>,
    ring: RingState,
    spawned: usize,
    finished_logged: bool,
}

impl Lane {
    pub fn new(
        idx: usize,
        path: Box<dyn MovementPath>,
        settings: LaneSettings,
        scheduler: LaneScheduler,
    ) -> Self {
        debug_assert!(path.length() > 0.0, "lane path must have a positive length");
        debug_assert!(settings.move_speed > 0.0, "lane move speed must be positive");
        let boundary_start = path.percentage_at_point(settings.boundary_start_point);
        let boundary_end = path.percentage_at_point(settings.boundary_end_point);
        if boundary_end <= boundary_start {
            warn!(
                "Lane {}: hit window [{:.3}, {:.3}] is empty; check the boundary points.",
                idx, boundary_start, boundary_end
            );
        }
        let mut lane = Self {
            idx,
            path,
            settings,
            boundary_start,
            boundary_end,
            button_percentage: (boundary_end - boundary_start) / 2.0 + boundary_start,
            spawn_time_offset: 0.0,
            scheduler,
            notes: Vec::new(),
            note_within_bounds: None,
            press: PressState::default(),
            pending_edges: VecDeque::new(),
            ring: RingState::new(&settings.ring),
            spawned: 0,
            finished_logged: false,
        };
        lane.update_spawn_time_offset();
        lane
    }

    fn update_spawn_time_offset(&mut self) {
        self.spawn_time_offset = self.button_percentage * self.path.length()
            / self.settings.move_speed
            * self.settings.game_speed;
        debug!("Lane {}: spawn time offset {:.3}s.", self.idx, self.spawn_time_offset);
    }

    /// Callers reject non-positive speeds before they reach the lane.
    pub fn set_move_speed(&mut self, move_speed: f32) {
        debug_assert!(move_speed > 0.0);
        self.settings.move_speed = move_speed;
        self.update_spawn_time_offset();
    }

    pub fn set_game_speed(&mut self, game_speed: f32) {
        debug_assert!(game_speed > 0.0);
        self.settings.game_speed = game_speed;
        self.update_spawn_time_offset();
    }

    #[inline(always)]
    pub fn idx(&self) -> usize {
        self.idx
    }

    #[inline(always)]
    pub fn spawn_time_offset(&self) -> f32 {
        self.spawn_time_offset
    }

    #[inline(always)]
    pub fn boundaries(&self) -> (f32, f32) {
        (self.boundary_start, self.boundary_end)
    }

    #[inline(always)]
    pub fn button_percentage(&self) -> f32 {
        self.button_percentage
    }

    pub fn path(&self) -> &dyn MovementPath {
        self.path.as_ref()
    }

    pub fn settings(&self) -> &LaneSettings {
        &self.settings
    }

    pub fn notes(&self) -> &[NoteHandle] {
        &self.notes
    }

    pub fn note_within_bounds(&self) -> Option<NoteHandle> {
        self.note_within_bounds
    }

    pub fn press(&self) -> &PressState {
        &self.press
    }

    pub fn ring(&self) -> &RingState {
        &self.ring
    }

    pub fn scheduler(&self) -> &LaneScheduler {
        &self.scheduler
    }

    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Nothing left to spawn and nothing on the path.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished() && self.notes.is_empty()
    }

    /// Queues a press, resolved on the next tick.
    pub fn press_button(&mut self) {
        self.pending_edges.push_back(InputEdge::Press);
    }

    pub fn release_button(&mut self) {
        self.pending_edges.push_back(InputEdge::Release);
    }

    /// Input as it will be seen by the next tick.
    pub fn is_pressed(&self) -> bool {
        match self.pending_edges.back() {
            Some(InputEdge::Press) => true,
            Some(InputEdge::Release) => false,
            None => self.press.pressed,
        }
    }

    pub fn custom_start(&mut self, t: f32) {
        self.scheduler.custom_start(t);
    }

    /// Hard reset: every note goes back to the pool and all cursors rewind.
    pub fn reset(&mut self, pool: &mut NotePool) {
        for handle in self.notes.drain(..) {
            if let Err(e) = pool.release(handle) {
                error!("Lane {}: reset could not return note: {}", self.idx, e);
            }
        }
        self.scheduler.reset();
        self.note_within_bounds = None;
        self.press = PressState::default();
        self.pending_edges.clear();
        self.ring = RingState::new(&self.settings.ring);
        self.spawned = 0;
        self.finished_logged = false;
    }

    pub fn tick(&mut self, song_time: f32, dt: f32, ctx: &mut TickContext) {
        let tick_percentage = self.settings.move_speed * dt / self.path.length();

        self.spawn_due_notes(song_time, ctx);
        self.update_notes(tick_percentage, ctx);
        self.check_within_bounds(ctx);
        self.ring.animate(dt, self.settings.ring.fill_rate);
        self.resolve_input(song_time, dt, ctx);
        self.grow_holds(tick_percentage, ctx);
        self.sweep(ctx);
    }

    fn spawn_due_notes(&mut self, song_time: f32, ctx: &mut TickContext) {
        while let Some(request) = self.scheduler.next_spawn(song_time, self.spawn_time_offset) {
            self.activate(request, song_time, ctx);
        }
    }

    fn activate(&mut self, request: SpawnRequest, song_time: f32, ctx: &mut TickContext) {
        let handle = ctx.pool.request(request.kind);
        let geometry = HoldGeometry {
            head_length: self.settings.head_length,
            tail_length: self.settings.tail_length,
            unit_segment_length: self.settings.unit_segment_length,
            path_length: self.path.length(),
        };
        let Some(note) = ctx.pool.get_mut(handle) else {
            error!("Lane {}: pool handed out a dead handle for {}.", self.idx, request.kind);
            return;
        };

        note.state.ignores_miss = request.kind == NoteType::Bomb;
        note.head_offset = self.settings.note_length / geometry.path_length;
        if let Some(meta) = ctx.metas.iter().find(|m| m.note_type == request.kind) {
            note.particle_color = meta.particle_color;
        }

        let mut segments = 0;
        if request.kind == NoteType::Hold {
            let entry = request.hold.unwrap_or(HoldEntry {
                start_time: request.time,
                duration: 0.0,
            });
            let timing = HoldTiming {
                start_time: entry.start_time,
                duration: entry.duration,
            };
            let total_length = self.settings.move_speed
                * (timing.end_time() - self.spawn_time_offset - song_time);
            let chain = HoldChain::build(total_length, &geometry);
            segments = chain.body_segments();
            debug!(
                "Lane {}: hold of {:.2}s spans {:.1} units in {} points.",
                self.idx,
                timing.duration,
                total_length,
                chain.len()
            );
            note.hold_timing = Some(timing);
            note.chain = Some(chain);
        }

        ctx.bus.emit(GameEvent::NoteSpawned {
            lane: self.idx,
            note: handle,
            note_type: request.kind,
        });
        for segment in 0..segments {
            ctx.bus.emit(GameEvent::SegmentSpawned {
                lane: self.idx,
                note: handle,
                segment,
            });
        }
        self.notes.push(handle);
        self.spawned += 1;
    }

    fn update_notes(&mut self, tick_percentage: f32, ctx: &mut TickContext) {
        let (start, end) = (self.boundary_start, self.boundary_end);
        let idx = self.idx;
        self.notes.retain(|&handle| {
            let Some(note) = ctx.pool.get_mut(handle) else {
                error!("Lane {}: dropping stale note handle {:?}.", idx, handle);
                return false;
            };
            note.move_tick(tick_percentage);
            if note.update_distance(start, end) {
                if !note.state.to_be_deactivated && !note.state.ignores_miss {
                    debug!("Lane {}: {} passed the button unhit.", idx, note.note_type);
                    ctx.bus.emit(GameEvent::NoteMiss {
                        lane: idx,
                        note: handle,
                        note_type: note.note_type,
                    });
                }
                note.state.to_be_deactivated = true;
            }
            true
        });
    }

    fn check_within_bounds(&mut self, ctx: &mut TickContext) {
        let mut within = None;
        let mut found = 0;
        for &handle in &self.notes {
            let Some(note) = ctx.pool.get(handle) else {
                continue;
            };
            if note.state.location == NoteDistance::InButton && !note.state.to_be_deactivated {
                within = Some((handle, note.particle_color));
                found += 1;
            }
        }
        if found > 1 {
            warn!("Lane {}: {} notes inside the hit window at once.", self.idx, found);
        }
        self.note_within_bounds = within.map(|(handle, _)| handle);

        if self.press.pressed {
            return;
        }
        match within {
            Some((_, color)) => {
                self.ring.set_within_bounds_color(color);
                self.switch_ring(ButtonParams::NoteWithinBounds, ctx.bus);
            }
            None => self.switch_ring(ButtonParams::Idle, ctx.bus),
        }
    }

    fn switch_ring(&mut self, params: ButtonParams, bus: &mut EventBus) {
        if let Some(color) = self.ring.switch(params, &self.settings.ring) {
            bus.emit(GameEvent::ButtonStateChanged {
                lane: self.idx,
                state: params,
                color,
            });
        }
    }

    fn resolve_input(&mut self, song_time: f32, dt: f32, ctx: &mut TickContext) {
        let mut held_this_tick = false;
        while let Some(edge) = self.pending_edges.pop_front() {
            match edge {
                InputEdge::Press => {
                    if !held_this_tick {
                        self.touch_held(song_time, dt, ctx);
                        held_this_tick = true;
                    }
                }
                InputEdge::Release => {
                    if self.press.pressed {
                        self.touch_released(ctx);
                    }
                }
            }
        }
        if held_this_tick {
            return;
        }
        if self.press.pressed {
            self.touch_held(song_time, dt, ctx);
        } else {
            self.touch_not_held(song_time, dt, ctx);
        }
    }

    fn touch_held(&mut self, song_time: f32, dt: f32, ctx: &mut TickContext) {
        if self.press.hold(dt) {
            match self.note_within_bounds {
                Some(handle) => {
                    if let Some(note) = ctx.pool.get(handle) {
                        self.ring.set_within_bounds_color(note.particle_color);
                    }
                    self.switch_ring(ButtonParams::NoteHit, ctx.bus);
                }
                None => {
                    self.switch_ring(ButtonParams::NoteMiss, ctx.bus);
                    self.press.invalidate();
                    ctx.bus.emit(GameEvent::CompleteMiss { lane: self.idx });
                }
            }
        }

        if !self.press.valid {
            return;
        }
        let Some(handle) = self.note_within_bounds else {
            return;
        };
        let Some(note) = ctx.pool.get_mut(handle) else {
            return;
        };
        let result = ctx.judge.register_touch(note, song_time, dt);
        self.apply_registration(handle, result, ctx);
    }

    fn touch_not_held(&mut self, song_time: f32, dt: f32, ctx: &mut TickContext) {
        let Some(handle) = self.note_within_bounds else {
            return;
        };
        let Some(note) = ctx.pool.get_mut(handle) else {
            return;
        };
        if !note.is_hold() {
            return;
        }
        let result = ctx.judge.register_not_held(note, song_time, dt);
        self.apply_registration(handle, result, ctx);
    }

    fn touch_released(&mut self, ctx: &mut TickContext) {
        debug!("Lane {}: released after {:.3}s.", self.idx, self.press.press_length);
        self.press.release();
        let Some(handle) = self.note_within_bounds else {
            return;
        };
        if let Some(note) = ctx.pool.get_mut(handle) {
            ctx.judge.touch_released(note);
        }
    }

    fn apply_registration(
        &mut self,
        handle: NoteHandle,
        result: Registration,
        ctx: &mut TickContext,
    ) {
        let Some(note) = ctx.pool.get_mut(handle) else {
            return;
        };
        let note_type = note.note_type;
        match result {
            Registration::Pending => {}
            Registration::Hit => {
                ctx.bus.emit(GameEvent::NoteHit {
                    lane: self.idx,
                    note: handle,
                    note_type,
                });
                self.press.invalidate();
                self.note_within_bounds = None;
                self.notes.retain(|&h| h != handle);
                if let Err(e) = ctx.pool.release(handle) {
                    error!("Lane {}: hit note could not be returned: {}", self.idx, e);
                    debug_assert!(false, "note returned twice");
                }
            }
            Registration::Miss => {
                note.state.to_be_deactivated = true;
                ctx.bus.emit(GameEvent::NoteMiss {
                    lane: self.idx,
                    note: handle,
                    note_type,
                });
                self.note_within_bounds = None;
            }
        }
    }

    fn grow_holds(&mut self, tick_percentage: f32, ctx: &mut TickContext) {
        let press_valid = self.press.held_valid();
        for &handle in &self.notes {
            if let Some(note) = ctx.pool.get_mut(handle) {
                if note.is_hold() {
                    hold::grow_note(
                        note,
                        tick_percentage,
                        press_valid,
                        self.button_percentage,
                        self.settings.growth_tolerance,
                    );
                }
            }
        }
    }

    fn sweep(&mut self, ctx: &mut TickContext) {
        let idx = self.idx;
        let mut done = Vec::new();
        self.notes.retain(|&handle| {
            let finished = ctx.pool.get(handle).is_some_and(|n| {
                n.state.to_be_deactivated && n.tail_path_percentage >= 1.0 && !n.state.stationary
            });
            if finished {
                done.push(handle);
            }
            !finished
        });
        for handle in done {
            if self.note_within_bounds == Some(handle) {
                self.note_within_bounds = None;
            }
            if let Err(e) = ctx.pool.release(handle) {
                error!("Lane {}: finished note could not be returned: {}", idx, e);
                debug_assert!(false, "note returned twice");
            }
        }
        if !self.finished_logged && self.is_finished() {
            info!("Lane {}: all {} notes done.", idx, self.spawned);
            self.finished_logged = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::EventKind;
    use crate::game::judge::HoldTimeJudge;
    use crate::game::level_map::{LevelMap, LevelMapRow, NUM_LANES};
    use crate::game::note::NoteType::{BegHold, Empty, EndHold, Single};
    use crate::game::path::PolylinePath;
    use crate::game::scheduler::SpecialSpawn;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    const DT: f32 = 1.0 / 120.0;

    struct Harness {
        lane: Lane,
        pool: NotePool,
        bus: EventBus,
        judge: HoldTimeJudge,
        events: Rc<RefCell<Vec<GameEvent>>>,
        time: f32,
    }

    impl Harness {
        fn new(rows: &[(f32, [NoteType; NUM_LANES])]) -> Self {
            let rows = rows
                .iter()
                .map(|&(time, lane_types)| LevelMapRow { time, lane_types })
                .collect();
            let map = Arc::new(LevelMap::from_rows(rows).unwrap());
            let scheduler = LaneScheduler::new(0, map, SpecialSpawn::default(), 1).unwrap();
            let settings = LaneSettings::from(&Config::default());
            let path = Box::new(PolylinePath::straight(1000.0, 11));
            let lane = Lane::new(0, path, settings, scheduler);

            let mut bus = EventBus::new();
            let events = Rc::new(RefCell::new(Vec::new()));
            for kind in [
                EventKind::NoteSpawned,
                EventKind::NoteHit,
                EventKind::NoteMiss,
                EventKind::CompleteMiss,
                EventKind::SegmentSpawned,
                EventKind::ButtonStateChanged,
            ] {
                let sink = events.clone();
                bus.subscribe(kind, "test", move |e| sink.borrow_mut().push(*e));
            }
            Self {
                lane,
                pool: NotePool::with_capacity(4),
                bus,
                judge: HoldTimeJudge::default(),
                events,
                time: -1.5,
            }
        }

        fn step(&mut self) {
            self.time += DT;
            let mut ctx = TickContext {
                pool: &mut self.pool,
                bus: &mut self.bus,
                judge: &mut self.judge,
                metas: &[],
            };
            self.lane.tick(self.time, DT, &mut ctx);
        }

        fn count(&self, kind: EventKind) -> usize {
            self.events.borrow().iter().filter(|e| e.kind() == kind).count()
        }

        fn first_note(&self) -> Option<&crate::game::note::Note> {
            self.lane.notes().first().and_then(|&h| self.pool.get(h))
        }
    }

    fn dedup_locations(seen: &[NoteDistance]) -> Vec<NoteDistance> {
        let mut out: Vec<NoteDistance> = Vec::new();
        for &loc in seen {
            if out.last() != Some(&loc) {
                out.push(loc);
            }
        }
        out
    }

    #[test]
    fn unhit_single_walks_the_states_and_misses_once() {
        let mut h = Harness::new(&[(0.0, [Single, Empty, Empty])]);
        assert!((h.lane.spawn_time_offset() - 1.0).abs() < 1e-6);
        assert_eq!(h.lane.boundaries(), (0.4, 0.6));

        let mut spawned_at = None;
        let mut seen = Vec::new();
        while h.time < 2.0 {
            h.step();
            if spawned_at.is_none() && h.count(EventKind::NoteSpawned) == 1 {
                spawned_at = Some(h.time);
            }
            if let Some(note) = h.first_note() {
                seen.push(note.state.location);
            }
        }

        let spawned_at = spawned_at.unwrap();
        assert!(
            spawned_at >= -1.0 && spawned_at < -1.0 + DT + 1e-4,
            "spawned at {}",
            spawned_at
        );
        assert_eq!(
            dedup_locations(&seen),
            vec![NoteDistance::InLane, NoteDistance::InButton, NoteDistance::PastButton]
        );
        assert_eq!(h.count(EventKind::NoteMiss), 1);
        assert!(h.lane.notes().is_empty(), "note leaves once its tail reaches the end");
        assert_eq!(h.pool.in_use(), 0);
    }

    #[test]
    fn empty_press_is_a_complete_miss_for_the_whole_press() {
        let mut h = Harness::new(&[(0.0, [Single, Empty, Empty])]);
        h.time = -1.1;
        h.step();
        assert!(h.lane.note_within_bounds().is_none());
        h.lane.press_button();

        let mut saw_bounds = false;
        for _ in 0..240 {
            h.step();
            assert!(!h.lane.press().valid, "press must stay invalid until release");
            saw_bounds |= h.lane.note_within_bounds().is_some();
        }
        assert!(saw_bounds, "the note should have entered the window during the press");
        assert_eq!(h.count(EventKind::CompleteMiss), 1);
        assert_eq!(h.count(EventKind::NoteHit), 0);
        assert_eq!(h.count(EventKind::NoteMiss), 1);

        h.lane.release_button();
        h.step();
        assert!(h.lane.press().valid);
    }

    #[test]
    fn pressing_inside_the_window_hits() {
        let mut h = Harness::new(&[(0.0, [Single, Empty, Empty])]);
        while h.lane.note_within_bounds().is_none() {
            h.step();
        }
        h.lane.press_button();
        h.step();
        h.lane.release_button();
        for _ in 0..240 {
            h.step();
        }
        assert_eq!(h.count(EventKind::NoteHit), 1);
        assert_eq!(h.count(EventKind::NoteMiss), 0);
        assert_eq!(h.count(EventKind::CompleteMiss), 0);
        assert_eq!(h.pool.in_use(), 0, "a hit returns the note at once");

        let rings: Vec<ButtonParams> = h
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                GameEvent::ButtonStateChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect();
        assert!(rings.contains(&ButtonParams::NoteWithinBounds));
        assert!(rings.contains(&ButtonParams::NoteHit));
        assert!(rings.windows(2).all(|w| w[0] != w[1]), "ring events fire only on change");
    }

    #[test]
    fn one_press_consumes_at_most_one_note() {
        let mut h = Harness::new(&[(0.0, [Single, Empty, Empty]), (0.1, [Single, Empty, Empty])]);
        while h.lane.note_within_bounds().is_none() {
            h.step();
        }
        h.lane.press_button();
        for _ in 0..300 {
            h.step();
        }
        assert_eq!(h.count(EventKind::NoteHit), 1);
        assert_eq!(h.count(EventKind::NoteMiss), 1, "second note needs its own press");
    }

    #[test]
    fn hold_activation_builds_the_chain_and_segments() {
        let mut h = Harness::new(&[(0.0, [BegHold, Empty, Empty]), (2.0, [EndHold, Empty, Empty])]);
        h.time = -1.0;
        h.step();
        let note = h.first_note().unwrap();
        let chain = note.chain.as_ref().unwrap();
        assert_eq!(chain.len(), 11);
        assert_eq!(chain.body_segments(), 9);
        assert_eq!(h.count(EventKind::SegmentSpawned), 9);
        assert_eq!(note.hold_timing.map(|t| t.end_time()), Some(2.0));
        assert_eq!(
            h.events.borrow().first().map(GameEvent::kind),
            Some(EventKind::NoteSpawned),
            "segments are announced after their note"
        );
    }

    #[test]
    fn unheld_hold_stays_on_the_path_until_its_tail_drains() {
        let mut h = Harness::new(&[(0.0, [BegHold, Empty, Empty]), (2.0, [EndHold, Empty, Empty])]);
        while h.lane.notes().is_empty() {
            h.step();
        }
        let handle = h.lane.notes()[0];

        let mut seen = Vec::new();
        let mut stationary_ticks = 0;
        let mut last_tail = 0.0;
        while h.pool.get(handle).is_some() {
            assert!(h.time < 10.0, "hold never left the lane");
            let note = h.pool.get(handle).unwrap();
            seen.push(note.state.location);
            last_tail = note.tail_path_percentage;
            assert!(note.tail_path_percentage < 1.0, "a drained hold must be swept that tick");
            if note.state.location == NoteDistance::PastButton {
                assert!(note.state.stationary, "tail at {} is still moving", last_tail);
                assert!(h.lane.notes().contains(&handle));
                stationary_ticks += 1;
            }
            h.step();
        }

        assert_eq!(
            dedup_locations(&seen),
            vec![NoteDistance::InLane, NoteDistance::InButton, NoteDistance::PastButton]
        );
        assert!(stationary_ticks > 1, "tail should take a while to catch up");
        assert!(
            last_tail + h.lane.settings().move_speed * DT / 1000.0 >= 1.0 - 1e-4,
            "swept early with the tail at {}",
            last_tail
        );
        assert!(h.lane.notes().is_empty());
        assert_eq!(h.count(EventKind::NoteMiss), 1);
        assert_eq!(h.pool.in_use(), 0);
    }

    #[test]
    fn held_hold_never_grows_past_the_button() {
        let mut h = Harness::new(&[(0.0, [BegHold, Empty, Empty]), (2.0, [EndHold, Empty, Empty])]);
        while h.lane.note_within_bounds().is_none() {
            h.step();
        }
        h.lane.press_button();
        let button = h.lane.button_percentage();
        let mut last_active = 0;
        while h.count(EventKind::NoteHit) == 0 && h.time < 5.0 {
            h.step();
            if let Some(note) = h.first_note() {
                let chain = note.chain.as_ref().unwrap();
                assert!(chain.active_index() >= last_active);
                last_active = chain.active_index();
                if note.state.location == NoteDistance::InButton && h.lane.press().held_valid() {
                    assert!(
                        chain.points().iter().all(|p| p.percentage <= button + 1e-6),
                        "chain passed the button at {}",
                        h.time
                    );
                }
            }
        }
        assert_eq!(h.count(EventKind::NoteHit), 1);
        assert_eq!(h.count(EventKind::NoteMiss), 0);
        assert_eq!(h.pool.in_use(), 0);
    }

    #[test]
    fn letting_go_of_a_hold_misses_once() {
        let mut h = Harness::new(&[(0.0, [BegHold, Empty, Empty]), (2.0, [EndHold, Empty, Empty])]);
        while h.lane.note_within_bounds().is_none() {
            h.step();
        }
        h.lane.press_button();
        for _ in 0..10 {
            h.step();
        }
        h.lane.release_button();
        for _ in 0..1200 {
            h.step();
        }
        assert_eq!(h.count(EventKind::NoteMiss), 1);
        assert_eq!(h.count(EventKind::NoteHit), 0);
        assert!(h.lane.notes().is_empty(), "missed hold still drains off the path");
    }

    #[test]
    fn speed_changes_move_the_lead_time() {
        let mut h = Harness::new(&[(0.0, [Single, Empty, Empty])]);
        h.lane.set_move_speed(1000.0);
        assert!((h.lane.spawn_time_offset() - 0.5).abs() < 1e-6);
        h.lane.set_game_speed(2.0);
        assert!((h.lane.spawn_time_offset() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reset_returns_every_note() {
        let mut h = Harness::new(&[
            (0.0, [Single, Empty, Empty]),
            (0.5, [BegHold, Empty, Empty]),
            (1.0, [EndHold, Empty, Empty]),
        ]);
        h.time = 0.0;
        h.step();
        assert_eq!(h.lane.notes().len(), 2);
        h.lane.press_button();
        h.lane.reset(&mut h.pool);
        assert_eq!(h.pool.in_use(), 0);
        assert_eq!(h.lane.scheduler().note_index(), 0);
        assert!(!h.lane.is_pressed());
    }
}
