use crate::config::Config;
use crate::game::events::{EventBus, EventKind, GameEvent, SubscriberId};
use crate::game::judge::{HoldTimeJudge, NoteJudge};
use crate::game::lane::{Lane, LaneSettings, TickContext};
use crate::game::level_map::{self, LevelError, LevelMap, NUM_LANES};
use crate::game::note::NoteType;
use crate::game::note_kind::NoteMeta;
use crate::game::path::PolylinePath;
use crate::game::pool::NotePool;
use crate::game::scheduler::{LaneScheduler, SpecialSpawn};
use log::info;
use rand::RngCore;
use std::sync::Arc;

/// A running level: the lanes, the note pool they share, the event bus and
/// the simulation clock.
pub struct Level {
    map: Arc<LevelMap>,
    lanes: Vec<Lane>,
    pool: NotePool,
    bus: EventBus,
    judge: Box<dyn NoteJudge>,
    metas: Vec<NoteMeta>,
    playing: bool,
    song_time: f32,
    start_time: f32,
}

fn note_metas(config: &Config) -> Vec<NoteMeta> {
    vec![
        NoteMeta::new(NoteType::Single, config.single_class, config.single_color),
        NoteMeta::new(NoteType::Hold, config.hold_class, config.hold_color),
        NoteMeta::new(NoteType::Bomb, config.special_class, config.special_color),
        NoteMeta::new(NoteType::Random, config.special_class, config.special_color),
        NoteMeta::new(NoteType::Igc, config.special_class, config.special_color),
    ]
}

fn specials(config: &Config) -> SpecialSpawn {
    SpecialSpawn {
        bombs_enabled: config.bombs_enabled,
        bomb_freq: config.bomb_spawn_freq,
        igc_freq: config.igc_spawn_freq,
        rand_freq: config.rand_spawn_freq,
    }
}

impl Level {
    /// Builds one straight lane per map column with seeded per-lane RNGs.
    pub fn new(map: Arc<LevelMap>, config: &Config) -> level_map::Result<Self> {
        let mut schedulers = Vec::with_capacity(NUM_LANES);
        for idx in 0..NUM_LANES {
            schedulers.push(LaneScheduler::new(idx, map.clone(), specials(config), config.seed)?);
        }
        Ok(Self::from_schedulers(map, config, schedulers))
    }

    /// Like `new`, but every lane draws from its own injected RNG.
    pub fn with_rngs(
        map: Arc<LevelMap>,
        config: &Config,
        rngs: Vec<Box<dyn RngCore>>,
    ) -> level_map::Result<Self> {
        if rngs.len() != NUM_LANES {
            return Err(LevelError::RngCount {
                expected: NUM_LANES,
                found: rngs.len(),
            });
        }
        let mut schedulers = Vec::with_capacity(NUM_LANES);
        for (idx, rng) in rngs.into_iter().enumerate() {
            schedulers.push(LaneScheduler::with_rng(idx, map.clone(), specials(config), rng)?);
        }
        Ok(Self::from_schedulers(map, config, schedulers))
    }

    fn from_schedulers(
        map: Arc<LevelMap>,
        config: &Config,
        schedulers: Vec<LaneScheduler>,
    ) -> Self {
        let settings = LaneSettings::from(config);
        let lanes: Vec<Lane> = schedulers
            .into_iter()
            .enumerate()
            .map(|(idx, scheduler)| {
                let path = PolylinePath::straight(config.path_length, config.path_points);
                Lane::new(idx, Box::new(path), settings, scheduler)
            })
            .collect();

        // Start early enough for the first row to spawn on time.
        let lead = lanes.iter().map(Lane::spawn_time_offset).fold(0.0, f32::max);
        let first = map.rows().first().map_or(0.0, |r| r.time);
        let start_time = (first - lead).min(0.0);

        info!(
            "Level ready: {} lanes, {} rows, lead time {:.2}s.",
            lanes.len(),
            map.len(),
            lead
        );
        Self {
            map,
            lanes,
            pool: NotePool::with_capacity(config.pool_capacity),
            bus: EventBus::new(),
            judge: Box::new(HoldTimeJudge {
                hit_ratio: config.hit_ratio,
            }),
            metas: note_metas(config),
            playing: false,
            song_time: start_time,
            start_time,
        }
    }

    pub fn set_judge(&mut self, judge: Box<dyn NoteJudge>) {
        self.judge = judge;
    }

    pub fn map(&self) -> &LevelMap {
        &self.map
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, idx: usize) -> Option<&Lane> {
        self.lanes.get(idx)
    }

    pub fn pool(&self) -> &NotePool {
        &self.pool
    }

    pub fn metas(&self) -> &[NoteMeta] {
        &self.metas
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, id: SubscriberId, callback: F) -> bool
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.bus.subscribe(kind, id, callback)
    }

    #[inline(always)]
    pub fn song_time(&self) -> f32 {
        self.song_time
    }

    #[inline(always)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn start_playing(&mut self) {
        if !self.playing {
            info!("Level playing from {:.3}s.", self.song_time);
        }
        self.playing = true;
    }

    pub fn stop_playing(&mut self) {
        if self.playing {
            info!("Level stopped at {:.3}s.", self.song_time);
        }
        self.playing = false;
    }

    pub fn is_finished(&self) -> bool {
        self.lanes.iter().all(Lane::is_finished)
    }

    /// Runs every lane at `song_time`. Does nothing while stopped.
    pub fn tick(&mut self, song_time: f32, dt: f32) {
        if !self.playing {
            return;
        }
        self.song_time = song_time;
        let mut ctx = TickContext {
            pool: &mut self.pool,
            bus: &mut self.bus,
            judge: self.judge.as_mut(),
            metas: &self.metas,
        };
        for lane in &mut self.lanes {
            lane.tick(song_time, dt, &mut ctx);
        }
    }

    /// Moves the internal clock forward by `dt` and ticks.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        let next = self.song_time + dt;
        self.tick(next, dt);
    }

    fn lane_mut(&mut self, idx: usize) -> level_map::Result<&mut Lane> {
        self.lanes.get_mut(idx).ok_or(LevelError::LaneOutOfRange {
            lane: idx,
            lanes: NUM_LANES,
        })
    }

    pub fn press(&mut self, lane: usize) -> level_map::Result<()> {
        self.lane_mut(lane)?.press_button();
        Ok(())
    }

    pub fn release(&mut self, lane: usize) -> level_map::Result<()> {
        self.lane_mut(lane)?.release_button();
        Ok(())
    }

    pub fn set_move_speed(&mut self, move_speed: f32) -> level_map::Result<()> {
        // Negated form also rejects NaN.
        if !(move_speed > 0.0) {
            return Err(LevelError::InvalidSpeed {
                what: "move",
                value: move_speed,
            });
        }
        for lane in &mut self.lanes {
            lane.set_move_speed(move_speed);
        }
        Ok(())
    }

    pub fn set_game_speed(&mut self, game_speed: f32) -> level_map::Result<()> {
        if !(game_speed > 0.0) {
            return Err(LevelError::InvalidSpeed {
                what: "game",
                value: game_speed,
            });
        }
        for lane in &mut self.lanes {
            lane.set_game_speed(game_speed);
        }
        Ok(())
    }

    /// Resumes mid-song: rows at or before `t` are skipped.
    pub fn custom_start(&mut self, t: f32) {
        for lane in &mut self.lanes {
            lane.custom_start(t);
        }
        self.song_time = t;
        info!("Level resumes at {:.3}s.", t);
    }

    /// Back to the first row with nothing on the path. Subscriptions stay.
    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.reset(&mut self.pool);
        }
        self.playing = false;
        self.song_time = self.start_time;
        info!("Level reset.");
    }
}
