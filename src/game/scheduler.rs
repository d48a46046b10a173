use crate::game::level_map::{self, HoldEntry, LevelMap};
use crate::game::note::NoteType;
use log::{debug, error};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;

/// Odds for swapping a SINGLE note for a special. A frequency of `F` gives
/// roughly 1 in `F + 1`; 0 turns the check off.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct SpecialSpawn {
    pub bombs_enabled: bool,
    pub bomb_freq: u32,
    pub igc_freq: u32,
    pub rand_freq: u32,
}

#[inline(always)]
fn roll<R: Rng + ?Sized>(rng: &mut R, freq: u32) -> bool {
    freq > 0 && rng.random_range(0..=freq) == 0
}

/// Applies special substitution to a map marker. Checks run bomb, igc, rand
/// in that order and a later hit overrides an earlier one.
pub fn substitute<R: Rng + ?Sized>(
    note_type: NoteType,
    specials: &SpecialSpawn,
    rng: &mut R,
) -> NoteType {
    if note_type != NoteType::Single {
        return note_type;
    }
    let mut resolved = note_type;
    if specials.bombs_enabled && roll(rng, specials.bomb_freq) {
        resolved = NoteType::Bomb;
    }
    if roll(rng, specials.igc_freq) {
        resolved = NoteType::Igc;
    }
    if roll(rng, specials.rand_freq) {
        resolved = NoteType::Random;
    }
    resolved
}

/// Derives a lane's RNG seed so lanes never share a draw sequence.
pub fn lane_seed(base: u64, lane: usize) -> u64 {
    base ^ (lane as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Marker read from the map, before substitution.
    pub marker: NoteType,
    /// Pooled note kind to activate.
    pub kind: NoteType,
    pub time: f32,
    pub hold: Option<HoldEntry>,
}

pub struct LaneScheduler {
    lane: usize,
    map: Arc<LevelMap>,
    holds: Vec<HoldEntry>,
    note_index: usize,
    hold_note_index: usize,
    specials: SpecialSpawn,
    seed: Option<u64>,
    rng: Box<dyn RngCore>,
}

impl LaneScheduler {
    pub fn new(
        lane: usize,
        map: Arc<LevelMap>,
        specials: SpecialSpawn,
        seed: u64,
    ) -> level_map::Result<Self> {
        let seed = lane_seed(seed, lane);
        let rng = Box::new(StdRng::seed_from_u64(seed));
        let mut scheduler = Self::with_rng(lane, map, specials, rng)?;
        scheduler.seed = Some(seed);
        Ok(scheduler)
    }

    /// Uses an injected RNG. `reset` leaves such an RNG untouched.
    pub fn with_rng(
        lane: usize,
        map: Arc<LevelMap>,
        specials: SpecialSpawn,
        rng: Box<dyn RngCore>,
    ) -> level_map::Result<Self> {
        let holds = map.hold_table(lane)?.to_vec();
        Ok(Self {
            lane,
            map,
            holds,
            note_index: 0,
            hold_note_index: 0,
            specials,
            seed: None,
            rng,
        })
    }

    #[inline(always)]
    pub fn note_index(&self) -> usize {
        self.note_index
    }

    #[inline(always)]
    pub fn hold_note_index(&self) -> usize {
        self.hold_note_index
    }

    pub fn is_finished(&self) -> bool {
        self.note_index >= self.map.len()
    }

    pub fn specials(&self) -> &SpecialSpawn {
        &self.specials
    }

    /// Returns the next note due at `song_time`, skipping continuation
    /// markers. `None` once nothing else is due this tick.
    pub fn next_spawn(&mut self, song_time: f32, spawn_time_offset: f32) -> Option<SpawnRequest> {
        while let Some(row) = self.map.rows().get(self.note_index) {
            if row.time - spawn_time_offset > song_time {
                return None;
            }
            self.note_index += 1;

            let marker = row.lane_types[self.lane];
            if marker.is_continuation() {
                continue;
            }
            let resolved = substitute(marker, &self.specials, &mut *self.rng);
            let Some(kind) = resolved.pooled_kind() else {
                continue;
            };

            let hold = if marker == NoteType::BegHold {
                let entry = self.holds.get(self.hold_note_index).copied();
                if entry.is_none() {
                    error!(
                        "Lane {}: BEG_HOLD at {:.3}s has no hold table entry {}.",
                        self.lane, row.time, self.hold_note_index
                    );
                }
                self.hold_note_index += 1;
                entry
            } else {
                None
            };

            if resolved != marker {
                debug!("Lane {}: {} at {:.3}s became {}.", self.lane, marker, row.time, resolved);
            }
            return Some(SpawnRequest {
                marker,
                kind,
                time: row.time,
                hold,
            });
        }
        None
    }

    /// Skips everything at or before `t`.
    pub fn custom_start(&mut self, t: f32) {
        self.note_index = self.map.rows().partition_point(|r| r.time <= t);
        self.hold_note_index = self.holds.partition_point(|h| h.start_time <= t);
    }

    pub fn reset(&mut self) {
        self.note_index = 0;
        self.hold_note_index = 0;
        if let Some(seed) = self.seed {
            self.rng = Box::new(StdRng::seed_from_u64(seed));
        }
    }
}
