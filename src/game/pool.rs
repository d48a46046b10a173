use crate::game::note::{Note, NoteType};
use log::{debug, warn};
use thiserror::Error;

/// Generation-checked reference to a pooled note.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NoteHandle {
    index: u32,
    generation: u32,
}

impl NoteHandle {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline(always)]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("note handle {index} is out of range (pool holds {len} slots)")]
    OutOfRange { index: usize, len: usize },

    #[error("note handle {index} is stale (generation {given}, slot is at {current})")]
    StaleHandle { index: usize, given: u32, current: u32 },

    #[error("note handle {index} was already returned to the pool")]
    DoubleReturn { index: usize },
}

// A slot is in use exactly while its note is active.
#[derive(Debug)]
struct Slot {
    generation: u32,
    note: Note,
}

/// Arena of preallocated notes with a free list per note kind.
#[derive(Debug, Default)]
pub struct NotePool {
    slots: Vec<Slot>,
    free: Vec<(NoteType, Vec<u32>)>,
}

const POOLED_KINDS: [NoteType; 5] = [
    NoteType::Single,
    NoteType::Hold,
    NoteType::Bomb,
    NoteType::Random,
    NoteType::Igc,
];

impl NotePool {
    /// Preallocates `per_kind` notes of every spawnable kind.
    pub fn with_capacity(per_kind: usize) -> Self {
        let mut pool = Self::default();
        for kind in POOLED_KINDS {
            pool.free.push((kind, Vec::with_capacity(per_kind)));
            for _ in 0..per_kind {
                let index = pool.push_slot(kind);
                pool.free_list(kind).push(index);
            }
        }
        debug!("Note pool preallocated {} slots.", pool.slots.len());
        pool
    }

    fn push_slot(&mut self, kind: NoteType) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            note: Note::new(kind),
        });
        index
    }

    fn free_list(&mut self, kind: NoteType) -> &mut Vec<u32> {
        if let Some(pos) = self.free.iter().position(|(k, _)| *k == kind) {
            &mut self.free[pos].1
        } else {
            self.free.push((kind, Vec::new()));
            let last = self.free.len() - 1;
            &mut self.free[last].1
        }
    }

    /// Hands out an inactive note of `kind`, growing the arena if every slot is taken.
    pub fn request(&mut self, kind: NoteType) -> NoteHandle {
        let popped = self.free_list(kind).pop();
        let index = match popped {
            Some(index) => index,
            None => {
                warn!("Note pool exhausted for {}; allocating another slot.", kind);
                self.push_slot(kind)
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.note.reset();
        slot.note.state.active = true;
        NoteHandle {
            index,
            generation: slot.generation,
        }
    }

    /// Returns a note to the pool. The handle and every copy of it become stale.
    pub fn release(&mut self, handle: NoteHandle) -> Result<(), PoolError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(PoolError::OutOfRange { index: handle.index(), len })?;
        // The last release bumped the generation by exactly one and nothing
        // has requested the slot since.
        let returned_already = slot.generation == handle.generation.wrapping_add(1);
        if !slot.note.state.active && returned_already {
            return Err(PoolError::DoubleReturn { index: handle.index() });
        }
        if slot.generation != handle.generation {
            return Err(PoolError::StaleHandle {
                index: handle.index(),
                given: handle.generation,
                current: slot.generation,
            });
        }
        if !slot.note.state.active {
            return Err(PoolError::DoubleReturn { index: handle.index() });
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.note.reset();
        let kind = slot.note.note_type;
        self.free_list(kind).push(handle.index);
        Ok(())
    }

    pub fn get(&self, handle: NoteHandle) -> Option<&Note> {
        self.slots
            .get(handle.index())
            .filter(|s| s.note.state.active && s.generation == handle.generation)
            .map(|s| &s.note)
    }

    pub fn get_mut(&mut self, handle: NoteHandle) -> Option<&mut Note> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.note.state.active && s.generation == handle.generation)
            .map(|s| &mut s.note)
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.note.state.active).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
