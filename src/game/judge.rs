use crate::game::note::Note;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    Pending,
    Hit,
    Miss,
}

/// Per-note hit bookkeeping the lane forwards input to.
pub trait NoteJudge {
    /// Called every tick the lane is held with a valid press over `note`.
    fn register_touch(&mut self, note: &mut Note, song_time: f32, dt: f32) -> Registration;
    /// Called every tick the lane is not held while a hold note is in bounds.
    fn register_not_held(&mut self, note: &mut Note, song_time: f32, dt: f32) -> Registration;
    fn touch_released(&mut self, note: &mut Note);
}

/// Simple notes hit on first touch; holds hit once they have been held for
/// `hit_ratio` of their duration and miss if let go after being touched.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoldTimeJudge {
    pub hit_ratio: f32,
}

impl Default for HoldTimeJudge {
    fn default() -> Self {
        Self { hit_ratio: 0.8 }
    }
}

impl NoteJudge for HoldTimeJudge {
    fn register_touch(&mut self, note: &mut Note, song_time: f32, dt: f32) -> Registration {
        note.touch.first_touch_at.get_or_insert(song_time);
        if !note.is_hold() {
            return Registration::Hit;
        }
        note.touch.released = false;
        note.touch.held_seconds += dt;
        let needed = note
            .hold_timing
            .map_or(0.0, |t| t.duration * self.hit_ratio);
        if note.touch.held_seconds >= needed {
            Registration::Hit
        } else {
            Registration::Pending
        }
    }

    fn register_not_held(&mut self, note: &mut Note, _song_time: f32, _dt: f32) -> Registration {
        if note.is_hold() && note.touch.first_touch_at.is_some() && note.touch.released {
            Registration::Miss
        } else {
            Registration::Pending
        }
    }

    fn touch_released(&mut self, note: &mut Note) {
        note.touch.released = true;
    }
}
