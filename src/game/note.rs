use crate::game::hold::HoldChain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteType {
    Empty,
    Single,
    BegHold,
    Hold,
    EndHold,
    Swipe,
    Bomb,
    Random,
    Igc,
}

impl NoteType {
    /// Map-only markers that never spawn anything on their own row.
    #[inline(always)]
    pub const fn is_continuation(self) -> bool {
        matches!(self, NoteType::Empty | NoteType::Hold | NoteType::EndHold)
    }

    /// The kind of pooled note a spawn marker asks for.
    pub const fn pooled_kind(self) -> Option<NoteType> {
        match self {
            NoteType::Single | NoteType::Swipe => Some(NoteType::Single),
            NoteType::BegHold => Some(NoteType::Hold),
            NoteType::Bomb => Some(NoteType::Bomb),
            NoteType::Random => Some(NoteType::Random),
            NoteType::Igc => Some(NoteType::Igc),
            NoteType::Empty | NoteType::Hold | NoteType::EndHold => None,
        }
    }

    pub const fn as_chart_char(self) -> char {
        match self {
            NoteType::Empty => '0',
            NoteType::Single => '1',
            NoteType::BegHold => '2',
            NoteType::Hold => 'H',
            NoteType::EndHold => '3',
            NoteType::Swipe => 'S',
            NoteType::Bomb => 'B',
            NoteType::Random => 'R',
            NoteType::Igc => 'I',
        }
    }

    pub const fn from_chart_char(c: u8) -> Option<NoteType> {
        match c {
            b'0' | b'.' => Some(NoteType::Empty),
            b'1' => Some(NoteType::Single),
            b'2' => Some(NoteType::BegHold),
            b'H' | b'h' => Some(NoteType::Hold),
            b'3' => Some(NoteType::EndHold),
            b'S' | b's' => Some(NoteType::Swipe),
            b'B' | b'b' => Some(NoteType::Bomb),
            b'R' | b'r' => Some(NoteType::Random),
            b'I' | b'i' => Some(NoteType::Igc),
            _ => None,
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoteType::Empty => "EMPTY",
            NoteType::Single => "SINGLE",
            NoteType::BegHold => "BEG_HOLD",
            NoteType::Hold => "HOLD",
            NoteType::EndHold => "END_HOLD",
            NoteType::Swipe => "SWIPE",
            NoteType::Bomb => "BOMB",
            NoteType::Random => "RANDOM",
            NoteType::Igc => "IGC",
        };
        f.write_str(s)
    }
}

impl FromStr for NoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMPTY" => Ok(NoteType::Empty),
            "SINGLE" => Ok(NoteType::Single),
            "BEG_HOLD" => Ok(NoteType::BegHold),
            "HOLD" => Ok(NoteType::Hold),
            "END_HOLD" => Ok(NoteType::EndHold),
            "SWIPE" => Ok(NoteType::Swipe),
            "BOMB" => Ok(NoteType::Bomb),
            "RANDOM" => Ok(NoteType::Random),
            "IGC" => Ok(NoteType::Igc),
            other => Err(format!("Unknown note type '{}'", other)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum NoteDistance {
    #[default]
    InLane,
    InButton,
    PastButton,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct NoteState {
    pub location: NoteDistance,
    pub active: bool,
    pub stationary: bool,
    pub to_be_deactivated: bool,
    pub ignores_miss: bool,
}

/// Held-time bookkeeping read and written by the registration contract.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct TouchRecord {
    pub held_seconds: f32,
    pub first_touch_at: Option<f32>,
    pub released: bool,
}

/// Duration data attached to a hold note at activation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoldTiming {
    pub start_time: f32,
    pub duration: f32,
}

impl HoldTiming {
    #[inline(always)]
    pub fn end_time(&self) -> f32 {
        self.start_time + self.duration
    }
}

#[derive(Clone, Debug)]
pub struct Note {
    pub note_type: NoteType,
    pub state: NoteState,
    pub root_path_percentage: f32,
    pub head_path_percentage: f32,
    pub tail_path_percentage: f32,
    /// Head offset from the root for notes with a constant rendered length.
    pub head_offset: f32,
    pub particle_color: [f32; 4],
    pub touch: TouchRecord,
    pub hold_timing: Option<HoldTiming>,
    pub chain: Option<HoldChain>,
}

impl Note {
    pub fn new(note_type: NoteType) -> Self {
        Self {
            note_type,
            state: NoteState::default(),
            root_path_percentage: 0.0,
            head_path_percentage: 0.0,
            tail_path_percentage: 0.0,
            head_offset: 0.0,
            particle_color: [1.0; 4],
            touch: TouchRecord::default(),
            hold_timing: None,
            chain: None,
        }
    }

    #[inline(always)]
    pub fn is_hold(&self) -> bool {
        self.note_type == NoteType::Hold
    }

    /// Puts the note back into its pooled, inactive shape.
    pub fn reset(&mut self) {
        let note_type = self.note_type;
        *self = Note::new(note_type);
    }

    /// Advances the root anchor and derives head/tail for constant-length notes.
    /// Hold notes only move their root here; the growth engine owns head and tail.
    pub fn move_tick(&mut self, tick_percentage: f32) {
        self.root_path_percentage = (self.root_path_percentage + tick_percentage).min(1.0);
        if self.chain.is_none() {
            self.tail_path_percentage = self.root_path_percentage;
            self.head_path_percentage = (self.root_path_percentage + self.head_offset).min(1.0);
        }
    }

    /// Runs the forward-only location machine. Returns true exactly when this
    /// call moved the note into `PastButton`.
    pub fn update_distance(&mut self, boundary_start: f32, boundary_end: f32) -> bool {
        let before = self.state.location;
        if self.state.location == NoteDistance::InLane
            && self.head_path_percentage >= boundary_start
        {
            self.state.location = NoteDistance::InButton;
        }
        if self.state.location == NoteDistance::InButton
            && self.tail_path_percentage >= boundary_end
        {
            self.state.location = NoteDistance::PastButton;
        }
        before != NoteDistance::PastButton && self.state.location == NoteDistance::PastButton
    }
}
