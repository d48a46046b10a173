use crate::color::{Rgba, WHITE};

/// Visual state of a lane's button ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ButtonParams {
    #[default]
    Inactive,
    Idle,
    NoteWithinBounds,
    NoteHit,
    NoteMiss,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputEdge {
    Press,
    Release,
}

/// Per-lane press bookkeeping. `valid` only ever goes false during a press
/// and is restored on release.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PressState {
    pub pressed: bool,
    pub valid: bool,
    pub first_frame: bool,
    pub press_length: f32,
}

impl Default for PressState {
    fn default() -> Self {
        Self {
            pressed: false,
            valid: true,
            first_frame: true,
            press_length: 0.0,
        }
    }
}

impl PressState {
    /// Marks the lane held for this tick. Returns true on the press edge.
    pub fn hold(&mut self, dt: f32) -> bool {
        self.pressed = true;
        let edge = self.first_frame;
        if edge {
            self.first_frame = false;
            self.press_length = 0.0;
        }
        self.press_length += dt;
        edge
    }

    #[inline(always)]
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn release(&mut self) {
        self.pressed = false;
        self.valid = true;
        self.first_frame = true;
    }

    #[inline(always)]
    pub fn held_valid(&self) -> bool {
        self.pressed && self.valid
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RingColors {
    pub idle: Rgba,
    pub hit: Rgba,
    pub miss: Rgba,
    /// Radius units per second while a new colour fills the ring.
    pub fill_rate: f32,
}

impl Default for RingColors {
    fn default() -> Self {
        Self {
            idle: WHITE,
            hit: [0.0, 1.0, 0.0, 1.0],
            miss: [1.0, 0.0, 0.0, 1.0],
            fill_rate: 3.0,
        }
    }
}

/// Ring fill animation. A switch puts the old colour behind and grows the new
/// one from the centre until it covers the ring.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RingState {
    last: ButtonParams,
    active_color: Rgba,
    back_color: Rgba,
    within_bounds_color: Rgba,
    radius: f32,
    filling: bool,
}

impl RingState {
    pub fn new(colors: &RingColors) -> Self {
        Self {
            last: ButtonParams::Inactive,
            active_color: colors.idle,
            back_color: colors.idle,
            within_bounds_color: WHITE,
            radius: 0.0,
            filling: false,
        }
    }

    pub fn state(&self) -> ButtonParams {
        self.last
    }

    pub fn active_color(&self) -> Rgba {
        self.active_color
    }

    pub fn back_color(&self) -> Rgba {
        self.back_color
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_within_bounds_color(&mut self, color: Rgba) {
        self.within_bounds_color = color;
    }

    /// Returns the new active colour when the state actually changed.
    pub fn switch(&mut self, params: ButtonParams, colors: &RingColors) -> Option<Rgba> {
        if params == self.last {
            return None;
        }
        self.last = params;
        let color = match params {
            ButtonParams::Inactive => return Some(self.active_color),
            ButtonParams::Idle => colors.idle,
            ButtonParams::NoteWithinBounds => self.within_bounds_color,
            ButtonParams::NoteHit => colors.hit,
            ButtonParams::NoteMiss => colors.miss,
        };
        self.back_color = self.active_color;
        self.active_color = color;
        self.radius = 0.0;
        self.filling = true;
        Some(color)
    }

    pub fn animate(&mut self, dt: f32, fill_rate: f32) {
        if !self.filling {
            return;
        }
        self.radius += dt * fill_rate;
        if self.radius >= 1.0 {
            self.back_color = self.active_color;
            self.radius = 0.0;
            self.filling = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_fires_once_per_press() {
        let mut press = PressState::default();
        assert!(press.hold(0.01));
        assert!(!press.hold(0.01));
        press.invalidate();
        assert!(!press.held_valid());
        assert!((press.press_length - 0.02).abs() < 1e-6);

        press.release();
        assert!(press.valid, "release restores validity for the next press");
        assert!(press.hold(0.01));
        assert!((press.press_length - 0.01).abs() < 1e-6, "length restarts per press");
    }

    #[test]
    fn ring_only_reports_real_changes() {
        let colors = RingColors::default();
        let mut ring = RingState::new(&colors);
        assert_eq!(ring.switch(ButtonParams::Idle, &colors), Some(colors.idle));
        assert_eq!(ring.switch(ButtonParams::Idle, &colors), None);
        ring.set_within_bounds_color([0.2, 0.4, 0.6, 1.0]);
        assert_eq!(
            ring.switch(ButtonParams::NoteWithinBounds, &colors),
            Some([0.2, 0.4, 0.6, 1.0])
        );
        assert_eq!(ring.state(), ButtonParams::NoteWithinBounds);
    }

    #[test]
    fn ring_fill_completes_and_stops() {
        let colors = RingColors::default();
        let mut ring = RingState::new(&colors);
        ring.switch(ButtonParams::NoteMiss, &colors);
        ring.animate(0.2, colors.fill_rate);
        assert!((ring.radius() - 0.6).abs() < 1e-5);
        assert_eq!(ring.back_color(), colors.idle);
        ring.animate(0.2, colors.fill_rate);
        assert_eq!(ring.radius(), 0.0);
        assert_eq!(ring.back_color(), colors.miss, "filled colour moves behind");
        ring.animate(0.2, colors.fill_rate);
        assert_eq!(ring.radius(), 0.0, "animation stays stopped");
    }
}
