//! Variable-length hold notes.
//!
//! A hold note is modelled as a chain of cursors along the lane path instead of
//! a single stretch factor. Point 0 is the head, the points after it are body
//! joins and the last point is the tail. Only points up to `active_index` move;
//! once the frontier point has travelled its own `max_percentage` the next
//! point is released. While the player legitimately holds the note inside the
//! hit window every point is capped at the button, so the body piles up behind
//! it and the note appears to stretch.
use crate::game::note::{Note, NoteDistance};
use log::error;

#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct SplinePointMeta {
    /// How far along the path this point is: 0 is the start, 1 the end.
    pub percentage: f32,
    /// Once `percentage` reaches this value the next point starts moving.
    pub max_percentage: f32,
}

/// Physical lengths the chain is built from. All lengths share the path's units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoldGeometry {
    pub head_length: f32,
    pub tail_length: f32,
    pub unit_segment_length: f32,
    pub path_length: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChainLayout {
    pub total_length: f32,
    pub body_budget: f32,
    pub body_count: usize,
}

impl ChainLayout {
    pub fn new(total_length: f32, geometry: &HoldGeometry) -> Self {
        let body_budget =
            (total_length - geometry.head_length - geometry.tail_length).max(0.0);
        let body_count = if geometry.unit_segment_length > 0.0 {
            (body_budget / geometry.unit_segment_length).ceil() as usize
        } else {
            0
        };
        Self {
            total_length,
            body_budget,
            body_count,
        }
    }

    /// Head + body joins + tail.
    #[inline(always)]
    pub fn point_count(&self) -> usize {
        self.body_count + 2
    }
}

/// What the growth step needs to know about the lane this tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GrowthInput {
    pub tick_percentage: f32,
    pub ceiling: f32,
    pub held_in_button: bool,
    pub tolerance: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HoldChain {
    points: Vec<SplinePointMeta>,
    active_index: usize,
    tail_visible: bool,
    layout: ChainLayout,
}

impl HoldChain {
    pub fn build(total_length: f32, geometry: &HoldGeometry) -> Self {
        debug_assert!(geometry.path_length > 0.0, "hold geometry needs a positive path length");
        let layout = ChainLayout::new(total_length, geometry);
        let last = layout.point_count() - 1;

        // An exact multiple leaves nothing for the last body point.
        let remainder = if layout.body_count > 0 {
            layout.body_budget % geometry.unit_segment_length
        } else {
            0.0
        };

        let points = (0..layout.point_count())
            .map(|i| {
                let length = if i == 0 {
                    geometry.head_length
                } else if i == last {
                    geometry.tail_length
                } else if i == layout.body_count {
                    remainder
                } else {
                    geometry.unit_segment_length
                };
                SplinePointMeta {
                    percentage: 0.0,
                    max_percentage: (length / geometry.path_length).min(1.0),
                }
            })
            .collect();

        Self {
            points,
            active_index: 0,
            tail_visible: false,
            layout,
        }
    }

    #[inline(always)]
    pub fn points(&self) -> &[SplinePointMeta] {
        &self.points
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline(always)]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    #[inline(always)]
    pub fn tail_visible(&self) -> bool {
        self.tail_visible
    }

    #[inline(always)]
    pub fn layout(&self) -> &ChainLayout {
        &self.layout
    }

    #[inline(always)]
    pub fn body_segments(&self) -> usize {
        self.layout.body_count
    }

    pub fn head_percentage(&self) -> f32 {
        self.points.first().map_or(0.0, |p| p.percentage)
    }

    pub fn tail_percentage(&self) -> f32 {
        self.points.last().map_or(0.0, |p| p.percentage)
    }

    /// Advances every released point, then the ratchet. Returns true when the
    /// tail became visible during this step.
    pub fn grow(&mut self, input: GrowthInput) -> bool {
        if self.points.is_empty() {
            return false;
        }
        let last = self.points.len() - 1;
        if self.active_index > last {
            error!(
                "Hold chain active index {} outside of {} points; clamping.",
                self.active_index,
                self.points.len()
            );
            debug_assert!(false, "hold chain active index out of bounds");
            self.active_index = last;
        }

        for point in self.points.iter_mut().take(self.active_index + 1) {
            point.percentage = (point.percentage + input.tick_percentage).min(input.ceiling);
        }

        let frontier = self.points[self.active_index];
        let reached_max = frontier.percentage >= frontier.max_percentage;
        let pinned_at_button = input.held_in_button
            && (frontier.percentage - input.ceiling).abs() <= input.tolerance;
        if self.active_index < last && (reached_max || pinned_at_button) {
            self.active_index += 1;
        }

        if !self.tail_visible && self.active_index == last {
            self.tail_visible = true;
            return true;
        }
        false
    }
}

/// Runs one growth step for a hold note and syncs its head, tail and
/// stationary flag with the chain.
pub fn grow_note(
    note: &mut Note,
    tick_percentage: f32,
    press_valid: bool,
    button_percentage: f32,
    tolerance: f32,
) {
    let in_button = note.state.location == NoteDistance::InButton;
    let held_in_button = in_button && press_valid;
    let ceiling = if held_in_button { button_percentage } else { 1.0 };

    let Some(chain) = note.chain.as_mut() else {
        return;
    };
    chain.grow(GrowthInput {
        tick_percentage,
        ceiling,
        held_in_button,
        tolerance,
    });

    note.head_path_percentage = chain.head_percentage();
    if chain.tail_visible() {
        note.tail_path_percentage = chain.tail_percentage();
    }

    if note.state.location == NoteDistance::PastButton && note.tail_path_percentage < ceiling {
        note.state.stationary = true;
    } else if note.tail_path_percentage >= ceiling {
        note.state.stationary = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::note::NoteType;

    fn geometry() -> HoldGeometry {
        HoldGeometry {
            head_length: 50.0,
            tail_length: 50.0,
            unit_segment_length: 100.0,
            path_length: 1000.0,
        }
    }

    fn free_growth(tick: f32) -> GrowthInput {
        GrowthInput {
            tick_percentage: tick,
            ceiling: 1.0,
            held_in_button: false,
            tolerance: 0.01,
        }
    }

    #[test]
    fn two_second_hold_builds_eleven_points() {
        // 500 units/s for 2s on a 1000 unit path.
        let chain = HoldChain::build(500.0 * 2.0, &geometry());
        let layout = chain.layout();
        assert_eq!(layout.total_length, 1000.0);
        assert_eq!(layout.body_budget, 900.0);
        assert_eq!(layout.body_count, 9);
        assert_eq!(chain.len(), 11);

        let pts = chain.points();
        assert!((pts[0].max_percentage - 0.05).abs() < 1e-6, "head cap");
        for (i, p) in pts.iter().enumerate().take(9).skip(1) {
            assert!(
                (p.max_percentage - 0.1).abs() < 1e-6,
                "body point {} should span one unit",
                i
            );
        }
        assert_eq!(pts[9].max_percentage, 0.0, "exact multiple leaves no remainder");
        assert!((pts[10].max_percentage - 0.05).abs() < 1e-6, "tail cap");
    }

    #[test]
    fn partial_last_segment_gets_the_remainder() {
        let chain = HoldChain::build(1030.0, &geometry());
        assert_eq!(chain.layout().body_count, 10);
        let pts = chain.points();
        assert!((pts[10].max_percentage - 0.03).abs() < 1e-5, "got {:?}", pts[10]);
        assert!((pts[11].max_percentage - 0.05).abs() < 1e-6);
    }

    #[test]
    fn zero_remainder_releases_the_tail_right_after_the_last_full_unit() {
        let mut chain = HoldChain::build(1000.0, &geometry());
        // Head plus eight full units: 0.05 + 8 * 0.1.
        let mut travelled = 0.0;
        while chain.active_index() < 9 {
            chain.grow(free_growth(0.005));
            travelled += 0.005;
            assert!(travelled < 1.0, "chain never reached the last body point");
        }
        assert!(!chain.tail_visible());
        chain.grow(free_growth(0.005));
        assert!(chain.tail_visible(), "a zero-length last body point frees the tail at once");
        assert!((0.849..0.9).contains(&travelled), "travelled {}", travelled);
    }

    #[test]
    fn short_hold_degenerates_to_head_and_tail() {
        let chain = HoldChain::build(60.0, &geometry());
        assert_eq!(chain.layout().body_budget, 0.0);
        assert_eq!(chain.layout().body_count, 0);
        assert_eq!(chain.len(), 2);

        let mut chain = chain;
        for _ in 0..200 {
            chain.grow(free_growth(0.01));
        }
        assert_eq!(chain.active_index(), 1);
        assert!(chain.tail_visible());
        assert_eq!(chain.tail_percentage(), 1.0);
    }

    #[test]
    fn max_percentages_are_clamped_to_the_path() {
        let geometry = HoldGeometry {
            head_length: 5000.0,
            tail_length: 50.0,
            unit_segment_length: 100.0,
            path_length: 1000.0,
        };
        let chain = HoldChain::build(100.0, &geometry);
        assert_eq!(chain.points()[0].max_percentage, 1.0);
    }

    #[test]
    fn ratchet_is_monotonic_and_bounded() {
        let mut chain = HoldChain::build(1000.0, &geometry());
        let mut last_active = 0;
        for step in 0..400 {
            let held = (100..160).contains(&step);
            chain.grow(GrowthInput {
                tick_percentage: 0.004,
                ceiling: if held { 0.5 } else { 1.0 },
                held_in_button: held,
                tolerance: 0.01,
            });
            assert!(
                chain.active_index() >= last_active,
                "ratchet moved backwards at step {}",
                step
            );
            assert!(chain.active_index() < chain.len());
            last_active = chain.active_index();
        }
        assert_eq!(chain.active_index(), chain.len() - 1);
    }

    #[test]
    fn held_growth_never_passes_the_button() {
        let mut chain = HoldChain::build(1000.0, &geometry());
        for _ in 0..500 {
            chain.grow(GrowthInput {
                tick_percentage: 0.01,
                ceiling: 0.5,
                held_in_button: true,
                tolerance: 0.01,
            });
            assert!(chain.points().iter().all(|p| p.percentage <= 0.5));
        }
    }

    #[test]
    fn grow_note_tracks_tail_and_stationary_flag() {
        let mut note = Note::new(NoteType::Hold);
        note.chain = Some(HoldChain::build(60.0, &geometry()));

        grow_note(&mut note, 0.02, false, 0.5, 0.01);
        assert!((note.head_path_percentage - 0.02).abs() < 1e-6);
        assert_eq!(note.tail_path_percentage, 0.0, "tail stays at the path start until visible");

        note.state.location = NoteDistance::PastButton;
        for _ in 0..3 {
            grow_note(&mut note, 0.02, false, 0.5, 0.01);
        }
        assert!(note.chain.as_ref().is_some_and(|c| c.tail_visible()));
        assert!(note.state.stationary, "tail has not caught up yet");

        for _ in 0..100 {
            grow_note(&mut note, 0.02, false, 0.5, 0.01);
        }
        assert_eq!(note.tail_path_percentage, 1.0);
        assert!(!note.state.stationary);
    }
}
