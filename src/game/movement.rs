//! Shelter movement and collision constraints
//!
//! Overlap tests are axis-aligned absolute-difference comparisons (squares,
//! not circles) everywhere: shelter-vs-shelter, shelter-vs-zone and
//! shelter-vs-pickup all share the same box test.

use crate::game::tuning::{
    shelter_radius, BASE_SPEED, BIG_SPEED, INPUT_DOWN, INPUT_LEFT, INPUT_RIGHT, INPUT_UP,
    MAP_HEIGHT, MAP_WIDTH, SPEED_BOOST_MULT, SPEED_SIZE_THRESHOLD,
};
use crate::util::time::tick_delta;

/// Movement rules shared by the server tick and the client predictor
pub struct MovementSystem;

impl MovementSystem {
    /// Unit direction vector from 4-directional input flags.
    /// Returns `None` when the flags cancel out or nothing is pressed.
    pub fn direction_from_flags(flags: u16) -> Option<(f32, f32)> {
        let mut dx = 0.0f32;
        let mut dy = 0.0f32;
        if flags & INPUT_UP != 0 {
            dy -= 1.0;
        }
        if flags & INPUT_DOWN != 0 {
            dy += 1.0;
        }
        if flags & INPUT_LEFT != 0 {
            dx -= 1.0;
        }
        if flags & INPUT_RIGHT != 0 {
            dx += 1.0;
        }

        let len = (dx * dx + dy * dy).sqrt();
        if len < f32::EPSILON {
            return None;
        }
        Some((dx / len, dy / len))
    }

    /// Movement speed in units/second for a shelter of the given size
    pub fn speed_for(size: f32, boosted: bool) -> f32 {
        let flat = if size >= SPEED_SIZE_THRESHOLD {
            BIG_SPEED
        } else {
            BASE_SPEED
        };
        if boosted {
            flat * SPEED_BOOST_MULT
        } else {
            flat
        }
    }

    /// Per-tick velocity from input flags (units per tick)
    pub fn velocity_from_input(flags: u16, size: f32, boosted: bool) -> (f32, f32) {
        match Self::direction_from_flags(flags) {
            Some((nx, ny)) => {
                let speed = Self::speed_for(size, boosted) * tick_delta();
                (nx * speed, ny * speed)
            }
            None => (0.0, 0.0),
        }
    }

    /// Clamp a position to the map, inset by the entity's radius
    pub fn clamp_to_map(x: f32, y: f32, radius: f32) -> (f32, f32) {
        (
            x.clamp(radius, MAP_WIDTH - radius),
            y.clamp(radius, MAP_HEIGHT - radius),
        )
    }

    /// Axis-aligned box overlap between two entities
    pub fn boxes_overlap(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
        let reach = r1 + r2;
        (x1 - x2).abs() < reach && (y1 - y2).abs() < reach
    }

    /// Overlap test between two shelters by size
    pub fn shelters_overlap(x1: f32, y1: f32, s1: f32, x2: f32, y2: f32, s2: f32) -> bool {
        Self::boxes_overlap(x1, y1, shelter_radius(s1), x2, y2, shelter_radius(s2))
    }

    /// Push the mover out of an overlapping neighbor along the axis of
    /// least penetration. Only the mover is corrected; the neighbor stays
    /// put, so resolution order across the player list matters.
    /// Returns the corrected mover position.
    pub fn resolve_overlap(
        mover_x: f32,
        mover_y: f32,
        mover_r: f32,
        other_x: f32,
        other_y: f32,
        other_r: f32,
    ) -> (f32, f32) {
        let reach = mover_r + other_r;
        let dx = mover_x - other_x;
        let dy = mover_y - other_y;
        let pen_x = reach - dx.abs();
        let pen_y = reach - dy.abs();

        if pen_x <= 0.0 || pen_y <= 0.0 {
            return (mover_x, mover_y);
        }

        if pen_x < pen_y {
            let sign = if dx >= 0.0 { 1.0 } else { -1.0 };
            (mover_x + sign * pen_x, mover_y)
        } else {
            let sign = if dy >= 0.0 { 1.0 } else { -1.0 };
            (mover_x, mover_y + sign * pen_y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const FRAC_1_SQRT_2: f32 = std::f32::consts::FRAC_1_SQRT_2;

    #[test]
    fn cardinal_directions() {
        assert_eq!(
            MovementSystem::direction_from_flags(INPUT_UP),
            Some((0.0, -1.0))
        );
        assert_eq!(
            MovementSystem::direction_from_flags(INPUT_RIGHT),
            Some((1.0, 0.0))
        );
    }

    #[test]
    fn diagonal_is_normalized() {
        let (nx, ny) = MovementSystem::direction_from_flags(INPUT_UP | INPUT_RIGHT).unwrap();
        assert_approx_eq!(nx, FRAC_1_SQRT_2, 1e-6);
        assert_approx_eq!(ny, -FRAC_1_SQRT_2, 1e-6);
    }

    #[test]
    fn opposing_flags_cancel() {
        assert_eq!(MovementSystem::direction_from_flags(INPUT_UP | INPUT_DOWN), None);
        assert_eq!(MovementSystem::direction_from_flags(0), None);
        // Unknown high bits are ignored, not rejected
        assert_eq!(MovementSystem::direction_from_flags(0xFF00), None);
    }

    #[test]
    fn speed_tiers_and_boost() {
        assert_eq!(MovementSystem::speed_for(3.0, false), BASE_SPEED);
        assert_eq!(MovementSystem::speed_for(10.0, false), BIG_SPEED);
        assert_eq!(
            MovementSystem::speed_for(3.0, true),
            BASE_SPEED * SPEED_BOOST_MULT
        );
    }

    #[test]
    fn map_clamp_insets_by_radius() {
        let (x, y) = MovementSystem::clamp_to_map(-50.0, 5000.0, 20.0);
        assert_eq!(x, 20.0);
        assert_eq!(y, MAP_HEIGHT - 20.0);
    }

    #[test]
    fn overlap_is_exclusive_at_touch() {
        assert!(!MovementSystem::boxes_overlap(0.0, 0.0, 10.0, 20.0, 0.0, 10.0));
        assert!(MovementSystem::boxes_overlap(0.0, 0.0, 10.0, 19.9, 0.0, 10.0));
    }

    #[test]
    fn resolution_picks_smaller_axis() {
        // Mover 5 right, 2 down of the other: x penetration (15) is smaller
        // than y penetration (18), so the mover slides out along x.
        let (x, y) = MovementSystem::resolve_overlap(105.0, 102.0, 10.0, 100.0, 100.0, 10.0);
        assert_approx_eq!(x, 120.0, 1e-4);
        assert_eq!(y, 102.0);
    }

    #[test]
    fn resolution_pushes_away_from_other_center() {
        // Mover left of the other gets pushed further left
        let (x, _) = MovementSystem::resolve_overlap(95.0, 100.0, 10.0, 100.0, 100.0, 10.0);
        assert!(x < 95.0);
    }

    #[test]
    fn resolution_noop_without_overlap() {
        let (x, y) = MovementSystem::resolve_overlap(0.0, 0.0, 5.0, 100.0, 100.0, 5.0);
        assert_eq!((x, y), (0.0, 0.0));
    }
}
