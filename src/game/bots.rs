//! CPU shelter steering
//!
//! Bots run the same simulation path as humans; the only difference is
//! where their input flags come from. Priorities: deliver a full load to
//! the nearest zone, otherwise chase strays, otherwise pickups, otherwise
//! wander. Target picks are softened by choosing randomly among the three
//! nearest candidates so bots spread out instead of stacking.

use rand::Rng;

use crate::game::tuning::{
    INPUT_DOWN, INPUT_LEFT, INPUT_RIGHT, INPUT_UP, MAP_HEIGHT, MAP_WIDTH,
};

/// Axis deadzone so bots do not oscillate around a target
const STEER_DEADZONE: f32 = 4.0;
/// Distance at which a wander waypoint counts as reached
const WANDER_ARRIVE_RADIUS: f32 = 30.0;
/// Keep wander waypoints away from the map edge
const WANDER_MARGIN: f32 = 40.0;
/// Pick among this many nearest strays/pickups
const TARGET_CANDIDATES: usize = 3;

/// Everything a bot is allowed to see when deciding its input flags
pub struct BotView<'a> {
    pub x: f32,
    pub y: f32,
    /// Carried pets at capacity
    pub full: bool,
    /// Already overlapping an adoption zone
    pub touching_zone: bool,
    /// Zone squares as (x, y, radius)
    pub zones: &'a [(f32, f32, f32)],
    /// Free stray positions
    pub strays: &'a [(f32, f32)],
    pub pickups: &'a [(f32, f32)],
}

pub struct BotBrain;

impl BotBrain {
    /// Decide one tick's input flags for a CPU shelter.
    ///
    /// `wander` is the bot's persisted waypoint; it is only consulted and
    /// re-rolled when there is nothing better to chase.
    pub fn decide<R: Rng>(view: &BotView, wander: &mut Option<(f32, f32)>, rng: &mut R) -> u16 {
        if view.full {
            if view.touching_zone {
                return 0;
            }
            if let Some(target) = Self::nearest_zone_point(view) {
                return Self::steer_toward(view.x, view.y, target);
            }
            return 0;
        }

        if let Some(target) = Self::pick_candidate(view.x, view.y, view.strays, rng) {
            return Self::steer_toward(view.x, view.y, target);
        }
        if let Some(target) = Self::pick_candidate(view.x, view.y, view.pickups, rng) {
            return Self::steer_toward(view.x, view.y, target);
        }

        let target = match *wander {
            Some(t) if Self::distance_sq(view.x, view.y, t) > WANDER_ARRIVE_RADIUS.powi(2) => t,
            _ => {
                let t = (
                    rng.gen_range(WANDER_MARGIN..MAP_WIDTH - WANDER_MARGIN),
                    rng.gen_range(WANDER_MARGIN..MAP_HEIGHT - WANDER_MARGIN),
                );
                *wander = Some(t);
                t
            }
        };
        Self::steer_toward(view.x, view.y, target)
    }

    /// Closest point on any zone square to the bot
    fn nearest_zone_point(view: &BotView) -> Option<(f32, f32)> {
        view.zones
            .iter()
            .map(|&(zx, zy, zr)| {
                (
                    view.x.clamp(zx - zr, zx + zr),
                    view.y.clamp(zy - zr, zy + zr),
                )
            })
            .min_by(|a, b| {
                Self::distance_sq(view.x, view.y, *a)
                    .total_cmp(&Self::distance_sq(view.x, view.y, *b))
            })
    }

    /// Random pick among the nearest few candidates, None when empty
    fn pick_candidate<R: Rng>(
        x: f32,
        y: f32,
        candidates: &[(f32, f32)],
        rng: &mut R,
    ) -> Option<(f32, f32)> {
        if candidates.is_empty() {
            return None;
        }
        let mut ranked: Vec<(f32, f32)> = candidates.to_vec();
        ranked.sort_by(|a, b| {
            Self::distance_sq(x, y, *a).total_cmp(&Self::distance_sq(x, y, *b))
        });
        let pool = ranked.len().min(TARGET_CANDIDATES);
        Some(ranked[rng.gen_range(0..pool)])
    }

    fn steer_toward(x: f32, y: f32, (tx, ty): (f32, f32)) -> u16 {
        let mut flags = 0u16;
        if tx - x > STEER_DEADZONE {
            flags |= INPUT_RIGHT;
        } else if x - tx > STEER_DEADZONE {
            flags |= INPUT_LEFT;
        }
        if ty - y > STEER_DEADZONE {
            flags |= INPUT_DOWN;
        } else if y - ty > STEER_DEADZONE {
            flags |= INPUT_UP;
        }
        flags
    }

    fn distance_sq(x: f32, y: f32, (tx, ty): (f32, f32)) -> f32 {
        (tx - x) * (tx - x) + (ty - y) * (ty - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn view<'a>(
        x: f32,
        y: f32,
        full: bool,
        touching_zone: bool,
        zones: &'a [(f32, f32, f32)],
        strays: &'a [(f32, f32)],
        pickups: &'a [(f32, f32)],
    ) -> BotView<'a> {
        BotView {
            x,
            y,
            full,
            touching_zone,
            zones,
            strays,
            pickups,
        }
    }

    #[test]
    fn full_bot_on_zone_stops() {
        let zones = [(800.0, 600.0, 120.0)];
        let v = view(800.0, 600.0, true, true, &zones, &[], &[]);
        assert_eq!(BotBrain::decide(&v, &mut None, &mut rng()), 0);
    }

    #[test]
    fn full_bot_heads_for_zone_edge() {
        let zones = [(800.0, 600.0, 120.0)];
        // Due west of the zone at matching height: only RIGHT is needed
        let v = view(100.0, 600.0, true, false, &zones, &[(100.0, 100.0)], &[]);
        assert_eq!(BotBrain::decide(&v, &mut None, &mut rng()), INPUT_RIGHT);
    }

    #[test]
    fn hungry_bot_chases_a_nearby_stray() {
        let zones = [(800.0, 600.0, 120.0)];
        let strays = [(200.0, 100.0), (210.0, 100.0), (205.0, 95.0), (1500.0, 1100.0)];
        let v = view(100.0, 100.0, false, false, &zones, &strays, &[]);
        let flags = BotBrain::decide(&v, &mut None, &mut rng());
        // All three nearest candidates are east of the bot
        assert_ne!(flags & INPUT_RIGHT, 0);
        assert_eq!(flags & INPUT_LEFT, 0);
    }

    #[test]
    fn pickups_are_second_choice() {
        let zones = [(800.0, 600.0, 120.0)];
        let pickups = [(100.0, 500.0)];
        let v = view(100.0, 100.0, false, false, &zones, &[], &pickups);
        let flags = BotBrain::decide(&v, &mut None, &mut rng());
        assert_ne!(flags & INPUT_DOWN, 0);
    }

    #[test]
    fn wander_waypoint_persists_until_arrival() {
        let zones = [(800.0, 600.0, 120.0)];
        let v = view(100.0, 100.0, false, false, &zones, &[], &[]);
        let mut wander = None;
        let mut r = rng();

        let flags = BotBrain::decide(&v, &mut wander, &mut r);
        let first = wander.expect("waypoint rolled");
        assert_ne!(flags, 0);

        // Still far away: the waypoint must not change
        BotBrain::decide(&v, &mut wander, &mut r);
        assert_eq!(wander, Some(first));

        // Standing on the waypoint forces a re-roll
        let arrived = view(first.0, first.1, false, false, &zones, &[], &[]);
        BotBrain::decide(&arrived, &mut wander, &mut r);
        assert_ne!(wander, Some(first));
    }

    #[test]
    fn deadzone_suppresses_jitter() {
        let zones = [(800.0, 600.0, 120.0)];
        let strays = [(101.0, 99.0)];
        let v = view(100.0, 100.0, false, false, &zones, &strays, &[]);
        assert_eq!(BotBrain::decide(&v, &mut None, &mut rng()), 0);
    }
}
