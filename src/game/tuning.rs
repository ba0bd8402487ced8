//! Gameplay tuning constants
//!
//! Everything the simulation balances on lives here so the server and the
//! client prediction layer agree on the exact same numbers.

/// Map width in world units
pub const MAP_WIDTH: f32 = 1600.0;
/// Map height in world units
pub const MAP_HEIGHT: f32 = 1200.0;

/// Adoption zone half-extent (zones are squares despite the name)
pub const ZONE_RADIUS: f32 = 120.0;

/// Size every shelter starts a match with
pub const INITIAL_SHELTER_SIZE: f32 = 3.0;

/// Base shelter footprint before size contributes
pub const SHELTER_BASE_RADIUS: f32 = 16.0;
/// Footprint gained per unit of size
pub const SHELTER_RADIUS_PER_SIZE: f32 = 2.0;
/// Stray hitbox radius
pub const STRAY_RADIUS: f32 = 12.0;
/// Pickup hitbox radius
pub const PICKUP_RADIUS: f32 = 14.0;

/// Movement speed in units/second below the big-shelter threshold
pub const BASE_SPEED: f32 = 180.0;
/// Movement speed in units/second at or above [`SPEED_SIZE_THRESHOLD`]
pub const BIG_SPEED: f32 = 220.0;
/// Size at which the higher flat speed unlocks
pub const SPEED_SIZE_THRESHOLD: f32 = 10.0;
/// Velocity multiplier while a speed boost is active
pub const SPEED_BOOST_MULT: f32 = 1.5;
/// Boost duration granted by a speed pickup, in ticks
pub const SPEED_BOOST_TICKS: u32 = 125;

/// Ticks between stray spawn waves
pub const STRAY_SPAWN_TICKS: u32 = 50;
/// Strays spawned per wave
pub const STRAY_SPAWN_COUNT: u32 = 3;
/// Ticks between pickup spawns
pub const PICKUP_SPAWN_TICKS: u32 = 125;
/// Probability a spawned pickup is growth rather than speed
pub const PICKUP_GROWTH_WEIGHT: f64 = 0.7;
/// Rejection-sampling attempts before a spawn cycle gives up
pub const SPAWN_ATTEMPTS: u32 = 50;
/// Permanent size granted by a growth pickup
pub const GROWTH_PICKUP_SIZE: f32 = 2.0;

/// Wire-format ceilings the spawners must never exceed
pub const MAX_STRAYS: usize = u16::MAX as usize;
pub const MAX_PICKUPS: usize = u8::MAX as usize;

/// Minimum effective rescue radius regardless of shelter size
pub const RESCUE_RADIUS_MIN: f32 = 70.0;

/// Size gained per completed adoption
pub const ADOPT_GROWTH_SIZE: f32 = 1.0;
/// Baseline ticks between adoptions for a fresh shelter
pub const ADOPT_BASE_INTERVAL_TICKS: f32 = 25.0;
/// Hard floor on the adoption interval
pub const ADOPT_MIN_INTERVAL_TICKS: f32 = 8.0;
/// Interval reduction per unit of size
pub const ADOPT_SIZE_FACTOR: f32 = 0.5;
/// Interval reduction per carried pet
pub const ADOPT_PET_FACTOR: f32 = 0.5;
/// Interval multiplier while grounded or auto-jumped
pub const ADOPT_STATIONARY_FACTOR: f32 = 0.6;
/// Interval multiplier for shelters with the fast-adopt boost
pub const FAST_ADOPT_FACTOR: f32 = 0.75;

/// Minimum size for a shelter to participate in combat
pub const COMBAT_MIN_SIZE: f32 = 3.0;
/// Size at or below which a shelter is eliminated
pub const ELIMINATION_SIZE: f32 = 1.0;
/// Overlap ticks granted before the first combat resolution
pub const COMBAT_GRACE_TICKS: u32 = 50;
/// Strength contribution per carried pet
pub const COMBAT_PET_WEIGHT: f32 = 0.5;
/// Win-probability shift per point of strength differential
pub const COMBAT_STRENGTH_WEIGHT: f32 = 0.02;
/// Combat jitter floor
pub const COMBAT_VARIANCE_BASE: f32 = 0.05;
/// Combat jitter gained per free stray on the map
pub const COMBAT_VARIANCE_PER_STRAY: f32 = 0.002;
/// Combat jitter ceiling
pub const COMBAT_VARIANCE_CAP: f32 = 0.25;
/// Final win-probability clamp
pub const COMBAT_PROB_MIN: f32 = 0.1;
pub const COMBAT_PROB_MAX: f32 = 0.9;

/// Size a lone survivor needs before domination ends the match early
pub const DOMINATION_MIN_SIZE: f32 = 60.0;

/// A shelter is grounded once its radius reaches this multiple of the zone radius
pub const GROUNDED_ZONE_RATIO: f32 = 1.5;
/// Adoption count that triggers the one-time auto-jump
pub const AUTO_JUMP_MILESTONE: u32 = 25;
/// Size below which an auto-jumped shelter becomes mobile again
pub const AUTO_JUMP_SIZE_FLOOR: f32 = 20.0;
/// Corner positions tried when random auto-jump sampling fails
pub const AUTO_JUMP_CORNERS: [(f32, f32); 3] = [(80.0, 80.0), (1520.0, 80.0), (80.0, 1120.0)];

/// Gravity pull reach as a multiple of the shelter radius
pub const GRAVITY_RADIUS_MULT: f32 = 3.0;
/// Pull applied per tick right after an auto-jump
pub const GRAVITY_PULL_AUTO_JUMP: f32 = 6.0;
/// Pull applied per tick in steady-state grounded mode
pub const GRAVITY_PULL_GROUNDED: f32 = 3.5;

/// Fixed match length in ticks (5 minutes at 25 Hz)
pub const MATCH_DURATION_TICKS: u32 = 7500;

/// Humans needed before an FFA lobby starts its countdown
pub const FFA_MIN_PLAYERS: usize = 2;
/// Hard cap on shelters per match, humans and bots combined
pub const MAX_PLAYERS_PER_MATCH: usize = 12;
/// Lobby countdown length in ticks (15 seconds)
pub const COUNTDOWN_TICKS: u32 = 375;
/// Ticks between matchState broadcasts outside the Playing phase
pub const MATCH_STATE_INTERVAL_TICKS: u32 = 25;
/// Bots added to a solo match
pub const SOLO_CPU_COUNT: usize = 3;

/// Distance jump that resets client prediction (teleports/auto-jumps)
pub const PREDICTION_SNAP_DISTANCE: f32 = 200.0;
/// Remote-entity interpolation window in milliseconds
pub const INTERP_WINDOW_MS: u64 = 100;

/// Input bit flags carried in the 4-byte input frame
pub const INPUT_UP: u16 = 0x01;
pub const INPUT_DOWN: u16 = 0x02;
pub const INPUT_LEFT: u16 = 0x04;
pub const INPUT_RIGHT: u16 = 0x08;

/// Id prefix that marks a shelter as CPU-controlled
pub const CPU_ID_PREFIX: &str = "cpu_";

/// Shelter collision/overlap half-extent derived from size
pub fn shelter_radius(size: f32) -> f32 {
    SHELTER_BASE_RADIUS + size * SHELTER_RADIUS_PER_SIZE
}

/// True once a shelter's footprint dwarfs the adoption zone
pub fn is_grounded_size(size: f32) -> bool {
    shelter_radius(size) >= ZONE_RADIUS * GROUNDED_ZONE_RATIO
}

/// Pets a shelter of the given size can carry
pub fn capacity(size: f32) -> usize {
    if size <= 0.0 {
        0
    } else {
        size.floor() as usize
    }
}
