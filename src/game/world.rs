//! Authoritative world state and the fixed-timestep tick
//!
//! `tick_world` advances exactly one 1/25 s step through a fixed stage
//! order: spawning, movement, combat, domination check, gravity, pickups,
//! rescue, adoption, carried-stray sync. Each stage sees the output of the
//! previous one. Everything here is synchronous and single-threaded; the
//! orchestrator owns the clock and the lock.

use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::game::bots::{BotBrain, BotView};
use crate::game::combat::{AllyBook, CombatSystem, PairKey};
use crate::game::movement::MovementSystem;
use crate::game::tuning::*;
use crate::protocol::codec::PickupKind;
use crate::protocol::messages::FightAllyChoice;

/// Scatter applied to pets ejected from a drained shelter
const EJECT_SCATTER: f32 = 40.0;

/// A player-controlled (or CPU-controlled) shelter van
#[derive(Debug, Clone)]
pub struct Shelter {
    pub id: String,
    pub display_name: String,
    pub x: f32,
    pub y: f32,
    /// Velocity in units per tick, informational for clients
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub total_adoptions: u32,
    /// Carried stray ids, oldest first; adoption pops the front
    pub pets_inside: Vec<String>,
    /// Tick deadline; boosted while `tick < speed_boost_until`
    pub speed_boost_until: u32,
    /// Last acknowledged input sequence, wire width
    pub input_seq: u8,
    pub last_input_flags: u16,
    pub eliminated: bool,
    pub auto_jumped: bool,
    pub fast_adopt: bool,
    pub last_adopt_tick: u32,
}

impl Shelter {
    fn new(id: &str, display_name: &str, x: f32, y: f32, tick: u32) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            size: INITIAL_SHELTER_SIZE,
            total_adoptions: 0,
            pets_inside: Vec::new(),
            speed_boost_until: 0,
            input_seq: 0,
            last_input_flags: 0,
            eliminated: false,
            auto_jumped: false,
            fast_adopt: false,
            last_adopt_tick: tick,
        }
    }

    pub fn radius(&self) -> f32 {
        shelter_radius(self.size)
    }

    pub fn grounded(&self) -> bool {
        is_grounded_size(self.size)
    }

    /// Stationary shelters ignore input, adopt in place and pull strays.
    /// Auto-jumped shelters stay stationary only while big enough; combat
    /// can drain one back into mobility.
    pub fn stationary(&self) -> bool {
        self.grounded() || (self.auto_jumped && self.size >= AUTO_JUMP_SIZE_FLOOR)
    }

    pub fn capacity(&self) -> usize {
        capacity(self.size)
    }

    pub fn full(&self) -> bool {
        self.pets_inside.len() >= self.capacity()
    }

    pub fn boosted(&self, tick: u32) -> bool {
        self.speed_boost_until > tick
    }

    /// Ticks between adoptions. Shrinks with size and carried pets, floors
    /// at the minimum, then stationary and fast-adopt multipliers apply.
    pub fn adoption_interval_ticks(&self) -> f32 {
        let base = (ADOPT_BASE_INTERVAL_TICKS
            - self.size * ADOPT_SIZE_FACTOR
            - self.pets_inside.len() as f32 * ADOPT_PET_FACTOR)
            .clamp(ADOPT_MIN_INTERVAL_TICKS, ADOPT_BASE_INTERVAL_TICKS);
        let mut interval = base;
        if self.stationary() {
            interval *= ADOPT_STATIONARY_FACTOR;
        }
        if self.fast_adopt {
            interval *= FAST_ADOPT_FACTOR;
        }
        interval
    }
}

/// A roaming stray; carried exclusively by at most one shelter
#[derive(Debug, Clone)]
pub struct Stray {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub inside_shelter_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub kind: PickupKind,
}

/// Square drop-off region; overlap tests are absolute-difference boxes
#[derive(Debug, Clone)]
pub struct AdoptionZone {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// One-time perks granted at join (store/meta progression hooks)
#[derive(Debug, Clone, Copy, Default)]
pub struct StartingBoosts {
    pub size_bonus: f32,
    pub fast_adopt: bool,
    pub speed_boost_ticks: u32,
}

/// Final standings entry for the match-end summary
#[derive(Debug, Clone)]
pub struct Placement {
    pub id: String,
    pub display_name: String,
    pub size: f32,
    pub total_adoptions: u32,
    pub eliminated: bool,
}

pub struct World {
    pub tick: u32,
    /// Tick at which the simulation freezes; 0 until `start`
    pub match_end_at: u32,
    started: bool,
    /// The roster has at some point held more than one shelter; domination
    /// never triggers in a world that was always single-player
    ever_contested: bool,
    pub players: HashMap<String, Shelter>,
    /// Join order; movement, combat pairing and gravity iterate this
    roster: Vec<String>,
    pub strays: HashMap<String, Stray>,
    pub pickups: HashMap<String, Pickup>,
    pub zones: Vec<AdoptionZone>,
    ally_book: AllyBook,
    /// Ticks of continuous overlap per engaged pair
    pair_counters: HashMap<PairKey, u32>,
    bot_wander: HashMap<String, Option<(f32, f32)>>,
    rng: ChaCha8Rng,
    next_entity_id: u64,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            tick: 0,
            match_end_at: 0,
            started: false,
            ever_contested: false,
            players: HashMap::new(),
            roster: Vec::new(),
            strays: HashMap::new(),
            pickups: HashMap::new(),
            zones: vec![AdoptionZone {
                id: "z_0".to_string(),
                x: MAP_WIDTH / 2.0,
                y: MAP_HEIGHT / 2.0,
                radius: ZONE_RADIUS,
            }],
            ally_book: AllyBook::default(),
            pair_counters: HashMap::new(),
            bot_wander: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_entity_id: 0,
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// Frozen: the final tick has been simulated
    pub fn is_over(&self) -> bool {
        self.started && self.tick >= self.match_end_at
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Begin simulating; stocks the map and arms the match deadline
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.match_end_at = self.tick + MATCH_DURATION_TICKS;
        self.spawn_stray_wave();
        self.spawn_pickup();
    }

    pub fn add_player(&mut self, id: &str, display_name: &str) {
        let radius = shelter_radius(INITIAL_SHELTER_SIZE);
        let (x, y) = self
            .random_off_zone_position(radius)
            .unwrap_or(AUTO_JUMP_CORNERS[0]);
        self.players
            .insert(id.to_string(), Shelter::new(id, display_name, x, y, self.tick));
        self.roster.push(id.to_string());
        if self.roster.len() > 1 {
            self.ever_contested = true;
        }
        debug!(shelter = %id, x, y, "shelter joined the world");
    }

    /// Add a CPU shelter; returns its id
    pub fn add_cpu_player(&mut self, index: usize) -> String {
        let id = format!("{}{}", CPU_ID_PREFIX, index + 1);
        let name = format!("CPU {}", index + 1);
        self.add_player(&id, &name);
        self.bot_wander.insert(id.clone(), None);
        id
    }

    /// Remove a shelter and free everything it carried
    pub fn remove_player(&mut self, id: &str) {
        if let Some(shelter) = self.players.remove(id) {
            for pet_id in shelter.pets_inside {
                if let Some(stray) = self.strays.get_mut(&pet_id) {
                    stray.inside_shelter_id = None;
                    stray.vx = 0.0;
                    stray.vy = 0.0;
                }
            }
        }
        self.roster.retain(|r| r != id);
        self.ally_book.forget(id);
        self.pair_counters.retain(|key, _| !key.contains(id));
        self.bot_wander.remove(id);
    }

    /// Last-write-wins input buffer; no sequence comparison
    pub fn set_input(&mut self, id: &str, flags: u16, seq: u8) {
        if let Some(shelter) = self.players.get_mut(id) {
            shelter.last_input_flags = flags;
            shelter.input_seq = seq;
        }
    }

    pub fn apply_starting_boosts(&mut self, id: &str, boosts: StartingBoosts) {
        if let Some(shelter) = self.players.get_mut(id) {
            shelter.size += boosts.size_bonus;
            shelter.fast_adopt = boosts.fast_adopt;
            if boosts.speed_boost_ticks > 0 {
                shelter.speed_boost_until = self.tick + boosts.speed_boost_ticks;
            }
        }
    }

    pub fn set_fight_ally(&mut self, chooser: &str, target: &str, choice: FightAllyChoice) {
        if self.players.contains_key(chooser) && self.players.contains_key(target) {
            self.ally_book.set(chooser, target, choice);
        }
    }

    /// Standings sorted by size, then adoptions
    pub fn placements(&self) -> Vec<Placement> {
        let mut out: Vec<Placement> = self
            .players
            .values()
            .map(|s| Placement {
                id: s.id.clone(),
                display_name: s.display_name.clone(),
                size: s.size,
                total_adoptions: s.total_adoptions,
                eliminated: s.eliminated,
            })
            .collect();
        out.sort_by(|a, b| {
            b.size
                .total_cmp(&a.size)
                .then(b.total_adoptions.cmp(&a.total_adoptions))
        });
        out
    }

    /// Advance the simulation by one fixed timestep
    pub fn tick_world(&mut self) {
        if !self.started || self.tick >= self.match_end_at {
            return;
        }
        self.tick += 1;

        self.spawn_entities();
        self.apply_movement();
        self.resolve_combat();
        self.check_domination();
        self.apply_gravity();
        self.collect_pickups();
        self.rescue_strays();
        self.process_adoptions();
        self.sync_carried_strays();
    }

    fn spawn_entities(&mut self) {
        if self.tick % STRAY_SPAWN_TICKS == 0 {
            self.spawn_stray_wave();
        }
        if self.tick % PICKUP_SPAWN_TICKS == 0 {
            self.spawn_pickup();
        }
    }

    fn spawn_stray_wave(&mut self) {
        for _ in 0..STRAY_SPAWN_COUNT {
            if self.strays.len() >= MAX_STRAYS {
                return;
            }
            if let Some((x, y)) = self.random_off_zone_position(STRAY_RADIUS) {
                let id = self.next_id("s");
                self.strays.insert(
                    id.clone(),
                    Stray {
                        id,
                        x,
                        y,
                        vx: 0.0,
                        vy: 0.0,
                        inside_shelter_id: None,
                    },
                );
            }
        }
    }

    fn spawn_pickup(&mut self) {
        if self.pickups.len() >= MAX_PICKUPS {
            return;
        }
        if let Some((x, y)) = self.random_off_zone_position(PICKUP_RADIUS) {
            let kind = if self.rng.gen_bool(PICKUP_GROWTH_WEIGHT) {
                PickupKind::Growth
            } else {
                PickupKind::Speed
            };
            let id = self.next_id("k");
            self.pickups.insert(id.clone(), Pickup { id, x, y, kind });
        }
    }

    /// Rejection-sample a map position outside every zone; None when all
    /// attempts collide (the caller skips the spawn silently)
    fn random_off_zone_position(&mut self, radius: f32) -> Option<(f32, f32)> {
        for _ in 0..SPAWN_ATTEMPTS {
            let x = self.rng.gen_range(radius..MAP_WIDTH - radius);
            let y = self.rng.gen_range(radius..MAP_HEIGHT - radius);
            let clear = !self
                .zones
                .iter()
                .any(|z| MovementSystem::boxes_overlap(x, y, radius, z.x, z.y, z.radius));
            if clear {
                return Some((x, y));
            }
        }
        None
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_entity_id += 1;
        format!("{}_{}", prefix, self.next_entity_id)
    }

    fn apply_movement(&mut self) {
        let order = self.roster.clone();
        let zone_boxes: Vec<(f32, f32, f32)> =
            self.zones.iter().map(|z| (z.x, z.y, z.radius)).collect();
        let free_strays: Vec<(f32, f32)> = self
            .strays
            .values()
            .filter(|s| s.inside_shelter_id.is_none())
            .map(|s| (s.x, s.y))
            .collect();
        let pickup_spots: Vec<(f32, f32)> =
            self.pickups.values().map(|p| (p.x, p.y)).collect();

        for id in &order {
            let Some(shelter) = self.players.get(id) else {
                continue;
            };
            if shelter.eliminated {
                continue;
            }
            if shelter.stationary() {
                if let Some(s) = self.players.get_mut(id) {
                    s.vx = 0.0;
                    s.vy = 0.0;
                }
                continue;
            }

            let flags = if id.starts_with(CPU_ID_PREFIX) {
                let view = BotView {
                    x: shelter.x,
                    y: shelter.y,
                    full: shelter.full(),
                    touching_zone: zone_boxes.iter().any(|&(zx, zy, zr)| {
                        MovementSystem::boxes_overlap(
                            shelter.x,
                            shelter.y,
                            shelter.radius(),
                            zx,
                            zy,
                            zr,
                        )
                    }),
                    zones: &zone_boxes,
                    strays: &free_strays,
                    pickups: &pickup_spots,
                };
                let wander = self.bot_wander.entry(id.clone()).or_insert(None);
                BotBrain::decide(&view, wander, &mut self.rng)
            } else {
                shelter.last_input_flags
            };

            let Some(shelter) = self.players.get(id) else {
                continue;
            };
            let radius = shelter.radius();
            let (vx, vy) =
                MovementSystem::velocity_from_input(flags, shelter.size, shelter.boosted(self.tick));
            let (mut nx, mut ny) =
                MovementSystem::clamp_to_map(shelter.x + vx, shelter.y + vy, radius);

            // Single pass over the others in roster order; earlier movers
            // have already settled, later ones still hold last tick's spot
            let others: Vec<(f32, f32, f32)> = order
                .iter()
                .filter(|oid| oid.as_str() != id)
                .filter_map(|oid| self.players.get(oid))
                .filter(|o| !o.eliminated && !self.ally_book.mutually_allied(id, &o.id))
                .map(|o| (o.x, o.y, o.radius()))
                .collect();
            for &(ox, oy, orad) in &others {
                let (rx, ry) = MovementSystem::resolve_overlap(nx, ny, radius, ox, oy, orad);
                nx = rx;
                ny = ry;
            }
            let (nx, ny) = MovementSystem::clamp_to_map(nx, ny, radius);

            if let Some(s) = self.players.get_mut(id) {
                s.x = nx;
                s.y = ny;
                s.vx = vx;
                s.vy = vy;
            }
        }
    }

    fn resolve_combat(&mut self) {
        let order = self.roster.clone();
        let mut engaged: Vec<(String, String)> = Vec::new();
        for i in 0..order.len() {
            for j in (i + 1)..order.len() {
                let (Some(a), Some(b)) = (self.players.get(&order[i]), self.players.get(&order[j]))
                else {
                    continue;
                };
                if a.eliminated || b.eliminated {
                    continue;
                }
                if a.size < COMBAT_MIN_SIZE || b.size < COMBAT_MIN_SIZE {
                    continue;
                }
                if !MovementSystem::shelters_overlap(a.x, a.y, a.size, b.x, b.y, b.size) {
                    continue;
                }
                if self.ally_book.mutually_allied(&a.id, &b.id) {
                    continue;
                }
                engaged.push((order[i].clone(), order[j].clone()));
            }
        }

        // Disengaged pairs lose their counters; re-engaging restarts grace
        let engaged_keys: HashSet<PairKey> =
            engaged.iter().map(|(a, b)| PairKey::new(a, b)).collect();
        self.pair_counters.retain(|key, _| engaged_keys.contains(key));

        let free_strays = self
            .strays
            .values()
            .filter(|s| s.inside_shelter_id.is_none())
            .count();

        for (a_id, b_id) in engaged {
            let counter = self
                .pair_counters
                .entry(PairKey::new(&a_id, &b_id))
                .or_insert(0);
            *counter += 1;
            let overlap_ticks = *counter;
            if overlap_ticks <= COMBAT_GRACE_TICKS {
                continue;
            }

            let (Some(a), Some(b)) = (self.players.get(&a_id), self.players.get(&b_id)) else {
                continue;
            };
            // An earlier pair this tick may have drained one of them
            if a.eliminated || b.eliminated || a.size < COMBAT_MIN_SIZE || b.size < COMBAT_MIN_SIZE
            {
                continue;
            }
            let interval_a = a.adoption_interval_ticks();
            let interval_b = b.adoption_interval_ticks();
            let cadence = interval_a.min(interval_b).round().max(1.0) as u32;
            if (overlap_ticks - COMBAT_GRACE_TICKS) % cadence != 0 {
                continue;
            }

            let strength_a = CombatSystem::strength(a.size, a.pets_inside.len(), interval_a);
            let strength_b = CombatSystem::strength(b.size, b.pets_inside.len(), interval_b);
            let variance = CombatSystem::variance(free_strays);
            let jitter = self.rng.gen_range(-variance..=variance);
            let p_a = CombatSystem::win_probability(strength_a, strength_b, jitter);
            if self.rng.gen_bool(p_a as f64) {
                self.transfer_size(&a_id, &b_id);
            } else {
                self.transfer_size(&b_id, &a_id);
            }
        }
    }

    /// Move one combat resolution's worth of size from loser to winner,
    /// ejecting pets the loser can no longer hold
    fn transfer_size(&mut self, winner_id: &str, loser_id: &str) {
        let Some(loser) = self.players.get_mut(loser_id) else {
            return;
        };
        let drain = CombatSystem::drain_amount(loser.size);
        loser.size -= drain;
        let (lx, ly) = (loser.x, loser.y);

        let mut freed: Vec<String> = Vec::new();
        if loser.size <= ELIMINATION_SIZE {
            loser.eliminated = true;
            loser.vx = 0.0;
            loser.vy = 0.0;
            freed.append(&mut loser.pets_inside);
            info!(shelter = %loser_id, "shelter eliminated");
        } else {
            let cap = loser.capacity();
            while loser.pets_inside.len() > cap {
                if let Some(pet_id) = loser.pets_inside.pop() {
                    freed.push(pet_id);
                }
            }
        }

        for pet_id in freed {
            let ox = self.rng.gen_range(-EJECT_SCATTER..=EJECT_SCATTER);
            let oy = self.rng.gen_range(-EJECT_SCATTER..=EJECT_SCATTER);
            if let Some(stray) = self.strays.get_mut(&pet_id) {
                stray.inside_shelter_id = None;
                let (x, y) = MovementSystem::clamp_to_map(lx + ox, ly + oy, STRAY_RADIUS);
                stray.x = x;
                stray.y = y;
                stray.vx = 0.0;
                stray.vy = 0.0;
            }
        }

        if let Some(winner) = self.players.get_mut(winner_id) {
            winner.size += drain;
        }
    }

    fn check_domination(&mut self) {
        if !self.ever_contested {
            return;
        }
        let mut survivors = self
            .players
            .values()
            .filter(|s| !s.eliminated && s.size > ELIMINATION_SIZE);
        let (first, second) = (survivors.next(), survivors.next());
        if let (Some(last), None) = (first, second) {
            if last.size >= DOMINATION_MIN_SIZE {
                info!(shelter = %last.id, size = last.size, "domination, ending match");
                self.match_end_at = self.tick;
            }
        }
    }

    fn apply_gravity(&mut self) {
        let mut pullers: Vec<(f32, f32, f32, f32)> = Vec::new();
        for id in &self.roster {
            let Some(s) = self.players.get(id) else {
                continue;
            };
            if s.eliminated || !s.stationary() {
                continue;
            }
            let rate = if s.auto_jumped && !s.grounded() {
                GRAVITY_PULL_AUTO_JUMP
            } else {
                GRAVITY_PULL_GROUNDED
            };
            pullers.push((s.x, s.y, s.radius() * GRAVITY_RADIUS_MULT, rate));
        }
        if pullers.is_empty() {
            return;
        }

        for stray in self.strays.values_mut() {
            if stray.inside_shelter_id.is_some() {
                continue;
            }
            for &(px, py, reach, rate) in &pullers {
                let dx = px - stray.x;
                let dy = py - stray.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < f32::EPSILON || dist >= reach {
                    continue;
                }
                let step = rate.min(dist);
                stray.x += dx / dist * step;
                stray.y += dy / dist * step;
            }
        }
    }

    fn collect_pickups(&mut self) {
        let order = self.roster.clone();
        for id in &order {
            let Some(shelter) = self.players.get(id) else {
                continue;
            };
            if shelter.eliminated {
                continue;
            }
            let (sx, sy, sr) = (shelter.x, shelter.y, shelter.radius());
            let collected: Vec<String> = self
                .pickups
                .values()
                .filter(|p| MovementSystem::boxes_overlap(sx, sy, sr, p.x, p.y, PICKUP_RADIUS))
                .map(|p| p.id.clone())
                .collect();
            for pickup_id in collected {
                let Some(pickup) = self.pickups.remove(&pickup_id) else {
                    continue;
                };
                let Some(shelter) = self.players.get_mut(id) else {
                    continue;
                };
                match pickup.kind {
                    PickupKind::Growth => shelter.size += GROWTH_PICKUP_SIZE,
                    // Replaces any running boost, never stacks
                    PickupKind::Speed => shelter.speed_boost_until = self.tick + SPEED_BOOST_TICKS,
                }
            }
        }
    }

    fn rescue_strays(&mut self) {
        let order = self.roster.clone();
        for id in &order {
            loop {
                let Some(shelter) = self.players.get(id) else {
                    break;
                };
                if shelter.eliminated || shelter.full() {
                    break;
                }
                let reach = RESCUE_RADIUS_MIN.max(shelter.radius() + STRAY_RADIUS);
                let (sx, sy) = (shelter.x, shelter.y);

                // Greedy nearest-first with a full re-scan per grab
                let nearest = self
                    .strays
                    .values()
                    .filter(|s| s.inside_shelter_id.is_none())
                    .map(|s| {
                        let d2 = (s.x - sx) * (s.x - sx) + (s.y - sy) * (s.y - sy);
                        (d2, s.id.clone())
                    })
                    .min_by(|a, b| a.0.total_cmp(&b.0));

                match nearest {
                    Some((d2, stray_id)) if d2 <= reach * reach => {
                        if let Some(stray) = self.strays.get_mut(&stray_id) {
                            stray.inside_shelter_id = Some(id.clone());
                        }
                        if let Some(shelter) = self.players.get_mut(id) {
                            shelter.pets_inside.push(stray_id);
                        }
                    }
                    _ => break,
                }
            }
        }
    }

    fn process_adoptions(&mut self) {
        let order = self.roster.clone();
        for id in &order {
            let Some(shelter) = self.players.get(id) else {
                continue;
            };
            if shelter.eliminated || shelter.pets_inside.is_empty() {
                continue;
            }
            let on_zone = self.zones.iter().any(|z| {
                MovementSystem::boxes_overlap(
                    shelter.x,
                    shelter.y,
                    shelter.radius(),
                    z.x,
                    z.y,
                    z.radius,
                )
            });
            if !on_zone && !shelter.stationary() {
                continue;
            }
            if ((self.tick - shelter.last_adopt_tick) as f32) < shelter.adoption_interval_ticks() {
                continue;
            }

            let Some(shelter) = self.players.get_mut(id) else {
                continue;
            };
            let pet_id = shelter.pets_inside.remove(0);
            shelter.total_adoptions += 1;
            shelter.size += ADOPT_GROWTH_SIZE;
            shelter.last_adopt_tick = self.tick;
            let milestone = shelter.total_adoptions >= AUTO_JUMP_MILESTONE && !shelter.auto_jumped;
            self.strays.remove(&pet_id);

            if milestone {
                self.auto_jump(id);
            }
        }
    }

    /// One-time milestone teleport to a fresh off-zone position
    fn auto_jump(&mut self, id: &str) {
        let Some(radius) = self.players.get(id).map(|s| s.radius()) else {
            return;
        };
        let (tx, ty) = match self.random_off_zone_position(radius) {
            Some(pos) => pos,
            None => {
                let clear_corner = AUTO_JUMP_CORNERS.iter().copied().find(|&(cx, cy)| {
                    !self
                        .zones
                        .iter()
                        .any(|z| MovementSystem::boxes_overlap(cx, cy, radius, z.x, z.y, z.radius))
                });
                clear_corner.unwrap_or(AUTO_JUMP_CORNERS[0])
            }
        };
        if let Some(shelter) = self.players.get_mut(id) {
            let (x, y) = MovementSystem::clamp_to_map(tx, ty, radius);
            shelter.x = x;
            shelter.y = y;
            shelter.vx = 0.0;
            shelter.vy = 0.0;
            shelter.auto_jumped = true;
            debug!(shelter = %id, x, y, "auto-jump milestone");
        }
    }

    fn sync_carried_strays(&mut self) {
        let carriers: HashMap<String, (f32, f32, f32, f32)> = self
            .players
            .values()
            .map(|s| (s.id.clone(), (s.x, s.y, s.vx, s.vy)))
            .collect();
        for stray in self.strays.values_mut() {
            if let Some(owner) = &stray.inside_shelter_id {
                if let Some(&(x, y, vx, vy)) = carriers.get(owner) {
                    stray.x = x;
                    stray.y = y;
                    stray.vx = vx;
                    stray.vy = vy;
                }
            }
        }
    }
}
