//! Client-side prediction and interpolation
//!
//! Lives in the server crate so a native client (and the tests) share the
//! exact movement math the server ticks with. The model is soft
//! prediction: the local shelter is advanced immediately from raw input,
//! then overwritten by every server snapshot; inputs are never replayed.
//! Remote entities render a fixed window behind the newest snapshot,
//! linearly interpolated between the last two.

use crate::game::movement::MovementSystem;
use crate::game::tuning::{shelter_radius, INTERP_WINDOW_MS, PREDICTION_SNAP_DISTANCE};
use crate::protocol::codec::{
    PickupSnapshot, ShelterSnapshot, StraySnapshot, WorldSnapshot, ZoneSnapshot,
};

#[derive(Debug, Clone)]
struct TimedSnapshot {
    snapshot: WorldSnapshot,
    received_at_ms: u64,
}

/// Locally predicted state of the player's own shelter
#[derive(Debug, Clone, Copy)]
struct PredictedLocal {
    x: f32,
    y: f32,
    size: f32,
    boosted: bool,
}

/// What the renderer draws for one frame
#[derive(Debug, Clone)]
pub struct RenderView {
    pub tick: u32,
    pub match_end_at: u32,
    pub players: Vec<ShelterSnapshot>,
    pub pets: Vec<StraySnapshot>,
    pub zones: Vec<ZoneSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
}

pub struct ClientSimulationState {
    local_player_id: String,
    previous: Option<TimedSnapshot>,
    latest: Option<TimedSnapshot>,
    predicted: Option<PredictedLocal>,
}

impl ClientSimulationState {
    pub fn new(local_player_id: impl Into<String>) -> Self {
        Self {
            local_player_id: local_player_id.into(),
            previous: None,
            latest: None,
            predicted: None,
        }
    }

    /// Forget everything; used between matches
    pub fn reset(&mut self) {
        self.previous = None;
        self.latest = None;
        self.predicted = None;
    }

    /// Accept an authoritative snapshot.
    ///
    /// The local prediction is overwritten with server truth; when the
    /// server position jumped farther than the snap distance (teleports,
    /// auto-jumps) the prediction is dropped instead so the next frame
    /// pops straight to the new position.
    pub fn ingest_snapshot(&mut self, snapshot: WorldSnapshot, now_ms: u64) {
        let local_before =
            find_local(self.latest.as_ref(), &self.local_player_id).map(|p| (p.x, p.y));

        self.previous = self.latest.take();
        self.latest = Some(TimedSnapshot {
            snapshot,
            received_at_ms: now_ms,
        });

        let tick = self.latest.as_ref().map(|t| t.snapshot.tick).unwrap_or(0);
        self.predicted = match find_local(self.latest.as_ref(), &self.local_player_id) {
            Some(server_local) => {
                let jumped = match local_before {
                    Some((px, py)) => {
                        let dx = server_local.x - px;
                        let dy = server_local.y - py;
                        (dx * dx + dy * dy).sqrt() > PREDICTION_SNAP_DISTANCE
                    }
                    None => false,
                };
                if jumped {
                    None
                } else {
                    Some(PredictedLocal {
                        x: server_local.x,
                        y: server_local.y,
                        size: server_local.size,
                        boosted: server_local.speed_boost_until > tick,
                    })
                }
            }
            None => None,
        };
    }

    /// Advance the local shelter by raw input over a variable frame time.
    /// Uses the server's exact speed and clamping rules.
    pub fn predict_local(&mut self, flags: u16, dt_secs: f32) {
        let Some(pred) = &mut self.predicted else {
            return;
        };
        if let Some((nx, ny)) = MovementSystem::direction_from_flags(flags) {
            let speed = MovementSystem::speed_for(pred.size, pred.boosted);
            let (cx, cy) = MovementSystem::clamp_to_map(
                pred.x + nx * speed * dt_secs,
                pred.y + ny * speed * dt_secs,
                shelter_radius(pred.size),
            );
            pred.x = cx;
            pred.y = cy;
        }
    }

    /// Currently predicted local position, if a prediction is live
    pub fn predicted_position(&self) -> Option<(f32, f32)> {
        self.predicted.map(|p| (p.x, p.y))
    }

    /// Produce the frame to draw at `now_ms`. None before the first
    /// snapshot. Remote entities lag up to the interpolation window behind
    /// the newest server state and freeze there once `t` saturates.
    pub fn sample(&self, now_ms: u64) -> Option<RenderView> {
        let latest = self.latest.as_ref()?;
        let t = match &self.previous {
            Some(_) => {
                let elapsed = now_ms.saturating_sub(latest.received_at_ms) as f32;
                (elapsed / INTERP_WINDOW_MS as f32).clamp(0.0, 1.0)
            }
            None => 1.0,
        };
        let prev = self.previous.as_ref().map(|p| &p.snapshot);

        let players = latest
            .snapshot
            .players
            .iter()
            .map(|p| {
                let mut out = p.clone();
                // The local shelter is predicted or server truth, never lerped
                if p.id == self.local_player_id {
                    if let Some(pred) = &self.predicted {
                        out.x = pred.x;
                        out.y = pred.y;
                    }
                    return out;
                }
                if let Some(old) = prev.and_then(|s| s.players.iter().find(|o| o.id == p.id)) {
                    out.x = lerp(old.x, p.x, t);
                    out.y = lerp(old.y, p.y, t);
                }
                out
            })
            .collect();

        let pets = latest
            .snapshot
            .pets
            .iter()
            .map(|p| {
                let mut out = p.clone();
                if let Some(old) = prev.and_then(|s| s.pets.iter().find(|o| o.id == p.id)) {
                    out.x = lerp(old.x, p.x, t);
                    out.y = lerp(old.y, p.y, t);
                }
                out
            })
            .collect();

        Some(RenderView {
            tick: latest.snapshot.tick,
            match_end_at: latest.snapshot.match_end_at,
            players,
            pets,
            zones: latest.snapshot.zones.clone(),
            pickups: latest.snapshot.pickups.clone(),
        })
    }
}

fn find_local<'a>(timed: Option<&'a TimedSnapshot>, id: &str) -> Option<&'a ShelterSnapshot> {
    timed?.snapshot.players.iter().find(|p| p.id == id)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
