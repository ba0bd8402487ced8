//! Orchestrator: connection-to-match assignment plus the global tick loop
//!
//! All matches are driven sequentially from one fixed-rate tokio interval;
//! `World::tick_world` never suspends, so a tick is a plain synchronous
//! pass over the live matches. Session handlers call into the same
//! structure to route inputs and votes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::game::tuning::{MAX_PLAYERS_PER_MATCH, SOLO_CPU_COUNT};
use crate::protocol::messages::{FightAllyChoice, MatchMode, MatchPhase};
use crate::util::time::{TICK_DURATION_MICROS, TICK_RATE};

use super::r#match::{Match, Outbound};

const MAX_DISPLAY_NAME_LEN: usize = 24;

/// Everything a session handler needs after a successful join
pub struct JoinedPlayer {
    pub player_id: String,
    pub display_name: String,
    pub match_id: String,
    pub mode: MatchMode,
    pub outbound: broadcast::Receiver<Outbound>,
}

/// One row of the `/status` report
#[derive(Debug, Clone, Serialize)]
pub struct MatchStatus {
    pub match_id: String,
    pub mode: MatchMode,
    pub phase: MatchPhase,
    pub humans: usize,
    pub tick: u32,
}

pub struct Orchestrator {
    matches: DashMap<String, Arc<Match>>,
    /// player id -> match id
    players: DashMap<String, String>,
    /// Serializes find-or-create against match destruction
    assign: Mutex<()>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
            players: DashMap::new(),
            assign: Mutex::new(()),
        }
    }

    /// Assign a new player to a match by requested mode. Solo gets a fresh
    /// match that starts immediately against CPU shelters; ffa and teams
    /// share open lobbies of their own mode.
    pub fn join(&self, mode: MatchMode, display_name: Option<String>) -> JoinedPlayer {
        let player_id = Uuid::new_v4().to_string();
        let display_name = sanitize_display_name(display_name, &player_id);

        let _guard = self.assign.lock();
        let game_match = match mode {
            MatchMode::Solo => self.create_match(mode),
            MatchMode::Ffa | MatchMode::Teams => self
                .find_open_lobby(mode)
                .unwrap_or_else(|| self.create_match(mode)),
        };

        // Subscribe before joining so the peer misses no frame it caused
        let outbound = game_match.subscribe();
        game_match.join_human(&player_id, &display_name);

        if mode == MatchMode::Solo {
            {
                let mut inner = game_match.lock();
                for i in 0..SOLO_CPU_COUNT {
                    inner.world.add_cpu_player(i);
                }
            }
            game_match.begin_solo();
        }

        self.players
            .insert(player_id.clone(), game_match.id.clone());
        info!(
            player_id = %player_id,
            match_id = %game_match.id,
            mode = ?mode,
            humans = game_match.human_count(),
            "player joined"
        );

        JoinedPlayer {
            player_id,
            display_name,
            match_id: game_match.id.clone(),
            mode,
            outbound,
        }
    }

    /// Drop a player; destroys the match when its last human is gone
    pub fn leave(&self, player_id: &str) {
        let Some((_, match_id)) = self.players.remove(player_id) else {
            return;
        };
        let Some(game_match) = self.matches.get(&match_id).map(|m| m.value().clone()) else {
            return;
        };

        let remaining = game_match.leave_human(player_id);
        info!(player_id = %player_id, match_id = %match_id, remaining, "player left");

        if remaining == 0 {
            // Joins hold the assign lock while picking a lobby; re-check
            // under it so a racing join cannot land in a destroyed match
            let _guard = self.assign.lock();
            if game_match.human_count() == 0 {
                self.matches.remove(&match_id);
                game_match.log_summary();
                info!(match_id = %match_id, "match destroyed");
            }
        }
    }

    /// Buffer an input frame; last write before the tick wins
    pub fn set_input(&self, player_id: &str, flags: u16, seq: u8) {
        if let Some(game_match) = self.match_of(player_id) {
            game_match.lock().world.set_input(player_id, flags, seq);
        }
    }

    pub fn vote_ready(&self, player_id: &str) {
        if let Some(game_match) = self.match_of(player_id) {
            game_match.vote_ready(player_id);
        }
    }

    pub fn set_fight_ally(&self, player_id: &str, target_id: &str, choice: FightAllyChoice) {
        if let Some(game_match) = self.match_of(player_id) {
            game_match
                .lock()
                .world
                .set_fight_ally(player_id, target_id, choice);
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn match_statuses(&self) -> Vec<MatchStatus> {
        self.matches
            .iter()
            .map(|entry| {
                let m = entry.value();
                let inner = m.lock();
                MatchStatus {
                    match_id: m.id.clone(),
                    mode: m.mode,
                    phase: inner.phase,
                    humans: inner.humans.len(),
                    tick: inner.world.tick,
                }
            })
            .collect()
    }

    /// Advance every live match one tick. A panicking match is logged and
    /// skipped for this tick; the others still advance.
    pub fn tick_once(&self) {
        let live: Vec<Arc<Match>> = self.matches.iter().map(|e| e.value().clone()).collect();
        for game_match in live {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| game_match.advance())) {
                let panic_msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(match_id = %game_match.id, panic = %panic_msg, "match tick panicked");
            }
        }
    }

    /// The global fixed-rate scheduler; spawned once from main
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(Duration::from_micros(TICK_DURATION_MICROS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(tick_rate = TICK_RATE, "orchestrator tick loop running");

        loop {
            ticker.tick().await;
            self.tick_once();
        }
    }

    fn match_of(&self, player_id: &str) -> Option<Arc<Match>> {
        let match_id = self.players.get(player_id)?.value().clone();
        self.matches.get(&match_id).map(|m| m.value().clone())
    }

    fn find_open_lobby(&self, mode: MatchMode) -> Option<Arc<Match>> {
        self.matches.iter().find_map(|entry| {
            let m = entry.value();
            if m.mode != mode {
                return None;
            }
            let inner = m.lock();
            let joinable =
                inner.phase != MatchPhase::Playing && inner.humans.len() < MAX_PLAYERS_PER_MATCH;
            drop(inner);
            joinable.then(|| m.clone())
        })
    }

    fn create_match(&self, mode: MatchMode) -> Arc<Match> {
        let id = Uuid::new_v4().to_string();
        let seed = rand::random::<u64>();
        let game_match = Arc::new(Match::new(id.clone(), mode, seed));
        self.matches.insert(id, game_match.clone());
        info!(match_id = %game_match.id, mode = ?mode, "match created");
        game_match
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_display_name(requested: Option<String>, player_id: &str) -> String {
    let trimmed = requested
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(MAX_DISPLAY_NAME_LEN)
        .collect::<String>();
    if trimmed.is_empty() {
        format!("Shelter_{}", &player_id[..8])
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tuning::CPU_ID_PREFIX;
    use crate::protocol::codec::decode_snapshot;

    fn next_snapshot(rx: &mut broadcast::Receiver<Outbound>) -> crate::protocol::codec::WorldSnapshot {
        loop {
            match rx.try_recv() {
                Ok(Outbound::Snapshot(bytes)) => return decode_snapshot(&bytes).unwrap(),
                Ok(Outbound::Control(_)) => continue,
                Err(e) => panic!("no snapshot broadcast: {e}"),
            }
        }
    }

    #[test]
    fn solo_join_plays_against_cpu_shelters() {
        let orch = Orchestrator::new();
        let mut joined = orch.join(MatchMode::Solo, Some("Maple Van".into()));
        assert_eq!(joined.display_name, "Maple Van");

        orch.tick_once();
        let snap = next_snapshot(&mut joined.outbound);
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.players.len(), 1 + SOLO_CPU_COUNT);
        assert_eq!(
            snap.players
                .iter()
                .filter(|p| p.id.starts_with(CPU_ID_PREFIX))
                .count(),
            SOLO_CPU_COUNT
        );
    }

    #[test]
    fn ffa_joiners_share_one_lobby() {
        let orch = Orchestrator::new();
        let a = orch.join(MatchMode::Ffa, None);
        let b = orch.join(MatchMode::Ffa, None);
        assert_eq!(a.match_id, b.match_id);
        assert_eq!(orch.match_count(), 1);
        assert_eq!(orch.player_count(), 2);
    }

    #[test]
    fn teams_lobbies_stay_separate_from_ffa() {
        let orch = Orchestrator::new();
        let a = orch.join(MatchMode::Ffa, None);
        let b = orch.join(MatchMode::Teams, None);
        assert_ne!(a.match_id, b.match_id);
        assert_eq!(orch.match_count(), 2);
    }

    #[test]
    fn full_lobby_overflows_into_a_new_match() {
        let orch = Orchestrator::new();
        let first = orch.join(MatchMode::Ffa, None);
        for _ in 1..MAX_PLAYERS_PER_MATCH {
            orch.join(MatchMode::Ffa, None);
        }
        assert_eq!(orch.match_count(), 1);

        let overflow = orch.join(MatchMode::Ffa, None);
        assert_ne!(overflow.match_id, first.match_id);
        assert_eq!(orch.match_count(), 2);
    }

    #[test]
    fn last_leaver_destroys_the_match() {
        let orch = Orchestrator::new();
        let a = orch.join(MatchMode::Ffa, None);
        let b = orch.join(MatchMode::Ffa, None);

        orch.leave(&a.player_id);
        assert_eq!(orch.match_count(), 1);
        orch.leave(&b.player_id);
        assert_eq!(orch.match_count(), 0);
        assert_eq!(orch.player_count(), 0);
    }

    #[test]
    fn inputs_reach_the_world_and_echo_in_snapshots() {
        let orch = Orchestrator::new();
        let mut joined = orch.join(MatchMode::Solo, None);

        orch.set_input(&joined.player_id, crate::game::tuning::INPUT_RIGHT, 9);
        orch.tick_once();

        let snap = next_snapshot(&mut joined.outbound);
        let me = snap
            .players
            .iter()
            .find(|p| p.id == joined.player_id)
            .unwrap();
        assert_eq!(me.input_seq, 9);
        assert!(me.vx > 0.0);
    }

    #[test]
    fn generated_names_fall_back_to_the_id_prefix() {
        assert_eq!(
            sanitize_display_name(None, "0123456789abcdef"),
            "Shelter_01234567"
        );
        assert_eq!(
            sanitize_display_name(Some("   ".into()), "0123456789abcdef"),
            "Shelter_01234567"
        );
        let long = "x".repeat(100);
        assert_eq!(
            sanitize_display_name(Some(long), "0123456789abcdef").len(),
            MAX_DISPLAY_NAME_LEN
        );
    }
}
