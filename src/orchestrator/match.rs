//! Match aggregate: one world plus its session bookkeeping
//!
//! A `Match` owns an authoritative [`World`] behind a short-held mutex,
//! tracks which humans are connected and how the lobby phase is
//! progressing, and fans outbound frames to every peer over a broadcast
//! channel. It never runs itself; the [`Orchestrator`](super::Orchestrator)
//! scheduler calls [`Match::advance`] at the fixed tick rate.

use std::collections::HashSet;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::game::tuning::{COUNTDOWN_TICKS, FFA_MIN_PLAYERS, MATCH_STATE_INTERVAL_TICKS};
use crate::game::{SnapshotBuilder, World};
use crate::protocol::codec::encode_snapshot;
use crate::protocol::messages::{MatchMode, MatchPhase, ServerMsg};
use crate::util::time::ticks_to_secs_ceil;

/// Frame fanned out to every connected peer of a match
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Binary world snapshot, already encoded
    Snapshot(Bytes),
    /// JSON control message, already serialized
    Control(String),
}

/// Mutable match state; the scheduler and the session handlers both go
/// through the mutex, so critical sections stay short
pub struct MatchInner {
    pub world: World,
    pub phase: MatchPhase,
    /// Connected human player ids; bots never appear here
    pub humans: HashSet<String>,
    /// Humans who voted to start early
    pub ready: HashSet<String>,
    /// Scheduler tick at which the countdown expires
    countdown_ends_at: u64,
    /// Scheduler tick counter; runs even while the world is not started
    clock: u64,
}

impl MatchInner {
    fn countdown_remaining_secs(&self) -> u32 {
        let remaining = self.countdown_ends_at.saturating_sub(self.clock);
        ticks_to_secs_ceil(remaining as u32)
    }

    fn ready_majority(&self) -> bool {
        !self.humans.is_empty() && self.ready.len() * 2 > self.humans.len()
    }
}

pub struct Match {
    pub id: String,
    pub mode: MatchMode,
    inner: Mutex<MatchInner>,
    outbound: broadcast::Sender<Outbound>,
}

impl Match {
    pub fn new(id: String, mode: MatchMode, seed: u64) -> Self {
        let (outbound, _) = broadcast::channel(64);
        Self {
            id,
            mode,
            inner: Mutex::new(MatchInner {
                world: World::new(seed),
                phase: MatchPhase::Lobby,
                humans: HashSet::new(),
                ready: HashSet::new(),
                countdown_ends_at: 0,
                clock: 0,
            }),
            outbound,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, MatchInner> {
        self.inner.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound.subscribe()
    }

    pub fn phase(&self) -> MatchPhase {
        self.lock().phase
    }

    pub fn human_count(&self) -> usize {
        self.lock().humans.len()
    }

    /// Skip the lobby entirely; used for solo matches
    pub fn begin_solo(&self) {
        let mut inner = self.lock();
        inner.world.start();
        inner.phase = MatchPhase::Playing;
    }

    /// Register a connected human. Starts the countdown once enough humans
    /// are present.
    pub fn join_human(&self, player_id: &str, display_name: &str) {
        let mut inner = self.lock();
        inner.world.add_player(player_id, display_name);
        inner.humans.insert(player_id.to_string());

        if inner.phase == MatchPhase::Lobby && inner.humans.len() >= FFA_MIN_PLAYERS {
            inner.countdown_ends_at = inner.clock + COUNTDOWN_TICKS as u64;
            inner.phase = MatchPhase::Countdown;
            info!(
                match_id = %self.id,
                humans = inner.humans.len(),
                "lobby filled, countdown started"
            );
            self.send_match_state(&inner);
        }
    }

    /// Drop a human. Returns the number of humans still connected; the
    /// caller destroys the match at zero.
    pub fn leave_human(&self, player_id: &str) -> usize {
        let mut inner = self.lock();
        inner.humans.remove(player_id);
        inner.ready.remove(player_id);
        inner.world.remove_player(player_id);

        // A countdown cannot survive dropping below the lobby minimum
        if inner.phase == MatchPhase::Countdown && inner.humans.len() < FFA_MIN_PLAYERS {
            inner.phase = MatchPhase::Lobby;
            inner.ready.clear();
            debug!(match_id = %self.id, "countdown cancelled, back to lobby");
        }
        inner.humans.len()
    }

    pub fn vote_ready(&self, player_id: &str) {
        let mut inner = self.lock();
        if inner.phase != MatchPhase::Playing && inner.humans.contains(player_id) {
            inner.ready.insert(player_id.to_string());
        }
    }

    /// One scheduler tick. Playing matches advance the world and broadcast
    /// a binary snapshot (encoded outside the lock); other phases run
    /// countdown bookkeeping and the periodic state announcement.
    pub fn advance(&self) {
        let mut inner = self.lock();
        inner.clock += 1;

        match inner.phase {
            MatchPhase::Lobby => {
                if inner.clock % MATCH_STATE_INTERVAL_TICKS as u64 == 0 {
                    self.send_match_state(&inner);
                }
            }
            MatchPhase::Countdown => {
                if inner.clock >= inner.countdown_ends_at || inner.ready_majority() {
                    inner.world.start();
                    inner.phase = MatchPhase::Playing;
                    info!(
                        match_id = %self.id,
                        humans = inner.humans.len(),
                        ready = inner.ready.len(),
                        "match started"
                    );
                    self.send_match_state(&inner);
                } else if inner.clock % MATCH_STATE_INTERVAL_TICKS as u64 == 0 {
                    self.send_match_state(&inner);
                }
            }
            MatchPhase::Playing => {
                inner.world.tick_world();
                let snapshot = SnapshotBuilder::build(&inner.world);
                drop(inner);

                match encode_snapshot(&snapshot) {
                    Ok(bytes) => {
                        let _ = self.outbound.send(Outbound::Snapshot(bytes));
                    }
                    Err(err) => {
                        warn!(match_id = %self.id, error = %err, "snapshot encode failed");
                    }
                }
            }
        }
    }

    /// Log the final standings; the rewards collaborator consumes these
    /// lines at match teardown.
    pub fn log_summary(&self) {
        let inner = self.lock();
        for (rank, p) in inner.world.placements().iter().enumerate() {
            info!(
                match_id = %self.id,
                placement = rank + 1,
                player_id = %p.id,
                display_name = %p.display_name,
                size = p.size,
                adoptions = p.total_adoptions,
                eliminated = p.eliminated,
                "final placement"
            );
        }
    }

    fn send_match_state(&self, inner: &MatchInner) {
        let msg = ServerMsg::MatchState {
            phase: inner.phase,
            countdown_remaining_sec: (inner.phase == MatchPhase::Countdown)
                .then(|| inner.countdown_remaining_secs()),
            ready_count: inner.ready.len() as u32,
        };
        let Ok(json) = serde_json::to_string(&msg) else {
            return;
        };
        let _ = self.outbound.send(Outbound::Control(json));
    }
}
