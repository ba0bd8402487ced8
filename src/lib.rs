//! Authoritative game server for the multiplayer shelter rescue io game
//!
//! Players drive shelter vans that rescue strays, deposit them at adoption
//! zones to grow, and contest overlapping rivals. The simulation runs as a
//! fixed-timestep world per match, all matches ticked by one scheduler;
//! clients exchange a compact binary protocol for inputs and snapshots and
//! a small JSON control plane for everything else.

pub mod app;
pub mod client_sim;
pub mod config;
pub mod game;
pub mod http;
pub mod orchestrator;
pub mod protocol;
pub mod registry;
pub mod util;
pub mod ws;
