//! Match lifecycle and the global scheduler

pub mod r#match;
pub mod service;

pub use r#match::{Match, MatchInner, Outbound};
pub use service::{JoinedPlayer, MatchStatus, Orchestrator};
