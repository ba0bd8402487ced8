//! JSON control messages exchanged as WebSocket text frames
//!
//! Binary frames (inputs, snapshots) are handled by [`super::codec`]; this
//! module covers the low-rate control plane: the join handshake, lobby
//! state, fight/ally choices and ping. Field names are camelCase on the
//! wire for the browser client.

use serde::{Deserialize, Serialize};

/// Requested match flavor. Teams currently routes like Ffa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Solo,
    Ffa,
    Teams,
}

/// Lifecycle phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    Lobby,
    Countdown,
    Playing,
}

/// A player's submitted stance toward one specific opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FightAllyChoice {
    Fight,
    Ally,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// First message on the game socket: pick a mode and display name
    Mode {
        mode: MatchMode,
        #[serde(default)]
        display_name: Option<String>,
    },
    /// Vote to start the countdown early
    Ready,
    /// Stance toward one opponent; combat consumes it every tick
    FightAlly {
        target_id: String,
        choice: FightAllyChoice,
    },
    /// Latency probe, echoed back verbatim
    Ping { ts: u64 },
    /// Signaling handshake: ask which game endpoint to connect to
    Join {
        mode: MatchMode,
        #[serde(default)]
        latency: Option<u32>,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Reply to `Mode`: identity and match assignment
    Welcome {
        player_id: String,
        display_name: String,
        match_id: String,
        mode: MatchMode,
    },
    Pong { ts: u64 },
    /// Periodic lobby/countdown announcement
    MatchState {
        phase: MatchPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        countdown_remaining_sec: Option<u32>,
        ready_count: u32,
    },
    /// Signaling reply: where to open the game socket
    Joined { game_url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_msgs_parse_from_browser_json() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"mode","mode":"ffa","displayName":"Maple Van"}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Mode {
                mode: MatchMode::Ffa,
                ref display_name
            } if display_name.as_deref() == Some("Maple Van")
        ));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Ready));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"fightAlly","targetId":"p_2","choice":"ally"}"#)
                .unwrap();
        assert!(matches!(
            msg,
            ClientMsg::FightAlly {
                ref target_id,
                choice: FightAllyChoice::Ally,
            } if target_id == "p_2"
        ));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join","mode":"solo"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Join {
                mode: MatchMode::Solo,
                latency: None
            }
        ));
    }

    #[test]
    fn server_msgs_serialize_with_camel_case_fields() {
        let json = serde_json::to_string(&ServerMsg::Welcome {
            player_id: "p_1".to_string(),
            display_name: "Maple Van".to_string(),
            match_id: "m_1".to_string(),
            mode: MatchMode::Ffa,
        })
        .unwrap();
        assert!(json.contains(r#""type":"welcome""#));
        assert!(json.contains(r#""playerId":"p_1""#));
        assert!(json.contains(r#""matchId":"m_1""#));

        let json = serde_json::to_string(&ServerMsg::Joined {
            game_url: "ws://localhost:4001/ws".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""gameUrl":"ws://localhost:4001/ws""#));
    }

    #[test]
    fn match_state_omits_countdown_outside_countdown_phase() {
        let json = serde_json::to_string(&ServerMsg::MatchState {
            phase: MatchPhase::Lobby,
            countdown_remaining_sec: None,
            ready_count: 1,
        })
        .unwrap();
        assert!(json.contains(r#""phase":"lobby""#));
        assert!(!json.contains("countdownRemainingSec"));

        let json = serde_json::to_string(&ServerMsg::MatchState {
            phase: MatchPhase::Countdown,
            countdown_remaining_sec: Some(12),
            ready_count: 2,
        })
        .unwrap();
        assert!(json.contains(r#""countdownRemainingSec":12"#));
    }

    #[test]
    fn unknown_message_type_is_an_error() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }
}
