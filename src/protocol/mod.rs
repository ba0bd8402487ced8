pub mod codec;
pub mod messages;

pub use codec::{
    decode_input, decode_snapshot, encode_input, encode_snapshot, CodecError, InputFrame,
    PickupKind, PickupSnapshot, ShelterSnapshot, StraySnapshot, WorldSnapshot, ZoneSnapshot,
    MSG_INPUT, MSG_SNAPSHOT,
};
pub use messages::{ClientMsg, FightAllyChoice, MatchMode, MatchPhase, ServerMsg};
