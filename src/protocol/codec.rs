//! Bespoke binary wire codec for input frames and world snapshots
//!
//! All numeric fields are little-endian and fixed-width. Strings are
//! length-prefixed with a single byte, which caps every id and display
//! name at 255 UTF-8 bytes; repeated-structure counts are a single byte
//! except the stray count, which is two (high-density matches overflowed
//! one byte). There is no version byte: encoder and decoder deploy
//! atomically.
//!
//! Decoding bound-checks every read against the remaining buffer and
//! returns [`CodecError`] for truncated or malformed frames so a bad
//! frame can be dropped without touching the tick loop.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Leading byte of a client input frame
pub const MSG_INPUT: u8 = 0x01;
/// Leading byte of a server snapshot frame
pub const MSG_SNAPSHOT: u8 = 0x02;

/// Pickup flavor carried on the wire as a single byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    /// Permanently increases shelter size
    Growth,
    /// Replaces the speed-boost deadline
    Speed,
}

impl PickupKind {
    fn to_wire(self) -> u8 {
        match self {
            PickupKind::Growth => 0,
            PickupKind::Speed => 1,
        }
    }

    fn from_wire(raw: u8) -> Result<Self, CodecError> {
        match raw {
            0 => Ok(PickupKind::Growth),
            1 => Ok(PickupKind::Speed),
            other => Err(CodecError::InvalidPickupKind(other)),
        }
    }
}

/// Codec failures; callers drop the offending frame or connection
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),

    #[error("frame truncated: needed {needed} bytes, {remaining} remain")]
    Truncated { needed: usize, remaining: usize },

    #[error("string field of {0} bytes exceeds the 255-byte wire limit")]
    StringTooLong(usize),

    #[error("{field} count {count} exceeds the wire limit")]
    CountOverflow { field: &'static str, count: usize },

    #[error("invalid pickup kind {0}")]
    InvalidPickupKind(u8),

    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
}

/// A decoded 4-byte input frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFrame {
    /// Raw directional bit flags (unvalidated beyond masking at use sites)
    pub flags: u16,
    /// Input sequence, wrapped to a byte by the encoder
    pub seq: u8,
}

/// Complete authoritative world state for one tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    pub tick: u32,
    pub match_end_at: u32,
    pub players: Vec<ShelterSnapshot>,
    pub pets: Vec<StraySnapshot>,
    pub zones: Vec<ZoneSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShelterSnapshot {
    pub id: String,
    pub display_name: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub total_adoptions: u32,
    pub pet_ids: Vec<String>,
    pub speed_boost_until: u32,
    pub input_seq: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StraySnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// None while free-roaming; the empty string is reserved on the wire
    pub inside_shelter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupSnapshot {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub kind: PickupKind,
}

/// Encode an input command. The sequence number wraps at a byte by design.
pub fn encode_input(flags: u16, seq: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    buf[0] = MSG_INPUT;
    buf[1..3].copy_from_slice(&flags.to_le_bytes());
    buf[3] = (seq & 0xFF) as u8;
    buf
}

/// Decode an input frame. Trailing bytes beyond the fixed 4 are ignored.
pub fn decode_input(frame: &[u8]) -> Result<InputFrame, CodecError> {
    let mut buf = frame;
    let msg_type = take_u8(&mut buf)?;
    if msg_type != MSG_INPUT {
        return Err(CodecError::UnknownMessageType(msg_type));
    }
    let flags = take_u16(&mut buf)?;
    let seq = take_u8(&mut buf)?;
    Ok(InputFrame { flags, seq })
}

/// Encode a full snapshot frame
pub fn encode_snapshot(snapshot: &WorldSnapshot) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::with_capacity(64 + snapshot.players.len() * 96 + snapshot.pets.len() * 32);

    buf.put_u8(MSG_SNAPSHOT);
    buf.put_u32_le(snapshot.tick);
    buf.put_u32_le(snapshot.match_end_at);

    put_count_u8(&mut buf, "player", snapshot.players.len())?;
    for player in &snapshot.players {
        put_string(&mut buf, &player.id)?;
        put_string(&mut buf, &player.display_name)?;
        buf.put_f32_le(player.x);
        buf.put_f32_le(player.y);
        buf.put_f32_le(player.vx);
        buf.put_f32_le(player.vy);
        buf.put_f32_le(player.size);
        buf.put_u32_le(player.total_adoptions);
        put_count_u8(&mut buf, "carried pet", player.pet_ids.len())?;
        for pet_id in &player.pet_ids {
            put_string(&mut buf, pet_id)?;
        }
        buf.put_u32_le(player.speed_boost_until);
        buf.put_u8(player.input_seq);
    }

    if snapshot.pets.len() > u16::MAX as usize {
        return Err(CodecError::CountOverflow {
            field: "pet",
            count: snapshot.pets.len(),
        });
    }
    buf.put_u16_le(snapshot.pets.len() as u16);
    for pet in &snapshot.pets {
        put_string(&mut buf, &pet.id)?;
        buf.put_f32_le(pet.x);
        buf.put_f32_le(pet.y);
        buf.put_f32_le(pet.vx);
        buf.put_f32_le(pet.vy);
        put_string(&mut buf, pet.inside_shelter_id.as_deref().unwrap_or(""))?;
    }

    put_count_u8(&mut buf, "zone", snapshot.zones.len())?;
    for zone in &snapshot.zones {
        put_string(&mut buf, &zone.id)?;
        buf.put_f32_le(zone.x);
        buf.put_f32_le(zone.y);
        buf.put_f32_le(zone.radius);
    }

    put_count_u8(&mut buf, "pickup", snapshot.pickups.len())?;
    for pickup in &snapshot.pickups {
        put_string(&mut buf, &pickup.id)?;
        buf.put_f32_le(pickup.x);
        buf.put_f32_le(pickup.y);
        buf.put_u8(pickup.kind.to_wire());
    }

    Ok(buf.freeze())
}

/// Decode a full snapshot frame
pub fn decode_snapshot(frame: &[u8]) -> Result<WorldSnapshot, CodecError> {
    let mut buf = frame;
    let msg_type = take_u8(&mut buf)?;
    if msg_type != MSG_SNAPSHOT {
        return Err(CodecError::UnknownMessageType(msg_type));
    }

    let tick = take_u32(&mut buf)?;
    let match_end_at = take_u32(&mut buf)?;

    let n_players = take_u8(&mut buf)? as usize;
    let mut players = Vec::with_capacity(n_players);
    for _ in 0..n_players {
        let id = take_string(&mut buf)?;
        let display_name = take_string(&mut buf)?;
        let x = take_f32(&mut buf)?;
        let y = take_f32(&mut buf)?;
        let vx = take_f32(&mut buf)?;
        let vy = take_f32(&mut buf)?;
        let size = take_f32(&mut buf)?;
        let total_adoptions = take_u32(&mut buf)?;
        let n_pets = take_u8(&mut buf)? as usize;
        let mut pet_ids = Vec::with_capacity(n_pets);
        for _ in 0..n_pets {
            pet_ids.push(take_string(&mut buf)?);
        }
        let speed_boost_until = take_u32(&mut buf)?;
        let input_seq = take_u8(&mut buf)?;
        players.push(ShelterSnapshot {
            id,
            display_name,
            x,
            y,
            vx,
            vy,
            size,
            total_adoptions,
            pet_ids,
            speed_boost_until,
            input_seq,
        });
    }

    let n_pets = take_u16(&mut buf)? as usize;
    let mut pets = Vec::with_capacity(n_pets);
    for _ in 0..n_pets {
        let id = take_string(&mut buf)?;
        let x = take_f32(&mut buf)?;
        let y = take_f32(&mut buf)?;
        let vx = take_f32(&mut buf)?;
        let vy = take_f32(&mut buf)?;
        let owner = take_string(&mut buf)?;
        pets.push(StraySnapshot {
            id,
            x,
            y,
            vx,
            vy,
            inside_shelter_id: if owner.is_empty() { None } else { Some(owner) },
        });
    }

    let n_zones = take_u8(&mut buf)? as usize;
    let mut zones = Vec::with_capacity(n_zones);
    for _ in 0..n_zones {
        let id = take_string(&mut buf)?;
        let x = take_f32(&mut buf)?;
        let y = take_f32(&mut buf)?;
        let radius = take_f32(&mut buf)?;
        zones.push(ZoneSnapshot { id, x, y, radius });
    }

    let n_pickups = take_u8(&mut buf)? as usize;
    let mut pickups = Vec::with_capacity(n_pickups);
    for _ in 0..n_pickups {
        let id = take_string(&mut buf)?;
        let x = take_f32(&mut buf)?;
        let y = take_f32(&mut buf)?;
        let kind = PickupKind::from_wire(take_u8(&mut buf)?)?;
        pickups.push(PickupSnapshot { id, x, y, kind });
    }

    Ok(WorldSnapshot {
        tick,
        match_end_at,
        players,
        pets,
        zones,
        pickups,
    })
}

fn put_string(buf: &mut BytesMut, s: &str) -> Result<(), CodecError> {
    let bytes = s.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(CodecError::StringTooLong(bytes.len()));
    }
    buf.put_u8(bytes.len() as u8);
    buf.put_slice(bytes);
    Ok(())
}

fn put_count_u8(buf: &mut BytesMut, field: &'static str, count: usize) -> Result<(), CodecError> {
    if count > u8::MAX as usize {
        return Err(CodecError::CountOverflow { field, count });
    }
    buf.put_u8(count as u8);
    Ok(())
}

fn ensure(buf: &&[u8], needed: usize) -> Result<(), CodecError> {
    if buf.remaining() < needed {
        return Err(CodecError::Truncated {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

fn take_u8(buf: &mut &[u8]) -> Result<u8, CodecError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut &[u8]) -> Result<u16, CodecError> {
    ensure(buf, 2)?;
    Ok(buf.get_u16_le())
}

fn take_u32(buf: &mut &[u8]) -> Result<u32, CodecError> {
    ensure(buf, 4)?;
    Ok(buf.get_u32_le())
}

fn take_f32(buf: &mut &[u8]) -> Result<f32, CodecError> {
    ensure(buf, 4)?;
    Ok(buf.get_f32_le())
}

fn take_string(buf: &mut &[u8]) -> Result<String, CodecError> {
    let len = take_u8(buf)? as usize;
    ensure(buf, len)?;
    let (head, rest) = buf.split_at(len);
    let s = std::str::from_utf8(head).map_err(|_| CodecError::InvalidUtf8)?;
    *buf = rest;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> WorldSnapshot {
        WorldSnapshot {
            tick: 1234,
            match_end_at: 7500,
            players: vec![ShelterSnapshot {
                id: "p_1".to_string(),
                display_name: "Maple Van".to_string(),
                x: 123.5,
                y: 456.25,
                vx: -3.2,
                vy: 0.0,
                size: 7.5,
                total_adoptions: 12,
                pet_ids: vec!["s_4".to_string(), "s_9".to_string()],
                speed_boost_until: 1300,
                input_seq: 201,
            }],
            pets: vec![
                StraySnapshot {
                    id: "s_4".to_string(),
                    x: 123.5,
                    y: 456.25,
                    vx: -3.2,
                    vy: 0.0,
                    inside_shelter_id: Some("p_1".to_string()),
                },
                StraySnapshot {
                    id: "s_77".to_string(),
                    x: 900.0,
                    y: 1000.0,
                    vx: 0.0,
                    vy: 0.0,
                    inside_shelter_id: None,
                },
            ],
            zones: vec![ZoneSnapshot {
                id: "z_0".to_string(),
                x: 800.0,
                y: 600.0,
                radius: 120.0,
            }],
            pickups: vec![PickupSnapshot {
                id: "k_3".to_string(),
                x: 40.0,
                y: 40.0,
                kind: PickupKind::Speed,
            }],
        }
    }

    #[test]
    fn input_round_trip() {
        for flags in [0u16, 1, 0x0F, 0xABCD, u16::MAX] {
            for seq in [0u32, 1, 255, 256, 1000, u32::MAX] {
                let frame = encode_input(flags, seq);
                assert_eq!(frame.len(), 4);
                assert_eq!(frame[0], MSG_INPUT);
                let decoded = decode_input(&frame).unwrap();
                assert_eq!(decoded.flags, flags);
                assert_eq!(decoded.seq, (seq & 0xFF) as u8);
            }
        }
    }

    #[test]
    fn input_rejects_wrong_type() {
        assert_eq!(
            decode_input(&[0x02, 0, 0, 0]),
            Err(CodecError::UnknownMessageType(0x02))
        );
    }

    #[test]
    fn input_rejects_short_frame() {
        assert!(matches!(
            decode_input(&[MSG_INPUT, 0x01]),
            Err(CodecError::Truncated { .. })
        ));
        assert_eq!(decode_input(&[]), Err(CodecError::Truncated { needed: 1, remaining: 0 }));
    }

    #[test]
    fn snapshot_round_trip_is_exact() {
        let snapshot = sample_snapshot();
        let bytes = encode_snapshot(&snapshot).unwrap();
        assert_eq!(bytes[0], MSG_SNAPSHOT);
        let decoded = decode_snapshot(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn empty_snapshot_round_trips() {
        let snapshot = WorldSnapshot {
            tick: 0,
            match_end_at: 0,
            ..Default::default()
        };
        let bytes = encode_snapshot(&snapshot).unwrap();
        assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn carried_none_vs_some_distinction_survives() {
        let snapshot = sample_snapshot();
        let decoded = decode_snapshot(&encode_snapshot(&snapshot).unwrap()).unwrap();
        assert_eq!(
            decoded.pets[0].inside_shelter_id.as_deref(),
            Some("p_1")
        );
        assert_eq!(decoded.pets[1].inside_shelter_id, None);
    }

    #[test]
    fn float_fields_round_trip_bit_exact() {
        let mut snapshot = sample_snapshot();
        snapshot.players[0].x = f32::MIN_POSITIVE;
        snapshot.players[0].y = -0.0;
        snapshot.players[0].vx = 1.0e-20;
        let decoded = decode_snapshot(&encode_snapshot(&snapshot).unwrap()).unwrap();
        assert_eq!(
            decoded.players[0].x.to_bits(),
            snapshot.players[0].x.to_bits()
        );
        assert_eq!(
            decoded.players[0].y.to_bits(),
            snapshot.players[0].y.to_bits()
        );
        assert_eq!(
            decoded.players[0].vx.to_bits(),
            snapshot.players[0].vx.to_bits()
        );
    }

    #[test]
    fn oversized_string_is_refused_not_corrupted() {
        let mut snapshot = sample_snapshot();
        snapshot.players[0].display_name = "x".repeat(256);
        assert_eq!(
            encode_snapshot(&snapshot),
            Err(CodecError::StringTooLong(256))
        );
    }

    #[test]
    fn string_length_at_limit_is_fine() {
        let mut snapshot = sample_snapshot();
        snapshot.players[0].display_name = "x".repeat(255);
        let decoded = decode_snapshot(&encode_snapshot(&snapshot).unwrap()).unwrap();
        assert_eq!(decoded.players[0].display_name.len(), 255);
    }

    #[test]
    fn pet_count_uses_two_bytes() {
        let mut snapshot = WorldSnapshot {
            tick: 9,
            match_end_at: 7500,
            ..Default::default()
        };
        for i in 0..300 {
            snapshot.pets.push(StraySnapshot {
                id: format!("s_{i}"),
                x: i as f32,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                inside_shelter_id: None,
            });
        }
        let decoded = decode_snapshot(&encode_snapshot(&snapshot).unwrap()).unwrap();
        assert_eq!(decoded.pets.len(), 300);
    }

    #[test]
    fn player_count_over_255_is_refused() {
        let mut snapshot = WorldSnapshot::default();
        for i in 0..256 {
            snapshot.players.push(ShelterSnapshot {
                id: format!("p_{i}"),
                display_name: String::new(),
                x: 0.0,
                y: 0.0,
                vx: 0.0,
                vy: 0.0,
                size: 3.0,
                total_adoptions: 0,
                pet_ids: Vec::new(),
                speed_boost_until: 0,
                input_seq: 0,
            });
        }
        assert!(matches!(
            encode_snapshot(&snapshot),
            Err(CodecError::CountOverflow { field: "player", .. })
        ));
    }

    #[test]
    fn truncated_snapshot_is_rejected() {
        let bytes = encode_snapshot(&sample_snapshot()).unwrap();
        // Every strict prefix must fail cleanly, never panic
        for cut in 0..bytes.len() {
            assert!(decode_snapshot(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn lying_string_length_is_rejected() {
        // Header + one player whose id claims 200 bytes but the buffer ends
        let mut bytes = vec![MSG_SNAPSHOT];
        bytes.extend_from_slice(&42u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(1);
        bytes.push(200);
        bytes.extend_from_slice(b"short");
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(CodecError::Truncated { needed: 200, .. })
        ));
    }

    #[test]
    fn unknown_snapshot_type_is_rejected() {
        assert_eq!(
            decode_snapshot(&[0x7F, 0, 0, 0, 0]),
            Err(CodecError::UnknownMessageType(0x7F))
        );
    }

    #[test]
    fn bad_pickup_kind_is_rejected() {
        let snapshot = WorldSnapshot {
            pickups: vec![PickupSnapshot {
                id: "k_0".to_string(),
                x: 1.0,
                y: 2.0,
                kind: PickupKind::Speed,
            }],
            ..Default::default()
        };
        let mut bytes = encode_snapshot(&snapshot).unwrap().to_vec();
        let last = bytes.len() - 1;
        bytes[last] = 9;
        assert_eq!(decode_snapshot(&bytes), Err(CodecError::InvalidPickupKind(9)));
    }
}
