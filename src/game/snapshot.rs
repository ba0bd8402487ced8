//! Build the wire-shaped snapshot from authoritative world state
//!
//! Runs every tick for every playing match. Players come out in roster
//! order; strays and pickups are sorted by id so consecutive frames encode
//! byte-stably regardless of map iteration order.

use crate::game::world::World;
use crate::protocol::codec::{
    PickupSnapshot, ShelterSnapshot, StraySnapshot, WorldSnapshot, ZoneSnapshot,
};

pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn build(world: &World) -> WorldSnapshot {
        let players = world
            .roster()
            .iter()
            .filter_map(|id| world.players.get(id))
            .map(|s| ShelterSnapshot {
                id: s.id.clone(),
                display_name: s.display_name.clone(),
                x: s.x,
                y: s.y,
                vx: s.vx,
                vy: s.vy,
                size: s.size,
                total_adoptions: s.total_adoptions,
                pet_ids: s.pets_inside.clone(),
                speed_boost_until: s.speed_boost_until,
                input_seq: s.input_seq,
            })
            .collect();

        let mut pets: Vec<StraySnapshot> = world
            .strays
            .values()
            .map(|s| StraySnapshot {
                id: s.id.clone(),
                x: s.x,
                y: s.y,
                vx: s.vx,
                vy: s.vy,
                inside_shelter_id: s.inside_shelter_id.clone(),
            })
            .collect();
        pets.sort_by(|a, b| a.id.cmp(&b.id));

        let zones = world
            .zones
            .iter()
            .map(|z| ZoneSnapshot {
                id: z.id.clone(),
                x: z.x,
                y: z.y,
                radius: z.radius,
            })
            .collect();

        let mut pickups: Vec<PickupSnapshot> = world
            .pickups
            .values()
            .map(|p| PickupSnapshot {
                id: p.id.clone(),
                x: p.x,
                y: p.y,
                kind: p.kind,
            })
            .collect();
        pickups.sort_by(|a, b| a.id.cmp(&b.id));

        WorldSnapshot {
            tick: world.tick,
            match_end_at: world.match_end_at,
            players,
            pets,
            zones,
            pickups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::{decode_snapshot, encode_snapshot};

    #[test]
    fn snapshot_reflects_world_state() {
        let mut w = World::new(3);
        w.add_player("p1", "Maple");
        w.add_player("p2", "Birch");
        w.start();
        for _ in 0..5 {
            w.tick_world();
        }

        let snap = SnapshotBuilder::build(&w);
        assert_eq!(snap.tick, 5);
        assert_eq!(snap.match_end_at, w.match_end_at);
        assert_eq!(snap.players.len(), 2);
        // Roster order, not map order
        assert_eq!(snap.players[0].id, "p1");
        assert_eq!(snap.players[1].id, "p2");
        assert_eq!(snap.pets.len(), w.strays.len());
        assert_eq!(snap.zones.len(), 1);

        let p1 = w.players.get("p1").unwrap();
        assert_eq!(snap.players[0].x, p1.x);
        assert_eq!(snap.players[0].size, p1.size);
    }

    #[test]
    fn snapshot_survives_the_codec() {
        let mut w = World::new(9);
        w.add_player("p1", "Maple");
        w.add_cpu_player(0);
        w.start();
        for _ in 0..60 {
            w.tick_world();
        }
        let snap = SnapshotBuilder::build(&w);
        let decoded = decode_snapshot(&encode_snapshot(&snap).unwrap()).unwrap();
        assert_eq!(decoded, snap);
    }

    #[test]
    fn repeated_builds_are_identical() {
        let mut w = World::new(11);
        w.add_player("p1", "Maple");
        w.start();
        w.tick_world();
        assert_eq!(SnapshotBuilder::build(&w), SnapshotBuilder::build(&w));
    }
}
