//! Migration protocol (§4.5) and the alternative-scheduler set consulted by
//! the migration check (§4.4).

use crate::address::PostCode;
use crate::host_service::HostServiceHandle;
use crate::position::Position;

/// One scheduler a migrating actor could move to: its `PostCode`, its
/// current position, and a handle to push the migration envelope through.
#[derive(Clone)]
pub struct PeerInfo {
    pub postcode: PostCode,
    pub position: Position,
    pub host_service: HostServiceHandle,
}

/// The peer schedulers a `check_migration` call may consider (§4.4
/// "search a provided `MigrationAlternatives` set").
#[derive(Clone, Default)]
pub struct MigrationAlternatives {
    peers: Vec<PeerInfo>,
}

impl MigrationAlternatives {
    pub fn new(peers: Vec<PeerInfo>) -> Self {
        MigrationAlternatives { peers }
    }

    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    /// The peer nearest to `actor_pos` whose distance to it is strictly
    /// less than `current_distance` (the actor's distance to its current
    /// scheduler), or `None` if no peer qualifies.
    ///
    /// §4.4: "migrate the actor to the nearest alternative whose distance
    /// to the actor is strictly less than self's distance."
    pub fn nearest_closer_than(
        &self,
        actor_pos: Position,
        current_distance: f32,
    ) -> Option<&PeerInfo> {
        self.peers
            .iter()
            .map(|peer| (peer, peer.position.distance(&actor_pos)))
            .filter(|(_, dist)| *dist < current_distance)
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).expect("distance is never NaN"))
            .map(|(peer, _)| peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::PostCode;
    use crate::host_service::HostService;

    fn peer(name: &str, pos: Position) -> PeerInfo {
        let log = slog::Logger::root(slog::Discard, slog::o!());
        PeerInfo {
            postcode: PostCode::new("proc", name),
            position: pos,
            host_service: HostService::new(PostCode::new("proc", name), 100, log),
        }
    }

    #[test]
    fn nearest_closer_than_picks_minimum_distance() {
        let alts = MigrationAlternatives::new(vec![
            peer("s1", Position::new(100.0, 0.0, 0.0)),
            peer("s2", Position::new(10.0, 0.0, 0.0)),
        ]);
        let nearest = alts
            .nearest_closer_than(Position::new(0.0, 0.0, 0.0), 1_000.0)
            .unwrap();
        assert_eq!(nearest.postcode.scheduler(), "s2");
    }

    #[test]
    fn nearest_closer_than_excludes_farther_peers() {
        let alts = MigrationAlternatives::new(vec![peer("s1", Position::new(100.0, 0.0, 0.0))]);
        let nearest = alts.nearest_closer_than(Position::new(0.0, 0.0, 0.0), 50.0);
        assert!(nearest.is_none());
    }
}
