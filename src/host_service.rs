//! The inter-thread message router (§4.2).
//!
//! One `HostService` lives alongside each `Scheduler`. It owns the inbound
//! cross-thread queue that peer schedulers push into, and holds a peer
//! table (`PostCode` -> `Arc<HostService>`) used to find where to push a
//! message bound for another scheduler in the same process.
//!
//! The inbound queue uses a `parking_lot::Mutex` around a `VecDeque` rather
//! than a channel: the spec calls for a single lightweight mutual-exclusion
//! primitive guarding short critical sections (push one message, or pop up
//! to `drain_batch` into a local buffer), which is exactly what
//! `parking_lot::Mutex` is built for, and the peer table is a `DashMap` so
//! concurrent `remoteroutes` calls from many scheduler threads never
//! contend on a single lock, matching how the host crate's `Provider` uses
//! a `DashMap` for its path registry (`kernel/provider.rs`).

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use slog::{trace, Logger};

use crate::address::PostCode;
use crate::error::RoutingError;
use crate::message::Envelope;

/// A cloneable, thread-safe handle to a scheduler's `HostService`. Held by
/// peers in their own peer table and by `MigrationAlternatives` entries.
pub type HostServiceHandle = Arc<HostService>;

pub struct HostService {
    postcode: PostCode,
    inbound: Mutex<VecDeque<Envelope>>,
    peers: DashMap<PostCode, HostServiceHandle>,
    msg_buffer_size: usize,
    log: Logger,
}

impl HostService {
    pub fn new(postcode: PostCode, msg_buffer_size: usize, log: Logger) -> HostServiceHandle {
        Arc::new(HostService {
            postcode,
            inbound: Mutex::new(VecDeque::new()),
            peers: DashMap::new(),
            msg_buffer_size,
            log,
        })
    }

    pub fn postcode(&self) -> &PostCode {
        &self.postcode
    }

    /// Register every peer in `all` except `self` (§4.2 `addpeers!`).
    /// Idempotent: re-registering a known peer just overwrites its handle.
    pub fn add_peers(&self, all: &[HostServiceHandle]) {
        for peer in all {
            if peer.postcode != self.postcode {
                self.peers.insert(peer.postcode.clone(), peer.clone());
            }
        }
    }

    pub fn peer(&self, postcode: &PostCode) -> Option<HostServiceHandle> {
        self.peers.get(postcode).map(|entry| entry.value().clone())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Route `msg` for cross-thread delivery (§4.2 `remoteroutes`).
    ///
    /// (a) if the target's host part differs from ours, this component
    /// can't help (cross-host is out of scope); (b) look up the peer by the
    /// target's full `PostCode`; (c) push under the peer's lock and
    /// release it immediately -- no other lock is ever held while this one
    /// is, satisfying the "at most one peer lock at a time" rule (§5).
    ///
    /// On failure the envelope is handed back to the caller so it can be
    /// turned into a `RecipientMoved` reply instead of being dropped.
    pub fn remoteroutes(&self, msg: Envelope) -> Result<(), (RoutingError, Envelope)> {
        if !msg.target.postcode.same_host(&self.postcode) {
            return Err((RoutingError::UnknownHost, msg));
        }

        let peer = match self.peer(&msg.target.postcode) {
            Some(peer) => peer,
            None => return Err((RoutingError::UnknownPeer, msg)),
        };

        let mut inbound = peer.inbound.lock();
        if inbound.len() >= peer.msg_buffer_size {
            drop(inbound);
            return Err((RoutingError::QueueFull, msg));
        }
        let peer_postcode = peer.postcode.clone();
        inbound.push_back(msg);
        drop(inbound);

        trace!(self.log, "routed message to peer"; "peer" => %peer_postcode);
        Ok(())
    }

    /// Pop up to `batch` messages from our own inbound queue.
    ///
    /// Two-phase by construction: the lock is held only for the `VecDeque`
    /// drain, never across delivery. Callers (the owning `Scheduler`) are
    /// responsible for then calling `deliver!` on each popped envelope
    /// outside of any lock (§4.2 `letin_remote`).
    pub fn drain(&self, batch: usize) -> Vec<Envelope> {
        let mut inbound = self.inbound.lock();
        let take = batch.min(inbound.len());
        inbound.drain(..take).collect()
    }

    pub fn has_inbound(&self) -> bool {
        !self.inbound.lock().is_empty()
    }

    /// Push `msg` straight into this `HostService`'s own inbound queue,
    /// bypassing the peer-table lookup `remoteroutes` does. Used by `Host`
    /// to inject envelopes from outside any scheduler thread -- spawning an
    /// actor from setup code, the first `deliver!` into a running host, a
    /// shutdown signal -- none of which are a peer scheduler relaying a
    /// message on some other `HostService`'s behalf.
    pub fn push_direct(&self, msg: Envelope) -> Result<(), Envelope> {
        let mut inbound = self.inbound.lock();
        if inbound.len() >= self.msg_buffer_size {
            drop(inbound);
            return Err(msg);
        }
        inbound.push_back(msg);
        Ok(())
    }

    #[cfg(test)]
    pub fn inbound_len(&self) -> usize {
        self.inbound.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, BoxId};
    use crate::message::Body;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn envelope(target_host: &str) -> Envelope {
        Envelope::new(
            Address::null(),
            Address::new(PostCode::new(target_host, "s0"), BoxId::NULL),
            Body::Die,
        )
    }

    #[test]
    fn remoteroutes_rejects_different_host() {
        let hs = HostService::new(PostCode::new("proc-a", "s0"), 100, test_logger());
        let result = hs.remoteroutes(envelope("proc-b"));
        assert!(matches!(result, Err((RoutingError::UnknownHost, _))));
    }

    #[test]
    fn remoteroutes_rejects_unknown_peer() {
        let hs = HostService::new(PostCode::new("proc-a", "s0"), 100, test_logger());
        let result = hs.remoteroutes(envelope("proc-a"));
        assert!(matches!(result, Err((RoutingError::UnknownPeer, _))));
    }

    #[test]
    fn remoteroutes_pushes_into_peer_inbound() {
        let a = HostService::new(PostCode::new("proc-a", "s0"), 100, test_logger());
        let b = HostService::new(PostCode::new("proc-a", "s1"), 100, test_logger());
        a.add_peers(&[a.clone(), b.clone()]);

        let msg = Envelope::new(
            Address::null(),
            Address::new(PostCode::new("proc-a", "s1"), BoxId::NULL),
            Body::Die,
        );
        assert!(a.remoteroutes(msg).is_ok());
        assert_eq!(b.inbound_len(), 1);
    }

    #[test]
    fn drain_respects_batch_size_boundary() {
        let hs = HostService::new(PostCode::new("proc-a", "s0"), 100, test_logger());
        hs.add_peers(&[hs.clone()]);
        for _ in 0..31 {
            hs.remoteroutes(envelope("proc-a")).unwrap();
        }
        let first = hs.drain(30);
        assert_eq!(first.len(), 30);
        let second = hs.drain(30);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn add_peers_skips_self() {
        let a = HostService::new(PostCode::new("proc-a", "s0"), 100, test_logger());
        a.add_peers(&[a.clone()]);
        assert_eq!(a.peer_count(), 0);
    }

    #[test]
    fn remoteroutes_reports_queue_full() {
        let a = HostService::new(PostCode::new("proc-a", "s0"), 1, test_logger());
        let b = HostService::new(PostCode::new("proc-a", "s1"), 1, test_logger());
        a.add_peers(&[a.clone(), b.clone()]);

        let mk = || {
            Envelope::new(
                Address::null(),
                Address::new(PostCode::new("proc-a", "s1"), BoxId::NULL),
                Body::Die,
            )
        };
        assert!(a.remoteroutes(mk()).is_ok());
        assert!(matches!(a.remoteroutes(mk()), Err((RoutingError::QueueFull, _))));
    }
}
