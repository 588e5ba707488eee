//! The `service` handle passed to every actor hook (§6 "Service API exposed
//! to actor code").
//!
//! Mirrors how the host crate always threads an explicit `Context`/`ActorRef`
//! into hooks rather than relying on thread-local or process-wide "current
//! actor system" state (§§6, 9). `Service` borrows the owning scheduler for
//! the duration of one hook invocation.

use crate::actor::{ActorCore, BoxActor};
use crate::address::Address;
use crate::error::SpawnError;
use crate::message::Body;
use crate::migration::MigrationAlternatives;
use crate::position::Position;
use crate::scheduler::Scheduler;

pub struct Service<'a> {
    scheduler: &'a mut Scheduler,
    me: Address,
}

impl<'a> Service<'a> {
    pub(crate) fn new(scheduler: &'a mut Scheduler, me: Address) -> Self {
        Service { scheduler, me }
    }

    /// Spawn `actor` on the owning scheduler, returning its fresh address
    /// (§4.1 `spawn`).
    pub fn spawn(&mut self, actor: BoxActor) -> Result<Address, SpawnError> {
        self.scheduler.spawn(actor)
    }

    /// Send `body` to `target`. If `target` is local it is enqueued
    /// directly; otherwise it is handed to the scheduler's `HostService`
    /// (§4.1 `deliver!`).
    ///
    /// `energy_override`, when `Some`, additionally applies an infoton force
    /// packet to `target` from this scheduler's position with the given
    /// energy, in place of waiting for the target's own scheduler to apply
    /// its default post-dispatch infoton (§4.4, §6). Only has an effect when
    /// `target` is resident on this same scheduler; a `target` that lives
    /// elsewhere receives the infoton its own scheduler would normally
    /// apply after dispatch, same as any other send.
    pub fn send(&mut self, target: Address, body: Body, energy_override: Option<f32>) {
        if let Some(energy) = energy_override {
            let source_pos = self.scheduler.position();
            self.scheduler.infoton(target.box_id, source_pos, energy);
        }
        self.scheduler.deliver_from(self.me.clone(), target, body);
    }

    /// This actor's own address.
    pub fn addr(&self) -> Address {
        self.me.clone()
    }

    /// The owning scheduler's current position.
    pub fn pos(&self) -> Position {
        self.scheduler.position()
    }

    /// Request migration of the calling actor to the nearest scheduler in
    /// `alternatives` that is strictly closer to the actor's current
    /// position than the current scheduler (§4.4 "Migration check", §4.5).
    /// The move itself happens once this hook returns (the actor is mid-call
    /// here and cannot be the one shipped yet); returns `true` if a
    /// migration was queued.
    pub fn migrate_to_nearest(&mut self, alternatives: &MigrationAlternatives) -> bool {
        self.scheduler.request_migration(&self.me, alternatives)
    }

    /// Access to the current actor's runtime bookkeeping, when a hook needs
    /// to read it back (e.g. after `apply_infoton`).
    pub fn core_of(&self, addr: &Address) -> Option<ActorCore> {
        self.scheduler.core_of(addr)
    }
}
