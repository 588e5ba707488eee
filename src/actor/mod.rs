//! The actor author contract (§6).
//!
//! Mirrors the shape of the host crate's `Actor` trait in `actor.rs`: a
//! small set of lifecycle hooks with sensible defaults, plus one mandatory
//! message handler. Unlike the host crate, `Msg` is not a per-system generic
//! parameter -- actors here receive the runtime's own [`Body`](crate::message::Body)
//! and downcast [`UserPayload`](crate::message::UserPayload) themselves,
//! since a single `Host` runs many different actor kinds side by side and
//! migrates them between schedulers.

mod core;
mod service;

pub use self::core::ActorCore;
pub use self::service::Service;

use crate::message::Body;
use crate::migration::MigrationAlternatives;
use crate::position::Position;

/// The actor trait object stored in a scheduler's directory.
pub type BoxActor = Box<dyn Actor>;

/// User-defined state plus behavior, resident on exactly one scheduler at a
/// time (§3 "Actor record").
pub trait Actor: Send {
    /// Invoked once after the actor is installed in a scheduler's
    /// directory, whether by `spawn` or by migration landing (§4.5 step 3).
    fn on_schedule(&mut self, _core: &ActorCore, _service: &mut Service) {}

    /// Invoked for every message addressed to this actor, including
    /// built-in bodies the actor chooses to act on (`RecipientMoved` is
    /// delivered here too, so actors can implement the default
    /// update-and-resend handler from §6).
    fn on_message(&mut self, core: &ActorCore, body: Body, service: &mut Service);

    /// Optional hook exposing extra state for observability. Returns
    /// `None` by default (§6 "optionally `monitorextra`").
    fn monitor_extra(&self) -> Option<String> {
        None
    }

    /// Decide whether this actor should migrate given its current position
    /// and the alternatives known to the scheduler (§4.4 "Migration
    /// check"). `own_distance` is how far the actor currently sits from its
    /// own scheduler's position, `migration_distance` is the configured
    /// threshold beyond which a nearer peer is worth looking for. The
    /// default implementation is
    /// [`crate::positioning::default_check_migration_with`]; actors may
    /// override it to opt out of migration or use a different policy.
    fn check_migration(
        &self,
        core: &ActorCore,
        own_distance: f32,
        alternatives: &MigrationAlternatives,
        migration_distance: f32,
    ) -> Option<Position> {
        crate::positioning::default_check_migration_with(core, own_distance, alternatives, migration_distance)
    }

    /// Apply an infoton force packet to this actor's position (§4.4), using
    /// the configured `target_distance` and `coupling` constants. The
    /// default implementation is [`crate::positioning::apply_infoton_with`].
    fn apply_infoton(
        &self,
        core: &ActorCore,
        source_pos: Position,
        energy: f32,
        target_distance: f32,
        coupling: f32,
    ) -> Position {
        crate::positioning::apply_infoton_with(core.position(), source_pos, energy, target_distance, coupling)
    }
}
