//! The per-thread scheduler: directory, dispatch loop, and migration (§4).
//!
//! One `Scheduler` owns exactly one OS thread for its whole life. Its `run`
//! loop never suspends mid-`on_message`: dispatch is a plain synchronous
//! function call into the actor trait object, matching how the host crate's
//! `run_mailbox` drives one actor at a time off a `Dock<A>` rather than
//! scheduling cooperative tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use slog::{debug, o, trace, warn, Logger};

use crate::actor::{Actor, ActorCore, BoxActor, Service};
use crate::address::{Address, BoxId, BoxIdAllocator, PostCode};
use crate::config::Config;
use crate::error::{MigrationError, RoutingError, SpawnError};
use crate::host_service::{HostService, HostServiceHandle};
use crate::mailbox::Mailbox;
use crate::message::{Body, Envelope, UserPayload};
use crate::migration::{MigrationAlternatives, PeerInfo};
use crate::position::Position;
use crate::positioning;

struct ActorSlot {
    actor: BoxActor,
    core: ActorCore,
}

/// A resident actor's directory entry, or a forwarding pointer left behind
/// after it migrated away (§4.5 step 4, §7).
enum DirectoryEntry {
    Resident(ActorSlot),
    Forwarded(Address),
}

/// The user state carried inside a `Body::Migrate` envelope while an actor
/// is in flight between schedulers (§4.5 step 2).
struct MigratingActor {
    actor: BoxActor,
    position: Position,
}

/// One scheduler: a directory of resident actors, a local mailbox, and a
/// `HostService` for cross-thread routing (§3 "Scheduler").
pub struct Scheduler {
    postcode: PostCode,
    directory: HashMap<BoxId, DirectoryEntry>,
    /// Shared with every other scheduler in the same `Host` so a migrating
    /// actor keeps its `BoxId` unchanged when it moves to a new `PostCode`
    /// (§4.5 step 1).
    box_ids: Arc<BoxIdAllocator>,
    mailbox: Mailbox,
    host_service: HostServiceHandle,
    position: Position,
    config: Config,
    log: Logger,
    shutting_down: bool,
    /// Set by `Host::shutdown` from outside this scheduler's own thread;
    /// checked once per tick rather than driving `shutting_down` directly
    /// from another thread.
    shutdown_flag: Arc<AtomicBool>,
    /// Migrations requested by an actor against itself from inside its own
    /// `on_message` (via `Service::migrate_to_nearest`), queued here because
    /// the actor's trait object is detached from the directory for the
    /// duration of `run_hook` and cannot be the one shipped by
    /// `start_migration` until it is restored. Drained right after the hook
    /// that queued them returns.
    pending_self_migrations: Vec<(BoxId, PeerInfo)>,
    /// The other schedulers this one may migrate actors to, and the set
    /// consulted by the post-dispatch migration check (§4.1 step 1, §4.4).
    /// Populated by `Host::start` once every scheduler exists.
    alternatives: MigrationAlternatives,
}

/// Stand-in installed in an actor's directory slot for the duration of
/// `run_hook`, while the real actor is detached and passed to the hook
/// closure. Never dispatched to: `run_hook` always restores the real actor
/// before the directory entry could be looked up by anything else.
struct Tombstone;

impl Actor for Tombstone {
    fn on_message(&mut self, _core: &ActorCore, _body: Body, _service: &mut Service) {}
}

impl Scheduler {
    pub fn new(
        postcode: PostCode,
        position: Position,
        config: Config,
        log: Logger,
        box_ids: Arc<BoxIdAllocator>,
        shutdown_flag: Arc<AtomicBool>,
    ) -> Self {
        let log = log.new(o!("scheduler" => postcode.scheduler().to_string()));
        let host_service = HostService::new(postcode.clone(), config.msg_buffer_size, log.clone());
        Scheduler {
            postcode,
            directory: HashMap::new(),
            box_ids,
            mailbox: Mailbox::new(),
            host_service,
            position,
            config,
            log,
            shutting_down: false,
            shutdown_flag,
            pending_self_migrations: Vec::new(),
            alternatives: MigrationAlternatives::default(),
        }
    }

    /// Tell this scheduler which peers it may migrate actors to (§4.3 wiring,
    /// §4.4). Called once by `Host::start` after every scheduler exists.
    pub fn set_alternatives(&mut self, alternatives: MigrationAlternatives) {
        self.alternatives = alternatives;
    }

    pub fn postcode(&self) -> &PostCode {
        &self.postcode
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn host_service(&self) -> HostServiceHandle {
        self.host_service.clone()
    }

    pub fn peer_info(&self) -> PeerInfo {
        PeerInfo {
            postcode: self.postcode.clone(),
            position: self.position,
            host_service: self.host_service.clone(),
        }
    }

    pub fn actor_count(&self) -> usize {
        self.directory
            .values()
            .filter(|entry| matches!(entry, DirectoryEntry::Resident(_)))
            .count()
    }

    /// Spawn `actor` on this scheduler, running its `on_schedule` hook and
    /// installing it in the directory under a freshly allocated address
    /// (§4.1 `spawn`).
    pub fn spawn(&mut self, actor: BoxActor) -> Result<Address, SpawnError> {
        if self.shutting_down {
            return Err(SpawnError::ShuttingDown);
        }

        let box_id = self.box_ids.alloc();
        let address = Address::new(self.postcode.clone(), box_id);
        let spawn_pos = positioning::DefaultPositioner
            .spawn_position(self.position, self.config.view_size)
            .unwrap_or(self.position);
        let core = ActorCore::new(address.clone(), spawn_pos);

        self.directory
            .insert(box_id, DirectoryEntry::Resident(ActorSlot { actor, core }));
        self.run_hook(box_id, |actor, core, service| {
            actor.on_schedule(core, service);
        });

        trace!(self.log, "spawned actor"; "address" => %address);
        Ok(address)
    }

    /// Send `body` from `sender` to `target` (§4.1 `deliver!`).
    ///
    /// Local targets are pushed straight into this scheduler's mailbox;
    /// remote targets on the same host go through `HostService::remoteroutes`;
    /// anything that fails is turned into a `RecipientMoved` sent back to
    /// `sender`, never propagated to the caller (§7).
    pub fn deliver_from(&mut self, sender: Address, target: Address, body: Body) {
        self.deliver(Envelope::new(sender, target, body));
    }

    fn deliver(&mut self, envelope: Envelope) {
        if envelope.target.postcode == self.postcode {
            self.mailbox.push(envelope);
            return;
        }

        if let Err((_cause, envelope)) = self.host_service.remoteroutes(envelope) {
            self.bounce(envelope);
        }
    }

    /// Reply to `envelope.sender` with `RecipientMoved { old: envelope.target,
    /// new: Address::null() }` (§7). The reply is delivered the same way any
    /// other message would be: local push or remote route.
    ///
    /// Only done when the sender is known (§4.1 step 3, "if sender is known
    /// and local"): messages injected from outside any actor (`Host::deliver`,
    /// the synthetic `Die` broadcast on shutdown) carry `Address::null()` as
    /// their sender, and a reply to that address would itself fail to route
    /// and bounce again, forever. A `RecipientMoved` that itself could not be
    /// delivered is dropped rather than re-bounced, for the same reason.
    fn bounce(&mut self, envelope: Envelope) {
        let old = envelope.target.clone();
        if envelope.sender.is_null() || matches!(envelope.body, Body::RecipientMoved { .. }) {
            trace!(self.log, "dropped undeliverable message with no sender to notify"; "target" => %old);
            return;
        }
        warn!(self.log, "could not route message, bouncing"; "target" => %old);
        let reply = Envelope::recipient_moved(old, Address::null(), envelope);
        self.deliver(reply);
    }

    /// One iteration of the dispatch loop (§4.1 steps 1-3): drain up to
    /// `drain_batch` inbound cross-thread messages into the mailbox, then
    /// pop and dispatch everything currently in the mailbox.
    fn tick(&mut self) {
        for envelope in self.host_service.drain(self.config.drain_batch) {
            self.mailbox.push(envelope);
        }

        while let Some(envelope) = self.mailbox.pop() {
            self.dispatch(envelope);
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let Envelope { sender, target, body } = envelope;

        if target.postcode != self.postcode {
            self.deliver(Envelope::new(sender, target, body));
            return;
        }

        if let Body::Migrate(payload) = body {
            self.accept_migration(target.box_id, payload);
            return;
        }

        // A spawn requested from outside any actor (`Host::spawn_on`): the
        // envelope targets `BoxId::NULL` since no actor exists yet to
        // address it to.
        if let Body::Spawn(actor) = body {
            let _ = self.spawn(actor);
            return;
        }

        match self.directory.get(&target.box_id) {
            None => {
                self.bounce(Envelope::new(sender, target, body));
            }
            Some(DirectoryEntry::Forwarded(new)) => {
                let new = new.clone();
                let original = Envelope::new(sender, target.clone(), body);
                let reply = Envelope::recipient_moved(target, new, original);
                self.deliver(reply);
            }
            Some(DirectoryEntry::Resident(_)) => {
                let addr = Address::new(self.postcode.clone(), target.box_id);
                let dies = matches!(body, Body::Die);
                self.run_hook(target.box_id, |actor, core, service| {
                    actor.on_message(core, body, service);
                });
                if dies {
                    // §3 "destroyed by Die": the actor still gets its
                    // synthetic Die delivered through on_message above for
                    // any teardown logic, then the core removes it.
                    self.directory.remove(&target.box_id);
                    trace!(self.log, "actor died"; "address" => %addr);
                } else {
                    self.apply_scheduler_infoton(&addr);
                    let alternatives = self.alternatives.clone();
                    self.migrate_to_nearest(&addr, &alternatives);
                }
            }
        }
    }

    /// §4.1 step 1, second half: after `on_message` returns, apply the
    /// scheduler's own infoton to the actor it just dispatched to (§4.4
    /// "Scheduler infoton"). A no-op if the actor migrated away or was
    /// removed from inside its own `on_message`.
    fn apply_scheduler_infoton(&mut self, addr: &Address) {
        let energy = self.scheduler_infoton_energy();
        let source_pos = self.position;
        self.infoton(addr.box_id, source_pos, energy);
    }

    /// Take the actor's trait object out of its directory slot, run `f` with
    /// a `Service` borrowing `self`, then restore it. Mirrors the host
    /// crate's `Dock<A>` take-then-restore pattern (`kernel/mailbox.rs`), with
    /// one difference: only the `actor` field is detached (swapped for a
    /// `Tombstone` placeholder), not the whole slot. The `core` stays
    /// resident throughout, so a hook that looks up its own address --
    /// `Service::core_of(&self.me)`, `Service::migrate_to_nearest` -- still
    /// finds a `Resident` entry for `box_id` instead of nothing.
    fn run_hook(&mut self, box_id: BoxId, f: impl FnOnce(&mut BoxActor, &ActorCore, &mut Service)) {
        let mut actor = match self.directory.get_mut(&box_id) {
            Some(DirectoryEntry::Resident(slot)) => std::mem::replace(&mut slot.actor, Box::new(Tombstone)),
            _ => return,
        };

        let core = match self.directory.get(&box_id) {
            Some(DirectoryEntry::Resident(slot)) => slot.core.clone(),
            _ => unreachable!("just confirmed resident above"),
        };

        let address = Address::new(self.postcode.clone(), box_id);
        {
            let mut service = Service::new(self, address);
            f(&mut actor, &core, &mut service);
        }

        if let Some(DirectoryEntry::Resident(slot)) = self.directory.get_mut(&box_id) {
            slot.actor = actor;
        }

        // Only drain the request this exact hook invocation may have queued
        // for itself -- a nested run_hook (e.g. a spawned actor's
        // on_schedule, invoked from this hook's Service::spawn) may leave
        // its own caller's request queued, to be drained when that
        // caller's run_hook frame unwinds and restores its own actor.
        if let Some(pos) = self
            .pending_self_migrations
            .iter()
            .position(|(id, _)| *id == box_id)
        {
            let (_, destination) = self.pending_self_migrations.remove(pos);
            self.start_migration(box_id, destination);
        }
    }

    /// Read back an actor's current `ActorCore`, if it is still resident
    /// here (§6 `core_of`).
    pub fn core_of(&self, addr: &Address) -> Option<ActorCore> {
        if addr.postcode != self.postcode {
            return None;
        }
        match self.directory.get(&addr.box_id) {
            Some(DirectoryEntry::Resident(slot)) => Some(slot.core.clone()),
            _ => None,
        }
    }

    fn set_position_of(&mut self, box_id: BoxId, position: Position) {
        if let Some(DirectoryEntry::Resident(slot)) = self.directory.get_mut(&box_id) {
            slot.core.set_position(position);
        }
    }

    /// Deliver an infoton force packet to a resident actor, updating its
    /// position via the actor's own (possibly overridden)
    /// `Actor::apply_infoton` (§4.4).
    pub fn infoton(&mut self, target: BoxId, source_pos: Position, energy: f32) {
        let target_distance = self.config.target_distance;
        let coupling = self.config.infoton_coupling;
        let new_pos = match self.directory.get(&target) {
            Some(DirectoryEntry::Resident(slot)) => Some(
                slot.actor
                    .apply_infoton(&slot.core, source_pos, energy, target_distance, coupling),
            ),
            _ => None,
        };
        if let Some(pos) = new_pos {
            self.set_position_of(target, pos);
        }
    }

    /// Evaluate the scheduler-infoton policy against this scheduler's own
    /// actor count (§4.4 "Scheduler infoton").
    pub fn scheduler_infoton_energy(&self) -> f32 {
        positioning::default_scheduler_infoton(
            self.config.target_actor_count,
            self.actor_count(),
            self.config.scheduler_infoton_coefficient,
        )
    }

    /// Consult `alternatives` and migrate the actor at `addr` to the
    /// nearest one strictly closer than this scheduler, if its
    /// `check_migration` hook says to (§4.4, §4.5). Returns `true` if
    /// migration was initiated.
    ///
    /// Calls `Actor::check_migration` on the resident trait object, so this
    /// must only be called between ticks (the scheduler's own migration
    /// sweep), never from inside `run_hook` -- a hook's own actor is
    /// detached from the directory for its duration, so `addr == self.me`
    /// would find no resident entry to consult. Actor-initiated migration
    /// from within `on_message` goes through [`Service::migrate_to_nearest`]
    /// instead, which calls [`Scheduler::request_migration`].
    pub fn migrate_to_nearest(&mut self, addr: &Address, alternatives: &MigrationAlternatives) -> bool {
        if addr.postcode != self.postcode {
            return false;
        }

        let migration_distance = self.config.migration_distance;
        let decision = match self.directory.get(&addr.box_id) {
            Some(DirectoryEntry::Resident(slot)) => {
                let own_distance = slot.core.position().distance(&self.position);
                slot.actor
                    .check_migration(&slot.core, own_distance, alternatives, migration_distance)
                    .map(|_| (slot.core.position(), own_distance))
            }
            _ => None,
        };
        let (actor_pos, own_distance) = match decision {
            Some(d) => d,
            None => return false,
        };

        let destination = match alternatives.nearest_closer_than(actor_pos, own_distance) {
            Some(peer) => peer.clone(),
            None => return false,
        };

        self.start_migration(addr.box_id, destination)
    }

    /// The actor-initiated counterpart of [`Scheduler::migrate_to_nearest`],
    /// called via `Service::migrate_to_nearest` from inside the calling
    /// actor's own `on_message`. Does not consult `Actor::check_migration`
    /// (the actor calling this has already decided); it only applies the
    /// distance threshold and queues the mechanical move for execution once
    /// `run_hook` restores the actor to the directory. Returns `true` if a
    /// migration was queued.
    pub(crate) fn request_migration(&mut self, addr: &Address, alternatives: &MigrationAlternatives) -> bool {
        if addr.postcode != self.postcode {
            return false;
        }

        let actor_pos = match self.directory.get(&addr.box_id) {
            Some(DirectoryEntry::Resident(slot)) => slot.core.position(),
            _ => return false,
        };
        let own_distance = actor_pos.distance(&self.position);
        if own_distance <= self.config.migration_distance {
            return false;
        }

        let destination = match alternatives.nearest_closer_than(actor_pos, own_distance) {
            Some(peer) => peer.clone(),
            None => return false,
        };

        self.pending_self_migrations.push((addr.box_id, destination));
        true
    }

    /// The migration handoff (§4.5): remove the actor from this scheduler's
    /// directory, pack its user state and position into a `Migrate`
    /// envelope, push it to the destination's `HostService`, and leave a
    /// forwarding entry behind so in-flight messages can be redirected
    /// (§7). On routing failure the actor is reinserted here unchanged.
    fn start_migration(&mut self, box_id: BoxId, destination: PeerInfo) -> bool {
        let slot = match self.directory.remove(&box_id) {
            Some(DirectoryEntry::Resident(slot)) => slot,
            other => {
                if let Some(entry) = other {
                    self.directory.insert(box_id, entry);
                }
                return false;
            }
        };

        let old_address = slot.core.address().clone();
        let new_address = Address::new(destination.postcode.clone(), box_id);
        let position = slot.core.position();
        let payload = UserPayload::new(MigratingActor { actor: slot.actor, position });
        let envelope = Envelope::new(old_address.clone(), new_address.clone(), Body::Migrate(payload));

        // Pushed straight into the destination's own inbound queue: this is
        // S handing D's HostService a message on D's own behalf, not asking
        // some third HostService to relay via its peer table, so
        // `push_direct` is used rather than `remoteroutes`.
        match destination.host_service.push_direct(envelope) {
            Ok(()) => {
                debug!(self.log, "migrated actor"; "from" => %old_address, "to" => %new_address);
                self.directory.insert(box_id, DirectoryEntry::Forwarded(new_address));
                true
            }
            Err(envelope) => {
                let err = MigrationError::DestinationUnreachable(RoutingError::QueueFull);
                warn!(self.log, "migration aborted, actor reinserted"; "address" => %old_address, "cause" => %err);
                if let Body::Migrate(payload) = envelope.body {
                    if let Ok(migrating) = payload.downcast::<MigratingActor>() {
                        self.directory.insert(
                            box_id,
                            DirectoryEntry::Resident(ActorSlot {
                                actor: migrating.actor,
                                core: ActorCore::new(old_address, migrating.position),
                            }),
                        );
                    }
                }
                false
            }
        }
    }

    /// Install an actor landing here via `start_migration` (§4.5 step 3):
    /// gives it a fresh `on_schedule` call at its pre-migration position.
    fn accept_migration(&mut self, box_id: BoxId, payload: UserPayload) {
        let migrating = match payload.downcast::<MigratingActor>() {
            Ok(migrating) => migrating,
            Err(_) => {
                warn!(self.log, "dropped malformed migration payload"; "box_id" => %box_id);
                return;
            }
        };

        let address = Address::new(self.postcode.clone(), box_id);
        let core = ActorCore::new(address.clone(), migrating.position);
        self.directory.insert(
            box_id,
            DirectoryEntry::Resident(ActorSlot { actor: migrating.actor, core }),
        );
        self.run_hook(box_id, |actor, core, service| {
            actor.on_schedule(core, service);
        });
        trace!(self.log, "received migrated actor"; "address" => %address);
    }

    /// Run the scheduler's loop until told to stop. `exit_when_done` mirrors
    /// §4.3: when set, the loop exits once both queues are empty instead of
    /// parking forever (used by tests and by `shutdown!`).
    pub fn run(&mut self, exit_when_done: bool) {
        loop {
            self.tick();

            if self.shutdown_flag.load(Ordering::Relaxed) {
                self.shutdown();
            }

            let idle = self.mailbox.is_empty() && !self.host_service.has_inbound();
            if idle && (self.shutting_down || exit_when_done) {
                break;
            }
            if !exit_when_done {
                std::thread::yield_now();
            }
        }
    }

    /// Flag the loop to drain and exit, delivering a synthetic `Die` to every
    /// currently resident actor first, in arbitrary order (§4.1 `shutdown!`,
    /// §7 "Shutdown during dispatch"). Idempotent: a second call is a no-op.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        let resident: Vec<BoxId> = self
            .directory
            .iter()
            .filter(|(_, entry)| matches!(entry, DirectoryEntry::Resident(_)))
            .map(|(box_id, _)| *box_id)
            .collect();
        for box_id in resident {
            let addr = Address::new(self.postcode.clone(), box_id);
            self.mailbox.push(Envelope::new(Address::null(), addr, Body::Die));
        }
    }
}
