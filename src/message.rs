//! The message envelope and its body, §3.
//!
//! `Body` mirrors the host crate's `ActorMsg<Msg>` enum (`protocol.rs`):
//! a handful of built-in variants plus one variant, `User`, that carries an
//! opaque application payload. The opaque payload itself reuses the host
//! crate's `AnyMessage` pattern from `lib.rs` (a `Box<dyn Any + Send>` with
//! a checked `downcast`), since user message bodies here are not required
//! to share one static `Msg` type the way a single riker `ActorSystem<Msg>`
//! does -- this runtime migrates actors of many different user-defined
//! kinds through the same schedulers.

use std::any::Any;
use std::fmt;

use crate::actor::BoxActor;
use crate::address::{Address, PostCode};
use crate::position::Position;

/// A type-erased user payload, analogous to the host crate's `AnyMessage`.
pub struct UserPayload(Box<dyn Any + Send>);

impl UserPayload {
    pub fn new<T: Any + Send>(value: T) -> Self {
        UserPayload(Box::new(value))
    }

    /// Attempt to downcast to a concrete payload type by reference.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Consume the envelope, attempting to downcast to a concrete type.
    pub fn downcast<T: Any>(self) -> Result<T, UserPayload> {
        match self.0.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(original) => Err(UserPayload(original)),
        }
    }
}

impl fmt::Debug for UserPayload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("UserPayload(..)")
    }
}

/// The message body: built-in runtime kinds plus user payloads (§3).
pub enum Body {
    /// Requests that the receiving scheduler construct and install `actor`
    /// fresh, addressed with `target.box_id == BoxId::NULL` since no
    /// address exists for it yet. Used by `Host::spawn_on` to spawn from
    /// outside any actor; an actor spawning a child instead goes through
    /// `Service::spawn`, which calls `Scheduler::spawn` directly.
    Spawn(BoxActor),
    /// Requests that the addressed actor be removed from its scheduler.
    Die,
    /// Synthesized when a message targets an actor that has migrated or
    /// could not be routed. `old` is the stale address, `new` is the
    /// replacement (or `Address::null()` if unknown), `original` is the
    /// message that could not be delivered.
    RecipientMoved {
        old: Address,
        new: Address,
        original: Box<Envelope>,
    },
    /// Declares `postcode` as the cluster root (§4.2 `addpeers!`).
    ForceAddRoot(PostCode),
    /// A force packet nudging the target actor's position (§4.4).
    Infoton { source_pos: Position, energy: f32 },
    /// An actor's packaged user state in flight to a destination scheduler
    /// during migration (§4.5 step 2).
    Migrate(UserPayload),
    /// An application-defined payload, opaque to the core.
    User(UserPayload),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Body::Spawn(_) => f.write_str("Spawn(..)"),
            Body::Die => f.write_str("Die"),
            Body::RecipientMoved { old, new, .. } => {
                f.debug_struct("RecipientMoved").field("old", old).field("new", new).finish()
            }
            Body::ForceAddRoot(postcode) => f.debug_tuple("ForceAddRoot").field(postcode).finish(),
            Body::Infoton { source_pos, energy } => f
                .debug_struct("Infoton")
                .field("source_pos", source_pos)
                .field("energy", energy)
                .finish(),
            Body::Migrate(_) => f.write_str("Migrate(..)"),
            Body::User(payload) => fmt::Debug::fmt(payload, f),
        }
    }
}

/// The envelope that travels through mailboxes and inbound queues: `{sender,
/// target, body}` (§3).
#[derive(Debug)]
pub struct Envelope {
    pub sender: Address,
    pub target: Address,
    pub body: Body,
}

impl Envelope {
    pub fn new(sender: Address, target: Address, body: Body) -> Self {
        Envelope {
            sender,
            target,
            body,
        }
    }

    /// Build the `RecipientMoved` reply sent back to `original.sender` when
    /// `original` could not be routed to its target (§4.1 step 3, §7).
    pub fn recipient_moved(old: Address, new: Address, original: Envelope) -> Envelope {
        let sender = original.target.clone();
        let reply_target = original.sender.clone();
        Envelope::new(
            sender,
            reply_target,
            Body::RecipientMoved {
                old,
                new,
                original: Box::new(original),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_payload_roundtrips_through_downcast() {
        let payload = UserPayload::new(42u32);
        assert_eq!(payload.downcast_ref::<u32>(), Some(&42));
        let value = payload.downcast::<u32>().unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn user_payload_downcast_failure_returns_original() {
        let payload = UserPayload::new("hello".to_string());
        let err = payload.downcast::<u32>();
        assert!(err.is_err());
    }

    #[test]
    fn recipient_moved_swaps_sender_and_target() {
        let old = Address::new(PostCode::new("h", "s0"), crate::address::BoxId::NULL);
        let new = Address::new(PostCode::new("h", "s1"), crate::address::BoxId::NULL);
        let sender = Address::new(PostCode::new("h", "s2"), crate::address::BoxId::NULL);
        let original = Envelope::new(sender.clone(), old.clone(), Body::Die);
        let reply = Envelope::recipient_moved(old.clone(), new.clone(), original);
        assert_eq!(reply.target, sender);
        assert_eq!(reply.sender, old);
        match reply.body {
            Body::RecipientMoved { old: o, new: n, .. } => {
                assert_eq!(o, old);
                assert_eq!(n, new);
            }
            _ => panic!("expected RecipientMoved"),
        }
    }
}
