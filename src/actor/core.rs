//! The `core` slot: runtime bookkeeping carried alongside every actor's
//! user state (§3 "Actor record").

use crate::address::Address;
use crate::position::Position;

/// Opaque-to-user-code bookkeeping the scheduler attaches to every resident
/// actor: its address and current position. Passed by reference into every
/// `Actor` hook instead of being embedded in user state, so user structs
/// stay plain data (§6: "a `core` slot (opaque to user code)").
#[derive(Clone, Debug)]
pub struct ActorCore {
    address: Address,
    position: Position,
}

impl ActorCore {
    pub(crate) fn new(address: Address, position: Position) -> Self {
        ActorCore { address, position }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}
