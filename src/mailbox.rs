//! A scheduler's local, single-consumer message queue (§3 "Mailbox").
//!
//! Unlike `HostService`'s inbound queue, the mailbox needs no locking: the
//! only producers are the owning scheduler itself (local self-sends) and
//! that same scheduler's own drain step, so it is always pushed to and
//! popped from the same OS thread.

use std::collections::VecDeque;

use crate::message::Envelope;

#[derive(Default)]
pub struct Mailbox {
    queue: VecDeque<Envelope>,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, envelope: Envelope) {
        self.queue.push_back(envelope);
    }

    pub fn pop(&mut self) -> Option<Envelope> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::message::Body;

    #[test]
    fn fifo_order_preserved() {
        let mut mbox = Mailbox::new();
        for i in 0..5u64 {
            mbox.push(Envelope::new(
                Address::null(),
                Address::null(),
                Body::Infoton {
                    source_pos: crate::position::Position::ORIGIN,
                    energy: i as f32,
                },
            ));
        }
        let mut seen = Vec::new();
        while let Some(env) = mbox.pop() {
            if let Body::Infoton { energy, .. } = env.body {
                seen.push(energy as u64);
            }
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_mailbox_pops_none() {
        let mut mbox = Mailbox::new();
        assert!(mbox.is_empty());
        assert!(mbox.pop().is_none());
    }
}
