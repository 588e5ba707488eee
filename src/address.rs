//! Identity primitives: [`PostCode`], [`BoxId`] and [`Address`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A scheduler's logical address within a host.
///
/// Carries two logical fields per §3: a network-host part (the OS process
/// or remote host) and a scheduler-local part (which scheduler within that
/// host). Two `PostCode`s with equal `host` are co-located in the same
/// process; equal in full, the same scheduler.
///
/// Represented as a plain struct rather than a parsed string: the host part
/// and the scheduler part are both needed on the hot routing path
/// (`HostService::remoteroutes` compares `host` before ever consulting the
/// peer table), so carrying them pre-split avoids re-parsing on every send.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PostCode {
    host: String,
    scheduler: String,
}

impl PostCode {
    /// Build a `PostCode` for `scheduler` within `host`.
    pub fn new(host: impl Into<String>, scheduler: impl Into<String>) -> Self {
        PostCode {
            host: host.into(),
            scheduler: scheduler.into(),
        }
    }

    /// The network-host part (process/remote host identity).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The scheduler-local part.
    pub fn scheduler(&self) -> &str {
        &self.scheduler
    }

    /// True if `self` and `other` name schedulers in the same process.
    pub fn same_host(&self, other: &PostCode) -> bool {
        self.host == other.host
    }

    /// The empty sentinel `PostCode`, used by [`Address::null`].
    pub fn empty() -> Self {
        PostCode {
            host: String::new(),
            scheduler: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.scheduler.is_empty()
    }
}

impl fmt::Debug for PostCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.scheduler)
    }
}

impl fmt::Display for PostCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A 64-bit identifier unique within a scheduler for that scheduler's
/// lifetime.
///
/// Named `BoxId` rather than `Box` to avoid shadowing `std::boxed::Box`;
/// the spec's glossary term "Box" survives in the accessor names and in
/// comments.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct BoxId(u64);

impl BoxId {
    /// The null box id (paired with [`PostCode::empty`] to form
    /// [`Address::null`]).
    pub const NULL: BoxId = BoxId(0);

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocator for fresh [`BoxId`]s.
///
/// Shared via `Arc` across every `Scheduler` in a `Host` so a `BoxId` stays
/// unique host-wide: a migrating actor keeps the same `BoxId` when it moves
/// to a new `PostCode` (§4.5 step 1). Ids start at 1 so `BoxId::NULL` (0)
/// never collides with a real actor.
#[derive(Debug, Default)]
pub struct BoxIdAllocator {
    next: AtomicU64,
}

impl BoxIdAllocator {
    pub fn new() -> Self {
        BoxIdAllocator {
            next: AtomicU64::new(1),
        }
    }

    pub fn alloc(&self) -> BoxId {
        BoxId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// A globally unique actor identifier: `(PostCode, BoxId)`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Address {
    pub postcode: PostCode,
    pub box_id: BoxId,
}

impl Address {
    pub fn new(postcode: PostCode, box_id: BoxId) -> Self {
        Address { postcode, box_id }
    }

    /// The null address sentinel: empty `PostCode`, zero `BoxId`.
    pub fn null() -> Self {
        Address {
            postcode: PostCode::empty(),
            box_id: BoxId::NULL,
        }
    }

    pub fn is_null(&self) -> bool {
        self.postcode.is_empty() && self.box_id == BoxId::NULL
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.postcode, self.box_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_address_is_empty_postcode_and_zero_box() {
        let addr = Address::null();
        assert!(addr.postcode.is_empty());
        assert_eq!(addr.box_id, BoxId::NULL);
        assert!(addr.is_null());
    }

    #[test]
    fn equality_is_by_both_fields() {
        let a = Address::new(PostCode::new("h1", "s1"), BoxId(1).clone());
        let b = Address::new(PostCode::new("h1", "s1"), BoxId(1).clone());
        let c = Address::new(PostCode::new("h1", "s2"), BoxId(1).clone());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn postcode_same_host_compares_host_part_only() {
        let p1 = PostCode::new("proc-1", "sched-0");
        let p2 = PostCode::new("proc-1", "sched-1");
        let p3 = PostCode::new("proc-2", "sched-0");
        assert!(p1.same_host(&p2));
        assert!(!p1.same_host(&p3));
    }

    #[test]
    fn allocator_never_hands_out_null_box_id() {
        let alloc = BoxIdAllocator::new();
        for _ in 0..5 {
            assert_ne!(alloc.alloc(), BoxId::NULL);
        }
    }
}
