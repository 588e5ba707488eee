use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use meshactor::prelude::*;
use meshactor::address::BoxIdAllocator;
use meshactor::scheduler::Scheduler;

fn discard_log() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

fn fresh_scheduler() -> Scheduler {
    Scheduler::new(
        PostCode::new("proc-tree", "s0"),
        Position::ORIGIN,
        Config::default(),
        discard_log(),
        Arc::new(BoxIdAllocator::new()),
        Arc::new(AtomicBool::new(false)),
    )
}

struct Grow;

/// One node of a perfect binary tree: spawns two children one level
/// shallower than itself on `on_schedule`, until `depth_remaining` hits zero.
struct TreeActor {
    depth_remaining: u32,
    spawned: Arc<AtomicUsize>,
}

impl Actor for TreeActor {
    fn on_schedule(&mut self, _core: &ActorCore, _service: &mut Service) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
    }

    fn on_message(&mut self, _core: &ActorCore, body: Body, service: &mut Service) {
        let is_grow = matches!(&body, Body::User(payload) if payload.downcast_ref::<Grow>().is_some());
        if self.depth_remaining == 0 || !is_grow {
            return;
        }
        for _ in 0..2 {
            let child = TreeActor {
                depth_remaining: self.depth_remaining - 1,
                spawned: self.spawned.clone(),
            };
            if let Ok(addr) = service.spawn(Box::new(child)) {
                service.send(addr, Body::User(UserPayload::new(Grow)), None);
            }
        }
    }
}

/// A full 18-level binary tree (root at depth 0 through leaves at depth 17)
/// holds 2^18 - 1 nodes. The root's `on_schedule` counts itself; every
/// subsequent level is driven entirely by `Grow` messages cascading through
/// one scheduler's mailbox within a single `tick`.
#[test]
fn actor_tree_grows_to_the_full_node_count() {
    let mut sched = fresh_scheduler();
    let spawned = Arc::new(AtomicUsize::new(0));

    let root = sched
        .spawn(Box::new(TreeActor {
            depth_remaining: 17,
            spawned: spawned.clone(),
        }))
        .unwrap();
    sched.deliver_from(Address::null(), root, Body::User(UserPayload::new(Grow)));

    // `run(true)` drains the whole cascade: every spawned child's `Grow`
    // message is pushed into the same mailbox the dispatch loop keeps
    // draining, and the loop only exits once both queues are empty.
    sched.run(true);

    assert_eq!(spawned.load(Ordering::SeqCst), (1usize << 18) - 1);
}
