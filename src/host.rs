//! `Host`: the top-level coordinator owning every scheduler in one process
//! (§4.3).
//!
//! Mirrors the host crate's `ActorSystem`: a thin object that does not run
//! actor code itself, only owns the OS threads and the shared state every
//! `Scheduler` needs to find its peers -- the `HostService` peer table and
//! the host-wide `BoxIdAllocator` that lets a migrating actor keep its `Box`
//! across a move (§4.5 step 1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use slog::{info, Logger};

use crate::actor::BoxActor;
use crate::address::{Address, BoxId, BoxIdAllocator, PostCode};
use crate::config::Config;
use crate::error::HostError;
use crate::host_service::HostServiceHandle;
use crate::message::{Body, Envelope};
use crate::migration::{MigrationAlternatives, PeerInfo};
use crate::positioning;
use crate::scheduler::Scheduler;

/// One process's worth of schedulers, wired together at startup (§4.3
/// steps 1-2, `addpeers!`).
pub struct Host {
    host_services: Vec<HostServiceHandle>,
    shutdown_flags: Vec<Arc<AtomicBool>>,
    threads: Vec<JoinHandle<()>>,
    log: Logger,
}

impl Host {
    /// Start `scheduler_count` schedulers, each on its own OS thread, all
    /// sharing one `BoxIdAllocator` and knowing about every other (§4.3).
    /// Scheduler 0 is the zygote root: it sits at the origin; every other
    /// scheduler gets a positioner-assigned offset (§4.4 "Scheduler
    /// position"). When `config.startup_stagger` is set, each thread after
    /// the first is started a few milliseconds after the previous one
    /// rather than all at once.
    ///
    /// Returns [`HostError::ThreadSpawnFailed`] if the OS refuses to spawn
    /// one of the scheduler threads; any threads already started are
    /// signaled to shut down and joined before the error is returned, so a
    /// failed start never leaks running schedulers.
    pub fn start(
        host_id: impl Into<String>,
        scheduler_count: usize,
        config: Config,
        log: Logger,
    ) -> Result<Host, HostError> {
        assert!(scheduler_count > 0, "a host needs at least one scheduler");

        let host_id = host_id.into();
        let box_ids = Arc::new(BoxIdAllocator::new());

        let mut schedulers = Vec::with_capacity(scheduler_count);
        let mut shutdown_flags = Vec::with_capacity(scheduler_count);
        for i in 0..scheduler_count {
            let postcode = PostCode::new(host_id.clone(), format!("s{}", i));
            let is_root = i == 0;
            let position = positioning::scheduler_position(is_root, i as u64, &postcode, config.view_size);
            let shutdown_flag = Arc::new(AtomicBool::new(false));
            schedulers.push(Scheduler::new(
                postcode,
                position,
                config.clone(),
                log.clone(),
                box_ids.clone(),
                shutdown_flag.clone(),
            ));
            shutdown_flags.push(shutdown_flag);
        }

        let host_services: Vec<HostServiceHandle> = schedulers.iter().map(Scheduler::host_service).collect();
        for hs in &host_services {
            hs.add_peers(&host_services);
        }

        let all_peer_info: Vec<PeerInfo> = schedulers.iter().map(Scheduler::peer_info).collect();
        for scheduler in &mut schedulers {
            let own_postcode = scheduler.postcode().clone();
            let others: Vec<PeerInfo> = all_peer_info
                .iter()
                .filter(|peer| peer.postcode != own_postcode)
                .cloned()
                .collect();
            scheduler.set_alternatives(MigrationAlternatives::new(others));
        }

        let mut threads = Vec::with_capacity(scheduler_count);
        for (i, mut scheduler) in schedulers.into_iter().enumerate() {
            if config.startup_stagger && i > 0 {
                thread::sleep(Duration::from_millis(5 * i as u64));
            }
            let spawned = thread::Builder::new()
                .name(format!("scheduler-{}", i))
                .spawn(move || scheduler.run(false));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(cause) => {
                    for flag in &shutdown_flags {
                        flag.store(true, Ordering::Relaxed);
                    }
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(HostError::ThreadSpawnFailed(cause));
                }
            }
        }

        info!(log, "host started"; "host_id" => %host_id, "schedulers" => scheduler_count);
        Ok(Host {
            host_services,
            shutdown_flags,
            threads,
            log,
        })
    }

    /// Every scheduler's `PostCode`, in index order (index 0 is the root).
    pub fn postcodes(&self) -> Vec<PostCode> {
        self.host_services.iter().map(|hs| hs.postcode().clone()).collect()
    }

    pub fn root_postcode(&self) -> PostCode {
        self.host_services[0].postcode().clone()
    }

    /// Install `actor` fresh on the scheduler named by `postcode`, to be
    /// picked up the next time that scheduler drains its inbound queue
    /// (§4.1 `spawn`, invoked here from outside any actor).
    pub fn spawn_on(&self, postcode: &PostCode, actor: BoxActor) {
        let target = Address::new(postcode.clone(), BoxId::NULL);
        self.inject(Envelope::new(Address::null(), target, Body::Spawn(actor)));
    }

    /// Send `body` to `target` from outside any actor (§4.1 `deliver!`).
    pub fn deliver(&self, target: Address, body: Body) {
        self.inject(Envelope::new(Address::null(), target, body));
    }

    fn inject(&self, envelope: Envelope) {
        match self
            .host_services
            .iter()
            .find(|hs| *hs.postcode() == envelope.target.postcode)
        {
            Some(hs) => {
                if hs.push_direct(envelope).is_err() {
                    slog::warn!(self.log, "dropped message, destination inbound queue full"; "postcode" => %hs.postcode());
                }
            }
            None => slog::warn!(self.log, "dropped message, unknown postcode"; "postcode" => %envelope.target.postcode),
        }
    }

    /// Signal every scheduler to drain and exit (§4.3 `shutdown!`), then
    /// join all of their threads.
    pub fn shutdown(self) {
        for flag in &self.shutdown_flags {
            flag.store(true, Ordering::Relaxed);
        }
        for handle in self.threads {
            let _ = handle.join();
        }
        info!(self.log, "host shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, ActorCore, Service};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Counter(Arc<AtomicUsize>);

    impl Actor for Counter {
        fn on_message(&mut self, _core: &ActorCore, _body: Body, _service: &mut Service) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_log() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn start_wires_every_scheduler_to_every_peer() {
        let host = Host::start("proc-test", 3, Config::default(), test_log()).unwrap();
        assert_eq!(host.postcodes().len(), 3);
        for hs in &host.host_services {
            assert_eq!(hs.peer_count(), 2);
        }
        host.shutdown();
    }

    #[test]
    fn spawn_on_injects_into_the_named_scheduler_without_panicking() {
        let host = Host::start("proc-test2", 1, Config::default(), test_log()).unwrap();
        let root = host.root_postcode();
        let counter = Arc::new(AtomicUsize::new(0));
        host.spawn_on(&root, Box::new(Counter(counter)));

        // give the scheduler thread a couple of ticks to drain the spawn
        thread::sleep(Duration::from_millis(50));
        host.shutdown();
    }

    #[test]
    fn deliver_to_unknown_postcode_does_not_panic() {
        let host = Host::start("proc-test3", 1, Config::default(), test_log()).unwrap();
        let ghost = Address::new(PostCode::new("proc-elsewhere", "s0"), crate::address::BoxId::NULL);
        host.deliver(ghost, Body::Die);
        host.shutdown();
    }
}
