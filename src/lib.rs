#![deny(clippy::all)]
#![allow(clippy::large_enum_variant)]

//! A distributed actor runtime built around per-thread schedulers and
//! spatial load-balancing migration.
//!
//! A [`Host`](host::Host) owns a fixed set of [`Scheduler`](scheduler::Scheduler)s,
//! each pinned to its own OS thread. Actors are spawned onto a scheduler,
//! communicate by asynchronous [`Body`](message::Body) messages routed
//! locally or via a [`HostService`](host_service::HostService) when the
//! target lives on another thread, and drift through a 3-D
//! [`Position`](position::Position) space under an infoton force model that
//! triggers migration to a less loaded scheduler when an actor wanders too
//! far from its own.

pub mod actor;
pub mod address;
pub mod config;
pub mod error;
pub mod host;
pub mod host_service;
pub mod mailbox;
pub mod message;
pub mod migration;
pub mod position;
pub mod positioning;
pub mod scheduler;

/// The common set of imports actor authors and host setup code need.
pub mod prelude {
    pub use crate::actor::{Actor, ActorCore, BoxActor, Service};
    pub use crate::address::{Address, BoxId, PostCode};
    pub use crate::config::{load_config, Config};
    pub use crate::host::Host;
    pub use crate::message::{Body, Envelope, UserPayload};
    pub use crate::migration::{MigrationAlternatives, PeerInfo};
    pub use crate::position::Position;
}

/// Build the root `slog::Logger` for a `Host`, terminal-formatted and
/// asynchronous (mirrors the host crate's own `system/logger.rs` default
/// drain setup).
pub fn root_logger() -> slog::Logger {
    use slog::Drain;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!("version" => env!("CARGO_PKG_VERSION")))
}
