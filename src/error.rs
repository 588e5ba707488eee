use std::error::Error;
use std::fmt;

/// Error returned by [`crate::scheduler::Scheduler::spawn`].
///
/// Mirrors the host crate's hand-written `CreateError`: a small enum with a
/// `Display` impl, not a derive-macro error.
#[derive(Debug, Clone)]
pub enum SpawnError {
    /// The scheduler is shutting down and no longer accepts new actors.
    ShuttingDown,
}

impl Error for SpawnError {}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpawnError::ShuttingDown => {
                f.write_str("cannot spawn actor: scheduler is shutting down")
            }
        }
    }
}

/// Error returned when cross-thread routing cannot accept a message.
///
/// Per §7 this is always recovered locally (turned into a `RecipientMoved`
/// sent back to the sender) rather than propagated to callers; the type
/// exists so internal routing code has something concrete to match on and
/// log, matching how the host crate's `MsgError`/`TryMsgError` types exist
/// purely to be described and logged, not unwound.
#[derive(Debug, Clone)]
pub enum RoutingError {
    /// The target's network-host part does not match any peer (cross-host
    /// delivery is out of scope for `HostService`).
    UnknownHost,
    /// No peer `HostService` is registered for the target's `PostCode`.
    UnknownPeer,
    /// The peer's inbound queue is at `MSG_BUFFER_SIZE` capacity.
    QueueFull,
}

impl Error for RoutingError {}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RoutingError::UnknownHost => f.write_str("target postcode is on a different host"),
            RoutingError::UnknownPeer => f.write_str("no peer registered for target postcode"),
            RoutingError::QueueFull => f.write_str("peer inbound queue is full"),
        }
    }
}

/// Error returned when migrating an actor from one scheduler to another fails.
#[derive(Debug, Clone)]
pub enum MigrationError {
    /// The destination's inbound queue rejected the migration envelope.
    DestinationUnreachable(RoutingError),
}

impl Error for MigrationError {}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MigrationError::DestinationUnreachable(cause) => {
                write!(f, "migration aborted, actor reinserted: {}", cause)
            }
        }
    }
}

/// Error returned when the `Host` fails to start.
#[derive(Debug)]
pub enum HostError {
    /// Spawning one of the scheduler OS threads failed.
    ThreadSpawnFailed(std::io::Error),
}

impl Error for HostError {}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HostError::ThreadSpawnFailed(cause) => {
                write!(f, "failed to spawn scheduler thread: {}", cause)
            }
        }
    }
}
