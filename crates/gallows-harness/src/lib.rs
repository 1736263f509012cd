//! Deterministic simulation harness for Gallows client testing.
//!
//! An in-process game server plus the pieces that let the production client
//! and application code run against it without a network.
//!
//! # Components
//!
//! - [`SimServer`]: authoritative two-player game server with push channels
//! - [`SimTransport`]: [`gallows_client::Transport`] over a shared server,
//!   with injectable refusals and lost responses
//! - [`TestCluster`]: several pure clients driven synchronously, with seeded
//!   push drops, duplicates and reordering
//! - [`SimDriver`]: [`gallows_app::Driver`] for scripted end-to-end runs of
//!   the real runtime
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the checks
//! that hold at every step and [`InvariantRegistry::settled()`] once traffic
//! has drained.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cluster;
pub mod invariants;
pub mod sim_driver;
pub mod sim_server;
pub mod sim_transport;

pub use cluster::{NetworkFaults, TestCluster, TranscriptEntry};
pub use invariants::{
    ClientSnapshot, ConvergedWithServer, GateClosedOutsideProgress, GuessedLettersMonotonic,
    Invariant, InvariantRegistry, InvariantResult, LivesNonIncreasing, NeverAheadOfServer,
    PhaseMonotonicity, ServerSnapshot, SystemSnapshot, TurnOwnerOnlyInProgress, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError, SimHandle};
pub use sim_server::{SharedSimServer, SimConfig, SimError, SimServer, create_shared_server};
pub use sim_transport::{Call, Fault, SimTransport, SimTransportError};
