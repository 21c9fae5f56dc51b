//! Deterministic simulation and invariant checking for the relay, for use
//! in `relay-core`'s and `relay-server`'s test suites.
//!
//! [`SimEnv`] substitutes a seeded PRNG and a logical clock for
//! [`relay_core::env::SystemEnv`]'s OS entropy and wall time, so a test
//! scenario replays identically every run. [`FakeTransport`] records every
//! frame a session would have sent without opening a socket. The
//! [`invariants`] module checks properties that must hold of any reachable
//! registry state, independent of the specific sequence of events that
//! produced it.

pub mod fake_transport;
pub mod invariants;
pub mod sim_env;

pub use fake_transport::{FakeTransport, Recorded};
pub use invariants::{check_standard, Invariant, InvariantResult, RegistrySnapshot, Violation};
pub use sim_env::SimEnv;
