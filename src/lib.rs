//! Readiness probe that reports exactly one replica ready at a time.
//!
//! Replicas coordinate through a single lease value in a shared
//! last-write-wins store (see [`lease`]). Each probe invocation checks the
//! local endpoint, then claims, renews or defers on the lease, and maps the
//! result to ready / not ready (see [`probe`]).

pub mod prelude;

pub mod cli;
pub mod config;
pub mod lease;
pub mod logging;
pub mod probe;
pub mod util;

pub use cli::{Cli, Commands};
pub use config::{Config, ConfigError};
