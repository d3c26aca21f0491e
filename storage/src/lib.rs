#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Access to the single shared value that replicas coordinate through.
//!
//! The store offers plain get / overwrite / clear over one fixed key and
//! nothing else: no versions, no preconditions, no compare-and-swap.

pub mod auth;
pub mod control_plane;
pub mod error;
pub mod http;
pub mod memory;
pub mod store;

pub mod test_utils;

pub use control_plane::{ConnectingLeaseStore, ControlPlaneSettings, EnvGroupLeaseStore};
pub use error::{Error, Result};
pub use memory::MemoryLeaseStore;
pub use reqwest::Url;
pub use store::LeaseStore;
