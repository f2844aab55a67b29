//! Runner policy and preflight gating.
//!
//! The `policy` module centralizes the knobs that decide whether a run may start
//! (privileges, tools, locking) and how long it waits or retries once started.
//! Consumers typically construct a [`Policy`](crate::policy::Policy) via presets
//! (`production_preset`, `fast`) and then customize fields before creating a
//! [`Groundwork`](crate::Groundwork) instance.
//!
//! Submodules:
//! - `config`: policy struct and presets
//! - `types`: grouped policy sections
//! - `gating`: host-level stops shared by preflight and apply

pub mod config;
pub(crate) mod gating;
pub mod types;

pub use config::Policy;
pub use types::LockingPolicy;
