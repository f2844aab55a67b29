#![forbid(unsafe_code)]
//! Groundwork: idempotent, re-runnable host provisioning.
//!
//! A provisioning run is a [`Plan`](crate::types::Plan): an ordered list of
//! [`Step`](crate::steps::Step)s, each pairing a read-only probe with a mutating
//! action. The runner probes every step, skips what is already satisfied,
//! repairs what is broken, applies what is missing and verifies the result,
//! halting on the first unrecoverable failure.
//!
//! Safety model highlights:
//! - Probes never mutate; calling one twice without an apply yields the same state.
//! - Files and links are replaced atomically (stage in the same directory, then rename).
//! - Regular files are backed up before any destructive in-place edit.
//! - A file-backed advisory lock keeps concurrent runs on one host apart.
//! - External tools (package manager, service manager, venv tool) are reached only
//!   through the [`CommandRunner`](crate::adapters::CommandRunner) seam.

pub mod adapters;
pub mod api;
pub mod config;
pub mod constants;
pub mod fs;
pub mod logging;
pub mod policy;
pub mod preflight;
pub mod recipes;
pub mod steps;
pub mod types;

pub use api::*;
