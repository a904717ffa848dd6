//! faultline-daemon — crash tombstone ingestion daemon library.
//!
//! The runtime half of the crash pipeline: total entry points fed by the two
//! event sources (new tombstone files and replayed queue entries),
//! config-backed implementations of the external collaborator boundaries,
//! and the daemon wiring.
//!
//! Every entry point is total from the host's perspective: decode,
//! classification, and presentation failures are caught at the boundary and
//! converted to a diagnostic log line. The worst outcome of any error in
//! this crate is a missing notification.
//!
//! # Modules
//!
//! - [`handler`]: the tombstone entry points and classification funnel
//! - [`sources`]: directory poller (live) and queue drainer (historical)
//! - [`registries`]: config-backed process/package registry implementations
//! - [`presenter`]: tracing-backed handoff to the notification surface
//! - [`config`]: daemon configuration

pub mod config;
pub mod handler;
pub mod presenter;
pub mod registries;
pub mod sources;
