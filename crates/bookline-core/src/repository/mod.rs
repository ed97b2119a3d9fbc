//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (bookline-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod provider;
pub mod reservation;
pub mod schedule;
