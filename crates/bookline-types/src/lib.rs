//! Shared domain types for Bookline.
//!
//! This crate contains the core domain types used across the Bookline
//! booking engine: Provider, WorkingHours, Reservation, Slot, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod provider;
pub mod reservation;
pub mod schedule;
