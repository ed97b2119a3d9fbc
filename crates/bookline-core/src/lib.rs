//! Booking logic and repository trait definitions for Bookline.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the slot computer and the reservation lifecycle
//! state machine. It depends only on `bookline-types` -- never on
//! `bookline-infra` or any database/IO crate.

pub mod booking;
pub mod catalog;
pub mod repository;
