//! REST API request handlers.

pub mod provider;
pub mod reservation;
pub mod schedule;
