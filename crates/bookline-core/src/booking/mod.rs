//! Slot computation and the reservation lifecycle.

pub mod effects;
pub mod lifecycle;
pub mod slots;
