//! Observability utilities for Bookline.

pub mod tracing_setup;
