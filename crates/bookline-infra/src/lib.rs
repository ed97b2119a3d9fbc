//! Infrastructure implementations for Bookline.
//!
//! SQLite-backed repositories for the traits defined in `bookline-core`,
//! HTTP clients for external collaborators (meeting platform, CRM), and
//! configuration loading.

pub mod collab;
pub mod config;
pub mod sqlite;
