//! SQLite repository implementations using sqlx with split read/write pools.

pub mod pool;
pub mod provider;
pub mod reservation;
pub mod schedule;

pub use pool::DatabasePool;
