pub mod connection;
pub mod error;
pub mod migration;
pub mod models;
pub mod repository;
pub mod schema;
pub mod snapshot;

/// `(major, minor, patch)` as stored in the bookkeeping tables.
pub type ReleaseKey = (i32, i32, i32);
