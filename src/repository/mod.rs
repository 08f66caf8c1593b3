//! Storage interfaces for the user and car aggregates.
//!
//! Services depend on these traits rather than on a connection, so business
//! rules can run against [`memory`] implementations in unit tests.

pub mod car;
pub mod query;
pub mod user;

#[cfg(test)]
pub mod memory;

pub use car::{CarFilter, CarRepository, CarSort, CarStatusCounts, SeaCarRepository};
pub use query::{Page, SortOrder};
pub use user::{SeaUserRepository, UserRepository};
