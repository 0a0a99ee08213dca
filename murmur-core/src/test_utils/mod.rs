//! Test utilities shared by unit and integration tests
//!
//! Fixtures build a client wired to an [`InMemoryEngine`](crate::engine::InMemoryEngine);
//! the async helpers bound every wait with a timeout.

pub mod async_helpers;
pub mod fixtures;

pub use async_helpers::*;
pub use fixtures::*;
