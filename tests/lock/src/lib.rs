//! Shared fixtures for the lock tests.
//!
//! - [`faults`]: oracles and task adapters that misbehave on purpose.
//! - [`bundle_test_helpers`]: digest-consistent bundle mutation.

pub mod faults;
