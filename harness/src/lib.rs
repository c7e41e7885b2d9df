//! Beamline Harness: concrete tasks, oracles, and run packaging.
//!
//! The harness runs a task through `beamline_search::search()` and packages
//! the result as a self-contained artifact bundle (policy echo, trace,
//! outcome) that can be written to disk and verified offline.
//!
//! The harness does NOT implement search logic; it delegates to the search
//! crate. Tasks provide domain mechanics only; oracles provide scores only.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bundle;
pub mod bundle_dir;
pub mod oracles;
pub mod runner;
pub mod tasks;
