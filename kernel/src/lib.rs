//! Beamline Kernel: canonical encoding and content addressing.
//!
//! Everything above this crate that needs a stable byte form (audit traces,
//! policy echoes, run bundles, state fingerprints) goes through here.
//!
//! # API Surface
//!
//! - [`proof::canon::canonical_json_bytes`] -- canonical JSON bytes of a `serde_json::Value`
//! - [`proof::canon::canonical_json_of`] -- canonical JSON bytes of any `Serialize` value
//! - [`proof::hash::canonical_hash`] -- domain-separated SHA-256 content hash

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod proof;
