//! Proof module: canonical JSON, domain separators, content hashing.

pub mod canon;
pub mod hash;
pub mod hash_domain;
