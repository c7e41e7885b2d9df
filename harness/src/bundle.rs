//! In-memory artifact bundle: the output of a harness run.
//!
//! No file I/O in this module. See [`crate::bundle_dir`] for persistence.
//!
//! # Normative vs observational artifacts
//!
//! Each artifact is tagged `normative` (participates in the bundle digest)
//! or observational (listed in the manifest but excluded from the digest).
//! `run_timing.json` is observational because wall-clock time differs
//! between otherwise identical runs.
//!
//! The bundle digest is computed over the **digest basis**: a canonical
//! JSON projection of normative artifact hashes only. Two runs of the same
//! task, oracle and policy therefore produce the same digest.

use std::collections::BTreeMap;

use beamline_kernel::proof::canon::canonical_json_bytes;
use beamline_kernel::proof::hash::{canonical_hash, ContentHash};
use beamline_kernel::proof::hash_domain::HashDomain;

/// Manifest schema tag.
pub const BUNDLE_SCHEMA_VERSION: &str = "bundle.v1";

pub const POLICY_ARTIFACT: &str = "policy.json";
pub const TRACE_ARTIFACT: &str = "trace.json";
pub const OUTCOME_ARTIFACT: &str = "outcome.json";
pub const TIMING_ARTIFACT: &str = "run_timing.json";

/// A single artifact in the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleArtifact {
    /// Logical filename (e.g., `"trace.json"`).
    pub name: String,
    pub content: Vec<u8>,
    /// `canonical_hash(BundleArtifact, content)`.
    pub content_hash: ContentHash,
    /// Whether this artifact participates in the bundle digest.
    pub normative: bool,
}

/// The complete artifact bundle from a harness run.
#[derive(Debug, Clone)]
pub struct ArtifactBundleV1 {
    /// Artifacts indexed by logical name, in sorted order.
    pub artifacts: BTreeMap<String, BundleArtifact>,
    /// Canonical JSON listing all artifacts with normative flags.
    pub manifest: Vec<u8>,
    /// Canonical JSON listing normative artifact hashes only.
    pub digest_basis: Vec<u8>,
    /// `canonical_hash(BundleDigest, digest_basis)`.
    pub digest: ContentHash,
}

impl ArtifactBundleV1 {
    #[must_use]
    pub fn artifact(&self, name: &str) -> Option<&BundleArtifact> {
        self.artifacts.get(name)
    }
}

/// Error building a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleBuildError {
    CanonError { detail: String },
    /// Two inputs share a name.
    DuplicateArtifact { name: String },
}

impl std::fmt::Display for BundleBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CanonError { detail } => write!(f, "canonical JSON error: {detail}"),
            Self::DuplicateArtifact { name } => write!(f, "duplicate artifact: {name}"),
        }
    }
}

impl std::error::Error for BundleBuildError {}

/// Build an `ArtifactBundleV1` from `(name, content, normative)` triples.
///
/// # Errors
///
/// Returns [`BundleBuildError`] on a duplicate name or if canonical JSON
/// serialization fails.
pub fn build_bundle(
    artifacts: Vec<(String, Vec<u8>, bool)>,
) -> Result<ArtifactBundleV1, BundleBuildError> {
    let mut artifact_map = BTreeMap::new();

    for (name, content, normative) in artifacts {
        if artifact_map.contains_key(&name) {
            return Err(BundleBuildError::DuplicateArtifact { name });
        }
        let content_hash = canonical_hash(HashDomain::BundleArtifact, &content);
        artifact_map.insert(
            name.clone(),
            BundleArtifact {
                name,
                content,
                content_hash,
                normative,
            },
        );
    }

    let manifest = compute_manifest_bytes(&artifact_map)
        .map_err(|detail| BundleBuildError::CanonError { detail })?;
    let digest_basis = compute_digest_basis_bytes(&artifact_map)
        .map_err(|detail| BundleBuildError::CanonError { detail })?;
    let digest = canonical_hash(HashDomain::BundleDigest, &digest_basis);

    Ok(ArtifactBundleV1 {
        artifacts: artifact_map,
        manifest,
        digest_basis,
        digest,
    })
}

/// Error from bundle integrity verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleVerifyError {
    ContentHashMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },
    /// Stored manifest differs from the one recomputed from artifacts.
    ManifestMismatch,
    ManifestNotCanonical,
    DigestBasisMismatch,
    DigestBasisNotCanonical,
    DigestMismatch { expected: String, actual: String },
    /// A normative JSON artifact is not in canonical form.
    ArtifactNotCanonical { artifact: String },
    /// A normative artifact every run produces is absent.
    MissingArtifact { artifact: String },
    /// An artifact could not be parsed as the record it should hold.
    ArtifactParseError { artifact: String, detail: String },
    /// A digest declared in one artifact does not match the artifact it
    /// names.
    BindingMismatch {
        field: String,
        declared: String,
        recomputed: String,
    },
    CanonError { detail: String },
}

impl std::fmt::Display for BundleVerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContentHashMismatch {
                artifact,
                expected,
                actual,
            } => write!(
                f,
                "content hash mismatch for {artifact}: stored {expected}, recomputed {actual}"
            ),
            Self::ManifestMismatch => write!(f, "manifest does not match artifacts"),
            Self::ManifestNotCanonical => write!(f, "manifest is not canonical JSON"),
            Self::DigestBasisMismatch => write!(f, "digest basis does not match artifacts"),
            Self::DigestBasisNotCanonical => write!(f, "digest basis is not canonical JSON"),
            Self::DigestMismatch { expected, actual } => {
                write!(f, "bundle digest mismatch: stored {expected}, recomputed {actual}")
            }
            Self::ArtifactNotCanonical { artifact } => {
                write!(f, "{artifact} is not canonical JSON")
            }
            Self::MissingArtifact { artifact } => write!(f, "missing artifact: {artifact}"),
            Self::ArtifactParseError { artifact, detail } => {
                write!(f, "cannot parse {artifact}: {detail}")
            }
            Self::BindingMismatch {
                field,
                declared,
                recomputed,
            } => write!(
                f,
                "{field} binding mismatch: declared {declared}, recomputed {recomputed}"
            ),
            Self::CanonError { detail } => write!(f, "canonical JSON error: {detail}"),
        }
    }
}

impl std::error::Error for BundleVerifyError {}

/// Verify the internal consistency of a bundle.
///
/// This is a pure integrity check; it does not re-run the search. It proves:
///
/// 1. Each artifact's `content_hash` matches its content.
/// 2. `manifest` and `digest_basis` match the projections recomputed from
///    the artifacts, and both are canonical JSON.
/// 3. `digest` matches `canonical_hash(BundleDigest, digest_basis)`.
/// 4. Normative JSON artifacts are canonical.
/// 5. `policy.json`, `trace.json` and `outcome.json` are present, and the
///    digests `outcome.json` declares for the trace and policy match the
///    artifacts. The trace's own `policy_digest` matches `policy.json`.
///
/// # Errors
///
/// Returns the first [`BundleVerifyError`] encountered.
pub fn verify_bundle(bundle: &ArtifactBundleV1) -> Result<(), BundleVerifyError> {
    for artifact in bundle.artifacts.values() {
        let recomputed = canonical_hash(HashDomain::BundleArtifact, &artifact.content);
        if recomputed != artifact.content_hash {
            return Err(BundleVerifyError::ContentHashMismatch {
                artifact: artifact.name.clone(),
                expected: artifact.content_hash.as_str().to_string(),
                actual: recomputed.as_str().to_string(),
            });
        }
    }

    let expected_manifest = compute_manifest_bytes(&bundle.artifacts)
        .map_err(|detail| BundleVerifyError::CanonError { detail })?;
    if expected_manifest != bundle.manifest {
        return Err(BundleVerifyError::ManifestMismatch);
    }
    verify_canonical_json(&bundle.manifest)
        .map_err(|()| BundleVerifyError::ManifestNotCanonical)?;

    let expected_basis = compute_digest_basis_bytes(&bundle.artifacts)
        .map_err(|detail| BundleVerifyError::CanonError { detail })?;
    if expected_basis != bundle.digest_basis {
        return Err(BundleVerifyError::DigestBasisMismatch);
    }
    verify_canonical_json(&bundle.digest_basis)
        .map_err(|()| BundleVerifyError::DigestBasisNotCanonical)?;

    let recomputed_digest = canonical_hash(HashDomain::BundleDigest, &bundle.digest_basis);
    if recomputed_digest != bundle.digest {
        return Err(BundleVerifyError::DigestMismatch {
            expected: bundle.digest.as_str().to_string(),
            actual: recomputed_digest.as_str().to_string(),
        });
    }

    for artifact in bundle.artifacts.values() {
        let is_json = std::path::Path::new(&artifact.name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if artifact.normative && is_json {
            verify_canonical_json(&artifact.content).map_err(|()| {
                BundleVerifyError::ArtifactNotCanonical {
                    artifact: artifact.name.clone(),
                }
            })?;
        }
    }

    verify_run_bindings(bundle)
}

/// Outcome ↔ trace ↔ policy digest bindings.
fn verify_run_bindings(bundle: &ArtifactBundleV1) -> Result<(), BundleVerifyError> {
    let policy = required(bundle, POLICY_ARTIFACT)?;
    let trace = required(bundle, TRACE_ARTIFACT)?;
    let outcome = required(bundle, OUTCOME_ARTIFACT)?;

    let outcome_value = parse_json(outcome)?;
    let trace_value = parse_json(trace)?;

    let policy_digest = canonical_hash(HashDomain::BeamPolicy, &policy.content);
    let trace_digest = canonical_hash(HashDomain::SearchTrace, &trace.content);

    check_binding(&outcome_value, OUTCOME_ARTIFACT, "policy_digest", &policy_digest)?;
    check_binding(&outcome_value, OUTCOME_ARTIFACT, "trace_digest", &trace_digest)?;
    check_binding(&trace_value["metadata"], TRACE_ARTIFACT, "policy_digest", &policy_digest)
}

fn required<'a>(
    bundle: &'a ArtifactBundleV1,
    name: &str,
) -> Result<&'a BundleArtifact, BundleVerifyError> {
    bundle
        .artifact(name)
        .ok_or_else(|| BundleVerifyError::MissingArtifact {
            artifact: name.to_string(),
        })
}

fn parse_json(artifact: &BundleArtifact) -> Result<serde_json::Value, BundleVerifyError> {
    serde_json::from_slice(&artifact.content).map_err(|e| BundleVerifyError::ArtifactParseError {
        artifact: artifact.name.clone(),
        detail: e.to_string(),
    })
}

fn check_binding(
    record: &serde_json::Value,
    artifact: &str,
    field: &str,
    recomputed: &ContentHash,
) -> Result<(), BundleVerifyError> {
    let declared = record[field]
        .as_str()
        .ok_or_else(|| BundleVerifyError::ArtifactParseError {
            artifact: artifact.to_string(),
            detail: format!("missing string field {field}"),
        })?;
    if declared == recomputed.as_str() {
        Ok(())
    } else {
        Err(BundleVerifyError::BindingMismatch {
            field: format!("{artifact}:{field}"),
            declared: declared.to_string(),
            recomputed: recomputed.as_str().to_string(),
        })
    }
}

/// Recompute manifest bytes from the artifact map.
fn compute_manifest_bytes(artifacts: &BTreeMap<String, BundleArtifact>) -> Result<Vec<u8>, String> {
    let manifest_artifacts: Vec<serde_json::Value> = artifacts
        .values()
        .map(|a| {
            serde_json::json!({
                "content_hash": a.content_hash.as_str(),
                "name": a.name,
                "normative": a.normative,
            })
        })
        .collect();

    let manifest_value = serde_json::json!({
        "artifacts": manifest_artifacts,
        "schema_version": BUNDLE_SCHEMA_VERSION,
    });

    canonical_json_bytes(&manifest_value).map_err(|e| e.to_string())
}

/// Recompute digest basis bytes from normative artifacts only.
fn compute_digest_basis_bytes(
    artifacts: &BTreeMap<String, BundleArtifact>,
) -> Result<Vec<u8>, String> {
    let normative_artifacts: Vec<serde_json::Value> = artifacts
        .values()
        .filter(|a| a.normative)
        .map(|a| {
            serde_json::json!({
                "content_hash": a.content_hash.as_str(),
                "name": a.name,
            })
        })
        .collect();

    let digest_basis_value = serde_json::json!({
        "artifacts": normative_artifacts,
        "schema_version": "bundle_digest_basis.v1",
    });

    canonical_json_bytes(&digest_basis_value).map_err(|e| e.to_string())
}

/// Parse, re-canonicalize, compare.
fn verify_canonical_json(bytes: &[u8]) -> Result<(), ()> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|_| ())?;
    let recanonized = canonical_json_bytes(&value).map_err(|_| ())?;
    if recanonized == bytes {
        Ok(())
    } else {
        Err(())
    }
}
