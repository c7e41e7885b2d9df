//! Bundle directory persistence: write/read/verify `ArtifactBundleV1` on disk.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   bundle_manifest.json         canonical JSON, full artifact listing
//!   bundle_digest_basis.json     canonical JSON, normative projection only
//!   bundle_digest.txt            "sha256:<hex>"
//!   policy.json                  normative
//!   trace.json                   normative
//!   outcome.json                 normative
//!   run_timing.json              observational
//! ```
//!
//! The directory path is never part of any hash surface. The manifest's
//! declared list is the source of truth for what belongs in the directory.
//!
//! # Fail-closed semantics
//!
//! Reading rejects: a missing metadata or declared artifact file, any
//! undeclared file, an artifact name that is not a plain file name, an
//! unknown manifest schema, and a stored digest that disagrees with the
//! digest basis. [`verify_bundle_dir`] then runs the full in-memory
//! [`verify_bundle`] on what was read.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

use serde::Deserialize;

use beamline_kernel::proof::hash::{canonical_hash, ContentHash};
use beamline_kernel::proof::hash_domain::HashDomain;

use crate::bundle::{
    verify_bundle, ArtifactBundleV1, BundleArtifact, BundleVerifyError, BUNDLE_SCHEMA_VERSION,
};

const MANIFEST_FILENAME: &str = "bundle_manifest.json";
const DIGEST_BASIS_FILENAME: &str = "bundle_digest_basis.json";
const DIGEST_FILENAME: &str = "bundle_digest.txt";

const METADATA_FILENAMES: [&str; 3] = [MANIFEST_FILENAME, DIGEST_BASIS_FILENAME, DIGEST_FILENAME];

/// Prefix of in-flight files written by [`write_atomic`].
const TEMP_PREFIX: &str = ".tmp_";

/// Error persisting or loading a bundle directory.
#[derive(Debug)]
pub enum BundleDirError {
    Io { path: String, detail: String },
    MissingMetadata { filename: String },
    MissingArtifact { name: String },
    /// A file in the directory is not declared by the manifest.
    ExtraFile { name: String },
    /// The manifest is not a `bundle.v1` record or an entry is unusable.
    ManifestInvalid { detail: String },
    /// `bundle_digest.txt` disagrees with the recomputed digest.
    DigestMismatch { stored: String, recomputed: String },
    /// The bundle loaded but failed integrity verification.
    Verify(BundleVerifyError),
}

impl std::fmt::Display for BundleDirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, detail } => write!(f, "I/O error at {path}: {detail}"),
            Self::MissingMetadata { filename } => write!(f, "missing metadata file: {filename}"),
            Self::MissingArtifact { name } => write!(f, "missing artifact: {name}"),
            Self::ExtraFile { name } => write!(f, "undeclared extra file: {name}"),
            Self::ManifestInvalid { detail } => write!(f, "invalid manifest: {detail}"),
            Self::DigestMismatch { stored, recomputed } => {
                write!(f, "digest mismatch: stored={stored}, recomputed={recomputed}")
            }
            Self::Verify(e) => write!(f, "bundle verification failed: {e}"),
        }
    }
}

impl std::error::Error for BundleDirError {}

#[derive(Deserialize)]
struct ManifestV1 {
    schema_version: String,
    artifacts: Vec<ManifestEntryV1>,
}

#[derive(Deserialize)]
struct ManifestEntryV1 {
    name: String,
    content_hash: String,
    normative: bool,
}

/// Write `bundle` into `dir`, creating it if needed.
///
/// # Errors
///
/// [`BundleDirError::Io`] on any filesystem failure.
pub fn write_bundle_dir(bundle: &ArtifactBundleV1, dir: &Path) -> Result<(), BundleDirError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, &e))?;

    for artifact in bundle.artifacts.values() {
        write_atomic(&dir.join(&artifact.name), &artifact.content)?;
    }
    write_atomic(&dir.join(MANIFEST_FILENAME), &bundle.manifest)?;
    write_atomic(&dir.join(DIGEST_BASIS_FILENAME), &bundle.digest_basis)?;
    write_atomic(&dir.join(DIGEST_FILENAME), bundle.digest.as_str().as_bytes())
}

/// Load a bundle directory.
///
/// # Errors
///
/// Any [`BundleDirError`] except `Verify`; see the module docs for the
/// rejected conditions.
pub fn read_bundle_dir(dir: &Path) -> Result<ArtifactBundleV1, BundleDirError> {
    let manifest_bytes = read_required(dir, MANIFEST_FILENAME)?;
    let digest_basis = read_required(dir, DIGEST_BASIS_FILENAME)?;
    let stored_digest = read_required(dir, DIGEST_FILENAME)?;

    let manifest: ManifestV1 = serde_json::from_slice(&manifest_bytes).map_err(|e| {
        BundleDirError::ManifestInvalid {
            detail: e.to_string(),
        }
    })?;
    if manifest.schema_version != BUNDLE_SCHEMA_VERSION {
        return Err(BundleDirError::ManifestInvalid {
            detail: format!("unknown schema_version {}", manifest.schema_version),
        });
    }

    let mut artifacts = BTreeMap::new();
    for entry in manifest.artifacts {
        if !is_plain_file_name(&entry.name) {
            return Err(BundleDirError::ManifestInvalid {
                detail: format!("artifact name {:?} is not a plain file name", entry.name),
            });
        }
        let content_hash = ContentHash::parse(&entry.content_hash).ok_or_else(|| {
            BundleDirError::ManifestInvalid {
                detail: format!("bad content_hash for {}: {}", entry.name, entry.content_hash),
            }
        })?;
        let content = std::fs::read(dir.join(&entry.name)).map_err(|_| {
            BundleDirError::MissingArtifact {
                name: entry.name.clone(),
            }
        })?;
        artifacts.insert(
            entry.name.clone(),
            BundleArtifact {
                name: entry.name,
                content,
                content_hash,
                normative: entry.normative,
            },
        );
    }

    for filename in list_files(dir)? {
        if !artifacts.contains_key(&filename) && !METADATA_FILENAMES.contains(&filename.as_str()) {
            return Err(BundleDirError::ExtraFile { name: filename });
        }
    }

    let recomputed = canonical_hash(HashDomain::BundleDigest, &digest_basis);
    let stored = String::from_utf8_lossy(&stored_digest).trim().to_string();
    if recomputed.as_str() != stored {
        return Err(BundleDirError::DigestMismatch {
            stored,
            recomputed: recomputed.as_str().to_string(),
        });
    }

    Ok(ArtifactBundleV1 {
        artifacts,
        manifest: manifest_bytes,
        digest_basis,
        digest: recomputed,
    })
}

/// Read `dir`, then run [`verify_bundle`] on the result.
///
/// This is the offline verification entry point.
///
/// # Errors
///
/// Any read error, or [`BundleDirError::Verify`] on an integrity failure.
pub fn verify_bundle_dir(dir: &Path) -> Result<ArtifactBundleV1, BundleDirError> {
    let bundle = read_bundle_dir(dir)?;
    verify_bundle(&bundle).map_err(BundleDirError::Verify)?;
    Ok(bundle)
}

fn io_error(path: &Path, e: &std::io::Error) -> BundleDirError {
    BundleDirError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.starts_with(TEMP_PREFIX)
}

/// Temp file + rename in the same directory.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), BundleDirError> {
    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(BundleDirError::Io {
            path: path.display().to_string(),
            detail: "not a file path".into(),
        });
    };
    let temp_path = dir.join(format!("{TEMP_PREFIX}{}", file_name.to_string_lossy()));
    std::fs::write(&temp_path, content).map_err(|e| io_error(&temp_path, &e))?;
    std::fs::rename(&temp_path, path).map_err(|e| io_error(path, &e))
}

fn read_required(dir: &Path, filename: &str) -> Result<Vec<u8>, BundleDirError> {
    std::fs::read(dir.join(filename)).map_err(|_| BundleDirError::MissingMetadata {
        filename: filename.to_string(),
    })
}

/// Regular files in `dir`, excluding in-flight temp files.
fn list_files(dir: &Path) -> Result<BTreeSet<String>, BundleDirError> {
    let mut files = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_error(dir, &e))? {
        let entry = entry.map_err(|e| io_error(dir, &e))?;
        let file_type = entry.file_type().map_err(|e| io_error(&entry.path(), &e))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with(TEMP_PREFIX) {
                files.insert(name.to_string());
            }
        }
    }
    Ok(files)
}
