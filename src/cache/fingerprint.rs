//! Content fingerprints deciding whether a cached index is still valid.

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Fingerprint over the paths and contents of `files`.
///
/// Order independent: files are sorted first. A file that cannot be read
/// contributes a marker, so it disappearing later still changes the value.
pub fn content_fingerprint(files: &[PathBuf]) -> String {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    sorted.dedup();

    let digests: Vec<String> = sorted.par_iter().map(|path| file_digest(path)).collect();

    let mut hasher = Sha256::new();
    for (path, digest) in sorted.iter().zip(&digests) {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of several fingerprints, in the given order
pub fn combine_fingerprints(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn file_digest(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => format!("{:x}", Sha256::digest(&bytes)),
        Err(_) => "<unreadable>".to_string(),
    }
}
