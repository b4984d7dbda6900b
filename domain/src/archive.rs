//! Archiving of completed records as canonical JSON files.
//!
//! Besides the per-job archive, records are also kept under `by-content/`, keyed on a
//! SHA-256 digest of the uploaded artifact, so an identical upload can be answered
//! without calling the providers again.

use log::*;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisRecord;
use crate::error::Error;
use crate::job::JobId;

/// Write `record` to `<dir>/<job_id>.json`, creating `dir` if needed.
pub async fn write_record(dir: &Path, id: JobId, record: &AnalysisRecord) -> Result<PathBuf, Error> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", id));
    let json = serde_json::to_vec_pretty(record)?;
    tokio::fs::write(&path, json).await?;
    debug!("Archived job {} to {}", id, path.display());
    Ok(path)
}

/// Read a record previously written by [`write_record`].
pub async fn read_record(path: &Path) -> Result<AnalysisRecord, Error> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

const CONTENT_DIR: &str = "by-content";

/// Hex SHA-256 digest over `parts`, each length-prefixed so that part boundaries
/// contribute to the key.
pub fn content_key(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Store `record` under its content key, replacing any earlier entry.
pub async fn write_cached(dir: &Path, key: &str, record: &AnalysisRecord) -> Result<PathBuf, Error> {
    let dir = dir.join(CONTENT_DIR);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("{}.json", key));
    tokio::fs::write(&path, serde_json::to_vec_pretty(record)?).await?;
    debug!("Cached result {} at {}", key, path.display());
    Ok(path)
}

/// Look up a record stored by [`write_cached`]; `None` when there is no entry for `key`.
pub async fn read_cached(dir: &Path, key: &str) -> Result<Option<AnalysisRecord>, Error> {
    let path = dir.join(CONTENT_DIR).join(format!("{}.json", key));
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
