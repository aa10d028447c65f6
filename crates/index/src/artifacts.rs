//! Durable index version artifacts under `.newsdesk/versions/<id>/`.

use crate::config::{get_version_dir, get_versions_dir};
use crate::version::{IndexVersion, VersionArtifact};
use newsdesk_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const ARTIFACT_FILE: &str = "version.json";

/// Path of a version's artifact file.
pub fn artifact_path(workspace: &Path, version_id: u64) -> PathBuf {
    get_version_dir(workspace, version_id).join(ARTIFACT_FILE)
}

/// Write a version to disk.
///
/// The file is written beside its final name and renamed into place so a
/// crash never leaves a truncated artifact behind.
pub fn persist(workspace: &Path, version: &IndexVersion) -> AppResult<PathBuf> {
    let dir = get_version_dir(workspace, version.version_id());
    fs::create_dir_all(&dir).map_err(|e| {
        AppError::Storage(format!("Failed to create version directory {:?}: {}", dir, e))
    })?;

    let path = dir.join(ARTIFACT_FILE);
    let tmp = dir.join(format!("{}.tmp", ARTIFACT_FILE));

    let json = serde_json::to_vec(&version.to_artifact())?;
    fs::write(&tmp, json)
        .map_err(|e| AppError::Storage(format!("Failed to write {:?}: {}", tmp, e)))?;
    fs::rename(&tmp, &path)
        .map_err(|e| AppError::Storage(format!("Failed to move {:?} into place: {}", path, e)))?;

    tracing::debug!("Persisted version {} to {:?}", version.version_id(), path);
    Ok(path)
}

/// Read one version artifact; the result is Ready.
pub fn load(workspace: &Path, version_id: u64) -> AppResult<IndexVersion> {
    let path = artifact_path(workspace, version_id);
    let content = fs::read(&path)
        .map_err(|e| AppError::Storage(format!("Failed to read {:?}: {}", path, e)))?;
    let artifact: VersionArtifact = serde_json::from_slice(&content)?;

    if artifact.version_id != version_id {
        return Err(AppError::Storage(format!(
            "{:?} holds version {}, expected {}",
            path, artifact.version_id, version_id
        )));
    }

    IndexVersion::from_artifact(artifact)
}

/// Version ids present on disk, ascending.
pub fn list_versions(workspace: &Path) -> AppResult<Vec<u64>> {
    let dir = get_versions_dir(workspace);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<u64> = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
        .collect();

    ids.sort_unstable();
    Ok(ids)
}

/// Load the newest readable version, skipping corrupt ones.
pub fn load_latest(workspace: &Path) -> AppResult<Option<IndexVersion>> {
    Ok(load_recent(workspace, 1)?.pop())
}

/// Load up to `limit` readable versions, newest first, skipping corrupt ones.
pub fn load_recent(workspace: &Path, limit: usize) -> AppResult<Vec<IndexVersion>> {
    let mut versions = Vec::new();
    for version_id in list_versions(workspace)?.into_iter().rev() {
        if versions.len() >= limit {
            break;
        }
        match load(workspace, version_id) {
            Ok(version) => {
                tracing::info!(
                    "Loaded index version {} ({} articles) from disk",
                    version_id,
                    version.article_count()
                );
                versions.push(version);
            }
            Err(e) => tracing::warn!("Skipping unreadable version {}: {}", version_id, e),
        }
    }
    Ok(versions)
}

/// Delete artifacts for versions not in `keep`. Returns how many were removed.
pub fn prune(workspace: &Path, keep: &[u64]) -> AppResult<usize> {
    let mut removed = 0;
    for version_id in list_versions(workspace)? {
        if keep.contains(&version_id) {
            continue;
        }
        let dir = get_version_dir(workspace, version_id);
        fs::remove_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("Failed to remove version directory {:?}: {}", dir, e))
        })?;
        removed += 1;
    }

    if removed > 0 {
        tracing::debug!("Pruned {} version artifacts", removed);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::FlatIndex;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn ready(version_id: u64) -> IndexVersion {
        let version = IndexVersion::new(
            version_id,
            Utc::now(),
            "stub/m/3",
            FlatIndex::new(3),
            Vec::new(),
            BTreeMap::new(),
        )
        .unwrap();
        version.mark_ready().unwrap();
        version
    }

    #[test]
    fn test_persist_and_load_latest() {
        let temp = TempDir::new().unwrap();
        persist(temp.path(), &ready(2)).unwrap();
        persist(temp.path(), &ready(10)).unwrap();

        assert_eq!(list_versions(temp.path()).unwrap(), vec![2, 10]);
        let latest = load_latest(temp.path()).unwrap().unwrap();
        assert_eq!(latest.version_id(), 10);
        assert_eq!(latest.fingerprint(), "stub/m/3");
    }

    #[test]
    fn test_corrupt_latest_falls_back() {
        let temp = TempDir::new().unwrap();
        persist(temp.path(), &ready(1)).unwrap();
        let path = persist(temp.path(), &ready(2)).unwrap();
        fs::write(&path, b"{not json").unwrap();

        assert_eq!(load_latest(temp.path()).unwrap().unwrap().version_id(), 1);
    }

    #[test]
    fn test_empty_workspace_has_no_versions() {
        let temp = TempDir::new().unwrap();
        assert!(load_latest(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_prune_keeps_listed_versions() {
        let temp = TempDir::new().unwrap();
        for id in 1..=4 {
            persist(temp.path(), &ready(id)).unwrap();
        }

        assert_eq!(prune(temp.path(), &[4, 3]).unwrap(), 2);
        assert_eq!(list_versions(temp.path()).unwrap(), vec![3, 4]);
    }
}
