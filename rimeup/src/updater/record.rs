//! Persisted "last applied version" records.
//!
//! One JSON file per artifact kind lives in the cache directory. A record is
//! only ever written after an artifact was fully applied, and it is overwritten
//! on each later success. A missing record means "never installed".

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{UpdateError, UpdateResult};
use super::kind::ArtifactKind;

/// Last successfully applied version of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Asset file name that was applied.
    #[serde(rename = "name")]
    pub artifact_name: String,
    /// Remote update time of the applied version (not wall-clock time).
    pub update_time: DateTime<Utc>,
    /// Release tag of the applied version.
    pub tag: String,
    /// Wall-clock time the record was written.
    #[serde(rename = "apply_time")]
    pub applied_at: DateTime<Utc>,
    /// SHA-256 of the applied asset, empty when unknown.
    #[serde(rename = "sha256", default)]
    pub content_hash: String,
    /// Mirror asset identifier, empty for GitHub.
    #[serde(rename = "cnb_id", default)]
    pub source_id: String,
}

/// Reads and writes update records under a cache directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    cache_dir: PathBuf,
}

impl RecordStore {
    /// Create a store rooted at `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// The cache directory backing this store.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the record file for `kind`.
    pub fn record_path(&self, kind: ArtifactKind) -> PathBuf {
        self.cache_dir.join(kind.record_filename())
    }

    /// Load the record for `kind`, `Ok(None)` if it was never written.
    pub fn load(&self, kind: ArtifactKind) -> UpdateResult<Option<UpdateRecord>> {
        let path = self.record_path(kind);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| UpdateError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;

        let record = serde_json::from_str(&content).map_err(|e| UpdateError::RecordFailed {
            path,
            reason: e.to_string(),
        })?;
        Ok(Some(record))
    }

    /// Write the record for `kind`, replacing any previous one.
    ///
    /// The JSON is written to a sibling temporary file and renamed over the
    /// record so a crash never leaves a half-written record behind.
    pub fn save(&self, kind: ArtifactKind, record: &UpdateRecord) -> UpdateResult<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| UpdateError::CreateDirFailed {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        let path = self.record_path(kind);
        let json =
            serde_json::to_string_pretty(record).map_err(|e| UpdateError::RecordFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| UpdateError::WriteFailed {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| UpdateError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;

        debug!(kind = %kind, tag = %record.tag, path = %path.display(), "Record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_record() -> UpdateRecord {
        UpdateRecord {
            artifact_name: "rime-wanxiang-base.zip".to_string(),
            update_time: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
            tag: "v12.4.0".to_string(),
            applied_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
            content_hash: "ab".repeat(32),
            source_id: String::new(),
        }
    }

    #[test]
    fn test_missing_record_is_none() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::new(temp.path());
        assert!(store.load(ArtifactKind::Dict).unwrap().is_none());
    }

    #[test]
    fn test_record_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::new(temp.path().join("cache"));
        let record = sample_record();

        store.save(ArtifactKind::Scheme, &record).unwrap();
        let loaded = store.load(ArtifactKind::Scheme).unwrap().unwrap();

        assert_eq!(loaded.tag, record.tag);
        assert_eq!(loaded.content_hash, record.content_hash);
        assert_eq!(loaded.update_time, record.update_time);
        assert!(temp.path().join("cache/scheme_record.json").exists());
    }

    #[test]
    fn test_save_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::new(temp.path());
        let mut record = sample_record();
        store.save(ArtifactKind::Model, &record).unwrap();

        record.tag = "LTS".to_string();
        store.save(ArtifactKind::Model, &record).unwrap();

        let loaded = store.load(ArtifactKind::Model).unwrap().unwrap();
        assert_eq!(loaded.tag, "LTS");
        assert!(!temp.path().join("model_record.json.tmp").exists());
    }

    #[test]
    fn test_wire_format_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        for key in ["name", "update_time", "tag", "apply_time", "sha256", "cnb_id"] {
            assert!(json.get(key).is_some(), "missing field {}", key);
        }
    }

    #[test]
    fn test_reads_record_without_optional_fields() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("dict_record.json"),
            r#"{"name":"dicts.zip","update_time":"2026-01-05T10:00:00Z","tag":"dict-nightly","apply_time":"2026-01-05T11:00:00+08:00"}"#,
        )
        .unwrap();
        let store = RecordStore::new(temp.path());
        let record = store.load(ArtifactKind::Dict).unwrap().unwrap();
        assert_eq!(record.tag, "dict-nightly");
        assert!(record.content_hash.is_empty());
        assert!(record.source_id.is_empty());
    }

    #[test]
    fn test_corrupt_record_is_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("scheme_record.json"), "{not json").unwrap();
        let store = RecordStore::new(temp.path());
        assert!(matches!(
            store.load(ArtifactKind::Scheme),
            Err(UpdateError::RecordFailed { .. })
        ));
    }
}
