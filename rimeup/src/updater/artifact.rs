//! Per-artifact update orchestration.
//!
//! An [`ArtifactUpdater`] owns one artifact kind and drives a run through:
//! 1. Pre-update hook (hard gate)
//! 2. Remote lookup (cached from [`ArtifactUpdater::check_update`] when available)
//! 3. Up-to-date and cached-archive short-circuits
//! 4. Download into a content-addressed staging file, then validation
//! 5. Pruning of members dropped since the previous archive
//! 6. Extraction (or atomic placement for the model file)
//! 7. Commit of the staged archive into the cache slot
//! 8. Record write, then best-effort post hook and sync

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::config::UpdaterConfig;
use super::download::{self, DownloadSample, HttpDownloader};
use super::error::{UpdateError, UpdateResult};
use super::extractor::{normalize_nested, SelectiveExtractor};
use super::hooks::{HookContext, Hooks};
use super::kind::{ArtifactKind, ArtifactSpec};
use super::progress::{ProgressCallback, ProgressEvent};
use super::prune::prune_stale_members;
use super::record::{RecordStore, UpdateRecord};
use super::sync::{copy_file, SyncTargets};
use super::traits::{ArtifactDownloader, DownloadProgressFn};
use crate::deploy::{self, Deployer};
use crate::release::{create_source, ReleaseResolver, ReqwestClient, UpdateInfo};

/// Local version shown when no record exists.
pub const NOT_INSTALLED: &str = "not installed";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Nothing has happened yet.
    Idle,
    /// Looking up the remote version.
    CheckingRemote,
    /// Installed copy is current.
    UpToDate,
    /// A newer remote version exists.
    NeedsDownload,
    /// Transferring bytes.
    Downloading,
    /// Checking the downloaded file.
    Validating,
    /// Unpacking or placing files.
    Extracting,
    /// Removing members dropped from the archive.
    Pruning,
    /// Asking the frontend to reload.
    Deploying,
    /// The record for the applied version was written.
    RecordWritten,
    /// The last run failed.
    Failed,
}

impl UpdateState {
    /// Human-readable name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::CheckingRemote => "Checking remote",
            Self::UpToDate => "Up to date",
            Self::NeedsDownload => "Update available",
            Self::Downloading => "Downloading",
            Self::Validating => "Validating",
            Self::Extracting => "Extracting",
            Self::Pruning => "Pruning",
            Self::Deploying => "Deploying",
            Self::RecordWritten => "Done",
            Self::Failed => "Failed",
        }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// New files were applied.
    Updated {
        /// Tag of the applied release.
        tag: String,
        /// Messages from best-effort steps that failed.
        warnings: Vec<String>,
    },
    /// The committed archive already matched; only the record was rewritten.
    RecordRefreshed {
        /// Tag of the recorded release.
        tag: String,
    },
    /// Nothing to do.
    AlreadyUpToDate,
}

impl RunOutcome {
    /// Whether files in the data directory changed.
    pub fn changed_files(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Remote versus local comparison for one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactStatus {
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Remote release tag.
    pub remote_version: String,
    /// Remote update time.
    pub remote_time: DateTime<Utc>,
    /// Recorded tag, or [`NOT_INSTALLED`].
    pub local_version: String,
    /// Recorded update time.
    pub local_time: Option<DateTime<Utc>>,
    /// Whether a run would apply something.
    pub needs_update: bool,
    /// Short explanation for display.
    pub message: String,
}

/// Whether `info` should be applied on top of `record`.
///
/// A missing key file always needs an update. Otherwise the remote time must
/// be strictly newer than the recorded one.
pub fn needs_update(info: &UpdateInfo, record: Option<&UpdateRecord>, key_present: bool) -> bool {
    if !key_present {
        return true;
    }
    match record {
        Some(record) => info.is_newer_than(&record.update_time),
        None => true,
    }
}

/// Shared collaborators of every artifact updater.
#[derive(Clone)]
pub struct UpdaterServices {
    /// Remote lookup.
    pub resolver: Arc<ReleaseResolver>,
    /// Byte transfer.
    pub downloader: Arc<dyn ArtifactDownloader>,
    /// Frontend reload.
    pub deployer: Arc<dyn Deployer>,
}

impl UpdaterServices {
    /// Build the production HTTP stack for `config`.
    pub fn from_config(config: &UpdaterConfig, deployer: Arc<dyn Deployer>) -> UpdateResult<Self> {
        let client = ReqwestClient::new(config.timeout, config.proxy.as_deref())
            .map_err(|e| UpdateError::Config(e.to_string()))?;
        let source = create_source(config.source, Arc::new(client), config.github_token.clone());
        let downloader = HttpDownloader::with_settings(config.timeout, config.proxy.as_deref())?;

        Ok(Self {
            resolver: Arc::new(ReleaseResolver::new(source)),
            downloader: Arc::new(downloader),
            deployer,
        })
    }
}

/// Progress emitter bound to one run.
struct Reporter<'a> {
    kind: ArtifactKind,
    callback: Option<&'a ProgressCallback>,
    source_label: String,
    file_name: String,
}

impl Reporter<'_> {
    fn stage(&self, message: impl Into<String>, percent: f64) {
        if let Some(callback) = self.callback {
            let mut event = ProgressEvent::stage(self.kind, message, percent);
            event.source_label = self.source_label.clone();
            event.file_name = self.file_name.clone();
            callback(&event);
        }
    }

    fn download(&self, sample: DownloadSample) {
        if let Some(callback) = self.callback {
            callback(&ProgressEvent {
                kind: self.kind,
                message: format!("Downloading {}", self.file_name),
                percent: sample.ratio,
                source_label: self.source_label.clone(),
                file_name: self.file_name.clone(),
                downloaded: sample.downloaded,
                total: sample.total,
                speed_mbps: sample.speed_mbps,
                is_download_phase: true,
            });
        }
    }
}

/// Updates one artifact kind.
///
/// At most one `run` per kind may be in flight; callers enforce this.
pub struct ArtifactUpdater {
    spec: ArtifactSpec,
    rime_dir: PathBuf,
    records: RecordStore,
    extractor: SelectiveExtractor,
    hooks: Hooks,
    sync: SyncTargets,
    services: UpdaterServices,
    update_info: Option<UpdateInfo>,
    state: UpdateState,
}

impl ArtifactUpdater {
    /// Create an updater for `spec` using the shared settings of `config`.
    pub fn new(spec: ArtifactSpec, config: &UpdaterConfig, services: UpdaterServices) -> Self {
        Self {
            spec,
            rime_dir: config.rime_dir.clone(),
            records: RecordStore::new(&config.cache_dir),
            extractor: SelectiveExtractor::new(config.exclusions.clone()),
            hooks: config.hooks.clone(),
            sync: config.sync.clone(),
            services,
            update_info: None,
            state: UpdateState::Idle,
        }
    }

    /// Artifact kind.
    pub fn kind(&self) -> ArtifactKind {
        self.spec.kind
    }

    /// Artifact spec.
    pub fn spec(&self) -> &ArtifactSpec {
        &self.spec
    }

    /// State reached by the last operation.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Remote info cached by the last check or run.
    pub fn update_info(&self) -> Option<&UpdateInfo> {
        self.update_info.as_ref()
    }

    /// Record of the last applied version.
    pub fn record(&self) -> UpdateResult<Option<UpdateRecord>> {
        self.records.load(self.spec.kind)
    }

    /// Path the committed archive is kept at.
    pub fn cache_slot(&self) -> PathBuf {
        self.records.cache_dir().join(&self.spec.filename)
    }

    /// Look up the remote version and cache it for the next run.
    pub fn check_update(&mut self) -> UpdateResult<&UpdateInfo> {
        self.state = UpdateState::CheckingRemote;
        match self.services.resolver.resolve(&self.spec) {
            Ok(info) => {
                self.state = UpdateState::Idle;
                Ok(self.update_info.insert(info))
            }
            Err(e) => {
                self.state = UpdateState::Failed;
                Err(e)
            }
        }
    }

    /// Whether the cached remote info is newer than what is installed.
    ///
    /// False when nothing has been checked yet. An unreadable record counts
    /// as needing an update.
    pub fn has_update(&self) -> bool {
        let Some(info) = &self.update_info else {
            return false;
        };
        match self.records.load(self.spec.kind) {
            Ok(record) => needs_update(info, record.as_ref(), self.spec.key_present()),
            Err(e) => {
                warn!(kind = %self.spec.kind, error = %e, "Unreadable record, treating as outdated");
                true
            }
        }
    }

    /// Compare remote and local versions without changing anything.
    ///
    /// Uses the cached remote info when present, otherwise resolves it.
    pub fn status(&self) -> UpdateResult<ArtifactStatus> {
        let resolved;
        let info = match &self.update_info {
            Some(info) => info,
            None => {
                resolved = self.services.resolver.resolve(&self.spec)?;
                &resolved
            }
        };

        let record = self.records.load(self.spec.kind)?;
        let key_present = self.spec.key_present();
        let needs = needs_update(info, record.as_ref(), key_present);

        let message = match (&record, key_present, needs) {
            (None, _, _) => NOT_INSTALLED.to_string(),
            (Some(_), false, _) => "installed files are missing".to_string(),
            (Some(r), true, true) => format!("update available: {} -> {}", r.tag, info.tag),
            (Some(_), true, false) => "up to date".to_string(),
        };

        Ok(ArtifactStatus {
            kind: self.spec.kind,
            remote_version: info.tag.clone(),
            remote_time: info.update_time,
            local_version: record
                .as_ref()
                .map(|r| r.tag.clone())
                .unwrap_or_else(|| NOT_INSTALLED.to_string()),
            local_time: record.as_ref().map(|r| r.update_time),
            needs_update: needs,
            message,
        })
    }

    /// Run the full update pipeline.
    pub fn run(&mut self, on_progress: Option<&ProgressCallback>) -> UpdateResult<RunOutcome> {
        let mut reporter = Reporter {
            kind: self.spec.kind,
            callback: on_progress,
            source_label: self.services.resolver.source_kind().label().to_string(),
            file_name: self.spec.filename.clone(),
        };

        match self.run_pipeline(&mut reporter) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.state = UpdateState::Failed;
                error!(kind = %self.spec.kind, error = %e, "Update failed");
                reporter.stage(format!("Failed: {}", e), 1.0);
                Err(e)
            }
        }
    }

    /// Terminate and redeploy the frontend.
    pub fn deploy(&mut self) -> UpdateResult<()> {
        self.state = UpdateState::Deploying;
        let result = deploy::redeploy(self.services.deployer.as_ref());
        self.state = if result.is_ok() {
            UpdateState::Idle
        } else {
            UpdateState::Failed
        };
        result
    }

    fn run_pipeline(&mut self, reporter: &mut Reporter<'_>) -> UpdateResult<RunOutcome> {
        let kind = self.spec.kind;
        info!(kind = %kind, "Starting update run");

        let cached_tag = self
            .update_info
            .as_ref()
            .map(|i| i.tag.clone())
            .unwrap_or_default();
        self.hooks.run_pre_update(&HookContext {
            kind,
            tag: &cached_tag,
            dest: &self.spec.dest_dir,
        })?;

        self.state = UpdateState::CheckingRemote;
        reporter.stage("Checking for updates", 0.02);
        let info = match self.update_info.clone() {
            Some(info) => info,
            None => {
                let info = self.services.resolver.resolve(&self.spec)?;
                self.update_info = Some(info.clone());
                info
            }
        };

        let record = self.records.load(kind)?;
        let key_present = self.spec.key_present();
        if !needs_update(&info, record.as_ref(), key_present) {
            self.state = UpdateState::UpToDate;
            info!(kind = %kind, tag = %info.tag, "Already up to date");
            reporter.stage("Already up to date", 1.0);
            return Ok(RunOutcome::AlreadyUpToDate);
        }
        self.state = UpdateState::NeedsDownload;

        let cache_dir = self.records.cache_dir().to_path_buf();
        fs::create_dir_all(&cache_dir).map_err(|e| UpdateError::CreateDirFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        let cache_slot = self.cache_slot();
        let remote_hash = info.content_hash.clone().unwrap_or_default();

        if key_present && download::is_up_to_date(&remote_hash, &cache_slot) {
            info!(kind = %kind, "Committed archive matches remote, refreshing record");
            reporter.stage("Cached file matches remote", 0.9);
            self.write_record(&info, remote_hash)?;
            reporter.stage("Record refreshed", 1.0);
            return Ok(RunOutcome::RecordRefreshed { tag: info.tag });
        }

        let staging = self.staging_path(&info);
        if download::is_up_to_date(&remote_hash, &staging) {
            info!(kind = %kind, staging = %staging.display(), "Reusing downloaded file");
            reporter.stage("Reusing downloaded file", 0.6);
        } else {
            self.state = UpdateState::Downloading;
            reporter.file_name = info.name.clone();
            reporter.stage(format!("Downloading from {}", reporter.source_label), 0.05);
            let expected = (info.size_bytes > 0).then_some(info.size_bytes);
            let reporter_ref = &*reporter;
            let on_sample: &DownloadProgressFn<'_> =
                &move |sample: DownloadSample| reporter_ref.download(sample);
            self.services
                .downloader
                .download(&info.url, &staging, expected, Some(on_sample))?;
        }

        self.state = UpdateState::Validating;
        reporter.stage("Validating", 0.65);
        if !remote_hash.is_empty() {
            if let Err(e) = download::verify_checksum(&staging, &remote_hash) {
                if let Err(rm) = fs::remove_file(&staging) {
                    warn!(path = %staging.display(), error = %rm, "Failed to remove corrupt download");
                }
                return Err(e);
            }
        }

        let applied_path = if self.spec.kind.is_archive() {
            self.state = UpdateState::Pruning;
            reporter.stage("Removing obsolete files", 0.7);
            prune_stale_members(
                &cache_slot,
                &staging,
                &self.spec.dest_dir,
                &self.spec.archive_stem(),
            )?;

            self.state = UpdateState::Extracting;
            reporter.stage("Extracting", 0.75);
            fs::create_dir_all(&self.spec.dest_dir).map_err(|e| UpdateError::CreateDirFailed {
                path: self.spec.dest_dir.clone(),
                source: e,
            })?;
            let summary = self.extractor.extract(&staging, &self.spec.dest_dir)?;
            debug!(
                written = summary.written,
                preserved = summary.preserved,
                "Extraction summary"
            );
            normalize_nested(
                &self.spec.dest_dir,
                &self.spec.archive_stem(),
                self.extractor.patterns(),
            )?;
            self.spec.dest_dir.clone()
        } else {
            self.state = UpdateState::Extracting;
            reporter.stage("Installing model", 0.75);
            self.place_model(&staging)?
        };

        reporter.stage("Committing", 0.9);
        commit_file(&staging, &cache_slot)?;

        let content_hash = if remote_hash.is_empty() {
            download::calculate_file_checksum(&cache_slot)?
        } else {
            remote_hash
        };
        self.write_record(&info, content_hash)?;

        let mut warnings = Vec::new();
        let ctx = HookContext {
            kind,
            tag: &info.tag,
            dest: &self.spec.dest_dir,
        };
        if let Some(failure) = self.hooks.run_post_update(&ctx) {
            reporter.stage(format!("Post-update hook failed: {}", failure), 0.95);
            warnings.push(format!("post-update hook: {}", failure));
        }

        let is_archive = self.spec.kind.is_archive();
        let stem = self.spec.archive_stem();
        let extractor = &self.extractor;
        let filename = &self.spec.filename;
        let engine_failures = self
            .sync
            .sync_engines(&self.rime_dir, &self.spec.dest_dir, |target| {
                if is_archive {
                    extractor.extract(&cache_slot, target)?;
                    normalize_nested(target, &stem, extractor.patterns())?;
                    Ok(())
                } else {
                    copy_file(&applied_path, &target.join(filename))
                }
            });
        for failure in engine_failures {
            reporter.stage(format!("Engine sync failed: {}", failure), 0.97);
            warnings.push(format!("engine sync: {}", failure));
        }
        if !is_archive {
            if let Some(failure) = self.sync.sync_compat(&applied_path) {
                reporter.stage(format!("Compatibility sync failed: {}", failure), 0.98);
                warnings.push(format!("compat sync: {}", failure));
            }
        }

        info!(kind = %kind, tag = %info.tag, "Update applied");
        reporter.stage("Update complete", 1.0);
        Ok(RunOutcome::Updated {
            tag: info.tag,
            warnings,
        })
    }

    /// `<cache>/temp_<kind>_<hash><ext>` for this remote version.
    ///
    /// The remote hash names the file only when it is a 64-digit hex SHA-256.
    fn staging_path(&self, info: &UpdateInfo) -> PathBuf {
        let hash = match &info.content_hash {
            Some(h) if is_sha256_hex(h) => h.to_lowercase(),
            _ => {
                let digest =
                    download::digest_str(&format!("{}{}", info.url, info.update_time.to_rfc3339()));
                digest[..16].to_string()
            }
        };
        let ext = if self.spec.kind.is_archive() {
            ".zip".to_string()
        } else {
            self.spec.staging_extension()
        };
        self.records
            .cache_dir()
            .join(format!("temp_{}_{}{}", self.spec.kind.label(), hash, ext))
    }

    /// Copy the model next to its target under a temporary name, then rename.
    fn place_model(&self, staging: &Path) -> UpdateResult<PathBuf> {
        let dest_dir = &self.spec.dest_dir;
        fs::create_dir_all(dest_dir).map_err(|e| UpdateError::CreateDirFailed {
            path: dest_dir.clone(),
            source: e,
        })?;

        let target = dest_dir.join(&self.spec.filename);
        let temp = dest_dir.join(format!(".{}.rimeup-tmp", self.spec.filename));
        fs::copy(staging, &temp).map_err(|e| UpdateError::WriteFailed {
            path: temp.clone(),
            source: e,
        })?;
        if let Err(e) = fs::rename(&temp, &target) {
            if let Err(rm) = fs::remove_file(&temp) {
                warn!(path = %temp.display(), error = %rm, "Failed to remove temporary model copy");
            }
            return Err(UpdateError::WriteFailed {
                path: target,
                source: e,
            });
        }

        debug!(target = %target.display(), "Model placed");
        Ok(target)
    }

    fn write_record(&mut self, info: &UpdateInfo, content_hash: String) -> UpdateResult<()> {
        let record = UpdateRecord {
            artifact_name: info.name.clone(),
            update_time: info.update_time,
            tag: info.tag.clone(),
            applied_at: Utc::now(),
            content_hash,
            source_id: info.source_id.clone(),
        };
        self.records.save(self.spec.kind, &record)?;
        self.state = UpdateState::RecordWritten;
        Ok(())
    }
}

/// Move `from` to `to`, copying across filesystems when a rename fails.
fn commit_file(from: &Path, to: &Path) -> UpdateResult<()> {
    if from == to {
        return Ok(());
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| UpdateError::WriteFailed {
        path: to.to_path_buf(),
        source: e,
    })?;
    fs::remove_file(from).map_err(|e| UpdateError::WriteFailed {
        path: from.to_path_buf(),
        source: e,
    })
}

fn is_sha256_hex(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{ReleaseSourceKind, RetryPolicy};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn info_at(time: DateTime<Utc>) -> UpdateInfo {
        UpdateInfo {
            name: "dicts.zip".into(),
            url: "https://example.com/dicts.zip".into(),
            update_time: time,
            tag: "dict-nightly".into(),
            description: String::new(),
            content_hash: None,
            size_bytes: 0,
            source_id: String::new(),
            source: ReleaseSourceKind::Github,
        }
    }

    fn record_at(time: DateTime<Utc>) -> UpdateRecord {
        UpdateRecord {
            artifact_name: "dicts.zip".into(),
            update_time: time,
            tag: "dict-nightly".into(),
            applied_at: Utc::now(),
            content_hash: String::new(),
            source_id: String::new(),
        }
    }

    #[test]
    fn test_needs_update_without_record() {
        let t = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert!(needs_update(&info_at(t), None, true));
    }

    #[test]
    fn test_missing_key_file_forces_update() {
        let t = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert!(needs_update(&info_at(t), Some(&record_at(t)), false));
    }

    #[test]
    fn test_commit_file_moves() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("temp_dict_abc.zip");
        let to = temp.path().join("dicts.zip");
        fs::write(&from, "zip").unwrap();
        fs::write(&to, "old").unwrap();

        commit_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "zip");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(UpdateState::RecordWritten.name(), "Done");
        assert_eq!(UpdateState::NeedsDownload.name(), "Update available");
    }

    #[test]
    fn test_outcome_changed_files() {
        assert!(RunOutcome::Updated {
            tag: "v1".into(),
            warnings: vec![]
        }
        .changed_files());
        assert!(!RunOutcome::RecordRefreshed { tag: "v1".into() }.changed_files());
        assert!(!RunOutcome::AlreadyUpToDate.changed_files());
    }

    struct NoSource;

    impl crate::release::ReleaseSource for NoSource {
        fn kind(&self) -> ReleaseSourceKind {
            ReleaseSourceKind::Github
        }

        fn fetch_releases(
            &self,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<Vec<crate::release::Release>, crate::release::SourceError> {
            Ok(Vec::new())
        }
    }

    fn offline_updater(spec: ArtifactSpec, config: &UpdaterConfig) -> ArtifactUpdater {
        let services = UpdaterServices {
            resolver: Arc::new(
                ReleaseResolver::new(Arc::new(NoSource)).with_policy(RetryPolicy::None),
            ),
            downloader: Arc::new(HttpDownloader::new().unwrap()),
            deployer: Arc::new(crate::deploy::DeployerKind::None),
        };
        ArtifactUpdater::new(spec, config, services)
    }

    #[test]
    fn test_staging_path_names() {
        let temp = TempDir::new().unwrap();
        let config = UpdaterConfig::new(temp.path(), temp.path().join("cache"));
        let dict = offline_updater(
            ArtifactSpec::new(ArtifactKind::Dict, "o", "r", "dicts.zip", temp.path()),
            &config,
        );
        let model = offline_updater(
            ArtifactSpec::new(ArtifactKind::Model, "o", "r", "zh.gram", temp.path()),
            &config,
        );

        let t = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let hex = "AB".repeat(32);
        let mut hashed = info_at(t);
        hashed.content_hash = Some(hex.clone());
        assert_eq!(
            dict.staging_path(&hashed).file_name().unwrap().to_string_lossy(),
            format!("temp_dict_{}.zip", hex.to_lowercase())
        );

        let unhashed = dict.staging_path(&info_at(t));
        let name = unhashed.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name.len(), "temp_dict_".len() + 16 + ".zip".len());

        let later = dict.staging_path(&info_at(t + Duration::seconds(1)));
        assert_ne!(unhashed, later);

        let model_staging = model.staging_path(&hashed);
        assert_eq!(
            model_staging.file_name().unwrap().to_string_lossy(),
            format!("temp_model_{}.gram", hex.to_lowercase())
        );

        // Hashes that are not plain hex never reach the file name.
        let cache = temp.path().join("cache");
        let padded = format!("{}/..", "0".repeat(61));
        for bad in ["../../escape", "ab/cd", padded.as_str(), "abc123"] {
            let mut hostile = info_at(t);
            hostile.content_hash = Some(bad.to_string());
            let path = dict.staging_path(&hostile);
            assert_eq!(path.parent().unwrap(), cache);
            assert_eq!(path, unhashed);
        }
    }

    #[test]
    fn test_place_model_failure_leaves_no_temp_copy() {
        let temp = TempDir::new().unwrap();
        let rime = temp.path().join("rime");
        // A directory where the model file should go makes the rename fail.
        fs::create_dir_all(rime.join("zh.gram").join("occupied")).unwrap();
        let staging = temp.path().join("temp_model_x.gram");
        fs::write(&staging, "model").unwrap();

        let config = UpdaterConfig::new(&rime, temp.path().join("cache"));
        let model = offline_updater(
            ArtifactSpec::new(ArtifactKind::Model, "o", "r", "zh.gram", &rime),
            &config,
        );

        let result = model.place_model(&staging);
        assert!(matches!(result, Err(UpdateError::WriteFailed { .. })));
        assert!(!rime.join(".zh.gram.rimeup-tmp").exists());
        assert!(staging.exists());
    }

    #[test]
    fn test_is_sha256_hex() {
        assert!(is_sha256_hex(&"a1".repeat(32)));
        assert!(is_sha256_hex(&"F0".repeat(32)));
        assert!(!is_sha256_hex(&"a1".repeat(31)));
        assert!(!is_sha256_hex(&format!("{}zz", "a".repeat(62))));
        assert!(!is_sha256_hex(""));
    }

    proptest! {
        #[test]
        fn prop_needs_update_iff_strictly_newer(remote in -10_000i64..10_000, local in -10_000i64..10_000) {
            let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let info = info_at(base + Duration::seconds(remote));
            let record = record_at(base + Duration::seconds(local));
            prop_assert_eq!(needs_update(&info, Some(&record), true), remote > local);
        }
    }
}
