//! The update pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        CombinedUpdater                          │
//! │   fetch_all_updates / has_any_update / run_all_with_progress    │
//! └───────────────┬─────────────────┬─────────────────┬─────────────┘
//!                 ▼                 ▼                 ▼
//!          ArtifactUpdater   ArtifactUpdater   ArtifactUpdater
//!             (scheme)           (dict)            (model)
//!                 │
//!   ReleaseResolver → ArtifactDownloader → checksum → prune
//!                   → SelectiveExtractor → RecordStore → Deployer
//! ```
//!
//! Each artifact run touches only its own cache slot, record file and
//! destination subtree, so the combined updater runs them on scoped threads
//! and joins before the single deploy.

pub mod artifact;
pub mod combined;
pub mod config;
pub mod download;
pub mod error;
pub mod exclusion;
pub mod extractor;
pub mod hooks;
pub mod kind;
pub mod progress;
pub mod prune;
pub mod record;
pub mod sync;
pub mod traits;

pub use artifact::{
    needs_update, ArtifactStatus, ArtifactUpdater, RunOutcome, UpdateState, UpdaterServices,
    NOT_INSTALLED,
};
pub use combined::{CombinedReport, CombinedUpdater};
pub use config::UpdaterConfig;
pub use download::HttpDownloader;
pub use error::{UpdateError, UpdateResult};
pub use exclusion::ExclusionPattern;
pub use extractor::{ExtractSummary, SelectiveExtractor};
pub use hooks::{HookContext, Hooks};
pub use kind::{ArtifactKind, ArtifactSpec};
pub use progress::{
    completion_channel, progress_channel, ProgressCallback, ProgressEvent, ProgressSink,
    RunCompletion, DEFAULT_PROGRESS_CAPACITY,
};
pub use prune::prune_stale_members;
pub use record::{RecordStore, UpdateRecord};
pub use sync::SyncTargets;
pub use traits::{ArtifactDownloader, DownloadProgressFn};
