//! rimeup - keeps Rime input method data in sync with published releases.
//!
//! This library tracks three data artifacts for a Rime installation (the
//! input scheme package, the dictionary package and the language model file)
//! and keeps each of them up to date with the releases published on GitHub
//! or on the CNB mirror.
//!
//! # Architecture
//!
//! ```text
//! CombinedUpdater
//!     │
//!     ├── ArtifactUpdater (scheme) ─┐
//!     ├── ArtifactUpdater (dict)  ──┼── ReleaseResolver ── ReleaseSource (github | cnb)
//!     └── ArtifactUpdater (model) ─┘        │
//!                                           ├── HttpDownloader (resume + size check)
//!                                           ├── checksum (skip when already applied)
//!                                           ├── prune (remove members dropped upstream)
//!                                           ├── extractor (exclusion-aware unzip)
//!                                           └── RecordStore (last applied version)
//!     │
//!     └── Deployer (fcitx5 | ibus | squirrel | weasel | custom)
//! ```

pub mod config;
pub mod deploy;
pub mod logging;
pub mod release;
pub mod updater;
