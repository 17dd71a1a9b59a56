//! The three tracked artifact kinds and their per-kind settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One of the three data artifacts kept in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// The input scheme package (zip).
    Scheme,
    /// The dictionary package (zip).
    Dict,
    /// The language model file.
    Model,
}

impl ArtifactKind {
    /// All kinds in update order.
    pub const ALL: [ArtifactKind; 3] = [Self::Scheme, Self::Dict, Self::Model];

    /// Short identifier used in file names, config sections and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheme => "scheme",
            Self::Dict => "dict",
            Self::Model => "model",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Scheme => "Scheme",
            Self::Dict => "Dictionary",
            Self::Model => "Model",
        }
    }

    /// File name of the persisted record inside the cache directory.
    pub fn record_filename(&self) -> &'static str {
        match self {
            Self::Scheme => "scheme_record.json",
            Self::Dict => "dict_record.json",
            Self::Model => "model_record.json",
        }
    }

    /// Whether the downloaded asset is a zip archive to extract.
    ///
    /// The model is a single file placed as-is.
    pub fn is_archive(&self) -> bool {
        !matches!(self, Self::Model)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheme" => Ok(Self::Scheme),
            "dict" | "dictionary" => Ok(Self::Dict),
            "model" | "gram" => Ok(Self::Model),
            other => Err(format!("unknown artifact kind '{}'", other)),
        }
    }
}

/// Where one artifact comes from and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSpec {
    /// Which artifact this is.
    pub kind: ArtifactKind,
    /// Repository owner on the release source.
    pub owner: String,
    /// Repository name on the release source.
    pub repo: String,
    /// Release tag to look in; `None` scans every release, newest first.
    pub tag: Option<String>,
    /// Exact asset file name to match.
    pub filename: String,
    /// Extraction destination (archives) or target directory (model).
    pub dest_dir: PathBuf,
    /// Marker relative to `dest_dir` whose absence forces an update.
    ///
    /// When `None`, the destination directory itself is the marker.
    pub key_file: Option<String>,
}

impl ArtifactSpec {
    /// Create a spec with no tag and no key file.
    pub fn new(
        kind: ArtifactKind,
        owner: impl Into<String>,
        repo: impl Into<String>,
        filename: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            owner: owner.into(),
            repo: repo.into(),
            tag: None,
            filename: filename.into(),
            dest_dir: dest_dir.into(),
            key_file: None,
        }
    }

    /// Set the release tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the key file marker.
    pub fn with_key_file(mut self, key_file: impl Into<String>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    /// Absolute path of the key file marker.
    pub fn key_path(&self) -> PathBuf {
        match &self.key_file {
            Some(name) if !name.is_empty() => self.dest_dir.join(name),
            _ => self.dest_dir.clone(),
        }
    }

    /// Whether the installed copy looks present on disk.
    pub fn key_present(&self) -> bool {
        self.key_path().exists()
    }

    /// Archive name without its extension, used to detect redundant nesting.
    pub fn archive_stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Extension of the configured filename including the dot, or `.zip`.
    pub fn staging_extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".zip".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_filenames() {
        assert_eq!(ArtifactKind::Scheme.record_filename(), "scheme_record.json");
        assert_eq!(ArtifactKind::Dict.record_filename(), "dict_record.json");
        assert_eq!(ArtifactKind::Model.record_filename(), "model_record.json");
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Scheme".parse::<ArtifactKind>(), Ok(ArtifactKind::Scheme));
        assert_eq!(
            "dictionary".parse::<ArtifactKind>(),
            Ok(ArtifactKind::Dict)
        );
        assert_eq!(" model ".parse::<ArtifactKind>(), Ok(ArtifactKind::Model));
        assert!("theme".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn test_only_model_is_not_archive() {
        assert!(ArtifactKind::Scheme.is_archive());
        assert!(ArtifactKind::Dict.is_archive());
        assert!(!ArtifactKind::Model.is_archive());
    }

    #[test]
    fn test_key_path_defaults_to_dest() {
        let spec = ArtifactSpec::new(
            ArtifactKind::Dict,
            "o",
            "r",
            "dicts.zip",
            "/rime/dicts",
        );
        assert_eq!(spec.key_path(), PathBuf::from("/rime/dicts"));

        let spec = spec.with_key_file("base.dict.yaml");
        assert_eq!(spec.key_path(), PathBuf::from("/rime/dicts/base.dict.yaml"));
    }

    #[test]
    fn test_archive_stem_and_extension() {
        let spec = ArtifactSpec::new(
            ArtifactKind::Scheme,
            "o",
            "r",
            "rime-wanxiang-base.zip",
            "/rime",
        );
        assert_eq!(spec.archive_stem(), "rime-wanxiang-base");
        assert_eq!(spec.staging_extension(), ".zip");

        let model = ArtifactSpec::new(ArtifactKind::Model, "o", "r", "zh.gram", "/rime");
        assert_eq!(model.staging_extension(), ".gram");
    }
}
