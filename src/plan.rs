use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dates::DateRange;
use crate::error::{Result, SyncError};
use crate::extractor::ExtractConfig;
use crate::normalizer::{CategoryPolicy, ColumnLayout, NormalizePolicy};
use crate::uploader::{RetryPolicy, UploadOptions, DEFAULT_BATCH_SIZE, MAX_ATTEMPTS};

/// Either a preset name (`full`, `short`) or explicit column indices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LayoutSpec {
    Preset(String),
    Custom(ColumnLayout),
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self::Preset("full".to_string())
    }
}

impl LayoutSpec {
    pub fn resolve(&self) -> Result<ColumnLayout> {
        match self {
            Self::Preset(name) => ColumnLayout::preset(name),
            Self::Custom(layout) => Ok(layout.clone()),
        }
    }
}

/// One sheet to read, as written in a plan file or assembled from CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub file: PathBuf,
    pub sheet: String,
    #[serde(default)]
    pub layout: LayoutSpec,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub category_default: Option<String>,
    #[serde(default)]
    pub strict_category: bool,
    #[serde(default)]
    pub allowed_categories: Option<Vec<String>>,
    #[serde(default)]
    pub people_default: u64,
    #[serde(default)]
    pub header_sentinels: Vec<String>,
}

/// A validated source, ready to read.
#[derive(Debug, Clone)]
pub struct Source {
    pub file: PathBuf,
    pub sheet: String,
    pub config: ExtractConfig,
}

impl SourceSpec {
    /// Check everything that can be checked without touching the network.
    /// Relative paths are taken from `base_dir`.
    pub fn resolve(&self, base_dir: &Path) -> Result<Source> {
        let layout = self.layout.resolve()?;
        let range = DateRange::parse(&self.from, &self.to)?;
        let category = match (&self.category_default, self.strict_category) {
            (Some(default), false) => CategoryPolicy::Lenient {
                default: default.trim().to_string(),
                allowed: self.allowed_categories.clone(),
            },
            _ if self.allowed_categories.is_some() => {
                return Err(SyncError::Other(
                    "allowed_categories needs a category_default (and no strict_category)".into(),
                ));
            }
            _ => CategoryPolicy::Strict,
        };
        let file = if self.file.is_absolute() {
            self.file.clone()
        } else {
            base_dir.join(&self.file)
        };
        if !file.is_file() {
            return Err(SyncError::SourceNotFound(file));
        }
        Ok(Source {
            file,
            sheet: self.sheet.clone(),
            config: ExtractConfig {
                layout,
                policy: NormalizePolicy {
                    category,
                    people_default: self.people_default,
                    header_sentinels: self.header_sentinels.clone(),
                },
                range,
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncPlan {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub sources: Vec<SourceSpec>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// A plan whose sources all exist and whose options are sane.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub sources: Vec<Source>,
    pub upload: UploadOptions,
}

impl ResolvedPlan {
    pub fn ranges(&self) -> Vec<DateRange> {
        let mut ranges: Vec<DateRange> = Vec::new();
        for source in &self.sources {
            if !ranges.contains(&source.config.range) {
                ranges.push(source.config.range);
            }
        }
        ranges
    }
}

impl SyncPlan {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SyncError::SourceNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn resolve(&self, base_dir: &Path) -> Result<ResolvedPlan> {
        if self.batch_size == 0 {
            return Err(SyncError::Other("batch_size must be at least 1".into()));
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(SyncError::Other(format!(
                "retry.max_attempts must be between 1 and {MAX_ATTEMPTS}, got {}",
                self.retry.max_attempts
            )));
        }
        if self.sources.is_empty() {
            return Err(SyncError::Other("plan has no sources".into()));
        }
        let sources = self
            .sources
            .iter()
            .map(|s| s.resolve(base_dir))
            .collect::<Result<Vec<_>>>()?;
        Ok(ResolvedPlan {
            sources,
            upload: UploadOptions {
                batch_size: self.batch_size,
                retry: self.retry,
            },
        })
    }
}
