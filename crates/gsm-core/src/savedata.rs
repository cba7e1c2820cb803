// ── Saved player profiles ──
//
// The roster merges live console output with whatever the server has
// persisted per player. Reading those files is delegated to a
// `SaveDataProvider`; decoding a single profile's contents is delegated
// further to a `ProfileDecoder`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::ProfileData;

pub const DEFAULT_PROFILE_EXTENSION: &str = "arkprofile";

/// One persisted player profile as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedProfile {
    /// Identity text taken from the file name; may not be numeric.
    pub raw_identity: String,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
    pub profile: ProfileData,
}

/// Yields the persisted player records for a server's save directory.
#[async_trait]
pub trait SaveDataProvider: Send + Sync {
    async fn load(&self, save_dir: &Path) -> Result<Vec<SavedProfile>, CoreError>;
}

/// Extracts profile fields from a profile file's bytes.
pub trait ProfileDecoder: Send + Sync {
    fn decode(&self, path: &Path, bytes: &[u8]) -> ProfileData;
}

/// Decoder that records only file metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataOnly;

impl ProfileDecoder for MetadataOnly {
    fn decode(&self, _path: &Path, bytes: &[u8]) -> ProfileData {
        let mut data = ProfileData::default();
        data.extra
            .insert("size_bytes".to_owned(), bytes.len().to_string());
        data
    }
}

/// Reads one profile file per player from a directory.
///
/// Files are matched by extension; the file stem is the raw identity.
/// Files that vanish or cannot be read mid-scan are skipped with a warning;
/// an unreadable directory fails the whole load.
#[derive(Clone)]
pub struct ProfileDirectory {
    extension: String,
    decoder: Arc<dyn ProfileDecoder>,
}

impl ProfileDirectory {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_owned(),
            decoder: Arc::new(MetadataOnly),
        }
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn ProfileDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

impl Default for ProfileDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE_EXTENSION)
    }
}

#[async_trait]
impl SaveDataProvider for ProfileDirectory {
    async fn load(&self, save_dir: &Path) -> Result<Vec<SavedProfile>, CoreError> {
        let unreadable = |e: std::io::Error| CoreError::SaveData {
            path: save_dir.to_path_buf(),
            reason: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(save_dir).await.map_err(unreadable)?;
        let mut profiles = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let path = entry.path();
            if !self.matches(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable profile");
                    continue;
                }
            };
            let modified = entry
                .metadata()
                .await
                .ok()
                .and_then(|meta| meta.modified().ok())
                .map(DateTime::<Utc>::from);
            let profile = self.decoder.decode(&path, &bytes);

            profiles.push(SavedProfile {
                raw_identity: stem,
                path,
                modified,
                profile,
            });
        }

        profiles.sort_by(|a, b| a.raw_identity.cmp(&b.raw_identity));
        debug!(dir = %save_dir.display(), count = profiles.len(), "loaded saved profiles");
        Ok(profiles)
    }
}
