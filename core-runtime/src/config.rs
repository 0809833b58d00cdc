//! # Core Configuration Module
//!
//! Builder-based configuration for the media library core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds the host collaborators the core needs and the settings
//! for synchronization, scanning and naming. It is validated once, at build
//! time, so a misconfigured host fails at startup instead of mid-scan.
//!
//! ## Required Dependencies
//!
//! - `data_dir` - Where cache snapshots and the ignore list are stored
//! - `FileIndex` - Observed-file listing for the scan pipeline
//!
//! With the `desktop-shims` feature, both fall back to desktop defaults
//! (platform data directory and a tokio-backed file index).
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ScanSettings};
//!
//! let config = CoreConfig::builder()
//!     .data_dir("/var/lib/medialib")
//!     .file_index(Arc::new(TokioFileIndex::new()))
//!     .scan(ScanSettings::default().with_missing_check(false))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::{Clock, FileIndex, LoggerSink, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default naming style: `Show - S01E02[-E03] - Title`.
pub const DEFAULT_EPISODE_STYLE: &str =
    "{ShowName} - S{Season:2}E{Episode}[-E{Episode2}] - {EpisodeName}";

/// Default season folder style.
pub const DEFAULT_SEASON_FOLDER_STYLE: &str = "Season {Season:2}";

/// Longest path, in characters, a rendered file name may produce.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 200;

/// Core configuration for the media library core.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory holding cache snapshots and the ignore list
    pub data_dir: PathBuf,

    /// Observed-state collaborator for the scan pipeline
    pub file_index: Arc<dyn FileIndex>,

    /// Time source used for watermarks and air-date checks
    pub clock: Arc<dyn Clock>,

    /// Optional host log sink
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    pub sync: SyncSettings,
    pub scan: ScanSettings,
    pub naming: NamingSettings,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("file_index", &"FileIndex { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("sync", &self.sync)
            .field("scan", &self.scan)
            .field("naming", &self.naming)
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Path of the snapshot file for one cache (`movies` or `series`).
    pub fn snapshot_path(&self, cache_name: &str) -> PathBuf {
        self.data_dir.join(format!("{}-cache.json", cache_name))
    }

    /// Logging settings that forward to the configured host sink.
    ///
    /// Pass the result, adjusted as needed, to
    /// [`init_logging`](crate::logging::init_logging).
    pub fn logging_config(&self) -> LoggingConfig {
        let logging = LoggingConfig::default();
        match &self.logger_sink {
            Some(sink) => logging.with_logger_sink(Arc::clone(sink)),
            None => logging,
        }
    }

    /// Path of the persisted ignore list.
    pub fn ignore_list_path(&self) -> PathBuf {
        self.data_dir.join("ignore-list.json")
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.event_capacity == 0 {
            return Err(Error::Config(
                "Event capacity must be greater than 0".to_string(),
            ));
        }

        self.sync.validate()?;
        self.scan.validate()?;
        self.naming.validate()?;
        Ok(())
    }
}

/// Incremental synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Maximum number of dirty records refreshed in one pass; `None` refreshes all
    pub refresh_batch_limit: Option<usize>,

    /// Persist the cache snapshot after every successful commit
    pub snapshot_after_commit: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            refresh_batch_limit: None,
            snapshot_after_commit: true,
        }
    }
}

impl SyncSettings {
    pub fn with_refresh_batch_limit(mut self, limit: usize) -> Self {
        self.refresh_batch_limit = Some(limit);
        self
    }

    pub fn with_snapshot_after_commit(mut self, enabled: bool) -> Self {
        self.snapshot_after_commit = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_batch_limit == Some(0) {
            return Err(Error::Config(
                "Refresh batch limit must be greater than 0. Omit it to refresh everything."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Reconciliation pass settings.
///
/// The four stage switches gate `FolderCheck`, `LibraryMerge` and the two
/// halves of the rename/missing stage. A disabled stage is skipped, not failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub folder_check: bool,
    pub library_merge: bool,
    /// Offer renames for files whose numbering matches but name does not
    pub rename_check: bool,
    /// Report expected episodes with no matching file
    pub missing_check: bool,
    /// Queue per-episode metadata files next to matched videos
    pub episode_metadata: bool,
    /// Queue a show-level metadata file in each base folder
    pub show_metadata: bool,
    /// Queue one metadata file per season folder
    pub season_metadata: bool,
    /// Queue a metadata file next to each matched movie
    pub movie_metadata: bool,
    /// Report movie folders holding more than one video file
    pub duplicate_movie_check: bool,
    /// Rewrite metadata files even when they look current
    pub force_refresh_metadata: bool,
    /// Treat episodes without an air date, or airing later, as expected
    pub include_unaired: bool,
    /// Lowercase extensions, without the dot, counted as video files
    pub video_extensions: Vec<String>,
    pub metadata_extension: String,
    pub show_metadata_file: String,
    /// File name of the season-level metadata file; may equal
    /// `show_metadata_file` for writers that use one name at both levels
    pub season_metadata_file: String,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            folder_check: true,
            library_merge: true,
            rename_check: true,
            missing_check: true,
            episode_metadata: true,
            show_metadata: true,
            season_metadata: false,
            movie_metadata: true,
            duplicate_movie_check: true,
            force_refresh_metadata: false,
            include_unaired: false,
            video_extensions: ["mkv", "mp4", "avi", "m4v", "mov", "wmv", "ts"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            metadata_extension: "nfo".to_string(),
            show_metadata_file: "tvshow.nfo".to_string(),
            season_metadata_file: "season.nfo".to_string(),
        }
    }
}

impl ScanSettings {
    pub fn with_folder_check(mut self, enabled: bool) -> Self {
        self.folder_check = enabled;
        self
    }

    pub fn with_library_merge(mut self, enabled: bool) -> Self {
        self.library_merge = enabled;
        self
    }

    pub fn with_rename_check(mut self, enabled: bool) -> Self {
        self.rename_check = enabled;
        self
    }

    pub fn with_missing_check(mut self, enabled: bool) -> Self {
        self.missing_check = enabled;
        self
    }

    pub fn with_episode_metadata(mut self, enabled: bool) -> Self {
        self.episode_metadata = enabled;
        self
    }

    pub fn with_show_metadata(mut self, enabled: bool) -> Self {
        self.show_metadata = enabled;
        self
    }

    pub fn with_season_metadata(mut self, enabled: bool) -> Self {
        self.season_metadata = enabled;
        self
    }

    pub fn with_movie_metadata(mut self, enabled: bool) -> Self {
        self.movie_metadata = enabled;
        self
    }

    pub fn with_duplicate_movie_check(mut self, enabled: bool) -> Self {
        self.duplicate_movie_check = enabled;
        self
    }

    /// Set the show-level and season-level metadata file names.
    pub fn with_metadata_files(
        mut self,
        show_file: impl Into<String>,
        season_file: impl Into<String>,
    ) -> Self {
        self.show_metadata_file = show_file.into();
        self.season_metadata_file = season_file.into();
        self
    }

    pub fn with_force_refresh_metadata(mut self, enabled: bool) -> Self {
        self.force_refresh_metadata = enabled;
        self
    }

    pub fn with_include_unaired(mut self, enabled: bool) -> Self {
        self.include_unaired = enabled;
        self
    }

    pub fn with_video_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.video_extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// The rename/missing stage runs when either half is enabled.
    pub fn rename_or_missing_enabled(&self) -> bool {
        self.rename_check || self.missing_check
    }

    pub fn metadata_enabled(&self) -> bool {
        self.episode_metadata || self.show_metadata || self.season_metadata || self.movie_metadata
    }

    pub fn is_video_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.video_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    pub fn validate(&self) -> Result<()> {
        if self.video_extensions.is_empty() {
            return Err(Error::Config(
                "At least one video extension is required. Use .with_video_extensions() to set them."
                    .to_string(),
            ));
        }
        if self.video_extensions.iter().any(|ext| ext.is_empty()) {
            return Err(Error::Config(
                "Video extensions cannot be empty strings".to_string(),
            ));
        }
        if self.metadata_extension.trim_start_matches('.').is_empty() {
            return Err(Error::Config(
                "Metadata extension cannot be empty".to_string(),
            ));
        }
        if self.show_metadata_file.is_empty() {
            return Err(Error::Config(
                "Show metadata file name cannot be empty".to_string(),
            ));
        }
        if self.season_metadata && self.season_metadata_file.is_empty() {
            return Err(Error::Config(
                "Season metadata file name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// File and folder naming settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingSettings {
    pub episode_style: String,
    pub season_folder_style: String,
    pub max_path_length: usize,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            episode_style: DEFAULT_EPISODE_STYLE.to_string(),
            season_folder_style: DEFAULT_SEASON_FOLDER_STYLE.to_string(),
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl NamingSettings {
    pub fn with_episode_style(mut self, style: impl Into<String>) -> Self {
        self.episode_style = style.into();
        self
    }

    pub fn with_season_folder_style(mut self, style: impl Into<String>) -> Self {
        self.season_folder_style = style.into();
        self
    }

    pub fn with_max_path_length(mut self, length: usize) -> Self {
        self.max_path_length = length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.episode_style.trim().is_empty() {
            return Err(Error::Config(
                "Episode naming style cannot be empty".to_string(),
            ));
        }
        if self.max_path_length == 0 {
            return Err(Error::Config(
                "Maximum path length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_index() -> Result<Arc<dyn FileIndex>> {
    let index: Arc<dyn FileIndex> = Arc::new(bridge_desktop::TokioFileIndex::new());
    Ok(index)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_index() -> Result<Arc<dyn FileIndex>> {
    Err(Error::CapabilityMissing {
        capability: "FileIndex".to_string(),
        message: "FileIndex implementation is required for library scans. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileIndex. \
                 Other hosts: inject an adapter with .file_index()."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_data_dir() -> Result<PathBuf> {
    Ok(bridge_desktop::default_data_dir())
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_data_dir() -> Result<PathBuf> {
    Err(Error::Config(
        "Data directory is required. Use .data_dir() to set it.".to_string(),
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    data_dir: Option<PathBuf>,
    file_index: Option<Arc<dyn FileIndex>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    sync: Option<SyncSettings>,
    scan: Option<ScanSettings>,
    naming: Option<NamingSettings>,
    event_capacity: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn file_index(mut self, index: Arc<dyn FileIndex>) -> Self {
        self.file_index = Some(index);
        self
    }

    /// Sets the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn sync(mut self, settings: SyncSettings) -> Self {
        self.sync = Some(settings);
        self
    }

    pub fn scan(mut self, settings: ScanSettings) -> Self {
        self.scan = Some(settings);
        self
    }

    pub fn naming(mut self, settings: NamingSettings) -> Self {
        self.naming = Some(settings);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if a required collaborator is missing and no desktop
    /// default is available, or if any setting fails validation.
    pub fn build(self) -> Result<CoreConfig> {
        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => provide_default_data_dir()?,
        };

        let file_index = match self.file_index {
            Some(index) => index,
            None => provide_default_file_index()?,
        };

        let config = CoreConfig {
            data_dir,
            file_index,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            sync: self.sync.unwrap_or_default(),
            scan: self.scan.unwrap_or_default(),
            naming: self.naming.unwrap_or_default(),
            event_capacity: self.event_capacity.unwrap_or(256),
        };

        config.validate()?;

        Ok(config)
    }
}
