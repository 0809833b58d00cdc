//! Library entries the reconciler walks

use core_library::{CachedMediaRecord, MediaId, MediaKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fold episodes `first..=last` of `season` into one multi-episode file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMergeRule {
    pub season: u32,
    pub first: u32,
    pub last: u32,
    /// Name for the combined episode; the joined episode names when `None`
    pub name: Option<String>,
}

impl EpisodeMergeRule {
    pub fn new(season: u32, first: u32, last: u32) -> Self {
        Self {
            season,
            first: first.min(last),
            last: first.max(last),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn covers(&self, season: u32, number: u32) -> bool {
        let (lo, hi) = (self.first.min(self.last), self.first.max(self.last));
        self.season == season && (lo..=hi).contains(&number)
    }
}

/// A show the user keeps in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedShow {
    pub id: MediaId,
    /// Overrides the provider's name in rendered file names
    pub custom_name: Option<String>,
    pub base_folder: PathBuf,
    pub use_dvd_order: bool,
    /// Episodes live in per-season subfolders of `base_folder`
    pub season_folders: bool,
    /// Records for the same show from other providers or orders
    pub alternate_ids: Vec<MediaId>,
    pub merge_rules: Vec<EpisodeMergeRule>,
}

impl TrackedShow {
    pub fn new(id: MediaId, base_folder: impl Into<PathBuf>) -> Self {
        Self {
            id,
            custom_name: None,
            base_folder: base_folder.into(),
            use_dvd_order: false,
            season_folders: true,
            alternate_ids: Vec::new(),
            merge_rules: Vec::new(),
        }
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn with_dvd_order(mut self, enabled: bool) -> Self {
        self.use_dvd_order = enabled;
        self
    }

    pub fn with_season_folders(mut self, enabled: bool) -> Self {
        self.season_folders = enabled;
        self
    }

    pub fn with_alternate_id(mut self, id: MediaId) -> Self {
        self.alternate_ids.push(id);
        self
    }

    pub fn with_merge_rule(mut self, rule: EpisodeMergeRule) -> Self {
        self.merge_rules.push(rule);
        self
    }

    /// Name used in file names: the custom name, else the provider's.
    pub fn display_name(&self, record: &CachedMediaRecord) -> String {
        match &self.custom_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => record.name.clone(),
        }
    }
}

/// A movie the user keeps in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedMovie {
    pub id: MediaId,
    pub custom_name: Option<String>,
    /// Folder holding the movie file
    pub folder: PathBuf,
}

impl TrackedMovie {
    pub fn new(id: MediaId, folder: impl Into<PathBuf>) -> Self {
        Self {
            id,
            custom_name: None,
            folder: folder.into(),
        }
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    pub fn display_name(&self, record: &CachedMediaRecord) -> String {
        match &self.custom_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => record.name.clone(),
        }
    }
}

/// Everything a pass may reconcile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub shows: Vec<TrackedShow>,
    pub movies: Vec<TrackedMovie>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_show(mut self, show: TrackedShow) -> Self {
        self.shows.push(show);
        self
    }

    pub fn with_movie(mut self, movie: TrackedMovie) -> Self {
        self.movies.push(movie);
        self
    }

    pub fn len(&self) -> usize {
        self.shows.len() + self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty() && self.movies.is_empty()
    }
}

impl From<Vec<TrackedShow>> for Library {
    fn from(shows: Vec<TrackedShow>) -> Self {
        Self {
            shows,
            movies: Vec::new(),
        }
    }
}

/// Which library entries a pass covers
///
/// Ids are provider-scoped, so shows and movies are selected separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanSelection {
    #[default]
    All,
    Shows(Vec<MediaId>),
    Movies(Vec<MediaId>),
}

impl ScanSelection {
    pub fn includes(&self, kind: MediaKind, id: MediaId) -> bool {
        match (self, kind) {
            (ScanSelection::All, _) => true,
            (ScanSelection::Shows(ids), MediaKind::Series) => ids.contains(&id),
            (ScanSelection::Movies(ids), MediaKind::Movie) => ids.contains(&id),
            _ => false,
        }
    }
}
