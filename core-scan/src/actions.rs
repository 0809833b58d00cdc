//! Typed findings of a reconciliation pass

use chrono::NaiveDate;
use core_library::{CachedEpisode, CachedMediaRecord, MediaId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::ignore::IgnoreRegistry;

/// An episode with no file on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingItem {
    pub show_id: MediaId,
    pub show_name: String,
    pub season: u32,
    pub episode: u32,
    pub episode2: u32,
    pub episode_name: String,
    pub overview: String,
    pub air_date: Option<NaiveDate>,
    /// Where the file is expected, without extension
    pub expected_path: PathBuf,
}

/// Data the metadata writer serialises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataSource {
    Show(Box<CachedMediaRecord>),
    /// One season folder of a show
    Season {
        show_id: MediaId,
        show_name: String,
        season: u32,
    },
    /// One expected file; `season` and `episode` use the show's numbering order
    Episodes {
        show_id: MediaId,
        show_name: String,
        season: u32,
        episode: u32,
        episodes: Vec<CachedEpisode>,
    },
    Movie(Box<CachedMediaRecord>),
}

/// A metadata file that is missing, stale or forced to refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteMetadataItem {
    pub target_file: PathBuf,
    pub source: MetadataSource,
    /// The file covers several episodes
    pub is_multi_part: bool,
}

impl WriteMetadataItem {
    fn sort_position(&self) -> (String, u32, u32) {
        match &self.source {
            MetadataSource::Show(record) | MetadataSource::Movie(record) => {
                (record.name.clone(), 0, 0)
            }
            MetadataSource::Season {
                show_name, season, ..
            } => (show_name.clone(), *season, 0),
            MetadataSource::Episodes {
                show_name,
                season,
                episode,
                ..
            } => (show_name.clone(), *season, *episode),
        }
    }
}

/// A file that holds the right episode under the wrong name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameItem {
    pub show_id: MediaId,
    pub show_name: String,
    pub season: u32,
    pub episode: u32,
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "item")]
pub enum ActionItem {
    Missing(MissingItem),
    WriteMetadata(WriteMetadataItem),
    RenameCandidate(RenameItem),
}

impl ActionItem {
    /// Path identifying the action for de-duplication and ignoring.
    pub fn target_path(&self) -> &Path {
        match self {
            ActionItem::Missing(item) => &item.expected_path,
            ActionItem::WriteMetadata(item) => &item.target_file,
            ActionItem::RenameCandidate(item) => &item.to,
        }
    }

    /// Presentation order: show name, then season, then episode number.
    pub fn sort_key(&self) -> (String, u32, u32) {
        match self {
            ActionItem::Missing(item) => (item.show_name.to_lowercase(), item.season, item.episode),
            ActionItem::WriteMetadata(item) => {
                let (name, season, episode) = item.sort_position();
                (name.to_lowercase(), season, episode)
            }
            ActionItem::RenameCandidate(item) => {
                (item.show_name.to_lowercase(), item.season, item.episode)
            }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ActionItem::Missing(_))
    }
}

/// A problem found while scanning one show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIssue {
    pub show: String,
    pub file: PathBuf,
    pub message: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl FileIssue {
    pub fn new(show: impl Into<String>, file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            show: show.into(),
            file: file.into(),
            message: message.into(),
            season: None,
            episode: None,
        }
    }

    pub fn for_episode(mut self, season: u32, episode: u32) -> Self {
        self.season = Some(season);
        self.episode = Some(episode);
        self
    }
}

/// Actions of one pass, unique by target path
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    items: Vec<ActionItem>,
    queued: HashSet<PathBuf>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `item` unless an action for the same target path is already queued.
    pub fn push(&mut self, item: ActionItem) -> bool {
        if !self.queued.insert(item.target_path().to_path_buf()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn is_queued(&self, path: &Path) -> bool {
        self.queued.contains(path)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionItem> {
        self.items.iter()
    }

    pub fn missing(&self) -> impl Iterator<Item = &MissingItem> {
        self.items.iter().filter_map(|item| match item {
            ActionItem::Missing(missing) => Some(missing),
            _ => None,
        })
    }

    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| {
            a.sort_key()
                .cmp(&b.sort_key())
                .then_with(|| order_kind(a).cmp(&order_kind(b)))
        });
    }

    /// Drop actions whose target path is ignored. Returns how many were dropped.
    pub fn remove_ignored(&mut self, ignore: &IgnoreRegistry) -> usize {
        let before = self.items.len();
        let queued = &mut self.queued;
        self.items.retain(|item| {
            let keep = !ignore.contains_path(item.target_path());
            if !keep {
                queued.remove(item.target_path());
            }
            keep
        });
        before - self.items.len()
    }

    pub fn into_vec(self) -> Vec<ActionItem> {
        self.items
    }
}

impl IntoIterator for ActionList {
    type Item = ActionItem;
    type IntoIter = std::vec::IntoIter<ActionItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

fn order_kind(item: &ActionItem) -> Ordering {
    match item {
        ActionItem::RenameCandidate(_) => Ordering::Less,
        ActionItem::Missing(_) => Ordering::Equal,
        ActionItem::WriteMetadata(_) => Ordering::Greater,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(show: &str, season: u32, episode: u32) -> ActionItem {
        ActionItem::Missing(MissingItem {
            show_id: MediaId(1),
            show_name: show.to_string(),
            season,
            episode,
            episode2: episode,
            episode_name: String::new(),
            overview: String::new(),
            air_date: None,
            expected_path: PathBuf::from(format!("/tv/{}/S{:02}E{:02}", show, season, episode)),
        })
    }

    #[test]
    fn test_push_dedups_by_target_path() {
        let mut list = ActionList::new();
        assert!(list.push(missing("Lost", 1, 1)));
        assert!(!list.push(missing("Lost", 1, 1)));
        assert_eq!(list.len(), 1);
        assert!(list.is_queued(Path::new("/tv/Lost/S01E01")));
    }

    #[test]
    fn test_sort_is_numeric_within_show() {
        let mut list = ActionList::new();
        list.push(missing("Lost", 1, 10));
        list.push(missing("Lost", 1, 2));
        list.push(missing("Fringe", 2, 1));
        list.push(missing("Lost", 0, 5));
        list.sort();

        let order: Vec<(u32, u32)> = list.missing().map(|m| (m.season, m.episode)).collect();
        assert_eq!(order, vec![(2, 1), (0, 5), (1, 2), (1, 10)]);
    }

    #[test]
    fn test_episode_metadata_sorts_by_chosen_numbering() {
        // Aired as S01E05, shipped on DVD as S01E01
        let episode = CachedEpisode::new(5, 1, 5, "Swapped").with_dvd_order(1, 1);
        let metadata = ActionItem::WriteMetadata(WriteMetadataItem {
            target_file: PathBuf::from("/tv/Lost/S01E01.nfo"),
            source: MetadataSource::Episodes {
                show_id: MediaId(1),
                show_name: "Lost".to_string(),
                season: 1,
                episode: 1,
                episodes: vec![episode],
            },
            is_multi_part: false,
        });

        let mut list = ActionList::new();
        list.push(missing("Lost", 1, 3));
        list.push(metadata);
        list.sort();

        let keys: Vec<_> = list.iter().map(ActionItem::sort_key).collect();
        assert_eq!(keys[0], ("lost".to_string(), 1, 1));
        assert_eq!(keys[1], ("lost".to_string(), 1, 3));
    }

    #[test]
    fn test_remove_ignored() {
        let mut list = ActionList::new();
        list.push(missing("Lost", 1, 1));
        list.push(missing("Lost", 1, 2));

        let mut ignore = IgnoreRegistry::new();
        ignore.add("/tv/Lost/S01E02");

        assert_eq!(list.remove_ignored(&ignore), 1);
        assert_eq!(list.len(), 1);
        assert!(list.push(missing("Lost", 1, 2)));
    }

    #[test]
    fn test_action_item_serializes_tagged() {
        let json = serde_json::to_value(missing("Lost", 1, 1)).unwrap();
        assert_eq!(json["action"], "Missing");
        assert_eq!(json["item"]["season"], 1);
    }
}
