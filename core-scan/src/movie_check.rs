//! Movie checks
//!
//! A tracked movie expects one video file named `Title (Year)` in its folder:
//!
//! - a file with exactly that name is a match
//! - any other video file is offered as a rename candidate
//! - no usable file yields a missing item once the movie is released
//!
//! Folders with more than one video file are reported, except for a pair of
//! numbered parts (`CD1`/`CD2`, `Part 1`/`Part 2`) of the same movie.

use bridge_traits::FileEntry;
use chrono::NaiveDate;
use core_library::CachedMediaRecord;
use core_runtime::config::ScanSettings;
use regex::Regex;
use std::path::PathBuf;
use tracing::debug;

use crate::actions::{
    ActionItem, ActionList, FileIssue, MetadataSource, MissingItem, RenameItem, WriteMetadataItem,
};
use crate::dir_cache::DirCache;
use crate::error::Result;
use crate::ignore::IgnoreRegistry;
use crate::namer::Namer;
use crate::rename_missing::metadata_needed;
use crate::show::TrackedMovie;

/// Recognises sample clips and numbered parts in movie file names.
#[derive(Debug, Clone)]
pub struct MoviePatterns {
    part: Regex,
    sample: Regex,
}

impl MoviePatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            part: Regex::new(r"(?i)^(.*?)[\s._-]*(?:cd|part|pt|disc|disk)[\s._-]*(\d{1,2})$")?,
            sample: Regex::new(r"(?i)(?:^|[\s._-])sample(?:$|[\s._-])")?,
        })
    }

    pub fn is_sample(&self, stem: &str) -> bool {
        self.sample.is_match(stem)
    }

    /// Name and number of a numbered part, e.g. `("Heat (1995)", 1)` for
    /// `Heat (1995) CD1`.
    fn split_part<'s>(&self, stem: &'s str) -> Option<(&'s str, u32)> {
        let captures = self.part.captures(stem)?;
        let name = captures.get(1)?.as_str();
        let number = captures.get(2)?.as_str().parse().ok()?;
        Some((name, number))
    }

    /// Two files holding different numbered parts of the same movie.
    pub fn is_double_part(&self, a: &str, b: &str) -> bool {
        match (self.split_part(a), self.split_part(b)) {
            (Some((name_a, part_a)), Some((name_b, part_b))) => {
                name_a.eq_ignore_ascii_case(name_b) && part_a != part_b
            }
            _ => false,
        }
    }
}

/// Everything the check needs about one movie
pub struct MovieContext<'a> {
    pub movie: &'a TrackedMovie,
    pub record: &'a CachedMediaRecord,
    pub title: &'a str,
    pub settings: &'a ScanSettings,
    pub namer: &'a Namer,
    pub patterns: &'a MoviePatterns,
    pub ignore: &'a IgnoreRegistry,
    pub today: NaiveDate,
}

impl MovieContext<'_> {
    pub async fn check(
        &self,
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
        issues: &mut Vec<FileIssue>,
    ) -> Result<()> {
        let settings = self.settings;
        let folder = &self.movie.folder;
        let year = self.record.year();
        let stem = self.namer.movie_file_name(self.title, year, folder, None);

        let listing = dir_cache.list(folder).await?;
        let videos: Vec<&FileEntry> = listing
            .iter()
            .filter(|file| file.path.parent() == Some(folder.as_path()))
            .filter(|file| {
                file.extension()
                    .is_some_and(|ext| settings.is_video_extension(&ext))
            })
            .collect();

        let double_part = match videos.as_slice() {
            [a, b] => match (a.stem(), b.stem()) {
                (Some(a), Some(b)) => self.patterns.is_double_part(a, b),
                _ => false,
            },
            _ => false,
        };

        if settings.duplicate_movie_check && videos.len() > 1 && !double_part {
            issues.push(self.duplicate_issue(&videos));
        }

        let metadata_extension = settings.metadata_extension.trim_start_matches('.');
        let exact = videos
            .iter()
            .find(|file| file.stem().is_some_and(|s| s.eq_ignore_ascii_case(&stem)));

        let metadata_target = if let Some(file) = exact {
            Some(file.path.with_extension(metadata_extension))
        } else if double_part {
            Some(folder.join(format!("{}.{}", stem, metadata_extension)))
        } else if let Some(file) = self.main_file(&videos) {
            let media_path = if settings.rename_check {
                let name = self.namer.movie_file_name(
                    self.title,
                    year,
                    folder,
                    file.extension().as_deref(),
                );
                let target = folder.join(name);
                actions.push(ActionItem::RenameCandidate(RenameItem {
                    show_id: self.movie.id,
                    show_name: self.title.to_string(),
                    season: 0,
                    episode: 0,
                    from: file.path.clone(),
                    to: target.clone(),
                }));
                target
            } else {
                file.path.clone()
            };
            Some(media_path.with_extension(metadata_extension))
        } else {
            self.missing(folder.join(&stem), actions);
            None
        };

        if let Some(target) = metadata_target.filter(|_| settings.movie_metadata) {
            if !actions.is_queued(&target)
                && metadata_needed(settings, dir_cache, &target, self.record.server_last_updated)
                    .await?
            {
                actions.push(ActionItem::WriteMetadata(WriteMetadataItem {
                    target_file: target,
                    source: MetadataSource::Movie(Box::new(self.record.clone())),
                    is_multi_part: double_part,
                }));
            }
        }
        Ok(())
    }

    /// Largest video that is neither a sample nor an empty stub.
    fn main_file<'f>(&self, videos: &[&'f FileEntry]) -> Option<&'f FileEntry> {
        videos
            .iter()
            .copied()
            .filter(|file| file.size > 0)
            .filter(|file| !file.stem().is_some_and(|s| self.patterns.is_sample(s)))
            .max_by_key(|file| file.size)
    }

    fn duplicate_issue(&self, videos: &[&FileEntry]) -> FileIssue {
        let mut notes = Vec::new();
        if videos
            .iter()
            .any(|file| file.stem().is_some_and(|s| self.patterns.is_sample(s)))
        {
            notes.push("includes a sample");
        }
        if videos.iter().any(|file| file.size == 0) {
            notes.push("includes a deleted stub");
        }

        let mut message = format!("{} video files in movie folder", videos.len());
        if !notes.is_empty() {
            message.push_str(&format!(" ({})", notes.join(", ")));
        }
        debug!(movie = self.title, files = videos.len(), "Duplicate movie files");
        FileIssue::new(self.title, &self.movie.folder, message)
    }

    fn missing(&self, expected_path: PathBuf, actions: &mut ActionList) {
        if !self.settings.missing_check {
            return;
        }
        let released = self
            .record
            .first_aired
            .is_some_and(|date| date <= self.today);
        if !self.settings.include_unaired && !released {
            return;
        }
        if self.ignore.contains_path(&expected_path) {
            debug!(movie = self.title, "Missing movie is ignored");
            return;
        }

        actions.push(ActionItem::Missing(MissingItem {
            show_id: self.movie.id,
            show_name: self.title.to_string(),
            season: 0,
            episode: 0,
            episode2: 0,
            episode_name: String::new(),
            overview: self.record.overview.clone(),
            air_date: self.record.first_aired,
            expected_path,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_part_pairs() {
        let patterns = MoviePatterns::new().unwrap();
        assert!(patterns.is_double_part("Heat (1995) CD1", "Heat (1995) CD2"));
        assert!(patterns.is_double_part("heat.part1", "Heat - Part 2"));
        assert!(!patterns.is_double_part("Heat (1995) CD1", "Heat (1995) CD1"));
        assert!(!patterns.is_double_part("Heat CD1", "Ronin CD2"));
        assert!(!patterns.is_double_part("Heat (1995)", "Heat (1995) CD2"));
    }

    #[test]
    fn test_sample_names() {
        let patterns = MoviePatterns::new().unwrap();
        assert!(patterns.is_sample("heat.1995.sample"));
        assert!(patterns.is_sample("Sample"));
        assert!(!patterns.is_sample("Samples of Life"));
    }
}
