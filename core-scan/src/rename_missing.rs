//! RenameAndMissingCheck stage
//!
//! For every expected episode the stage looks for a video file in the
//! episode's folder:
//!
//! - a file named exactly as expected is a match
//! - a file whose name carries the same season and episode is a close match
//!   and yields a rename candidate
//! - no file yields a missing item unless the path is ignored
//!
//! Matched files get a metadata file when theirs is missing or stale, and
//! each season folder can get one of its own.

use bridge_traits::FileEntry;
use chrono::NaiveDate;
use core_library::CachedMediaRecord;
use core_runtime::config::ScanSettings;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::actions::{
    ActionItem, ActionList, MetadataSource, MissingItem, RenameItem, WriteMetadataItem,
};
use crate::dir_cache::DirCache;
use crate::error::Result;
use crate::ignore::IgnoreRegistry;
use crate::library_merge::ExpectedEpisode;
use crate::namer::Namer;
use crate::patterns::EpisodePatterns;
use crate::show::TrackedShow;

/// Everything the stage needs about one show
pub struct ShowContext<'a> {
    pub show: &'a TrackedShow,
    pub record: &'a CachedMediaRecord,
    pub show_name: &'a str,
    pub settings: &'a ScanSettings,
    pub namer: &'a Namer,
    pub patterns: &'a EpisodePatterns,
    pub ignore: &'a IgnoreRegistry,
    pub today: NaiveDate,
}

enum Found<'f> {
    Exact(&'f FileEntry),
    Close(&'f FileEntry),
}

impl ShowContext<'_> {
    /// Queue the show-level metadata file when it is missing or stale.
    pub async fn check_show_metadata(
        &self,
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
    ) -> Result<()> {
        let target = self
            .show
            .base_folder
            .join(&self.settings.show_metadata_file);

        if metadata_needed(self.settings, dir_cache, &target, self.record.server_last_updated).await? {
            actions.push(ActionItem::WriteMetadata(WriteMetadataItem {
                target_file: target,
                source: MetadataSource::Show(Box::new(self.record.clone())),
                is_multi_part: false,
            }));
        }
        Ok(())
    }

    /// Queue one metadata file per season folder.
    ///
    /// Without per-season folders every season maps to the base folder, so
    /// the target may coincide with another season's or the show-level file;
    /// the action list keeps the first.
    pub async fn check_season_metadata(
        &self,
        expected: &[ExpectedEpisode],
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
    ) -> Result<()> {
        let mut seasons: BTreeMap<u32, i64> = BTreeMap::new();
        for item in expected {
            let updated = seasons.entry(item.season).or_default();
            *updated = (*updated).max(item.server_last_updated());
        }

        for (season, updated) in seasons {
            let folder = self.namer.season_folder(
                &self.show.base_folder,
                self.show_name,
                season,
                self.show.season_folders,
            );
            let target = folder.join(&self.settings.season_metadata_file);
            if actions.is_queued(&target) {
                continue;
            }

            if metadata_needed(self.settings, dir_cache, &target, updated).await? {
                actions.push(ActionItem::WriteMetadata(WriteMetadataItem {
                    target_file: target,
                    source: MetadataSource::Season {
                        show_id: self.show.id,
                        show_name: self.show_name.to_string(),
                        season,
                    },
                    is_multi_part: false,
                }));
            }
        }
        Ok(())
    }

    pub async fn check_episodes(
        &self,
        expected: &[ExpectedEpisode],
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
    ) -> Result<()> {
        let settings = self.settings;
        let base = &self.show.base_folder;

        for item in expected {
            let folder =
                self.namer
                    .season_folder(base, self.show_name, item.season, self.show.season_folders);
            let ctx = item.context(self.show_name, self.show.use_dvd_order);
            let stem = self.namer.episode_stem(&ctx, &folder);

            let mut listing = dir_cache.list(&folder).await?.to_vec();
            if folder != *base {
                listing.extend(dir_cache.list(base).await?.iter().cloned());
            }

            match self.find_file(&listing, &folder, &stem, item) {
                None => self.missing(item, &folder, &stem, actions),
                Some(found) => {
                    let media_path = match found {
                        Found::Exact(file) => file.path.clone(),
                        Found::Close(file) => {
                            let name = self.namer.episode_file_name(
                                &ctx,
                                &folder,
                                file.extension().as_deref(),
                            );
                            let target = folder.join(name);
                            if settings.rename_check {
                                actions.push(ActionItem::RenameCandidate(RenameItem {
                                    show_id: self.show.id,
                                    show_name: self.show_name.to_string(),
                                    season: item.season,
                                    episode: item.first,
                                    from: file.path.clone(),
                                    to: target.clone(),
                                }));
                                target
                            } else {
                                file.path.clone()
                            }
                        }
                    };

                    if settings.episode_metadata {
                        self.episode_metadata(item, &media_path, dir_cache, actions)
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }

    fn find_file<'f>(
        &self,
        listing: &'f [FileEntry],
        folder: &Path,
        stem: &str,
        item: &ExpectedEpisode,
    ) -> Option<Found<'f>> {
        let is_video = |file: &&FileEntry| {
            file.extension()
                .is_some_and(|ext| self.settings.is_video_extension(&ext))
        };

        let exact = listing.iter().filter(is_video).find(|file| {
            file.path.parent() == Some(folder)
                && file.stem().is_some_and(|s| s.eq_ignore_ascii_case(stem))
        });
        if let Some(file) = exact {
            return Some(Found::Exact(file));
        }

        listing
            .iter()
            .filter(is_video)
            .find(|file| {
                file.stem().and_then(|s| self.patterns.season_episode(s))
                    == Some((item.season, item.first))
            })
            .map(Found::Close)
    }

    fn missing(&self, item: &ExpectedEpisode, folder: &Path, stem: &str, actions: &mut ActionList) {
        if !self.settings.missing_check {
            return;
        }
        if !self.settings.include_unaired && !item.has_aired(self.today) {
            return;
        }

        let expected_path = folder.join(stem);
        if self.ignore.contains_path(&expected_path) {
            debug!(show = self.show_name, season = item.season, episode = item.first, "Missing episode is ignored");
            return;
        }

        let ctx = item.context(self.show_name, self.show.use_dvd_order);
        actions.push(ActionItem::Missing(MissingItem {
            show_id: self.show.id,
            show_name: self.show_name.to_string(),
            season: item.season,
            episode: item.first,
            episode2: item.last,
            episode_name: ctx.episode_name,
            overview: item.overview(),
            air_date: item.air_date(),
            expected_path,
        }));
    }

    async fn episode_metadata(
        &self,
        item: &ExpectedEpisode,
        media_path: &Path,
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
    ) -> Result<()> {
        let target = media_path.with_extension(self.settings.metadata_extension.trim_start_matches('.'));
        if actions.is_queued(&target) {
            return Ok(());
        }

        if metadata_needed(self.settings, dir_cache, &target, item.server_last_updated()).await? {
            actions.push(ActionItem::WriteMetadata(WriteMetadataItem {
                target_file: target,
                source: MetadataSource::Episodes {
                    show_id: self.show.id,
                    show_name: self.show_name.to_string(),
                    season: item.season,
                    episode: item.first,
                    episodes: item.episodes.clone(),
                },
                is_multi_part: item.is_multi_part(),
            }));
        }
        Ok(())
    }
}

/// Missing, older than `updated`, or forced.
pub(crate) async fn metadata_needed(
    settings: &ScanSettings,
    dir_cache: &mut DirCache,
    target: &Path,
    updated: i64,
) -> Result<bool> {
    if settings.force_refresh_metadata {
        return Ok(true);
    }
    Ok(match dir_cache.modified_at(target).await? {
        None => true,
        Some(modified) => modified < updated,
    })
}
