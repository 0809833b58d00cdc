//! # Reconciler
//!
//! Compares expected library state with the files on disk.
//!
//! ## Overview
//!
//! Each tracked show runs through three stages, any of which can be switched
//! off in [`ScanSettings`]:
//!
//! 1. **FolderCheck** - the base folder exists
//! 2. **LibraryMerge** - one canonical episode list from the primary record,
//!    its alternates and the show's merge rules
//! 3. **RenameAndMissingCheck** - every expected episode is matched against
//!    the folder listing
//!
//! Tracked movies get the folder check and a single-file check (see
//! [`movie_check`](crate::movie_check)).
//!
//! Findings from all entries land in one [`ActionList`], unique by target
//! path. Cancellation is checked before each entry; a cancelled pass keeps
//! what it found so far.

use bridge_traits::{Clock, FileIndex};
use core_library::{CachedMediaRecord, MediaCache, MediaKind, RecordTrust};
use core_runtime::config::{NamingSettings, ScanSettings};
use core_runtime::events::{CoreEvent, EventBus, ScanEvent};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::actions::{ActionList, FileIssue};
use crate::dir_cache::DirCache;
use crate::error::Result;
use crate::folder_check::check_folder;
use crate::ignore::IgnoreRegistry;
use crate::library_merge::expected_episodes;
use crate::movie_check::{MovieContext, MoviePatterns};
use crate::namer::Namer;
use crate::patterns::EpisodePatterns;
use crate::rename_missing::ShowContext;
use crate::show::{Library, ScanSelection, TrackedMovie, TrackedShow};

/// Ignore registry shared between the reconciler and its owner
pub type SharedIgnoreRegistry = Arc<RwLock<IgnoreRegistry>>;

/// Counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub shows_scanned: usize,
    pub movies_scanned: usize,
    /// Expected episodes across the library; only computed by full passes
    pub total_episodes: Option<usize>,
    pub full_scan: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub pass_id: String,
    pub actions: ActionList,
    pub issues: Vec<FileIssue>,
    pub stats: ScanStats,
    pub cancelled: bool,
}

pub struct Reconciler {
    cache: Arc<MediaCache>,
    movies: Arc<MediaCache>,
    file_index: Arc<dyn FileIndex>,
    ignore: SharedIgnoreRegistry,
    settings: ScanSettings,
    namer: Namer,
    patterns: EpisodePatterns,
    movie_patterns: MoviePatterns,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
}

enum Entry<'a> {
    Show(&'a TrackedShow),
    Movie(&'a TrackedMovie),
}

impl Reconciler {
    /// Create a reconciler over the series cache. Movies are looked up in an
    /// empty cache until [`with_movie_cache`](Self::with_movie_cache) is used.
    ///
    /// # Errors
    ///
    /// [`ScanError::Pattern`](crate::ScanError::Pattern) if the file name
    /// patterns fail to compile.
    pub fn new(
        series_cache: Arc<MediaCache>,
        file_index: Arc<dyn FileIndex>,
        ignore: SharedIgnoreRegistry,
        settings: ScanSettings,
        naming: &NamingSettings,
        clock: Arc<dyn Clock>,
        events: Option<EventBus>,
    ) -> Result<Self> {
        Ok(Self {
            cache: series_cache,
            movies: Arc::new(MediaCache::new(MediaKind::Movie)),
            file_index,
            ignore,
            settings,
            namer: Namer::new(naming),
            patterns: EpisodePatterns::new()?,
            movie_patterns: MoviePatterns::new()?,
            clock,
            events,
        })
    }

    pub fn with_movie_cache(mut self, movie_cache: Arc<MediaCache>) -> Self {
        self.movies = movie_cache;
        self
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    pub fn ignore(&self) -> &SharedIgnoreRegistry {
        &self.ignore
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Scan(event)).ok();
        }
    }

    /// Run one reconciliation pass.
    ///
    /// # Arguments
    ///
    /// * `library` - Every tracked show and movie
    /// * `selection` - Entries to check in this pass
    /// * `cancel` - Checked before each entry
    ///
    /// Per-entry failures become [`FileIssue`]s; they never discard findings
    /// of other entries.
    #[instrument(skip(self, library, selection, cancel), fields(library = library.len()))]
    pub async fn scan(
        &self,
        library: &Library,
        selection: &ScanSelection,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        let started = Instant::now();
        let pass_id = Uuid::new_v4().to_string();

        let entries: Vec<Entry<'_>> = library
            .shows
            .iter()
            .filter(|show| selection.includes(MediaKind::Series, show.id))
            .map(Entry::Show)
            .chain(
                library
                    .movies
                    .iter()
                    .filter(|movie| selection.includes(MediaKind::Movie, movie.id))
                    .map(Entry::Movie),
            )
            .collect();
        let full_scan = entries.len() == library.len();
        let total = entries.len();

        info!(pass_id = %pass_id, entries = total, full_scan, "Starting scan");
        self.emit(ScanEvent::Started {
            pass_id: pass_id.clone(),
            shows: total as u64,
            full_scan,
        });

        // Pass-wide copy so no lock is held across file index calls
        let ignore = self.ignore.read().clone();
        let today = self.clock.now().date_naive();

        let mut dir_cache = DirCache::new(Arc::clone(&self.file_index));
        let mut actions = ActionList::new();
        let mut issues = Vec::new();
        let mut shows_scanned = 0;
        let mut movies_scanned = 0;
        let mut total_episodes = 0;
        let mut cancelled = false;

        for (index, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(checked = index, total, "Scan cancelled");
                cancelled = true;
                break;
            }

            let (checked, id, folder) = match entry {
                Entry::Show(show) => {
                    shows_scanned += 1;
                    let checked = self
                        .check_show(show, &ignore, today, &mut dir_cache, &mut actions, &mut issues)
                        .await;
                    (checked, show.id, &show.base_folder)
                }
                Entry::Movie(movie) => {
                    movies_scanned += 1;
                    let checked = self
                        .check_movie(movie, &ignore, today, &mut dir_cache, &mut actions, &mut issues)
                        .await
                        .map(|name| (name, 0));
                    (checked, movie.id, &movie.folder)
                }
            };
            let show_name = match checked {
                Ok((name, episodes)) => {
                    total_episodes += episodes;
                    name
                }
                Err(e) => {
                    warn!(entry = %id, error = %e, "Library entry check failed");
                    issues.push(FileIssue::new(id.to_string(), folder, e.to_string()));
                    id.to_string()
                }
            };

            self.emit(ScanEvent::ShowChecked {
                pass_id: pass_id.clone(),
                show_name,
                index: (index + 1) as u64,
                total: total as u64,
            });
        }

        let dropped = actions.remove_ignored(&ignore);
        actions.sort();

        let stats = ScanStats {
            shows_scanned,
            movies_scanned,
            total_episodes: (full_scan && !cancelled).then_some(total_episodes),
            full_scan,
        };

        debug!(
            folders = dir_cache.folders_listed(),
            listing_hits = dir_cache.hits(),
            ignored = dropped,
            "Directory cache usage"
        );

        if cancelled {
            self.emit(ScanEvent::Cancelled {
                pass_id: pass_id.clone(),
                shows_scanned: (shows_scanned + movies_scanned) as u64,
                actions: actions.len() as u64,
            });
        } else {
            info!(
                actions = actions.len(),
                missing = actions.missing().count(),
                issues = issues.len(),
                "Scan completed"
            );
            self.emit(ScanEvent::Completed {
                pass_id: pass_id.clone(),
                actions: actions.len() as u64,
                missing: actions.missing().count() as u64,
                issues: issues.len() as u64,
                duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        ScanOutcome {
            pass_id,
            actions,
            issues,
            stats,
            cancelled,
        }
    }

    /// Check one show; returns its display name and expected episode count.
    async fn check_show(
        &self,
        show: &TrackedShow,
        ignore: &IgnoreRegistry,
        today: chrono::NaiveDate,
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
        issues: &mut Vec<FileIssue>,
    ) -> Result<(String, usize)> {
        let Some(record) = self.cache.get(show.id) else {
            let name = show.custom_name.clone().unwrap_or_else(|| show.id.to_string());
            issues.push(FileIssue::new(
                &name,
                &show.base_folder,
                format!("No metadata cached for {}", show.id),
            ));
            return Ok((name, 0));
        };

        let show_name = show.display_name(&record);

        if record.trust() != RecordTrust::FullFetch {
            issues.push(FileIssue::new(
                &show_name,
                &show.base_folder,
                "Metadata not downloaded yet; run a sync first",
            ));
            return Ok((show_name, 0));
        }

        // Stage 1: FolderCheck
        if self.settings.folder_check {
            if let Some(issue) =
                check_folder(self.file_index.as_ref(), &show_name, &show.base_folder).await?
            {
                issues.push(issue);
            }
        }

        // Stage 2: LibraryMerge
        let alternates: Vec<CachedMediaRecord> = if self.settings.library_merge {
            show.alternate_ids
                .iter()
                .filter_map(|id| self.cache.get(*id))
                .filter(|r| r.trust() == RecordTrust::FullFetch)
                .collect()
        } else {
            Vec::new()
        };
        let expected = expected_episodes(
            &record,
            &alternates,
            show.use_dvd_order,
            &show.merge_rules,
            self.settings.library_merge,
        );

        // Stage 3: RenameAndMissingCheck
        let ctx = ShowContext {
            show,
            record: &record,
            show_name: &show_name,
            settings: &self.settings,
            namer: &self.namer,
            patterns: &self.patterns,
            ignore,
            today,
        };

        if self.settings.show_metadata {
            ctx.check_show_metadata(dir_cache, actions).await?;
        }
        if self.settings.season_metadata {
            ctx.check_season_metadata(&expected, dir_cache, actions).await?;
        }
        if self.settings.rename_or_missing_enabled() || self.settings.episode_metadata {
            ctx.check_episodes(&expected, dir_cache, actions).await?;
        }

        debug!(show = %show_name, expected = expected.len(), "Show checked");
        Ok((show_name, expected.len()))
    }

    /// Check one movie; returns its display name.
    async fn check_movie(
        &self,
        movie: &TrackedMovie,
        ignore: &IgnoreRegistry,
        today: chrono::NaiveDate,
        dir_cache: &mut DirCache,
        actions: &mut ActionList,
        issues: &mut Vec<FileIssue>,
    ) -> Result<String> {
        let Some(record) = self.movies.get(movie.id) else {
            let name = movie.custom_name.clone().unwrap_or_else(|| movie.id.to_string());
            issues.push(FileIssue::new(
                &name,
                &movie.folder,
                format!("No metadata cached for {}", movie.id),
            ));
            return Ok(name);
        };

        let title = movie.display_name(&record);

        if record.trust() != RecordTrust::FullFetch {
            issues.push(FileIssue::new(
                &title,
                &movie.folder,
                "Metadata not downloaded yet; run a sync first",
            ));
            return Ok(title);
        }

        if self.settings.folder_check {
            if let Some(issue) =
                check_folder(self.file_index.as_ref(), &title, &movie.folder).await?
            {
                issues.push(issue);
            }
        }

        let ctx = MovieContext {
            movie,
            record: &record,
            title: &title,
            settings: &self.settings,
            namer: &self.namer,
            patterns: &self.movie_patterns,
            ignore,
            today,
        };
        ctx.check(dir_cache, actions, issues).await?;

        debug!(movie = %title, "Movie checked");
        Ok(title)
    }
}
