//! # Library Reconciliation
//!
//! Compares what the metadata cache says a show should contain with the
//! files a [`FileIndex`](bridge_traits::FileIndex) reports, and produces a
//! typed list of actions for the user to review.
//!
//! ## Overview
//!
//! A pass runs every selected [`TrackedShow`] through three stages:
//!
//! - **FolderCheck** - the show's base folder exists
//! - **LibraryMerge** - alternates and merge rules fold into one episode list
//! - **RenameAndMissingCheck** - files are matched to expected episodes
//!
//! Each selected [`TrackedMovie`] gets the folder check and a single-file
//! check that also flags duplicate video files.
//!
//! The result is an [`ActionList`] of [`ActionItem`]s (missing episodes,
//! metadata files to write, rename candidates) plus per-show
//! [`FileIssue`]s. Paths in the [`IgnoreRegistry`] never reach the list.
//!
//! ## Usage
//!
//! ```ignore
//! let library = Library::new()
//!     .with_show(TrackedShow::new(lost_id, "/tv/Lost"))
//!     .with_movie(TrackedMovie::new(heat_id, "/movies/Heat"));
//!
//! let reconciler = Reconciler::new(
//!     series_cache,
//!     file_index,
//!     Arc::new(RwLock::new(IgnoreRegistry::new())),
//!     ScanSettings::default(),
//!     &NamingSettings::default(),
//!     clock,
//!     Some(events),
//! )?
//! .with_movie_cache(movie_cache);
//!
//! let outcome = reconciler.scan(&library, &ScanSelection::All, &cancel).await;
//! for item in outcome.actions.missing() {
//!     println!("{} S{:02}E{:02}", item.show_name, item.season, item.episode);
//! }
//! ```

pub mod actions;
pub mod dir_cache;
pub mod error;
pub mod export;
pub mod folder_check;
pub mod ignore;
pub mod library_merge;
pub mod movie_check;
pub mod namer;
pub mod patterns;
pub mod reconciler;
pub mod rename_missing;
pub mod show;

pub use actions::{
    ActionItem, ActionList, FileIssue, MetadataSource, MissingItem, RenameItem,
    WriteMetadataItem,
};
pub use error::{Result, ScanError};
pub use export::{export_missing, MissingReport, MissingReportItem};
pub use ignore::IgnoreRegistry;
pub use library_merge::{expected_episodes, ExpectedEpisode};
pub use movie_check::MoviePatterns;
pub use namer::Namer;
pub use patterns::EpisodePatterns;
pub use reconciler::{Reconciler, ScanOutcome, ScanStats, SharedIgnoreRegistry};
pub use show::{EpisodeMergeRule, Library, ScanSelection, TrackedMovie, TrackedShow};
