//! Values a template is rendered against.

use chrono::NaiveDate;
use core_library::CachedEpisode;

/// Everything a [`NameTemplate`](crate::NameTemplate) can substitute.
///
/// `episode2` equals `episode` for a single episode and is the last episode
/// of the span otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeContext {
    pub show_name: String,
    pub season: u32,
    pub episode: u32,
    pub episode2: u32,
    pub episode_name: String,
    /// Position across the whole series
    pub overall_number: Option<u32>,
    pub air_date: Option<NaiveDate>,
}

impl EpisodeContext {
    pub fn single(
        show_name: impl Into<String>,
        season: u32,
        episode: u32,
        episode_name: impl Into<String>,
    ) -> Self {
        Self {
            show_name: show_name.into(),
            season,
            episode,
            episode2: episode,
            episode_name: episode_name.into(),
            overall_number: None,
            air_date: None,
        }
    }

    /// Context for naming a season folder; episode fields are zero.
    pub fn season_folder(show_name: impl Into<String>, season: u32) -> Self {
        Self::single(show_name, season, 0, "")
    }

    /// Build the context for one or more consecutive episodes of a show.
    ///
    /// Numbering follows DVD order when `dvd_order` is set. Names of a span
    /// are joined with ` + `, dropping repeats. Returns `None` for an empty
    /// slice.
    pub fn from_episodes(
        show_name: impl Into<String>,
        episodes: &[CachedEpisode],
        dvd_order: bool,
    ) -> Option<Self> {
        let first = episodes.first()?;
        let last = episodes.last()?;

        let mut names: Vec<&str> = Vec::with_capacity(episodes.len());
        for episode in episodes {
            let name = episode.name.trim();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }

        Some(Self {
            show_name: show_name.into(),
            season: first.season(dvd_order),
            episode: first.number(dvd_order),
            episode2: last.number(dvd_order).max(first.number(dvd_order)),
            episode_name: names.join(" + "),
            overall_number: first.overall_number,
            air_date: first.first_aired,
        })
    }

    pub fn with_episode2(mut self, episode2: u32) -> Self {
        self.episode2 = episode2;
        self
    }

    pub fn with_overall_number(mut self, number: u32) -> Self {
        self.overall_number = Some(number);
        self
    }

    pub fn with_air_date(mut self, date: NaiveDate) -> Self {
        self.air_date = Some(date);
        self
    }

    pub fn is_multi_episode(&self) -> bool {
        self.episode2 != self.episode
    }
}
