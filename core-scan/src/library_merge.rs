//! LibraryMerge stage
//!
//! Builds the canonical episode list of a show. Episodes from the primary
//! record and its alternates are keyed by `(season, number)` under the show's
//! numbering order, so the same logical episode yields one expected file.
//! Merge rules then fold ranges into multi-episode spans.

use chrono::NaiveDate;
use core_library::{CachedEpisode, CachedMediaRecord};
use core_naming::EpisodeContext;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::show::EpisodeMergeRule;

/// One expected file: a single episode or a merged span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedEpisode {
    pub season: u32,
    pub first: u32,
    pub last: u32,
    pub episodes: Vec<CachedEpisode>,
    pub name_override: Option<String>,
}

impl ExpectedEpisode {
    fn single(season: u32, number: u32, episode: CachedEpisode) -> Self {
        Self {
            season,
            first: number,
            last: number,
            episodes: vec![episode],
            name_override: None,
        }
    }

    pub fn is_multi_part(&self) -> bool {
        self.first != self.last
    }

    /// Newest provider update across the span.
    pub fn server_last_updated(&self) -> i64 {
        self.episodes
            .iter()
            .map(|e| e.server_last_updated)
            .max()
            .unwrap_or_default()
    }

    pub fn air_date(&self) -> Option<NaiveDate> {
        self.episodes.first().and_then(|e| e.first_aired)
    }

    pub fn has_aired(&self, today: NaiveDate) -> bool {
        self.episodes.first().is_some_and(|e| e.has_aired(today))
    }

    pub fn overview(&self) -> String {
        self.episodes
            .iter()
            .map(|e| e.overview.trim())
            .filter(|o| !o.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn context(&self, show_name: &str, dvd_order: bool) -> EpisodeContext {
        let mut ctx = EpisodeContext::from_episodes(show_name, &self.episodes, dvd_order)
            .unwrap_or_else(|| EpisodeContext::single(show_name, self.season, self.first, ""));
        ctx.season = self.season;
        ctx.episode = self.first;
        ctx.episode2 = self.last;
        if let Some(name) = &self.name_override {
            ctx.episode_name = name.clone();
        }
        ctx
    }
}

/// Canonical expected episodes of `primary`, ordered by season then episode.
///
/// With `merge` disabled the alternates and merge rules are ignored.
pub fn expected_episodes(
    primary: &CachedMediaRecord,
    alternates: &[CachedMediaRecord],
    dvd_order: bool,
    rules: &[EpisodeMergeRule],
    merge: bool,
) -> Vec<ExpectedEpisode> {
    let mut chosen: BTreeMap<(u32, u32), (CachedEpisode, bool)> = BTreeMap::new();

    let sources = std::iter::once((primary, true))
        .chain(alternates.iter().filter(|_| merge).map(|record| (record, false)));

    for (record, is_primary) in sources {
        for episode in &record.episodes {
            let key = (episode.season(dvd_order), episode.number(dvd_order));
            match chosen.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert((episode.clone(), is_primary));
                }
                Entry::Occupied(mut slot) => {
                    let (current, current_primary) = slot.get();
                    let replace = if *current_primary != is_primary {
                        is_primary
                    } else {
                        episode.server_last_updated > current.server_last_updated
                    };
                    if replace {
                        slot.insert((episode.clone(), is_primary));
                    }
                }
            }
        }
    }

    let mut expected = Vec::with_capacity(chosen.len());
    let mut consumed: HashSet<(u32, u32)> = HashSet::new();

    if merge {
        for rule in rules {
            // Rules may arrive deserialized with the bounds swapped
            let (lo, hi) = (rule.first.min(rule.last), rule.first.max(rule.last));
            let span: Vec<((u32, u32), CachedEpisode)> = chosen
                .range((rule.season, lo)..=(rule.season, hi))
                .filter(|(key, _)| !consumed.contains(*key))
                .map(|(key, (episode, _))| (*key, episode.clone()))
                .collect();

            let (Some(first), Some(last)) = (span.first(), span.last()) else {
                continue;
            };
            let (first, last) = (first.0 .1, last.0 .1);

            debug!(season = rule.season, first, last, "Applying merge rule");
            consumed.extend(span.iter().map(|(key, _)| *key));
            expected.push(ExpectedEpisode {
                season: rule.season,
                first,
                last,
                episodes: span.into_iter().map(|(_, episode)| episode).collect(),
                name_override: rule.name.clone(),
            });
        }
    }

    expected.extend(
        chosen
            .into_iter()
            .filter(|(key, _)| !consumed.contains(key))
            .map(|((season, number), (episode, _))| ExpectedEpisode::single(season, number, episode)),
    );
    expected.sort_by_key(|e| (e.season, e.first));
    expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::{MediaId, MediaKind};

    fn show(id: i64, episodes: Vec<CachedEpisode>) -> CachedMediaRecord {
        episodes.into_iter().fold(
            CachedMediaRecord::full(MediaId(id), MediaKind::Series, "Show"),
            |record, episode| record.with_episode(episode),
        )
    }

    #[test]
    fn test_primary_wins_over_alternate() {
        let primary = show(1, vec![CachedEpisode::new(1, 1, 1, "Pilot")]);
        let alternate = show(
            2,
            vec![
                CachedEpisode::new(20, 1, 1, "Pilot (alt)").with_server_last_updated(999),
                CachedEpisode::new(21, 1, 2, "Second"),
            ],
        );

        let expected = expected_episodes(&primary, &[alternate], false, &[], true);

        assert_eq!(expected.len(), 2);
        assert_eq!(expected[0].episodes[0].name, "Pilot");
        assert_eq!(expected[1].episodes[0].name, "Second");
    }

    #[test]
    fn test_newest_duplicate_wins_within_source() {
        let primary = show(
            1,
            vec![
                CachedEpisode::new(1, 1, 1, "Old").with_server_last_updated(10),
                CachedEpisode::new(2, 1, 1, "New").with_server_last_updated(20),
            ],
        );
        let expected = expected_episodes(&primary, &[], false, &[], true);
        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].episodes[0].name, "New");
    }

    #[test]
    fn test_merge_disabled_ignores_alternates_and_rules() {
        let primary = show(1, vec![CachedEpisode::new(1, 1, 1, "A"), CachedEpisode::new(2, 1, 2, "B")]);
        let alternate = show(2, vec![CachedEpisode::new(3, 1, 3, "C")]);
        let rules = [EpisodeMergeRule::new(1, 1, 2)];

        let expected = expected_episodes(&primary, &[alternate], false, &rules, false);

        assert_eq!(expected.len(), 2);
        assert!(expected.iter().all(|e| !e.is_multi_part()));
    }

    #[test]
    fn test_merge_rule_builds_span() {
        let primary = show(
            1,
            vec![
                CachedEpisode::new(1, 1, 1, "Pilot (1)").with_server_last_updated(5),
                CachedEpisode::new(2, 1, 2, "Pilot (2)").with_server_last_updated(7),
                CachedEpisode::new(3, 1, 3, "Tabula Rasa"),
            ],
        );
        let rules = [EpisodeMergeRule::new(1, 1, 2).with_name("Pilot")];

        let expected = expected_episodes(&primary, &[], false, &rules, true);

        assert_eq!(expected.len(), 2);
        let span = &expected[0];
        assert!(span.is_multi_part());
        assert_eq!((span.first, span.last), (1, 2));
        assert_eq!(span.server_last_updated(), 7);

        let ctx = span.context("Lost", false);
        assert_eq!((ctx.episode, ctx.episode2), (1, 2));
        assert_eq!(ctx.episode_name, "Pilot");
    }

    #[test]
    fn test_reversed_rule_from_config_is_normalised() {
        let primary = show(
            1,
            vec![
                CachedEpisode::new(1, 1, 1, "Part 1"),
                CachedEpisode::new(2, 1, 2, "Part 2"),
                CachedEpisode::new(3, 1, 3, "Next"),
            ],
        );
        let rule: EpisodeMergeRule =
            serde_json::from_str(r#"{"season":1,"first":2,"last":1,"name":null}"#).unwrap();

        let expected = expected_episodes(&primary, &[], false, &[rule], true);

        assert_eq!(expected.len(), 2);
        assert_eq!((expected[0].first, expected[0].last), (1, 2));
        assert_eq!(expected[0].episodes.len(), 2);
    }

    #[test]
    fn test_dvd_order_keys() {
        let primary = show(
            1,
            vec![
                CachedEpisode::new(1, 1, 1, "Aired first").with_dvd_order(1, 2),
                CachedEpisode::new(2, 1, 2, "Aired second").with_dvd_order(1, 1),
            ],
        );
        let expected = expected_episodes(&primary, &[], true, &[], true);
        assert_eq!(expected[0].episodes[0].name, "Aired second");
    }
}
