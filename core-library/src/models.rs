//! Domain models for the metadata cache
//!
//! A [`CachedMediaRecord`] mirrors one provider item (a movie or a series).
//! Records carry their own trust tier so the cache can decide, field by
//! field, whether newly arrived data may overwrite what it already holds.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Types
// =============================================================================

/// Provider-scoped identifier of a movie or series
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub i64);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MediaId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for MediaId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Kind of media a cache holds; each kind has its own cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a record's contents can be trusted.
///
/// Ordered from weakest to strongest; merges never let a weaker tier
/// overwrite data from a stronger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTrust {
    /// Reserves an id; no metadata yet
    Placeholder,
    /// Populated from a search or listing call
    SearchResult,
    /// Populated from a full detail fetch
    FullFetch,
}

// =============================================================================
// Domain Models
// =============================================================================

/// One episode of a cached series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEpisode {
    /// Provider identifier of the episode
    pub id: i64,
    /// Season in broadcast order
    pub aired_season: u32,
    /// Episode number within the season in broadcast order
    pub aired_number: u32,
    /// Season in DVD order, when the provider has one
    #[serde(default)]
    pub dvd_season: Option<u32>,
    #[serde(default)]
    pub dvd_number: Option<u32>,
    /// Position across the whole series
    #[serde(default)]
    pub overall_number: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub first_aired: Option<NaiveDate>,
    /// Epoch reported by the provider for this episode
    #[serde(default)]
    pub server_last_updated: i64,
}

impl CachedEpisode {
    pub fn new(id: i64, season: u32, number: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            aired_season: season,
            aired_number: number,
            dvd_season: None,
            dvd_number: None,
            overall_number: None,
            name: name.into(),
            overview: String::new(),
            first_aired: None,
            server_last_updated: 0,
        }
    }

    pub fn with_dvd_order(mut self, season: u32, number: u32) -> Self {
        self.dvd_season = Some(season);
        self.dvd_number = Some(number);
        self
    }

    pub fn with_overall_number(mut self, number: u32) -> Self {
        self.overall_number = Some(number);
        self
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    pub fn with_first_aired(mut self, date: NaiveDate) -> Self {
        self.first_aired = Some(date);
        self
    }

    pub fn with_server_last_updated(mut self, epoch: i64) -> Self {
        self.server_last_updated = epoch;
        self
    }

    /// Season under the requested ordering. Falls back to broadcast order
    /// when DVD numbering is absent.
    pub fn season(&self, dvd_order: bool) -> u32 {
        if dvd_order {
            self.dvd_season.unwrap_or(self.aired_season)
        } else {
            self.aired_season
        }
    }

    pub fn number(&self, dvd_order: bool) -> u32 {
        if dvd_order {
            self.dvd_number.unwrap_or(self.aired_number)
        } else {
            self.aired_number
        }
    }

    /// Whether the episode has aired on or before `today`.
    ///
    /// Episodes without an air date are treated as not yet aired.
    pub fn has_aired(&self, today: NaiveDate) -> bool {
        self.first_aired.is_some_and(|date| date <= today)
    }
}

/// Cached metadata for one movie or series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedMediaRecord {
    /// Provider identifier, also the cache key
    pub id: MediaId,
    pub kind: MediaKind,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub first_aired: Option<NaiveDate>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub rating_votes: u32,
    /// Alternate titles; grows on every merge and never shrinks
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Reserves the id until a real fetch arrives
    #[serde(default)]
    pub is_placeholder: bool,
    /// Populated from a search rather than a full fetch
    #[serde(default)]
    pub is_search_result_only: bool,
    /// Must be re-fetched before being trusted for reconciliation
    #[serde(default)]
    pub dirty: bool,
    /// Epoch reported by the provider for this record; 0 when never fetched
    #[serde(default)]
    pub server_last_updated: i64,
    /// Episodes of a series; always empty for movies
    #[serde(default)]
    pub episodes: Vec<CachedEpisode>,
}

impl CachedMediaRecord {
    fn empty(id: MediaId, kind: MediaKind, name: String) -> Self {
        Self {
            id,
            kind,
            name,
            overview: String::new(),
            first_aired: None,
            rating: None,
            rating_votes: 0,
            aliases: BTreeSet::new(),
            is_placeholder: false,
            is_search_result_only: false,
            dirty: false,
            server_last_updated: 0,
            episodes: Vec::new(),
        }
    }

    /// A record reserving `id` until the provider is asked for it.
    pub fn placeholder(id: MediaId, kind: MediaKind) -> Self {
        let mut record = Self::empty(id, kind, String::new());
        record.is_placeholder = true;
        record.dirty = true;
        record
    }

    /// A record built from a search hit.
    pub fn search_result(id: MediaId, kind: MediaKind, name: impl Into<String>) -> Self {
        let mut record = Self::empty(id, kind, name.into());
        record.is_search_result_only = true;
        record
    }

    /// A record built from a full detail fetch.
    pub fn full(id: MediaId, kind: MediaKind, name: impl Into<String>) -> Self {
        Self::empty(id, kind, name.into())
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    pub fn with_first_aired(mut self, date: NaiveDate) -> Self {
        self.first_aired = Some(date);
        self
    }

    pub fn with_rating(mut self, rating: f32, votes: u32) -> Self {
        self.rating = Some(rating);
        self.rating_votes = votes;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    pub fn with_episode(mut self, episode: CachedEpisode) -> Self {
        self.episodes.push(episode);
        self
    }

    pub fn with_server_last_updated(mut self, epoch: i64) -> Self {
        self.server_last_updated = epoch;
        self
    }

    pub fn trust(&self) -> RecordTrust {
        if self.is_placeholder {
            RecordTrust::Placeholder
        } else if self.is_search_result_only {
            RecordTrust::SearchResult
        } else {
            RecordTrust::FullFetch
        }
    }

    /// Year of first release, if known.
    pub fn year(&self) -> Option<i32> {
        self.first_aired.map(|date| date.year())
    }

    /// Fold `incoming` into this record.
    ///
    /// Aliases always union. Trust-bearing fields are replaced only when
    /// `incoming` is at least as trusted as the current contents, and only a
    /// full fetch clears the dirty flag. `server_last_updated` never moves
    /// backwards.
    pub fn merge_from(&mut self, incoming: CachedMediaRecord) {
        let incoming_trust = incoming.trust();
        self.aliases.extend(incoming.aliases);

        if incoming_trust >= self.trust() {
            self.name = incoming.name;
            self.overview = incoming.overview;
            self.first_aired = incoming.first_aired;
            self.rating = incoming.rating;
            self.rating_votes = incoming.rating_votes;
            if incoming_trust == RecordTrust::FullFetch || !incoming.episodes.is_empty() {
                self.episodes = incoming.episodes;
            }
            self.is_placeholder = incoming.is_placeholder;
            self.is_search_result_only = incoming_trust == RecordTrust::SearchResult;
            self.server_last_updated = self.server_last_updated.max(incoming.server_last_updated);
        }

        if incoming_trust == RecordTrust::FullFetch {
            self.dirty = false;
        }
    }

    /// Whether `hint` names this record, by title or alias.
    pub fn name_matches(&self, hint: &str) -> bool {
        let wanted = compare_name(hint);
        if wanted.is_empty() {
            return false;
        }
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .any(|name| compare_name(name) == wanted)
    }
}

/// Normalise a title for loose comparison.
///
/// Folds common Latin diacritics, lowercases, drops apostrophes and the
/// words "the" and "and", and collapses every run of non-alphanumeric
/// characters (including `&` and `!`) into one space.
pub fn compare_name(name: &str) -> String {
    let folded: String = name
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(fold_diacritic)
        .flat_map(char::to_lowercase)
        .collect();

    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty() && *word != "the" && *word != "and")
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' => 'A',
        'ç' | 'ć' | 'č' => 'c',
        'Ç' | 'Ć' | 'Č' => 'C',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => 'E',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' => 'I',
        'ñ' | 'ń' | 'ň' => 'n',
        'Ñ' | 'Ń' | 'Ň' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' => 'O',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        'š' | 'ś' => 's',
        'Š' | 'Ś' => 'S',
        'ž' | 'ź' | 'ż' => 'z',
        'Ž' | 'Ź' | 'Ż' => 'Z',
        'ł' => 'l',
        'Ł' => 'L',
        other => other,
    }
}
