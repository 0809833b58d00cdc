//! Season/episode recognition in file names

use regex::Regex;

use crate::error::Result;

/// Recognises `S01E02` and `1x02` style names.
#[derive(Debug, Clone)]
pub struct EpisodePatterns {
    patterns: Vec<Regex>,
}

impl EpisodePatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: vec![
                Regex::new(r"(?i)s(\d{1,2})\s*e(\d{1,3})")?,
                Regex::new(r"(?i)(?:^|\D)(\d{1,2})x(\d{1,3})(?:\D|$)")?,
            ],
        })
    }

    /// First `(season, episode)` pair found in `name`.
    pub fn season_episode(&self, name: &str) -> Option<(u32, u32)> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(name)?;
            let season = captures.get(1)?.as_str().parse().ok()?;
            let episode = captures.get(2)?.as_str().parse().ok()?;
            Some((season, episode))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognised_forms() {
        let patterns = EpisodePatterns::new().unwrap();
        assert_eq!(patterns.season_episode("lost.s01e02.720p"), Some((1, 2)));
        assert_eq!(patterns.season_episode("Lost S1 E2 Tabula Rasa"), Some((1, 2)));
        assert_eq!(patterns.season_episode("Lost - 3x105"), Some((3, 105)));
        assert_eq!(patterns.season_episode("Lost 1080p"), None);
        assert_eq!(patterns.season_episode("Lost 2004"), None);
    }
}
