//! Built-in naming styles

use crate::error::{NamingError, Result};
use crate::template::NameTemplate;

/// Styles offered to users, most common first after the classic `1x01` form.
pub const PRESETS: &[&str] = &[
    "{ShowName} - {Season}x{Episode}[-{Season}x{Episode2}] - {EpisodeName}",
    "{ShowName} - S{Season:2}E{Episode}[-E{Episode2}] - {EpisodeName}",
    "{ShowName} S{Season:2}E{Episode}[-E{Episode2}] - {EpisodeName}",
    "{Season}{Episode}[-{Season}{Episode2}] - {EpisodeName}",
    "{Season}x{Episode}[-{Season}x{Episode2}] - {EpisodeName}",
    "S{Season:2}E{Episode}[-E{Episode2}] - {EpisodeName}",
    "E{Episode}[-E{Episode2}] - {EpisodeName}",
    "{Episode}[-{Episode2}] - {ShowName} - 3 - {EpisodeName}",
    "{Episode}[-{Episode2}] - {EpisodeName}",
    "{ShowName} - S{Season:2}{AllEpisodes} - {EpisodeName}",
];

/// Style used when none is configured.
pub const DEFAULT_STYLE: &str = "{ShowName} - S{Season:2}E{Episode}[-E{Episode2}] - {EpisodeName}";

/// Template for the preset at `index` (zero-based).
pub fn preset(index: usize) -> Result<NameTemplate> {
    PRESETS
        .get(index)
        .map(|style| NameTemplate::parse(style))
        .ok_or(NamingError::UnknownPreset(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EpisodeContext;

    #[test]
    fn test_every_preset_parses_strictly() {
        for style in PRESETS {
            assert!(NameTemplate::parse_strict(style).is_ok(), "{}", style);
        }
    }

    #[test]
    fn test_default_is_listed() {
        assert_eq!(PRESETS[1], DEFAULT_STYLE);
    }

    #[test]
    fn test_preset_lookup() {
        let ctx = EpisodeContext::single("Lost", 2, 3, "Orientation");
        assert_eq!(preset(0).unwrap().render(&ctx), "Lost - 2x03 - Orientation");
        assert_eq!(preset(3).unwrap().render(&ctx), "203 - Orientation");
        assert_eq!(preset(PRESETS.len()), Err(NamingError::UnknownPreset(10)));
    }
}
