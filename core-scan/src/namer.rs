//! Expected names for a show's folders and files

use core_naming::{sanitize_file_name, truncate_chars, EpisodeContext, NameTemplate};
use core_runtime::config::NamingSettings;
use std::path::{Path, PathBuf};

/// Compiled naming styles for one pass
#[derive(Debug, Clone)]
pub struct Namer {
    episode: NameTemplate,
    season_folder: NameTemplate,
    max_path_length: usize,
}

impl Namer {
    pub fn new(settings: &NamingSettings) -> Self {
        Self {
            episode: NameTemplate::parse(&settings.episode_style),
            season_folder: NameTemplate::parse(&settings.season_folder_style),
            max_path_length: settings.max_path_length,
        }
    }

    /// Folder holding the episodes of `season`.
    pub fn season_folder(&self, base: &Path, show_name: &str, season: u32, per_season: bool) -> PathBuf {
        if !per_season {
            return base.to_path_buf();
        }
        let name = sanitize_file_name(
            &self
                .season_folder
                .render(&EpisodeContext::season_folder(show_name, season)),
        );
        base.join(name)
    }

    /// File name without extension, cut so `folder/name` fits the path limit.
    pub fn episode_stem(&self, ctx: &EpisodeContext, folder: &Path) -> String {
        self.episode_file_name(ctx, folder, None)
    }

    /// File name with `extension`, cut so `folder/name.ext` fits the path
    /// limit. The extension is never truncated.
    pub fn episode_file_name(
        &self,
        ctx: &EpisodeContext,
        folder: &Path,
        extension: Option<&str>,
    ) -> String {
        let clean = EpisodeContext {
            show_name: sanitize_file_name(&ctx.show_name),
            episode_name: sanitize_file_name(&ctx.episode_name),
            ..ctx.clone()
        };
        let extension = dotted(extension);
        let folder_length = component_offset(folder);

        let name = self
            .episode
            .name_for_ext(&clean, &extension, folder_length, self.max_path_length);
        let stem = name.strip_suffix(extension.as_str()).unwrap_or(&name);
        self.fit(stem, folder_length + extension.chars().count()) + &extension
    }

    /// Movie file name: `Title (Year)` with optional extension.
    pub fn movie_file_name(
        &self,
        title: &str,
        year: Option<i32>,
        folder: &Path,
        extension: Option<&str>,
    ) -> String {
        let stem = match year {
            Some(year) => format!("{} ({})", title, year),
            None => title.to_string(),
        };
        let extension = dotted(extension);
        self.fit(&stem, component_offset(folder) + extension.chars().count()) + &extension
    }

    /// Sanitise `stem` and cut it to what is left after `reserved` characters.
    fn fit(&self, stem: &str, reserved: usize) -> String {
        let budget = self.max_path_length.saturating_sub(reserved);
        truncate_chars(&sanitize_file_name(stem), budget)
            .trim_end()
            .to_string()
    }
}

/// Characters before a file name inside `folder`, separator included.
fn component_offset(folder: &Path) -> usize {
    folder.to_string_lossy().chars().count() + 1
}

fn dotted(extension: Option<&str>) -> String {
    match extension.map(|ext| ext.trim_start_matches('.')) {
        Some(ext) if !ext.is_empty() => format!(".{}", ext),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_folder_and_stem() {
        let namer = Namer::new(&NamingSettings::default());
        let base = Path::new("/tv/Lost");

        let folder = namer.season_folder(base, "Lost", 1, true);
        assert_eq!(folder, PathBuf::from("/tv/Lost/Season 01"));
        assert_eq!(namer.season_folder(base, "Lost", 1, false), base);

        let ctx = EpisodeContext::single("Lost", 1, 2, "Tabula Rasa: Part 1");
        assert_eq!(
            namer.episode_stem(&ctx, &folder),
            "Lost - S01E02 - Tabula Rasa - Part 1"
        );
        assert_eq!(
            namer.episode_file_name(&ctx, &folder, Some(".mkv")),
            "Lost - S01E02 - Tabula Rasa - Part 1.mkv"
        );
    }

    #[test]
    fn test_stem_respects_path_limit() {
        let settings = NamingSettings::default().with_max_path_length(30);
        let namer = Namer::new(&settings);
        let folder = Path::new("/tv/Lost/Season 01");
        let ctx = EpisodeContext::single("Lost", 1, 2, "Tabula Rasa");

        let stem = namer.episode_stem(&ctx, folder);
        assert_eq!(stem, "Lost - S01E");
        assert!(folder.join(&stem).to_string_lossy().chars().count() <= 30);
    }

    #[test]
    fn test_file_name_budget_includes_extension() {
        let settings = NamingSettings::default().with_max_path_length(30);
        let namer = Namer::new(&settings);
        let folder = Path::new("/tv/Lost/Season 01");
        let ctx = EpisodeContext::single("Lost", 1, 2, "Tabula Rasa");

        let name = namer.episode_file_name(&ctx, folder, Some("mkv"));

        assert_eq!(name, "Lost -.mkv");
        assert!(folder.join(&name).to_string_lossy().chars().count() <= 30);
    }

    #[test]
    fn test_movie_file_name() {
        let namer = Namer::new(&NamingSettings::default());
        let folder = Path::new("/movies/Heat");

        assert_eq!(namer.movie_file_name("Heat", Some(1995), folder, None), "Heat (1995)");
        assert_eq!(
            namer.movie_file_name("Mission: Impossible", None, folder, Some("mkv")),
            "Mission - Impossible.mkv"
        );

        let namer = Namer::new(&NamingSettings::default().with_max_path_length(25));
        let name = namer.movie_file_name("The Good, the Bad and the Ugly", Some(1966), folder, Some("mkv"));
        assert_eq!(name, "The Good.mkv");
        assert!(folder.join(&name).to_string_lossy().chars().count() <= 25);
    }
}
