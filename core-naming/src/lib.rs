//! # Core Naming
//!
//! Renders episode file names and season folder names from user-editable
//! style strings.
//!
//! ## Overview
//!
//! A style such as `{ShowName} - S{Season:2}E{Episode}[-E{Episode2}] - {EpisodeName}`
//! is parsed into a [`NameTemplate`] once and rendered against an
//! [`EpisodeContext`] for every file. Rendering is pure: the same template and
//! context always produce the same name.
//!
//! - Tokens are matched case-insensitively; [`TAGS`] lists them all.
//! - `[...]` segments only appear for multi-episode files.
//! - [`NameTemplate::name_for_ext`] keeps full paths within a length limit.
//!
//! ```rust
//! use core_naming::{EpisodeContext, NameTemplate};
//!
//! let template = NameTemplate::default();
//! let ctx = EpisodeContext::single("Lost", 1, 4, "Walkabout");
//! assert_eq!(template.render(&ctx), "Lost - S01E04 - Walkabout");
//! ```

pub mod context;
pub mod error;
pub mod presets;
pub mod sanitize;
pub mod template;

pub use context::EpisodeContext;
pub use error::{NamingError, Result};
pub use presets::{preset, DEFAULT_STYLE, PRESETS};
pub use sanitize::sanitize_file_name;
pub use template::{truncate_chars, NameTemplate, RenderOptions, Token, TAGS};
