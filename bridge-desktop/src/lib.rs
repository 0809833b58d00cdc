//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileIndex` using `tokio::fs`
//! - Application data directory resolution using `dirs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_data_dir, TokioFileIndex};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .data_dir(default_data_dir())
//!     .file_index(Arc::new(TokioFileIndex::new()))
//!     .build()?;
//! ```

mod filesystem;

pub use filesystem::{default_data_dir, TokioFileIndex};
