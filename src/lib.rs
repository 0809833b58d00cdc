//! Workspace umbrella crate.
//!
//! Re-exports the media library core crates under one name so hosts can
//! depend on `medialib-workspace` alone. The `desktop-shims` feature adds the
//! service facade wired to the desktop file index.

pub use core_library as library;
pub use core_naming as naming;
pub use core_scan as scan;
pub use core_sync as sync;

#[cfg(feature = "desktop-shims")]
pub use core_service as service;
