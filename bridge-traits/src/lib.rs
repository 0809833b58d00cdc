//! # Host Bridge Traits
//!
//! Collaborator contracts the media library core depends on but does not
//! implement itself.
//!
//! ## Traits
//!
//! - [`FileIndex`](storage::FileIndex) - Observed files per folder, used by the scan pipeline
//! - [`Clock`](time::Clock) - Time source for sync watermarks and air-date checks
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Implementations
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors and keep the offending path in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the core shares them across the
//! background worker and the caller through `Arc`.

pub mod error;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use storage::{FileEntry, FileIndex};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
