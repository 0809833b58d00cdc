//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the media library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration types,
//! its logging conventions and the broadcast channel used to report sync and
//! scan progress to the host.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
