//! livewatch library crate.
//!
//! Polls YouTube channels for live broadcasts, detects start/end transitions
//! and fans out Discord webhook notifications.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod source;
pub mod state;

pub use error::{Error, Result};
