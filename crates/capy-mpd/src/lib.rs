//! capy-mpd - Blocking MPD client library
//!
//! Features:
//! - One short-lived connection per query
//! - Connect and I/O timeouts
//! - Current song decoded into a fixed set of known tags

pub mod client;
pub mod error;
pub mod types;

pub use client::MpdClient;
pub use error::MpdError;
pub use types::{PlaybackState, Song};
