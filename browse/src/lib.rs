//! Browse trending and searched YouTube videos, and play them in sequence.
//!
//! Listings come from the YouTube Data API through a pool of API keys that is rotated
//! whenever one runs out of quota. Watched videos go into a capped history that survives
//! restarts.

pub mod app;
pub mod config;
pub mod feed;
pub mod format;
pub mod history;
pub mod keys;
pub mod player;
pub mod prompt;
pub mod sequencer;
pub mod session;
pub mod storage;
pub mod youtube_api;
