//! YouTube Data API v3 client library.
//!
//! This module covers the read-only, key-authenticated part of the API that a video
//! browser needs: listing trending videos per region, keyword search, and the per-video
//! and per-channel lookups used to enrich result cards.
//!
//! # Keys and quota
//!
//! Every request carries one API key as the `key` query parameter. Keys are drawn from a
//! shared [`crate::keys::KeyRotator`]. The two list queries run inside
//! [`retry::with_key_rotation`], which moves on to the next key whenever a request fails,
//! most commonly because a key's quota is used up (`403 Forbidden`).
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use youtube_browse::keys::KeyRotator;
//! use youtube_browse::youtube_api::YouTubeClient;
//!
//! # async fn example() -> eyre::Result<()> {
//! let keys = KeyRotator::new(vec!["key-a".into(), "key-b".into()])?;
//! let client = YouTubeClient::new(Arc::new(keys), reqwest::Client::new());
//!
//! for video in client.list_trending("US").await? {
//!     println!("{} ({})", video.title, video.channel_title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod client;
pub mod error;
pub mod retry;
pub mod search;
pub mod types;
pub mod videos;

pub use client::YouTubeClient;
pub use error::ApiError;
pub use types::{PageInfo, Thumbnail, Thumbnails};

pub use videos::{Video, VideoStatistics, VideoSummary};

pub use channels::{Channel, ChannelSnippet};
