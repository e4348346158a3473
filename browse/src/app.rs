//! The browser: result listings on one side, the player session on the other.

use crate::feed::{FeedGuard, Listing, RequestToken};
use crate::format;
use crate::player::Player;
use crate::session::PlayerSession;
use crate::youtube_api::{ApiError, VideoSummary, YouTubeClient};
use jiff::Timestamp;
use std::collections::HashMap;

/// Fetches the cards for `listing`, going through the key-rotating retry loop.
pub async fn fetch_listing(
    client: &YouTubeClient,
    listing: &Listing,
) -> Result<Vec<VideoSummary>, ApiError> {
    match listing {
        Listing::Trending { region } => client.list_trending(region).await,
        Listing::Search { query } => client.search(query).await,
    }
}

/// Extra per-card information fetched after a listing is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    pub video_id: String,
    pub views: Option<u64>,
    pub channel_icon: Option<String>,
}

/// Looks up view count and channel avatar for one card.
///
/// Failures are logged and leave the corresponding field empty; they never fail the card.
pub async fn fetch_card_details(client: &YouTubeClient, video: &VideoSummary) -> CardDetails {
    let views = if video.view_count.is_some() {
        video.view_count
    } else {
        match client.get_video_statistics(&video.id).await {
            Ok(stats) => stats.views(),
            Err(e) => {
                tracing::warn!(video_id = %video.id, error = %e, "fetch video statistics");
                None
            }
        }
    };

    let channel_icon = match client.get_channel(&video.channel_id).await {
        Ok(channel) => channel.icon_url().map(str::to_string),
        Err(e) => {
            tracing::warn!(channel_id = %video.channel_id, error = %e, "fetch channel icon");
            None
        }
    };

    CardDetails {
        video_id: video.id.clone(),
        views,
        channel_icon,
    }
}

/// What happened to the screen when a fetch completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedUpdate {
    /// A newer fetch was issued meanwhile; nothing changed.
    Stale,
    /// The listing is now displayed.
    Shown { listing: Listing, count: usize },
    /// The fetch failed; `retry` re-issues it.
    Failed { message: String, retry: Listing },
}

/// Browser state shared by the interactive prompt and the one-shot commands.
#[derive(Debug)]
pub struct Browser<P> {
    client: YouTubeClient,
    session: PlayerSession<P>,
    feed: FeedGuard,
    listing: Option<Listing>,
    results: Vec<VideoSummary>,
    channel_icons: HashMap<String, String>,
    /// Token of the listing currently displayed.
    shown: Option<RequestToken>,
}

impl<P: Player> Browser<P> {
    pub fn new(client: YouTubeClient, session: PlayerSession<P>) -> Self {
        Self {
            client,
            session,
            feed: FeedGuard::new(),
            listing: None,
            results: Vec::new(),
            channel_icons: HashMap::new(),
            shown: None,
        }
    }

    pub fn client(&self) -> &YouTubeClient {
        &self.client
    }

    pub fn session(&self) -> &PlayerSession<P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlayerSession<P> {
        &mut self.session
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    pub fn results(&self) -> &[VideoSummary] {
        &self.results
    }

    /// Registers a new fetch. The caller runs [`fetch_listing`] and hands the result to
    /// [`Self::apply_listing`] along with the returned token.
    pub fn begin(&mut self, listing: Listing) -> RequestToken {
        self.feed.begin(listing)
    }

    /// Applies a completed fetch, unless a newer one has been issued since.
    pub fn apply_listing(
        &mut self,
        token: RequestToken,
        result: Result<Vec<VideoSummary>, ApiError>,
    ) -> FeedUpdate {
        let Some(listing) = self.feed.complete(token) else {
            return FeedUpdate::Stale;
        };

        match result {
            Ok(videos) => {
                tracing::info!(%listing, count = videos.len(), "displaying videos");
                self.session.show_results(&videos);
                self.results = videos;
                self.channel_icons.clear();
                self.shown = Some(token);
                self.listing = Some(listing.clone());
                FeedUpdate::Shown {
                    count: self.results.len(),
                    listing,
                }
            }
            Err(e) => {
                tracing::error!(%listing, error = %e, "fetch failed");
                FeedUpdate::Failed {
                    message: listing.failure_message().to_string(),
                    retry: listing,
                }
            }
        }
    }

    /// Applies per-card details fetched for the listing shown under `token`.
    ///
    /// Returns `false` if that listing has been replaced in the meantime.
    pub fn apply_details(&mut self, token: RequestToken, details: Vec<CardDetails>) -> bool {
        if self.shown != Some(token) {
            tracing::debug!("discarding card details for replaced listing");
            return false;
        }
        for detail in details {
            let Some(card) = self.results.iter_mut().find(|v| v.id == detail.video_id) else {
                continue;
            };
            if detail.views.is_some() {
                card.view_count = detail.views;
            }
            if let Some(icon) = detail.channel_icon {
                self.channel_icons.insert(card.channel_id.clone(), icon);
            }
        }
        true
    }

    pub fn channel_icon(&self, channel_id: &str) -> Option<&str> {
        self.channel_icons.get(channel_id).map(String::as_str)
    }

    /// Renders the displayed results, one card per entry, numbered from 1.
    pub fn render_results(&self, now: Timestamp) -> String {
        if self.results.is_empty() {
            return "No videos available".to_string();
        }
        let playing = self.session.sequencer().cursor();
        let mut out = String::new();
        for (i, video) in self.results.iter().enumerate() {
            let marker = if playing == Some(i) { '>' } else { ' ' };
            let duration = video
                .duration_secs
                .map(|d| format!(" [{}]", format::clock(d as f64)))
                .unwrap_or_default();
            out.push_str(&format!(
                "{marker}{:>3}. {}{duration}\n       {} - {} - {}\n",
                i + 1,
                video.title,
                video.channel_title,
                format::views(video.view_count),
                format::time_ago(video.published_at, now),
            ));
        }
        out
    }

    /// Renders the watch history, newest first, numbered from 1.
    pub fn render_history(&self, now: Timestamp) -> String {
        let history = self.session.history();
        if history.is_empty() {
            return "No watch history available".to_string();
        }
        let mut out = String::new();
        for (i, entry) in history.iter().enumerate() {
            out.push_str(&format!(
                "{:>4}. {}\n       {} - Watched {}\n",
                i + 1,
                entry.title,
                entry.channel_title,
                format::time_ago(entry.watched_at, now),
            ));
        }
        out
    }
}
