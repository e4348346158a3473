//! YouTube Channels API types.

use crate::youtube_api::types::{PageInfo, Thumbnails};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Response structure for the `channels.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse {
    /// The value will be `youtube#channelListResponse`.
    pub kind: String,
    /// Absent altogether when no channel matched.
    #[serde(default)]
    pub items: Vec<Channel>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
}

/// A `channel` resource contains information about a YouTube channel.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Channel {
    /// The ID that YouTube uses to uniquely identify the channel.
    pub id: String,
    pub snippet: ChannelSnippet,
}

/// The subset of the channel snippet the browser shows.
///
/// See: <https://developers.google.com/youtube/v3/docs/channels#snippet>
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

impl Channel {
    /// URL of the channel's small avatar image.
    pub fn icon_url(&self) -> Option<&str> {
        self.snippet
            .thumbnails
            .default
            .as_ref()
            .map(|t| t.url.as_str())
    }
}
