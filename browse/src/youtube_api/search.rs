//! YouTube Search API types.

use crate::youtube_api::types::PageInfo;
use crate::youtube_api::videos::{VideoSnippet, VideoSummary};
use serde::{Deserialize, Serialize};

/// Response structure for the `search.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/search/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchListResponse {
    /// The value will be `youtube#searchListResponse`.
    pub kind: String,
    pub items: Vec<SearchResult>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A single search hit.
///
/// Unlike a `video` resource, the ID is an object that names what kind of resource matched.
///
/// See: <https://developers.google.com/youtube/v3/docs/search#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultId {
    /// The type of the matched resource, e.g. `youtube#video`.
    pub kind: String,
    /// Present only when the matched resource is a video.
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

impl SearchResult {
    /// Normalizes the hit into a card summary, or `None` if it is not a usable video.
    pub fn into_summary(self) -> Option<VideoSummary> {
        let id = self.id.video_id?;
        let snippet = self.snippet?;
        Some(VideoSummary::from_snippet(id, snippet))
    }
}
