//! YouTube Videos API types and functionality.

use crate::youtube_api::types::{PageInfo, Thumbnails};
use jiff::{Span, Timestamp, Unit};
use serde::{Deserialize, Serialize};

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct VideoListResponse {
    /// Identifies the API resource's type.
    ///
    /// The value will be `youtube#videoListResponse`.
    pub kind: String,
    /// A list of videos that match the request criteria.
    pub items: Vec<Video>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
    /// Token for the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `video` resource represents a YouTube video.
///
/// Which parts are present depends on the `part` parameter of the request.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub statistics: Option<VideoStatistics>,
    #[serde(rename = "contentDetails")]
    pub content_details: Option<ContentDetails>,
}

/// Basic details about a video, shared by `videos.list` and `search.list` results.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSnippet {
    /// The date and time that the video was published.
    #[serde(rename = "publishedAt")]
    pub published_at: Timestamp,
    /// The ID of the channel that the video was uploaded to.
    #[serde(rename = "channelId")]
    pub channel_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    /// Channel title for the channel that the video belongs to.
    #[serde(rename = "channelTitle")]
    pub channel_title: String,
}

/// Statistics about the video.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#statistics>
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoStatistics {
    /// The number of times the video has been viewed.
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    /// The number of users who have indicated that they liked the video.
    #[serde(rename = "likeCount")]
    pub like_count: Option<String>,
    /// The number of comments for the video.
    #[serde(rename = "commentCount")]
    pub comment_count: Option<String>,
}

impl VideoStatistics {
    /// The view count as a number, if the API reported a well-formed one.
    pub fn views(&self) -> Option<u64> {
        self.view_count.as_deref()?.parse().ok()
    }
}

/// Information about the video content.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#contentDetails>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDetails {
    /// The length of the video as an ISO 8601 duration, e.g. `PT4M13S`.
    pub duration: String,
}

impl ContentDetails {
    /// The length of the video in whole seconds.
    ///
    /// Returns `None` for durations that do not parse or that span calendar days.
    pub fn duration_secs(&self) -> Option<u64> {
        let span: Span = self.duration.parse().ok()?;
        let secs = span.total(Unit::Second).ok()?;
        (secs >= 0.0).then_some(secs as u64)
    }
}

/// A video as shown on a result card, normalized from either a trending or a search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: Timestamp,
    pub thumbnail: Option<String>,
    pub duration_secs: Option<u64>,
    pub view_count: Option<u64>,
}

impl VideoSummary {
    /// Builds a summary from a snippet and the video ID it belongs to.
    pub fn from_snippet(id: String, snippet: VideoSnippet) -> Self {
        Self {
            thumbnail: snippet.thumbnails.card_url().map(str::to_string),
            id,
            title: snippet.title,
            channel_id: snippet.channel_id,
            channel_title: snippet.channel_title,
            published_at: snippet.published_at,
            duration_secs: None,
            view_count: None,
        }
    }

    /// Builds a summary from a full `videos.list` item.
    ///
    /// Returns `None` if the item was fetched without its snippet.
    pub fn from_video(video: Video) -> Option<Self> {
        let snippet = video.snippet?;
        let mut summary = Self::from_snippet(video.id, snippet);
        summary.duration_secs = video
            .content_details
            .as_ref()
            .and_then(ContentDetails::duration_secs);
        summary.view_count = video.statistics.as_ref().and_then(VideoStatistics::views);
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TRENDING_ITEM: &str = r#"{
        "kind": "youtube#video",
        "id": "dQw4w9WgXcQ",
        "snippet": {
            "publishedAt": "2009-10-25T06:57:33Z",
            "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
            "title": "Never Gonna Give You Up",
            "description": "The official video",
            "thumbnails": {
                "default": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg", "width": 120, "height": 90 },
                "medium": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg", "width": 320, "height": 180 }
            },
            "channelTitle": "Rick Astley"
        },
        "contentDetails": { "duration": "PT3M33S" },
        "statistics": { "viewCount": "1500000000", "likeCount": "17000000" }
    }"#;

    #[test]
    fn test_summary_from_trending_item() {
        let video: Video = serde_json::from_str(TRENDING_ITEM).unwrap();
        let summary = VideoSummary::from_video(video).unwrap();
        assert_eq!(summary.id, "dQw4w9WgXcQ");
        assert_eq!(summary.channel_title, "Rick Astley");
        assert_eq!(
            summary.thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/mqdefault.jpg")
        );
        assert_eq!(summary.duration_secs, Some(213));
        assert_eq!(summary.view_count, Some(1_500_000_000));
    }

    #[test]
    fn test_statistics_only_item_has_no_summary() {
        let video: Video =
            serde_json::from_str(r#"{ "id": "abc", "statistics": { "viewCount": "12" } }"#)
                .unwrap();
        assert_eq!(video.statistics.as_ref().and_then(VideoStatistics::views), Some(12));
        assert!(VideoSummary::from_video(video).is_none());
    }

    #[test]
    fn test_malformed_view_count() {
        let stats = VideoStatistics {
            view_count: Some("lots".to_string()),
            ..Default::default()
        };
        assert_eq!(stats.views(), None);
        assert_eq!(VideoStatistics::default().views(), None);
    }

    #[test]
    fn test_duration_parsing() {
        let details = |d: &str| ContentDetails {
            duration: d.to_string(),
        };
        assert_eq!(details("PT1H2M3S").duration_secs(), Some(3723));
        assert_eq!(details("PT45S").duration_secs(), Some(45));
        assert_eq!(details("not a duration").duration_secs(), None);
    }
}
