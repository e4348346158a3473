//! Core YouTube API client functionality.

use crate::keys::KeyRotator;
use crate::youtube_api::{
    ApiError,
    channels::{Channel, ChannelListResponse},
    retry::with_key_rotation,
    search::{SearchListResponse, SearchResult},
    videos::{VideoListResponse, VideoStatistics, VideoSummary},
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

/// Public endpoint of the YouTube Data API v3.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Number of results requested for trending and search listings.
pub const DEFAULT_MAX_RESULTS: u32 = 24;

/// Client for the read-only parts of the YouTube Data API v3.
///
/// Every request embeds one API key from the shared [`KeyRotator`]. The list queries
/// ([`Self::list_trending`] and [`Self::search`]) go through the key-rotating retry loop,
/// while the per-card enrichment calls use a single issued key and give up on failure.
///
/// Cloning is cheap: the rotator and the underlying HTTP connection pool are shared.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    keys: Arc<KeyRotator>,
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
}

impl YouTubeClient {
    /// Creates a client that draws API keys from `keys`.
    pub fn new(keys: Arc<KeyRotator>, client: reqwest::Client) -> Self {
        Self {
            keys,
            client,
            base_url: DEFAULT_API_BASE.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Points the client at a different API root (no trailing slash).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn keys(&self) -> &KeyRotator {
        &self.keys
    }

    /// Makes a keyed GET request to the YouTube API and decodes the JSON body.
    ///
    /// `403 Forbidden` is reported as [`ApiError::QuotaExceeded`]; any other non-success
    /// status as [`ApiError::Status`] with the response body attached.
    #[instrument(skip(self, key), level = tracing::Level::TRACE)]
    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        key: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, resource);
        let response = self
            .client
            .get(&url)
            .query(query_params)
            .query(&[("key", key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::from_status(status, error_text));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Lists the most popular videos in a region.
    ///
    /// Uses the `videos.list` API with `chart=mostPopular`. Tries every key in the pool
    /// before giving up with [`ApiError::Exhausted`].
    ///
    /// # Arguments
    ///
    /// * `region` - ISO 3166-1 alpha-2 country code, e.g. `US`
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn list_trending(&self, region: &str) -> Result<Vec<VideoSummary>, ApiError> {
        let max_results = self.max_results.to_string();
        let query_params = [
            ("part", "snippet,contentDetails,statistics"),
            ("chart", "mostPopular"),
            ("regionCode", region),
            ("maxResults", max_results.as_str()),
        ];

        let videos: VideoListResponse =
            with_key_rotation(&self.keys, "trending", |key| async move {
                self.get_json("videos", &key, &query_params).await
            })
            .await?;

        tracing::debug!(
            region,
            total_results = videos.page_info.total_results,
            returned_items = videos.items.len(),
            "fetched trending videos"
        );

        Ok(videos
            .items
            .into_iter()
            .filter_map(|video| {
                let id = video.id.clone();
                let summary = VideoSummary::from_video(video);
                if summary.is_none() {
                    tracing::warn!(video_id = %id, "skipping trending item without snippet");
                }
                summary
            })
            .collect())
    }

    /// Searches for videos matching a keyword query.
    ///
    /// Uses the `search.list` API restricted to `type=video`. Tries every key in the pool
    /// before giving up with [`ApiError::Exhausted`].
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/search/list>
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<VideoSummary>, ApiError> {
        let max_results = self.max_results.to_string();
        let query_params = [
            ("part", "snippet"),
            ("maxResults", max_results.as_str()),
            ("q", query),
            ("type", "video"),
        ];

        let results: SearchListResponse =
            with_key_rotation(&self.keys, "search", |key| async move {
                self.get_json("search", &key, &query_params).await
            })
            .await?;

        tracing::debug!(
            total_results = results.page_info.total_results,
            returned_items = results.items.len(),
            "fetched search results"
        );

        Ok(results
            .items
            .into_iter()
            .filter_map(SearchResult::into_summary)
            .collect())
    }

    /// Gets the statistics (view, like and comment counts) of a single video.
    ///
    /// Uses one issued key and does not retry.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn get_video_statistics(&self, video_id: &str) -> Result<VideoStatistics, ApiError> {
        let key = self.keys.issue().await;
        let query_params = [("part", "statistics"), ("id", video_id)];
        let videos: VideoListResponse = self.get_json("videos", &key, &query_params).await?;

        videos
            .items
            .into_iter()
            .next()
            .and_then(|video| video.statistics)
            .ok_or_else(|| ApiError::NotFound {
                kind: "video",
                id: video_id.to_string(),
            })
    }

    /// Gets the metadata (title, avatar) of a single channel.
    ///
    /// Uses one issued key and does not retry.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/channels/list>
    #[instrument(skip(self))]
    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel, ApiError> {
        let key = self.keys.issue().await;
        let query_params = [("part", "snippet"), ("id", channel_id)];
        let channels: ChannelListResponse =
            self.get_json("channels", &key, &query_params).await?;

        channels
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound {
                kind: "channel",
                id: channel_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode, body};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::Mutex;
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

    /// Serves `respond(path, query)` on a local port and records every request.
    async fn fake_api<F>(respond: F) -> (String, Seen)
    where
        F: Fn(&str, &HashMap<String, String>) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let respond = Arc::new(respond);
        let seen: Seen = Default::default();
        let recorded = Arc::clone(&seen);

        tokio::spawn(async move {
            while let Ok((conn, _)) = listener.accept().await {
                let respond = Arc::clone(&respond);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<body::Incoming>| {
                        let respond = Arc::clone(&respond);
                        let recorded = Arc::clone(&recorded);
                        async move {
                            let query: HashMap<String, String> =
                                form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                                    .into_owned()
                                    .collect();
                            let path = req.uri().path().to_string();
                            let (status, body) = respond(&path, &query);
                            recorded.lock().unwrap().push((path, query));
                            let mut response = Response::new(Full::<Bytes>::from(body));
                            *response.status_mut() = status;
                            Ok::<_, Infallible>(response)
                        }
                    });
                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(hyper_util::rt::TokioIo::new(conn), service)
                        .await;
                });
            }
        });

        (format!("http://{addr}/youtube/v3"), seen)
    }

    fn client(base_url: &str, keys: usize) -> YouTubeClient {
        let keys = KeyRotator::with_interval(
            (0..keys).map(|i| format!("key-{i}")).collect(),
            Duration::ZERO,
        )
        .unwrap();
        YouTubeClient::new(Arc::new(keys), reqwest::Client::new()).with_base_url(base_url)
    }

    const TRENDING: &str = r#"{
        "kind": "youtube#videoListResponse",
        "pageInfo": { "totalResults": 2, "resultsPerPage": 24 },
        "items": [
            {
                "id": "v1",
                "snippet": {
                    "publishedAt": "2024-05-01T10:00:00Z",
                    "channelId": "c1",
                    "title": "First",
                    "channelTitle": "Channel One",
                    "thumbnails": { "default": { "url": "https://img/v1.jpg" } }
                },
                "contentDetails": { "duration": "PT10M" },
                "statistics": { "viewCount": "1234" }
            },
            {
                "id": "v2",
                "snippet": {
                    "publishedAt": "2024-05-02T10:00:00Z",
                    "channelId": "c2",
                    "title": "Second",
                    "channelTitle": "Channel Two"
                }
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_trending_rotates_past_quota_exceeded_keys() {
        let (base, seen) = fake_api(|_, query| {
            if query.get("key").map(String::as_str) == Some("key-2") {
                (StatusCode::OK, TRENDING.to_string())
            } else {
                (StatusCode::FORBIDDEN, r#"{"error":"quotaExceeded"}"#.to_string())
            }
        })
        .await;

        let videos = client(&base, 3).list_trending("GB").await.unwrap();
        let ids: Vec<_> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2"]);
        assert_eq!(videos[0].view_count, Some(1234));
        assert_eq!(videos[0].duration_secs, Some(600));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        let (path, query) = &seen[2];
        assert_eq!(path, "/youtube/v3/videos");
        assert_eq!(query["chart"], "mostPopular");
        assert_eq!(query["regionCode"], "GB");
        assert_eq!(query["maxResults"], "24");
        assert_eq!(query["part"], "snippet,contentDetails,statistics");
    }

    #[tokio::test]
    async fn test_trending_exhausts_after_every_key_fails() {
        let (base, seen) =
            fake_api(|_, _| (StatusCode::FORBIDDEN, "quotaExceeded".to_string())).await;

        let err = client(&base, 4).list_trending("US").await.unwrap_err();
        assert!(err.is_exhausted(), "{err:?}");
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_search_retries_server_errors_and_undecodable_bodies() {
        let (base, seen) = fake_api(|_, query| match query.get("key").map(String::as_str) {
            Some("key-0") => (StatusCode::INTERNAL_SERVER_ERROR, "backend".to_string()),
            Some("key-1") => (StatusCode::OK, "<html>not json</html>".to_string()),
            _ => (
                StatusCode::OK,
                r#"{
                    "kind": "youtube#searchListResponse",
                    "pageInfo": { "totalResults": 1, "resultsPerPage": 24 },
                    "items": [{
                        "id": { "kind": "youtube#video", "videoId": "s1" },
                        "snippet": {
                            "publishedAt": "2024-05-01T10:00:00Z",
                            "channelId": "c1",
                            "title": "rust & tokio",
                            "channelTitle": "Channel One"
                        }
                    }]
                }"#
                .to_string(),
            ),
        })
        .await;

        let results = client(&base, 3).search("rust & tokio").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "s1");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        let (path, query) = &seen[0];
        assert_eq!(path, "/youtube/v3/search");
        assert_eq!(query["q"], "rust & tokio");
        assert_eq!(query["type"], "video");
    }

    #[tokio::test]
    async fn test_video_statistics_uses_single_key() {
        let (base, seen) = fake_api(|_, query| {
            assert_eq!(query["id"], "v1");
            (
                StatusCode::OK,
                r#"{
                    "kind": "youtube#videoListResponse",
                    "pageInfo": { "totalResults": 1, "resultsPerPage": 1 },
                    "items": [{ "id": "v1", "statistics": { "viewCount": "987654" } }]
                }"#
                .to_string(),
            )
        })
        .await;

        let yt = client(&base, 2);
        let stats = yt.get_video_statistics("v1").await.unwrap();
        assert_eq!(stats.views(), Some(987_654));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(yt.keys().current_index().await, 1);
    }

    #[tokio::test]
    async fn test_enrichment_calls_do_not_retry() {
        let (base, seen) = fake_api(|_, _| (StatusCode::FORBIDDEN, String::new())).await;

        let err = client(&base, 3).get_channel("c1").await.unwrap_err();
        assert!(err.is_quota_exceeded(), "{err:?}");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_lookup() {
        let (base, _) = fake_api(|_, query| {
            let body = if query["id"] == "c1" {
                r#"{
                    "kind": "youtube#channelListResponse",
                    "pageInfo": { "totalResults": 1, "resultsPerPage": 1 },
                    "items": [{
                        "id": "c1",
                        "snippet": {
                            "title": "Channel One",
                            "publishedAt": "2015-01-01T00:00:00Z",
                            "thumbnails": { "default": { "url": "https://img/c1.jpg" } }
                        }
                    }]
                }"#
            } else {
                r#"{
                    "kind": "youtube#channelListResponse",
                    "pageInfo": { "totalResults": 0, "resultsPerPage": 1 }
                }"#
            };
            (StatusCode::OK, body.to_string())
        })
        .await;

        let yt = client(&base, 1);
        let channel = yt.get_channel("c1").await.unwrap();
        assert_eq!(channel.snippet.title, "Channel One");
        assert_eq!(channel.icon_url(), Some("https://img/c1.jpg"));

        let err = yt.get_channel("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "channel not found: missing");
    }
}
