//! Watch history: the most recently played videos, newest first.

use crate::youtube_api::VideoSummary;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of entries kept in the watch history.
pub const HISTORY_CAPACITY: usize = 50;

/// A single watched video.
///
/// Field names match the layout the history has always been stored with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub channel_title: String,
    pub watched_at: Timestamp,
}

impl HistoryEntry {
    /// An entry for `video` watched at `watched_at`.
    pub fn from_summary(video: &VideoSummary, watched_at: Timestamp) -> Self {
        Self {
            video_id: video.id.clone(),
            title: video.title.clone(),
            thumbnail: video.thumbnail.clone(),
            channel_title: video.channel_title.clone(),
            watched_at,
        }
    }
}

/// Recently watched videos, newest first, without duplicates and capped at
/// [`HISTORY_CAPACITY`] entries.
///
/// Only serializable: a stored log is restored through [`HistoryLog::from_entries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a log from previously stored entries.
    ///
    /// Stored data is not trusted to uphold the invariants: later duplicates are dropped
    /// and the log is truncated to capacity.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries {
            if log.len() == HISTORY_CAPACITY {
                break;
            }
            if !log.contains(&entry.video_id) {
                log.entries.push_back(entry);
            }
        }
        log
    }

    /// Puts `entry` at the front, replacing any older entry for the same video.
    ///
    /// If this grows the log past capacity, the oldest entry is dropped.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.video_id != entry.video_id);
        self.entries.push_front(entry);
        if self.entries.len() > HISTORY_CAPACITY
            && let Some(evicted) = self.entries.pop_back()
        {
            tracing::trace!(video_id = %evicted.video_id, "evicted oldest history entry");
        }
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.entries.iter().any(|e| e.video_id == video_id)
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
