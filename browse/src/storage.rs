//! Local key-value persistence for the watch history and user settings.
//!
//! Everything lives in one small JSON object on disk. The whole object is rewritten after
//! every mutation; values that fail to parse are treated as missing, so a damaged file
//! never keeps the browser from starting.

use crate::history::{HistoryEntry, HistoryLog};
use eyre::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const WATCH_HISTORY: &str = "watchHistory";
const AUTOPLAY_ENABLED: &str = "autoplayEnabled";

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl LocalStore {
    /// Opens the store at `path`, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let values = if tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("check for state file {}", path.display()))?
        {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("read state file {}", path.display()))?;
            match serde_json::from_str(&raw) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable state file");
                    Map::new()
                }
            }
        } else {
            tracing::debug!(path = %path.display(), "no state file yet");
            Map::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                None
            }
        }
    }

    /// Stores `value` under `key` and writes the store back to disk.
    pub async fn set<T: Serialize>(&mut self, key: &str, value: &T) -> eyre::Result<()> {
        let value = serde_json::to_value(value).with_context(|| format!("serialize {key}"))?;
        self.values.insert(key.to_string(), value);
        self.flush().await
    }

    async fn flush(&self) -> eyre::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create state directory {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.values).context("serialize state")?;
        // replace atomically
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace state file {}", self.path.display()))?;
        Ok(())
    }

    /// The stored watch history, or an empty one.
    pub fn watch_history(&self) -> HistoryLog {
        self.get::<Vec<HistoryEntry>>(WATCH_HISTORY)
            .map(HistoryLog::from_entries)
            .unwrap_or_default()
    }

    pub async fn save_watch_history(&mut self, history: &HistoryLog) -> eyre::Result<()> {
        self.set(WATCH_HISTORY, history).await
    }

    /// Whether autoplay is enabled. Defaults to on.
    pub fn autoplay_enabled(&self) -> bool {
        self.get(AUTOPLAY_ENABLED).unwrap_or(true)
    }

    pub async fn save_autoplay_enabled(&mut self, enabled: bool) -> eyre::Result<()> {
        self.set(AUTOPLAY_ENABLED, &enabled).await
    }
}
