//! A viewing session: the player, what is listed, what is playing, and what was watched.

use crate::history::{HistoryEntry, HistoryLog};
use crate::player::{Player, PlayerEvent, PlayerState};
use crate::sequencer::{AfterPlayback, PlaybackSequencer};
use crate::storage::LocalStore;
use crate::youtube_api::VideoSummary;
use crate::format;
use eyre::Context;
use jiff::Timestamp;
use std::collections::{HashMap, VecDeque};

/// Seconds skipped by the backward/forward controls.
pub const SEEK_STEP_SECS: f64 = 10.0;

const FULL_VOLUME: u8 = 100;

/// How a play request was carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The player is not ready yet; the video plays once it is.
    Queued,
    /// Loaded and playing (autoplay on).
    Playing,
    /// Loaded but waiting for the user to press play (autoplay off).
    Cued,
}

/// Something the user should hear about after a player event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Autoplay moved on to this video.
    Advanced(String),
    /// The player view was dismissed.
    Closed,
    /// The player failed; the player view was dismissed.
    Failed(String),
}

/// Coordinates a [`Player`] with the displayed result list, the watch history and the
/// persisted settings.
///
/// The session mirrors the embedded player's behaviour in a page: play requests made
/// before the player reports ready are queued, the player starts muted and is unmuted
/// once the user has interacted, and a finished video either advances (autoplay) or
/// closes the player.
#[derive(Debug)]
pub struct PlayerSession<P> {
    player: P,
    store: LocalStore,
    history: HistoryLog,
    autoplay: bool,
    sequencer: PlaybackSequencer,
    /// Metadata for the listed videos, used to fill in history entries.
    cards: HashMap<String, VideoSummary>,
    ready: bool,
    queue: VecDeque<String>,
    now_playing: Option<String>,
    visible: bool,
    is_playing: bool,
    volume: u8,
    user_interacted: bool,
}

impl<P: Player> PlayerSession<P> {
    /// Starts a session with the history and settings found in `store`.
    pub fn new(player: P, store: LocalStore) -> Self {
        let history = store.watch_history();
        let autoplay = store.autoplay_enabled();
        tracing::debug!(history = history.len(), autoplay, "restored session state");
        Self {
            player,
            store,
            history,
            autoplay,
            sequencer: PlaybackSequencer::new(),
            cards: HashMap::new(),
            ready: false,
            queue: VecDeque::new(),
            now_playing: None,
            visible: false,
            is_playing: false,
            volume: FULL_VOLUME,
            user_interacted: false,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn sequencer(&self) -> &PlaybackSequencer {
        &self.sequencer
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.now_playing.as_deref()
    }

    /// Whether the player view is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Replaces the displayed result list.
    pub fn show_results(&mut self, videos: &[VideoSummary]) {
        self.cards = videos.iter().map(|v| (v.id.clone(), v.clone())).collect();
        self.sequencer
            .install(videos.iter().map(|v| v.id.clone()).collect());
    }

    /// Plays the result at `index`, as when its card is clicked.
    pub async fn play_result(&mut self, index: usize) -> eyre::Result<PlayOutcome> {
        let video_id = self.sequencer.select_index(index)?.to_string();
        self.play_positioned(&video_id).await
    }

    /// Plays the history entry at `index`.
    pub async fn play_history(&mut self, index: usize) -> eyre::Result<PlayOutcome> {
        let Some(entry) = self.history.get(index) else {
            eyre::bail!("no history entry number {}", index + 1);
        };
        let video_id = entry.video_id.clone();
        self.play_video(&video_id).await
    }

    /// Plays the entry before the current one.
    pub async fn previous(&mut self) -> eyre::Result<PlayOutcome> {
        let video_id = self.sequencer.previous()?;
        self.play_positioned(&video_id).await
    }

    /// Plays the entry after the current one.
    pub async fn next(&mut self) -> eyre::Result<PlayOutcome> {
        let video_id = self.sequencer.next()?;
        self.play_positioned(&video_id).await
    }

    /// Plays `video_id`, recording it in the watch history.
    ///
    /// The cursor moves onto the first list entry with this ID, or is cleared if the
    /// video is not listed.
    pub async fn play_video(&mut self, video_id: &str) -> eyre::Result<PlayOutcome> {
        if video_id.is_empty() {
            eyre::bail!("no video ID provided");
        }
        self.sequencer.note_playing(video_id);
        self.play_positioned(video_id).await
    }

    /// Plays `video_id` where the sequencer has already been positioned on it.
    async fn play_positioned(&mut self, video_id: &str) -> eyre::Result<PlayOutcome> {
        tracing::info!(video_id, "playing video");

        if let Err(e) = self.record_watch(video_id).await {
            tracing::warn!(
                video_id,
                error = %format!("{e:#}"),
                "watch history not saved, playing anyway"
            );
        }
        self.user_interacted = true;
        self.now_playing = Some(video_id.to_string());

        if !self.ready {
            tracing::debug!(video_id, "player not ready, queueing video");
            self.queue.push_back(video_id.to_string());
            return Ok(PlayOutcome::Queued);
        }

        match self.start(video_id) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.close();
                Err(e.wrap_err(format!("play video {video_id}")))
            }
        }
    }

    fn start(&mut self, video_id: &str) -> eyre::Result<PlayOutcome> {
        self.visible = true;
        if self.autoplay {
            self.player.load_by_id(video_id)?;
            self.player.play()?;
            self.unmute_full()?;
            self.is_playing = true;
            Ok(PlayOutcome::Playing)
        } else {
            self.player.cue_by_id(video_id)?;
            self.is_playing = false;
            Ok(PlayOutcome::Cued)
        }
    }

    async fn record_watch(&mut self, video_id: &str) -> eyre::Result<()> {
        let now = Timestamp::now();
        let entry = if let Some(card) = self.cards.get(video_id) {
            HistoryEntry::from_summary(card, now)
        } else if let Some(old) = self.history.iter().find(|e| e.video_id == video_id) {
            HistoryEntry {
                watched_at: now,
                ..old.clone()
            }
        } else {
            tracing::debug!(video_id, "no metadata for video, not recording history");
            return Ok(());
        };
        self.history.record(entry);
        self.store
            .save_watch_history(&self.history)
            .await
            .context("save watch history")
    }

    fn unmute_full(&mut self) -> eyre::Result<()> {
        self.player.unmute()?;
        self.player.set_volume(FULL_VOLUME)?;
        self.volume = FULL_VOLUME;
        Ok(())
    }

    /// Reacts to a notification from the player.
    pub async fn on_player_event(
        &mut self,
        event: PlayerEvent,
    ) -> eyre::Result<Option<SessionNotice>> {
        tracing::debug!(?event, "player event");
        match event {
            PlayerEvent::Ready => {
                self.ready = true;
                // start muted so that autoplay is permitted
                self.player.mute()?;
                self.volume = 0;
                if let Some(video_id) = self.queue.pop_front() {
                    tracing::debug!(%video_id, "playing queued video");
                    self.start(&video_id)?;
                }
                Ok(None)
            }
            PlayerEvent::StateChange(PlayerState::Playing) => {
                self.is_playing = true;
                if self.user_interacted {
                    self.unmute_full()?;
                }
                Ok(None)
            }
            PlayerEvent::StateChange(PlayerState::Paused) => {
                self.is_playing = false;
                Ok(None)
            }
            PlayerEvent::StateChange(PlayerState::Ended) => {
                self.is_playing = false;
                match self.sequencer.on_playback_ended(self.autoplay) {
                    AfterPlayback::Advance(video_id) => {
                        tracing::info!(%video_id, "autoplaying next video");
                        self.play_positioned(&video_id).await?;
                        Ok(Some(SessionNotice::Advanced(video_id)))
                    }
                    AfterPlayback::Close => {
                        self.close();
                        Ok(Some(SessionNotice::Closed))
                    }
                }
            }
            PlayerEvent::StateChange(_) => Ok(None),
            PlayerEvent::Error(error) => {
                tracing::error!(?error, "player error");
                self.close();
                Ok(Some(SessionNotice::Failed(format!(
                    "Error playing video: {}",
                    error.description()
                ))))
            }
        }
    }

    /// Stops playback and dismisses the player view.
    pub fn close(&mut self) {
        if let Err(e) = self.player.stop() {
            tracing::warn!(error = %e, "failed to stop player");
        }
        self.visible = false;
        self.is_playing = false;
    }

    /// Toggles between playing and paused. Counts as user interaction.
    pub fn toggle_play(&mut self) -> eyre::Result<()> {
        self.user_interacted = true;
        self.unmute_full()?;
        if self.is_playing {
            self.player.pause()?;
        } else {
            self.player.play()?;
        }
        self.is_playing = !self.is_playing;
        Ok(())
    }

    /// Moves the playback position by `delta` seconds, not before the start.
    pub fn seek_by(&mut self, delta: f64) -> eyre::Result<()> {
        let target = (self.player.current_time() + delta).max(0.0);
        self.player.seek_to(target)
    }

    /// Jumps to `fraction` (0 to 1) of the video's length, as when the progress bar is clicked.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> eyre::Result<()> {
        let duration = self.player.duration();
        if duration <= 0.0 {
            eyre::bail!("video length is not known");
        }
        self.player.seek_to(fraction.clamp(0.0, 1.0) * duration)
    }

    /// Switches between muted and full volume. Counts as user interaction.
    pub fn toggle_mute(&mut self) -> eyre::Result<()> {
        self.user_interacted = true;
        if self.volume > 0 {
            self.player.set_volume(0)?;
            self.volume = 0;
            Ok(())
        } else {
            self.unmute_full()
        }
    }

    /// Flips the autoplay setting and persists it.
    pub async fn toggle_autoplay(&mut self) -> eyre::Result<bool> {
        self.autoplay = !self.autoplay;
        self.store
            .save_autoplay_enabled(self.autoplay)
            .await
            .context("save autoplay setting")?;
        Ok(self.autoplay)
    }

    pub async fn clear_history(&mut self) -> eyre::Result<()> {
        self.history.clear();
        self.store
            .save_watch_history(&self.history)
            .await
            .context("save watch history")
    }

    /// The `current / total` time display.
    pub fn time_display(&self) -> String {
        format!(
            "{} / {}",
            format::clock(self.player.current_time()),
            format::clock(self.player.duration())
        )
    }
}
