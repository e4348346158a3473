//! The video player seam.
//!
//! The browser never renders video itself. It drives an external player through the
//! [`Player`] trait and reacts to the [`PlayerEvent`]s the player reports back. The
//! command and event vocabulary follows the YouTube embedded player API.

use eyre::Context;
use std::time::Instant;

/// Playback states as reported by the embedded player.
///
/// See: <https://developers.google.com/youtube/iframe_api_reference#onStateChange>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Maps the numeric state code used by the embedded player.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -1 => Self::Unstarted,
            0 => Self::Ended,
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Buffering,
            5 => Self::Cued,
            _ => return None,
        })
    }
}

/// Error codes reported by the embedded player.
///
/// See: <https://developers.google.com/youtube/iframe_api_reference#onError>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerError {
    InvalidParameter,
    Html5,
    NotFound,
    EmbeddingForbidden,
    Other(i32),
}

impl PlayerError {
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Self::InvalidParameter,
            5 => Self::Html5,
            100 => Self::NotFound,
            101 | 150 => Self::EmbeddingForbidden,
            other => Self::Other(other),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid video ID",
            Self::Html5 => "the video cannot be played in this player",
            Self::NotFound => "the video was removed or made private",
            Self::EmbeddingForbidden => "the owner does not allow playback outside YouTube",
            Self::Other(_) => "unknown player error",
        }
    }
}

/// Notifications the player sends back to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    StateChange(PlayerState),
    Error(PlayerError),
}

/// Commands the browser can issue to a player.
pub trait Player {
    /// Loads a video and starts playing it.
    fn load_by_id(&mut self, video_id: &str) -> eyre::Result<()>;
    /// Loads a video without starting it.
    fn cue_by_id(&mut self, video_id: &str) -> eyre::Result<()>;
    fn play(&mut self) -> eyre::Result<()>;
    fn pause(&mut self) -> eyre::Result<()>;
    fn stop(&mut self) -> eyre::Result<()>;
    /// Jumps to an absolute position in the current video.
    fn seek_to(&mut self, seconds: f64) -> eyre::Result<()>;
    fn mute(&mut self) -> eyre::Result<()>;
    fn unmute(&mut self) -> eyre::Result<()>;
    /// Sets the volume, from 0 to 100.
    fn set_volume(&mut self, volume: u8) -> eyre::Result<()>;
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Length of the current video in seconds, or 0 if unknown.
    fn duration(&self) -> f64;
}

/// Embed parameters the player is instantiated with.
///
/// See: <https://developers.google.com/youtube/player_parameters#Parameters>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerVars {
    pub autoplay: bool,
    pub playsinline: bool,
    /// Show related videos from other channels at the end.
    pub related: bool,
    pub modest_branding: bool,
    /// Show the player's own controls; the browser provides its own.
    pub controls: bool,
    pub enable_js_api: bool,
}

impl Default for PlayerVars {
    fn default() -> Self {
        Self {
            autoplay: true,
            playsinline: true,
            related: false,
            modest_branding: true,
            controls: false,
            enable_js_api: true,
        }
    }
}

impl PlayerVars {
    /// The embed URL for `video_id` with these parameters.
    pub fn embed_url(&self, video_id: &str) -> eyre::Result<reqwest::Url> {
        let flag = |b: bool| if b { "1" } else { "0" };
        reqwest::Url::parse_with_params(
            &format!("https://www.youtube.com/embed/{video_id}"),
            &[
                ("autoplay", flag(self.autoplay)),
                ("playsinline", flag(self.playsinline)),
                ("rel", flag(self.related)),
                ("modestbranding", flag(self.modest_branding)),
                ("controls", flag(self.controls)),
                ("enablejsapi", flag(self.enable_js_api)),
            ],
        )
        .with_context(|| format!("build embed URL for {video_id}"))
    }
}

/// A [`Player`] that hands videos to the system web browser.
///
/// The browser cannot be remote-controlled once a page is open, so beyond opening the
/// video this player only keeps its own view of the playback state, estimating the
/// position from wall-clock time while playing. It never learns the video's length.
#[derive(Debug)]
pub struct BrowserPlayer {
    vars: PlayerVars,
    video_id: Option<String>,
    /// Whether the current video has been handed to the browser yet.
    opened: bool,
    /// Position at the last play/pause/seek.
    position: f64,
    playing_since: Option<Instant>,
    volume: u8,
    muted: bool,
}

impl BrowserPlayer {
    pub fn new(vars: PlayerVars) -> Self {
        Self {
            vars,
            video_id: None,
            opened: false,
            position: 0.0,
            playing_since: None,
            volume: 100,
            muted: false,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    fn open(&mut self) -> eyre::Result<()> {
        let Some(video_id) = self.video_id.as_deref() else {
            eyre::bail!("no video loaded");
        };
        let mut url = self.vars.embed_url(video_id)?;
        if self.position >= 1.0 {
            url.query_pairs_mut()
                .append_pair("start", &(self.position as u64).to_string());
        }
        tracing::info!(%url, "opening video in browser");
        webbrowser::open(url.as_str()).context("open user's browser")?;
        self.opened = true;
        Ok(())
    }

    fn settle_position(&mut self) {
        if let Some(since) = self.playing_since.take() {
            self.position += since.elapsed().as_secs_f64();
        }
    }
}

impl Player for BrowserPlayer {
    fn load_by_id(&mut self, video_id: &str) -> eyre::Result<()> {
        self.cue_by_id(video_id)?;
        self.play()
    }

    fn cue_by_id(&mut self, video_id: &str) -> eyre::Result<()> {
        self.video_id = Some(video_id.to_string());
        self.opened = false;
        self.position = 0.0;
        self.playing_since = None;
        Ok(())
    }

    fn play(&mut self) -> eyre::Result<()> {
        if self.playing_since.is_some() {
            return Ok(());
        }
        if !self.opened {
            self.open()?;
        }
        self.playing_since = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) -> eyre::Result<()> {
        self.settle_position();
        Ok(())
    }

    fn stop(&mut self) -> eyre::Result<()> {
        self.playing_since = None;
        self.position = 0.0;
        self.opened = false;
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> eyre::Result<()> {
        let playing = self.playing_since.is_some();
        self.position = seconds.max(0.0);
        self.playing_since = playing.then(Instant::now);
        tracing::debug!(position = self.position, "seek recorded; browser playback not affected");
        Ok(())
    }

    fn mute(&mut self) -> eyre::Result<()> {
        self.muted = true;
        Ok(())
    }

    fn unmute(&mut self) -> eyre::Result<()> {
        self.muted = false;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> eyre::Result<()> {
        self.volume = volume.min(100);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.position
            + self
                .playing_since
                .map(|since| since.elapsed().as_secs_f64())
                .unwrap_or(0.0)
    }

    fn duration(&self) -> f64 {
        0.0
    }
}
