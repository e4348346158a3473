//! Ordered playback through the currently displayed result list.

/// Why a navigation request could not move the cursor.
///
/// The sequencer is left exactly as it was when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no result list has been loaded")]
    NoList,
    #[error("nothing from the current list is playing")]
    NotPositioned,
    #[error("already at the first video")]
    AtStart,
    #[error("already at the last video")]
    AtEnd,
    #[error("video {0} is not in the current list")]
    NotInList(String),
    #[error("position {index} is outside a list of {len} videos")]
    OutOfRange { index: usize, len: usize },
}

/// What should happen once the player reports that a video finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterPlayback {
    /// Autoplay moved the cursor forward; play this video next.
    Advance(String),
    /// Nothing follows; dismiss the player.
    Close,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum State {
    #[default]
    Idle,
    Listed {
        list: Vec<String>,
    },
    Positioned {
        list: Vec<String>,
        /// Always a valid index into `list`.
        cursor: usize,
    },
}

/// Tracks the displayed result list and which of its entries is playing.
///
/// The sequencer is either `Idle` (no list yet), `Listed` (a list but nothing from it is
/// playing) or `Positioned` (the cursor points at the entry being played). Navigation that
/// is not possible from the current state is reported as a [`NavigationError`] rather than
/// silently ignored.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSequencer {
    state: State,
}

impl PlaybackSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the result list wholesale and forgets any previous position.
    pub fn install(&mut self, list: Vec<String>) {
        tracing::trace!(len = list.len(), "installing result list");
        self.state = State::Listed { list };
    }

    /// The current result list, empty while idle.
    pub fn list(&self) -> &[String] {
        match &self.state {
            State::Idle => &[],
            State::Listed { list } | State::Positioned { list, .. } => list,
        }
    }

    /// Position of the playing entry, if one from the current list is playing.
    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            State::Positioned { cursor, .. } => Some(cursor),
            _ => None,
        }
    }

    /// The ID under the cursor.
    pub fn current(&self) -> Option<&str> {
        match &self.state {
            State::Positioned { list, cursor } => Some(list[*cursor].as_str()),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Takes the list out of the current state, leaving `Idle` behind.
    fn take_list(&mut self) -> Option<Vec<String>> {
        match std::mem::take(&mut self.state) {
            State::Idle => None,
            State::Listed { list } | State::Positioned { list, .. } => Some(list),
        }
    }

    /// Positions the cursor on the entry at `index`, as when the user picks a card.
    pub fn select_index(&mut self, index: usize) -> Result<&str, NavigationError> {
        let len = self.list().len();
        if self.is_idle() {
            return Err(NavigationError::NoList);
        }
        if index >= len {
            return Err(NavigationError::OutOfRange { index, len });
        }
        let list = self.take_list().ok_or(NavigationError::NoList)?;
        self.state = State::Positioned {
            list,
            cursor: index,
        };
        Ok(self.list()[index].as_str())
    }

    /// Positions the cursor on the first entry with the given ID.
    pub fn select(&mut self, video_id: &str) -> Result<usize, NavigationError> {
        if self.is_idle() {
            return Err(NavigationError::NoList);
        }
        let index = self
            .list()
            .iter()
            .position(|id| id == video_id)
            .ok_or_else(|| NavigationError::NotInList(video_id.to_string()))?;
        self.select_index(index)?;
        Ok(index)
    }

    /// Notes that `video_id` is about to play, from wherever the request came.
    ///
    /// If the video is in the current list the cursor moves onto it. Otherwise (say, a
    /// replay from the watch history) the cursor is cleared, so that previous/next do not
    /// act on a position that no longer describes what is playing.
    pub fn note_playing(&mut self, video_id: &str) {
        match self.select(video_id) {
            Ok(_) | Err(NavigationError::NoList) => {}
            Err(_) => {
                if let Some(list) = self.take_list() {
                    tracing::debug!(video_id, "playing video outside current list");
                    self.state = State::Listed { list };
                }
            }
        }
    }

    /// Moves back one entry and returns the ID to play.
    pub fn previous(&mut self) -> Result<String, NavigationError> {
        match &mut self.state {
            State::Idle => Err(NavigationError::NoList),
            State::Listed { .. } => Err(NavigationError::NotPositioned),
            State::Positioned { cursor: 0, .. } => Err(NavigationError::AtStart),
            State::Positioned { list, cursor } => {
                *cursor -= 1;
                Ok(list[*cursor].clone())
            }
        }
    }

    /// Moves forward one entry and returns the ID to play.
    pub fn next(&mut self) -> Result<String, NavigationError> {
        match &mut self.state {
            State::Idle => Err(NavigationError::NoList),
            State::Listed { .. } => Err(NavigationError::NotPositioned),
            State::Positioned { list, cursor } if *cursor + 1 >= list.len() => {
                Err(NavigationError::AtEnd)
            }
            State::Positioned { list, cursor } => {
                *cursor += 1;
                Ok(list[*cursor].clone())
            }
        }
    }

    /// Decides what follows a video that played to the end.
    ///
    /// With autoplay on and another entry after the cursor, this advances like
    /// [`Self::next`]. In every other case the player should be closed; the cursor stays
    /// where it is.
    pub fn on_playback_ended(&mut self, autoplay: bool) -> AfterPlayback {
        if !autoplay {
            return AfterPlayback::Close;
        }
        match self.next() {
            Ok(id) => AfterPlayback::Advance(id),
            Err(reason) => {
                tracing::debug!(%reason, "not advancing after playback ended");
                AfterPlayback::Close
            }
        }
    }
}
