//! Commands accepted at the interactive prompt.

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Trending videos, optionally for another region.
    Trending(Option<String>),
    Search(String),
    /// Re-display the current results.
    List,
    /// Play a result, numbered from 1 as displayed.
    Play(usize),
    History,
    /// Play a history entry, numbered from 1 as displayed.
    Replay(usize),
    ClearHistory,
    Next,
    Previous,
    TogglePlay,
    Forward,
    Back,
    /// Jump to a percentage of the video.
    SeekPercent(f64),
    ToggleMute,
    ToggleAutoplay,
    /// The video finished playing.
    Ended,
    Close,
    /// Re-issue the last failed fetch.
    Retry,
    Time,
    /// Skip to the next API key.
    RotateKey,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(String);

pub const HELP: &str = "\
commands:
  home | trending [REGION]    trending videos
  search QUERY                search videos
  list                        show current results
  play N                      play result N
  history                     show watch history
  replay N                    play history entry N
  clear-history               forget watch history
  next | prev                 play next / previous result
  pause                       toggle play/pause
  fwd | back                  skip 10 seconds
  seek PERCENT                jump within the video
  mute                        toggle mute
  autoplay                    toggle autoplay
  ended                       the video finished playing
  close                       close the player
  retry                       retry the last failed load
  time                        show playback time
  rotate                      switch to the next API key
  quit";

impl Input {
    /// Parses a prompt line. Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let input = match command.to_lowercase().as_str() {
            "home" => Self::Trending(None),
            "trending" | "t" => Self::Trending((!rest.is_empty()).then(|| rest.to_uppercase())),
            "search" | "s" | "/" => {
                if rest.is_empty() {
                    return Err(ParseError("search needs a query".to_string()));
                }
                Self::Search(rest.to_string())
            }
            "list" | "ls" => Self::List,
            "play" => Self::Play(number(command, rest)?),
            "history" | "h" => Self::History,
            "replay" => Self::Replay(number(command, rest)?),
            "clear-history" => Self::ClearHistory,
            "next" | "n" => Self::Next,
            "prev" | "previous" | "p" => Self::Previous,
            "pause" | "resume" | "space" => Self::TogglePlay,
            "fwd" | "forward" | "f" => Self::Forward,
            "back" | "b" => Self::Back,
            "seek" => {
                let percent: f64 = rest
                    .trim_end_matches('%')
                    .parse()
                    .map_err(|_| ParseError(format!("not a percentage: {rest:?}")))?;
                Self::SeekPercent(percent)
            }
            "mute" | "m" => Self::ToggleMute,
            "autoplay" => Self::ToggleAutoplay,
            "ended" => Self::Ended,
            "close" | "x" => Self::Close,
            "retry" => Self::Retry,
            "time" => Self::Time,
            "rotate" => Self::RotateKey,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            // a bare number plays that result
            n if n.parse::<usize>().is_ok() => Self::Play(number("play", n)?),
            other => return Err(ParseError(format!("unknown command: {other} (try `help`)"))),
        };
        Ok(Some(input))
    }
}

/// Parses a 1-based entry number into an index.
fn number(command: &str, arg: &str) -> Result<usize, ParseError> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(ParseError(format!("{command} needs an entry number"))),
    }
}
