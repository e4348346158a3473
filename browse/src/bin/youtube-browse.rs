use clap::Parser;
use eyre::Context;
use jiff::Timestamp;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_browse::app::{self, Browser, CardDetails, FeedUpdate};
use youtube_browse::config::{Cli, Command, Config};
use youtube_browse::feed::{Listing, RequestToken};
use youtube_browse::player::{BrowserPlayer, PlayerEvent, PlayerState, PlayerVars};
use youtube_browse::prompt::{self, Input};
use youtube_browse::session::{PlayOutcome, PlayerSession, SEEK_STEP_SECS, SessionNotice};
use youtube_browse::storage::LocalStore;
use youtube_browse::youtube_api::{ApiError, VideoSummary, YouTubeClient};

/// Background work reporting back to the prompt loop.
enum Completed {
    Listing(RequestToken, Result<Vec<VideoSummary>, ApiError>),
    Details(RequestToken, Vec<CardDetails>),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = Config::from_cli(Cli::parse()).await?;

    let keys = Arc::new(config.key_rotator()?);
    tracing::info!(keys = keys.len(), "loaded API keys");
    let client =
        YouTubeClient::new(keys, reqwest::Client::new()).with_base_url(config.api_base.clone());
    let store = LocalStore::open(&config.state_file)
        .await
        .context("open local state")?;
    let session = PlayerSession::new(BrowserPlayer::new(PlayerVars::default()), store);
    let mut browser = Browser::new(client, session);

    match config.command.clone() {
        Command::Trending { region } => {
            let region = region
                .map(|r| r.to_uppercase())
                .unwrap_or_else(|| config.region.clone());
            one_shot(&mut browser, Listing::Trending { region }).await
        }
        Command::Search { query } => one_shot(&mut browser, Listing::Search { query }).await,
        Command::History => {
            println!("{}", browser.render_history(Timestamp::now()).trim_end());
            Ok(())
        }
        Command::Browse => interactive(browser, &config).await,
    }
}

/// Fetches and prints one listing.
async fn one_shot(browser: &mut Browser<BrowserPlayer>, listing: Listing) -> eyre::Result<()> {
    let token = browser.begin(listing.clone());
    let result = app::fetch_listing(browser.client(), &listing).await;
    match browser.apply_listing(token, result) {
        FeedUpdate::Shown { .. } => {
            let client = browser.client().clone();
            let details = fetch_details(client, browser.results().to_vec()).await;
            browser.apply_details(token, details);
            println!("{}", browser.render_results(Timestamp::now()).trim_end());
            Ok(())
        }
        FeedUpdate::Failed { message, .. } => eyre::bail!(message),
        FeedUpdate::Stale => Ok(()),
    }
}

async fn fetch_details(client: YouTubeClient, videos: Vec<VideoSummary>) -> Vec<CardDetails> {
    let mut details = Vec::with_capacity(videos.len());
    for video in &videos {
        details.push(app::fetch_card_details(&client, video).await);
    }
    details
}

fn spawn_listing(
    browser: &mut Browser<BrowserPlayer>,
    tx: &mpsc::UnboundedSender<Completed>,
    listing: Listing,
) {
    println!("Loading {listing}...");
    let token = browser.begin(listing.clone());
    let client = browser.client().clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = app::fetch_listing(&client, &listing).await;
        let _ = tx.send(Completed::Listing(token, result));
    });
}

fn spawn_details(
    browser: &Browser<BrowserPlayer>,
    tx: &mpsc::UnboundedSender<Completed>,
    token: RequestToken,
) {
    let client = browser.client().clone();
    let videos = browser.results().to_vec();
    let tx = tx.clone();
    tokio::spawn(async move {
        let details = fetch_details(client, videos).await;
        let _ = tx.send(Completed::Details(token, details));
    });
}

/// Everything the prompt loop carries between lines.
struct Prompt {
    browser: Browser<BrowserPlayer>,
    tx: mpsc::UnboundedSender<Completed>,
    region: String,
    /// The listing to re-issue on `retry`.
    failed: Option<Listing>,
}

impl Prompt {
    fn title_of(&self, video_id: &str) -> String {
        self.browser
            .results()
            .iter()
            .find(|v| v.id == video_id)
            .map(|v| v.title.clone())
            .or_else(|| {
                self.browser
                    .session()
                    .history()
                    .iter()
                    .find(|e| e.video_id == video_id)
                    .map(|e| e.title.clone())
            })
            .unwrap_or_else(|| video_id.to_string())
    }

    fn report_play(&self, outcome: eyre::Result<PlayOutcome>) {
        let session = self.browser.session();
        match outcome {
            Ok(PlayOutcome::Queued) => println!("Player is starting; video queued."),
            Ok(PlayOutcome::Playing) => {
                if let Some(id) = session.now_playing() {
                    println!("Now playing: {}", self.title_of(id));
                }
            }
            Ok(PlayOutcome::Cued) => {
                if let Some(id) = session.now_playing() {
                    println!(
                        "Loaded: {} (autoplay is off; `pause` to start)",
                        self.title_of(id)
                    );
                }
            }
            Err(e) => println!("{e:#}"),
        }
    }

    fn report_notice(&self, notice: eyre::Result<Option<SessionNotice>>) {
        match notice {
            Ok(None) => {}
            Ok(Some(SessionNotice::Advanced(id))) => {
                println!("Up next: {}", self.title_of(&id))
            }
            Ok(Some(SessionNotice::Closed)) => println!("Player closed."),
            Ok(Some(SessionNotice::Failed(message))) => println!("{message}"),
            Err(e) => println!("{e:#}"),
        }
    }

    fn seek_by(&mut self, step: f64) {
        let session = self.browser.session_mut();
        match session.seek_by(step) {
            Ok(()) => println!("{}", session.time_display()),
            Err(e) => println!("{e:#}"),
        }
    }

    /// Runs one command. Returns `false` when the user asked to quit.
    async fn handle(&mut self, input: Input) -> bool {
        let now = Timestamp::now();
        match input {
            Input::Trending(region) => {
                let region = region.unwrap_or_else(|| self.region.clone());
                spawn_listing(&mut self.browser, &self.tx, Listing::Trending { region });
            }
            Input::Search(query) => {
                spawn_listing(&mut self.browser, &self.tx, Listing::Search { query });
            }
            Input::List => println!("{}", self.browser.render_results(now).trim_end()),
            Input::Play(index) => {
                let outcome = self.browser.session_mut().play_result(index).await;
                self.report_play(outcome);
            }
            Input::History => println!("{}", self.browser.render_history(now).trim_end()),
            Input::Replay(index) => {
                let outcome = self.browser.session_mut().play_history(index).await;
                self.report_play(outcome);
            }
            Input::ClearHistory => match self.browser.session_mut().clear_history().await {
                Ok(()) => println!("Watch history cleared."),
                Err(e) => println!("{e:#}"),
            },
            Input::Next => {
                let outcome = self.browser.session_mut().next().await;
                self.report_play(outcome);
            }
            Input::Previous => {
                let outcome = self.browser.session_mut().previous().await;
                self.report_play(outcome);
            }
            Input::TogglePlay => {
                let session = self.browser.session_mut();
                match session.toggle_play() {
                    Ok(()) if session.is_playing() => println!("Playing."),
                    Ok(()) => println!("Paused."),
                    Err(e) => println!("{e:#}"),
                }
            }
            Input::Forward => self.seek_by(SEEK_STEP_SECS),
            Input::Back => self.seek_by(-SEEK_STEP_SECS),
            Input::SeekPercent(percent) => {
                let session = self.browser.session_mut();
                match session.seek_to_fraction(percent / 100.0) {
                    Ok(()) => println!("{}", session.time_display()),
                    Err(e) => println!("{e:#}"),
                }
            }
            Input::ToggleMute => {
                let session = self.browser.session_mut();
                match session.toggle_mute() {
                    Ok(()) if session.volume() == 0 => println!("Muted."),
                    Ok(()) => println!("Volume {}.", session.volume()),
                    Err(e) => println!("{e:#}"),
                }
            }
            Input::ToggleAutoplay => match self.browser.session_mut().toggle_autoplay().await {
                Ok(true) => println!("Autoplay on."),
                Ok(false) => println!("Autoplay off."),
                Err(e) => println!("{e:#}"),
            },
            Input::Ended => {
                let notice = self
                    .browser
                    .session_mut()
                    .on_player_event(PlayerEvent::StateChange(PlayerState::Ended))
                    .await;
                self.report_notice(notice);
            }
            Input::Close => {
                self.browser.session_mut().close();
                println!("Player closed.");
            }
            Input::Retry => match self.failed.take() {
                Some(listing) => spawn_listing(&mut self.browser, &self.tx, listing),
                None => println!("Nothing to retry."),
            },
            Input::Time => println!("{}", self.browser.session().time_display()),
            Input::RotateKey => {
                let keys = self.browser.client().keys();
                keys.force_advance().await;
                println!(
                    "Switched to API key {} of {}.",
                    keys.current_index().await + 1,
                    keys.len()
                );
            }
            Input::Help => println!("{}", prompt::HELP),
            Input::Quit => return false,
        }
        true
    }

    fn completed(&mut self, completed: Completed) {
        match completed {
            Completed::Listing(token, result) => match self.browser.apply_listing(token, result) {
                FeedUpdate::Stale => {}
                FeedUpdate::Shown { listing, count } => {
                    self.failed = None;
                    println!("{count} videos, {listing}:");
                    println!("{}", self.browser.render_results(Timestamp::now()).trim_end());
                    if count > 0 {
                        spawn_details(&self.browser, &self.tx, token);
                    }
                }
                FeedUpdate::Failed { message, retry } => {
                    println!("{message} (type `retry` to try again)");
                    self.failed = Some(retry);
                }
            },
            Completed::Details(token, details) => {
                if self.browser.apply_details(token, details) {
                    tracing::debug!("card details updated; `list` shows view counts");
                }
            }
        }
    }
}

async fn interactive(mut browser: Browser<BrowserPlayer>, config: &Config) -> eyre::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    // the browser player has nothing to load before it can accept videos
    let notice = browser
        .session_mut()
        .on_player_event(PlayerEvent::Ready)
        .await;
    if let Err(e) = notice {
        tracing::warn!(error = %e, "player did not start cleanly");
    }

    let mut prompt = Prompt {
        browser,
        tx,
        region: config.region.clone(),
        failed: None,
    };
    spawn_listing(
        &mut prompt.browser,
        &prompt.tx,
        Listing::Trending {
            region: config.region.clone(),
        },
    );
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await.context("write prompt")?;
        stdout.flush().await.context("flush prompt")?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read from stdin")? else {
                    break;
                };
                match Input::parse(&line) {
                    Ok(Some(input)) => {
                        if !prompt.handle(input).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Some(completed) = rx.recv() => {
                println!();
                prompt.completed(completed);
            }
        }
    }

    prompt.browser.session_mut().close();
    Ok(())
}
