//! Command-line and environment configuration.

use crate::feed::DEFAULT_REGION;
use crate::keys::{KeyRotator, MIN_KEY_INTERVAL};
use crate::youtube_api::client::DEFAULT_API_BASE;
use clap::{Parser, Subcommand};
use eyre::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "youtube-browse",
    version,
    about = "Browse trending and searched YouTube videos and play them"
)]
pub struct Cli {
    /// YouTube Data API keys, comma separated.
    #[arg(long, env = "YOUTUBE_API_KEYS", value_delimiter = ',', hide_env_values = true)]
    pub api_keys: Vec<String>,

    /// File with one API key per line; `#` starts a comment.
    #[arg(long, env = "YOUTUBE_API_KEYS_FILE")]
    pub keys_file: Option<PathBuf>,

    /// Region for trending videos (ISO 3166-1 alpha-2).
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Where watch history and settings are kept.
    #[arg(long, env = "YOUTUBE_BROWSE_STATE")]
    pub state_file: Option<PathBuf>,

    /// Root of the YouTube Data API.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Minimum milliseconds between two uses of the key pool.
    #[arg(long, default_value_t = MIN_KEY_INTERVAL.as_millis() as u64)]
    pub key_interval_ms: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive browsing session (the default).
    Browse,
    /// Print trending videos and exit.
    Trending {
        /// Overrides --region.
        region: Option<String>,
    },
    /// Print search results and exit.
    Search { query: String },
    /// Print the watch history and exit.
    History,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: Vec<String>,
    pub region: String,
    pub state_file: PathBuf,
    pub api_base: String,
    pub key_interval: Duration,
    pub command: Command,
}

impl Config {
    /// Resolves the command line, reading the key file and filling in default paths.
    pub async fn from_cli(cli: Cli) -> eyre::Result<Self> {
        let mut api_keys: Vec<String> = cli
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if let Some(path) = &cli.keys_file {
            api_keys.extend(read_keys_file(path).await?);
        }

        if api_keys.is_empty() {
            eyre::bail!(
                "no YouTube API keys configured; set YOUTUBE_API_KEYS or pass --keys-file"
            );
        }

        let state_file = match cli.state_file {
            Some(path) => path,
            None => default_state_file()?,
        };

        Ok(Self {
            api_keys,
            region: cli.region.to_uppercase(),
            state_file,
            api_base: cli.api_base,
            key_interval: Duration::from_millis(cli.key_interval_ms),
            command: cli.command.unwrap_or(Command::Browse),
        })
    }

    pub fn key_rotator(&self) -> eyre::Result<KeyRotator> {
        KeyRotator::with_interval(self.api_keys.clone(), self.key_interval)
    }
}

async fn read_keys_file(path: &Path) -> eyre::Result<Vec<String>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read API key file {}", path.display()))?;
    Ok(parse_keys(&raw))
}

fn parse_keys(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_state_file() -> eyre::Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| eyre::eyre!("unable to resolve data directory"))?;
    Ok(base.join("youtube-browse").join("state.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Parses `args` as given on the command line, ignoring the environment.
    fn parse(args: &[&str]) -> Cli {
        let matches = Cli::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(std::iter::once("youtube-browse").chain(args.iter().copied()))
            .unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_parse_keys_skips_comments_and_blanks() {
        let keys = parse_keys("# personal keys\nkey-a\n\n  key-b  # backup\n#key-c\n");
        assert_eq!(keys, vec!["key-a", "key-b"]);
    }

    #[tokio::test]
    async fn test_keys_from_flag_and_file() {
        let dir = TempDir::new().unwrap();
        let keys_file = dir.path().join("keys.txt");
        tokio::fs::write(&keys_file, "key-c\nkey-d\n").await.unwrap();

        let cli = parse(&[
            "--api-keys",
            "key-a, key-b",
            "--keys-file",
            keys_file.to_str().unwrap(),
            "--state-file",
            "/tmp/state.json",
            "--region",
            "gb",
            "search",
            "rust",
        ]);
        let config = Config::from_cli(cli).await.unwrap();
        assert_eq!(config.api_keys, vec!["key-a", "key-b", "key-c", "key-d"]);
        assert_eq!(config.region, "GB");
        assert_eq!(config.state_file, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.key_interval, MIN_KEY_INTERVAL);
        assert_eq!(
            config.command,
            Command::Search {
                query: "rust".to_string()
            }
        );
        assert_eq!(config.key_rotator().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_missing_keys_is_an_error() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("keys.txt");
        tokio::fs::write(&empty, "# nothing here\n").await.unwrap();

        let cli = parse(&["--keys-file", empty.to_str().unwrap()]);
        let err = Config::from_cli(cli).await.unwrap_err();
        assert!(err.to_string().contains("no YouTube API keys"), "{err}");
    }

    #[tokio::test]
    async fn test_defaults_to_interactive() {
        let cli = parse(&["--api-keys", "k", "--state-file", "s.json"]);
        let config = Config::from_cli(cli).await.unwrap();
        assert_eq!(config.command, Command::Browse);
        assert_eq!(config.region, "US");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
