//! Command-line flags, environment and the optional RON settings file.
//!
//! Precedence: flag, then environment variable, then file, then default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use radar_core::{RepoParseError, RepoRef};
use radar_engine::{DEFAULT_API_URL, DEFAULT_LABEL};
use serde::Deserialize;

use crate::logging::LogDestination;

const DEFAULT_HOUR: &str = "03";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Parser)]
#[command(name = "radar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rolls unchecked reading-list links into a fresh GitHub issue every day")]
pub struct Cli {
    /// Repository holding the radar issues, as owner/name.
    #[arg(long, env = "RADAR_REPO", value_name = "owner/name")]
    pub repo: Option<String>,

    #[arg(long, env = "GITHUB_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Who to greet in each new issue, e.g. @parkr.
    #[arg(long, env = "RADAR_MENTION")]
    pub mention: Option<String>,

    /// Local hour to rotate at, two digits in 24-hour time.
    #[arg(long, env = "RADAR_HOUR", value_name = "HH")]
    pub hour: Option<String>,

    #[arg(long)]
    pub label: Option<String>,

    #[arg(long, value_name = "url")]
    pub api_url: Option<String>,

    /// Upper bound for one whole rotation.
    #[arg(long, value_name = "seconds")]
    pub timeout_secs: Option<u64>,

    /// Rotate once now and exit.
    #[arg(long)]
    pub once: bool,

    /// Keep untitled links as bare URLs instead of looking their titles up.
    #[arg(long)]
    pub no_titles: bool,

    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,

    #[arg(long)]
    pub debug: bool,

    #[arg(long, value_name = "file.ron")]
    pub config: Option<PathBuf>,
}

/// Contents of the settings file. Every key is optional; empty strings count
/// as unset.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    repo: String,
    token: String,
    mention: String,
    hour: String,
    label: String,
    api_url: String,
    timeout_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("{0} not set")]
    Missing(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoParseError),
    #[error("hour to generate is not in 24-hr time: {0:?}")]
    Hour(String),
    #[error("timeout must be at least one second")]
    Timeout,
}

/// Fully resolved settings for one process.
#[derive(Debug, Clone)]
pub struct Config {
    pub repo: RepoRef,
    pub token: String,
    pub mention: String,
    pub hour: u32,
    pub label: String,
    pub api_url: String,
    pub timeout: Duration,
    pub once: bool,
    pub resolve_titles: bool,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let repo = pick(cli.repo, file.repo).ok_or(ConfigError::Missing("repository"))?;
        let token = pick(cli.token, file.token).ok_or(ConfigError::Missing("GitHub token"))?;
        let hour = pick(cli.hour, file.hour).unwrap_or_else(|| DEFAULT_HOUR.to_string());
        let timeout_secs = cli
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Timeout);
        }

        Ok(Self {
            repo: repo.parse()?,
            token,
            mention: pick(cli.mention, file.mention).unwrap_or_default(),
            hour: parse_hour(&hour)?,
            label: pick(cli.label, file.label).unwrap_or_else(|| DEFAULT_LABEL.to_string()),
            api_url: pick(cli.api_url, file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            once: cli.once,
            resolve_titles: !cli.no_titles,
        })
    }
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn pick(flag: Option<String>, file: String) -> Option<String> {
    flag.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| Some(file.trim().to_string()).filter(|value| !value.is_empty()))
}

/// Exactly two digits, 00 through 23.
pub fn parse_hour(text: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::Hour(text.to_string());
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hour: u32 = text.parse().map_err(|_| invalid())?;
    if hour > 23 {
        return Err(invalid());
    }
    Ok(hour)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    const ENV_ARGS: [(&str, &str); 4] = [
        ("repo", "RADAR_REPO"),
        ("token", "GITHUB_ACCESS_TOKEN"),
        ("mention", "RADAR_MENTION"),
        ("hour", "RADAR_HOUR"),
    ];

    /// The flag parser with its environment fallbacks switched off.
    fn command_without_env() -> clap::Command {
        ENV_ARGS.iter().fold(Cli::command(), |command, (id, _)| {
            command.mut_arg(*id, |arg| arg.env(None::<&'static str>))
        })
    }

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["radar"];
        argv.extend_from_slice(args);
        let matches = command_without_env().try_get_matches_from(argv).unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn env_fallbacks_use_the_documented_names() {
        let command = Cli::command();
        for (id, name) in ENV_ARGS {
            let arg = command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .unwrap();
            assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new(name)), "{id}");
        }
    }

    #[test]
    fn shell_environment_cannot_reach_parsed_flags() {
        assert!(command_without_env()
            .get_arguments()
            .all(|arg| arg.get_env().is_none()));
    }

    fn settings_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn hours_must_be_two_digit_24h() {
        assert_eq!(parse_hour("03").unwrap(), 3);
        assert_eq!(parse_hour("00").unwrap(), 0);
        assert_eq!(parse_hour("23").unwrap(), 23);
        for bad in ["3", "24", "003", "ab", "", " 3"] {
            assert!(parse_hour(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn flags_fill_in_defaults() {
        let config =
            Config::resolve(cli(&["--repo", "parkr/radar", "--token", "t0ken"])).unwrap();
        assert_eq!(config.repo, RepoRef::new("parkr", "radar"));
        assert_eq!(config.hour, 3);
        assert_eq!(config.label, "radar");
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.resolve_titles);
        assert!(!config.once);
    }

    #[test]
    fn flags_override_the_settings_file() {
        let file = settings_file(
            r#"(
                repo: "parkr/daily",
                token: "from-file",
                hour: "05",
                label: "reading",
                timeout_secs: Some(30),
            )"#,
        );
        let path = file.path().to_str().unwrap();

        let config = Config::resolve(cli(&["--config", path, "--hour", "07", "--once"])).unwrap();
        assert_eq!(config.repo, RepoRef::new("parkr", "daily"));
        assert_eq!(config.token, "from-file");
        assert_eq!(config.hour, 7);
        assert_eq!(config.label, "reading");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.once);
    }

    #[test]
    fn bad_settings_are_rejected() {
        let missing_token = Config::resolve(cli(&["--repo", "parkr/radar"]));
        assert!(matches!(missing_token, Err(ConfigError::Missing(_))));

        let bad_repo = Config::resolve(cli(&["--repo", "parkr", "--token", "t"]));
        assert!(matches!(bad_repo, Err(ConfigError::Repo(_))));

        let bad_hour = Config::resolve(cli(&["--repo", "a/b", "--token", "t", "--hour", "9"]));
        assert!(matches!(bad_hour, Err(ConfigError::Hour(_))));

        let file = settings_file("(colour: \"blue\")");
        let path = file.path().to_str().unwrap();
        let unknown_key = Config::resolve(cli(&["--config", path]));
        assert!(matches!(unknown_key, Err(ConfigError::Parse { .. })));
    }
}
