mod config;
mod logging;
mod scheduler;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use radar_engine::{
    GitHubClient, GitHubSettings, RotationController, RotationHandle, RotationSettings,
    TitleResolver, TitleSettings, TrackerError, UrlAsTitle, WebTitleResolver,
};
use radar_logging::{radar_error, radar_info};

use crate::config::{Cli, Config};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("could not build the GitHub client: {0}")]
    Tracker(#[from] TrackerError),
    #[error("could not start the rotation worker: {0}")]
    Worker(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.debug);

    let config = match Config::resolve(cli) {
        Ok(config) => config,
        Err(err) => {
            radar_error!("NOT generating radar: {err}");
            eprintln!("radar: {err}");
            return ExitCode::FAILURE;
        }
    };
    if config.mention.is_empty() {
        radar_info!("mention is empty, new issues will not notify anyone");
    }

    let handle = match start(&config) {
        Ok(handle) => handle,
        Err(err) => {
            radar_error!("NOT generating radar: {err}");
            return ExitCode::FAILURE;
        }
    };

    if config.once {
        return scheduler::run_once(handle);
    }
    radar_info!(
        "will rotate {} at {:02}:00 every day",
        config.repo,
        config.hour
    );
    scheduler::run_forever(handle)
}

fn start(config: &Config) -> Result<RotationHandle, StartupError> {
    let github = GitHubClient::new(GitHubSettings {
        api_url: config.api_url.clone(),
        ..GitHubSettings::new(config.token.clone())
    })?;
    let titles: Arc<dyn TitleResolver> = if config.resolve_titles {
        Arc::new(WebTitleResolver::new(TitleSettings::default())?.with_github(github.clone()))
    } else {
        Arc::new(UrlAsTitle)
    };

    let mut settings = RotationSettings::new(config.repo.clone());
    settings.label = config.label.clone();
    settings.timeout = config.timeout;

    let controller = RotationController::new(Arc::new(github), titles, settings);
    Ok(RotationHandle::new(
        controller,
        config.hour,
        config.mention.clone(),
    )?)
}
