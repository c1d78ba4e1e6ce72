use std::{
    io::{self, Write},
    time::Duration,
};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use cityweather_core::{
    Config, LOOKUP_FAILED_MESSAGE, LookupOutcome, WeatherLookupService, WeatherQuery,
    config::API_KEY_ENV,
};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use tokio::sync::watch;
use tracing::info;

use crate::render;

const SPINNER: &[char] = &['|', '/', '-', '\\'];

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "Current weather for a city")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Show current weather for a city.
    Show {
        /// City name, e.g. "London".
        city: String,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search cities interactively; Esc or Ctrl-C quits.
    Search,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key } => configure(api_key),
            Command::Show { city, json } => show(&city, json).await,
            Command::Search => search().await,
        }
    }
}

fn configure(api_key: Option<String>) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let key = match api_key {
        Some(key) => key,
        None => Password::new("OpenWeather API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }

    cfg.set_api_key(key.to_string());
    let path = cfg.save()?;
    info!(path = %path.display(), "configuration saved");

    println!("Saved API key to {}", path.display());
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let cfg = Config::load()?.with_env_overrides();

    if !cfg.has_api_key() {
        eprintln!(
            "Hint: no API key configured. Run `cityweather configure` or set {API_KEY_ENV}."
        );
    }

    Ok(cfg)
}

async fn show(city: &str, json: bool) -> anyhow::Result<()> {
    let cfg = load_config()?;
    let service = WeatherLookupService::from_config(&cfg);

    match service.lookup(WeatherQuery::new(city)).await {
        LookupOutcome::Success(report) if json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        LookupOutcome::Success(report) => {
            println!("{}", render::report(&report, &cfg.icon_base_url));
        }
        LookupOutcome::Failure(msg) => bail!(msg),
        LookupOutcome::Idle | LookupOutcome::Pending => bail!(LOOKUP_FAILED_MESSAGE),
    }

    Ok(())
}

async fn search() -> anyhow::Result<()> {
    let cfg = load_config()?;
    let service = WeatherLookupService::from_config(&cfg);

    loop {
        let city = match Text::new("City:")
            .with_placeholder("Search for a city...")
            .prompt()
        {
            Ok(city) => city,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read city name"),
        };

        let city = city.trim();
        if city.is_empty() {
            continue;
        }

        let task = service.submit(WeatherQuery::new(city));
        let outcome = wait_for_outcome(service.subscribe()).await?;
        task.await.context("Lookup task failed")?;

        match outcome {
            LookupOutcome::Success(report) => {
                println!("{}\n", render::report(&report, &cfg.icon_base_url));
            }
            LookupOutcome::Failure(msg) => eprintln!("{msg}\n"),
            LookupOutcome::Idle | LookupOutcome::Pending => {}
        }
    }

    Ok(())
}

/// Draws a spinner on stderr until the outcome leaves `Pending`.
async fn wait_for_outcome(
    mut rx: watch::Receiver<LookupOutcome>,
) -> anyhow::Result<LookupOutcome> {
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut frames = SPINNER.iter().cycle();
    let mut stderr = io::stderr();

    while rx.borrow_and_update().is_pending() {
        tokio::select! {
            changed = rx.changed() => changed.context("Lookup service stopped")?,
            _ = ticker.tick() => {
                if let Some(frame) = frames.next() {
                    write!(stderr, "\r{frame} Loading...")?;
                    stderr.flush()?;
                }
            }
        }
    }

    write!(stderr, "\r{:width$}\r", "", width = 16)?;
    let outcome = rx.borrow().clone();
    Ok(outcome)
}
