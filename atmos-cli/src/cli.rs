use anyhow::{Context, anyhow};
use atmos_core::{
    ChatSession, Config, Conversation, Coordinates, FixedLocation, LocationSource, NoLocation,
    Outcome, SubmitError, TemperatureUnit,
    events::{campus_events, find_event},
    gateway::gateway_from_config,
};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Select, Text};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "atmos", version, about = "ATMOS weather chat for Jaya Shakthi students")]
pub struct Cli {
    /// Display unit: c (Celsius) or f (Fahrenheit). Defaults to the configured unit.
    #[arg(long, global = true)]
    pub unit: Option<TemperatureUnit>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the API key, model and preferences.
    Configure,

    /// Ask a single question and print the answer.
    Ask {
        /// The question, e.g. "Rain tonight in Chennai?"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Start an interactive chat.
    Chat,

    /// List upcoming campus events.
    Events,

    /// Get the weather for your current position.
    Locate {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
}

const CHAT_HELP: &str = "Commands: /unit  /location  /events  /event <id>  /help  /quit";

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load_with_env()?;
        let unit = self.unit.unwrap_or(config.unit);

        match self.command {
            Command::Configure => configure(config)?,
            Command::Events => print!("{}", render::events(&campus_events())),
            Command::Ask { text } => {
                let session = new_session(&config, unit, Conversation::new())?;
                let outcome = session.submit(&text.join(" ")).await;
                print_result(&session, outcome)?;
            }
            Command::Locate { lat, lon } => {
                let session = new_session(&config, unit, Conversation::new())?;
                let source = location_source(&config, lat.zip(lon))?;
                let outcome = session.detect_location(source.as_ref()).await;
                print_result(&session, outcome)?;
            }
            Command::Chat => {
                let session = new_session(&config, unit, Conversation::with_greeting())?;
                let source = location_source(&config, None)?;
                chat(session, source.as_ref()).await?;
            }
        }

        Ok(())
    }
}

fn new_session(
    config: &Config,
    unit: TemperatureUnit,
    conversation: Conversation,
) -> anyhow::Result<ChatSession> {
    if !config.has_api_key() {
        tracing::warn!("No API key configured; requests will be rejected by the provider");
    }

    let gateway = gateway_from_config(config)?;
    let session = ChatSession::new(gateway, conversation);
    session.set_unit(unit);
    Ok(session)
}

fn location_source(
    config: &Config,
    explicit: Option<(f64, f64)>,
) -> anyhow::Result<Box<dyn LocationSource>> {
    let coords = match explicit {
        Some((lat, lon)) => Some(Coordinates::new(lat, lon)?),
        None => config.home,
    };

    Ok(match coords {
        Some(coords) => Box::new(FixedLocation(coords)),
        None => Box::new(NoLocation),
    })
}

async fn chat(session: ChatSession, location: &dyn LocationSource) -> anyhow::Result<()> {
    if let Some(welcome) = session.with_state(|c| c.last_turn().cloned()) {
        println!("{}", render::turn(&welcome));
    }
    println!("{CHAT_HELP}\n");

    loop {
        let line = match Text::new("you>")
            .with_placeholder("Ask about weather (e.g., 'Rain tonight in Chennai?')")
            .prompt()
        {
            Ok(line) => line,
            Err(inquire::InquireError::OperationCanceled)
            | Err(inquire::InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err).context("Failed to read chat input"),
        };

        let input = line.trim();
        let outcome = match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{CHAT_HELP}");
                continue;
            }
            "/events" => {
                print!("{}", render::events(&campus_events()));
                continue;
            }
            "/unit" => {
                let unit = session.toggle_unit();
                println!("Display unit is now {unit}");
                if let Some(snapshot) = session.with_state(|c| c.current_snapshot().cloned()) {
                    print!("{}", render::card(&snapshot, unit));
                }
                continue;
            }
            "/location" => session.detect_location(location).await,
            _ => match input.strip_prefix("/event ") {
                Some(id) => match find_event(id) {
                    Some(event) => session.check_event(&event).await,
                    None => {
                        println!("No campus event with id '{}'. Try /events.", id.trim());
                        continue;
                    }
                },
                None => session.submit(input).await,
            },
        };

        if let Err(err) = print_result(&session, outcome) {
            eprintln!("error: {err}");
        }
    }

    Ok(())
}

/// Prints a settled reply. Anything else comes back as an error for the caller to report.
fn print_result(
    session: &ChatSession,
    outcome: Result<Outcome, SubmitError>,
) -> anyhow::Result<()> {
    match outcome {
        Ok(Outcome::Settled) => {
            let (turn, unit) = session.with_state(|c| (c.last_turn().cloned(), c.unit()));
            if let Some(turn) = turn {
                println!("\n{}", render::turn(&turn));
                if let Some(snapshot) = turn.snapshot() {
                    println!("{}", render::card(snapshot, unit));
                }
            }
            Ok(())
        }
        Ok(Outcome::Failed) => {
            let message = session.with_state(|c| c.error().map(str::to_owned));
            Err(anyhow!(message.unwrap_or_else(|| "request failed".to_string())))
        }
        Err(SubmitError::EmptyInput) => Err(anyhow!("Please type a question first.")),
        Err(SubmitError::Busy) => Err(anyhow!("ATMOS is still answering your last question.")),
        Err(SubmitError::NotPending) => Err(anyhow!("ATMOS has no question in progress.")),
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    println!("Configuring ATMOS ({})", path.display());

    let replace_key = !config.has_api_key()
        || Confirm::new("An API key is already configured. Replace it?")
            .with_default(false)
            .prompt()?;
    if replace_key {
        let key = Text::new("Gemini API key:").prompt()?;
        config.set_api_key(key);
    }

    config.model = Text::new("Model:").with_default(&config.model).prompt()?;

    let units = vec![TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit];
    let start = units.iter().position(|u| *u == config.unit).unwrap_or(0);
    config.unit = Select::new("Display unit:", units).with_starting_cursor(start).prompt()?;

    if Confirm::new("Set a default location for location detection?").with_default(false).prompt()? {
        let lat = CustomType::<f64>::new("Latitude:").prompt()?;
        let lon = CustomType::<f64>::new("Longitude:").prompt()?;
        config.home = Some(Coordinates::new(lat, lon)?);
    }

    config.save()?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}
