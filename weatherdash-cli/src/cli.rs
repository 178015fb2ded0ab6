use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weatherdash_core::{
    ClockFormat, Config, Dashboard, PlaceQuery, ProviderId, SearchOutcome, SyncBus,
    TemperatureUnit, WindSpeedUnit,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdash", version, about = "Weather dashboard for the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a provider.
    Configure {
        /// Provider short name: "openweather" or "ipgeolocation".
        provider: String,
    },

    /// Show current conditions and forecast.
    ///
    /// Without arguments, shows the last searched place (or the default city).
    Show(ShowArgs),

    /// Manage saved cities.
    Cities {
        #[command(subcommand)]
        action: CitiesCommand,
    },

    /// View or change display preferences.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// City name or ZIP code.
    #[arg(conflicts_with_all = ["lat", "here"])]
    pub place: Option<String>,

    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Use the approximate location of this machine.
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub here: bool,
}

#[derive(Debug, Subcommand)]
pub enum CitiesCommand {
    /// List saved cities.
    List,
    /// Look up a place and save it.
    Add { place: String },
    /// Remove a saved city by name.
    Remove { name: String },
    /// Remove every saved city.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set {
        /// celsius | fahrenheit
        #[arg(long, value_parser = parse_temperature_unit)]
        temp: Option<TemperatureUnit>,

        /// km/h | m/s | knots
        #[arg(long, value_parser = parse_wind_speed_unit)]
        wind: Option<WindSpeedUnit>,

        /// 12h | 24h
        #[arg(long, value_parser = parse_clock_format)]
        clock: Option<ClockFormat>,
    },
    /// Restore default preferences.
    Reset,
}

fn parse_temperature_unit(s: &str) -> Result<TemperatureUnit, String> {
    TemperatureUnit::try_from(s).map_err(|e| e.to_string())
}

fn parse_wind_speed_unit(s: &str) -> Result<WindSpeedUnit, String> {
    WindSpeedUnit::try_from(s).map_err(|e| e.to_string())
}

fn parse_clock_format(s: &str) -> Result<ClockFormat, String> {
    ClockFormat::try_from(s).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show(args) => show(args).await,
            Command::Cities { action } => cities(action).await,
            Command::Settings { action } => settings(action),
        }
    }
}

fn open_dashboard() -> anyhow::Result<Dashboard> {
    let config = Config::load()?;
    let bus = SyncBus::new();
    Ok(Dashboard::from_config(&config, &bus)?)
}

/// Attach a retry hint to errors that a second attempt could fix.
fn with_hint(err: weatherdash_core::Error) -> anyhow::Error {
    if err.is_retryable() {
        anyhow!("{err}\nHint: check the place name or your connection and try again.")
    } else {
        err.into()
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    println!(
        "Saved {id} credentials to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let dash = open_dashboard()?;

    let outcome = if args.here {
        let (location, outcome) = dash.search_here().await.map_err(with_hint)?;
        if location.is_fallback {
            eprintln!(
                "Could not determine your location; showing the default location ({}).",
                location.city
            );
        }
        outcome
    } else {
        let query = match (args.place, args.lat, args.lon) {
            (Some(place), _, _) => PlaceQuery::by_name(place),
            (None, Some(lat), Some(lon)) => PlaceQuery::by_coordinates(lat, lon),
            _ => dash.startup_query(),
        };
        dash.search(&query).await.map_err(with_hint)?
    };

    if let SearchOutcome::Current(view) = outcome {
        print!("{}", render::weather_view(&view, dash.settings()));
    }
    Ok(())
}

async fn cities(action: CitiesCommand) -> anyhow::Result<()> {
    let mut dash = open_dashboard()?;

    match action {
        CitiesCommand::List => {
            print!("{}", render::saved_cities(dash.registry().cities(), dash.settings()));
        }
        CitiesCommand::Add { place } => {
            let city = dash
                .add_city(&PlaceQuery::by_name(place))
                .await
                .map_err(with_hint)?;
            println!("Saved {}", city.name);
        }
        CitiesCommand::Remove { name } => {
            if !dash.registry_mut().delete_city(&name)? {
                bail!("No saved city named '{name}'");
            }
            println!("Removed {name}");
        }
        CitiesCommand::Clear => {
            dash.registry_mut().delete_all_cities()?;
            println!("Removed all saved cities");
        }
    }
    Ok(())
}

fn settings(action: SettingsCommand) -> anyhow::Result<()> {
    let mut dash = open_dashboard()?;

    match action {
        SettingsCommand::Show => {}
        SettingsCommand::Set { temp, wind, clock } => {
            dash.update_settings(|s| {
                if let Some(unit) = temp {
                    s.temperature_unit = unit;
                }
                if let Some(unit) = wind {
                    s.wind_speed_unit = unit;
                }
                if let Some(format) = clock {
                    s.clock = format;
                }
            })?;
        }
        SettingsCommand::Reset => dash.reset_settings()?,
    }

    print!("{}", render::settings(dash.settings()));
    Ok(())
}
