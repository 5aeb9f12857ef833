use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text, validator::Validation};
use weather_core::{ApiKey, Config, DecodePolicy, WeatherClient, ZipCode};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a U.S. ZIP code")]
pub struct Cli {
    /// Log each pipeline stage to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key, default ZIP code and decoding policy.
    Configure,

    /// Show current weather for a ZIP code.
    Show {
        /// Five-digit U.S. ZIP code; defaults to the configured one.
        zip: Option<ZipCode>,

        /// Print the observation as JSON.
        #[arg(long)]
        json: bool,

        /// Fail on missing or mistyped fields instead of defaulting them.
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { zip, json, strict } => show(zip, json, strict).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(|input: &str| {
            Ok(match ApiKey::new(input) {
                Ok(_) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()?;
    config.set_api_key(api_key);

    let current_zip = config.zip_code.and_then(|z| ZipCode::new(z).ok()).map(|z| z.to_string());
    let mut zip_prompt = Text::new("Default ZIP code:").with_validator(|input: &str| {
        Ok(match input.parse::<ZipCode>() {
            Ok(_) => Validation::Valid,
            Err(e) => Validation::Invalid(e.to_string().into()),
        })
    });
    if let Some(current) = current_zip.as_deref() {
        zip_prompt = zip_prompt.with_default(current);
    }
    let zip: ZipCode = zip_prompt.prompt()?.parse()?;
    config.set_zip_code(zip.value());

    let policies = vec![DecodePolicy::Lenient, DecodePolicy::Strict];
    let start = policies.iter().position(|p| *p == config.decoding.policy).unwrap_or_default();
    config.decoding.policy = Select::new("Decoding policy:", policies)
        .with_starting_cursor(start)
        .prompt()?;

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(zip: Option<ZipCode>, json: bool, strict: bool) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if strict {
        config.decoding.policy = DecodePolicy::Strict;
    }

    let zip = match zip {
        Some(zip) => zip,
        None => ZipCode::new(config.zip_code()?)?,
    };
    let api_key = config.api_key()?;

    let client = WeatherClient::from_config(&config)?;
    let snapshot = client.current(zip.value(), api_key).await;

    let observation = snapshot
        .into_result()
        .with_context(|| format!("Could not get current weather for ZIP {zip}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&observation)?);
    } else {
        print!("{}", output::render(zip, &observation));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_parses_zip_and_flags() {
        let cli = Cli::try_parse_from(["weather", "-v", "show", "02134", "--json", "--strict"])
            .expect("valid arguments");

        assert!(cli.verbose);
        match cli.command {
            Command::Show { zip, json, strict } => {
                assert_eq!(zip.map(|z| z.to_string()).as_deref(), Some("02134"));
                assert!(json);
                assert!(strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_zip_is_optional() {
        let cli = Cli::try_parse_from(["weather", "show"]).expect("valid arguments");
        assert!(matches!(cli.command, Command::Show { zip: None, json: false, strict: false }));
    }

    #[test]
    fn show_rejects_bad_zip() {
        assert!(Cli::try_parse_from(["weather", "show", "9512a"]).is_err());
        assert!(Cli::try_parse_from(["weather", "show", "123456"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
