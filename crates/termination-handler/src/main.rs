mod core;
mod domain;
mod infra;

use std::{io::ErrorKind, time::Duration};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::core::App;
use crate::infra::{Config, Settings};

/// Watches instance metadata for spot termination notices and prepares the
/// instance for shutdown before it is reclaimed.
#[derive(Debug, Parser)]
#[command(name = "termination-handler", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the termination handler
    Start(StartArgs),
    /// Query the termination notice once and print the result
    Check(EndpointArgs),
}

#[derive(Debug, Args)]
struct StartArgs {
    /// Interval at which the handler should check for termination notices [default: 5s]
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    #[command(flatten)]
    endpoint: EndpointArgs,
}

#[derive(Debug, Args)]
struct EndpointArgs {
    /// Instance metadata endpoint [default: http://169.254.169.254/latest]
    #[arg(long, value_name = "URL")]
    metadata_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    load_config()?;
    let config = Config::new();

    match cli.command {
        Command::Start(args) => {
            let settings = Settings::resolve(&config, args.interval, args.endpoint.metadata_url)?;
            App::new(&settings)?.run().await
        }
        Command::Check(args) => {
            let settings = Settings::resolve(&config, None, args.metadata_url)?;
            let terminating = App::new(&settings)?.check().await;
            println!(
                "{}",
                if terminating {
                    "terminating"
                } else {
                    "not terminating"
                }
            );
            Ok(())
        }
    }
}

fn load_config() -> anyhow::Result<()> {
    tolerate_missing(dotenv::dotenv())
}

/// A missing .env file is fine; an unreadable or malformed one is not.
fn tolerate_missing<T>(result: Result<T, dotenv::Error>) -> anyhow::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("failed to load .env file"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use clap::CommandFactory;

    fn env_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "termination-handler-{}-{}.env",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_start_parses_interval() {
        let cli = Cli::try_parse_from(["termination-handler", "start", "--interval", "30s"]).unwrap();
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.interval, Some(Duration::from_secs(30)));
        assert_eq!(args.endpoint.metadata_url, None);
    }

    #[test]
    fn test_start_without_flags_defers_to_config() {
        let cli = Cli::try_parse_from(["termination-handler", "start"]).unwrap();
        let Command::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.interval, None);
    }

    #[test]
    fn test_check_accepts_metadata_url() {
        let cli = Cli::try_parse_from([
            "termination-handler",
            "check",
            "--metadata-url",
            "http://127.0.0.1:1338/latest",
        ])
        .unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(
            args.metadata_url.as_deref(),
            Some("http://127.0.0.1:1338/latest")
        );
    }

    #[test]
    fn test_check_has_no_interval() {
        let result = Cli::try_parse_from(["termination-handler", "check", "--interval", "5s"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_start_rejects_bad_interval() {
        let result = Cli::try_parse_from(["termination-handler", "start", "--interval", "often"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["termination-handler"]).is_err());
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let path = std::env::temp_dir().join("termination-handler-does-not-exist.env");

        assert!(tolerate_missing(dotenv::from_path(&path)).is_ok());
    }

    #[test]
    fn test_malformed_env_file_is_an_error() {
        let path = env_file("malformed", "TERMINATION_HANDLER_TEST_BROKEN LINE\n");

        let result = tolerate_missing(dotenv::from_path(&path));
        std::fs::remove_file(&path).unwrap();

        let err = result.unwrap_err();
        assert!(err.to_string().contains(".env"));
    }

    #[test]
    fn test_valid_env_file_is_loaded() {
        let path = env_file("valid", "TERMINATION_HANDLER_TEST_LOADED=yes\n");

        let result = tolerate_missing(dotenv::from_path(&path));
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_ok());
        assert_eq!(
            std::env::var("TERMINATION_HANDLER_TEST_LOADED").as_deref(),
            Ok("yes")
        );
    }
}
