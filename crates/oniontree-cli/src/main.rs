//! oniontree - command-line tools for oniontree repositories

mod commands;
mod config;

use clap::{ArgAction, Parser};
use commands::{Command, Context};
use config::{CliConfig, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oniontree", version)]
#[command(about = "Manage a repository of onion service records")]
struct Cli {
    /// Run as if started in DIR
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Configuration file
    #[arg(long, global = true, env = "ONIONTREE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("oniontree: {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    init_logging(cli.verbose, &config.logging);

    let ctx = Context {
        start: cli.dir,
        config,
    };
    match commands::run(cli.command, &ctx) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("oniontree: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins; otherwise `-v` picks the level; otherwise the config
/// file's filter applies.
fn init_logging(verbose: u8, logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::try_new(&logging.filter)
            .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["oniontree", "list", "-C", "/srv/tree", "-vv"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("/srv/tree"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn test_comma_lists() {
        let cli = Cli::try_parse_from(["oniontree", "tag", "--id", "alice", "--tags", "a,b"])
            .unwrap();
        match cli.command {
            Command::Tag(args) => assert_eq!(args.tags, vec!["a", "b"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_tags_conflicting_arguments() {
        let result = Cli::try_parse_from(["oniontree", "tags", "people", "--service", "alice"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_repeated_urls() {
        let cli = Cli::try_parse_from([
            "oniontree",
            "add",
            "--id",
            "alice",
            "--url",
            "http://a.onion",
            "--url",
            "http://b.onion",
        ])
        .unwrap();
        match cli.command {
            Command::Add(args) => assert_eq!(args.urls.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
