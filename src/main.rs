use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listenbrainz_scrobbler::config::Config;
use listenbrainz_scrobbler::event_source::EventBridge;
use listenbrainz_scrobbler::service::Service;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(version, about = "Submit listens from a media player to ListenBrainz")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read player events as JSON lines from stdin and submit listens (default)
    Run,
    /// Validate the configuration and print the submission endpoint
    Check,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if !atty::is(atty::Stream::Stderr) {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    builder.init();
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Config::config_path(),
    }
}

fn run(config: &Config) -> Result<()> {
    let bridge = Arc::new(EventBridge::new());
    let service = Service::start(config, bridge.clone())?;

    log::info!("Reading player events from stdin");
    let result = bridge.run(io::stdin().lock());

    service.close();
    result
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => {
            let config = Config::load(cli.config.as_deref())?;
            run(&config)
        }
        Command::Check => {
            let config = Config::load(cli.config.as_deref())?;
            println!(
                "{}: submitting to {}",
                config.listenbrainz.name,
                config.listenbrainz.submit_url()
            );
            Ok(())
        }
        Command::Init { force } => {
            let path = config_path(&cli)?;
            if path.exists() && !force {
                anyhow::bail!("{:?} already exists, use --force to overwrite", path);
            }
            Config::default()
                .save_to(&path)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Wrote default configuration to {:?}", path);
            println!("Set listenbrainz.token, see https://listenbrainz.org/profile/");
            Ok(())
        }
    }
}
