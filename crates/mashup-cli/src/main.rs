mod args;
mod commands;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands, CreateArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "mashup=info,mashup_core=info,mashup_deliver=info",
        1 => "mashup=debug,mashup_core=debug,mashup_deliver=debug",
        2 => "mashup=trace,mashup_core=trace,mashup_deliver=trace",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Some(Commands::Serve { bind }) => {
            commands::serve::run(bind, cli.config.as_deref()).await
        }
        Some(Commands::Doctor) => commands::doctor::run(cli.config.as_deref()).await,
        Some(Commands::Config) => commands::config::run(cli.config.as_deref()).await,
        None => match (cli.singer, cli.videos, cli.duration, cli.output) {
            (Some(singer), Some(videos), Some(duration), Some(output)) => {
                let args = CreateArgs {
                    singer,
                    videos,
                    duration,
                    output,
                    overfetch: cli.overfetch,
                };
                commands::create::run(&args, cli.config.as_deref()).await
            }
            _ => {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
                bail!("Incorrect number of parameters.\n{}", args::USAGE)
            }
        },
    }
}
