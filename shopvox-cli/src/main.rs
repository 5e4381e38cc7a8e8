use anyhow::Result;
use clap::Parser;

mod args;
mod commands;

use args::{Cli, Command};
use commands::{run_config, run_predict, run_stdio};

#[tokio::main]
async fn main() -> Result<()> {
    shopvox_core::initialize_logging();

    let cli = Cli::parse();
    let config = cli.global.load_config()?;

    match cli.command {
        Command::Predict {
            command,
            audio,
            audio_file,
            shop_domain,
        } => run_predict(config, command, audio, audio_file, shop_domain).await,
        Command::Stdio => run_stdio(config).await,
        Command::Config => run_config(&config),
    }
}
