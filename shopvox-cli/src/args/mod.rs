//! CLI argument definitions for shopvox

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use shopvox_core::PredictorConfig;

/// Voice shopping assistant
#[derive(Parser)]
#[command(name = "shopvox")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub global: GlobalOptions,
}

#[derive(Subcommand)]
pub enum Command {
    /// Answer a single spoken command and print the JSON response
    #[command(group(ArgGroup::new("audio_source").required(true).args(["audio", "audio_file"])))]
    Predict {
        /// The user's command as text
        #[arg(short, long)]
        command: String,

        /// Base64-encoded audio clip
        #[arg(short, long)]
        audio: Option<String>,

        /// Audio file to encode and send (wav, mp3, m4a, ...)
        #[arg(long)]
        audio_file: Option<PathBuf>,

        /// Shop domain the request comes from
        #[arg(long, default_value = "")]
        shop_domain: String,
    },

    /// Load the model once, then answer one JSON request per stdin line
    Stdio,

    /// Print the effective configuration as TOML without loading the model
    Config,
}

/// Global options that apply to all commands
#[derive(clap::Args, Clone, Default)]
pub struct GlobalOptions {
    /// Configuration file (.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// HuggingFace model ID or local path to model directory
    #[arg(short = 'm', long, global = true)]
    pub model_id: Option<String>,

    /// Run on the CPU even when an accelerator is available
    #[arg(long, global = true)]
    pub cpu: bool,

    /// Use greedy decoding instead of top-k/top-p sampling
    #[arg(long, global = true)]
    pub deterministic: bool,
}

impl GlobalOptions {
    /// Read the configuration file, if any, and apply the command line overrides.
    pub fn load_config(&self) -> shopvox_core::Result<PredictorConfig> {
        let config = match &self.config {
            Some(path) => PredictorConfig::from_file(path)?,
            None => PredictorConfig::default(),
        };
        let config = self.apply(config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, mut config: PredictorConfig) -> PredictorConfig {
        if let Some(model_id) = &self.model_id {
            config.model.model_id = model_id.clone();
        }
        if self.cpu {
            config.model.cpu = true;
        }
        if self.deterministic {
            config.generation.do_sample = false;
        }
        config
    }
}
