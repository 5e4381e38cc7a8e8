//! Print the effective configuration.

use anyhow::Result;
use shopvox_core::PredictorConfig;

pub fn run_config(config: &PredictorConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
