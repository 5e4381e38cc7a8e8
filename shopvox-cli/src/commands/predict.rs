//! Answer a single request from the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use shopvox_core::{PredictRequest, Predictor, PredictorConfig};
use tracing::info;

pub async fn run_predict(
    config: PredictorConfig,
    command: String,
    audio: Option<String>,
    audio_file: Option<PathBuf>,
    shop_domain: String,
) -> Result<()> {
    let audio = match (audio, audio_file) {
        (Some(audio), _) => audio,
        (None, Some(path)) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read `{}`", path.display()))?;
            info!("Read {} bytes of audio from `{}`", bytes.len(), path.display());
            STANDARD.encode(bytes)
        }
        (None, None) => anyhow::bail!("either --audio or --audio-file is required"),
    };

    let predictor = Predictor::setup(config).await?;
    let request = PredictRequest::new(command, audio).with_shop_domain(shop_domain);
    println!("{}", predictor.predict(&request).await);
    Ok(())
}
