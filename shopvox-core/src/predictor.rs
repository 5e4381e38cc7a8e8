use std::{sync::Arc, time::Instant};

use shopvox_audio::AudioClip;
use tracing::{debug, trace, warn};

use crate::{
    config::PredictorConfig,
    conversation::Conversation,
    pipeline::InferencePipeline,
    reply::{extract_assistant_segment, PredictOutcome, ShopReply},
    request::PredictRequest,
    Error, Result,
};

/// The voice shopping assistant: a loaded model plus the fixed prompt and
/// generation settings. Cheap to clone; clones share the model.
#[derive(Clone)]
pub struct Predictor {
    pipeline: Arc<dyn InferencePipeline>,
    config: Arc<PredictorConfig>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model_id", &self.pipeline.model_id())
            .field("config", &self.config)
            .finish()
    }
}

impl Predictor {
    /// Wrap an already loaded pipeline.
    pub fn new(pipeline: Arc<dyn InferencePipeline>, config: PredictorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pipeline,
            config: Arc::new(config),
        })
    }

    /// Load the configured model once for the lifetime of the process.
    /// Any failure here is fatal.
    #[cfg(feature = "mistralrs")]
    pub async fn setup(config: PredictorConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("Loading model `{}`", config.model.model_id);
        let start = Instant::now();
        let pipeline =
            crate::engine::MistralRsPipeline::load(&config.model, &config.quantization)
                .await
                .map_err(Error::ModelLoad)?;
        tracing::info!(
            "Model `{}` ready in {:.2}s",
            config.model.model_id,
            start.elapsed().as_secs_f32()
        );
        Self::new(Arc::new(pipeline), config)
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn model_id(&self) -> &str {
        self.pipeline.model_id()
    }

    /// Answer a request. Always returns a JSON document with a `message`;
    /// failures are reported as `{"message": "Error: ..."}`.
    pub async fn predict(&self, request: &PredictRequest) -> String {
        self.predict_outcome(request).await.to_wire()
    }

    /// Answer a request given as a JSON document. A document that is not a
    /// valid request gets an error envelope like any other failure.
    pub async fn predict_json(&self, document: &str) -> String {
        match serde_json::from_str::<PredictRequest>(document) {
            Ok(request) => self.predict(&request).await,
            Err(e) => {
                let err = Error::from(e);
                warn!("Rejected request: {err}");
                PredictOutcome::failure(err).to_wire()
            }
        }
    }

    pub async fn predict_outcome(&self, request: &PredictRequest) -> PredictOutcome {
        let start = Instant::now();
        match self.try_predict(request).await {
            Ok(reply) => {
                debug!(
                    "Answered with action `{}` in {:.2}s",
                    reply.action,
                    start.elapsed().as_secs_f32()
                );
                reply.into()
            }
            Err(e) => {
                warn!("Prediction failed: {e}");
                PredictOutcome::failure(e)
            }
        }
    }

    /// The prediction steps without the error envelope.
    pub async fn try_predict(&self, request: &PredictRequest) -> Result<ShopReply> {
        if !request.shop_domain.is_empty() {
            trace!("Ignoring shop domain `{}`", request.shop_domain);
        }

        let bytes = request.audio_bytes()?;
        let clip = AudioClip::from_bytes(&bytes)
            .and_then(|clip| clip.resample(self.config.prompt.sample_rate))
            .map_err(Error::Audio)?;
        debug!(
            "Decoded {:.2}s of audio at {} Hz",
            clip.duration_secs(),
            clip.sample_rate
        );

        let conversation =
            Conversation::shopping(&self.config.prompt.system_prompt, &request.command);
        let generated = self
            .pipeline
            .generate(&conversation, clip, &self.config.generation)
            .await
            .map_err(Error::Inference)?;
        trace!("Raw model output: {generated:?}");

        let segment = extract_assistant_segment(&generated, &self.config.prompt.assistant_marker);
        Ok(ShopReply::parse(segment))
    }
}
