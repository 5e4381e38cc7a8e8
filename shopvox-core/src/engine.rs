//! [`InferencePipeline`] backed by the mistral.rs SDK.

use anyhow::Context;
use async_trait::async_trait;
use mistralrs::{
    AudioInput, IsqType, Model, ModelDType, RequestBuilder, TextMessageRole, TokenSource,
    VisionMessages, VisionModelBuilder,
};
use shopvox_audio::AudioClip;
use tracing::{debug, info};

use crate::{
    config::{ComputeDType, GenerationParams, ModelConfig, QuantScheme, QuantizationConfig},
    conversation::{Conversation, Role},
    pipeline::InferencePipeline,
};

impl From<QuantScheme> for IsqType {
    fn from(scheme: QuantScheme) -> Self {
        match scheme {
            QuantScheme::Q4k => IsqType::Q4K,
            QuantScheme::Q4_0 => IsqType::Q4_0,
            QuantScheme::Hqq4 => IsqType::HQQ4,
            QuantScheme::Q8_0 => IsqType::Q8_0,
        }
    }
}

impl From<ComputeDType> for ModelDType {
    fn from(dtype: ComputeDType) -> Self {
        match dtype {
            ComputeDType::Bf16 => ModelDType::BF16,
            ComputeDType::F16 => ModelDType::F16,
            ComputeDType::F32 => ModelDType::F32,
        }
    }
}

impl From<Role> for TextMessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => TextMessageRole::System,
            Role::User => TextMessageRole::User,
        }
    }
}

/// A multimodal model loaded in-process, quantized while loading.
pub struct MistralRsPipeline {
    model: Model,
    model_id: String,
}

impl MistralRsPipeline {
    /// Download (or read from the cache) and load the model and its tokenizer.
    pub async fn load(
        model: &ModelConfig,
        quantization: &QuantizationConfig,
    ) -> anyhow::Result<Self> {
        let mut builder = VisionModelBuilder::new(&model.model_id)
            .with_dtype(quantization.compute_dtype.into())
            // Requests are served one at a time.
            .with_max_num_seqs(1);

        if let Some(scheme) = quantization.active_scheme() {
            info!(
                "Quantizing `{}` in situ with {scheme} ({} bits), compute dtype {:?}",
                model.model_id,
                scheme.bits(),
                quantization.compute_dtype
            );
            builder = builder.with_isq(scheme.into());
        }
        if let Some(revision) = &model.hf_revision {
            builder = builder.with_hf_revision(revision);
        }
        if let Some(token_source) = &model.token_source {
            let token_source: TokenSource = token_source
                .parse()
                .map_err(|e: String| anyhow::anyhow!("invalid token_source: {e}"))?;
            builder = builder.with_token_source(token_source);
        }
        if let Some(template) = &model.chat_template {
            builder = builder.with_chat_template(template);
        }
        if model.cpu {
            builder = builder.with_force_cpu();
        }

        let loaded = builder
            .build()
            .await
            .with_context(|| format!("failed to load `{}`", model.model_id))?;

        Ok(Self {
            model: loaded,
            model_id: model.model_id.clone(),
        })
    }

    fn build_request(
        conversation: &Conversation,
        audio: AudioClip,
        params: &GenerationParams,
    ) -> RequestBuilder {
        let audio_turn = conversation.audio_turn();
        let mut audio = Some(AudioInput {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
        });

        let mut messages = VisionMessages::new();
        for (idx, turn) in conversation.turns().iter().enumerate() {
            let role = TextMessageRole::from(turn.role);
            let clip = if Some(idx) == audio_turn {
                audio.take()
            } else {
                None
            };
            messages = match clip {
                Some(clip) => {
                    messages.add_multimodal_message(role, &turn.content, vec![], vec![clip])
                }
                None => messages.add_message(role, &turn.content),
            };
        }

        let mut request = RequestBuilder::from(messages);
        request = if params.do_sample {
            let request = request
                .set_sampler_topk(params.top_k)
                .set_sampler_topp(params.top_p);
            match params.temperature {
                Some(temperature) => request.set_sampler_temperature(temperature),
                None => request,
            }
        } else {
            request.set_deterministic_sampler()
        };
        request
            .set_sampler_max_len(params.max_new_tokens)
            .set_sampler_n_choices(params.num_return_sequences)
    }
}

#[async_trait]
impl InferencePipeline for MistralRsPipeline {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        conversation: &Conversation,
        audio: AudioClip,
        params: &GenerationParams,
    ) -> anyhow::Result<String> {
        let request = Self::build_request(conversation, audio, params);
        let response = self.model.send_chat_request(request).await?;
        debug!(
            "Generated {} completion tokens ({:.1} tok/s)",
            response.usage.completion_tokens, response.usage.avg_compl_tok_per_sec
        );

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("model returned no content")
    }
}
