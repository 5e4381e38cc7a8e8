//! Predictor configuration.
//!
//! Every value has a default matching the deployed assistant, so an empty
//! TOML file (or no file at all) is a complete configuration. A config file
//! only needs the keys it overrides:
//!
//! ```toml
//! [model]
//! model_id = "microsoft/Phi-4-multimodal-instruct"
//!
//! [generation]
//! do_sample = false
//! ```

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

use crate::{Error, Result};

pub const DEFAULT_MODEL_ID: &str = "microsoft/Phi-4-multimodal-instruct";
pub const DEFAULT_ASSISTANT_MARKER: &str = "<|assistant|>";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful shopping assistant. Output JSON: {'message': '...', 'action': 'search'|'collection'|'none', 'query'?..., 'handle'?...}";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictorConfig {
    pub model: ModelConfig,
    pub quantization: QuantizationConfig,
    pub generation: GenerationParams,
    pub prompt: PromptConfig,
}

/// Where the model comes from and which device it runs on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Hugging Face model ID or local path.
    pub model_id: String,
    pub hf_revision: Option<String>,
    /// Source of the Hugging Face token: `cache`, `literal:<token>`,
    /// `env:<var>`, `path:<file>` or `none`.
    pub token_source: Option<String>,
    /// Literal Jinja chat template or path to one.
    pub chat_template: Option<String>,
    /// Force the CPU even when an accelerator is available.
    pub cpu: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            hf_revision: None,
            token_source: None,
            chat_template: None,
            cpu: false,
        }
    }
}

/// In-situ quantization scheme applied to the weights while loading.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantScheme {
    /// 4-bit k-quant; block scales are quantized as well.
    Q4k,
    /// 4-bit, one f16 scale per block.
    #[serde(rename = "q4_0")]
    Q4_0,
    /// 4-bit half-quadratic quantization.
    Hqq4,
    /// 8-bit, one f16 scale per block.
    #[serde(rename = "q8_0")]
    Q8_0,
}

impl QuantScheme {
    pub fn bits(self) -> u8 {
        match self {
            Self::Q4k | Self::Q4_0 | Self::Hqq4 => 4,
            Self::Q8_0 => 8,
        }
    }

    /// Whether the per-block scales are themselves quantized.
    pub fn quantizes_scales(self) -> bool {
        matches!(self, Self::Q4k)
    }
}

impl fmt::Display for QuantScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Q4k => "q4k",
            Self::Q4_0 => "q4_0",
            Self::Hqq4 => "hqq4",
            Self::Q8_0 => "q8_0",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDType {
    Bf16,
    F16,
    F32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuantizationConfig {
    /// Load full-precision weights when false.
    pub enabled: bool,
    pub bits: u8,
    pub scheme: QuantScheme,
    pub double_quant: bool,
    pub compute_dtype: ComputeDType,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bits: 4,
            scheme: QuantScheme::Q4k,
            double_quant: true,
            compute_dtype: ComputeDType::Bf16,
        }
    }
}

impl QuantizationConfig {
    /// The scheme to apply, or `None` when quantization is disabled.
    pub fn active_scheme(&self) -> Option<QuantScheme> {
        self.enabled.then_some(self.scheme)
    }
}

/// Sampling and batching parameters for a single generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    /// Greedy decoding when false.
    pub do_sample: bool,
    pub top_k: usize,
    pub top_p: f64,
    pub temperature: Option<f64>,
    pub num_return_sequences: usize,
    pub batch_size: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            do_sample: true,
            top_k: 50,
            top_p: 0.95,
            temperature: None,
            num_return_sequences: 1,
            batch_size: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptConfig {
    pub system_prompt: String,
    /// Delimiter preceding the model's own reply in generated text.
    pub assistant_marker: String,
    /// Rate the audio is resampled to before it reaches the model.
    pub sample_rate: u32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            assistant_marker: DEFAULT_ASSISTANT_MARKER.to_string(),
            sample_rate: shopvox_audio::TARGET_SAMPLE_RATE,
        }
    }
}

impl PredictorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            != Some(true)
        {
            return Err(Error::Config(format!(
                "config files must be .toml, got {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let quant = &self.quantization;
        if quant.enabled {
            if quant.bits != quant.scheme.bits() {
                return Err(Error::Config(format!(
                    "quantization.bits = {} does not match scheme `{}` ({} bits)",
                    quant.bits,
                    quant.scheme,
                    quant.scheme.bits()
                )));
            }
            if quant.double_quant && !quant.scheme.quantizes_scales() {
                return Err(Error::Config(format!(
                    "scheme `{}` does not quantize its block scales, set double_quant = false",
                    quant.scheme
                )));
            }
        }

        let generation = &self.generation;
        if generation.max_new_tokens == 0 {
            return Err(Error::Config("generation.max_new_tokens must be > 0".into()));
        }
        if generation.top_k == 0 {
            return Err(Error::Config("generation.top_k must be > 0".into()));
        }
        if !(generation.top_p > 0.0 && generation.top_p <= 1.0) {
            return Err(Error::Config(format!(
                "generation.top_p must be in (0, 1], got {}",
                generation.top_p
            )));
        }
        if let Some(temperature) = generation.temperature {
            if temperature.is_nan() || temperature < 0.0 {
                return Err(Error::Config(format!(
                    "generation.temperature must be >= 0, got {temperature}"
                )));
            }
        }
        if generation.num_return_sequences != 1 {
            return Err(Error::Config(
                "generation.num_return_sequences must be 1".into(),
            ));
        }
        if generation.batch_size != 1 {
            return Err(Error::Config("generation.batch_size must be 1".into()));
        }

        if self.prompt.assistant_marker.is_empty() {
            return Err(Error::Config("prompt.assistant_marker must not be empty".into()));
        }
        if self.prompt.sample_rate == 0 {
            return Err(Error::Config("prompt.sample_rate must be > 0".into()));
        }
        if self.model.model_id.trim().is_empty() {
            return Err(Error::Config("model.model_id must not be empty".into()));
        }
        Ok(())
    }
}
