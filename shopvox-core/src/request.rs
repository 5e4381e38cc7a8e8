use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::Result;

/// One call to the predictor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// What the user typed alongside the recording.
    pub command: String,
    /// Base64-encoded audio file (any format symphonia can decode).
    pub audio: String,
    /// Shop the request originates from. Reserved, currently unused.
    #[serde(default)]
    pub shop_domain: String,
}

impl PredictRequest {
    pub fn new(command: impl ToString, audio: impl ToString) -> Self {
        Self {
            command: command.to_string(),
            audio: audio.to_string(),
            shop_domain: String::new(),
        }
    }

    pub fn with_shop_domain(mut self, shop_domain: impl ToString) -> Self {
        self.shop_domain = shop_domain.to_string();
        self
    }

    /// Audio bytes carried by the request.
    pub fn audio_bytes(&self) -> Result<Vec<u8>> {
        decode_audio_payload(&self.audio)
    }
}

/// Decode a base64 audio payload. ASCII whitespace (line wrapping) is ignored
/// and a `data:<mime>;base64,` prefix is accepted.
pub fn decode_audio_payload(payload: &str) -> Result<Vec<u8>> {
    let body = strip_data_url(payload.trim());
    let compact: Vec<u8> = body
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

fn strip_data_url(payload: &str) -> &str {
    payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .filter(|(header, _)| header.ends_with(";base64"))
        .map_or(payload, |(_, data)| data)
}
