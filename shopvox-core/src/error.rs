//! Error types for shopvox.

use thiserror::Error;

/// Error type for the shopvox predictor.
///
/// Setup-time variants ([`Config`](Self::Config), [`ModelLoad`](Self::ModelLoad))
/// are fatal and abort startup. Everything raised while serving a request is
/// folded into an error envelope by [`Predictor::predict`](crate::Predictor::predict)
/// instead of being returned to the caller.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The configuration is malformed or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The model or tokenizer could not be loaded.
    #[error("model loading failed: {0:#}")]
    ModelLoad(anyhow::Error),

    /// The audio payload is not valid base64.
    #[error("{0}")]
    Base64(#[from] base64::DecodeError),

    /// The audio bytes could not be decoded or resampled.
    #[error("failed to decode audio: {0:#}")]
    Audio(anyhow::Error),

    /// The inference pipeline failed while generating.
    #[error("{0:#}")]
    Inference(anyhow::Error),

    /// The request itself could not be understood.
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error can only occur while setting the predictor up.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ModelLoad(_) | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use base64::Engine;

    #[test]
    fn base64_error_is_displayed_verbatim() {
        let err = base64::engine::general_purpose::STANDARD
            .decode("not-base64!!")
            .unwrap_err();
        let expected = err.to_string();
        assert_eq!(Error::from(err).to_string(), expected);
    }

    #[test]
    fn inference_error_shows_the_whole_chain() {
        let err = anyhow::anyhow!("device lost").context("generation failed");
        assert_eq!(
            Error::Inference(err).to_string(),
            "generation failed: device lost"
        );
    }

    #[test]
    fn fatal_classification() {
        assert!(Error::Config("bad".into()).is_fatal());
        assert!(!Error::Audio(anyhow::anyhow!("bad")).is_fatal());
    }
}
