//! > **shopvox core**
//!
//! A voice shopping assistant around a pretrained audio+text model. The model
//! is loaded once ([`Predictor::setup`]); each request decodes a base64 audio
//! clip, asks the model to answer the user's command and turns the answer into
//! a JSON envelope:
//!
//! ```json
//! {"message": "Here are some jackets", "action": "search", "query": "red jacket", "handle": null}
//! ```
//!
//! Any failure while answering becomes `{"message": "Error: ..."}`.
//!
//! ### Example
//! ```no_run
//! use shopvox_core::{PredictRequest, Predictor, PredictorConfig};
//!
//! # async fn run() -> shopvox_core::Result<()> {
//! let predictor = Predictor::setup(PredictorConfig::default()).await?;
//! let audio = std::fs::read_to_string("clip.b64").unwrap();
//! let response = predictor
//!     .predict(&PredictRequest::new("find me a red jacket", audio))
//!     .await;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
#[cfg(feature = "mistralrs")]
mod engine;
mod error;
mod logging;
mod pipeline;
mod predictor;
pub mod reply;
mod request;
pub mod wire;

pub use config::{GenerationParams, PredictorConfig};
pub use conversation::{Conversation, Role, Turn};
#[cfg(feature = "mistralrs")]
pub use engine::MistralRsPipeline;
pub use error::{Error, Result};
pub use logging::initialize_logging;
pub use pipeline::InferencePipeline;
pub use predictor::Predictor;
pub use reply::{Action, PredictOutcome, ShopReply};
pub use request::{decode_audio_payload, PredictRequest};
pub use shopvox_audio::AudioClip;
