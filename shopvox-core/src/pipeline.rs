use async_trait::async_trait;
use shopvox_audio::AudioClip;

use crate::{config::GenerationParams, conversation::Conversation};

/// A loaded audio+text model that can continue a conversation.
///
/// Implementations are loaded once and shared read-only by every request.
#[async_trait]
pub trait InferencePipeline: Send + Sync {
    fn model_id(&self) -> &str;

    /// Generate the assistant's reply. `audio` is mono at the configured
    /// sample rate and belongs to the conversation's last user turn.
    async fn generate(
        &self,
        conversation: &Conversation,
        audio: AudioClip,
        params: &GenerationParams,
    ) -> anyhow::Result<String>;
}
