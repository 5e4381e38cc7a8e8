use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
        }
    }
}

/// One message in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Ordered turns handed to the model. The request audio belongs to the last
/// user turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The system persona followed by the user's command.
    pub fn shopping(system_prompt: impl ToString, command: impl ToString) -> Self {
        Self::new()
            .add_turn(Role::System, system_prompt)
            .add_turn(Role::User, command)
    }

    pub fn add_turn(mut self, role: Role, content: impl ToString) -> Self {
        self.turns.push(Turn {
            role,
            content: content.to_string(),
        });
        self
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Index of the turn the audio is attached to.
    pub fn audio_turn(&self) -> Option<usize> {
        self.turns.iter().rposition(|turn| turn.role == Role::User)
    }
}
