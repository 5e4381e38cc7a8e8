//! Turning raw model output into the response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use tracing::error;

use crate::wire::to_wire_string;

/// Returned when even the error envelope cannot be encoded.
pub const ENCODING_FAILURE: &str = r#"{"message": "Error: failed to encode response"}"#;

/// What the client should do with the reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Run a product search with `query`.
    Search,
    /// Open the collection identified by `handle`.
    Collection,
    #[default]
    None,
}

impl Action {
    /// Parse an action name as the model spells it. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        [Self::Search, Self::Collection, Self::None]
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Collection => "collection",
            Self::None => "none",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful assistant reply. `query` and `handle` serialize as `null`
/// when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopReply {
    pub message: String,
    pub action: Action,
    pub query: Option<String>,
    pub handle: Option<String>,
}

impl ShopReply {
    /// A reply that only carries text.
    pub fn plain(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            action: Action::None,
            query: None,
            handle: None,
        }
    }

    /// Interpret the assistant's segment. A JSON object contributes its
    /// fields; anything else becomes the message verbatim. JSON that is not
    /// an object (`[1, 2]`, `"x"`, `42`) is a plain message too, never an
    /// error envelope.
    pub fn parse(segment: &str) -> Self {
        match serde_json::from_str::<Value>(segment) {
            Ok(Value::Object(fields)) => Self::from_fields(segment, &fields),
            _ => Self::plain(segment),
        }
    }

    fn from_fields(segment: &str, fields: &Map<String, Value>) -> Self {
        let message = match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            None | Some(Value::Null) => segment.to_string(),
            Some(other) => other.to_string(),
        };
        let action = fields
            .get("action")
            .and_then(Value::as_str)
            .and_then(Action::from_name)
            .unwrap_or_default();
        let text_field = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            message,
            action,
            query: text_field("query"),
            handle: text_field("handle"),
        }
    }
}

/// The content after the last `marker`, or all of `text` when the marker is
/// absent, with surrounding whitespace removed.
pub fn extract_assistant_segment<'a>(text: &'a str, marker: &str) -> &'a str {
    let tail = match text.rfind(marker) {
        Some(idx) if !marker.is_empty() => &text[idx + marker.len()..],
        _ => text,
    };
    tail.trim()
}

/// Result of one prediction, encoded the same way whichever way it went.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PredictOutcome {
    Success(ShopReply),
    Failure { message: String },
}

impl PredictOutcome {
    pub fn failure(err: impl Display) -> Self {
        Self::Failure {
            message: format!("Error: {err}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success(reply) => &reply.message,
            Self::Failure { message } => message,
        }
    }

    /// Encode for the caller. Never fails.
    pub fn to_wire(&self) -> String {
        match to_wire_string(self) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode response: {e}");
                ENCODING_FAILURE.to_string()
            }
        }
    }
}

impl From<ShopReply> for PredictOutcome {
    fn from(reply: ShopReply) -> Self {
        Self::Success(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "<|assistant|>";

    #[test]
    fn segment_after_last_marker() {
        let text = "<|user|>hi<|end|><|assistant|>first<|assistant|>  second \n";
        assert_eq!(extract_assistant_segment(text, MARKER), "second");
    }

    #[test]
    fn segment_without_marker_is_whole_text() {
        assert_eq!(extract_assistant_segment("  just text ", MARKER), "just text");
        assert_eq!(extract_assistant_segment("", MARKER), "");
        assert_eq!(extract_assistant_segment("a<|assistant|>", MARKER), "");
    }

    #[test]
    fn full_json_reply() {
        let reply = ShopReply::parse(
            r#"{"message": "Here is the winter collection", "action": "collection", "handle": "winter"}"#,
        );
        assert_eq!(reply.message, "Here is the winter collection");
        assert_eq!(reply.action, Action::Collection);
        assert_eq!(reply.query, None);
        assert_eq!(reply.handle.as_deref(), Some("winter"));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let segment = r#"{"query": "socks"}"#;
        let reply = ShopReply::parse(segment);
        assert_eq!(reply.message, segment);
        assert_eq!(reply.action, Action::None);
        assert_eq!(reply.query.as_deref(), Some("socks"));
        assert_eq!(reply.handle, None);
    }

    #[test]
    fn unknown_action_falls_back_to_none() {
        let reply = ShopReply::parse(r#"{"message": "ok", "action": "checkout"}"#);
        assert_eq!(reply.action, Action::None);
        let reply = ShopReply::parse(r#"{"message": "ok", "action": " Search "}"#);
        assert_eq!(reply.action, Action::Search);
    }

    #[test]
    fn odd_field_types() {
        let reply = ShopReply::parse(r#"{"message": 42, "query": 7, "handle": null}"#);
        assert_eq!(reply.message, "42");
        assert_eq!(reply.query, None);
        assert_eq!(reply.handle, None);
    }

    #[test]
    fn non_json_is_plain_message() {
        let reply = ShopReply::parse("I'm not sure what you mean.");
        assert_eq!(reply, ShopReply::plain("I'm not sure what you mean."));
    }

    #[test]
    fn json_that_is_not_an_object_is_plain_message() {
        for segment in [r#""quoted""#, "[1, 2]", "42", "null"] {
            assert_eq!(ShopReply::parse(segment), ShopReply::plain(segment));
        }
    }

    #[test]
    fn success_encoding() {
        let outcome = PredictOutcome::from(ShopReply {
            message: "Here are some jackets".into(),
            action: Action::Search,
            query: Some("red jacket".into()),
            handle: None,
        });
        assert_eq!(
            outcome.to_wire(),
            r#"{"message": "Here are some jackets", "action": "search", "query": "red jacket", "handle": null}"#
        );
    }

    #[test]
    fn failure_encoding_has_only_a_message() {
        let outcome = PredictOutcome::failure("Incorrect padding");
        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), "Error: Incorrect padding");
        assert_eq!(
            outcome.to_wire(),
            r#"{"message": "Error: Incorrect padding"}"#
        );
    }

    #[test]
    fn action_names() {
        assert_eq!(Action::from_name("collection"), Some(Action::Collection));
        assert_eq!(Action::from_name("NONE"), Some(Action::None));
        assert_eq!(Action::from_name(""), None);
        assert_eq!(Action::Search.to_string(), "search");
    }
}
