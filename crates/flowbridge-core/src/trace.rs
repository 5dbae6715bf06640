//! Voiceflow trace and request data model
//!
//! Traces arrive as `{ "type": ..., "payload": {...} }` objects. Decoding is
//! done one trace at a time so a single bad entry never poisons the batch.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request type sent when a conversation starts
pub const REQUEST_LAUNCH: &str = "launch";
/// Request type carrying free text typed by the user
pub const REQUEST_TEXT: &str = "text";

/// Request body of one interact call: `{ type, payload? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRequest {
    /// Request type tag (`launch`, `text`, intent or path name)
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional request data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl InteractionRequest {
    /// Create a request from a type tag and optional payload
    pub fn new(kind: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Request that starts (or restarts) a conversation
    #[must_use]
    pub fn launch() -> Self {
        Self::new(REQUEST_LAUNCH, None)
    }

    /// Request carrying a raw user message
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(REQUEST_TEXT, Some(Value::String(body.into())))
    }
}

/// Label plus the request issued when it is pressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    /// Display label
    pub name: String,
    /// Follow-up request
    pub request: InteractionRequest,
}

/// One styled leaf of a slate description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlateText {
    /// Raw text
    #[serde(default)]
    pub text: String,
    /// Underline flag
    #[serde(default)]
    pub underline: bool,
    /// Any truthy value means bold (Voiceflow sends `"700"`)
    #[serde(rename = "fontWeight", default)]
    pub font_weight: Option<Value>,
    /// Strikethrough flag
    #[serde(rename = "strikeThrough", default)]
    pub strike_through: bool,
    /// Italic flag
    #[serde(default)]
    pub italic: bool,
    /// Inline elements such as links nest their own text nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SlateText>,
}

impl SlateText {
    /// Plain text node with no style
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether `fontWeight` is set to a truthy value
    #[must_use]
    pub fn is_bold(&self) -> bool {
        match &self.font_weight {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|w| w != 0.0),
            _ => false,
        }
    }
}

/// A block of a slate description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlateBlock {
    /// Text nodes of the block
    #[serde(default)]
    pub children: Vec<SlateText>,
}

/// Rich-text card description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    /// Ordered slate blocks
    #[serde(default)]
    pub slate: Vec<SlateBlock>,
}

/// Card body shared by `cardV2` traces and carousel entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Card title
    #[serde(default)]
    pub title: String,
    /// Rich-text description
    #[serde(default)]
    pub description: Description,
    /// Image shown as the photo of the message
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    /// Buttons attached to the card
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// Decoded backend trace
#[derive(Debug, Clone, PartialEq)]
pub enum Trace {
    /// `text` or `speak`
    Text {
        /// Message body (Markdown)
        message: String,
    },
    /// `visual`
    Visual {
        /// Image URL
        image_url: String,
    },
    /// `cardV2`
    Card(Card),
    /// `carousel`
    Carousel(Vec<Card>),
    /// `choice`
    Choice(Vec<Button>),
    /// `end` or `no-reply`
    End,
}

#[derive(Deserialize)]
struct MessagePayload {
    message: String,
}

#[derive(Deserialize)]
struct VisualPayload {
    #[serde(alias = "imageUrl")]
    image: String,
}

#[derive(Deserialize)]
struct CarouselPayload {
    cards: Vec<Card>,
}

#[derive(Deserialize)]
struct ChoicePayload {
    buttons: Vec<Button>,
}

impl Trace {
    /// Decode one raw trace.
    ///
    /// Returns `Ok(None)` for trace kinds the relay does not render
    /// (`path`, `flow`, `debug`, ...).
    ///
    /// # Errors
    ///
    /// Returns `RelayError::MalformedTrace` when the trace has no type or a
    /// known kind is missing a required field.
    pub fn decode(raw: &Value) -> Result<Option<Self>, RelayError> {
        let Some(kind) = raw.get("type").and_then(Value::as_str) else {
            return Err(RelayError::MalformedTrace {
                kind: "<untyped>".to_string(),
                reason: "missing `type` field".to_string(),
            });
        };
        let payload = raw.get("payload").cloned().unwrap_or(Value::Null);
        let malformed = |e: serde_json::Error| RelayError::MalformedTrace {
            kind: kind.to_string(),
            reason: e.to_string(),
        };

        let trace = match kind {
            "text" | "speak" => {
                let p: MessagePayload = serde_json::from_value(payload).map_err(malformed)?;
                Self::Text { message: p.message }
            }
            "visual" => {
                let p: VisualPayload = serde_json::from_value(payload).map_err(malformed)?;
                Self::Visual { image_url: p.image }
            }
            "cardV2" => Self::Card(serde_json::from_value(payload).map_err(malformed)?),
            "carousel" => {
                let p: CarouselPayload = serde_json::from_value(payload).map_err(malformed)?;
                Self::Carousel(p.cards)
            }
            "choice" => {
                let p: ChoicePayload = serde_json::from_value(payload).map_err(malformed)?;
                Self::Choice(p.buttons)
            }
            "end" | "no-reply" => Self::End,
            _ => return Ok(None),
        };
        Ok(Some(trace))
    }

    /// Short name used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Visual { .. } => "visual",
            Self::Card(_) => "cardV2",
            Self::Carousel(_) => "carousel",
            Self::Choice(_) => "choice",
            Self::End => "end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_text_and_speak() {
        for kind in ["text", "speak"] {
            let raw = json!({ "type": kind, "payload": { "message": "Hello *there*" } });
            let trace = Trace::decode(&raw).ok().flatten();
            assert_eq!(
                trace,
                Some(Trace::Text {
                    message: "Hello *there*".to_string()
                })
            );
        }
    }

    #[test]
    fn test_decode_visual_accepts_both_field_names() {
        let a = json!({ "type": "visual", "payload": { "image": "https://a/1.png" } });
        let b = json!({ "type": "visual", "payload": { "imageUrl": "https://a/2.png" } });
        assert!(matches!(
            Trace::decode(&a),
            Ok(Some(Trace::Visual { image_url })) if image_url == "https://a/1.png"
        ));
        assert!(matches!(
            Trace::decode(&b),
            Ok(Some(Trace::Visual { image_url })) if image_url == "https://a/2.png"
        ));
    }

    #[test]
    fn test_decode_card_with_defaults() {
        let raw = json!({
            "type": "cardV2",
            "payload": {
                "imageUrl": "https://img/card.png",
                "buttons": [{ "name": "Go", "request": { "type": "path-1", "payload": { "label": "Go" } } }]
            }
        });
        let Ok(Some(Trace::Card(card))) = Trace::decode(&raw) else {
            panic!("expected card");
        };
        assert!(card.title.is_empty());
        assert!(card.description.slate.is_empty());
        assert_eq!(card.buttons.len(), 1);
        assert_eq!(card.buttons[0].request.kind, "path-1");
        assert_eq!(card.buttons[0].request.payload, Some(json!({ "label": "Go" })));
    }

    #[test]
    fn test_decode_end_variants() {
        for kind in ["end", "no-reply"] {
            let raw = json!({ "type": kind });
            assert_eq!(Trace::decode(&raw).ok().flatten(), Some(Trace::End));
        }
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let raw = json!({ "type": "path", "payload": { "path": "reprompt" } });
        assert!(matches!(Trace::decode(&raw), Ok(None)));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let raw = json!({ "type": "choice", "payload": {} });
        let err = Trace::decode(&raw).err();
        assert!(matches!(
            err,
            Some(RelayError::MalformedTrace { ref kind, .. }) if kind == "choice"
        ));

        let untyped = json!({ "payload": { "message": "hi" } });
        assert!(Trace::decode(&untyped).is_err());
    }

    #[test]
    fn test_font_weight_truthiness() {
        let mut node = SlateText::plain("x");
        assert!(!node.is_bold());
        node.font_weight = Some(json!("700"));
        assert!(node.is_bold());
        node.font_weight = Some(json!(""));
        assert!(!node.is_bold());
        node.font_weight = Some(json!(0));
        assert!(!node.is_bold());
        node.font_weight = Some(json!(true));
        assert!(node.is_bold());
    }

    #[test]
    fn test_request_serialization_omits_empty_payload() {
        let launch = serde_json::to_value(InteractionRequest::launch()).ok();
        assert_eq!(launch, Some(json!({ "type": "launch" })));

        let text = serde_json::to_value(InteractionRequest::text("hi")).ok();
        assert_eq!(text, Some(json!({ "type": "text", "payload": "hi" })));
    }
}
