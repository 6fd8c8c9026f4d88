use poise::serenity_prelude as serenity;
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    #[error("message must be a JSON string or object")]
    UnsupportedShape,
    #[error("message has neither content nor embeds")]
    Empty,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A configured message: plain content and/or embeds in Discord API JSON.
#[derive(Clone, Debug)]
pub struct MessagePayload {
    pub content: Option<String>,
    pub embeds: Vec<serenity::Embed>,
}

impl MessagePayload {
    /// A string is sent as content. An object supplies `content` and/or
    /// `embeds`.
    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let payload = match value {
            Value::String(content) => Self {
                content: Some(content.clone()),
                embeds: Vec::new(),
            },
            Value::Object(map) => Self {
                content: map
                    .get("content")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                embeds: match map.get("embeds") {
                    Some(embeds) => serde_json::from_value(embeds.clone())?,
                    None => Vec::new(),
                },
            },
            _ => return Err(PayloadError::UnsupportedShape),
        };

        if payload.content.as_deref().is_none_or(str::is_empty) && payload.embeds.is_empty() {
            return Err(PayloadError::Empty);
        }

        Ok(payload)
    }

    pub fn to_message(&self) -> serenity::CreateMessage {
        let mut message = serenity::CreateMessage::new();

        if let Some(content) = &self.content {
            message = message.content(content);
        }

        if !self.embeds.is_empty() {
            message = message.embeds(
                self.embeds
                    .iter()
                    .cloned()
                    .map(serenity::CreateEmbed::from)
                    .collect(),
            );
        }

        message
    }
}

/// Parse a single stored embed, as written by `/embed create`.
pub fn parse_custom_embed(json: &str) -> Result<serenity::Embed, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MessagePayload, PayloadError, parse_custom_embed};

    #[test]
    fn string_becomes_content() {
        let payload = MessagePayload::from_value(&json!("Welcome!")).unwrap();
        assert_eq!(payload.content.as_deref(), Some("Welcome!"));
        assert!(payload.embeds.is_empty());
    }

    #[test]
    fn object_supplies_content_and_embeds() {
        let payload = MessagePayload::from_value(&json!({
            "content": "hi",
            "embeds": [{ "title": "Rules", "color": 6514417, "fields": [{ "name": "1", "value": "Be kind", "inline": false }] }]
        }))
        .unwrap();

        assert_eq!(payload.content.as_deref(), Some("hi"));
        assert_eq!(payload.embeds.len(), 1);
        assert_eq!(payload.embeds[0].title.as_deref(), Some("Rules"));
        assert_eq!(payload.embeds[0].fields[0].value, "Be kind");
    }

    #[test]
    fn unusable_values_are_rejected() {
        assert!(matches!(
            MessagePayload::from_value(&json!(12)),
            Err(PayloadError::UnsupportedShape)
        ));
        assert!(matches!(
            MessagePayload::from_value(&json!({ "content": "" })),
            Err(PayloadError::Empty)
        ));
        assert!(matches!(
            MessagePayload::from_value(&json!({ "embeds": "nope" })),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn custom_embed_parses_from_api_json() {
        let embed = parse_custom_embed(r#"{"title":"Hello","description":"World"}"#).unwrap();
        assert_eq!(embed.title.as_deref(), Some("Hello"));
        assert_eq!(embed.description.as_deref(), Some("World"));

        assert!(parse_custom_embed("[1, 2]").is_err());
    }
}
