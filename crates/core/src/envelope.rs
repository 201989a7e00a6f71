//! Success and failure body shapes of the remote API.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful response envelope.
///
/// The API wraps payloads as `{ data, meta?, message? }`, but a handful of
/// endpoints return the payload bare. [`Envelope::from_value`] accepts both:
/// a JSON object carrying a `data` key is unwrapped, anything else is treated
/// as the payload itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    pub meta: Option<Value>,
    pub message: Option<String>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Interpret a decoded response body as an envelope.
    pub fn from_value(body: Value) -> Result<Self, serde_json::Error> {
        match body {
            Value::Object(mut map) if map.contains_key("data") => {
                let data = map.remove("data").unwrap_or(Value::Null);
                Ok(Self {
                    data: serde_json::from_value(data)?,
                    meta: map.remove("meta").filter(|v| !v.is_null()),
                    message: map
                        .remove("message")
                        .and_then(|v| v.as_str().map(str::to_string)),
                })
            }
            other => Ok(Self {
                data: serde_json::from_value(other)?,
                meta: None,
                message: None,
            }),
        }
    }
}

/// Normalized failure body.
///
/// The API reports failures as `{ message?, error?, errors? }` where `errors`
/// maps field names to validation messages (422 only). [`ErrorBody::parse`]
/// is tolerant: a plain-string body becomes the message, anything
/// unparseable becomes an empty body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl ErrorBody {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(message)) => Self {
                message: Some(message),
                ..Self::default()
            },
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(_) if raw.trim().is_empty() => Self::default(),
            Err(_) => Self {
                message: Some(raw.to_string()),
                ..Self::default()
            },
        }
    }

    /// Best human-readable message, in the API's order of preference.
    pub fn display_message(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Thing {
        id: u32,
        name: String,
    }

    #[test]
    fn wrapped_body_is_unwrapped() {
        let env: Envelope<Thing> = Envelope::from_value(json!({
            "data": { "id": 7, "name": "anvil" },
            "meta": { "page": 1 },
            "message": "ok"
        }))
        .unwrap();

        assert_eq!(env.data.id, 7);
        assert_eq!(env.meta.unwrap()["page"], 1);
        assert_eq!(env.message.as_deref(), Some("ok"));
    }

    #[test]
    fn bare_body_is_the_payload() {
        let env: Envelope<Thing> =
            Envelope::from_value(json!({ "id": 3, "name": "rope" })).unwrap();

        assert_eq!(env.data, Thing { id: 3, name: "rope".into() });
        assert!(env.meta.is_none());
        assert!(env.message.is_none());
    }

    #[test]
    fn error_body_prefers_message_over_error() {
        let body = ErrorBody::parse(r#"{"message":"nope","error":"also nope"}"#);
        assert_eq!(body.display_message(), Some("nope"));

        let body = ErrorBody::parse(r#"{"error":"just this"}"#);
        assert_eq!(body.display_message(), Some("just this"));
    }

    #[test]
    fn error_body_tolerates_plain_strings_and_garbage() {
        assert_eq!(
            ErrorBody::parse(r#""teapot""#).display_message(),
            Some("teapot")
        );
        assert_eq!(ErrorBody::parse("<html>oops</html>").display_message(), Some("<html>oops</html>"));
        assert_eq!(ErrorBody::parse("   "), ErrorBody::default());
    }

    #[test]
    fn validation_errors_are_per_field() {
        let body = ErrorBody::parse(
            r#"{"message":"Validation failed","errors":{"email":["taken","invalid"]}}"#,
        );
        let errors = body.errors.unwrap();
        assert_eq!(errors["email"], vec!["taken", "invalid"]);
    }
}
