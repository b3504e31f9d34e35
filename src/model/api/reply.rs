use serde::Serialize;

/// Body of every successful response: a success flag, an optional
/// human-readable message and the payload's own fields.
#[derive(Debug, Serialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Reply<T> {
    pub fn new(body: T) -> Self {
        Self {
            success: true,
            message: None,
            body,
        }
    }

    pub fn with_message(message: impl Into<String>, body: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            body,
        }
    }
}

/// A payload with no fields of its own.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{serde_json, serde_json::json};

    use super::*;

    #[derive(Serialize)]
    struct Body {
        count: u32,
    }

    #[test]
    fn payload_fields_are_flattened() {
        let reply = Reply::with_message("Done", Body { count: 3 });
        assert_eq!(
            serde_json::to_value(reply).unwrap(),
            json!({ "success": true, "message": "Done", "count": 3 })
        );
        assert_eq!(
            serde_json::to_value(Reply::new(Empty::default())).unwrap(),
            json!({ "success": true })
        );
    }
}
