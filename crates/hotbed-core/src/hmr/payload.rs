//! Messages sent to connected clients.
//!
//! Serialized as JSON objects tagged by `type`:
//!
//! ```json
//! {"type":"update","url":"/src/app.ts","timestamp":1700000000000,"acceptedPath":"/src/util.ts"}
//! {"type":"style-update","url":"/src/a.css?import","id":"9f2c…","timestamp":1700000000000}
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UpdatePayload {
    /// Sent once, right after a client subscribes.
    Connected,
    FullReload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Re-import `url`, which accepts the change made to `accepted_path`.
    #[serde(rename_all = "camelCase")]
    Update {
        url: String,
        timestamp: u64,
        accepted_path: String,
    },
    StyleUpdate {
        url: String,
        id: String,
        timestamp: u64,
    },
    StyleRemove {
        id: String,
    },
    /// Application-defined event.
    Custom {
        id: String,
        payload: serde_json::Value,
    },
}

impl UpdatePayload {
    /// The `type` tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdatePayload::Connected => "connected",
            UpdatePayload::FullReload { .. } => "full-reload",
            UpdatePayload::Update { .. } => "update",
            UpdatePayload::StyleUpdate { .. } => "style-update",
            UpdatePayload::StyleRemove { .. } => "style-remove",
            UpdatePayload::Custom { .. } => "custom",
        }
    }

    /// Ordering key so a batch of updates is emitted deterministically.
    pub(crate) fn sort_key(&self) -> (&str, &str, &str) {
        match self {
            UpdatePayload::Update {
                url, accepted_path, ..
            } => (url, "update", accepted_path),
            UpdatePayload::StyleUpdate { url, .. } => (url, "style-update", ""),
            UpdatePayload::StyleRemove { id } => (id, "style-remove", ""),
            UpdatePayload::FullReload { path } => (path.as_deref().unwrap_or(""), "full-reload", ""),
            UpdatePayload::Custom { id, .. } => (id, "custom", ""),
            UpdatePayload::Connected => ("", "connected", ""),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain enums of strings and numbers cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"type":"full-reload"}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_uses_camel_case_fields() {
        let payload = UpdatePayload::Update {
            url: "/src/app.ts".into(),
            timestamp: 5,
            accepted_path: "/src/util.ts".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&payload.to_json()).unwrap();
        assert_eq!(
            value,
            json!({"type": "update", "url": "/src/app.ts", "timestamp": 5, "acceptedPath": "/src/util.ts"})
        );
    }

    #[test]
    fn kebab_case_tags() {
        assert_eq!(UpdatePayload::Connected.to_json(), r#"{"type":"connected"}"#);
        assert_eq!(
            UpdatePayload::FullReload { path: None }.to_json(),
            r#"{"type":"full-reload"}"#
        );
        assert_eq!(
            UpdatePayload::StyleRemove { id: "x".into() }.to_json(),
            r#"{"type":"style-remove","id":"x"}"#
        );
    }

    #[test]
    fn custom_payload_parses() {
        let parsed: UpdatePayload =
            serde_json::from_str(r#"{"type":"custom","id":"ping","payload":{"n":1}}"#).unwrap();
        assert_eq!(
            parsed,
            UpdatePayload::Custom {
                id: "ping".into(),
                payload: json!({"n": 1}),
            }
        );
    }
}
