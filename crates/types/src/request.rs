//! Wire-level client request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One RPC call as submitted by a client.
///
/// `fields` stays raw JSON here; the engine parses it into a selector tree so
/// malformed selectors can be reported with a path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    /// Name of the exposed action.
    pub action: String,
    /// Action input keyed by client-facing argument names.
    #[serde(default)]
    pub input: Map<String, Value>,
    /// Requested field selection.
    #[serde(default)]
    pub fields: Vec<Value>,
    #[serde(default)]
    pub page: Option<PageRequest>,
    /// Primary key or identity of the record targeted by get/update/destroy.
    #[serde(default)]
    pub identity: Option<Value>,
    /// Executor arguments (filter, sort) forwarded without interpretation.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Requested page window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    /// Ask the executor to include the total count.
    #[serde(default)]
    pub count: bool,
}

impl PageRequest {
    pub fn is_keyset(&self) -> bool {
        self.after.is_some() || self.before.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_request_defaults_optional_parts() {
        let request: ClientRequest = serde_json::from_value(json!({
            "action": "listPosts",
            "fields": ["id", {"author": ["name"]}]
        }))
        .expect("deserialize ClientRequest");
        assert_eq!(request.action, "listPosts");
        assert_eq!(request.fields.len(), 2);
        assert!(request.input.is_empty());
        assert!(request.page.is_none());
        assert!(request.identity.is_none());
    }
}
