use serde::{Deserialize, Serialize};

use crate::models::EntityKind;

/// How an `ask` request is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskMode {
    /// Classify the question first, then pick the matching path.
    #[default]
    Smart,
    /// Treat the whole input as a medication name.
    Medication,
    /// Treat the whole input as a condition name.
    Condition,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MedbotRequest {
    Ping,
    Health,
    Classify {
        query: String,
    },
    Ask {
        query: String,
        #[serde(default)]
        mode: AskMode,
    },
    Lookup {
        kind: EntityKind,
        name: String,
    },
    Topics,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MedbotResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl MedbotResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
