use medbot_core::protocol::{MedbotRequest, MedbotResponse};
use medbot_core::projector;

use crate::assistant::Assistant;

pub async fn handle_request(request: MedbotRequest, assistant: &Assistant) -> MedbotResponse {
    match request {
        MedbotRequest::Ping => MedbotResponse::pong(),
        MedbotRequest::Health => match serde_json::to_value(assistant.stats()) {
            Ok(mut stats) => {
                if let Some(obj) = stats.as_object_mut() {
                    obj.insert("status".to_string(), serde_json::json!("healthy"));
                }
                MedbotResponse::ok(stats)
            }
            Err(e) => MedbotResponse::err(e.to_string()),
        },
        MedbotRequest::Classify { query } => {
            if query.trim().is_empty() {
                return MedbotResponse::err("query must not be empty");
            }
            MedbotResponse::ok(serde_json::json!({
                "query": query,
                "intent": assistant.classify(&query),
            }))
        }
        MedbotRequest::Ask { query, mode } => {
            if query.trim().is_empty() {
                return MedbotResponse::err("query must not be empty");
            }
            let reply = assistant.ask(&query, mode).await;
            match serde_json::to_value(&reply) {
                Ok(data) => MedbotResponse::ok(data),
                Err(e) => MedbotResponse::err(e.to_string()),
            }
        }
        MedbotRequest::Lookup { kind, name } => match assistant.lookup(kind, &name) {
            Some(record) => MedbotResponse::ok(serde_json::json!({
                "found": true,
                "record": record,
                "text": projector::render(record, kind),
            })),
            None => MedbotResponse::ok(serde_json::json!({
                "found": false,
                "kind": kind,
                "name": name,
            })),
        },
        MedbotRequest::Topics => MedbotResponse::ok(serde_json::json!({
            "topics": assistant.topics(),
            "count": assistant.topics().len(),
        })),
    }
}
