use serde::{Deserialize, Serialize};

use crate::json::Json;

/// `POST /v1/responses` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Json,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

/// `POST /v1/responses/:id/submit_tool_outputs` request body. Always
/// streams; `response_id` is carried separately into `PipelineDto.metadata`
/// rather than being part of this struct (it comes from the URL path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Non-stream `response` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesObject {
    pub id: String,
    pub object: String,
    pub model: String,
    pub output: Vec<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Json>,
}

impl ResponsesRequest {
    pub fn looks_like(value: &Json) -> bool {
        value.get("input").is_some() && value.get("model").is_some()
    }
}

impl ResponsesObject {
    pub fn looks_like(value: &Json) -> bool {
        value.get("object").and_then(Json::as_str) == Some("response")
            || value.get("response").and_then(|r| r.get("output")).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_minimal_request() {
        let body = json!({"model": "gpt-4.1", "input": "ping"});
        let request: ResponsesRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.model, "gpt-4.1");
        assert!(!request.stream);
    }

    #[test]
    fn looks_like_detects_response_object() {
        assert!(ResponsesObject::looks_like(&json!({"object": "response"})));
        assert!(ResponsesObject::looks_like(
            &json!({"response": {"output": []}})
        ));
        assert!(!ResponsesObject::looks_like(&json!({"object": "chat.completion"})));
    }
}
