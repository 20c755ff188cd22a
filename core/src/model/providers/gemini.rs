//! Google AI (Gemini) client over the generateContent REST endpoint

use crate::config::{ModelParams, ResolvedLlmConfig};
use crate::conversation::{ConversationState, Turn};
use crate::error::{ModelError, Result};
use crate::model::{ModelClient, Reply, ToolDefinition};
use crate::tools::{ToolArguments, ToolCallRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Gemini client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    params: ModelParams,
    headers: HashMap<String, String>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Authentication {
                message: "No API key found for Gemini".to_string(),
            }
            .into());
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            params: config.params.clone(),
            headers: config.headers.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(
        &self,
        conversation: &ConversationState,
        tools: &[ToolDefinition],
    ) -> GeminiRequest {
        let system_instruction = conversation.instructions().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(text)],
        });

        let tools = if tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.input_schema.clone(),
                    })
                    .collect(),
            }])
        };

        let generation_config = GenerationConfig {
            max_output_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
        };

        GeminiRequest {
            system_instruction,
            contents: convert_turns(conversation),
            tools,
            generation_config: if generation_config.is_empty() {
                None
            } else {
                Some(generation_config)
            },
        }
    }
}

/// Map turns to Gemini contents. Tool results carry the function name of the
/// call they answer, which Gemini uses to pair them up.
fn convert_turns(conversation: &ConversationState) -> Vec<GeminiContent> {
    conversation
        .turns()
        .iter()
        .map(|turn| match turn {
            Turn::User { content } => GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart::text(content)],
            },
            Turn::Model {
                reply: Reply::Text(text),
            } => GeminiContent {
                role: Some("model".into()),
                parts: vec![GeminiPart::text(text)],
            },
            Turn::Model {
                reply: Reply::ToolCalls(calls),
            } => GeminiContent {
                role: Some("model".into()),
                parts: calls
                    .iter()
                    .map(|call| GeminiPart {
                        function_call: Some(FunctionCall {
                            name: call.name.clone(),
                            args: call.arguments.to_value(),
                        }),
                        ..Default::default()
                    })
                    .collect(),
            },
            Turn::Tool { results } => GeminiContent {
                role: Some("user".into()),
                parts: results
                    .iter()
                    .map(|result| {
                        let name = conversation
                            .find_call(&result.call_id)
                            .map(|call| call.name.clone())
                            .unwrap_or_else(|| result.call_id.clone());
                        let response = match &result.error {
                            Some(error) => json!({ "output": result.output, "error": error }),
                            None => json!({ "output": result.output }),
                        };
                        GeminiPart {
                            function_response: Some(FunctionResponse { name, response }),
                            ..Default::default()
                        }
                    })
                    .collect(),
            },
        })
        .collect()
}

/// Turn the first candidate into a [`Reply`]. Gemini does not assign call
/// ids, so they are derived from the model turn index and call position.
fn convert_response(response: GeminiResponse, model_turn: usize) -> Result<Reply> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidResponse {
            message: match response.prompt_feedback {
                Some(feedback) => format!("No candidates in response: {}", feedback),
                None => "No candidates in response".to_string(),
            },
        })?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut text: Option<String> = None;
    let mut calls = Vec::new();

    for part in parts {
        if let Some(chunk) = part.text {
            text.get_or_insert_with(String::new).push_str(&chunk);
        }
        if let Some(call) = part.function_call {
            let arguments = match ToolArguments::from_value(call.args) {
                Ok(arguments) => arguments,
                Err(error) => {
                    warn!(tool = %call.name, %error, "Model sent non-object tool arguments");
                    ToolArguments::new()
                }
            };
            let id = format!("call_{}_{}", model_turn, calls.len());
            calls.push(ToolCallRequest::new(id, call.name, arguments));
        }
    }

    if text.is_none() && calls.is_empty() {
        let finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        debug!(finish_reason, "Gemini candidate has no content");
        return Err(ModelError::InvalidResponse {
            message: format!("candidate has no content (finish reason: {finish_reason})"),
        }
        .into());
    }

    Ok(Reply::from_parts(text, calls)?)
}

fn status_error(status: u16, message: String) -> ModelError {
    match status {
        429 => ModelError::RateLimit,
        401 | 403 => ModelError::Authentication { message },
        503 => ModelError::Unavailable { message },
        _ => ModelError::Api { status, message },
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        conversation: &ConversationState,
        tools: &[ToolDefinition],
    ) -> Result<Reply> {
        let request = self.build_request(conversation, tools);
        debug!("Gemini request with {} tools enabled", tools.len());

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json");
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Network {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, error_text).into());
        }

        let gemini_response: GeminiResponse =
            response
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        convert_response(gemini_response, conversation.model_turns() + 1)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.max_output_tokens.is_none() && self.temperature.is_none() && self.top_p.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use crate::tools::ToolResult;

    fn client() -> GeminiClient {
        GeminiClient::new(&ResolvedLlmConfig::new(
            Protocol::GoogleAI,
            format!("{}/", Protocol::GoogleAI.default_base_url()),
            "key".into(),
            "gemini-2.0-flash".into(),
        ))
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let mut state = ConversationState::seed("Find the docs")
            .with_instructions(Some("You are a research assistant.".into()));
        state
            .push_model_turn(Reply::ToolCalls(vec![ToolCallRequest::new(
                "call_1_0",
                "read_file",
                ToolArguments::new().with("path", json!("README.md")),
            )]))
            .unwrap();
        state
            .push_tool_turn(vec![ToolResult::success("call_1_0", "# Readme")])
            .unwrap();

        let tools = vec![ToolDefinition {
            name: "read_file".into(),
            description: "Read a file".into(),
            input_schema: json!({"type": "object"}),
        }];
        let body = serde_json::to_value(client().build_request(&state, &tools)).unwrap();

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a research assistant."
        );
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["args"]["path"],
            "README.md"
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["name"],
            "read_file"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "read_file"
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_with_function_calls_gets_deterministic_ids() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"functionCall": {"name": "search", "args": {"q": "a"}}},
                        {"functionCall": {"name": "search", "args": {"q": "b"}}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let reply = convert_response(response, 2).unwrap();
        let ids: Vec<_> = reply.tool_calls().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_2_0", "call_2_1"]);
    }

    #[test]
    fn test_response_text_is_joined() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]}
            }]
        }))
        .unwrap();
        assert_eq!(
            convert_response(response, 1).unwrap(),
            Reply::Text("Hello, world".into())
        );
    }

    #[test]
    fn test_empty_candidates_is_invalid() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(convert_response(response, 1).is_err());
    }

    #[test]
    fn test_blocked_candidate_is_rejected() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();

        match convert_response(response, 1) {
            Err(crate::error::Error::Model(ModelError::InvalidResponse { message })) => {
                assert!(message.contains("SAFETY"), "{message}");
            }
            other => panic!("expected invalid response, got {other:?}"),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_error(429, String::new()), ModelError::RateLimit);
        assert!(status_error(503, "busy".into()).is_retryable());
        assert!(!status_error(401, "nope".into()).is_retryable());
        assert!(status_error(500, "oops".into()).is_retryable());
        assert!(!status_error(400, "bad".into()).is_retryable());
    }
}
