//! OpenAI-compatible client using the async-openai library

use crate::config::{ModelParams, ResolvedLlmConfig};
use crate::conversation::{ConversationState, Turn};
use crate::error::{ModelError, Result};
use crate::model::{ModelClient, Reply, ToolDefinition};
use crate::tools::{ToolArguments, ToolCallRequest};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionCall, FunctionObject,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// OpenAI client using async-openai library
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    params: ModelParams,
}

impl OpenAiClient {
    /// Create a new OpenAI client from resolved config
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Authentication {
                message: "No API key found for OpenAI".to_string(),
            }
            .into());
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(config.base_url.trim_end_matches('/'));

        if !config.headers.is_empty() {
            debug!(
                count = config.headers.len(),
                "Extra headers are not forwarded by the OpenAI client"
            );
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            params: config.params.clone(),
        })
    }

    /// Convert the conversation to chat completion messages
    fn convert_messages(conversation: &ConversationState) -> Vec<ChatCompletionRequestMessage> {
        let mut converted = Vec::with_capacity(conversation.len() + 1);

        if let Some(instructions) = conversation.instructions() {
            converted.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: instructions.to_string().into(),
                    name: None,
                },
            ));
        }

        for turn in conversation.turns() {
            match turn {
                Turn::User { content } => {
                    converted.push(ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessage {
                            content: content.clone().into(),
                            name: None,
                        },
                    ));
                }
                Turn::Model {
                    reply: Reply::Text(text),
                } => {
                    converted.push(ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                                text.clone(),
                            )),
                            ..Default::default()
                        },
                    ));
                }
                Turn::Model {
                    reply: Reply::ToolCalls(calls),
                } => {
                    let tool_calls = calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.to_value().to_string(),
                            },
                        })
                        .collect();

                    converted.push(ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: None,
                            tool_calls: Some(tool_calls),
                            ..Default::default()
                        },
                    ));
                }
                Turn::Tool { results } => {
                    for result in results {
                        converted.push(ChatCompletionRequestMessage::Tool(
                            ChatCompletionRequestToolMessage {
                                content: ChatCompletionRequestToolMessageContent::Text(
                                    result.model_content(),
                                ),
                                tool_call_id: result.call_id.clone(),
                            },
                        ));
                    }
                }
            }
        }

        converted
    }

    /// Convert tool definitions to function tools
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
        tools
            .iter()
            .map(|tool| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: tool.name.clone(),
                    description: Some(tool.description.clone()),
                    parameters: Some(tool.input_schema.clone()),
                    strict: None,
                },
            })
            .collect()
    }

    /// Convert the first choice of a response into a [`Reply`]
    fn convert_response(response: CreateChatCompletionResponse) -> Result<Reply> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse {
                message: "No choices in response".to_string(),
            })?;

        let calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tool_call| {
                let arguments =
                    parse_arguments(&tool_call.function.name, &tool_call.function.arguments);
                ToolCallRequest::new(tool_call.id, tool_call.function.name, arguments)
            })
            .collect::<Vec<_>>();

        if choice.message.content.is_none() && calls.is_empty() {
            let finish_reason = choice
                .finish_reason
                .map(|reason| format!("{reason:?}"))
                .unwrap_or_else(|| "unknown".to_string());
            return Err(ModelError::InvalidResponse {
                message: format!("choice has no content (finish reason: {finish_reason})"),
            }
            .into());
        }

        Ok(Reply::from_parts(choice.message.content, calls)?)
    }
}

/// Decode a JSON argument string. Malformed arguments become an empty set so
/// the tool itself reports what is missing.
fn parse_arguments(tool: &str, raw: &str) -> ToolArguments {
    if raw.trim().is_empty() {
        return ToolArguments::new();
    }
    match serde_json::from_str(raw)
        .map_err(|e| e.to_string())
        .and_then(|value| ToolArguments::from_value(value).map_err(|e| e.to_string()))
    {
        Ok(arguments) => arguments,
        Err(error) => {
            warn!(tool, %error, "Model sent unparseable tool arguments");
            ToolArguments::new()
        }
    }
}

fn map_openai_error(err: OpenAIError) -> ModelError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => ModelError::Timeout { timeout_ms: 0 },
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => ModelError::Api {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => ModelError::Network {
                message: e.to_string(),
            },
        },
        OpenAIError::ApiError(api) => {
            let lowered = api.message.to_lowercase();
            if lowered.contains("rate limit") {
                ModelError::RateLimit
            } else if lowered.contains("api key") || lowered.contains("unauthorized") {
                ModelError::Authentication {
                    message: api.message,
                }
            } else if lowered.contains("overloaded") || lowered.contains("server error") {
                ModelError::Unavailable {
                    message: api.message,
                }
            } else {
                ModelError::Api {
                    status: 400,
                    message: api.message,
                }
            }
        }
        OpenAIError::InvalidArgument(message) => ModelError::InvalidRequest { message },
        other => ModelError::InvalidResponse {
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn generate(
        &self,
        conversation: &ConversationState,
        tools: &[ToolDefinition],
    ) -> Result<Reply> {
        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model);
        request_builder.messages(Self::convert_messages(conversation));

        if !tools.is_empty() {
            debug!("OpenAI request with {} tools enabled", tools.len());
            request_builder.tools(Self::convert_tools(tools));
        }

        let params = &self.params;
        if let Some(max_tokens) = params.max_tokens {
            request_builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            request_builder.temperature(temperature);
        }
        if let Some(top_p) = params.top_p {
            request_builder.top_p(top_p);
        }

        let request = request_builder
            .build()
            .map_err(|e| ModelError::InvalidRequest {
                message: format!("Failed to build request: {}", e),
            })?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| {
                tracing::error!("OpenAI API call failed: {}", e);
                map_openai_error(e)
            })?;

        let reply = Self::convert_response(response)?;
        for call in reply.tool_calls() {
            debug!("Tool call: {} (id: {})", call.name, call.id);
        }
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
