use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use eventsource_stream::{Event, Eventsource};
use futures::{Stream, StreamExt};
use serde_json::{Value, json};

use crate::service::{AgentMessage, AgentService, MessageStream, SubmitRequest, TurnRole};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5-20250929";
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Messages API backend. It has no tool loop, so every exchange finishes in one turn
/// and the allowed tool names are only logged.
pub struct AnthropicService {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicService {
    pub fn new(api_key: String, base_url: &str, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for the completion service")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn request_body(&self, request: &SubmitRequest) -> Value {
        let messages = request
            .turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Assistant => "assistant",
                };
                json!({ "role": role, "content": turn.content })
            })
            .collect::<Vec<Value>>();

        json!({
            "model": self.model,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "system": request.system_prompt,
            "stream": true,
            "messages": messages,
        })
    }
}

#[async_trait]
impl AgentService for AnthropicService {
    fn backend_name(&self) -> &'static str {
        "anthropic"
    }

    async fn submit(&self, request: SubmitRequest) -> Result<MessageStream> {
        if request.max_turns == 0 {
            return Err(anyhow::anyhow!("max_turns must be at least 1"));
        }
        tracing::debug!(
            agent = %request.agent_id,
            model = %self.model,
            allowed_tools = ?request.allowed_tools,
            max_turns = request.max_turns,
            "submitting request to completion service"
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(&request))
            .send()
            .await
            .context("failed to reach completion service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "completion service returned {}: {}",
                status,
                body.trim()
            ));
        }

        Ok(decode_event_stream(response.bytes_stream()))
    }
}

/// Decodes a server-sent event body into agent messages. The stream fails if the
/// body ends before `message_stop`.
pub fn decode_event_stream<S, B, E>(body: S) -> MessageStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::try_unfold(
        (body.eventsource().boxed(), MessageEventDecoder::default()),
        |(mut events, mut decoder)| async move {
            while let Some(event) = events.next().await {
                let event = event.map_err(|err| {
                    anyhow::anyhow!("completion service stream interrupted: {err}")
                })?;
                if let Some(message) = decoder.decode(&event)? {
                    return Ok::<_, anyhow::Error>(Some((message, (events, decoder))));
                }
            }
            decoder.finish()?;
            Ok(None)
        },
    )
    .boxed()
}

/// Maps Messages API events to agent messages: one `assistant` message per text
/// delta and a single `result` message carrying the whole text on `message_stop`.
#[derive(Debug, Default)]
pub struct MessageEventDecoder {
    text: String,
    finished: bool,
}

impl MessageEventDecoder {
    pub fn decode(&mut self, event: &Event) -> Result<Option<AgentMessage>> {
        if self.finished || event.data.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&event.data).with_context(|| {
            format!("completion service sent malformed event data: {}", event.data)
        })?;

        match value.get("type").and_then(Value::as_str) {
            Some("content_block_delta") => {
                if let Some(text) = value.pointer("/delta/text").and_then(Value::as_str) {
                    self.text.push_str(text);
                    return Ok(Some(AgentMessage::assistant(text)));
                }
            }
            Some("message_stop") => {
                self.finished = true;
                return Ok(Some(AgentMessage::result(std::mem::take(&mut self.text))));
            }
            Some("error") => {
                let message = value
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(anyhow::anyhow!("completion service error: {message}"));
            }
            _ => {}
        }
        Ok(None)
    }

    pub fn finish(&self) -> Result<()> {
        if !self.finished {
            return Err(anyhow::anyhow!(
                "completion service stream ended before message_stop"
            ));
        }
        Ok(())
    }
}
