//! Seam to the external agent-completion service.
//!
//! The service is opaque: it receives a system prompt, the role's allowed tool
//! names, a turn cap and the conversation, and answers with a stream of tagged
//! JSON records. Only the `type` discriminator and the `result` text are read.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const RESULT_MESSAGE_TYPE: &str = "result";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentMessage(pub Value);

impl AgentMessage {
    pub fn result(text: impl Into<String>) -> Self {
        Self(json!({ "type": RESULT_MESSAGE_TYPE, "result": text.into() }))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self(json!({ "type": "assistant", "text": text.into() }))
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn is_result(&self) -> bool {
        self.kind() == Some(RESULT_MESSAGE_TYPE)
    }

    pub fn result_text(&self) -> Option<&str> {
        self.0.get("result").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRequest {
    pub agent_id: String,
    pub system_prompt: String,
    pub allowed_tools: Vec<String>,
    pub max_turns: u32,
    pub turns: Vec<ConversationTurn>,
}

impl SubmitRequest {
    pub fn first_user_turn(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|turn| turn.role == TurnRole::User)
            .map(|turn| turn.content.as_str())
    }
}

pub type MessageStream = BoxStream<'static, Result<AgentMessage>>;

#[async_trait]
pub trait AgentService: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn submit(&self, request: SubmitRequest) -> Result<MessageStream>;
}

/// One scripted stream element: a message, or an error raised at that point.
pub type ScriptedItem = std::result::Result<AgentMessage, String>;

type ScriptFn = dyn Fn(&SubmitRequest) -> Vec<ScriptedItem> + Send + Sync;

/// In-process service that answers from a closure. Backs the offline provider and tests.
#[derive(Clone)]
pub struct ScriptedService {
    name: &'static str,
    script: Arc<ScriptFn>,
    requests: Arc<Mutex<Vec<SubmitRequest>>>,
}

impl ScriptedService {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&SubmitRequest) -> Vec<ScriptedItem> + Send + Sync + 'static,
    {
        Self {
            name: "scripted",
            script: Arc::new(script),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every call yields one `result` message with `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| vec![Ok(AgentMessage::result(text.clone()))])
    }

    pub fn offline() -> Self {
        let mut service = Self::new(|request| {
            let task = request
                .first_user_turn()
                .and_then(|turn| turn.lines().next())
                .unwrap_or_default()
                .trim()
                .to_string();
            let text = format!(
                "Offline response from {agent}.\n\
                 Task: {task}\n\
                 We recommend configuring ANTHROPIC_API_KEY to generate real output.",
                agent = request.agent_id,
            );
            vec![
                Ok(AgentMessage::assistant(text.clone())),
                Ok(AgentMessage::result(text)),
            ]
        });
        service.name = "offline";
        service
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    fn backend_name(&self) -> &'static str {
        self.name
    }

    async fn submit(&self, request: SubmitRequest) -> Result<MessageStream> {
        let items = (self.script)(&request);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let stream = futures::stream::iter(
            items
                .into_iter()
                .map(|item| item.map_err(|message| anyhow::anyhow!(message))),
        );
        Ok(stream.boxed())
    }
}
