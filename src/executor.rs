use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::AgencyError;
use crate::registry::AgentRegistry;
use crate::service::{AgentMessage, AgentService, ConversationTurn, SubmitRequest};

pub const RECOMMENDATION_TRIGGERS: &[&str] = &["recommend", "should", "next step"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    pub agent: String,
    pub timestamp: String,
    /// Retained `result` messages, in emission order.
    pub messages: Vec<AgentMessage>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

impl AgentResult {
    pub fn from_messages(agent: &str, messages: Vec<AgentMessage>) -> Self {
        let summary = summarize(&messages);
        let recommendations = extract_recommendations(&summary);
        Self {
            agent: agent.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            messages,
            summary,
            recommendations,
        }
    }
}

pub fn summarize(messages: &[AgentMessage]) -> String {
    messages
        .iter()
        .filter(|message| message.is_result())
        .filter_map(AgentMessage::result_text)
        .collect::<Vec<&str>>()
        .join("")
}

pub fn extract_recommendations(summary: &str) -> Vec<String> {
    summary
        .lines()
        .filter(|line| {
            RECOMMENDATION_TRIGGERS
                .iter()
                .any(|trigger| line.contains(trigger))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

pub fn compose_user_turn(task: &str, context: Option<&Value>) -> String {
    match context {
        Some(context) => {
            let rendered =
                serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
            format!("{task}\n\nContext:\n{rendered}")
        }
        None => task.to_string(),
    }
}

/// Runs one agent role against the completion service.
#[derive(Clone)]
pub struct TaskExecutor {
    registry: Arc<AgentRegistry>,
    service: Arc<dyn AgentService>,
    max_turns: u32,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        service: Arc<dyn AgentService>,
        max_turns: u32,
    ) -> Self {
        Self {
            registry,
            service,
            max_turns: max_turns.max(1),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.service.backend_name()
    }

    pub async fn execute(
        &self,
        agent_id: &str,
        task: &str,
        context: Option<&Value>,
    ) -> Result<AgentResult, AgencyError> {
        let agent = self
            .registry
            .get(agent_id)
            .ok_or_else(|| AgencyError::UnknownAgent(agent_id.to_string()))?;

        tracing::info!(agent = %agent.id, name = %agent.name, "agent processing task");

        let request = SubmitRequest {
            agent_id: agent.id.clone(),
            system_prompt: agent.system_prompt.clone(),
            allowed_tools: agent.allowed_tools.clone(),
            max_turns: self.max_turns,
            turns: vec![ConversationTurn::user(compose_user_turn(task, context))],
        };

        let mut stream = self
            .service
            .submit(request)
            .await
            .map_err(|err| AgencyError::Upstream(format!("{err:#}")))?;

        let mut retained = Vec::new();
        while let Some(item) = stream.next().await {
            let message = item.map_err(|err| {
                tracing::error!(agent = %agent.id, error = %err, "agent stream failed");
                AgencyError::Upstream(format!("{err:#}"))
            })?;
            if message.is_result() {
                retained.push(message);
            }
        }

        let result = AgentResult::from_messages(&agent.id, retained);
        tracing::info!(
            agent = %agent.id,
            recommendations = result.recommendations.len(),
            "agent completed"
        );
        Ok(result)
    }
}
