/// Coordinator - router, executor and synthesizer invoked as one unit per task.
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::AgentFailurePolicy;
use crate::executor::{AgentResult, TaskExecutor};
use crate::registry::AgentRegistry;
use crate::router::TaskRouter;
use crate::service::AgentService;
use crate::synthesis::synthesize;
use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentFailure {
    pub agent: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatedResult {
    pub task_description: String,
    pub timestamp: String,
    /// Never empty: the router falls back to its default agent.
    pub agents_used: Vec<String>,
    pub used_fallback: bool,
    pub results: Vec<AgentResult>,
    pub unified_recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AgentFailure>,
}

impl CoordinatedResult {
    /// Agent summaries joined in execution order.
    pub fn payload(&self) -> String {
        self.results
            .iter()
            .map(|result| result.summary.trim())
            .filter(|summary| !summary.is_empty())
            .collect::<Vec<&str>>()
            .join("\n\n")
    }

    pub fn format_summary(&self) -> String {
        let mut out = format!("## Task: {}\n\n", self.task_description);
        out.push_str(&format!("**Agents:** {}", self.agents_used.join(", ")));
        if self.used_fallback {
            out.push_str(" (default, no keyword matched)");
        }
        out.push_str("\n\n");

        for result in &self.results {
            out.push_str(&format!("### {}\n{}\n\n", result.agent, result.summary.trim()));
        }

        for line in &self.unified_recommendations {
            out.push_str(line);
            out.push('\n');
        }

        if !self.next_steps.is_empty() {
            out.push_str("\n## Next Steps\n");
            for step in &self.next_steps {
                out.push_str(&format!("- {step}\n"));
            }
        }

        if !self.failures.is_empty() {
            out.push_str("\n## Failed Agents\n");
            for failure in &self.failures {
                out.push_str(&format!("- {}: {}\n", failure.agent, failure.error));
            }
        }

        out
    }
}

#[derive(Clone)]
pub struct Coordinator {
    registry: Arc<AgentRegistry>,
    router: TaskRouter,
    executor: TaskExecutor,
    failure_policy: AgentFailurePolicy,
    telemetry: TelemetrySink,
}

impl Coordinator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        router: TaskRouter,
        executor: TaskExecutor,
        failure_policy: AgentFailurePolicy,
        telemetry: TelemetrySink,
    ) -> Self {
        Self {
            registry,
            router,
            executor,
            failure_policy,
            telemetry,
        }
    }

    /// Built-in registry and keyword groups over the given service.
    pub fn builtin(
        service: Arc<dyn AgentService>,
        max_turns: u32,
        failure_policy: AgentFailurePolicy,
        telemetry: TelemetrySink,
    ) -> Result<Self> {
        let registry = Arc::new(AgentRegistry::builtin());
        let router = TaskRouter::builtin(&registry)?;
        let executor = TaskExecutor::new(registry.clone(), service, max_turns);
        Ok(Self::new(registry, router, executor, failure_policy, telemetry))
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn router(&self) -> &TaskRouter {
        &self.router
    }

    pub async fn coordinate(
        &self,
        task: &str,
        context: Option<&Value>,
    ) -> Result<CoordinatedResult> {
        let route = self.router.route(task);
        tracing::info!(
            task = %task,
            agents = ?route.agents,
            fallback = route.fallback,
            "coordinating task"
        );
        self.telemetry.emit(
            "coordinator.started",
            json!({ "agents": route.agents, "fallback": route.fallback }),
        );

        let mut results = Vec::with_capacity(route.agents.len());
        let mut failures = Vec::new();
        for agent_id in &route.agents {
            match self.executor.execute(agent_id, task, context).await {
                Ok(result) => {
                    self.telemetry.emit(
                        "agent.completed",
                        json!({
                            "agent": agent_id,
                            "recommendations": result.recommendations.len(),
                        }),
                    );
                    results.push(result);
                }
                Err(err) => {
                    self.telemetry.emit(
                        "agent.failed",
                        json!({ "agent": agent_id, "error": err.to_string() }),
                    );
                    match self.failure_policy {
                        AgentFailurePolicy::Abort => return Err(err.into()),
                        AgentFailurePolicy::Isolate => {
                            tracing::warn!(agent = %agent_id, error = %err, "agent failed, continuing");
                            failures.push(AgentFailure {
                                agent: agent_id.clone(),
                                error: err.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let synthesis = synthesize(&results);

        Ok(CoordinatedResult {
            task_description: task.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            agents_used: route.agents,
            used_fallback: route.fallback,
            results,
            unified_recommendations: synthesis.recommendations,
            next_steps: synthesis.next_steps,
            failures,
        })
    }
}
