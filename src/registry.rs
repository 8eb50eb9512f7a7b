/// Agent registry - the fixed set of agent roles a task can be routed to.
use std::collections::HashMap;

use serde::Serialize;

use crate::error::AgencyError;
use crate::prompts::{FIGMA_VISUAL_PROMPT, OKSANA_CREATIVE_PROMPT, STRATEGIC_DIRECTOR_PROMPT};

pub const STRATEGIC_DIRECTOR: &str = "strategic-director";
pub const OKSANA_CREATIVE: &str = "oksana-creative";
pub const FIGMA_VISUAL: &str = "figma-visual";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
    pub allowed_tools: Vec<String>,
    /// Display ordering only; routing never looks at it.
    pub priority: u8,
    pub pathway: String,
    pub skills: Vec<String>,
}

impl AgentDescriptor {
    fn builtin(
        id: &str,
        name: &str,
        system_prompt: &str,
        allowed_tools: &[&str],
        priority: u8,
        pathway: &str,
        skills: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            system_prompt: system_prompt.to_string(),
            allowed_tools: allowed_tools.iter().map(|t| t.to_string()).collect(),
            priority,
            pathway: pathway.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Immutable id -> descriptor map. Built once and shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    order: Vec<String>,
    agents: HashMap<String, AgentDescriptor>,
}

impl AgentRegistry {
    pub fn builtin() -> Self {
        let descriptors = vec![
            AgentDescriptor::builtin(
                STRATEGIC_DIRECTOR,
                "Strategic Director Agent",
                STRATEGIC_DIRECTOR_PROMPT,
                &["Read", "Write", "Edit", "Grep", "Glob", "Bash", "Task"],
                1,
                "strategic_intelligence",
                &["strategic-planning", "technical-validation", "workflow-orchestration"],
            ),
            AgentDescriptor::builtin(
                OKSANA_CREATIVE,
                "Oksana Creative Intelligence Agent",
                OKSANA_CREATIVE_PROMPT,
                &["Read", "Grep", "Search", "Task"],
                2,
                "creative_intelligence",
                &["brand-voice-validation", "agency-copywriting", "seo-optimization"],
            ),
            AgentDescriptor::builtin(
                FIGMA_VISUAL,
                "Figma Framer Swift Visual Intelligence Agent",
                FIGMA_VISUAL_PROMPT,
                &["Read", "Write", "Edit", "Grep", "Glob", "Bash"],
                1,
                "quantum_spatial",
                &["design-system-automation", "hig-compliance", "component-generation"],
            ),
        ];

        let mut registry = Self {
            order: Vec::with_capacity(descriptors.len()),
            agents: HashMap::with_capacity(descriptors.len()),
        };
        for descriptor in descriptors {
            registry.order.push(descriptor.id.clone());
            registry.agents.insert(descriptor.id.clone(), descriptor);
        }
        registry
    }

    pub fn from_descriptors(descriptors: Vec<AgentDescriptor>) -> Result<Self, AgencyError> {
        let mut order = Vec::with_capacity(descriptors.len());
        let mut agents = HashMap::with_capacity(descriptors.len());
        for mut descriptor in descriptors {
            let id = descriptor.id.trim().to_string();
            if id.is_empty() {
                return Err(AgencyError::Configuration(
                    "agent id cannot be empty".to_string(),
                ));
            }
            if agents.contains_key(&id) {
                return Err(AgencyError::Configuration(format!(
                    "duplicate agent id '{id}'"
                )));
            }
            descriptor.id = id.clone();
            order.push(id.clone());
            agents.insert(id, descriptor);
        }
        Ok(Self { order, agents })
    }

    pub fn get(&self, id: &str) -> Option<&AgentDescriptor> {
        self.agents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> Vec<&AgentDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.agents.get(id))
            .collect()
    }

    pub fn by_priority(&self) -> Vec<&AgentDescriptor> {
        let mut agents = self.list();
        agents.sort_by_key(|agent| agent.priority);
        agents
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
