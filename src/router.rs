use serde::Serialize;

use crate::error::AgencyError;
use crate::registry::{AgentRegistry, FIGMA_VISUAL, OKSANA_CREATIVE, STRATEGIC_DIRECTOR};

pub const PLANNING_KEYWORDS: &[&str] = &["plan", "roadmap", "validate", "architecture", "qa"];
pub const BRAND_KEYWORDS: &[&str] = &["brand", "content", "copy", "description", "tone", "seo"];
pub const DESIGN_KEYWORDS: &[&str] = &[
    "design",
    "component",
    "ui",
    "swiftui",
    "react",
    "figma",
    "shopify theme",
];

#[derive(Debug, Clone)]
pub struct KeywordGroup {
    pub label: &'static str,
    pub agent_id: String,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    pub fn new(label: &'static str, agent_id: &str, keywords: &[&str]) -> Self {
        Self {
            label,
            agent_id: agent_id.to_string(),
            keywords: keywords.iter().map(|k| k.to_ascii_lowercase()).collect(),
        }
    }

    /// Plain substring test against already lower-cased text.
    fn matches(&self, lower: &str) -> bool {
        self.keywords.iter().any(|keyword| lower.contains(keyword.as_str()))
    }
}

pub fn builtin_keyword_groups() -> Vec<KeywordGroup> {
    vec![
        KeywordGroup::new("planning", STRATEGIC_DIRECTOR, PLANNING_KEYWORDS),
        KeywordGroup::new("brand", OKSANA_CREATIVE, BRAND_KEYWORDS),
        KeywordGroup::new("design", FIGMA_VISUAL, DESIGN_KEYWORDS),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub agents: Vec<String>,
    /// True when no keyword matched and the default agent was used.
    pub fallback: bool,
}

/// Flat keyword classifier. Groups are checked in declaration order and never ranked.
#[derive(Debug, Clone)]
pub struct TaskRouter {
    groups: Vec<KeywordGroup>,
    default_agent: String,
}

impl TaskRouter {
    pub fn new(
        registry: &AgentRegistry,
        groups: Vec<KeywordGroup>,
        default_agent: &str,
    ) -> Result<Self, AgencyError> {
        if !registry.contains(default_agent) {
            return Err(AgencyError::Configuration(format!(
                "default agent '{default_agent}' is not registered"
            )));
        }
        for group in &groups {
            if !registry.contains(&group.agent_id) {
                return Err(AgencyError::Configuration(format!(
                    "keyword group '{}' routes to unregistered agent '{}'",
                    group.label, group.agent_id
                )));
            }
        }
        Ok(Self {
            groups,
            default_agent: default_agent.to_string(),
        })
    }

    pub fn builtin(registry: &AgentRegistry) -> Result<Self, AgencyError> {
        Self::new(registry, builtin_keyword_groups(), STRATEGIC_DIRECTOR)
    }

    pub fn route(&self, task: &str) -> Route {
        let lower = task.to_lowercase();
        let mut agents: Vec<String> = Vec::new();

        for group in &self.groups {
            if group.matches(&lower) && !agents.contains(&group.agent_id) {
                agents.push(group.agent_id.clone());
            }
        }

        if agents.is_empty() {
            tracing::debug!(default = %self.default_agent, "no keyword matched, using default agent");
            return Route {
                agents: vec![self.default_agent.clone()],
                fallback: true,
            };
        }

        Route {
            agents,
            fallback: false,
        }
    }

    pub fn select_agents(&self, task: &str) -> Vec<String> {
        self.route(task).agents
    }

    pub fn groups(&self) -> &[KeywordGroup] {
        &self.groups
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }
}
