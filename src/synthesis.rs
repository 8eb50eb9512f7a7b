use std::collections::HashSet;

use crate::executor::AgentResult;
use crate::registry::{FIGMA_VISUAL, OKSANA_CREATIVE, STRATEGIC_DIRECTOR};

pub const RECOMMENDATIONS_HEADING: &str = "## Unified Multi-Agent Recommendations";

pub const STRATEGIC_DIRECTOR_NEXT_STEP: &str =
    "Strategic Director approval required before deployment";
pub const OKSANA_CREATIVE_NEXT_STEP: &str =
    "Brand voice validation completed - integrate copy into implementation";
pub const FIGMA_VISUAL_NEXT_STEP: &str = "Component implementation ready - requires HIG validation";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Synthesis {
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

pub fn next_step_for(agent_id: &str) -> Option<&'static str> {
    match agent_id {
        STRATEGIC_DIRECTOR => Some(STRATEGIC_DIRECTOR_NEXT_STEP),
        OKSANA_CREATIVE => Some(OKSANA_CREATIVE_NEXT_STEP),
        FIGMA_VISUAL => Some(FIGMA_VISUAL_NEXT_STEP),
        _ => None,
    }
}

pub fn unify_recommendations(results: &[AgentResult]) -> Vec<String> {
    let mut seen = HashSet::<&str>::new();
    let mut unified = vec![RECOMMENDATIONS_HEADING.to_string()];

    for rec in results.iter().flat_map(|r| r.recommendations.iter()) {
        if seen.insert(rec.as_str()) {
            unified.push(format!("{}. {}", seen.len(), rec));
        }
    }

    unified
}

pub fn next_steps(results: &[AgentResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|result| next_step_for(&result.agent))
        .map(str::to_string)
        .collect()
}

/// Pure; performs no I/O.
pub fn synthesize(results: &[AgentResult]) -> Synthesis {
    Synthesis {
        recommendations: unify_recommendations(results),
        next_steps: next_steps(results),
    }
}
