use anyhow::Result;

use crate::registry::AgentRegistry;
use crate::router::TaskRouter;

pub fn run_agents_list(registry: &AgentRegistry, router: &TaskRouter) -> Result<()> {
    println!("Registered agents ({}, by priority):", registry.len());
    for agent in registry.by_priority() {
        let marker = if agent.id == router.default_agent() {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {} - {} (priority={}, pathway={})",
            agent.id, agent.name, agent.priority, agent.pathway
        );
    }
    println!("Routing groups (checked in order):");
    for group in router.groups() {
        println!(
            "- {} -> {}: {}",
            group.label,
            group.agent_id,
            group.keywords.join(", ")
        );
    }
    println!("Default agent: {}", router.default_agent());
    Ok(())
}

pub fn run_agents_show(registry: &AgentRegistry, id: &str, full_prompt: bool) -> Result<()> {
    let agent = registry.get(id.trim()).ok_or_else(|| {
        anyhow::anyhow!(
            "agent '{}' not found. Available agents: {}",
            id.trim(),
            registry.ids().join(", ")
        )
    })?;

    println!("Agent: {} ({})", agent.name, agent.id);
    println!("Priority: {}", agent.priority);
    println!("Pathway: {}", agent.pathway);
    println!(
        "Skills: {}",
        if agent.skills.is_empty() {
            "<none>".to_string()
        } else {
            agent.skills.join(", ")
        }
    );
    println!(
        "Allowed tools: {}",
        if agent.allowed_tools.is_empty() {
            "<none>".to_string()
        } else {
            agent.allowed_tools.join(", ")
        }
    );
    if full_prompt {
        println!("System prompt:\n{}", agent.system_prompt);
    } else {
        let first_line = agent.system_prompt.lines().next().unwrap_or_default();
        println!(
            "System prompt: {} ({} chars, use --full-prompt to print)",
            first_line,
            agent.system_prompt.len()
        );
    }
    Ok(())
}
