use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::agents::{run_agents_list, run_agents_show};
use crate::cli::{AgentCommands, Cli, Commands, ProfileCommands, TelemetryCommands, command_label};
use crate::config::{ProfilesFile, RuntimeConfig};
use crate::coordinator::Coordinator;
use crate::doctor::run_doctor;
use crate::manifest::PhaseManifests;
use crate::orchestrator::{OrchestratorConfig, PhaseOrchestrator};
use crate::profiles::{run_profiles_list, run_profiles_show};
use crate::provider::resolve_service;
use crate::registry::AgentRegistry;
use crate::router::TaskRouter;
use crate::service::AgentService;
use crate::telemetry::{TelemetrySink, run_telemetry_report};

/// Parses the `--context` flag. Only JSON objects are accepted.
pub fn parse_context(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw).context("context must be valid JSON")?;
    if !value.is_object() {
        return Err(anyhow::anyhow!(
            "context must be a JSON object, e.g. '{{\"brand\":\"acme\"}}'"
        ));
    }
    Ok(Some(value))
}

fn build_coordinator(cfg: &RuntimeConfig, telemetry: &TelemetrySink) -> Result<Coordinator> {
    let (service, provider, model_name) = resolve_service(cfg)?;
    tracing::info!(provider = ?provider, model = %model_name, backend = service.backend_name(), "Using agent service");
    coordinator_with_service(service, cfg, telemetry)
}

pub fn coordinator_with_service(
    service: Arc<dyn AgentService>,
    cfg: &RuntimeConfig,
    telemetry: &TelemetrySink,
) -> Result<Coordinator> {
    Coordinator::builtin(service, cfg.max_turns, cfg.failure_policy, telemetry.clone())
}

pub async fn run_cli(cli: Cli, profiles: &ProfilesFile, cfg: RuntimeConfig) -> Result<()> {
    let telemetry = TelemetrySink::new(&cfg, command_label(&cli.command).to_string());
    let started = Instant::now();

    let outcome = dispatch(cli.command, profiles, &cfg, &telemetry).await;
    match &outcome {
        Ok(()) => telemetry.emit(
            "command.completed",
            json!({ "duration_ms": started.elapsed().as_millis() as u64 }),
        ),
        Err(err) => telemetry.emit(
            "command.failed",
            json!({
                "duration_ms": started.elapsed().as_millis() as u64,
                "error": format!("{err:#}"),
            }),
        ),
    }
    outcome
}

async fn dispatch(
    command: Commands,
    profiles: &ProfilesFile,
    cfg: &RuntimeConfig,
    telemetry: &TelemetrySink,
) -> Result<()> {
    match command {
        Commands::Route { task } => {
            let registry = AgentRegistry::builtin();
            let router = TaskRouter::builtin(&registry)?;
            let route = router.route(&task.join(" "));
            for id in &route.agents {
                let name = registry
                    .get(id)
                    .map(|a| a.name.as_str())
                    .unwrap_or(id.as_str());
                println!("{id} ({name})");
            }
            if route.fallback {
                println!(
                    "No keyword matched; using default agent '{}'.",
                    router.default_agent()
                );
            }
        }
        Commands::Ask {
            task,
            context,
            json,
        } => {
            let context = parse_context(context.as_deref())?;
            let coordinator = build_coordinator(cfg, telemetry)?;
            let result = coordinator
                .coordinate(&task.join(" "), context.as_ref())
                .await?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result)
                        .context("failed to serialize coordinated result")?
                );
            } else {
                println!("{}", result.format_summary());
            }
        }
        Commands::Agents { command } => {
            let registry = AgentRegistry::builtin();
            match command {
                AgentCommands::List => {
                    let router = TaskRouter::builtin(&registry)?;
                    run_agents_list(&registry, &router)?;
                }
                AgentCommands::Show { id, full_prompt } => {
                    run_agents_show(&registry, &id, full_prompt)?;
                }
            }
        }
        Commands::Orchestrate(args) => {
            let config = OrchestratorConfig::from_args(&args, cfg);
            let coordinator = build_coordinator(cfg, telemetry)?;
            let orchestrator = PhaseOrchestrator::new(
                coordinator,
                PhaseManifests::builtin(),
                &config,
                telemetry.clone(),
            );
            let report = tokio::select! {
                report = orchestrator.run(&config) => report?,
                _ = tokio::signal::ctrl_c() => {
                    return Err(anyhow::anyhow!(
                        "orchestrator run interrupted; artifacts written so far are kept and no report was saved"
                    ));
                }
            };
            println!("{}", report.format_summary());
            println!("Report written to {}", config.report_path().display());
        }
        Commands::Doctor => run_doctor(cfg)?,
        Commands::Profiles { command } => match command {
            ProfileCommands::List => run_profiles_list(profiles, cfg)?,
            ProfileCommands::Show => run_profiles_show(cfg)?,
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { path, limit } => run_telemetry_report(cfg, path, limit)?,
        },
    }
    Ok(())
}
