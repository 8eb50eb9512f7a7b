/// Phase orchestrator - runs the manifest-driven generation phases through the coordinator
/// and records one execution report per phase.
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::cli::OrchestrateArgs;
use crate::config::{REPORT_FILE_NAME, RuntimeConfig};
use crate::coordinator::Coordinator;
use crate::manifest::{GAME_RULES_PLACEHOLDER, PhaseManifests};
use crate::telemetry::TelemetrySink;

pub const SVG_DIR: &str = "svg-components";
pub const GAME_DIR: &str = "hexecute-game";
pub const VISION_PRO_DIR: &str = "vision-pro-ui-kit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub generate_svgs: bool,
    pub build_game: bool,
    pub create_vision_pro_kit: bool,
    pub run_in_parallel: bool,
    pub output_dir: PathBuf,
    pub rules_path: PathBuf,
}

impl OrchestratorConfig {
    /// Applies the phase switches; `--*-only` flags win over `--full-suite` and `--no-*`.
    pub fn from_args(args: &OrchestrateArgs, cfg: &RuntimeConfig) -> Self {
        let mut config = Self {
            generate_svgs: !args.no_svg,
            build_game: !args.no_game,
            create_vision_pro_kit: !args.no_vision_pro,
            run_in_parallel: args.parallel,
            output_dir: PathBuf::from(&cfg.output_dir),
            rules_path: PathBuf::from(args.rules_path.as_deref().unwrap_or(&cfg.rules_path)),
        };

        if args.full_suite {
            config.generate_svgs = true;
            config.build_game = true;
            config.create_vision_pro_kit = true;
        }
        if args.svg_only {
            config.generate_svgs = true;
            config.build_game = false;
            config.create_vision_pro_kit = false;
        }
        if args.game_only {
            config.generate_svgs = false;
            config.build_game = true;
            config.create_vision_pro_kit = false;
        }
        if args.vision_pro_only {
            config.generate_svgs = false;
            config.build_game = false;
            config.create_vision_pro_kit = true;
        }
        config
    }

    pub fn selected_phases(&self) -> Vec<Phase> {
        let mut phases = Vec::new();
        if self.generate_svgs {
            phases.push(Phase::SvgLibrary);
        }
        if self.build_game {
            phases.push(Phase::HexecuteGame);
        }
        if self.create_vision_pro_kit {
            phases.push(Phase::VisionProKit);
        }
        phases
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE_NAME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SvgLibrary,
    HexecuteGame,
    VisionProKit,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::SvgLibrary => "SVG Generation",
            Phase::HexecuteGame => "Hexecute Game",
            Phase::VisionProKit => "Vision Pro UI Kit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub phase: String,
    /// Milliseconds.
    pub duration: u64,
    pub success: bool,
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub duration: u64,
    pub results: Vec<ExecutionReport>,
}

impl RunReport {
    pub fn total_artifacts(&self) -> usize {
        self.results.iter().map(|r| r.artifacts.len()).sum()
    }

    pub fn successful_phases(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn format_summary(&self) -> String {
        let mut out = String::from("Execution report\n");
        for result in &self.results {
            let status = if result.success { "OK" } else { "FAILED" };
            out.push_str(&format!("[{status}] {}\n", result.phase));
            out.push_str(&format!(
                "   Duration: {:.1}s\n",
                result.duration as f64 / 1000.0
            ));
            out.push_str(&format!("   Artifacts: {}\n", result.artifacts.len()));
            if !result.errors.is_empty() {
                out.push_str(&format!("   Errors: {}\n", result.errors.len()));
                for error in &result.errors {
                    out.push_str(&format!("      - {error}\n"));
                }
            }
        }
        out.push_str(&format!(
            "Total time: {:.1}s\nTotal artifacts: {}\nSuccessful phases: {}/{}\n",
            self.duration as f64 / 1000.0,
            self.total_artifacts(),
            self.successful_phases(),
            self.results.len()
        ));
        out
    }
}

/// How the selected phases are scheduled. Both strategies run the same phase bodies.
#[async_trait(?Send)]
pub trait ExecutionStrategy {
    fn label(&self) -> &'static str;

    async fn execute(&self, orchestrator: &PhaseOrchestrator, phases: &[Phase])
    -> Vec<ExecutionReport>;
}

/// One phase after another. A failed phase does not stop the next one.
pub struct SequentialStrategy;

#[async_trait(?Send)]
impl ExecutionStrategy for SequentialStrategy {
    fn label(&self) -> &'static str {
        "sequential"
    }

    async fn execute(
        &self,
        orchestrator: &PhaseOrchestrator,
        phases: &[Phase],
    ) -> Vec<ExecutionReport> {
        let mut reports = Vec::with_capacity(phases.len());
        for phase in phases {
            reports.push(orchestrator.run_phase(*phase).await);
        }
        reports
    }
}

/// All phases polled together on the current task; every phase settles on its own.
pub struct ConcurrentStrategy;

#[async_trait(?Send)]
impl ExecutionStrategy for ConcurrentStrategy {
    fn label(&self) -> &'static str {
        "concurrent"
    }

    async fn execute(
        &self,
        orchestrator: &PhaseOrchestrator,
        phases: &[Phase],
    ) -> Vec<ExecutionReport> {
        futures::future::join_all(phases.iter().map(|phase| orchestrator.run_phase(*phase))).await
    }
}

pub fn strategy_for(run_in_parallel: bool) -> Box<dyn ExecutionStrategy> {
    if run_in_parallel {
        Box::new(ConcurrentStrategy)
    } else {
        Box::new(SequentialStrategy)
    }
}

/// First fenced code block of `payload`, or the whole payload when there is none.
pub fn extract_artifact(payload: &str) -> String {
    let mut lines = payload.lines();
    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("```") {
            let body = lines
                .by_ref()
                .take_while(|l| !l.trim_start().starts_with("```"))
                .collect::<Vec<&str>>();
            return format!("{}\n", body.join("\n"));
        }
    }
    payload.to_string()
}

pub struct PhaseOrchestrator {
    coordinator: Coordinator,
    manifests: PhaseManifests,
    output_dir: PathBuf,
    rules_path: PathBuf,
    telemetry: TelemetrySink,
}

impl PhaseOrchestrator {
    pub fn new(
        coordinator: Coordinator,
        manifests: PhaseManifests,
        config: &OrchestratorConfig,
        telemetry: TelemetrySink,
    ) -> Self {
        Self {
            coordinator,
            manifests,
            output_dir: config.output_dir.clone(),
            rules_path: config.rules_path.clone(),
            telemetry,
        }
    }

    pub async fn run(&self, config: &OrchestratorConfig) -> Result<RunReport> {
        let started = Instant::now();
        let phases = config.selected_phases();
        let strategy = strategy_for(config.run_in_parallel);
        tracing::info!(
            phases = ?phases.iter().map(|p| p.name()).collect::<Vec<_>>(),
            strategy = strategy.label(),
            items = self.manifests.total_items(),
            "starting orchestrator run"
        );

        let results = strategy.execute(self, &phases).await;

        let report = RunReport {
            timestamp: Utc::now().to_rfc3339(),
            duration: started.elapsed().as_millis() as u64,
            results,
        };
        write_report(&report, &config.report_path()).await?;
        Ok(report)
    }

    /// Runs one phase body; any error it raises ends the phase as failed.
    pub async fn run_phase(&self, phase: Phase) -> ExecutionReport {
        let started = Instant::now();
        let mut artifacts = Vec::new();
        tracing::info!(phase = phase.name(), "phase started");

        let outcome = match phase {
            Phase::SvgLibrary => self.svg_library(&mut artifacts).await,
            Phase::HexecuteGame => self.hexecute_game(&mut artifacts).await,
            Phase::VisionProKit => self.vision_pro_kit(&mut artifacts).await,
        };

        let errors = match &outcome {
            Ok(()) => Vec::new(),
            Err(err) => {
                tracing::error!(phase = phase.name(), error = %format!("{err:#}"), "phase failed");
                vec![format!("{err:#}")]
            }
        };
        let report = ExecutionReport {
            phase: phase.name().to_string(),
            duration: started.elapsed().as_millis() as u64,
            success: outcome.is_ok(),
            artifacts,
            errors,
        };

        self.telemetry.emit(
            "phase.completed",
            json!({
                "phase": report.phase,
                "success": report.success,
                "artifacts": report.artifacts.len(),
                "duration_ms": report.duration,
            }),
        );
        tracing::info!(
            phase = phase.name(),
            success = report.success,
            artifacts = report.artifacts.len(),
            "phase finished"
        );
        report
    }

    async fn svg_library(&self, artifacts: &mut Vec<String>) -> Result<()> {
        let dir = self.output_dir.join(SVG_DIR);
        for component in &self.manifests.svg {
            tracing::debug!(component = %component.name, "generating svg component");
            let task = format!(
                "Generate SVG component: {} with {} theme",
                component.name, component.theme
            );
            let context = json!({
                "skill": "svg-generation",
                "component": component,
                "brand": "9bit-studios",
            });
            let result = self.coordinator.coordinate(&task, Some(&context)).await?;
            let path = dir.join(format!("{}.svg", component.name));
            write_artifact(&path, &artifact_text(&result.payload(), &task)?).await?;
            artifacts.push(path.display().to_string());
        }
        Ok(())
    }

    async fn hexecute_game(&self, artifacts: &mut Vec<String>) -> Result<()> {
        let dir = self.output_dir.join(GAME_DIR);
        let rules = load_rules(&self.rules_path).await;

        let task = "Create Hexecute game architecture based on the provided rules";
        let architecture = self
            .coordinator
            .coordinate(
                task,
                Some(&json!({
                    "skill": "hexecute-game-development",
                    "rules": rules,
                    "platform": "macos",
                    "framework": "metal",
                    "theme": "quantum-spatial",
                })),
            )
            .await?;
        let architecture_text = non_empty_payload(&architecture.payload(), task)?;
        let path = dir.join("ARCHITECTURE.md");
        write_artifact(&path, &architecture_text).await?;
        artifacts.push(path.display().to_string());

        for file in &self.manifests.game_files {
            tracing::debug!(file = %file, "generating game file");
            let task = format!("Generate {file} for the Hexecute game engine");
            let context = json!({
                "skill": "hexecute-game-development",
                "file": file,
                "rules": rules,
                "architecture": architecture_text,
            });
            let result = self.coordinator.coordinate(&task, Some(&context)).await?;
            let path = dir.join(file);
            write_artifact(&path, &artifact_text(&result.payload(), &task)?).await?;
            artifacts.push(path.display().to_string());
        }
        Ok(())
    }

    async fn vision_pro_kit(&self, artifacts: &mut Vec<String>) -> Result<()> {
        let dir = self.output_dir.join(VISION_PRO_DIR);
        for category in &self.manifests.vision_pro {
            tracing::debug!(category = category.name, count = category.count, "generating category");
            for i in 0..category.count {
                let name = format!("{}_{}", category.name, i + 1);
                let task = format!("Generate Vision Pro {} component", category.name);
                let context = json!({
                    "skill": "vision-pro-ui-kit",
                    "category": category.name.to_lowercase(),
                    "theme": "quantum-spatial",
                    "realityKit": true,
                });
                let result = self.coordinator.coordinate(&task, Some(&context)).await?;
                let path = dir.join(format!("{name}.swift"));
                write_artifact(&path, &artifact_text(&result.payload(), &task)?).await?;
                artifacts.push(path.display().to_string());
            }
        }
        Ok(())
    }
}

/// Extracted artifact for `task`; an empty artifact (or an empty fenced block) is an error.
fn artifact_text(payload: &str, task: &str) -> Result<String> {
    let artifact = extract_artifact(payload);
    if artifact.trim().is_empty() {
        return Err(anyhow::anyhow!("no agent output produced for '{task}'"));
    }
    Ok(artifact)
}

fn non_empty_payload(payload: &str, task: &str) -> Result<String> {
    if payload.trim().is_empty() {
        return Err(anyhow::anyhow!("no agent output produced for '{task}'"));
    }
    Ok(payload.to_string())
}

async fn load_rules(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(rules) => rules,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "game rules unavailable, using placeholder");
            GAME_RULES_PLACEHOLDER.to_string()
        }
    }
}

async fn write_artifact(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write artifact '{}'", path.display()))
}

pub async fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let payload =
        serde_json::to_string_pretty(report).context("failed to serialize execution report")?;
    write_artifact(path, &payload).await?;
    tracing::info!(path = %path.display(), "execution report saved");
    Ok(())
}
