use std::path::PathBuf;
use std::sync::Arc;

use futures::TryStreamExt;
use serde_json::{Value, json};
use tempfile::tempdir;

use crate::anthropic::*;
use crate::cli::*;
use crate::config::*;
use crate::coordinator::*;
use crate::error::*;
use crate::executor::*;
use crate::manifest::*;
use crate::orchestrator::*;
use crate::provider::*;
use crate::registry::*;
use crate::router::*;
use crate::runner::*;
use crate::service::*;
use crate::synthesis::*;
use crate::telemetry::*;

fn base_cfg() -> RuntimeConfig {
    RuntimeConfig {
        profile: "default".to_string(),
        config_path: ".agency/config.toml".to_string(),
        provider: Provider::Offline,
        model: None,
        api_base_url: "https://api.anthropic.com".to_string(),
        max_turns: DEFAULT_MAX_TURNS,
        request_timeout_secs: 300,
        failure_policy: AgentFailurePolicy::Abort,
        output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        rules_path: DEFAULT_RULES_PATH.to_string(),
        telemetry_enabled: false,
        telemetry_path: ".agency/telemetry/events.jsonl".to_string(),
    }
}

fn test_cli(config_path: &str, profile: &str) -> Cli {
    Cli {
        provider: Provider::Auto,
        model: None,
        profile: profile.to_string(),
        config_path: config_path.to_string(),
        max_turns: None,
        failure_policy: None,
        output_dir: None,
        request_timeout_secs: None,
        telemetry_enabled: None,
        telemetry_path: None,
        log_filter: "warn".to_string(),
        command: Commands::Doctor,
    }
}

fn builtin_router() -> TaskRouter {
    TaskRouter::builtin(&AgentRegistry::builtin()).expect("builtin router should validate")
}

fn executor_with(service: &ScriptedService) -> TaskExecutor {
    TaskExecutor::new(
        Arc::new(AgentRegistry::builtin()),
        Arc::new(service.clone()),
        DEFAULT_MAX_TURNS,
    )
}

fn coordinator_with(service: &ScriptedService, policy: AgentFailurePolicy) -> Coordinator {
    Coordinator::builtin(
        Arc::new(service.clone()),
        DEFAULT_MAX_TURNS,
        policy,
        TelemetrySink::disabled(),
    )
    .expect("coordinator should build")
}

fn agent_result(agent: &str, recommendations: &[&str]) -> AgentResult {
    AgentResult {
        agent: agent.to_string(),
        timestamp: "2025-01-01T00:00:00Z".to_string(),
        messages: Vec::new(),
        summary: recommendations.join("\n"),
        recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
    }
}

/// Fails every request whose task mentions `needle`, answers the rest with a fenced block.
fn failing_on(needle: &'static str) -> ScriptedService {
    ScriptedService::new(move |request| {
        if request.first_user_turn().unwrap_or_default().contains(needle) {
            vec![Err("quota exhausted".to_string())]
        } else {
            vec![Ok(AgentMessage::result("```\nbody\n```"))]
        }
    })
}

fn small_manifests() -> PhaseManifests {
    PhaseManifests {
        svg: vec![
            SvgComponent {
                name: "QuantumSpatial_1".to_string(),
                kind: SvgKind::Animated,
                theme: QUANTUM_SPATIAL_THEME,
            },
            SvgComponent {
                name: "Heritage_1".to_string(),
                kind: SvgKind::Static,
                theme: HERITAGE_THEME,
            },
        ],
        game_files: vec!["HexagonalGrid.swift".to_string()],
        vision_pro: vec![VisionProCategory {
            name: "Primitives",
            count: 2,
        }],
    }
}

fn orchestrator_config(output_dir: PathBuf, run_in_parallel: bool) -> OrchestratorConfig {
    OrchestratorConfig {
        generate_svgs: true,
        build_game: true,
        create_vision_pro_kit: true,
        run_in_parallel,
        rules_path: output_dir.join("missing-rules.md"),
        output_dir,
    }
}

// Registry

#[test]
fn builtin_registry_lists_agents_in_registration_order() {
    let registry = AgentRegistry::builtin();
    let ids = registry
        .list()
        .iter()
        .map(|agent| agent.id.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(ids, vec![STRATEGIC_DIRECTOR, OKSANA_CREATIVE, FIGMA_VISUAL]);
    assert_eq!(registry.len(), 3);
    assert!(registry.get("ghost").is_none());
}

#[test]
fn builtin_registry_carries_prompts_and_tools() {
    let registry = AgentRegistry::builtin();
    let oksana = registry.get(OKSANA_CREATIVE).expect("oksana should exist");
    assert_eq!(oksana.allowed_tools, vec!["Read", "Grep", "Search", "Task"]);
    assert_eq!(oksana.priority, 2);
    assert!(!oksana.system_prompt.trim().is_empty());

    let by_priority = registry
        .by_priority()
        .iter()
        .map(|agent| agent.id.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(
        by_priority,
        vec![STRATEGIC_DIRECTOR, FIGMA_VISUAL, OKSANA_CREATIVE]
    );
}

#[test]
fn agent_commands_render_builtin_registry() {
    let registry = AgentRegistry::builtin();
    let router = TaskRouter::builtin(&registry).expect("builtin router should validate");
    crate::agents::run_agents_list(&registry, &router).expect("list should render");
    crate::agents::run_agents_show(&registry, OKSANA_CREATIVE, false).expect("show should render");
    assert!(crate::agents::run_agents_show(&registry, "ghost", false).is_err());
}

#[test]
fn custom_registry_rejects_duplicate_and_empty_ids() {
    let registry = AgentRegistry::builtin();
    let descriptor = registry
        .get(FIGMA_VISUAL)
        .cloned()
        .expect("figma should exist");

    let err = AgentRegistry::from_descriptors(vec![descriptor.clone(), descriptor.clone()])
        .expect_err("duplicate ids should fail");
    assert!(err.to_string().contains("duplicate agent id 'figma-visual'"));

    let mut blank = descriptor;
    blank.id = "  ".to_string();
    assert!(AgentRegistry::from_descriptors(vec![blank]).is_err());
}

#[tokio::test]
async fn custom_registry_normalizes_padded_ids() {
    let mut descriptor = AgentRegistry::builtin()
        .get(FIGMA_VISUAL)
        .cloned()
        .expect("figma should exist");
    descriptor.id = format!(" {FIGMA_VISUAL} ");
    let registry =
        Arc::new(AgentRegistry::from_descriptors(vec![descriptor]).expect("registry should build"));

    let agent = registry.get(FIGMA_VISUAL).expect("trimmed id should resolve");
    assert_eq!(agent.id, FIGMA_VISUAL);
    assert_eq!(registry.ids(), [FIGMA_VISUAL.to_string()]);

    let service = ScriptedService::replying("done");
    let executor = TaskExecutor::new(registry, Arc::new(service.clone()), DEFAULT_MAX_TURNS);
    let result = executor
        .execute(FIGMA_VISUAL, "Design", None)
        .await
        .expect("execute should succeed");
    assert_eq!(result.agent, FIGMA_VISUAL);
    assert_eq!(service.requests()[0].agent_id, FIGMA_VISUAL);
    assert_eq!(synthesize(&[result]).next_steps, vec![FIGMA_VISUAL_NEXT_STEP]);
}

// Router

#[test]
fn routes_planning_task_to_strategic_director() {
    let router = builtin_router();
    assert_eq!(
        router.select_agents("Plan the architecture for a new checkout flow"),
        vec![STRATEGIC_DIRECTOR]
    );
}

#[test]
fn routes_brand_task_to_oksana() {
    let router = builtin_router();
    assert_eq!(
        router.select_agents("Write brand-aligned SEO copy for this product description"),
        vec![OKSANA_CREATIVE]
    );
}

#[test]
fn routes_design_task_to_figma_visual() {
    let router = builtin_router();
    assert_eq!(
        router.select_agents("Build a React component using the design system"),
        vec![FIGMA_VISUAL]
    );
}

#[test]
fn routes_mixed_task_to_all_agents_in_group_order() {
    let router = builtin_router();
    let route = router.route(
        "Launch the new game with architecture planning, brand copy, and React components",
    );
    assert_eq!(
        route.agents,
        vec![STRATEGIC_DIRECTOR, OKSANA_CREATIVE, FIGMA_VISUAL]
    );
    assert!(!route.fallback);
}

#[test]
fn routing_is_case_insensitive() {
    let router = builtin_router();
    assert_eq!(router.select_agents("ROADMAP review"), vec![STRATEGIC_DIRECTOR]);
    assert_eq!(
        router.select_agents("new SHOPIFY THEME"),
        vec![FIGMA_VISUAL]
    );
}

#[test]
fn unmatched_or_empty_task_falls_back_to_default_agent() {
    let router = builtin_router();
    for task in ["", "hello world", "   "] {
        let route = router.route(task);
        assert_eq!(route.agents, vec![STRATEGIC_DIRECTOR], "task: {task:?}");
        assert!(route.fallback);
    }
}

#[test]
fn several_keywords_from_one_group_yield_one_agent() {
    let router = builtin_router();
    let agents = router.select_agents("tone, seo and content review");
    assert_eq!(agents, vec![OKSANA_CREATIVE]);
}

#[test]
fn router_rejects_groups_pointing_at_unregistered_agents() {
    let registry = AgentRegistry::builtin();
    let groups = vec![KeywordGroup::new("ops", "ops-agent", &["deploy"])];
    let err = TaskRouter::new(&registry, groups, STRATEGIC_DIRECTOR)
        .expect_err("unknown agent should be rejected");
    assert!(err.to_string().contains("ops-agent"));

    assert!(TaskRouter::new(&registry, Vec::new(), "ghost").is_err());
}

#[test]
fn custom_groups_route_over_custom_registry() {
    let registry = AgentRegistry::builtin();
    let groups = vec![KeywordGroup::new("launch", OKSANA_CREATIVE, &["Launch"])];
    let router =
        TaskRouter::new(&registry, groups, FIGMA_VISUAL).expect("router should validate");
    assert_eq!(router.select_agents("launch week"), vec![OKSANA_CREATIVE]);
    assert_eq!(router.select_agents("anything else"), vec![FIGMA_VISUAL]);
}

// Executor

#[tokio::test]
async fn execute_unknown_agent_fails_before_calling_service() {
    let service = ScriptedService::replying("unused");
    let executor = executor_with(&service);

    let err = executor
        .execute("ghost", "do something", None)
        .await
        .expect_err("unknown agent should fail");
    assert!(matches!(err, AgencyError::UnknownAgent(ref id) if id == "ghost"));
    assert_eq!(err.to_string(), "Unknown agent: ghost");
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn execute_retains_only_result_messages() {
    let service = ScriptedService::new(|_| {
        vec![
            Ok(AgentMessage::assistant("thinking out loud")),
            Ok(AgentMessage::result("Overview\n  We recommend a dark palette  \n")),
            Ok(AgentMessage(json!({ "type": "system", "subtype": "init" }))),
            Ok(AgentMessage::result("You should ship on Friday")),
        ]
    });
    let executor = executor_with(&service);

    let result = executor
        .execute(FIGMA_VISUAL, "Design a hero banner", None)
        .await
        .expect("execute should succeed");

    assert_eq!(result.agent, FIGMA_VISUAL);
    assert_eq!(result.messages.len(), 2);
    assert!(result.messages.iter().all(AgentMessage::is_result));
    assert_eq!(
        result.summary,
        "Overview\n  We recommend a dark palette  \nYou should ship on Friday"
    );
    assert_eq!(
        result.recommendations,
        vec!["We recommend a dark palette", "You should ship on Friday"]
    );
}

#[tokio::test]
async fn execute_sends_prompt_tools_and_context() {
    let service = ScriptedService::replying("done");
    let executor = executor_with(&service);
    let context = json!({ "brand": "9bit-studios" });

    executor
        .execute(OKSANA_CREATIVE, "Write copy", Some(&context))
        .await
        .expect("execute should succeed");

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    let registry = AgentRegistry::builtin();
    let agent = registry.get(OKSANA_CREATIVE).expect("oksana should exist");
    assert_eq!(request.system_prompt, agent.system_prompt);
    assert_eq!(request.allowed_tools, agent.allowed_tools);
    assert_eq!(request.max_turns, DEFAULT_MAX_TURNS);
    assert_eq!(request.turns.len(), 1);
    assert_eq!(
        request.first_user_turn(),
        Some(compose_user_turn("Write copy", Some(&context)).as_str())
    );
    assert!(
        request.turns[0]
            .content
            .starts_with("Write copy\n\nContext:\n")
    );
    assert!(request.turns[0].content.contains("\"brand\": \"9bit-studios\""));
}

#[tokio::test]
async fn execute_without_context_sends_task_verbatim() {
    let service = ScriptedService::replying("done");
    let executor = executor_with(&service);

    executor
        .execute(STRATEGIC_DIRECTOR, "Plan Q3", None)
        .await
        .expect("execute should succeed");
    assert_eq!(service.requests()[0].first_user_turn(), Some("Plan Q3"));
}

#[tokio::test]
async fn execute_propagates_mid_stream_error() {
    let service = ScriptedService::new(|_| {
        vec![
            Ok(AgentMessage::result("partial")),
            Err("connection reset by peer".to_string()),
        ]
    });
    let executor = executor_with(&service);

    let err = executor
        .execute(FIGMA_VISUAL, "Design", None)
        .await
        .expect_err("stream error should propagate");
    assert!(matches!(err, AgencyError::Upstream(ref msg) if msg == "connection reset by peer"));
}

#[test]
fn empty_summary_has_no_recommendations() {
    let result = AgentResult::from_messages(FIGMA_VISUAL, Vec::new());
    assert_eq!(result.summary, "");
    assert!(result.recommendations.is_empty());
}

#[test]
fn recommendation_triggers_are_matched_per_line() {
    let recs =
        extract_recommendations("intro\nthe next step is QA\nShould we? no\n  we should test  ");
    assert_eq!(recs, vec!["the next step is QA", "we should test"]);
}

// Synthesis

#[test]
fn synthesize_dedups_shared_recommendation_across_agents() {
    let results = vec![
        agent_result(STRATEGIC_DIRECTOR, &["ship it"]),
        agent_result(OKSANA_CREATIVE, &["ship it"]),
        agent_result(FIGMA_VISUAL, &["ship it"]),
    ];

    let synthesis = synthesize(&results);
    assert_eq!(
        synthesis.recommendations,
        vec![RECOMMENDATIONS_HEADING.to_string(), "1. ship it".to_string()]
    );
    assert_eq!(
        synthesis.next_steps,
        vec![
            STRATEGIC_DIRECTOR_NEXT_STEP,
            OKSANA_CREATIVE_NEXT_STEP,
            FIGMA_VISUAL_NEXT_STEP
        ]
    );
}

#[test]
fn synthesize_keeps_first_occurrence_order() {
    let results = vec![
        agent_result(FIGMA_VISUAL, &["b", "a"]),
        agent_result(OKSANA_CREATIVE, &["a", "c"]),
    ];
    let synthesis = synthesize(&results);
    assert_eq!(
        synthesis.recommendations,
        vec![RECOMMENDATIONS_HEADING, "1. b", "2. a", "3. c"]
    );
}

#[test]
fn next_steps_follow_participating_known_agents_only() {
    let results = vec![
        agent_result("guest-agent", &["x"]),
        agent_result(FIGMA_VISUAL, &[]),
    ];
    let synthesis = synthesize(&results);
    assert_eq!(synthesis.next_steps, vec![FIGMA_VISUAL_NEXT_STEP]);

    let empty = synthesize(&[]);
    assert_eq!(empty.recommendations, vec![RECOMMENDATIONS_HEADING]);
    assert!(empty.next_steps.is_empty());
}

// Coordinator

#[tokio::test]
async fn coordinate_runs_routed_agents_and_synthesizes() {
    let service = ScriptedService::new(|request| {
        vec![Ok(AgentMessage::result(format!(
            "{} reply\nWe recommend shipping",
            request.agent_id
        )))]
    });
    let coordinator = coordinator_with(&service, AgentFailurePolicy::Abort);

    let result = coordinator
        .coordinate(
            "Launch the new game with architecture planning, brand copy, and React components",
            None,
        )
        .await
        .expect("coordinate should succeed");

    assert_eq!(
        result.agents_used,
        vec![STRATEGIC_DIRECTOR, OKSANA_CREATIVE, FIGMA_VISUAL]
    );
    assert!(!result.used_fallback);
    let order = service
        .requests()
        .iter()
        .map(|r| r.agent_id.clone())
        .collect::<Vec<String>>();
    assert_eq!(order, result.agents_used);
    assert_eq!(
        result.unified_recommendations,
        vec![RECOMMENDATIONS_HEADING, "1. We recommend shipping"]
    );
    assert_eq!(result.next_steps.len(), 3);
    assert!(result.failures.is_empty());
    assert!(result.payload().starts_with("strategic-director reply"));

    let value = serde_json::to_value(&result).expect("result should serialize");
    assert!(value.get("failures").is_none());
    assert_eq!(value["results"][0]["agent"], json!(STRATEGIC_DIRECTOR));
}

#[tokio::test]
async fn coordinate_falls_back_to_default_agent() {
    let service = ScriptedService::replying("ok");
    let coordinator = coordinator_with(&service, AgentFailurePolicy::Abort);

    let result = coordinator
        .coordinate("hello there", None)
        .await
        .expect("coordinate should succeed");
    assert_eq!(result.agents_used, vec![STRATEGIC_DIRECTOR]);
    assert!(result.used_fallback);
    assert!(result.format_summary().contains("no keyword matched"));
}

#[tokio::test]
async fn abort_policy_stops_at_first_failing_agent() {
    let service = ScriptedService::new(|request| {
        if request.agent_id == OKSANA_CREATIVE {
            vec![Err("rate limited".to_string())]
        } else {
            vec![Ok(AgentMessage::result("fine"))]
        }
    });
    let coordinator = coordinator_with(&service, AgentFailurePolicy::Abort);

    let err = coordinator
        .coordinate("plan the brand design", None)
        .await
        .expect_err("abort policy should fail the task");
    assert!(matches!(
        err.downcast_ref::<AgencyError>(),
        Some(AgencyError::Upstream(msg)) if msg == "rate limited"
    ));
    assert_eq!(categorize_error(&err), ErrorCategory::Provider);
    assert_eq!(service.call_count(), 2);
}

#[tokio::test]
async fn isolate_policy_records_failure_and_continues() {
    let service = ScriptedService::new(|request| {
        if request.agent_id == OKSANA_CREATIVE {
            vec![Err("rate limited".to_string())]
        } else {
            vec![Ok(AgentMessage::result("fine"))]
        }
    });
    let coordinator = coordinator_with(&service, AgentFailurePolicy::Isolate);

    let result = coordinator
        .coordinate("plan the brand design", None)
        .await
        .expect("isolate policy should keep going");
    assert_eq!(service.call_count(), 3);
    assert_eq!(result.agents_used.len(), 3);
    let ran = result
        .results
        .iter()
        .map(|r| r.agent.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(ran, vec![STRATEGIC_DIRECTOR, FIGMA_VISUAL]);
    assert_eq!(
        result.failures,
        vec![AgentFailure {
            agent: OKSANA_CREATIVE.to_string(),
            error: "rate limited".to_string(),
        }]
    );
    assert!(!result.next_steps.contains(&OKSANA_CREATIVE_NEXT_STEP.to_string()));
    assert!(result.format_summary().contains("## Failed Agents"));
}

#[tokio::test]
async fn coordinator_emits_agent_telemetry() {
    let dir = tempdir().expect("tempdir should create");
    let mut cfg = base_cfg();
    cfg.telemetry_enabled = true;
    cfg.telemetry_path = dir.path().join("events.jsonl").display().to_string();
    let sink = TelemetrySink::new(&cfg, "ask".to_string());

    let service = ScriptedService::replying("fine");
    let coordinator = Coordinator::builtin(
        Arc::new(service),
        cfg.max_turns,
        AgentFailurePolicy::Abort,
        sink,
    )
    .expect("coordinator should build");
    coordinator
        .coordinate("brand design", None)
        .await
        .expect("coordinate should succeed");

    let lines = std::fs::read_to_string(&cfg.telemetry_path)
        .expect("telemetry file should exist")
        .lines()
        .map(str::to_string)
        .collect::<Vec<String>>();
    let summary = summarize_telemetry_lines(lines, 100);
    assert_eq!(summary.agent_completed, 2);
    assert_eq!(summary.agent_counts.get(OKSANA_CREATIVE), Some(&1));
    assert_eq!(summary.command_counts.get("ask"), Some(&3));
}

// Anthropic stream decoding

async fn decode_chunks(chunks: &[&str]) -> anyhow::Result<Vec<AgentMessage>> {
    let body = futures::stream::iter(
        chunks
            .iter()
            .map(|chunk| Ok::<_, std::io::Error>(chunk.as_bytes().to_vec()))
            .collect::<Vec<_>>(),
    );
    decode_event_stream(body).try_collect().await
}

#[tokio::test]
async fn event_stream_emits_deltas_and_final_result() {
    let messages = decode_chunks(&[
        "event: message_start\r\ndata: {\"type\":\"message_start\"}\r\n\r\n",
        "event: content_block_delta\r\ndata: {\"type\":\"content_block_delta\",\"index\":0,",
        "\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\r\n\r\n",
        "event: content_block_delta\r\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\r\n\r\n",
        "event: message_stop\r\ndata: {\"type\":\"message_stop\"}\r\n\r\n",
    ])
    .await
    .expect("stream should decode");

    assert_eq!(
        messages,
        vec![
            AgentMessage::assistant("Hel"),
            AgentMessage::assistant("lo"),
            AgentMessage::result("Hello"),
        ]
    );
}

#[tokio::test]
async fn event_stream_accepts_cr_only_line_endings() {
    // A lone trailing CR may still be the first half of CRLF, so the last blank line ends in LF.
    let messages = decode_chunks(&[
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"hi\"}}\r\rdata: {\"type\":\"message_stop\"}\r\r",
        "\n",
    ])
    .await
    .expect("CR-delimited events should decode separately");

    assert_eq!(
        messages,
        vec![AgentMessage::assistant("hi"), AgentMessage::result("hi")]
    );
}

#[tokio::test]
async fn event_stream_requires_message_stop() {
    let err = decode_chunks(&[
        "data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"cut\"}}\n\n",
    ])
    .await
    .expect_err("truncated stream should fail");
    assert!(err.to_string().contains("before message_stop"));
}

#[tokio::test]
async fn event_stream_surfaces_error_events() {
    let err = decode_chunks(&[
        "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
    ])
    .await
    .expect_err("error event should fail");
    assert_eq!(err.to_string(), "completion service error: Overloaded");
}

// Orchestrator

#[test]
fn extract_artifact_prefers_first_fenced_block() {
    let payload = "Here you go:\n```svg\n<svg>\n</svg>\n```\nand another\n```\nignored\n```";
    assert_eq!(extract_artifact(payload), "<svg>\n</svg>\n");
    assert_eq!(extract_artifact("plain text"), "plain text");
}

#[test]
fn builtin_manifests_match_phase_sizes() {
    let manifests = PhaseManifests::builtin();
    assert_eq!(manifests.svg.len(), 45);
    assert_eq!(
        manifests
            .svg
            .iter()
            .filter(|c| c.kind == SvgKind::Animated)
            .count(),
        20
    );
    assert_eq!(manifests.svg[0].name, "QuantumSpatial_1");
    assert_eq!(manifests.svg[30].name, "Heritage_1");
    assert_eq!(manifests.game_files.len(), 6);
    assert_eq!(manifests.total_items(), 45 + 6 + 40);
}

#[test]
fn orchestrator_config_applies_phase_switches() {
    let cfg = base_cfg();

    let all = OrchestratorConfig::from_args(&OrchestrateArgs::default(), &cfg);
    assert_eq!(
        all.selected_phases(),
        vec![Phase::SvgLibrary, Phase::HexecuteGame, Phase::VisionProKit]
    );
    assert!(!all.run_in_parallel);
    assert_eq!(all.report_path(), PathBuf::from("./output/quantum-leap-report.json"));

    let skip = OrchestrateArgs {
        no_svg: true,
        no_vision_pro: true,
        parallel: true,
        ..OrchestrateArgs::default()
    };
    let config = OrchestratorConfig::from_args(&skip, &cfg);
    assert_eq!(config.selected_phases(), vec![Phase::HexecuteGame]);
    assert!(config.run_in_parallel);

    let full = OrchestrateArgs {
        no_game: true,
        full_suite: true,
        ..OrchestrateArgs::default()
    };
    assert_eq!(OrchestratorConfig::from_args(&full, &cfg).selected_phases().len(), 3);

    let only = OrchestrateArgs {
        full_suite: true,
        vision_pro_only: true,
        rules_path: Some("rules.md".to_string()),
        ..OrchestrateArgs::default()
    };
    let config = OrchestratorConfig::from_args(&only, &cfg);
    assert_eq!(config.selected_phases(), vec![Phase::VisionProKit]);
    assert_eq!(config.rules_path, PathBuf::from("rules.md"));
}

#[test]
fn strategy_follows_parallel_flag() {
    assert_eq!(strategy_for(false).label(), "sequential");
    assert_eq!(strategy_for(true).label(), "concurrent");
}

#[tokio::test]
async fn sequential_run_writes_artifacts_and_report() {
    let dir = tempdir().expect("tempdir should create");
    let config = orchestrator_config(dir.path().to_path_buf(), false);
    let service = ScriptedService::replying("Here:\n```\n<generated/>\n```");
    let orchestrator = PhaseOrchestrator::new(
        coordinator_with(&service, AgentFailurePolicy::Abort),
        small_manifests(),
        &config,
        TelemetrySink::disabled(),
    );

    let report = orchestrator.run(&config).await.expect("run should succeed");

    let phases = report
        .results
        .iter()
        .map(|r| r.phase.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(phases, vec!["SVG Generation", "Hexecute Game", "Vision Pro UI Kit"]);
    assert!(report.results.iter().all(|r| r.success));
    assert_eq!(report.total_artifacts(), 6);

    let svg = std::fs::read_to_string(dir.path().join("svg-components/QuantumSpatial_1.svg"))
        .expect("svg should be written");
    assert_eq!(svg, "<generated/>\n");
    let architecture = std::fs::read_to_string(dir.path().join("hexecute-game/ARCHITECTURE.md"))
        .expect("architecture should be written");
    assert!(architecture.contains("```"));
    assert!(dir.path().join("hexecute-game/HexagonalGrid.swift").is_file());
    assert!(dir.path().join("vision-pro-ui-kit/Primitives_2.swift").is_file());

    let saved: Value = serde_json::from_str(
        &std::fs::read_to_string(config.report_path()).expect("report should be written"),
    )
    .expect("report should be JSON");
    assert_eq!(saved["results"].as_array().map(Vec::len), Some(3));
    assert_eq!(saved["results"][0]["success"], json!(true));
    assert!(saved["results"][0].get("errors").is_none());
    assert!(saved["duration"].is_u64());

    let summary = report.format_summary();
    assert!(summary.contains("Successful phases: 3/3"));
}

#[tokio::test]
async fn failing_phase_is_reported_without_stopping_others() {
    for parallel in [false, true] {
        let dir = tempdir().expect("tempdir should create");
        let config = orchestrator_config(dir.path().to_path_buf(), parallel);
        let service = failing_on("Vision Pro");
        let orchestrator = PhaseOrchestrator::new(
            coordinator_with(&service, AgentFailurePolicy::Abort),
            small_manifests(),
            &config,
            TelemetrySink::disabled(),
        );

        let report = orchestrator.run(&config).await.expect("run should succeed");
        assert_eq!(report.results.len(), 3, "parallel={parallel}");
        assert!(report.results[0].success);
        assert!(report.results[1].success);

        let vision = &report.results[2];
        assert_eq!(vision.phase, "Vision Pro UI Kit");
        assert!(!vision.success);
        assert!(vision.artifacts.is_empty());
        assert!(vision.errors[0].contains("quota exhausted"));
        assert_eq!(report.successful_phases(), 2);
        assert!(config.report_path().is_file());
    }
}

#[tokio::test]
async fn failing_first_phase_does_not_stop_later_sequential_phases() {
    let dir = tempdir().expect("tempdir should create");
    let config = orchestrator_config(dir.path().to_path_buf(), false);
    let service = failing_on("SVG");
    let orchestrator = PhaseOrchestrator::new(
        coordinator_with(&service, AgentFailurePolicy::Abort),
        small_manifests(),
        &config,
        TelemetrySink::disabled(),
    );

    let report = orchestrator.run(&config).await.expect("run should succeed");
    assert_eq!(report.results.len(), 3);

    let svg = &report.results[0];
    assert_eq!(svg.phase, "SVG Generation");
    assert!(!svg.success);
    assert!(svg.errors[0].contains("quota exhausted"));

    let game = &report.results[1];
    assert!(game.success);
    assert_eq!(game.artifacts.len(), 2);
    assert!(dir.path().join("hexecute-game/ARCHITECTURE.md").is_file());
    assert!(dir.path().join("hexecute-game/HexagonalGrid.swift").is_file());

    let vision = &report.results[2];
    assert!(vision.success);
    assert_eq!(vision.artifacts.len(), 2);
    assert!(dir.path().join("vision-pro-ui-kit/Primitives_1.swift").is_file());
    assert!(dir.path().join("vision-pro-ui-kit/Primitives_2.swift").is_file());
}

#[tokio::test]
async fn empty_fenced_block_fails_the_phase() {
    let dir = tempdir().expect("tempdir should create");
    let mut config = orchestrator_config(dir.path().to_path_buf(), false);
    config.build_game = false;
    config.create_vision_pro_kit = false;

    let service = ScriptedService::replying("Sure:\n```svg\n```");
    let orchestrator = PhaseOrchestrator::new(
        coordinator_with(&service, AgentFailurePolicy::Abort),
        small_manifests(),
        &config,
        TelemetrySink::disabled(),
    );
    let report = orchestrator.run(&config).await.expect("run should succeed");

    assert!(!report.results[0].success);
    assert!(report.results[0].artifacts.is_empty());
    assert!(report.results[0].errors[0].contains("no agent output produced"));
    assert!(!dir.path().join("svg-components/QuantumSpatial_1.svg").exists());
}

#[tokio::test]
async fn game_phase_forwards_rules_document() {
    let dir = tempdir().expect("tempdir should create");
    let rules = dir.path().join("ARTHUR-RULES.md");
    std::fs::write(&rules, "Rule: hexes only").expect("rules should write");
    let mut config = orchestrator_config(dir.path().to_path_buf(), false);
    config.generate_svgs = false;
    config.create_vision_pro_kit = false;
    config.rules_path = rules;

    let service = ScriptedService::replying("```\nbody\n```");
    let orchestrator = PhaseOrchestrator::new(
        coordinator_with(&service, AgentFailurePolicy::Abort),
        small_manifests(),
        &config,
        TelemetrySink::disabled(),
    );
    let report = orchestrator.run(&config).await.expect("run should succeed");
    assert_eq!(report.results.len(), 1);
    assert!(
        service
            .requests()
            .iter()
            .all(|r| r.first_user_turn().unwrap_or_default().contains("Rule: hexes only"))
    );
}

#[tokio::test]
async fn missing_rules_fall_back_to_placeholder() {
    let dir = tempdir().expect("tempdir should create");
    let mut config = orchestrator_config(dir.path().to_path_buf(), false);
    config.generate_svgs = false;
    config.create_vision_pro_kit = false;

    let service = ScriptedService::replying("```\nbody\n```");
    let orchestrator = PhaseOrchestrator::new(
        coordinator_with(&service, AgentFailurePolicy::Abort),
        small_manifests(),
        &config,
        TelemetrySink::disabled(),
    );
    orchestrator.run(&config).await.expect("run should succeed");
    let first = service.requests()[0].clone();
    assert!(
        first
            .first_user_turn()
            .unwrap_or_default()
            .contains(GAME_RULES_PLACEHOLDER)
    );
}

#[tokio::test]
async fn empty_agent_output_fails_the_phase() {
    let dir = tempdir().expect("tempdir should create");
    let mut config = orchestrator_config(dir.path().to_path_buf(), false);
    config.build_game = false;
    config.create_vision_pro_kit = false;

    let service = ScriptedService::replying("   ");
    let orchestrator = PhaseOrchestrator::new(
        coordinator_with(&service, AgentFailurePolicy::Abort),
        small_manifests(),
        &config,
        TelemetrySink::disabled(),
    );
    let report = orchestrator.run(&config).await.expect("run should succeed");
    assert!(!report.results[0].success);
    assert!(report.results[0].errors[0].contains("no agent output produced"));
}

// Config, provider, errors

#[test]
fn default_profile_resolves_without_config_file() {
    let cli = test_cli("/nonexistent/config.toml", "default");
    let profiles = load_profiles(&cli.config_path).expect("missing file should be empty");
    let cfg = resolve_runtime_config(&cli, &profiles).expect("default profile should resolve");

    assert_eq!(cfg.provider, Provider::Auto);
    assert_eq!(cfg.max_turns, DEFAULT_MAX_TURNS);
    assert_eq!(cfg.failure_policy, AgentFailurePolicy::Abort);
    assert_eq!(cfg.output_dir, DEFAULT_OUTPUT_DIR);
    assert!(cfg.telemetry_enabled);
}

#[test]
fn named_profile_overrides_defaults_and_cli_wins() {
    let dir = tempdir().expect("tempdir should create");
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[profiles.ci]
provider = "offline"
max_turns = 3
failure_policy = "isolate"
output_dir = "ci-output"
rules_path = "docs/rules.md"
telemetry_enabled = false
"#,
    )
    .expect("config should write");

    let mut cli = test_cli(&path.display().to_string(), "ci");
    let profiles = load_profiles(&cli.config_path).expect("profiles should load");
    let cfg = resolve_runtime_config(&cli, &profiles).expect("ci profile should resolve");
    assert_eq!(cfg.provider, Provider::Offline);
    assert_eq!(cfg.max_turns, 3);
    assert_eq!(cfg.failure_policy, AgentFailurePolicy::Isolate);
    assert_eq!(cfg.output_dir, "ci-output");
    assert_eq!(cfg.rules_path, "docs/rules.md");
    assert!(!cfg.telemetry_enabled);

    cli.output_dir = Some("cli-output".to_string());
    cli.failure_policy = Some(AgentFailurePolicy::Abort);
    let cfg = resolve_runtime_config(&cli, &profiles).expect("ci profile should resolve");
    assert_eq!(cfg.output_dir, "cli-output");
    assert_eq!(cfg.failure_policy, AgentFailurePolicy::Abort);
}

#[test]
fn unknown_profile_and_unknown_fields_are_rejected() {
    let dir = tempdir().expect("tempdir should create");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.dev]\nmax_turns = 2\n").expect("config should write");

    let cli = test_cli(&path.display().to_string(), "staging");
    let profiles = load_profiles(&cli.config_path).expect("profiles should load");
    let err = resolve_runtime_config(&cli, &profiles).expect_err("missing profile should fail");
    assert!(err.to_string().contains("Available profiles: dev"));
    assert_eq!(categorize_error(&err), ErrorCategory::Input);

    std::fs::write(&path, "[profiles.dev]\nturns = 2\n").expect("config should write");
    assert!(load_profiles(&path.display().to_string()).is_err());
}

#[test]
fn offline_provider_resolves_scripted_service() {
    let cfg = base_cfg();
    let (service, provider, model) = resolve_service(&cfg).expect("offline should resolve");
    assert_eq!(provider, Provider::Offline);
    assert_eq!(model, "offline");
    assert_eq!(service.backend_name(), "offline");
}

#[test]
fn anthropic_models_must_be_claude() {
    assert!(validate_model_for_provider(Provider::Anthropic, DEFAULT_ANTHROPIC_MODEL).is_ok());
    assert!(validate_model_for_provider(Provider::Anthropic, "gpt-4o").is_err());
    assert!(validate_model_for_provider(Provider::Offline, "anything").is_ok());
}

#[tokio::test]
async fn offline_service_answers_with_recommendation() {
    let service = ScriptedService::offline();
    let executor = executor_with(&service);
    let result = executor
        .execute(FIGMA_VISUAL, "Design a card\nwith details", None)
        .await
        .expect("offline execute should succeed");
    assert!(result.summary.contains("Task: Design a card"));
    assert_eq!(result.recommendations.len(), 1);
}

#[test]
fn context_flag_must_be_a_json_object() {
    assert_eq!(parse_context(None).expect("none is fine"), None);
    assert_eq!(
        parse_context(Some(r#"{"brand":"acme"}"#)).expect("object is fine"),
        Some(json!({ "brand": "acme" }))
    );

    let err = parse_context(Some("[1, 2]")).expect_err("array should fail");
    assert!(err.to_string().contains("context must be a JSON object"));
    assert_eq!(categorize_error(&err), ErrorCategory::Input);
    assert!(parse_context(Some("{oops")).is_err());
}

#[test]
fn cli_errors_carry_category_and_hint() {
    let err: anyhow::Error = AgencyError::UnknownAgent("ghost".to_string()).into();
    let rendered = format_cli_error(&err);
    assert!(rendered.starts_with("[AGENT] Unknown agent: ghost"));
    assert!(rendered.contains("Hint: Run agency-cli agents list"));

    let err = anyhow::anyhow!("failed to write artifact 'out/a.svg'");
    assert_eq!(categorize_error(&err), ErrorCategory::Output);
}

#[test]
fn telemetry_summary_counts_outcomes() {
    let lines = vec![
        json!({"event":"command.completed","run_id":"r1","command":"ask","ts_unix_ms":10}).to_string(),
        json!({"event":"agent.failed","run_id":"r1","command":"ask","agent":"figma-visual"}).to_string(),
        json!({"event":"phase.completed","run_id":"r2","command":"orchestrate","success":false}).to_string(),
        "not json".to_string(),
    ];
    let summary = summarize_telemetry_lines(lines, 100);
    assert_eq!(summary.total_lines, 4);
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.unique_runs.len(), 2);
    assert_eq!(summary.command_completed, 1);
    assert_eq!(summary.agent_failed, 1);
    assert_eq!(summary.phase_failed, 1);
    assert_eq!(summary.last_event_ts_unix_ms, Some(10));
}

#[test]
fn disabled_telemetry_writes_nothing() {
    let dir = tempdir().expect("tempdir should create");
    let mut cfg = base_cfg();
    cfg.telemetry_path = dir.path().join("events.jsonl").display().to_string();
    let sink = TelemetrySink::new(&cfg, "route".to_string());
    sink.emit("command.completed", json!({}));
    assert!(!dir.path().join("events.jsonl").exists());
}

#[test]
fn telemetry_sink_creates_nested_directory_and_skips_blank_ids() {
    let dir = tempdir().expect("tempdir should create");
    let mut cfg = base_cfg();
    cfg.telemetry_enabled = true;
    cfg.telemetry_path = dir
        .path()
        .join("nested/telemetry/events.jsonl")
        .display()
        .to_string();
    let sink = TelemetrySink::new(&cfg, "orchestrate".to_string());
    sink.emit("phase.completed", json!({ "phase": "SVG Generation", "success": true }));

    let mut lines = std::fs::read_to_string(&cfg.telemetry_path)
        .expect("telemetry file should exist")
        .lines()
        .map(str::to_string)
        .collect::<Vec<String>>();
    assert_eq!(lines.len(), 1);
    lines.push(json!({ "event": "command.completed", "run_id": "", "command": "" }).to_string());

    let summary = summarize_telemetry_lines(lines, 100);
    assert_eq!(summary.phase_succeeded, 1);
    assert_eq!(summary.command_completed, 1);
    assert_eq!(summary.unique_runs.len(), 1);
    assert_eq!(summary.command_counts.len(), 1);
    assert_eq!(summary.command_counts.get("orchestrate"), Some(&1));
}
