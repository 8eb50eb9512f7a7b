use std::path::Path;

use anyhow::Result;

use crate::cli::Provider;
use crate::config::RuntimeConfig;
use crate::provider::{detect_provider, env_present, validate_model_for_provider};
use crate::registry::AgentRegistry;
use crate::router::TaskRouter;

pub fn run_doctor(cfg: &RuntimeConfig) -> Result<()> {
    println!(
        "Active profile: '{}' (config: {})",
        cfg.profile, cfg.config_path
    );

    println!("Provider environment check:");
    let status = if env_present("ANTHROPIC_API_KEY") {
        "set"
    } else {
        "missing"
    };
    println!("- ANTHROPIC_API_KEY: {status}");

    match detect_provider() {
        Some(provider) => println!("Auto provider resolution: {:?}", provider),
        None => {
            println!("Auto provider resolution: none");
            println!("Tip: export ANTHROPIC_API_KEY or run with --provider offline");
        }
    }
    println!("Configured provider: {:?}", cfg.provider);

    if let Some(model) = cfg.model.as_deref() {
        let provider = if cfg.provider == Provider::Auto {
            detect_provider().unwrap_or(Provider::Auto)
        } else {
            cfg.provider
        };
        match validate_model_for_provider(provider, model) {
            Ok(()) => println!("Model override: {model} (ok)"),
            Err(err) => println!("Model override: {model} ({err})"),
        }
    }

    let registry = AgentRegistry::builtin();
    match TaskRouter::builtin(&registry) {
        Ok(router) => println!(
            "Agent registry: {} agents, {} routing groups, default '{}'",
            registry.len(),
            router.groups().len(),
            router.default_agent()
        ),
        Err(err) => println!("Agent registry: invalid ({err})"),
    }

    println!(
        "Execution: max_turns={} failure_policy={:?} request_timeout={}s",
        cfg.max_turns, cfg.failure_policy, cfg.request_timeout_secs
    );

    let output_dir = Path::new(&cfg.output_dir);
    if output_dir.is_dir() {
        let readonly = std::fs::metadata(output_dir)
            .map(|meta| meta.permissions().readonly())
            .unwrap_or(false);
        println!(
            "Output dir: {} ({})",
            output_dir.display(),
            if readonly { "read-only" } else { "exists" }
        );
    } else {
        println!(
            "Output dir: {} (will be created on first run)",
            output_dir.display()
        );
    }

    let rules = Path::new(&cfg.rules_path);
    println!(
        "Game rules: {} ({})",
        rules.display(),
        if rules.is_file() {
            "found"
        } else {
            "missing, placeholder will be used"
        }
    );
    println!(
        "Telemetry: enabled={} path={}",
        cfg.telemetry_enabled, cfg.telemetry_path
    );

    Ok(())
}
