use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::{AgentFailurePolicy, Cli, Provider};

pub const DEFAULT_MAX_TURNS: u32 = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_RULES_PATH: &str = "./hexecute-game/ARTHUR-RULES.md";
pub const REPORT_FILE_NAME: &str = "quantum-leap-report.json";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub profile: String,
    pub config_path: String,
    pub provider: Provider,
    pub model: Option<String>,
    pub api_base_url: String,
    pub max_turns: u32,
    pub request_timeout_secs: u64,
    pub failure_policy: AgentFailurePolicy,
    pub output_dir: String,
    pub rules_path: String,
    pub telemetry_enabled: bool,
    pub telemetry_path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub api_base_url: Option<String>,
    pub max_turns: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub failure_policy: Option<AgentFailurePolicy>,
    pub output_dir: Option<String>,
    pub rules_path: Option<String>,
    pub telemetry_enabled: Option<bool>,
    pub telemetry_path: Option<String>,
}

pub fn load_profiles(config_path: &str) -> Result<ProfilesFile> {
    let path = Path::new(config_path);
    if !path.exists() {
        return Ok(ProfilesFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile config file at '{}'", path.display()))?;
    toml::from_str::<ProfilesFile>(&content).with_context(|| {
        format!(
            "invalid profile configuration in '{}'. Check provider/policy values and field names.",
            path.display()
        )
    })
}

pub fn resolve_runtime_config(cli: &Cli, profiles: &ProfilesFile) -> Result<RuntimeConfig> {
    let selected = cli.profile.trim();
    if selected.is_empty() {
        return Err(anyhow::anyhow!(
            "profile name cannot be empty. Set --profile <name>."
        ));
    }

    let profile = if selected == "default" && !profiles.profiles.contains_key("default") {
        ProfileConfig::default()
    } else {
        profiles.profiles.get(selected).cloned().ok_or_else(|| {
            let mut names = profiles.profiles.keys().cloned().collect::<Vec<String>>();
            names.sort();
            if names.is_empty() {
                anyhow::anyhow!(
                    "profile '{}' not found in '{}'. No profiles are defined yet.",
                    selected,
                    cli.config_path
                )
            } else {
                anyhow::anyhow!(
                    "profile '{}' not found in '{}'. Available profiles: {}",
                    selected,
                    cli.config_path,
                    names.join(", ")
                )
            }
        })?
    };

    let provider = if cli.provider != Provider::Auto {
        cli.provider
    } else {
        profile.provider.unwrap_or(Provider::Auto)
    };

    let output_dir = cli
        .output_dir
        .clone()
        .or(profile.output_dir)
        .map(|dir| dir.trim().to_string())
        .filter(|dir| !dir.is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

    Ok(RuntimeConfig {
        profile: selected.to_string(),
        config_path: cli.config_path.clone(),
        provider,
        model: cli.model.clone().or(profile.model),
        api_base_url: profile
            .api_base_url
            .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
        max_turns: cli
            .max_turns
            .or(profile.max_turns)
            .unwrap_or(DEFAULT_MAX_TURNS)
            .max(1),
        request_timeout_secs: cli
            .request_timeout_secs
            .or(profile.request_timeout_secs)
            .unwrap_or(300)
            .max(1),
        failure_policy: cli
            .failure_policy
            .or(profile.failure_policy)
            .unwrap_or(AgentFailurePolicy::Abort),
        output_dir,
        rules_path: profile
            .rules_path
            .unwrap_or_else(|| DEFAULT_RULES_PATH.to_string()),
        telemetry_enabled: cli
            .telemetry_enabled
            .or(profile.telemetry_enabled)
            .unwrap_or(true),
        telemetry_path: cli
            .telemetry_path
            .clone()
            .or(profile.telemetry_path)
            .unwrap_or_else(|| ".agency/telemetry/events.jsonl".to_string()),
    })
}
