use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::anthropic::{AnthropicService, DEFAULT_ANTHROPIC_MODEL};
use crate::cli::Provider;
use crate::config::RuntimeConfig;
use crate::service::{AgentService, ScriptedService};

pub fn validate_model_for_provider(provider: Provider, model_name: &str) -> Result<()> {
    let is_valid = match provider {
        Provider::Anthropic => model_name.starts_with("claude"),
        Provider::Offline | Provider::Auto => true,
    };

    if is_valid {
        return Ok(());
    }

    Err(anyhow::anyhow!(
        "model '{}' is not compatible with provider '{:?}'",
        model_name,
        provider
    ))
}

pub fn resolve_service(cfg: &RuntimeConfig) -> Result<(Arc<dyn AgentService>, Provider, String)> {
    let provider = match cfg.provider {
        Provider::Auto => detect_provider().context(
            "no provider could be auto-detected. Set ANTHROPIC_API_KEY or use --provider offline",
        )?,
        p => p,
    };

    match provider {
        Provider::Anthropic => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY is required for Anthropic provider")?;
            let model_name = cfg
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            validate_model_for_provider(provider, &model_name)?;
            let service = AnthropicService::new(
                api_key,
                &cfg.api_base_url,
                model_name.clone(),
                Duration::from_secs(cfg.request_timeout_secs),
            )?;
            Ok((Arc::new(service), provider, model_name))
        }
        Provider::Offline => Ok((
            Arc::new(ScriptedService::offline()),
            provider,
            "offline".to_string(),
        )),
        Provider::Auto => unreachable!("auto provider must be resolved before matching"),
    }
}

pub fn detect_provider() -> Option<Provider> {
    if env_present("ANTHROPIC_API_KEY") {
        return Some(Provider::Anthropic);
    }
    None
}

pub fn env_present(key: &str) -> bool {
    std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}
