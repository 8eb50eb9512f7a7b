pub mod cli;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod prompts;
pub mod registry;
pub mod router;
pub mod service;
pub mod anthropic;
pub mod provider;
pub mod executor;
pub mod synthesis;
pub mod coordinator;
pub mod manifest;
pub mod orchestrator;
pub mod runner;
pub mod doctor;
pub mod profiles;
pub mod agents;

#[cfg(test)]
mod tests;
