use thiserror::Error;

/// Failures raised by the routing and execution core.
#[derive(Debug, Error)]
pub enum AgencyError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    /// Raised while consuming the completion service's stream. The message is kept verbatim.
    #[error("{0}")]
    Upstream(String),

    #[error("invalid agent configuration: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    Agent,
    Output,
    Input,
    Internal,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Provider => "PROVIDER",
            ErrorCategory::Agent => "AGENT",
            ErrorCategory::Output => "OUTPUT",
            ErrorCategory::Input => "INPUT",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Provider => {
                "Set ANTHROPIC_API_KEY or run with --provider offline for a local dry run."
            }
            ErrorCategory::Agent => "Run agency-cli agents list to see the registered agent ids.",
            ErrorCategory::Output => "Check --output-dir and that the directory is writable.",
            ErrorCategory::Input => "Run agency-cli --help and correct command arguments.",
            ErrorCategory::Internal => {
                "Retry with RUST_LOG=debug. If it persists, capture logs and open an issue."
            }
        }
    }
}

pub fn categorize_error(err: &anyhow::Error) -> ErrorCategory {
    if let Some(agency) = err.downcast_ref::<AgencyError>() {
        return match agency {
            AgencyError::UnknownAgent(_) | AgencyError::Configuration(_) => ErrorCategory::Agent,
            AgencyError::Upstream(_) => ErrorCategory::Provider,
        };
    }

    let msg = format!("{err:#}").to_ascii_lowercase();

    if msg.contains("api_key") || msg.contains("provider") || msg.contains("completion service")
    {
        return ErrorCategory::Provider;
    }

    if msg.contains("invalid value")
        || msg.contains("unknown argument")
        || msg.contains("profile")
        || msg.contains("context must be")
    {
        return ErrorCategory::Input;
    }

    if msg.contains("output") || msg.contains("failed to write") || msg.contains("directory") {
        return ErrorCategory::Output;
    }

    ErrorCategory::Internal
}

pub fn format_cli_error(err: &anyhow::Error) -> String {
    let category = categorize_error(err);
    format!("[{}] {:#}\nHint: {}", category.code(), err, category.hint())
}
