use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Auto,
    Anthropic,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentFailurePolicy {
    /// The first failing agent aborts the whole coordinated task.
    Abort,
    /// A failing agent is recorded and the remaining agents still run.
    Isolate,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    #[command(about = "List configured profiles and highlight the active profile")]
    List,
    #[command(about = "Show the active profile's resolved runtime settings")]
    Show,
}

#[derive(Debug, Subcommand)]
pub enum AgentCommands {
    #[command(about = "List the built-in agent roles in registration order")]
    List,
    #[command(about = "Show one agent role, including its system prompt")]
    Show {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = false)]
        full_prompt: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TelemetryCommands {
    #[command(about = "Summarize local telemetry events")]
    Report {
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = 2000)]
        limit: usize,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct OrchestrateArgs {
    #[arg(long, default_value_t = false, help = "Skip the SVG component phase")]
    pub no_svg: bool,
    #[arg(long, default_value_t = false, help = "Skip the Hexecute game phase")]
    pub no_game: bool,
    #[arg(long, default_value_t = false, help = "Skip the Vision Pro UI kit phase")]
    pub no_vision_pro: bool,
    #[arg(long, default_value_t = false, help = "Run selected phases concurrently")]
    pub parallel: bool,
    #[arg(long, default_value_t = false, help = "Enable every phase")]
    pub full_suite: bool,
    #[arg(long, default_value_t = false, conflicts_with_all = ["game_only", "vision_pro_only"])]
    pub svg_only: bool,
    #[arg(long, default_value_t = false, conflicts_with = "vision_pro_only")]
    pub game_only: bool,
    #[arg(long, default_value_t = false)]
    pub vision_pro_only: bool,
    #[arg(long, help = "Game rules document fed to the Hexecute phase")]
    pub rules_path: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Show which agents a task description routes to (no service call)")]
    Route {
        #[arg(required = true)]
        task: Vec<String>,
    },
    #[command(about = "Coordinate a task across the routed agents and print the synthesis")]
    Ask {
        #[arg(required = true)]
        task: Vec<String>,
        #[arg(long, help = "JSON object forwarded verbatim to every agent")]
        context: Option<String>,
        #[arg(long, default_value_t = false, help = "Print the full result as JSON")]
        json: bool,
    },
    #[command(about = "Inspect the agent registry")]
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    #[command(about = "Run the asset-generation phases and write the execution report")]
    Orchestrate(OrchestrateArgs),
    #[command(about = "Validate provider environment and output configuration")]
    Doctor,
    #[command(about = "Inspect profile configuration and active resolved profile state")]
    Profiles {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    #[command(about = "Inspect local telemetry")]
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },
}

const CLI_EXAMPLES: &str = "Examples:\n\
  agency-cli route \"Plan the architecture for a new checkout flow\"\n\
  agency-cli ask \"Write brand-aligned SEO copy for this product description\"\n\
  agency-cli ask \"Build a React component\" --context '{\"brand\":\"9bit-studios\"}'\n\
  agency-cli --provider offline orchestrate --svg-only\n\
  agency-cli orchestrate --parallel --no-game\n\
\n\
Provider behavior:\n\
  - auto uses the Anthropic backend when ANTHROPIC_API_KEY is set.\n\
  - offline answers every agent call locally, useful for dry runs.";

#[derive(Debug, Parser)]
#[command(name = "agency-cli")]
#[command(about = "Route design and marketing tasks to specialised agent roles")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    #[arg(long, env = "AGENCY_PROVIDER", value_enum, default_value_t = Provider::Auto)]
    pub provider: Provider,

    #[arg(long, env = "AGENCY_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "AGENCY_PROFILE", default_value = "default")]
    pub profile: String,

    #[arg(long, env = "AGENCY_CONFIG", default_value = ".agency/config.toml")]
    pub config_path: String,

    #[arg(long, env = "AGENCY_MAX_TURNS")]
    pub max_turns: Option<u32>,

    #[arg(long, env = "AGENCY_FAILURE_POLICY", value_enum)]
    pub failure_policy: Option<AgentFailurePolicy>,

    #[arg(long, env = "AGENCY_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    #[arg(long, env = "AGENCY_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "AGENCY_TELEMETRY_ENABLED")]
    pub telemetry_enabled: Option<bool>,

    #[arg(long, env = "AGENCY_TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,

    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn command_label(command: &Commands) -> &'static str {
    match command {
        Commands::Route { .. } => "route",
        Commands::Ask { .. } => "ask",
        Commands::Agents { .. } => "agents",
        Commands::Orchestrate(_) => "orchestrate",
        Commands::Doctor => "doctor",
        Commands::Profiles { .. } => "profiles",
        Commands::Telemetry { .. } => "telemetry",
    }
}
