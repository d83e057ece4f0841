use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Auto,
    Openai,
    Groq,
    Deepseek,
    Ollama,
    Custom,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    #[command(about = "List configured profiles and highlight the active profile")]
    List,
    #[command(about = "Show the active profile's resolved runtime settings")]
    Show,
}

#[derive(Debug, Subcommand)]
pub enum TelemetryCommands {
    #[command(about = "Summarize telemetry events from a JSONL stream")]
    Report {
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = 5000)]
        limit: usize,
    },
}

#[derive(Debug, Clone, Args)]
pub struct StartupArgs {
    #[arg(long, default_value = "AI/ML")]
    pub industry: String,
    #[arg(long, default_value = "San Francisco Bay Area")]
    pub location: String,
    #[arg(long = "stage", default_value = "Seed to Series A")]
    pub startup_stage: String,
    #[arg(long = "audience", default_value = "B2B SaaS")]
    pub target_audience: String,
    #[arg(long = "focus", default_value = "comprehensive")]
    pub analysis_focus: String,
    #[arg(long, default_value = "productivity tools")]
    pub category: String,
    /// Market-trend timeframe; defaults to the current year.
    #[arg(long)]
    pub timeframe: Option<String>,
}

const CLI_EXAMPLES: &str = "Examples:\n\
  stagecrew run conference\n\
  stagecrew run                      (prompts for a scenario)\n\
  stagecrew --provider groq --model llama-3.3-70b-versatile run software\n\
  stagecrew --deadline-secs 300 --retry-attempts 2 run marketing\n\
  stagecrew startup --industry FinTech --location \"New York\" --stage \"Series B+\"\n\
  stagecrew scenarios\n\
  stagecrew profiles show\n\
  stagecrew telemetry report --limit 2000\n\
\n\
Credentials are read from OPENAI_API_KEY, GROQ_API_KEY, DEEPSEEK_API_KEY, OLLAMA_HOST,\n\
or STAGECREW_API_KEY together with --provider custom --api-base <url>.";

#[derive(Debug, Parser)]
#[command(name = "stagecrew")]
#[command(about = "Run four-stage LLM agent pipelines and write plain-text reports")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    #[arg(long, env = "STAGECREW_PROVIDER", value_enum, default_value_t = Provider::Auto)]
    pub provider: Provider,

    #[arg(long, env = "STAGECREW_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "STAGECREW_API_BASE")]
    pub api_base: Option<String>,

    #[arg(long, env = "STAGECREW_PROFILE", default_value = "default")]
    pub profile: String,

    #[arg(long, env = "STAGECREW_CONFIG", default_value = ".stagecrew/config.toml")]
    pub config_path: String,

    #[arg(long, env = "STAGECREW_TEMPERATURE")]
    pub temperature: Option<f32>,

    #[arg(long, env = "STAGECREW_MAX_TOKENS")]
    pub max_tokens: Option<u32>,

    #[arg(long, env = "STAGECREW_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "STAGECREW_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    #[arg(long, env = "STAGECREW_RETRY_ATTEMPTS")]
    pub retry_attempts: Option<u32>,

    #[arg(long, env = "STAGECREW_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    #[arg(long, env = "STAGECREW_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_report: bool,

    #[arg(long, env = "STAGECREW_SHOW_SENSITIVE_CONFIG", default_value_t = false)]
    pub show_sensitive_config: bool,

    #[arg(long, env = "STAGECREW_TELEMETRY_ENABLED", action = clap::ArgAction::Set)]
    pub telemetry_enabled: Option<bool>,

    #[arg(long, env = "STAGECREW_TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,

    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Run a built-in research/analysis/blueprint/review scenario")]
    Run {
        /// Scenario identifier; prompts on stdin when omitted.
        scenario: Option<String>,
    },
    #[command(about = "Run the startup discovery/competition/pitch/feature analysis crew")]
    Startup(StartupArgs),
    #[command(about = "List the built-in scenarios")]
    Scenarios,
    #[command(about = "Validate provider environment and resolved settings")]
    Doctor,
    #[command(about = "Inspect profile configuration and active resolved profile state")]
    Profiles {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    #[command(about = "Telemetry utilities and reporting")]
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },
}

pub fn command_label(command: &Commands) -> String {
    match command {
        Commands::Run { .. } => "run".to_string(),
        Commands::Startup(_) => "startup".to_string(),
        Commands::Scenarios => "scenarios".to_string(),
        Commands::Doctor => "doctor".to_string(),
        Commands::Profiles { command } => match command {
            ProfileCommands::List => "profiles.list".to_string(),
            ProfileCommands::Show => "profiles.show".to_string(),
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { .. } => "telemetry.report".to_string(),
        },
    }
}
