use anyhow::Result;
use clap::Parser;
use serde_json::json;

use stagecrew::cli::{Cli, Commands, ProfileCommands, TelemetryCommands, command_label};
use stagecrew::config::{load_profiles, resolve_runtime_config};
use stagecrew::doctor::run_doctor;
use stagecrew::error::{categorize_error, format_cli_error};
use stagecrew::profiles::{run_profiles_list, run_profiles_show};
use stagecrew::provider::{provider_label, resolve_backend};
use stagecrew::runner::{
    execute_run, resolve_scenario, run_scenarios_list, scenario_run, startup_run,
};
use stagecrew::startup::StartupParams;
use stagecrew::telemetry::{TelemetrySink, run_telemetry_report, unix_ms_now};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let show_sensitive_config = cli.show_sensitive_config;
    if let Err(err) = run_cli(cli).await {
        eprintln!("{}", format_cli_error(&err, show_sensitive_config));
        tracing::error!(category = %categorize_error(&err).code(), "command failed");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_filter)?;
    let profiles = load_profiles(&cli.config_path)?;
    let cfg = resolve_runtime_config(&cli, &profiles)?;
    let telemetry = TelemetrySink::new(&cfg, command_label(&cli.command));
    let started = unix_ms_now();

    let outcome = dispatch(cli.command, &cfg, &profiles, &telemetry).await;
    let duration_ms = unix_ms_now().saturating_sub(started) as u64;
    match &outcome {
        Ok(()) => telemetry.emit("command.completed", json!({ "duration_ms": duration_ms })),
        Err(err) => telemetry.emit(
            "command.failed",
            json!({
                "duration_ms": duration_ms,
                "category": categorize_error(err).code(),
            }),
        ),
    }
    outcome
}

async fn dispatch(
    command: Commands,
    cfg: &stagecrew::config::RuntimeConfig,
    profiles: &stagecrew::config::ProfilesFile,
    telemetry: &TelemetrySink,
) -> Result<()> {
    match command {
        Commands::Run { scenario } => {
            // Unknown identifiers fail here, before any credential lookup.
            let spec = resolve_scenario(scenario.as_deref())?;
            let (backend, settings) = resolve_backend(cfg)?;
            tracing::info!(
                provider = provider_label(settings.provider),
                model = %settings.model,
                scenario = spec.id,
                "using backend"
            );
            let run = scenario_run(spec);
            execute_run(cfg, &run, &backend, &settings.model, telemetry).await?;
        }
        Commands::Startup(args) => {
            let mut params = StartupParams {
                industry: args.industry,
                location: args.location,
                startup_stage: args.startup_stage,
                target_audience: args.target_audience,
                analysis_focus: args.analysis_focus,
                category: args.category,
                ..StartupParams::default()
            };
            if let Some(timeframe) = args.timeframe {
                params.timeframe = timeframe;
            }
            let (backend, settings) = resolve_backend(cfg)?;
            tracing::info!(
                provider = provider_label(settings.provider),
                model = %settings.model,
                "using backend"
            );
            let run = startup_run(&params);
            execute_run(cfg, &run, &backend, &settings.model, telemetry).await?;
        }
        Commands::Scenarios => run_scenarios_list()?,
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

fn init_tracing(log_filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
