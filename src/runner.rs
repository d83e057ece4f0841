use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::json;

use crate::backend::{BackendError, ChatBackend};
use crate::config::RuntimeConfig;
use crate::pipeline::{
    GenerationSettings, PipelineError, PipelineObserver, PipelineResult, Stage, StagePipeline,
};
use crate::report::{ReportHeader, render_report, report_file_name, write_report};
use crate::scenarios::{ScenarioSpec, find_scenario, phase_title, scenario_catalog, scenario_ids};
use crate::startup::{STATIC_BRIEF_NOTICE, StartupParams, startup_stages};
use crate::telemetry::TelemetrySink;

const BANNER: &str = "============================================================";

/// A fully assembled run: what to execute plus how to present and persist it.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub title: String,
    pub slug: String,
    pub context: Option<String>,
    pub parameters: Vec<(String, String)>,
    pub notes: Vec<String>,
    pub stages: Vec<Stage>,
    /// Banner title per stage, aligned with `stages`.
    pub phases: Vec<String>,
    pub inputs: BTreeMap<String, String>,
}

impl PipelineRun {
    pub fn roles(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::role).collect()
    }

    pub fn report_header(&self) -> ReportHeader {
        ReportHeader {
            title: self.title.clone(),
            context: self.context.clone(),
            parameters: self.parameters.clone(),
            notes: self.notes.clone(),
        }
    }
}

pub fn scenario_run(spec: &ScenarioSpec) -> PipelineRun {
    let stages = spec.stages();
    let phases = stages
        .iter()
        .map(|stage| phase_title(stage.name()).to_string())
        .collect();
    let mut inputs = BTreeMap::new();
    inputs.insert("scenario".to_string(), spec.id.to_string());

    PipelineRun {
        title: spec.title.to_string(),
        slug: spec.id.to_string(),
        context: Some(spec.context.to_string()),
        parameters: Vec::new(),
        notes: Vec::new(),
        stages,
        phases,
        inputs,
    }
}

pub fn startup_run(params: &StartupParams) -> PipelineRun {
    let stages = startup_stages(params);
    let phases = stages
        .iter()
        .map(|stage| stage.name().replace('_', " ").to_ascii_uppercase())
        .collect();

    PipelineRun {
        title: format!("Startup Analysis: {} in {}", params.industry, params.location),
        slug: params.report_slug(),
        context: Some(format!(
            "{} analysis of {} startups ({}) targeting {}",
            params.analysis_focus, params.industry, params.startup_stage, params.target_audience
        )),
        parameters: params
            .display_rows()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        notes: vec![STATIC_BRIEF_NOTICE.to_string()],
        stages,
        phases,
        inputs: params.as_inputs(),
    }
}

/// Prints per-stage progress to stdout and mirrors it into telemetry.
pub struct ConsoleObserver<'a> {
    phases: &'a [String],
    telemetry: &'a TelemetrySink,
}

impl<'a> ConsoleObserver<'a> {
    pub fn new(phases: &'a [String], telemetry: &'a TelemetrySink) -> Self {
        Self { phases, telemetry }
    }

    fn phase(&self, index: usize, stage: &Stage) -> String {
        self.phases
            .get(index.saturating_sub(1))
            .cloned()
            .unwrap_or_else(|| stage.name().to_ascii_uppercase())
    }
}

impl PipelineObserver for ConsoleObserver<'_> {
    fn stage_started(&self, index: usize, _total: usize, stage: &Stage) {
        println!();
        println!("PHASE {index}: {}", self.phase(index, stage));
        println!("{}", "-".repeat(40));
        println!("[{} is working...]", stage.role());
    }

    fn stage_completed(
        &self,
        index: usize,
        total: usize,
        stage: &Stage,
        output: &str,
        elapsed: Duration,
    ) {
        println!();
        println!("[{} Output]", stage.role());
        println!("{output}");
        self.telemetry.emit(
            "stage.completed",
            json!({
                "stage": stage.name(),
                "index": index,
                "total": total,
                "elapsed_ms": elapsed.as_millis() as u64,
                "output_chars": output.chars().count(),
            }),
        );
    }

    fn stage_failed(&self, index: usize, total: usize, stage: &Stage, error: &BackendError) {
        eprintln!("[{} failed: {error}]", stage.role());
        self.telemetry.emit(
            "stage.failed",
            json!({
                "stage": stage.name(),
                "index": index,
                "total": total,
                "error": error.to_string(),
            }),
        );
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn print_run_header(run: &PipelineRun, model: &str) {
    println!("{BANNER}");
    println!("{}", run.title);
    println!("{BANNER}");
    if let Some(context) = run.context.as_deref() {
        println!("Context: {context}");
    }
    println!("Model: {model}");
    println!("Start Time: {}", Local::now().format(TIME_FORMAT));
    for (key, value) in &run.parameters {
        println!("  {key}: {value}");
    }
}

/// Completion banner: title, model, start and end time, and the agent roles.
pub fn format_run_summary(run: &PipelineRun, result: &PipelineResult) -> String {
    let mut lines = vec![
        BANNER.to_string(),
        "WORKFLOW COMPLETED".to_string(),
        BANNER.to_string(),
        format!("Title: {}", run.title),
    ];
    if let Some(context) = run.context.as_deref() {
        lines.push(format!("Context: {context}"));
    }
    lines.push(format!("Model: {}", result.model()));
    lines.push(format!(
        "Start Time: {}",
        result.started_at().format(TIME_FORMAT)
    ));
    lines.push(format!("End Time: {}", result.finished_at().format(TIME_FORMAT)));
    lines.push(format!("Stages completed: {}", result.completed_stages()));
    lines.push("Agents:".to_string());
    for (idx, role) in run.roles().into_iter().enumerate() {
        lines.push(format!("  {}. {role}", idx + 1));
    }
    lines.join("\n")
}

fn print_partial_outputs(result: &PipelineResult) {
    if result.context().is_empty() {
        return;
    }
    eprintln!("Partial outputs before the failure:");
    for (stage, text) in result.context().outputs() {
        eprintln!();
        eprintln!("[{stage}]");
        eprintln!("{text}");
    }
}

/// Renders and writes the report for a completed run.
pub fn persist_report(
    output_dir: &Path,
    run: &PipelineRun,
    result: &PipelineResult,
) -> Result<PathBuf> {
    let contents = render_report(&run.report_header(), result);
    let file_name = report_file_name(&run.slug, result.finished_at());
    write_report(output_dir, &file_name, &contents)
}

/// Executes a run end to end. Returns the report path when one was written.
pub async fn execute_run(
    cfg: &RuntimeConfig,
    run: &PipelineRun,
    backend: &dyn ChatBackend,
    model: &str,
    telemetry: &TelemetrySink,
) -> Result<Option<PathBuf>> {
    print_run_header(run, model);

    let settings = GenerationSettings {
        model: model.to_string(),
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
    };
    let observer = ConsoleObserver::new(&run.phases, telemetry);
    let pipeline = StagePipeline::new(backend, settings)
        .with_deadline(cfg.deadline())
        .with_observer(&observer);

    telemetry.emit(
        "pipeline.started",
        json!({
            "title": run.title,
            "slug": run.slug,
            "stages": run.stages.len(),
            "backend": backend.name(),
            "model": pipeline.settings().model,
        }),
    );

    let result = match pipeline.run(&run.stages, run.inputs.clone()).await {
        Ok(result) => result,
        Err(err) => {
            if let PipelineError::StageFailed {
                stage,
                index,
                partial,
                ..
            } = &err
            {
                print_partial_outputs(partial);
                telemetry.emit(
                    "pipeline.aborted",
                    json!({
                        "slug": run.slug,
                        "stage": stage,
                        "index": index,
                        "completed_stages": partial.completed_stages(),
                    }),
                );
            }
            return Err(anyhow::Error::new(err));
        }
    };

    telemetry.emit(
        "pipeline.completed",
        json!({
            "slug": run.slug,
            "stages": result.completed_stages(),
            "elapsed_ms": result
                .timings()
                .iter()
                .map(|timing| timing.elapsed_ms as u64)
                .sum::<u64>(),
        }),
    );
    println!();
    println!("{}", format_run_summary(run, &result));

    if !cfg.write_report {
        return Ok(None);
    }
    let path = persist_report(Path::new(&cfg.output_dir), run, &result)?;
    println!();
    println!("Report saved to: {}", path.display());
    Ok(Some(path))
}

pub fn run_scenarios_list() -> Result<()> {
    println!("Available scenarios:");
    for scenario in scenario_catalog() {
        println!("- {}: {}", scenario.id, scenario.summary);
    }
    Ok(())
}

/// Lists the scenarios on `writer` and reads one identifier from `reader`.
pub fn prompt_for_scenario<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<String> {
    writeln!(writer, "Available scenarios:")?;
    for (idx, scenario) in scenario_catalog().iter().enumerate() {
        writeln!(writer, "  {}. {} - {}", idx + 1, scenario.id, scenario.summary)?;
    }
    write!(writer, "Enter scenario: ")?;
    writer.flush()?;

    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read input for scenario selection")?;
    let choice = line.trim();
    if choice.is_empty() {
        return Err(anyhow::anyhow!(
            "no scenario provided. Available scenarios: {}",
            scenario_ids().join(", ")
        ));
    }
    // Accept the listed number as well as the identifier.
    if let Ok(position) = choice.parse::<usize>()
        && let Some(scenario) = position
            .checked_sub(1)
            .and_then(|idx| scenario_catalog().get(idx))
    {
        return Ok(scenario.id.to_string());
    }
    Ok(choice.to_string())
}

/// Uses the positional identifier when given, otherwise prompts on stdin.
pub fn resolve_scenario(requested: Option<&str>) -> Result<&'static ScenarioSpec> {
    match requested {
        Some(id) => find_scenario(id),
        None => {
            let stdin = std::io::stdin();
            let mut reader = stdin.lock();
            let mut stdout = std::io::stdout();
            let id = prompt_for_scenario(&mut reader, &mut stdout)?;
            find_scenario(&id)
        }
    }
}
