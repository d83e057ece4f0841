//! Sequential, context-threading stage pipeline.
//!
//! A run walks an ordered list of [`Stage`]s. Each stage turns the outputs of
//! the stages before it into one chat request, and its reply is recorded
//! under the stage name before the next stage starts. The first failed call
//! aborts the run; everything recorded so far travels back with the error.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::backend::{BackendError, ChatBackend, ChatMessage, ChatRequest};

pub type MessageBuilder = Arc<dyn Fn(&PipelineContext) -> String + Send + Sync>;

/// One named step: a fixed system instruction plus a rule that builds the
/// user message from the context recorded so far.
#[derive(Clone)]
pub struct Stage {
    name: String,
    role: String,
    system_prompt: String,
    build_user_message: MessageBuilder,
}

impl Stage {
    pub fn new<F>(name: impl Into<String>, system_prompt: impl Into<String>, build: F) -> Self
    where
        F: Fn(&PipelineContext) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            role: name.clone(),
            name,
            system_prompt: system_prompt.into(),
            build_user_message: Arc::new(build),
        }
    }

    /// Label shown in progress output ("Agenda Designer is working...").
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn user_message(&self, ctx: &PipelineContext) -> String {
        (self.build_user_message)(ctx)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("system_prompt", &self.system_prompt)
            .finish_non_exhaustive()
    }
}

/// Read-only run inputs plus the append-only record of stage outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    inputs: BTreeMap<String, String>,
    outputs: Vec<(String, String)>,
}

impl PipelineContext {
    pub fn new(inputs: BTreeMap<String, String>) -> Self {
        Self {
            inputs,
            outputs: Vec::new(),
        }
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).map(String::as_str)
    }

    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn output(&self, stage: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, text)| text.as_str())
    }

    /// Stage outputs in execution order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outputs
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    fn record(&mut self, stage: &str, output: String) {
        debug_assert!(self.output(stage).is_none(), "stage recorded twice");
        self.outputs.push((stage.to_string(), output));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// `index` is 1-based.
    Aborted { stage: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: u128,
}

/// Outcome of one run. Only [`StagePipeline::run`] builds or mutates it.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    context: PipelineContext,
    model: String,
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    timings: Vec<StageTiming>,
    status: RunStatus,
}

impl PipelineResult {
    fn start(model: &str, inputs: BTreeMap<String, String>) -> Self {
        let now = Local::now();
        Self {
            context: PipelineContext::new(inputs),
            model: model.to_string(),
            started_at: now,
            finished_at: now,
            timings: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Local::now();
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Local> {
        self.finished_at
    }

    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Number of stages whose output was recorded.
    pub fn completed_stages(&self) -> usize {
        self.context.len()
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn aborted_at(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Aborted { stage, .. } => Some(stage.as_str()),
            RunStatus::Completed => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline has no stages")]
    Empty,

    #[error("duplicate stage name '{0}' in pipeline")]
    DuplicateStage(String),

    #[error("pipeline aborted at stage '{stage}' ({index}/{total})")]
    StageFailed {
        stage: String,
        index: usize,
        total: usize,
        #[source]
        source: BackendError,
        partial: Box<PipelineResult>,
    },
}

impl PipelineError {
    /// Context recorded before the failing stage, when a run got that far.
    pub fn partial(&self) -> Option<&PipelineResult> {
        match self {
            PipelineError::StageFailed { partial, .. } => Some(partial),
            _ => None,
        }
    }

    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            PipelineError::StageFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Progress hooks. Observers see stages and outputs but never the mutable
/// context.
pub trait PipelineObserver: Send + Sync {
    fn stage_started(&self, _index: usize, _total: usize, _stage: &Stage) {}

    fn stage_completed(
        &self,
        _index: usize,
        _total: usize,
        _stage: &Stage,
        _output: &str,
        _elapsed: Duration,
    ) {
    }

    fn stage_failed(&self, _index: usize, _total: usize, _stage: &Stage, _error: &BackendError) {}
}

pub fn validate_stages(stages: &[Stage]) -> Result<(), PipelineError> {
    if stages.is_empty() {
        return Err(PipelineError::Empty);
    }
    let mut seen = HashSet::<&str>::new();
    for stage in stages {
        if !seen.insert(stage.name()) {
            return Err(PipelineError::DuplicateStage(stage.name().to_string()));
        }
    }
    Ok(())
}

pub struct StagePipeline<'a> {
    backend: &'a dyn ChatBackend,
    settings: GenerationSettings,
    deadline: Option<Duration>,
    observer: Option<&'a dyn PipelineObserver>,
}

impl<'a> StagePipeline<'a> {
    pub fn new(backend: &'a dyn ChatBackend, settings: GenerationSettings) -> Self {
        Self {
            backend,
            settings,
            deadline: None,
            observer: None,
        }
    }

    /// Bound the whole run. Running out of time fails the in-flight stage
    /// with [`BackendError::Timeout`].
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn PipelineObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn build_request(&self, stage: &Stage, ctx: &PipelineContext) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            messages: vec![
                ChatMessage::system(stage.system_prompt()),
                ChatMessage::user(stage.user_message(ctx)),
            ],
        }
    }

    pub async fn run(
        &self,
        stages: &[Stage],
        initial_context: BTreeMap<String, String>,
    ) -> Result<PipelineResult, PipelineError> {
        validate_stages(stages)?;

        let total = stages.len();
        let deadline_at = self
            .deadline
            .map(|limit| tokio::time::Instant::now() + limit);
        let mut result = PipelineResult::start(&self.settings.model, initial_context);

        tracing::info!(
            backend = self.backend.name(),
            model = %self.settings.model,
            stages = total,
            "pipeline started"
        );

        for (offset, stage) in stages.iter().enumerate() {
            let index = offset + 1;
            if let Some(observer) = self.observer {
                observer.stage_started(index, total, stage);
            }

            let request = self.build_request(stage, &result.context);
            let started = std::time::Instant::now();
            let call = self.backend.complete(&request);
            let outcome = match deadline_at {
                Some(at) => tokio::time::timeout_at(at, call)
                    .await
                    .unwrap_or(Err(BackendError::Timeout)),
                None => call.await,
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(output) => {
                    tracing::info!(
                        stage = stage.name(),
                        index,
                        total,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "stage completed"
                    );
                    if let Some(observer) = self.observer {
                        observer.stage_completed(index, total, stage, &output, elapsed);
                    }
                    result.timings.push(StageTiming {
                        stage: stage.name().to_string(),
                        elapsed_ms: elapsed.as_millis(),
                    });
                    result.context.record(stage.name(), output);
                }
                Err(source) => {
                    tracing::warn!(
                        stage = stage.name(),
                        index,
                        total,
                        error = %source,
                        "stage failed; aborting pipeline"
                    );
                    if let Some(observer) = self.observer {
                        observer.stage_failed(index, total, stage, &source);
                    }
                    result.finish(RunStatus::Aborted {
                        stage: stage.name().to_string(),
                        index,
                    });
                    return Err(PipelineError::StageFailed {
                        stage: stage.name().to_string(),
                        index,
                        total,
                        source,
                        partial: Box::new(result),
                    });
                }
            }
        }

        result.finish(RunStatus::Completed);
        tracing::info!(stages = total, "pipeline completed");
        Ok(result)
    }
}
