use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::pipeline::PipelineResult;

const RULE_HEAVY: &str =
    "================================================================================";
const RULE_LIGHT: &str =
    "--------------------------------------------------------------------------------";

/// Everything printed above the stage sections.
#[derive(Debug, Clone, Default)]
pub struct ReportHeader {
    pub title: String,
    pub context: Option<String>,
    pub parameters: Vec<(String, String)>,
    pub notes: Vec<String>,
}

pub fn report_file_name(slug: &str, at: DateTime<Local>) -> String {
    format!("{}_{}.txt", slug, at.format("%Y%m%d_%H%M%S"))
}

pub fn render_report(header: &ReportHeader, result: &PipelineResult) -> String {
    let mut out = String::new();
    out.push_str(RULE_HEAVY);
    out.push('\n');
    out.push_str(&header.title);
    out.push('\n');
    out.push_str(RULE_HEAVY);
    out.push('\n');
    out.push_str(&format!(
        "Generated: {}\n",
        result.finished_at().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Model: {}\n", result.model()));
    if let Some(context) = header.context.as_deref() {
        out.push_str(&format!("Context: {context}\n"));
    }

    if !header.parameters.is_empty() {
        out.push_str("\nParameters:\n");
        for (key, value) in &header.parameters {
            out.push_str(&format!("  {key}: {value}\n"));
        }
    }

    if !header.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &header.notes {
            out.push_str(&format!("- {note}\n"));
        }
    }
    out.push('\n');

    for (stage, text) in result.context().outputs() {
        out.push('\n');
        out.push_str(RULE_LIGHT);
        out.push('\n');
        out.push_str(&stage.to_ascii_uppercase());
        out.push('\n');
        out.push_str(RULE_LIGHT);
        out.push('\n');
        out.push_str(text);
        out.push('\n');
    }

    out
}

pub fn write_report(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir).with_context(|| {
            format!("failed to create report directory '{}'", dir.display())
        })?;
    }
    let path = dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write report file '{}'", path.display()))?;
    Ok(path)
}
