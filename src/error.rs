use crate::backend::BackendError;
use crate::pipeline::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Backend,
    Input,
    Output,
    Internal,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "CONFIG",
            ErrorCategory::Backend => "BACKEND",
            ErrorCategory::Input => "INPUT",
            ErrorCategory::Output => "OUTPUT",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Configuration => {
                "Set provider credentials (for example OPENAI_API_KEY) or run stagecrew doctor."
            }
            ErrorCategory::Backend => {
                "Check network access and provider status, or retry with --retry-attempts 2 and RUST_LOG=info."
            }
            ErrorCategory::Input => "Run stagecrew scenarios to list valid scenario identifiers.",
            ErrorCategory::Output => "Check that --output-dir exists or can be created and is writable.",
            ErrorCategory::Internal => {
                "Retry with RUST_LOG=debug. If it persists, capture logs and open an issue."
            }
        }
    }
}

fn categorize_backend_error(err: &BackendError) -> ErrorCategory {
    match err {
        BackendError::NotConfigured(_) => ErrorCategory::Configuration,
        _ => ErrorCategory::Backend,
    }
}

pub fn categorize_error(err: &anyhow::Error) -> ErrorCategory {
    for cause in err.chain() {
        if let Some(pipeline_err) = cause.downcast_ref::<PipelineError>() {
            return match pipeline_err {
                PipelineError::StageFailed { source, .. } => categorize_backend_error(source),
                PipelineError::Empty | PipelineError::DuplicateStage(_) => ErrorCategory::Internal,
            };
        }
        if let Some(backend_err) = cause.downcast_ref::<BackendError>() {
            return categorize_backend_error(backend_err);
        }
    }

    let msg = format!("{err:#}").to_ascii_lowercase();

    if msg.contains("unknown scenario")
        || msg.contains("no scenario")
        || msg.contains("failed to read input")
        || msg.contains("invalid value")
    {
        return ErrorCategory::Input;
    }

    if msg.contains("api_key")
        || msg.contains("no provider could be auto-detected")
        || msg.contains("is required")
        || msg.contains("provider")
        || msg.contains("profile")
        || msg.contains("invalid generation settings")
    {
        return ErrorCategory::Configuration;
    }

    if msg.contains("report") {
        return ErrorCategory::Output;
    }

    ErrorCategory::Internal
}

pub fn format_cli_error(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let category = categorize_error(err);
    let rendered_error = render_error_message(err, show_sensitive_config);
    format!(
        "[{}] {}\nHint: {}",
        category.code(),
        rendered_error,
        category.hint()
    )
}

pub fn render_error_message(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let full = format!("{err:#}");
    if show_sensitive_config {
        full
    } else {
        redact_sensitive_text(&full)
    }
}

pub fn redact_sensitive_text(text: &str) -> String {
    const KEY_PREFIXES: [&str; 2] = ["sk-", "gsk_"];
    let mut out = text.to_string();
    for prefix in KEY_PREFIXES {
        out = redact_prefixed_tokens(&out, prefix);
    }
    out
}

/// Replaces every token that starts with `prefix` at a word boundary with
/// `<prefix>[REDACTED]`.
pub fn redact_prefixed_tokens(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    while let Some(offset) = text[cursor..].find(prefix) {
        let start = cursor + offset;
        let at_boundary = text[..start]
            .chars()
            .next_back()
            .is_none_or(|ch| !ch.is_ascii_alphanumeric() && ch != '_' && ch != '-');
        out.push_str(&text[cursor..start]);

        let remainder = &text[start..];
        let end = remainder
            .find(|ch: char| {
                ch.is_whitespace()
                    || matches!(
                        ch,
                        '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';'
                    )
            })
            .unwrap_or(remainder.len());
        let token = &remainder[..end];

        if at_boundary && token.len() > prefix.len() {
            out.push_str(prefix);
            out.push_str("[REDACTED]");
        } else {
            out.push_str(token);
        }
        cursor = start + end;
    }

    out.push_str(&text[cursor..]);
    out
}
