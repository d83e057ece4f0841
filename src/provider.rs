use anyhow::{Context, Result};

use crate::backend::{BackendConfig, OpenAiCompatBackend, RetryConfig, RetryingBackend};
use crate::cli::Provider;
use crate::config::RuntimeConfig;

pub const CUSTOM_API_KEY_ENV: &str = "STAGECREW_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEndpoint {
    pub api_base: &'static str,
    pub api_key_env: Option<&'static str>,
    pub default_model: &'static str,
}

pub fn provider_endpoint(provider: Provider) -> Option<ProviderEndpoint> {
    match provider {
        Provider::Openai => Some(ProviderEndpoint {
            api_base: "https://api.openai.com/v1",
            api_key_env: Some("OPENAI_API_KEY"),
            default_model: "gpt-4o-mini",
        }),
        Provider::Groq => Some(ProviderEndpoint {
            api_base: "https://api.groq.com/openai/v1",
            api_key_env: Some("GROQ_API_KEY"),
            default_model: "llama-3.3-70b-versatile",
        }),
        Provider::Deepseek => Some(ProviderEndpoint {
            api_base: "https://api.deepseek.com/v1",
            api_key_env: Some("DEEPSEEK_API_KEY"),
            default_model: "deepseek-chat",
        }),
        Provider::Ollama => Some(ProviderEndpoint {
            api_base: "http://localhost:11434/v1",
            api_key_env: None,
            default_model: "llama3.1",
        }),
        Provider::Custom | Provider::Auto => None,
    }
}

pub fn validate_model_for_provider(provider: Provider, model_name: &str) -> Result<()> {
    let is_valid = match provider {
        Provider::Openai => {
            model_name.starts_with("gpt-")
                || model_name.starts_with("chatgpt")
                || model_name.starts_with("o1")
                || model_name.starts_with("o3")
                || model_name.starts_with("o4")
        }
        Provider::Deepseek => model_name.starts_with("deepseek"),
        Provider::Groq | Provider::Ollama | Provider::Custom => !model_name.trim().is_empty(),
        Provider::Auto => true,
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

/// Endpoint, credential and model chosen for a run, before any client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub provider: Provider,
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
}

pub fn resolve_backend_settings<F>(cfg: &RuntimeConfig, env: F) -> Result<BackendSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let provider = match cfg.provider {
        Provider::Auto => detect_provider_with(&present).context(
            "no provider could be auto-detected. Set one of OPENAI_API_KEY, GROQ_API_KEY, \
             DEEPSEEK_API_KEY, OLLAMA_HOST, or use --provider custom --api-base <url>",
        )?,
        p => p,
    };

    let (api_base, api_key, default_model) = match provider {
        Provider::Custom => {
            let api_base = cfg.api_base.clone().context(
                "--api-base is required for the custom provider (or set STAGECREW_API_BASE)",
            )?;
            let model = cfg
                .model
                .clone()
                .context("--model is required for the custom provider")?;
            (api_base, present(CUSTOM_API_KEY_ENV), model)
        }
        Provider::Ollama => {
            let endpoint = provider_endpoint(provider)
                .context("ollama provider has no built-in endpoint")?;
            let api_base = cfg.api_base.clone().unwrap_or_else(|| {
                present("OLLAMA_HOST")
                    .map(|host| ollama_api_base(&host))
                    .unwrap_or_else(|| endpoint.api_base.to_string())
            });
            (api_base, None, endpoint.default_model.to_string())
        }
        Provider::Openai | Provider::Groq | Provider::Deepseek => {
            let endpoint = provider_endpoint(provider)
                .with_context(|| format!("provider '{provider:?}' has no built-in endpoint"))?;
            let key_env = endpoint.api_key_env.unwrap_or(CUSTOM_API_KEY_ENV);
            let api_key = present(key_env)
                .with_context(|| format!("{key_env} is required for the {provider:?} provider"))?;
            let api_base = cfg
                .api_base
                .clone()
                .unwrap_or_else(|| endpoint.api_base.to_string());
            (api_base, Some(api_key), endpoint.default_model.to_string())
        }
        Provider::Auto => {
            return Err(anyhow::anyhow!(
                "auto provider must be resolved to a concrete provider"
            ));
        }
    };

    let model = cfg.model.clone().unwrap_or(default_model);
    validate_model_for_provider(provider, &model)?;

    Ok(BackendSettings {
        provider,
        api_base,
        api_key,
        model,
    })
}

/// `OLLAMA_HOST` may omit the scheme (`localhost:11434`); default it to http.
fn ollama_api_base(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        format!("{host}/v1")
    } else {
        format!("http://{host}/v1")
    }
}

pub fn resolve_backend(
    cfg: &RuntimeConfig,
) -> Result<(RetryingBackend<OpenAiCompatBackend>, BackendSettings)> {
    let settings = resolve_backend_settings(cfg, |key| std::env::var(key).ok())?;
    let backend = build_backend(cfg, &settings)?;
    Ok((backend, settings))
}

pub fn build_backend(
    cfg: &RuntimeConfig,
    settings: &BackendSettings,
) -> Result<RetryingBackend<OpenAiCompatBackend>> {
    let client = OpenAiCompatBackend::new(BackendConfig {
        name: provider_label(settings.provider).to_string(),
        api_base: settings.api_base.clone(),
        api_key: settings.api_key.clone(),
        request_timeout: cfg.request_timeout(),
    })
    .context("failed to configure backend client")?;

    let retry = RetryConfig {
        max_retries: cfg.retry_attempts,
        base_delay: std::time::Duration::from_millis(cfg.retry_delay_ms),
        ..RetryConfig::default()
    };
    Ok(RetryingBackend::new(client, retry))
}

pub fn provider_label(provider: Provider) -> &'static str {
    match provider {
        Provider::Auto => "auto",
        Provider::Openai => "openai",
        Provider::Groq => "groq",
        Provider::Deepseek => "deepseek",
        Provider::Ollama => "ollama",
        Provider::Custom => "custom",
    }
}

fn detect_provider_with<F>(present: F) -> Option<Provider>
where
    F: Fn(&str) -> Option<String>,
{
    if present("OPENAI_API_KEY").is_some() {
        return Some(Provider::Openai);
    }
    if present("GROQ_API_KEY").is_some() {
        return Some(Provider::Groq);
    }
    if present("DEEPSEEK_API_KEY").is_some() {
        return Some(Provider::Deepseek);
    }
    if present("OLLAMA_HOST").is_some() {
        return Some(Provider::Ollama);
    }
    None
}

pub fn detect_provider() -> Option<Provider> {
    detect_provider_with(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

pub fn env_present(key: &str) -> bool {
    std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}
