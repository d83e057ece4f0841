use anyhow::Result;

use crate::config::RuntimeConfig;
use crate::provider::{
    CUSTOM_API_KEY_ENV, detect_provider, env_present, provider_label, resolve_backend_settings,
};

pub fn run_doctor(cfg: &RuntimeConfig) -> Result<()> {
    println!(
        "Active profile: '{}' (config: {})",
        cfg.profile, cfg.config_path
    );

    let checks = [
        ("OPENAI_API_KEY", env_present("OPENAI_API_KEY")),
        ("GROQ_API_KEY", env_present("GROQ_API_KEY")),
        ("DEEPSEEK_API_KEY", env_present("DEEPSEEK_API_KEY")),
        ("OLLAMA_HOST", env_present("OLLAMA_HOST")),
        (CUSTOM_API_KEY_ENV, env_present(CUSTOM_API_KEY_ENV)),
    ];

    println!("Provider environment check:");
    for (key, ok) in checks {
        let status = if ok { "set" } else { "missing" };
        println!("- {key}: {status}");
    }

    match detect_provider() {
        Some(provider) => println!("Auto provider resolution: {}", provider_label(provider)),
        None => {
            println!("Auto provider resolution: none");
            println!("Tip: export one provider key or run with --provider ollama");
        }
    }

    match resolve_backend_settings(cfg, |key| std::env::var(key).ok()) {
        Ok(settings) => println!(
            "Backend: ok (provider={}, model={}, api_base={})",
            provider_label(settings.provider),
            settings.model,
            settings.api_base
        ),
        Err(err) => println!("Backend: not ready ({err:#})"),
    }

    println!(
        "Generation: temperature={} max_tokens={}",
        cfg.temperature, cfg.max_tokens
    );
    println!(
        "Timeouts: request_secs={} deadline_secs={}",
        cfg.request_timeout_secs,
        cfg.deadline_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!(
        "Retry: attempts={} delay_ms={}",
        cfg.retry_attempts, cfg.retry_delay_ms
    );
    println!(
        "Reports: enabled={} output_dir={}",
        cfg.write_report, cfg.output_dir
    );
    println!(
        "Telemetry: enabled={} path={}",
        cfg.telemetry_enabled, cfg.telemetry_path
    );

    Ok(())
}
