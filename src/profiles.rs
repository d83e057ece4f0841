use anyhow::Result;

use crate::config::{ProfilesFile, RuntimeConfig};
use crate::provider::provider_label;

pub fn run_profiles_list(profiles: &ProfilesFile, cfg: &RuntimeConfig) -> Result<()> {
    let mut names = profiles.profiles.keys().cloned().collect::<Vec<String>>();
    if !names.iter().any(|name| name == "default") {
        names.push("default".to_string());
    }
    names.sort();

    println!("Configured profiles (active='{}'):", cfg.profile);
    for name in names {
        let marker = if name == cfg.profile { "*" } else { " " };
        let source = if profiles.profiles.contains_key(&name) {
            "configured"
        } else {
            "implicit"
        };
        println!("{marker} {name} ({source})");
    }

    Ok(())
}

pub fn run_profiles_show(cfg: &RuntimeConfig) -> Result<()> {
    println!("Active profile: {}", cfg.profile);
    println!("Config path: {}", cfg.config_path);
    println!("Provider: {}", provider_label(cfg.provider));
    println!(
        "Model: {}",
        cfg.model.as_deref().unwrap_or("<provider-default>")
    );
    println!(
        "API base: {}",
        cfg.api_base.as_deref().unwrap_or("<provider-default>")
    );
    println!("Temperature: {}", cfg.temperature);
    println!("Max tokens: {}", cfg.max_tokens);
    println!("Request timeout (secs): {}", cfg.request_timeout_secs);
    println!(
        "Deadline (secs): {}",
        cfg.deadline_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!("Retry attempts: {}", cfg.retry_attempts);
    println!("Retry delay (ms): {}", cfg.retry_delay_ms);
    println!("Output dir: {}", cfg.output_dir);
    println!("Write report: {}", cfg.write_report);
    println!("Telemetry enabled: {}", cfg.telemetry_enabled);
    println!("Telemetry path: {}", cfg.telemetry_path);
    Ok(())
}
