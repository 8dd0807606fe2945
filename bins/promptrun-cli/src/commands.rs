// CLI commands for promptrun
use anyhow::{Context, Result, bail};
use promptrun_common::languages::LanguageTable;
use promptrun_common::types::{ErrorBody, GenerateRequest, GenerateResponse};
use std::path::Path;

/// Send a prompt to the API and print what came back
pub async fn generate(server: &str, prompt: &str, language: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!("Prompt cannot be empty");
    }

    let url = format!("{}/generate-and-run", server.trim_end_matches('/'));
    println!("🚀 Generating {} code via {}", language, url);

    let response = reqwest::Client::new()
        .post(&url)
        .json(&GenerateRequest {
            prompt: Some(prompt.to_string()),
            language: Some(language.to_string()),
        })
        .send()
        .await
        .with_context(|| format!("Failed to reach promptrun API at {}", server))?;

    let status = response.status();
    if !status.is_success() {
        let body: ErrorBody = response
            .json()
            .await
            .with_context(|| format!("API returned HTTP {} with an unreadable body", status))?;
        match body.details {
            Some(details) => bail!("{} (HTTP {}): {}", body.error, status.as_u16(), details),
            None => bail!("{} (HTTP {})", body.error, status.as_u16()),
        }
    }

    let body: GenerateResponse = response
        .json()
        .await
        .context("Failed to parse API response")?;

    println!("\n📝 Generated code:\n");
    println!("{}", body.generated_code);
    println!("\n▶️  Execution result:\n");
    println!("{}", format_execution_result(&body.execution_result));

    Ok(())
}

/// Human-readable summary of a Judge0 result object
pub fn format_execution_result(result: &serde_json::Value) -> String {
    let mut lines = Vec::new();

    let status = result
        .pointer("/status/description")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    lines.push(format!("status: {}", status));

    if let Some(time) = result.get("time").and_then(|v| v.as_str()) {
        lines.push(format!("time: {}s", time));
    }
    if let Some(memory) = result.get("memory").and_then(|v| v.as_u64()) {
        lines.push(format!("memory: {} KB", memory));
    }

    for (field, label) in [
        ("compile_output", "compile output"),
        ("stdout", "stdout"),
        ("stderr", "stderr"),
    ] {
        if let Some(text) = result.get(field).and_then(|v| v.as_str()) {
            if !text.is_empty() {
                lines.push(format!("{}:\n{}", label, text.trim_end()));
            }
        }
    }

    lines.join("\n")
}

fn load_table(config: Option<&Path>) -> Result<LanguageTable> {
    match config {
        Some(path) => LanguageTable::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => Ok(LanguageTable::builtin()),
    }
}

/// Print the language table
pub fn list_languages(config: Option<&Path>) -> Result<()> {
    let table = load_table(config)?;

    println!("{:<12} {:<12} {:>6}  {}", "KEY", "NAME", "JUDGE0", "MODE");
    for profile in table.profiles() {
        println!(
            "{:<12} {:<12} {:>6}  {}",
            profile.key, profile.display_name, profile.execution_language_id, profile.mode
        );
    }

    Ok(())
}

pub fn validate_config(path: &Path) -> Result<()> {
    let table = load_table(Some(path))?;
    println!(
        "✅ {} is valid ({} languages: {})",
        path.display(),
        table.len(),
        table.keys().join(", ")
    );
    Ok(())
}
