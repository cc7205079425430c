//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RadarBlueprint, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    port: String,
    baud_rate: u32,
    queue_capacity: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    match result.error {
        None => Ok(()),
        Some(error) => Err(CliError::config_validation(error).into()),
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    port: blueprint.link.path.clone(),
                    baud_rate: blueprint.link.baud_rate,
                    queue_capacity: blueprint.pipeline.queue_capacity,
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RadarBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - decoded reports will be dropped".to_string());
    } else if !blueprint
        .sinks
        .iter()
        .any(|s| s.sink_type == SinkType::Broadcast)
    {
        warnings.push("No broadcast sink - `run` will not print a report summary".to_string());
    }

    if blueprint.link.baud_rate != 256_000 {
        warnings.push(format!(
            "link.baud_rate is {} - the sensor ships at 256000",
            blueprint.link.baud_rate
        ));
    }

    if blueprint.pipeline.queue_capacity < 2 {
        warnings.push("pipeline.queue_capacity < 2 - most frames will be dropped under load".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Port: {} @ {} baud", summary.port, summary.baud_rate);
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_reports_summary() {
        let file = config_file("[link]\npath = \"/dev/ttyUSB0\"\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = config_file("[pipeline]\nqueue_capacity = 0\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("queue_capacity"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_warnings() {
        let mut blueprint = RadarBlueprint::default();
        assert!(collect_warnings(&blueprint).is_empty());

        blueprint.sinks.clear();
        blueprint.link.baud_rate = 115_200;
        assert_eq!(collect_warnings(&blueprint).len(), 2);
    }
}
