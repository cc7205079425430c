//! Command implementations.

mod info;
mod run;
mod track;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use track::run_track;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::RadarBlueprint;
use tracing::info;

use crate::cli::LinkOverrides;
use crate::error::CliError;

/// Load and validate a configuration file
fn load_blueprint(path: &Path) -> Result<RadarBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Apply `--port` / `--baud` on top of the loaded configuration
fn apply_link_overrides(blueprint: &mut RadarBlueprint, overrides: &LinkOverrides) {
    if let Some(ref port) = overrides.port {
        info!(port = %port, "Overriding serial port from CLI");
        blueprint.link.path = port.clone();
    }
    if let Some(baud) = overrides.baud {
        info!(baud, "Overriding baud rate from CLI");
        blueprint.link.baud_rate = baud;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_link_settings() {
        let mut blueprint = RadarBlueprint::default();
        let overrides = LinkOverrides {
            port: Some("/dev/ttyUSB3".to_string()),
            baud: Some(115_200),
        };
        apply_link_overrides(&mut blueprint, &overrides);
        assert_eq!(blueprint.link.path, "/dev/ttyUSB3");
        assert_eq!(blueprint.link.baud_rate, 115_200);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut blueprint = RadarBlueprint::default();
        apply_link_overrides(&mut blueprint, &LinkOverrides::default());
        assert_eq!(blueprint.link.path, "/dev/ttyAMA0");
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_blueprint(Path::new("/nonexistent/radar.toml")).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }
}
