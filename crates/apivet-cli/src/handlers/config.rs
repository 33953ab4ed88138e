//! Configuration command handlers

use crate::cli::{ConfigAction, ConfigArgs, ConfigFormat, ConfigShowArgs};
use crate::config::{self, LoadedConfig};
use crate::error::{Result, EXIT_PASS, EXIT_VALIDATION_FAILURE};
use crate::output::OutputWriter;
use std::path::Path;

/// Handle the config command
pub async fn handle_config(
    args: ConfigArgs,
    config_path: Option<&Path>,
    output: &mut OutputWriter,
) -> Result<i32> {
    let loaded = config::load(config_path, false)?;
    match args.action {
        ConfigAction::Show(show_args) => handle_config_show(show_args, &loaded, output),
        ConfigAction::Check => handle_config_check(&loaded, output),
    }
}

/// Print the effective configuration
fn handle_config_show(args: ConfigShowArgs, loaded: &LoadedConfig, output: &mut OutputWriter) -> Result<i32> {
    match &loaded.path {
        Some(path) => output.info(&format!("Configuration from {}", path.display()))?,
        None => output.info("No configuration file, showing defaults")?,
    }

    let config = &loaded.resolved.config;
    let rendered = match args.format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    output.writeln(rendered.trim_end())?;
    Ok(EXIT_PASS)
}

/// Report every notice; warnings make the check fail
fn handle_config_check(loaded: &LoadedConfig, output: &mut OutputWriter) -> Result<i32> {
    let source = loaded
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());

    for notice in &loaded.resolved.notices {
        if notice.is_warning() {
            output.warning(&notice.to_string())?;
        } else {
            output.info(&notice.to_string())?;
        }
    }

    if loaded.warnings().is_empty() {
        output.success(&format!("✓ Configuration is valid ({})", source))?;
        Ok(EXIT_PASS)
    } else {
        output.error(&format!("Configuration has {} problem(s) ({})", loaded.warnings().len(), source))?;
        Ok(EXIT_VALIDATION_FAILURE)
    }
}
