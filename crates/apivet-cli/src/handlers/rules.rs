//! Rule catalog listing

use crate::cli::OutputFormat;
use crate::config;
use crate::error::{Result, EXIT_PASS};
use crate::output::OutputWriter;
use apivet_core::{Severity, ValidationConfig};
use serde::Serialize;
use std::path::Path;

/// One row of the catalog as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct RuleRow {
    code: &'static str,
    default_severity: Severity,
    /// `None` when the configuration turns the rule off
    effective: Option<Severity>,
    description: &'static str,
}

/// Handle the rules command
pub async fn handle_rules(config_path: Option<&Path>, output: &mut OutputWriter) -> Result<i32> {
    let loaded = config::load(config_path, false)?;
    let rows = catalog_rows(&loaded.resolved.config);

    output.section("Built-in rules")?;
    if output.format() == OutputFormat::Human {
        output.table(
            &["Code", "Default", "Effective", "Description"],
            rows.iter()
                .map(|row| {
                    vec![
                        row.code.to_string(),
                        row.default_severity.to_string(),
                        row.effective.map_or_else(|| "off".to_string(), |s| s.to_string()),
                        row.description.to_string(),
                    ]
                })
                .collect(),
        )?;
    } else {
        output.data(&rows)?;
    }
    Ok(EXIT_PASS)
}

fn catalog_rows(config: &ValidationConfig) -> Vec<RuleRow> {
    let ruleset = config.to_ruleset();
    config::resolver()
        .catalog()
        .iter()
        .map(|rule| RuleRow {
            code: rule.code,
            default_severity: rule.default_severity,
            effective: ruleset.severity(rule.code),
            description: rule.description,
        })
        .collect()
}
