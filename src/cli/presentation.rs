//! CLI presentation: text and json renderings of build reports and locate results.

use crate::cli::parse::OutputFormat;
use crate::diagnostics::Severity;
use crate::emit::WriteResult;
use crate::error::ApiError;
use crate::orchestrator::{BuildReport, BuildState};
use comfy_table::{presets, Table};
use owo_colors::OwoColorize;
use std::path::PathBuf;

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::Output(e.to_string()))
}

pub fn format_build_report(report: &BuildReport, format: OutputFormat) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => Ok(format_build_report_text(report)),
    }
}

fn format_build_report_text(report: &BuildReport) -> String {
    let operation = match report.kind {
        Some(kind) => format!("{} build", kind),
        None => "clean".to_string(),
    };
    let state = if report.is_failed() {
        format!("{}", report.state.red().bold())
    } else {
        format!("{}", report.state.green().bold())
    };
    let mut out = format!(
        "{} {} in {} ms: {} objects, {} created, {} updated, {} unchanged, {} deleted",
        operation,
        state,
        report.duration_ms,
        report.objects,
        report.count(WriteResult::Created),
        report.count(WriteResult::Updated),
        report.count(WriteResult::Unchanged),
        report.deleted.len(),
    );

    let written: Vec<_> = report.written().collect();
    if !written.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_header(vec!["Path", "Builder", "Source", "Surface", "Result"]);
        for record in written {
            let surface = if record.internal { "internal" } else { "published" };
            table.add_row(vec![
                record.path.display().to_string(),
                record.builder.clone(),
                record.source.clone().unwrap_or_else(|| "-".to_string()),
                surface.to_string(),
                record.result.to_string(),
            ]);
        }
        out.push_str("\n\n");
        out.push_str(&table.to_string());
    }

    if !report.deleted.is_empty() {
        out.push_str(&format!("\n\n{}", "Deleted:".bold()));
        for path in &report.deleted {
            out.push_str(&format!("\n  - {}", path.display()));
        }
    }

    if !report.diagnostics.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_header(vec!["Severity", "Code", "Object", "Builder", "Message"]);
        for diagnostic in &report.diagnostics {
            let severity = match diagnostic.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            };
            table.add_row(vec![
                severity.to_string(),
                diagnostic.code.to_string(),
                diagnostic.object_name.clone(),
                diagnostic.builder.clone().unwrap_or_else(|| "-".to_string()),
                diagnostic.message.clone(),
            ]);
        }
        out.push_str(&format!("\n\n{} ({}):\n", "Diagnostics".bold(), report.diagnostics.len()));
        out.push_str(&table.to_string());
    }

    if report.state == BuildState::Failed && report.kind.is_some() {
        out.push_str("\n\nThe pass did not complete; artifacts written so far were kept.");
    }
    out
}

pub fn format_locate_result(name: &str, paths: &[PathBuf], format: OutputFormat) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "object": name, "paths": paths })),
        OutputFormat::Text if paths.is_empty() => Ok(format!("{} produces no artifacts.", name)),
        OutputFormat::Text => Ok(paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n")),
    }
}
