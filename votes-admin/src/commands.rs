//! Execution of admin commands.
use tracing::{info, warn};
use votes_shared::types::{CounterDrift, MigrationPreview, MigrationSummary};
use crate::cli::Command;
use crate::config::Dependencies;
use crate::errors::AdminError;

/// Runs a command and prints its result to stdout.
///
/// Returns an error when the command could not run, or when it ran but left
/// failures or drift behind, so the process exits non-zero.
pub async fn run(command: Command, dependencies: &Dependencies, json: bool) -> Result<(), AdminError> {
    match command {
        Command::Migrate { from, to } => {
            let summary = dependencies.migration.migrate_category(from, to).await?;
            println!("{}", render_summary(&summary, json)?);
            if !summary.is_clean() {
                return Err(AdminError::MigrationIncomplete {
                    failures: summary.failures.len(),
                });
            }
        }
        Command::Preview { from, to } => {
            let preview = dependencies.migration.preview(from, to).await?;
            println!("{}", render_preview(&preview, json)?);
        }
        Command::Audit => {
            let drifts = dependencies.auditor.audit_all().await?;
            println!("{}", render_drifts(&drifts, json)?);
            if !drifts.is_empty() {
                warn!(entities = drifts.len(), "Counter drift found");
                return Err(AdminError::DriftDetected {
                    entities: drifts.len(),
                });
            }
            info!("All counters match their vote records");
        }
    }
    Ok(())
}

pub fn render_summary(summary: &MigrationSummary, json: bool) -> Result<String, AdminError> {
    if json {
        return Ok(serde_json::to_string_pretty(summary)?);
    }
    let mut lines = vec![summary.to_string()];
    lines.extend(summary.failures.iter().map(|failure| format!("  - {failure}")));
    Ok(lines.join("\n"))
}

pub fn render_preview(preview: &MigrationPreview, json: bool) -> Result<String, AdminError> {
    if json {
        return Ok(serde_json::to_string_pretty(preview)?);
    }
    Ok(format!(
        "migration {}: {} records on {} entities in {} batches",
        preview.migration,
        preview.candidate_record_count,
        preview.affected_entities,
        preview.planned_batches
    ))
}

pub fn render_drifts(drifts: &[CounterDrift], json: bool) -> Result<String, AdminError> {
    if json {
        return Ok(serde_json::to_string_pretty(drifts)?);
    }
    if drifts.is_empty() {
        return Ok("no counter drift".to_string());
    }
    Ok(drifts
        .iter()
        .map(|drift| {
            format!(
                "{}: stored {:?}, actual {:?}",
                drift.entity_id, drift.stored, drift.actual
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
