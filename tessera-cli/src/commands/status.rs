//! `tessera status`: local drift for every tracked template.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tessera_core::{types::check_id, ArtifactRef, CollectionId, TrackedFile, Workspace};
use tessera_sync::{backup::list_snapshots, detect, detect::BaselineState, writer::has_local_copy};

/// Arguments for `tessera status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Limit to one collection.
    pub collection: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let workspace = Workspace::open(root)
            .with_context(|| format!("failed to open workspace at '{}'", root.display()))?;

        let collections: Vec<CollectionId> = match self.collection {
            Some(name) => {
                check_id("collection", &name)?;
                vec![CollectionId::from(name)]
            }
            None => known_collections(&workspace)?,
        };

        let mut rows = Vec::new();
        for collection in &collections {
            for artifact in artifacts_of(&workspace, collection)? {
                rows.push(artifact_status(&workspace, artifact)?);
            }
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(rows);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum State {
    /// Declared but never pulled.
    Missing,
    /// Files present, no baseline to compare against.
    Untracked,
    Clean,
    Modified,
}

#[derive(Debug, Clone, Serialize)]
struct ArtifactStatus {
    collection: String,
    artifact: String,
    state: State,
    changed: Vec<String>,
    warnings: Vec<String>,
    backups: usize,
    last_backup: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "template")]
    template: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "backups")]
    backups: String,
}

/// Declared collections plus any that only exist on disk.
fn known_collections(workspace: &Workspace) -> Result<Vec<CollectionId>> {
    let mut names: BTreeSet<CollectionId> = workspace.config.collections.keys().cloned().collect();
    let templates = workspace.templates_dir();
    if templates.exists() {
        let entries = std::fs::read_dir(&templates)
            .with_context(|| format!("failed to read '{}'", templates.display()))?;
        for entry in entries.filter_map(|e| e.ok()) {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                names.insert(CollectionId::from(entry.file_name().to_string_lossy().into_owned()));
            }
        }
    }
    Ok(names.into_iter().collect())
}

fn artifacts_of(workspace: &Workspace, collection: &CollectionId) -> Result<Vec<ArtifactRef>> {
    let mut all: BTreeSet<ArtifactRef> = workspace
        .config
        .artifacts_in(collection)
        .unwrap_or_default()
        .into_iter()
        .collect();
    all.extend(
        workspace
            .local_artifacts(collection)
            .with_context(|| format!("failed to list templates in '{collection}'"))?,
    );
    Ok(all.into_iter().collect())
}

fn artifact_status(workspace: &Workspace, artifact: ArtifactRef) -> Result<ArtifactStatus> {
    let dir = workspace.artifact_dir(&artifact);
    let snapshots = list_snapshots(&dir).with_context(|| format!("failed to list backups for '{artifact}'"))?;
    let last_backup = snapshots.last().and_then(|p| snapshot_age(p));

    let (state, changed, warnings) = if !has_local_copy(&dir) {
        (State::Missing, Vec::new(), Vec::new())
    } else {
        let report = detect(&dir, &TrackedFile::names());
        let changed: Vec<String> = report
            .changed()
            .map(|c| format!("{} {}", c.file, c.status))
            .collect();
        let state = match (report.baseline, changed.is_empty()) {
            (BaselineState::FirstPull, _) => State::Untracked,
            (BaselineState::Tracked, true) => State::Clean,
            (BaselineState::Tracked, false) => State::Modified,
        };
        (state, changed, report.warnings)
    };

    Ok(ArtifactStatus {
        collection: artifact.collection.0,
        artifact: artifact.artifact.0,
        state,
        changed,
        warnings,
        backups: snapshots.len(),
        last_backup,
    })
}

/// Age of a snapshot from its directory name (`20261018T093012.481Z[-N]`).
fn snapshot_age(snapshot: &Path) -> Option<String> {
    let name = snapshot.file_name()?.to_str()?;
    let stamp = name.split('-').next()?;
    let taken = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S%.3fZ").ok()?;
    let seconds = Utc::now()
        .naive_utc()
        .signed_duration_since(taken)
        .num_seconds()
        .max(0) as u64;
    Some(format_seconds(seconds))
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

fn print_table(rows: Vec<ArtifactStatus>) {
    let modified = rows.iter().filter(|r| r.state == State::Modified).count();
    println!(
        "Tessera v{} | {} templates | {} modified",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        modified
    );
    if rows.is_empty() {
        println!("No templates tracked.");
        return;
    }

    let separator = "■".repeat(60).bright_black().to_string();
    let mut grouped = BTreeMap::<String, Vec<ArtifactStatus>>::new();
    for row in rows {
        grouped.entry(row.collection.clone()).or_default().push(row);
    }

    println!("{separator}");
    println!(
        "Indicators: {} CLEAN  {} MODIFIED  {} UNTRACKED  {} MISSING",
        indicator(State::Clean),
        indicator(State::Modified),
        indicator(State::Untracked),
        indicator(State::Missing),
    );
    println!("{separator}");
    for (collection, rows) in grouped {
        println!("{}", collection.to_uppercase().bold());
        let table_rows: Vec<StatusTableRow> = rows
            .into_iter()
            .map(|row| StatusTableRow {
                template: row.artifact,
                state: format!("{} {}", indicator(row.state), label(row.state)),
                detail: detail(row.state, &row.changed),
                backups: match row.last_backup {
                    Some(age) => format!("{} (last {age} ago)", row.backups),
                    None => row.backups.to_string(),
                },
            })
            .collect();
        let mut table = Table::new(table_rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{separator}");
    }

    if modified > 0 {
        println!("Run 'tessera diff <collection> <template>' to review local edits before pulling.");
    }
}

fn label(state: State) -> &'static str {
    match state {
        State::Missing => "MISSING",
        State::Untracked => "UNTRACKED",
        State::Clean => "CLEAN",
        State::Modified => "MODIFIED",
    }
}

fn indicator(state: State) -> String {
    match state {
        State::Missing => "■".bright_black().bold().to_string(),
        State::Untracked => "■".yellow().bold().to_string(),
        State::Clean => "■".green().bold().to_string(),
        State::Modified => "■".red().bold().to_string(),
    }
}

fn detail(state: State, changed: &[String]) -> String {
    match state {
        State::Missing => "not pulled yet".to_string(),
        State::Untracked => "no fingerprint baseline".to_string(),
        State::Clean => "matches last pull".to_string(),
        State::Modified => summarize(changed),
    }
}

fn summarize(changed: &[String]) -> String {
    let mut shown: Vec<String> = changed.iter().take(2).cloned().collect();
    if changed.len() > shown.len() {
        shown.push(format!("+{} more", changed.len() - shown.len()));
    }
    shown.join(", ")
}
