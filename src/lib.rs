// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod store;
pub mod types;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{load_and_validate, project_name};
use crate::config::ProjectFile;
use crate::dag::{CriticalPath, StageGraph};
use crate::engine::{MovePreview, ScheduleEngine, SchedulingSession};
use crate::errors::PrincessError;
use crate::store::ProjectFileStore;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project file loading and validation
/// - the scheduling session over a file-backed stage store
/// - proposal, report printing and (optional) commit
pub async fn run(args: CliArgs) -> Result<()> {
    let path = args.project.clone();
    let project = load_and_validate(&path)?;

    if args.dry_run {
        print_dry_run(&project)?;
        return Ok(());
    }

    let name = project_name(&project, &path);
    let store = ProjectFileStore::new(&path);
    let mut session = SchedulingSession::open(store, &name, project.policy.clone()).await?;

    let Some(stage_id) = args.stage.as_deref() else {
        print_critical_path(session.graph(), &session.critical_path());
        return Ok(());
    };

    let stage = session.stage(stage_id)?;
    let (start, end) = match (args.start, args.end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => {
            let window = stage.window().starting_at(start)?;
            (window.start, window.end)
        }
        (None, Some(end)) => (stage.start_date, end),
        (None, None) => bail!("--stage needs --start and/or --end"),
    };

    let preview = session.propose(stage_id, start, end)?;
    print_preview(&preview);

    if args.commit {
        if !preview.report.is_applicable() {
            return Err(PrincessError::DependencyViolation(format!(
                "move of '{stage_id}' was rejected; not committing"
            ))
            .into());
        }
        let applied = session.commit(&preview.report).await?;
        info!(stages = applied.len(), path = %path.display(), "move written to project file");
        println!();
        println!("committed {} stage(s) to {}", applied.len(), path.display());
    }

    Ok(())
}

/// Process exit status for a failed run.
///
/// `2` when the move cannot be applied as proposed (rejected, or the
/// project changed underneath it), `1` for everything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PrincessError>() {
        Some(PrincessError::DependencyViolation(_) | PrincessError::StaleGraph(_)) => 2,
        _ => 1,
    }
}

fn print_preview(preview: &MovePreview) {
    let report = &preview.report;
    println!(
        "move '{}' ({}): {} -> {} ({:+}d) [{:?}]",
        report.stage_name,
        report.stage_id,
        report.original_window,
        report.proposed_window,
        report.shift_days(),
        report.outcome
    );

    if !report.affected.is_empty() {
        println!();
        println!(
            "affected ({}, {}d total delay):",
            report.affected.len(),
            report.total_adjustment_days()
        );
        for a in &report.affected {
            let marker = if a.on_critical_path { " *critical*" } else { "" };
            println!(
                "  - {} ({}): +{}d -> {}{marker}",
                a.stage_name, a.stage_id, a.adjustment_days, a.new_window
            );
        }
    }

    if !report.conflicts.is_empty() {
        println!();
        println!("conflicts ({}):", report.conflicts.len());
        for c in &report.conflicts {
            println!("  - [{}] {:?}: {}", c.severity, c.kind, c.message);
        }
    }

    println!();
    match &preview.suggestion {
        Some(s) => println!("suggestion: {s}"),
        None => println!("suggestion: none (move is clean)"),
    }
}

fn print_critical_path(graph: &StageGraph, critical: &CriticalPath) {
    println!("critical path ({} days):", critical.total_days());
    for id in critical.stages() {
        if let Some(stage) = graph.stage(id) {
            println!(
                "  {:>3}. {} ({}) {} [{}d]",
                stage.number_index,
                stage.name,
                stage.id,
                stage.window(),
                stage.duration_days()
            );
        }
    }
}

/// Dry-run output: stages, dependencies, ordering problems and critical path.
fn print_dry_run(project: &ProjectFile) -> Result<()> {
    let graph = StageGraph::build(project.to_stages())?;
    let engine = ScheduleEngine::new(project.policy.clone());

    println!("princess dry-run");
    println!("  policy = {:?}", project.policy);
    println!();

    let roots: Vec<&str> = graph.roots().iter().map(|s| s.id.as_str()).collect();
    println!("stages ({}, starting from {}):", graph.len(), roots.join(", "));
    for stage in graph.stages() {
        println!("  {:>3}. {} ({})", stage.number_index, stage.name, stage.id);
        println!("      category: {}", stage.category);
        println!("      status: {}", stage.status);
        println!("      dates: {}", stage.window());
        if !stage.dependencies.is_empty() {
            println!("      after: {:?}", stage.dependencies);
        }
        if stage.is_deliverable {
            println!("      deliverable: true");
        }
        if let Some(ref who) = stage.assigned_to {
            println!("      assigned_to: {who}");
        }
    }

    let violations = engine.audit_ordering(&graph);
    if !violations.is_empty() {
        println!();
        println!("ordering violations ({}):", violations.len());
        for v in violations {
            println!(
                "  - {} starts {}d before {} ends",
                v.stage_id, v.gap_days, v.dependency_id
            );
        }
    }

    println!();
    print_critical_path(&graph, &CriticalPath::compute(&graph));

    debug!("dry-run complete (nothing written)");
    Ok(())
}
