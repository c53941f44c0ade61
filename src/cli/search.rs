//! Driving the bisection: narrow, swap, undo and reset.

use std::path::PathBuf;

use bisect::{BatchReport, UndoOutcome, Workspace};
use tracing::instrument;

use super::{print_failures, terminal::Colorize};

#[instrument]
pub fn narrow(root: PathBuf) -> anyhow::Result<()> {
    let mut workspace = Workspace::open(root)?;
    let outcome = workspace.session_mut().narrow(false);
    workspace.flush()?;

    println!(
        "{}",
        format!("Narrowed search ({})", tally(&outcome.report, "disabled")).success()
    );
    println!("Candidates: {}", outcome.range);
    print_failures(workspace.session(), &outcome.report);
    Ok(())
}

#[instrument]
pub fn swap(root: PathBuf) -> anyhow::Result<()> {
    let mut workspace = Workspace::open(root)?;
    let outcome = workspace.session_mut().swap();
    workspace.flush()?;

    if let UndoOutcome::Undone { report, .. } = &outcome.undo {
        print_failures(workspace.session(), report);
    }
    println!(
        "{}",
        format!(
            "Swapped last narrowing to the other half ({})",
            tally(&outcome.narrow.report, "disabled")
        )
        .success()
    );
    println!("Candidates: {}", outcome.narrow.range);
    print_failures(workspace.session(), &outcome.narrow.report);
    Ok(())
}

#[instrument]
pub fn undo(root: PathBuf) -> anyhow::Result<()> {
    let mut workspace = Workspace::open(root)?;
    let outcome = workspace.session_mut().undo();
    workspace.flush()?;

    match outcome {
        UndoOutcome::NothingToUndo => println!("{}", "Nothing to undo".info()),
        UndoOutcome::Undone { range, report } => {
            println!(
                "{}",
                format!("Undid last narrowing ({})", tally(&report, "enabled")).success()
            );
            println!("Candidates: {range}");
            print_failures(workspace.session(), &report);
        }
    }
    Ok(())
}

#[instrument]
pub fn reset(root: PathBuf) -> anyhow::Result<()> {
    let mut workspace = Workspace::open(root)?;
    let report = workspace.session_mut().reset();
    workspace.flush()?;

    println!(
        "{}",
        format!("Reset search ({})", tally(&report, "enabled")).success()
    );
    print_failures(workspace.session(), &report);
    Ok(())
}

/// `3/4 disabled`, noting excluded mods that were left alone.
fn tally(report: &BatchReport, verb: &str) -> String {
    let skipped = report.skipped();
    let succeeded = report.succeeded();
    let attempted = report.total() - skipped;
    if skipped == 0 {
        format!("{succeeded}/{attempted} {verb}")
    } else {
        format!("{succeeded}/{attempted} {verb}, {skipped} excluded")
    }
}
