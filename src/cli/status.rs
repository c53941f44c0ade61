use std::path::PathBuf;

use bisect::{Session, Workspace};
use clap::Parser;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser, Default)]
#[command(about = "Show the search history and mod counts")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Counts shown by `bisect status`.
#[derive(Debug, Default, PartialEq, Eq)]
struct Counts {
    total: usize,
    enabled: usize,
    excluded: usize,
    candidates: usize,
    requirements: usize,
}

impl Counts {
    fn of<T>(session: &Session<T>) -> Self {
        let window = session.history().top();
        let entries = session.entries();
        Self {
            total: entries.len(),
            enabled: entries.iter().filter(|e| e.is_enabled()).count(),
            excluded: entries.iter().filter(|e| e.is_excluded()).count(),
            candidates: window
                .indices()
                .filter(|&i| !entries[i].is_excluded())
                .count(),
            requirements: session.graph().edge_count(),
        }
    }
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;
        let session = workspace.session();
        let counts = Counts::of(session);

        if counts.total == 0 {
            println!(
                "No mods found in {}.",
                workspace.root().join(&workspace.config().mods_dir).display()
            );
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => Self::output_json(session, &counts)?,
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(session, &counts);
                } else {
                    Self::output_table(session, &counts);
                }
            }
        }

        Ok(())
    }

    fn output_json<T>(session: &Session<T>, counts: &Counts) -> anyhow::Result<()> {
        use serde_json::json;

        let history: Vec<_> = session
            .history()
            .iter()
            .map(|range| json!([range.start(), range.end()]))
            .collect();

        let output = json!({
            "mods": {
                "total": counts.total,
                "enabled": counts.enabled,
                "disabled": counts.total - counts.enabled,
                "excluded": counts.excluded,
            },
            "requirements": counts.requirements,
            "history": history,
            "candidates": counts.candidates,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet<T>(session: &Session<T>, counts: &Counts) {
        let top = session.history().top();
        println!(
            "total={} enabled={} excluded={} depth={} window={},{}",
            counts.total,
            counts.enabled,
            counts.excluded,
            session.history().len() - 1,
            top.start(),
            top.end()
        );
    }

    fn output_table<T>(session: &Session<T>, counts: &Counts) {
        println!("Mods");
        println!("{}", "────".dim());
        println!("{:<13} {}", "Total", counts.total);
        println!("{:<13} {}", "Enabled", counts.enabled);
        println!("{:<13} {}", "Disabled", counts.total - counts.enabled);
        println!("{:<13} {}", "Excluded", counts.excluded);
        println!("{:<13} {}", "Requirements", counts.requirements);

        println!();
        println!("Search");
        println!("{}", "──────".dim());
        for (depth, range) in session.history().iter().enumerate() {
            println!("{:>2}: {range} ({} mods)", depth, range.width());
        }

        println!();
        if session.history().is_at_bottom() {
            println!("{}", "No narrowing yet. Run 'bisect narrow' to start.".dim());
        } else if counts.candidates <= 1 {
            println!(
                "Candidates: {} {}",
                counts.candidates.to_string().success(),
                "(search complete)".dim()
            );
        } else {
            println!("Candidates: {}", counts.candidates.to_string().warning());
            println!(
                "{}",
                "Check the problem, then 'bisect narrow' if it persists or 'bisect swap' if it \
                 went away."
                    .dim()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use bisect::{Entry, EntryId, MemoryToggle};

    use super::*;
    use crate::cli::tests::workspace;

    #[test]
    fn counts_track_window_and_exclusions() {
        let entries = (0..6)
            .map(|i| Entry::new(EntryId::try_from(format!("m{i}.jar")).unwrap(), true))
            .collect();
        let mut session = Session::new(entries, MemoryToggle::new()).unwrap();
        session.toggle_exclusion(1).unwrap();
        session.add_dependent(4, 5).unwrap();
        session.narrow(false);

        assert_eq!(
            Counts::of(&session),
            Counts {
                total: 6,
                enabled: 3,
                excluded: 1,
                candidates: 2,
                requirements: 1,
            }
        );
    }

    #[test]
    fn run_on_empty_and_populated_workspaces() {
        let empty = workspace(&[]);
        Status::default().run(empty.path().to_path_buf()).unwrap();

        let tmp = workspace(&["a.jar", "b.jar"]);
        for output in [OutputFormat::Table, OutputFormat::Json] {
            Status {
                output,
                quiet: false,
            }
            .run(tmp.path().to_path_buf())
            .unwrap();
        }
    }
}
