//! Named saved states.

use std::path::PathBuf;

use bisect::Workspace;
use tracing::instrument;

use super::{print_failures, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Export {
    /// The name to save the state under
    name: String,
}

impl Export {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;
        let path = workspace.export(&self.name)?;

        println!(
            "{}",
            format!("State exported to {}", path.display()).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Import {
    /// The name of the saved state
    name: String,
}

impl Import {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;
        let report = workspace.import(&self.name)?;
        workspace.flush()?;

        println!(
            "{}",
            format!(
                "State imported from {}",
                workspace.state_path(&self.name)?.display()
            )
            .success()
        );
        println!(
            "Candidates: {}",
            workspace.session().history().top()
        );

        let session = workspace.session();
        print_failures(session, &report.exclusions);
        print_failures(session, &report.dependents);
        if let Some(replay) = &report.replay {
            print_failures(session, replay);
        }
        Ok(())
    }
}

#[instrument]
pub fn list(root: PathBuf) -> anyhow::Result<()> {
    let workspace = Workspace::open(root)?;
    let states = workspace.saved_states();

    if states.is_empty() {
        println!("No saved states yet. Create one with 'bisect export <NAME>'.");
        return Ok(());
    }

    println!("Saved states");
    println!("{}", "────────────".dim());
    for name in states {
        println!("{name}");
    }
    Ok(())
}
