use std::path::PathBuf;

use bisect::{Selection, Workspace};
use tracing::instrument;

use super::{Scope, names, print_failures, resolve, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(subcommand)]
    command: DependCommand,

    /// The listing positions refer to
    #[arg(long, value_enum, default_value_t, global = true)]
    from: Scope,
}

#[derive(Debug, clap::Parser)]
enum DependCommand {
    /// Record that DEPENDENTS require each of the selected mods
    ///
    /// A selected mod that is disabled while one of its dependents is enabled
    /// is enabled straight away, unless `cascade_dependents` is turned off.
    Add {
        /// The required mods
        selection: Selection,
        /// The mods requiring them
        dependents: Selection,
    },

    /// Forget that DEPENDENTS require the selected mods
    Remove {
        /// The required mods
        selection: Selection,
        /// The mods no longer requiring them
        dependents: Selection,
    },

    /// Forget every dependent of the selected mods
    Reset {
        /// The mods to clear
        selection: Selection,
    },
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;

        let (report, summary) = match &self.command {
            DependCommand::Add {
                selection,
                dependents,
            } => {
                let targets = resolve(workspace.session(), selection, self.from)?;
                let dependents = resolve(workspace.session(), dependents, self.from)?;
                let summary = format!(
                    "Added {} as dependents of {}",
                    names(workspace.session(), &dependents),
                    names(workspace.session(), &targets)
                );
                let report = workspace
                    .session_mut()
                    .add_dependents(&targets, &dependents);
                (report, summary)
            }
            DependCommand::Remove {
                selection,
                dependents,
            } => {
                let targets = resolve(workspace.session(), selection, self.from)?;
                let dependents = resolve(workspace.session(), dependents, self.from)?;
                let summary = format!(
                    "Removed {} as dependents of {}",
                    names(workspace.session(), &dependents),
                    names(workspace.session(), &targets)
                );
                let report = workspace
                    .session_mut()
                    .remove_dependents(&targets, &dependents);
                (report, summary)
            }
            DependCommand::Reset { selection } => {
                let targets = resolve(workspace.session(), selection, self.from)?;
                let summary = format!(
                    "Reset dependents of {}",
                    names(workspace.session(), &targets)
                );
                let report = workspace.session_mut().reset_dependents_many(&targets);
                (report, summary)
            }
        };
        workspace.flush()?;

        println!("{}", summary.success());
        print_failures(workspace.session(), &report);
        Ok(())
    }
}
