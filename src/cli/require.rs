use std::path::PathBuf;

use bisect::{Selection, Workspace};
use tracing::instrument;

use super::{Scope, names, print_failures, resolve, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(subcommand)]
    command: RequireCommand,

    /// The listing positions refer to
    #[arg(long, value_enum, default_value_t, global = true)]
    from: Scope,
}

#[derive(Debug, clap::Parser)]
enum RequireCommand {
    /// Record that the selected mods require each of REQUIREMENTS
    Add {
        /// The mods with requirements
        selection: Selection,
        /// The mods they require
        requirements: Selection,
    },

    /// Forget that the selected mods require REQUIREMENTS
    Remove {
        /// The mods with requirements
        selection: Selection,
        /// The mods they no longer require
        requirements: Selection,
    },
}

impl Command {
    #[instrument]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;

        let (selection, requirements, add) = match &self.command {
            RequireCommand::Add {
                selection,
                requirements,
            } => (selection, requirements, true),
            RequireCommand::Remove {
                selection,
                requirements,
            } => (selection, requirements, false),
        };
        let targets = resolve(workspace.session(), selection, self.from)?;
        let requirements = resolve(workspace.session(), requirements, self.from)?;
        let pair = (
            names(workspace.session(), &requirements),
            names(workspace.session(), &targets),
        );

        let session = workspace.session_mut();
        let (report, summary) = if add {
            (
                session.add_requirements(&targets, &requirements),
                format!("Added {} as requirements of {}", pair.0, pair.1),
            )
        } else {
            (
                session.remove_requirements(&targets, &requirements),
                format!("Removed {} as requirements of {}", pair.0, pair.1),
            )
        };
        workspace.flush()?;

        println!("{}", summary.success());
        print_failures(workspace.session(), &report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::workspace;

    #[test]
    fn add_then_remove_requirement() {
        let tmp = workspace(&["addon.jar", "core.jar", "lib.jar"]);
        let root = tmp.path().to_path_buf();

        Command {
            command: RequireCommand::Add {
                selection: "addon".parse().unwrap(),
                requirements: "core,lib".parse().unwrap(),
            },
            from: Scope::All,
        }
        .run(root.clone())
        .unwrap();

        let workspace = Workspace::open(root.clone()).unwrap();
        assert!(workspace.session().graph().contains_edge(1, 0));
        assert!(workspace.session().graph().contains_edge(2, 0));

        Command {
            command: RequireCommand::Remove {
                selection: "addon".parse().unwrap(),
                requirements: "lib".parse().unwrap(),
            },
            from: Scope::All,
        }
        .run(root.clone())
        .unwrap();

        let workspace = Workspace::open(root).unwrap();
        assert!(workspace.session().graph().contains_edge(1, 0));
        assert!(!workspace.session().graph().contains_edge(2, 0));
    }

    #[test]
    fn self_requirement_is_reported_not_fatal() {
        let tmp = workspace(&["a.jar", "b.jar"]);

        Command {
            command: RequireCommand::Add {
                selection: "a.jar".parse().unwrap(),
                requirements: "a.jar,b.jar".parse().unwrap(),
            },
            from: Scope::All,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        let workspace = Workspace::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(workspace.session().graph().edge_count(), 1);
    }
}
