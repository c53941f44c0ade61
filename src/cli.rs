use std::path::{Path, PathBuf};

mod depend;
mod edit;
mod list;
mod require;
mod search;
mod state;
mod status;
mod terminal;

use bisect::{BatchReport, Entry, Selection, Session, Workspace};
use clap::ArgAction;
use edit::Edit;
use list::List;
use status::Status;
use terminal::Colorize;
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The directory holding the mods folder and the `.bisect` directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show the search history and mod counts (default)
    Status(Status),

    /// Write a default configuration to `.bisect/config.toml`
    Init,

    /// List mods
    List(List),

    /// Disable the upper half of the current candidates
    Narrow,

    /// Swap the last narrowing for the other half
    ///
    /// Use this when the problem went away after the last narrowing: the
    /// culprit is in the half that was just disabled.
    Swap,

    /// Undo the last narrowing
    Undo,

    /// Enable every mod and start the search over
    Reset,

    /// Enable the selected mods
    Enable(Edit),

    /// Disable the selected mods
    Disable(Edit),

    /// Toggle exclusion on the selected mods
    ///
    /// Excluded mods are enabled and never disabled by the search.
    Exclude(Edit),

    /// Manage the mods that depend on the selected mods
    Depend(depend::Command),

    /// Manage the mods the selected mods require
    Require(require::Command),

    /// Save the current state under a name
    Export(state::Export),

    /// Apply a saved state
    Import(state::Import),

    /// List saved states
    States,
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::List(command) => command.run(root)?,
            Self::Narrow => search::narrow(root)?,
            Self::Swap => search::swap(root)?,
            Self::Undo => search::undo(root)?,
            Self::Reset => search::reset(root)?,
            Self::Enable(command) => command.run(root, edit::Action::Enable)?,
            Self::Disable(command) => command.run(root, edit::Action::Disable)?,
            Self::Exclude(command) => command.run(root, edit::Action::Exclude)?,
            Self::Depend(command) => command.run(root)?,
            Self::Require(command) => command.run(root)?,
            Self::Export(command) => command.run(root)?,
            Self::Import(command) => command.run(root)?,
            Self::States => state::list(root)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        let path = Workspace::init(root)?;

        println!("Initialized bisection workspace in {}", root.display());
        println!("  Created: {}", path.display());
        println!();
        println!("Next steps:");
        println!("  bisect list");
        println!("  bisect narrow");

        Ok(())
    }
}

/// Which mods positional indices in a selection refer to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Scope {
    /// Every mod
    #[default]
    All,
    /// Enabled mods only
    Enabled,
    /// Disabled mods only
    Disabled,
}

impl Scope {
    /// Registry indices of the mods in scope, in registry order.
    pub fn displayed(self, entries: &[Entry]) -> Vec<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| match self {
                Self::All => true,
                Self::Enabled => entry.is_enabled(),
                Self::Disabled => !entry.is_enabled(),
            })
            .map(|(index, _)| index)
            .collect()
    }
}

/// Resolve `selection` against the mods in `scope`.
fn resolve<T>(
    session: &Session<T>,
    selection: &Selection,
    scope: Scope,
) -> anyhow::Result<Vec<usize>> {
    let entries = session.entries();
    Ok(selection.resolve(entries, &scope.displayed(entries))?)
}

/// Print one line per failed entry of `report`.
fn print_failures<T>(session: &Session<T>, report: &BatchReport) {
    for (index, error) in report.failures() {
        eprintln!(
            "{}",
            format!("  {}: {error}", session.entries()[index].id()).error()
        );
    }
}

/// Ids of the selected mods, comma separated.
fn names<T>(session: &Session<T>, indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| session.entries()[i].id().as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
