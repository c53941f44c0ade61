use std::path::PathBuf;

use bisect::{BatchReport, Selection, Workspace};
use tracing::instrument;

use super::{Scope, names, print_failures, resolve, terminal::Colorize};

/// Arguments shared by `enable`, `disable` and `exclude`.
#[derive(Debug, clap::Parser)]
pub struct Edit {
    /// The mods to change, for example `7,2-5,jei`
    ///
    /// Numbers are positions in the listing chosen with `--from`; anything
    /// containing a letter is matched against mod names.
    selection: Selection,

    /// The listing positions refer to
    #[arg(long, value_enum, default_value_t)]
    from: Scope,
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Enable,
    Disable,
    Exclude,
}

impl Edit {
    #[instrument]
    pub fn run(self, root: PathBuf, action: Action) -> anyhow::Result<()> {
        let mut workspace = Workspace::open(root)?;
        let selected = resolve(workspace.session(), &self.selection, self.from)?;
        tracing::debug!("Selected {}", names(workspace.session(), &selected));

        let session = workspace.session_mut();
        let report = match action {
            Action::Enable => session.enable_many(&selected),
            Action::Disable => session.disable_many(&selected),
            Action::Exclude => session.toggle_exclusions(&selected),
        };
        workspace.flush()?;

        let (summary, clean) = summary(action, &report);
        if clean {
            println!("{}", summary.success());
        } else {
            println!("{}", summary.warning());
        }
        if report.skipped() > 0 {
            println!(
                "{}",
                format!("{} excluded mods were left enabled", report.skipped()).dim()
            );
        }
        print_failures(workspace.session(), &report);

        Ok(())
    }
}

/// The one-line summary of a batch, and whether nothing in it failed.
///
/// Excluded mods left alone by `disable` are not failures.
fn summary(action: Action, report: &BatchReport) -> (String, bool) {
    let (succeeded, total) = (report.succeeded(), report.total());
    let text = match action {
        Action::Enable => format!("Enabled {succeeded}/{total} selected mods"),
        Action::Disable => format!("Disabled {succeeded}/{total} selected mods"),
        Action::Exclude => format!("Toggled exclusion on {succeeded}/{total} selected mods"),
    };
    (text, succeeded + report.skipped() == total)
}

#[cfg(test)]
mod tests {
    use bisect::{Entry, EntryId, MemoryToggle, Session};

    use super::*;
    use crate::cli::tests::workspace;

    fn edit(selection: &str, from: Scope) -> Edit {
        Edit {
            selection: selection.parse().unwrap(),
            from,
        }
    }

    #[test]
    fn disable_by_name_and_position() {
        let tmp = workspace(&["create.jar", "jei.jar", "sodium.jar"]);
        let root = tmp.path().to_path_buf();

        edit("jei,2", Scope::All)
            .run(root.clone(), Action::Disable)
            .unwrap();

        assert!(tmp.path().join("mods/create.jar").exists());
        assert!(tmp.path().join("mods/jei.jar.disabled").exists());
        assert!(tmp.path().join("mods/sodium.jar.disabled").exists());
    }

    #[test]
    fn positions_follow_the_chosen_listing() {
        let tmp = workspace(&["a.jar", "b.jar.disabled", "c.jar.disabled"]);
        let root = tmp.path().to_path_buf();

        edit("1", Scope::Disabled)
            .run(root, Action::Enable)
            .unwrap();

        assert!(tmp.path().join("mods/b.jar.disabled").exists());
        assert!(tmp.path().join("mods/c.jar").exists());
    }

    #[test]
    fn exclusion_is_persisted_and_protects_from_disable() {
        let tmp = workspace(&["a.jar", "b.jar"]);
        let root = tmp.path().to_path_buf();

        edit("b", Scope::All)
            .run(root.clone(), Action::Exclude)
            .unwrap();
        edit("0-1", Scope::All)
            .run(root.clone(), Action::Disable)
            .unwrap();

        let workspace = Workspace::open(root).unwrap();
        assert!(workspace.session().entries()[1].is_excluded());
        assert!(tmp.path().join("mods/a.jar.disabled").exists());
        assert!(tmp.path().join("mods/b.jar").exists());
    }

    #[test]
    fn excluded_mods_do_not_make_a_disable_partial() {
        let entries = ["a.jar", "b.jar"]
            .into_iter()
            .map(|id| Entry::new(EntryId::try_from(id).unwrap(), true))
            .collect();
        let mut session = Session::new(entries, MemoryToggle::new()).unwrap();
        session.toggle_exclusion(1).unwrap();

        let report = session.disable_many(&[0, 1]);
        let (text, clean) = summary(Action::Disable, &report);

        assert_eq!(text, "Disabled 1/2 selected mods");
        assert!(clean);

        session
            .toggle_mut()
            .fail_on(EntryId::try_from("a.jar").unwrap());
        let report = session.enable_many(&[0]);
        let (text, clean) = summary(Action::Enable, &report);

        assert_eq!(text, "Enabled 0/1 selected mods");
        assert!(!clean);
    }

    #[test]
    fn unresolvable_selection_changes_nothing() {
        let tmp = workspace(&["a.jar", "b.jar"]);
        let root = tmp.path().to_path_buf();

        let result = edit("0,5", Scope::All).run(root, Action::Disable);

        assert!(result.is_err());
        assert!(tmp.path().join("mods/a.jar").exists());
    }
}
