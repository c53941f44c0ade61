//! Bisect a set of mods to find the ones causing a problem.
//!
//! Mods are files in a directory. Disabling a mod renames it with a suffix.
//! A bisection repeatedly disables half of the remaining candidates, while
//! respecting requirements between mods and leaving excluded mods alone.

pub mod domain;
pub use domain::{
    ActiveRange, BatchReport, Config, DependentPolicy, Entry, EntryError, EntryId, History,
    MemoryToggle, RequirementGraph, Selection, SelectionError, Session, Toggle, ToggleError,
    UndoOutcome,
};

/// Filesystem storage: scanning mods, renaming them, and saved states.
pub mod storage;
pub use storage::{FsToggle, Snapshot, SnapshotError, Workspace};
