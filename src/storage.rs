pub mod mods_dir;
pub mod snapshot;
mod workspace;

pub use mods_dir::{FsToggle, ScanError, scan};
pub use snapshot::{Dependents, ImportReport, Snapshot, SnapshotError};
pub use workspace::{META_DIR, Workspace, WorkspaceError};
