//! The external effect that actually enables or disables an entry.

use std::{collections::HashSet, io, path::PathBuf};

use crate::domain::EntryId;

/// Applies an enabled state to the thing an entry stands for.
///
/// Implementations must not panic on failure: the session turns a
/// [`ToggleError`] into a per-entry report and leaves its own state alone.
pub trait Toggle {
    /// Enable or disable the entry with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying state could not be changed.
    fn set_enabled(&mut self, id: &EntryId, enabled: bool) -> Result<(), ToggleError>;
}

impl<T: Toggle + ?Sized> Toggle for &mut T {
    fn set_enabled(&mut self, id: &EntryId, enabled: bool) -> Result<(), ToggleError> {
        (**self).set_enabled(id, enabled)
    }
}

/// The external toggle failed.
#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    /// The file to rename was not where it was expected.
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    /// The rename target is already taken by another file.
    #[error("{} already exists", .0.display())]
    Collision(PathBuf),

    /// Any other I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The toggle refused the change.
    #[error("toggle rejected: {0}")]
    Rejected(String),
}

/// A [`Toggle`] that records the requested state in memory.
///
/// Individual ids can be made to fail, which makes it possible to exercise
/// partial batch failures without touching the file system.
#[derive(Debug, Default, Clone)]
pub struct MemoryToggle {
    failing: HashSet<EntryId>,
    calls: usize,
}

impl MemoryToggle {
    /// Creates a toggle where every change succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future toggle of `id` fail.
    pub fn fail_on(&mut self, id: EntryId) {
        self.failing.insert(id);
    }

    /// Let toggles of `id` succeed again.
    pub fn recover(&mut self, id: &EntryId) {
        self.failing.remove(id);
    }

    /// The number of toggle requests seen so far, failed ones included.
    #[must_use]
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

impl Toggle for MemoryToggle {
    fn set_enabled(&mut self, id: &EntryId, enabled: bool) -> Result<(), ToggleError> {
        self.calls += 1;
        if self.failing.contains(id) {
            let verb = if enabled { "enable" } else { "disable" };
            return Err(ToggleError::Rejected(format!("cannot {verb} {id}")));
        }
        Ok(())
    }
}
