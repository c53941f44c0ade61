//! Mods as files in a directory.
//!
//! An enabled mod is a file such as `jei.jar`. Disabling it renames the file
//! to `jei.jar.disabled`; enabling it renames it back.

use std::{
    fs,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::domain::{Config, Entry, EntryId, Toggle, ToggleError};

/// Errors that can occur while scanning a mods directory.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The mods directory does not exist.
    #[error("mods directory {} not found", .0.display())]
    MissingDirectory(PathBuf),

    /// The directory could not be read.
    #[error("failed to read mods directory: {0}")]
    Io(#[from] walkdir::Error),
}

/// List the mods in `dir`, sorted by id.
///
/// Only files directly inside `dir` are considered. Files ending in
/// `.<extension>` are enabled mods, files ending in
/// `.<extension><disabled_suffix>` are disabled ones, and everything else is
/// ignored.
///
/// # Errors
///
/// Returns an error if the directory is missing or cannot be read.
pub fn scan(dir: &Path, config: &Config) -> Result<Vec<Entry>, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::MissingDirectory(dir.to_path_buf()));
    }

    let enabled_suffix = format!(".{}", config.extension());
    let disabled_suffix = format!("{enabled_suffix}{}", config.disabled_suffix());

    let mut entries = Vec::new();
    for dir_entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type().is_file() {
            continue;
        }

        let Some(name) = dir_entry.file_name().to_str() else {
            tracing::debug!("Skipping non UTF-8 file name {:?}", dir_entry.file_name());
            continue;
        };

        let (id, enabled) = if name.ends_with(&disabled_suffix) {
            (&name[..name.len() - config.disabled_suffix().len()], false)
        } else if name.ends_with(&enabled_suffix) {
            (name, true)
        } else {
            tracing::trace!("Skipping unrecognised file {name}");
            continue;
        };

        match EntryId::try_from(id) {
            Ok(id) => entries.push(Entry::new(id, enabled)),
            Err(e) => tracing::debug!("Skipping {name}: {e}"),
        }
    }

    entries.sort_by(|a, b| a.id().cmp(b.id()));
    tracing::debug!("Found {} mods in {}", entries.len(), dir.display());

    Ok(entries)
}

/// A [`Toggle`] that renames files in a mods directory.
#[derive(Debug, Clone)]
pub struct FsToggle {
    dir: PathBuf,
    disabled_suffix: String,
}

impl FsToggle {
    /// Creates a toggle for the mods in `dir`.
    #[must_use]
    pub fn new(dir: PathBuf, config: &Config) -> Self {
        Self {
            dir,
            disabled_suffix: config.disabled_suffix().to_string(),
        }
    }

    /// The file an entry lives in when it is enabled or disabled.
    #[must_use]
    pub fn path(&self, id: &EntryId, enabled: bool) -> PathBuf {
        if enabled {
            self.dir.join(id.as_str())
        } else {
            self.dir.join(format!("{id}{}", self.disabled_suffix))
        }
    }
}

impl Toggle for FsToggle {
    fn set_enabled(&mut self, id: &EntryId, enabled: bool) -> Result<(), ToggleError> {
        let from = self.path(id, !enabled);
        let to = self.path(id, enabled);

        if !from.exists() {
            return Err(ToggleError::Missing(from));
        }
        if to.exists() {
            return Err(ToggleError::Collision(to));
        }

        fs::rename(&from, &to)?;
        tracing::trace!("Renamed {} to {}", from.display(), to.display());
        Ok(())
    }
}
