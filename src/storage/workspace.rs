//! A bisection workspace on disk.
//!
//! The [`Workspace`] ties a root directory to its configuration, its mods and
//! the session persisted between invocations. It is a wrapper around the
//! filesystem agnostic [`Session`].

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{
    domain::{Config, DuplicateIdError, Session},
    storage::{
        mods_dir::{self, FsToggle, ScanError},
        snapshot::{ImportReport, Snapshot, SnapshotError},
    },
};

/// The directory, relative to the root, holding configuration and session
/// state.
pub const META_DIR: &str = ".bisect";

const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.toml";

/// Errors that can occur when opening or initialising a workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// The mods directory could not be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Two mods share an id, for example `a.jar` and `a.jar.disabled`.
    #[error("{0}; remove one of the two files")]
    Duplicate(#[from] DuplicateIdError),

    /// The workspace already has a configuration file.
    #[error("workspace already initialized (found {})", .0.display())]
    AlreadyInitialized(PathBuf),

    /// The configuration could not be written.
    #[error("{0}")]
    Config(String),
}

/// A filesystem backed bisection session.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
    session: Session<FsToggle>,
}

impl Workspace {
    /// Opens the workspace at `root`.
    ///
    /// The configuration is read from `.bisect/config.toml`, falling back to
    /// the defaults. The session saved by the last [`Workspace::flush`] is
    /// restored if it still matches the mods on disk; otherwise a fresh
    /// session is started.
    ///
    /// # Errors
    ///
    /// Returns an error if the mods directory cannot be scanned or contains
    /// the same mod twice.
    pub fn open(root: PathBuf) -> Result<Self, WorkspaceError> {
        let config = load_config(&root);
        let mods = root.join(&config.mods_dir);

        let entries = mods_dir::scan(&mods, &config)?;
        let toggle = FsToggle::new(mods, &config);
        let mut session = Session::new(entries, toggle)?.with_policy(config.dependent_policy());

        let session_path = root.join(META_DIR).join(SESSION_FILE);
        if session_path.exists() {
            match Snapshot::load(&session_path).and_then(|s| session.restore(&s)) {
                Ok(report) => {
                    for (_, e) in report.exclusions.failures() {
                        tracing::warn!("{e}");
                    }
                    tracing::debug!("Restored session from {}", session_path.display());
                }
                Err(e) => tracing::warn!("Discarding saved session: {e}"),
            }
        }

        Ok(Self {
            root,
            config,
            session,
        })
    }

    /// Write a default configuration to `root`, returning its path.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration already exists or cannot be
    /// written.
    pub fn init(root: &Path) -> Result<PathBuf, WorkspaceError> {
        let meta = root.join(META_DIR);
        let path = meta.join(CONFIG_FILE);
        if path.exists() {
            return Err(WorkspaceError::AlreadyInitialized(path));
        }

        fs::create_dir_all(&meta).map_err(|e| {
            WorkspaceError::Config(format!("Failed to create {META_DIR} directory: {e}"))
        })?;
        Config::default()
            .save(&path)
            .map_err(WorkspaceError::Config)?;

        Ok(path)
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Session<FsToggle> {
        &self.session
    }

    /// Mutable access to the session.
    pub const fn session_mut(&mut self) -> &mut Session<FsToggle> {
        &mut self.session
    }

    /// Persist the session so the next [`Workspace::open`] continues from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be written.
    pub fn flush(&self) -> Result<(), SnapshotError> {
        let path = self.root.join(META_DIR).join(SESSION_FILE);
        Snapshot::capture(&self.session).save(&path)?;
        tracing::debug!("Saved session to {}", path.display());
        Ok(())
    }

    /// The path of the saved state called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidName`] if `name` is empty or contains a
    /// path separator, so every state stays inside the state directory.
    pub fn state_path(&self, name: &str) -> Result<PathBuf, SnapshotError> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(SnapshotError::InvalidName(name.to_string()));
        }
        Ok(self
            .state_dir()
            .join(format!("{name}.{}", self.config.state_extension())))
    }

    /// Names of the saved states, sorted.
    #[must_use]
    pub fn saved_states(&self) -> Vec<String> {
        let extension = OsStr::new(self.config.state_extension());
        let mut names: Vec<_> = WalkDir::new(self.state_dir())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension() == Some(extension))
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .and_then(OsStr::to_str)
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }

    /// Save the current state as `name`, returning the file written.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid state name or the file cannot
    /// be written.
    pub fn export(&self, name: &str) -> Result<PathBuf, SnapshotError> {
        let path = self.state_path(name)?;
        Snapshot::capture(&self.session).save(&path)?;
        tracing::info!("Exported state to {}", path.display());
        Ok(path)
    }

    /// Apply the saved state called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the session untouched, if the file cannot be
    /// read or does not match the current mods.
    pub fn import(&mut self, name: &str) -> Result<ImportReport, SnapshotError> {
        let path = self.state_path(name)?;
        let snapshot = Snapshot::load(&path)?;
        let report = self.session.import(&snapshot)?;
        tracing::info!("Imported state from {}", path.display());
        Ok(report)
    }

    fn state_dir(&self) -> PathBuf {
        self.root.join(&self.config.state_dir)
    }
}

fn load_config(root: &Path) -> Config {
    let path = root.join(META_DIR).join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}
