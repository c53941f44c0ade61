//! Saved states.
//!
//! A [`Snapshot`] captures the history stack, the excluded entries and the
//! requirement relation of a [`Session`]. It is stored as versioned TOML:
//!
//! ```toml
//! # mod-bisect saved state
//! _version = "1"
//! created = "2024-01-01T00:00:00Z"
//! history = [[0, 8], [0, 4]]
//! exclusions = ["core.jar"]
//!
//! [[dependents]]
//! prerequisite = "lib.jar"
//! dependents = ["addon.jar"]
//! ```
//!
//! Applying a snapshot is all-or-nothing with respect to the snapshot's own
//! content: every id and range is checked against the session before anything
//! is changed.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ActiveRange, BatchReport, EntryId, History, Session, Toggle};

const HEADER: &str = "# mod-bisect saved state. Generated file, edit with care.\n";

/// A serialized capture of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Snapshot {
    /// When the snapshot was taken.
    pub created: DateTime<Utc>,

    /// The history stack, widest range first. The first range is the full
    /// registry at capture time and is never applied.
    pub history: Vec<ActiveRange>,

    /// Ids of the excluded entries, in registry order.
    pub exclusions: Vec<EntryId>,

    /// Each prerequisite that has dependents, with those dependents.
    pub dependents: Vec<Dependents>,
}

/// One prerequisite and the entries that require it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependents {
    /// The required entry.
    pub prerequisite: EntryId,
    /// The entries that require it.
    pub dependents: Vec<EntryId>,
}

/// Errors that can occur while saving, loading or applying a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// The snapshot file.
        path: PathBuf,
        /// The underlying failure.
        source: io::Error,
    },

    /// The snapshot is not valid TOML, or does not follow the schema.
    #[error("malformed snapshot: {0}")]
    Format(#[from] toml::de::Error),

    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The snapshot names an entry the session does not have.
    #[error("snapshot refers to unknown entry '{0}'")]
    UnknownEntry(EntryId),

    /// The snapshot makes an entry its own dependent.
    #[error("snapshot makes {0} its own dependent")]
    SelfReference(EntryId),

    /// A range does not fit the current registry.
    #[error("snapshot range {range} does not fit {len} entries")]
    InvalidRange {
        /// The offending range.
        range: ActiveRange,
        /// The number of entries in the session.
        len: usize,
    },

    /// The snapshot has no history at all, not even the full range.
    #[error("snapshot history is empty")]
    EmptyHistory,

    /// A saved state name is empty or contains a path separator.
    #[error("invalid state name '{0}'")]
    InvalidName(String),

    /// The snapshot was taken over a different set of entries.
    #[error("snapshot covers {found} but the session has {expected}")]
    StaleBottom {
        /// The bottom range recorded in the snapshot.
        found: ActiveRange,
        /// The full range of the current session.
        expected: ActiveRange,
    },
}

/// What applying a snapshot changed.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Outcomes of excluding the listed entries, keyed by entry.
    pub exclusions: BatchReport,
    /// Outcomes of recording the listed requirements, keyed by prerequisite.
    pub dependents: BatchReport,
    /// Outcomes of the disable pass for the restored window, if one ran.
    pub replay: Option<BatchReport>,
}

/// A snapshot resolved against a particular session.
struct Plan {
    exclusions: Vec<usize>,
    edges: Vec<(usize, usize)>,
    ranges: Vec<ActiveRange>,
}

impl Snapshot {
    /// Capture the state of `session`.
    #[must_use]
    pub fn capture<T>(session: &Session<T>) -> Self {
        let entries = session.entries();

        let exclusions = entries
            .iter()
            .filter(|entry| entry.is_excluded())
            .map(|entry| entry.id().clone())
            .collect();

        let dependents = session
            .graph()
            .edges()
            .into_iter()
            .map(|(prerequisite, dependents)| Dependents {
                prerequisite: entries[prerequisite].id().clone(),
                dependents: dependents
                    .into_iter()
                    .map(|d| entries[d].id().clone())
                    .collect(),
            })
            .collect();

        Self {
            created: Utc::now(),
            history: session.history().iter().copied().collect(),
            exclusions,
            dependents,
        }
    }

    /// Parse a snapshot from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Format`] if the text is not a valid snapshot.
    /// Unknown keys are rejected.
    pub fn from_toml(text: &str) -> Result<Self, SnapshotError> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize the snapshot to TOML, including the header comment.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, SnapshotError> {
        let body = toml::to_string(self)?;
        Ok(format!("{HEADER}{body}"))
    }

    /// Read a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be read, or
    /// [`SnapshotError::Format`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let text = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Write the snapshot to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let text = self.to_toml()?;
        let io_error = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, text).map_err(io_error)
    }

    fn plan<T>(&self, session: &Session<T>) -> Result<Plan, SnapshotError> {
        if self.history.is_empty() {
            return Err(SnapshotError::EmptyHistory);
        }

        let index_of = |id: &EntryId| {
            session
                .find(id)
                .ok_or_else(|| SnapshotError::UnknownEntry(id.clone()))
        };

        let exclusions = self
            .exclusions
            .iter()
            .map(index_of)
            .collect::<Result<Vec<_>, _>>()?;

        let mut edges = Vec::new();
        for Dependents {
            prerequisite,
            dependents,
        } in &self.dependents
        {
            let from = index_of(prerequisite)?;
            for dependent in dependents {
                let to = index_of(dependent)?;
                if from == to {
                    return Err(SnapshotError::SelfReference(dependent.clone()));
                }
                edges.push((from, to));
            }
        }

        let len = session.len();
        let ranges = self
            .history
            .iter()
            .skip(1)
            .map(|&range| {
                if range.fits(len) {
                    Ok(range)
                } else {
                    Err(SnapshotError::InvalidRange { range, len })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Plan {
            exclusions,
            edges,
            ranges,
        })
    }
}

impl<T: Toggle> Session<T> {
    /// Apply a snapshot taken from this or another session over the same
    /// entries.
    ///
    /// Listed entries that are not yet excluded are excluded (which enables
    /// them), the listed requirements are added, and the history becomes the
    /// full range of this session followed by the snapshot's narrower ranges.
    /// If that leaves a narrowed window, everything outside it is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error, without changing anything, if the snapshot names an
    /// unknown entry, makes an entry its own dependent, or holds a range that
    /// does not fit this session.
    #[tracing::instrument(skip_all)]
    pub fn import(&mut self, snapshot: &Snapshot) -> Result<ImportReport, SnapshotError> {
        let plan = snapshot.plan(self)?;

        let mut report = ImportReport {
            exclusions: self.apply_exclusions(&plan.exclusions),
            ..ImportReport::default()
        };
        for (prerequisite, dependent) in plan.edges {
            report
                .dependents
                .push(prerequisite, self.add_dependent(prerequisite, dependent));
        }
        self.replace_history(History::with_ranges(self.len(), plan.ranges));

        if !self.history().is_at_bottom() {
            let top = self.history().top();
            report.replay = Some(self.apply_range(top));
        }

        Ok(report)
    }

    /// Reload a snapshot of this session without replaying the search.
    ///
    /// Unlike [`Session::import`], requirements are recorded without the
    /// cascading enable and nothing is disabled; the entries are assumed to
    /// already be in the state the snapshot was taken in.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`Session::import`], again without
    /// changing anything. Also fails if the snapshot's bottom range is not
    /// the full range of this session, since its indices would then point at
    /// different entries.
    #[tracing::instrument(skip_all)]
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<ImportReport, SnapshotError> {
        let plan = snapshot.plan(self)?;
        let (found, expected) = (snapshot.history[0], ActiveRange::full(self.len()));
        if found != expected {
            return Err(SnapshotError::StaleBottom { found, expected });
        }

        let report = ImportReport {
            exclusions: self.apply_exclusions(&plan.exclusions),
            ..ImportReport::default()
        };
        for (prerequisite, dependent) in plan.edges {
            self.graph_mut().add_edge(prerequisite, dependent);
        }
        self.replace_history(History::with_ranges(self.len(), plan.ranges));

        Ok(report)
    }

    fn apply_exclusions(&mut self, indices: &[usize]) -> BatchReport {
        let pending: Vec<_> = indices
            .iter()
            .copied()
            .filter(|&i| !self.entries()[i].is_excluded())
            .collect();
        self.toggle_exclusions(&pending)
    }
}

/// The serialized versions of a snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version", deny_unknown_fields)]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "Utc::now")]
        created: DateTime<Utc>,

        history: Vec<ActiveRange>,

        #[serde(default)]
        exclusions: Vec<EntryId>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dependents: Vec<Dependents>,
    },
}

impl From<Versions> for Snapshot {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                created,
                history,
                exclusions,
                dependents,
            } => Self {
                created,
                history,
                exclusions,
                dependents,
            },
        }
    }
}

impl From<Snapshot> for Versions {
    fn from(snapshot: Snapshot) -> Self {
        let Snapshot {
            created,
            history,
            exclusions,
            dependents,
        } = snapshot;
        Self::V1 {
            created,
            history,
            exclusions,
            dependents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entry, MemoryToggle};

    fn session(len: usize) -> Session<MemoryToggle> {
        let entries = (0..len)
            .map(|i| Entry::new(EntryId::try_from(format!("mod{i}.jar")).unwrap(), true))
            .collect();
        Session::new(entries, MemoryToggle::new()).unwrap()
    }

    fn enabled(session: &Session<MemoryToggle>) -> Vec<bool> {
        session.entries().iter().map(Entry::is_enabled).collect()
    }

    fn id(s: &str) -> EntryId {
        EntryId::try_from(s).unwrap()
    }

    fn exercised_session() -> Session<MemoryToggle> {
        let mut session = session(8);
        session.toggle_exclusion(6).unwrap();
        session.add_dependent(1, 3).unwrap();
        session.add_dependent(1, 2).unwrap();
        session.add_dependent(5, 0).unwrap();
        session.narrow(false);
        session.narrow(true);
        session
    }

    #[test]
    fn capture_lists_state() {
        let session = exercised_session();
        let snapshot = Snapshot::capture(&session);

        assert_eq!(
            snapshot.history,
            vec![
                ActiveRange::full(8),
                ActiveRange::new(0, 4).unwrap(),
                ActiveRange::new(2, 4).unwrap(),
            ]
        );
        assert_eq!(snapshot.exclusions, vec![id("mod6.jar")]);
        assert_eq!(
            snapshot.dependents,
            vec![
                Dependents {
                    prerequisite: id("mod1.jar"),
                    dependents: vec![id("mod2.jar"), id("mod3.jar")],
                },
                Dependents {
                    prerequisite: id("mod5.jar"),
                    dependents: vec![id("mod0.jar")],
                },
            ]
        );
    }

    #[test]
    fn toml_round_trip_is_lossless() {
        let snapshot = Snapshot::capture(&exercised_session());

        let text = snapshot.to_toml().unwrap();
        assert!(text.starts_with('#'));

        let parsed = Snapshot::from_toml(&text).unwrap();
        assert_eq!(parsed.history, snapshot.history);
        assert_eq!(parsed.exclusions, snapshot.exclusions);
        assert_eq!(parsed.dependents, snapshot.dependents);
    }

    #[test]
    fn parses_hand_written_file() {
        let text = r#"
_version = "1"
history = [[0, 4], [2, 4]]
exclusions = ["mod0.jar"]

[[dependents]]
prerequisite = "mod1.jar"
dependents = ["mod3.jar"]
"#;
        let snapshot = Snapshot::from_toml(text).unwrap();
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.exclusions, vec![id("mod0.jar")]);
        assert_eq!(snapshot.dependents[0].dependents, vec![id("mod3.jar")]);
    }

    #[test]
    fn rejects_unknown_fields() {
        let text = "_version = \"1\"\nhistory = [[0, 4]]\nextra = true\n";
        assert!(matches!(
            Snapshot::from_toml(text),
            Err(SnapshotError::Format(_))
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let text = "_version = \"2\"\nhistory = [[0, 4]]\n";
        assert!(matches!(
            Snapshot::from_toml(text),
            Err(SnapshotError::Format(_))
        ));
    }

    #[test]
    fn rejects_reversed_range() {
        let text = "_version = \"1\"\nhistory = [[0, 4], [3, 1]]\n";
        assert!(matches!(
            Snapshot::from_toml(text),
            Err(SnapshotError::Format(_))
        ));
    }

    #[test]
    fn export_import_round_trip() {
        let original = exercised_session();
        let snapshot = Snapshot::capture(&original);

        let mut fresh = session(8);
        let report = fresh.import(&snapshot).unwrap();

        let reimported = Snapshot::capture(&fresh);
        assert_eq!(reimported.history, snapshot.history);
        assert_eq!(reimported.exclusions, snapshot.exclusions);
        assert_eq!(reimported.dependents, snapshot.dependents);
        assert_eq!(enabled(&fresh), enabled(&original));
        assert!(report.replay.is_some());
    }

    #[test]
    fn import_onto_itself_is_idempotent() {
        let mut session = exercised_session();
        let before = enabled(&session);
        let snapshot = Snapshot::capture(&session);

        session.import(&snapshot).unwrap();

        let after = Snapshot::capture(&session);
        assert_eq!(after.history, snapshot.history);
        assert_eq!(after.exclusions, snapshot.exclusions);
        assert_eq!(after.dependents, snapshot.dependents);
        assert_eq!(enabled(&session), before);
    }

    #[test]
    fn import_keeps_own_bottom_range() {
        let snapshot = Snapshot {
            created: Utc::now(),
            history: vec![ActiveRange::full(100), ActiveRange::new(0, 3).unwrap()],
            exclusions: Vec::new(),
            dependents: Vec::new(),
        };
        let mut session = session(6);

        session.import(&snapshot).unwrap();

        assert_eq!(session.history().bottom(), ActiveRange::full(6));
        assert_eq!(session.history().top(), ActiveRange::new(0, 3).unwrap());
        assert_eq!(
            enabled(&session),
            vec![true, true, true, false, false, false]
        );
    }

    #[test]
    fn import_with_unknown_entry_changes_nothing() {
        let mut snapshot = Snapshot::capture(&exercised_session());
        snapshot.dependents.push(Dependents {
            prerequisite: id("mod1.jar"),
            dependents: vec![id("missing.jar")],
        });
        let mut session = session(8);

        let err = session.import(&snapshot).unwrap_err();

        assert!(matches!(err, SnapshotError::UnknownEntry(ref id) if id.as_str() == "missing.jar"));
        assert!(session.entries().iter().all(|e| !e.is_excluded()));
        assert_eq!(session.graph().edge_count(), 0);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn import_with_oversized_range_changes_nothing() {
        let mut snapshot = Snapshot::capture(&exercised_session());
        snapshot.history.push(ActiveRange::new(6, 12).unwrap());
        let mut session = session(8);

        let err = session.import(&snapshot).unwrap_err();

        assert!(matches!(err, SnapshotError::InvalidRange { len: 8, .. }));
        assert!(session.entries().iter().all(|e| !e.is_excluded()));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn import_rejects_self_dependency() {
        let snapshot = Snapshot {
            created: Utc::now(),
            history: vec![ActiveRange::full(2)],
            exclusions: vec![id("mod0.jar")],
            dependents: vec![Dependents {
                prerequisite: id("mod1.jar"),
                dependents: vec![id("mod1.jar")],
            }],
        };
        let mut session = session(2);

        assert!(matches!(
            session.import(&snapshot),
            Err(SnapshotError::SelfReference(_))
        ));
        assert!(!session.entries()[0].is_excluded());
    }

    #[test]
    fn import_rejects_empty_history() {
        let snapshot = Snapshot::from_toml("_version = \"1\"\nhistory = []\n").unwrap();
        let mut session = session(2);

        assert!(matches!(
            session.import(&snapshot),
            Err(SnapshotError::EmptyHistory)
        ));
    }

    #[test]
    fn restore_does_not_replay_or_cascade() {
        let snapshot = Snapshot::capture(&exercised_session());
        let mut session = session(8);

        let report = session.restore(&snapshot).unwrap();

        assert!(report.replay.is_none());
        assert!(enabled(&session).into_iter().all(|e| e));
        assert_eq!(session.history().top(), ActiveRange::new(2, 4).unwrap());
        assert!(session.entries()[6].is_excluded());
        assert!(session.graph().contains_edge(5, 0));
    }

    #[test]
    fn restore_rejects_a_different_registry_size() {
        let snapshot = Snapshot::capture(&exercised_session());
        let mut session = session(9);

        let err = session.restore(&snapshot).unwrap_err();

        assert!(matches!(
            err,
            SnapshotError::StaleBottom { expected, .. } if expected == ActiveRange::full(9)
        ));
        assert!(session.history().is_at_bottom());
        assert!(!session.entries()[6].is_excluded());
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("states").join("mine.bsmm");
        let snapshot = Snapshot::capture(&exercised_session());

        snapshot.save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();

        assert_eq!(loaded.history, snapshot.history);
        assert_eq!(loaded.dependents, snapshot.dependents);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Snapshot::load(&tmp.path().join("missing.bsmm")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io { .. }));
    }
}
