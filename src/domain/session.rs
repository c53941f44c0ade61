//! The bisection session.
//!
//! A [`Session`] owns the ordered registry of entries, the requirement graph
//! between them, the history of active ranges and the [`Toggle`] that applies
//! state changes. Every operation goes through it so that the requirement
//! and exclusion rules are checked in one place.

use std::collections::HashMap;

use tracing::instrument;

use crate::domain::{
    ActiveRange, Entry, EntryId, History, RequirementGraph,
    toggle::{Toggle, ToggleError},
};

/// What to do when a requirement is added while the prerequisite is disabled
/// and the dependent is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependentPolicy {
    /// Enable the prerequisite straight away.
    #[default]
    Cascade,
    /// Leave both alone. The requirement is enforced the next time the
    /// prerequisite is disabled.
    Deferred,
}

/// Errors raised by operations on a single entry.
///
/// None of these are fatal. Batch operations collect them in a
/// [`BatchReport`].
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// The external toggle failed; the entry's state is unchanged.
    #[error("failed to toggle {id}: {source}")]
    Toggle {
        /// The entry that could not be toggled.
        id: EntryId,
        /// The underlying failure.
        source: ToggleError,
    },

    /// The entry is required by at least one enabled entry.
    #[error(
        "cannot disable {id} while dependents are enabled: {}",
        .live.iter().map(EntryId::as_str).collect::<Vec<_>>().join(", ")
    )]
    RequirementViolation {
        /// The entry that was not disabled.
        id: EntryId,
        /// Its enabled dependents.
        live: Vec<EntryId>,
    },

    /// An entry cannot depend on itself.
    #[error("cannot add {0} as its own dependent")]
    SelfReference(EntryId),
}

/// Two entries in a registry share an id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate entry id: {0}")]
pub struct DuplicateIdError(pub EntryId);

/// Result of enabling an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// The entry was toggled on.
    Enabled,
    /// The entry was already enabled.
    AlreadyEnabled,
}

/// Result of disabling an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    /// The entry was toggled off.
    Disabled,
    /// The entry was already disabled.
    AlreadyDisabled,
    /// The entry is excluded and stays enabled.
    Pinned,
}

/// The per-entry outcome recorded in a [`BatchReport`].
#[derive(Debug)]
pub enum Outcome {
    /// The operation changed something.
    Applied,
    /// The entry was already in the requested state.
    Unchanged,
    /// The entry is excluded from the operation.
    Skipped,
    /// The operation failed.
    Failed(EntryError),
}

impl Outcome {
    /// Whether the entry ended up in the requested state.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Applied | Self::Unchanged)
    }

    const fn is_requirement_violation(&self) -> bool {
        matches!(self, Self::Failed(EntryError::RequirementViolation { .. }))
    }

    const fn changed(changed: bool) -> Self {
        if changed {
            Self::Applied
        } else {
            Self::Unchanged
        }
    }
}

impl From<Result<EnableOutcome, EntryError>> for Outcome {
    fn from(result: Result<EnableOutcome, EntryError>) -> Self {
        match result {
            Ok(EnableOutcome::Enabled) => Self::Applied,
            Ok(EnableOutcome::AlreadyEnabled) => Self::Unchanged,
            Err(e) => Self::Failed(e),
        }
    }
}

impl From<Result<DisableOutcome, EntryError>> for Outcome {
    fn from(result: Result<DisableOutcome, EntryError>) -> Self {
        match result {
            Ok(DisableOutcome::Disabled) => Self::Applied,
            Ok(DisableOutcome::AlreadyDisabled) => Self::Unchanged,
            Ok(DisableOutcome::Pinned) => Self::Skipped,
            Err(e) => Self::Failed(e),
        }
    }
}

impl From<Result<bool, EntryError>> for Outcome {
    fn from(result: Result<bool, EntryError>) -> Self {
        match result {
            Ok(true) => Self::Applied,
            Ok(false) => Self::Unchanged,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Per-entry outcomes of an operation applied to several entries.
///
/// Batches are not atomic: a failure part way through leaves earlier entries
/// toggled.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<(usize, Outcome)>,
}

impl BatchReport {
    pub(crate) fn push(&mut self, index: usize, outcome: impl Into<Outcome>) {
        self.outcomes.push((index, outcome.into()));
    }

    /// Number of entries the operation was applied to.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of entries that ended up in the requested state.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    /// Number of entries left alone because they are excluded.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Skipped))
            .count()
    }

    /// Registry indices and errors of the entries that failed.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &EntryError)> {
        self.outcomes.iter().filter_map(|(i, o)| match o {
            Outcome::Failed(e) => Some((*i, e)),
            _ => None,
        })
    }

    /// Every recorded outcome, in the order the entries were visited.
    #[must_use]
    pub fn outcomes(&self) -> &[(usize, Outcome)] {
        &self.outcomes
    }
}

/// Result of narrowing the search.
#[derive(Debug)]
pub struct NarrowOutcome {
    /// The new candidate window.
    pub range: ActiveRange,
    /// Outcomes of disabling everything outside it.
    pub report: BatchReport,
}

/// Result of undoing the last narrowing.
#[derive(Debug)]
pub enum UndoOutcome {
    /// Only the full range was left; nothing changed.
    NothingToUndo,
    /// The top range was popped.
    Undone {
        /// The restored candidate window.
        range: ActiveRange,
        /// Outcomes of enabling everything inside it.
        report: BatchReport,
    },
}

/// Result of swapping the last narrowing for the other half.
#[derive(Debug)]
pub struct SwapOutcome {
    /// The undo step.
    pub undo: UndoOutcome,
    /// The narrowing to the upper half.
    pub narrow: NarrowOutcome,
}

/// The state of a bisection over an ordered registry of entries.
#[derive(Debug)]
pub struct Session<T> {
    entries: Vec<Entry>,
    lookup: HashMap<EntryId, usize>,
    graph: RequirementGraph,
    history: History,
    policy: DependentPolicy,
    toggle: T,
}

impl<T> Session<T> {
    /// Creates a session over `entries`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateIdError`] if two entries share an id.
    pub fn new(entries: Vec<Entry>, toggle: T) -> Result<Self, DuplicateIdError> {
        let mut lookup = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if lookup.insert(entry.id().clone(), index).is_some() {
                return Err(DuplicateIdError(entry.id().clone()));
            }
        }

        Ok(Self {
            graph: RequirementGraph::with_capacity(entries.len()),
            history: History::new(entries.len()),
            entries,
            lookup,
            policy: DependentPolicy::default(),
            toggle,
        })
    }

    /// Sets the policy used by [`Session::add_dependent`].
    #[must_use]
    pub fn with_policy(mut self, policy: DependentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The entries, in registry order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entry at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The registry index of the entry with the given id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    /// The requirement graph.
    #[must_use]
    pub const fn graph(&self) -> &RequirementGraph {
        &self.graph
    }

    /// The history of active ranges.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// The current dependent policy.
    #[must_use]
    pub const fn policy(&self) -> DependentPolicy {
        self.policy
    }

    /// The toggle used to apply state changes.
    #[must_use]
    pub const fn toggle(&self) -> &T {
        &self.toggle
    }

    /// Mutable access to the toggle.
    pub const fn toggle_mut(&mut self) -> &mut T {
        &mut self.toggle
    }

    /// Ids of the entries that require `index` and are enabled.
    #[must_use]
    pub fn live_dependents(&self, index: usize) -> Vec<EntryId> {
        self.graph
            .dependents(index)
            .filter(|&d| self.entries[d].is_enabled())
            .map(|d| self.entries[d].id().clone())
            .collect()
    }

    /// Ids of the entries that require `index`.
    #[must_use]
    pub fn dependent_ids(&self, index: usize) -> Vec<&EntryId> {
        self.graph
            .dependents(index)
            .map(|d| self.entries[d].id())
            .collect()
    }

    /// Ids of the entries that `index` requires.
    #[must_use]
    pub fn prerequisite_ids(&self, index: usize) -> Vec<&EntryId> {
        self.graph
            .prerequisites(index)
            .map(|p| self.entries[p].id())
            .collect()
    }

    pub(crate) const fn graph_mut(&mut self) -> &mut RequirementGraph {
        &mut self.graph
    }

    pub(crate) fn replace_history(&mut self, history: History) {
        self.history = history;
    }
}

impl<T: Toggle> Session<T> {
    /// Enable the entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::Toggle`] if the external toggle fails. The entry
    /// stays disabled.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn enable(&mut self, index: usize) -> Result<EnableOutcome, EntryError> {
        let entry = &mut self.entries[index];
        if entry.is_enabled() {
            return Ok(EnableOutcome::AlreadyEnabled);
        }

        self.toggle
            .set_enabled(entry.id(), true)
            .map_err(|source| EntryError::Toggle {
                id: entry.id().clone(),
                source,
            })?;
        entry.set_enabled(true);
        tracing::debug!("enabled {}", entry.id());

        Ok(EnableOutcome::Enabled)
    }

    /// Disable the entry at `index`.
    ///
    /// Excluded entries are left enabled and reported as
    /// [`DisableOutcome::Pinned`].
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::RequirementViolation`] if an enabled entry
    /// requires this one, or [`EntryError::Toggle`] if the external toggle
    /// fails. In both cases the entry stays enabled.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn disable(&mut self, index: usize) -> Result<DisableOutcome, EntryError> {
        let entry = &self.entries[index];
        if !entry.is_enabled() {
            return Ok(DisableOutcome::AlreadyDisabled);
        }
        if entry.is_excluded() {
            return Ok(DisableOutcome::Pinned);
        }

        let live = self.live_dependents(index);
        if !live.is_empty() {
            return Err(EntryError::RequirementViolation {
                id: self.entries[index].id().clone(),
                live,
            });
        }

        let entry = &mut self.entries[index];
        self.toggle
            .set_enabled(entry.id(), false)
            .map_err(|source| EntryError::Toggle {
                id: entry.id().clone(),
                source,
            })?;
        entry.set_enabled(false);
        tracing::debug!("disabled {}", entry.id());

        Ok(DisableOutcome::Disabled)
    }

    /// Record that `dependent` requires `prerequisite`.
    ///
    /// With [`DependentPolicy::Cascade`], a disabled prerequisite of an
    /// enabled dependent is enabled straight away.
    ///
    /// Returns `true` if the requirement is new.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::SelfReference`] if both indices are the same
    /// entry, in which case nothing changes. Returns [`EntryError::Toggle`] if
    /// the cascading enable fails; the requirement is recorded regardless.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn add_dependent(
        &mut self,
        prerequisite: usize,
        dependent: usize,
    ) -> Result<bool, EntryError> {
        if prerequisite == dependent {
            return Err(EntryError::SelfReference(
                self.entries[prerequisite].id().clone(),
            ));
        }
        assert!(dependent < self.entries.len(), "no entry at index {dependent}");

        let added = self.graph.add_edge(prerequisite, dependent);

        if self.policy == DependentPolicy::Cascade
            && !self.entries[prerequisite].is_enabled()
            && self.entries[dependent].is_enabled()
        {
            tracing::info!(
                "enabling {} because {} requires it",
                self.entries[prerequisite].id(),
                self.entries[dependent].id()
            );
            self.enable(prerequisite)?;
        }

        Ok(added)
    }

    /// Forget that `dependent` requires `prerequisite`.
    ///
    /// Never changes whether either entry is enabled. Returns `true` if a
    /// requirement was removed.
    pub fn remove_dependent(&mut self, prerequisite: usize, dependent: usize) -> bool {
        self.graph.remove_edge(prerequisite, dependent)
    }

    /// Forget every dependent of the entry at `index`, returning how many
    /// there were.
    pub fn reset_dependents(&mut self, index: usize) -> usize {
        self.graph.clear_dependents(index)
    }

    /// Flip whether the entry at `index` is excluded from bisection.
    ///
    /// Excluding an entry enables it first. Returns the new exclusion state.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::Toggle`] if the entry could not be enabled; it is
    /// then left not excluded.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn toggle_exclusion(&mut self, index: usize) -> Result<bool, EntryError> {
        if self.entries[index].is_excluded() {
            self.entries[index].set_excluded(false);
            return Ok(false);
        }

        self.enable(index)?;
        self.entries[index].set_excluded(true);
        Ok(true)
    }

    /// Enable each of `indices`.
    pub fn enable_many(&mut self, indices: &[usize]) -> BatchReport {
        let mut report = BatchReport::default();
        for &index in indices {
            report.push(index, self.enable(index));
        }
        report
    }

    /// Disable each of `indices`.
    pub fn disable_many(&mut self, indices: &[usize]) -> BatchReport {
        let mut report = BatchReport::default();
        for &index in indices {
            report.push(index, self.disable(index));
        }
        report
    }

    /// Toggle exclusion of each of `indices`.
    pub fn toggle_exclusions(&mut self, indices: &[usize]) -> BatchReport {
        let mut report = BatchReport::default();
        for &index in indices {
            report.push(index, self.toggle_exclusion(index).map(|_| true));
        }
        report
    }

    /// Make every entry in `dependents` require every entry in `targets`.
    ///
    /// Outcomes are keyed by the prerequisite.
    pub fn add_dependents(&mut self, targets: &[usize], dependents: &[usize]) -> BatchReport {
        let mut report = BatchReport::default();
        for &target in targets {
            for &dependent in dependents {
                report.push(target, self.add_dependent(target, dependent));
            }
        }
        report
    }

    /// Make every entry in `targets` require every entry in `requirements`.
    ///
    /// Outcomes are keyed by the prerequisite.
    pub fn add_requirements(
        &mut self,
        targets: &[usize],
        requirements: &[usize],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for &requirement in requirements {
            for &target in targets {
                report.push(requirement, self.add_dependent(requirement, target));
            }
        }
        report
    }

    /// Remove `dependents` from the dependents of every entry in `targets`.
    pub fn remove_dependents(&mut self, targets: &[usize], dependents: &[usize]) -> BatchReport {
        let mut report = BatchReport::default();
        for &target in targets {
            for &dependent in dependents {
                report.push(
                    target,
                    Outcome::changed(self.remove_dependent(target, dependent)),
                );
            }
        }
        report
    }

    /// Remove `requirements` from the requirements of every entry in
    /// `targets`.
    pub fn remove_requirements(
        &mut self,
        targets: &[usize],
        requirements: &[usize],
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for &requirement in requirements {
            for &target in targets {
                report.push(
                    requirement,
                    Outcome::changed(self.remove_dependent(requirement, target)),
                );
            }
        }
        report
    }

    /// Forget every dependent of each of `indices`.
    pub fn reset_dependents_many(&mut self, indices: &[usize]) -> BatchReport {
        let mut report = BatchReport::default();
        for &index in indices {
            report.push(index, Outcome::changed(self.reset_dependents(index) > 0));
        }
        report
    }

    /// Enable every entry and collapse the history to the full range.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> BatchReport {
        let indices: Vec<_> = (0..self.entries.len()).collect();
        let report = self.enable_many(&indices);
        self.history.reset(self.entries.len());
        report
    }

    /// Narrow the search to half of the current window and disable every
    /// entry outside it.
    ///
    /// The lower half is kept unless `swap` is set. For odd widths the lower
    /// half is the larger one.
    #[instrument(skip(self))]
    pub fn narrow(&mut self, swap: bool) -> NarrowOutcome {
        let top = self.history.top();
        let range = if swap {
            top.upper_half()
        } else {
            top.lower_half()
        };
        self.history.push(range);
        tracing::info!("narrowed {top} to {range}");

        let report = self.apply_range(range);
        NarrowOutcome { range, report }
    }

    /// Disable every entry outside `range` without touching the history.
    ///
    /// Entries at `range.end()` and above are visited first, then those below
    /// `range.start()`. Entries refused because an enabled dependent requires
    /// them are retried once at the end of the pass, since the dependent may
    /// have been disabled later in the same pass.
    #[instrument(skip(self))]
    pub fn apply_range(&mut self, range: ActiveRange) -> BatchReport {
        let mut outcomes: Vec<(usize, Outcome)> = range
            .outside(self.entries.len())
            .map(|index| (index, Outcome::from(self.disable(index))))
            .collect();

        for (index, outcome) in &mut outcomes {
            if outcome.is_requirement_violation() {
                *outcome = Outcome::from(self.disable(*index));
            }
        }

        BatchReport { outcomes }
    }

    /// Drop the last narrowing and re-enable the entries of the restored
    /// window.
    #[instrument(skip(self))]
    pub fn undo(&mut self) -> UndoOutcome {
        let Some(popped) = self.history.pop() else {
            tracing::debug!("nothing to undo");
            return UndoOutcome::NothingToUndo;
        };

        let range = self.history.top();
        tracing::info!("undid {popped}, back to {range}");
        let indices: Vec<_> = range.indices().collect();
        let report = self.enable_many(&indices);

        UndoOutcome::Undone { range, report }
    }

    /// Replace the last narrowing with the other half of its parent window.
    ///
    /// This is exactly [`Session::undo`] followed by
    /// [`Session::narrow`] with `swap` set.
    #[instrument(skip(self))]
    pub fn swap(&mut self) -> SwapOutcome {
        let undo = self.undo();
        let narrow = self.narrow(true);
        SwapOutcome { undo, narrow }
    }
}
