use std::{borrow::Borrow, fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// The stable identity of an [`Entry`].
///
/// For mods on disk this is the file name without the disabled suffix, for
/// example `jei-1.20.jar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(NonEmptyString);

impl EntryId {
    /// Creates a new `EntryId`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdError`] if the string is empty or contains a path
    /// separator.
    pub fn new(s: String) -> Result<Self, InvalidIdError> {
        if s.contains(['/', '\\']) {
            return Err(InvalidIdError(s));
        }
        NonEmptyString::new(s).map(Self).map_err(InvalidIdError)
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for EntryId {
    type Error = InvalidIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl TryFrom<String> for EntryId {
    type Error = InvalidIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.as_str().to_string()
    }
}

impl FromStr for EntryId {
    type Err = InvalidIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl AsRef<str> for EntryId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for EntryId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl Deref for EntryId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a valid [`EntryId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entry id: '{0}'")]
pub struct InvalidIdError(String);

/// One toggleable unit under bisection.
///
/// An entry only carries its own flags. Requirement edges between entries
/// live in the [`RequirementGraph`](crate::domain::RequirementGraph), and all
/// state changes go through a [`Session`](crate::domain::Session) so that the
/// external toggle and the requirement checks are always applied together.
///
/// Entries are deliberately not `PartialEq`. Use [`Entry::same_identity_as`],
/// [`Entry::matches_id`] or [`Entry::is_enabled`] to say which comparison you
/// mean.
#[derive(Debug, Clone)]
pub struct Entry {
    id: EntryId,
    enabled: bool,
    excluded: bool,
}

impl Entry {
    /// Creates an entry that is not excluded.
    #[must_use]
    pub const fn new(id: EntryId, enabled: bool) -> Self {
        Self {
            id,
            enabled,
            excluded: false,
        }
    }

    /// The stable identity of this entry.
    #[must_use]
    pub const fn id(&self) -> &EntryId {
        &self.id
    }

    /// Whether the entry is currently enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the entry is pinned enabled and ignored by bisection.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Whether `other` is the same entry.
    #[must_use]
    pub fn same_identity_as(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Whether this entry has the given id.
    #[must_use]
    pub fn matches_id(&self, id: &str) -> bool {
        self.id.as_str() == id
    }

    pub(crate) const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) const fn set_excluded(&mut self, excluded: bool) {
        self.excluded = excluded;
    }
}
