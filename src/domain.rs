//! Domain models for bisecting a set of toggleable entries.
//!
//! This module contains the core types: entries and their identities, the
//! requirement graph between them, the history of search ranges and the
//! [`Session`] that ties them together. None of it touches the file system;
//! state changes are applied through a [`Toggle`].

mod config;
pub use config::Config;

mod entry;
pub use entry::{Entry, EntryId, InvalidIdError};

mod graph;
pub use graph::RequirementGraph;

pub mod history;
pub use history::{ActiveRange, History, InvalidRangeError};

pub mod selection;
pub use selection::{Selection, SelectionError};

mod session;
pub use session::{
    BatchReport, DependentPolicy, DisableOutcome, DuplicateIdError, EnableOutcome, EntryError,
    NarrowOutcome, Outcome, Session, SwapOutcome, UndoOutcome,
};

pub mod toggle;
pub use toggle::{MemoryToggle, Toggle, ToggleError};
