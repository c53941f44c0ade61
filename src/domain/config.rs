use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::DependentPolicy;

/// Configuration for a bisection workspace.
///
/// This struct holds settings that control which files count as entries,
/// how they are toggled, where saved states live and how listings are laid
/// out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The directory holding the mods, relative to the workspace root.
    pub mods_dir: String,

    /// The file extension of an enabled mod, without the leading dot.
    ///
    /// For example 'jar'.
    extension: String,

    /// The suffix appended to a mod's file name to disable it.
    ///
    /// For example '.disabled', so that `jei.jar` is disabled as
    /// `jei.jar.disabled`.
    disabled_suffix: String,

    /// The directory saved states are exported to and imported from,
    /// relative to the workspace root.
    pub state_dir: String,

    /// The file extension of saved states, without the leading dot.
    state_extension: String,

    /// Whether adding a requirement enables a disabled prerequisite of an
    /// enabled dependent straight away.
    pub cascade_dependents: bool,

    /// Width of each column in compact listings.
    pub compact_width: usize,

    /// Number of entries per row in compact listings.
    pub per_line: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mods_dir: default_mods_dir(),
            extension: default_extension(),
            disabled_suffix: default_disabled_suffix(),
            state_dir: default_state_dir(),
            state_extension: default_state_extension(),
            cascade_dependents: true,
            compact_width: default_compact_width(),
            per_line: default_per_line(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the extension of enabled entries, without the leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the suffix that marks a disabled entry.
    #[must_use]
    pub fn disabled_suffix(&self) -> &str {
        &self.disabled_suffix
    }

    /// Returns the extension of saved state files, without the leading dot.
    #[must_use]
    pub fn state_extension(&self) -> &str {
        &self.state_extension
    }

    /// Sets the extension of enabled entries.
    ///
    /// A leading dot is stripped.
    pub fn set_extension(&mut self, extension: &str) {
        self.extension = extension.trim_start_matches('.').to_string();
    }

    /// Sets the suffix that marks a disabled entry.
    ///
    /// A leading dot is added if missing.
    pub fn set_disabled_suffix(&mut self, suffix: &str) {
        self.disabled_suffix = if suffix.starts_with('.') {
            suffix.to_string()
        } else {
            format!(".{suffix}")
        };
    }

    /// The policy applied when a requirement is added.
    #[must_use]
    pub const fn dependent_policy(&self) -> DependentPolicy {
        if self.cascade_dependents {
            DependentPolicy::Cascade
        } else {
            DependentPolicy::Deferred
        }
    }
}

fn default_mods_dir() -> String {
    "mods".to_string()
}

fn default_extension() -> String {
    "jar".to_string()
}

fn default_disabled_suffix() -> String {
    ".disabled".to_string()
}

fn default_state_dir() -> String {
    ".bisect/states".to_string()
}

fn default_state_extension() -> String {
    "bsmm".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_compact_width() -> usize {
    16
}

const fn default_per_line() -> usize {
    5
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_mods_dir")]
        mods_dir: String,

        #[serde(default = "default_extension")]
        extension: String,

        #[serde(default = "default_disabled_suffix")]
        disabled_suffix: String,

        #[serde(default = "default_state_dir")]
        state_dir: String,

        #[serde(default = "default_state_extension")]
        state_extension: String,

        #[serde(default = "default_true")]
        cascade_dependents: bool,

        #[serde(default)]
        display: Display,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Display {
    #[serde(default = "default_compact_width")]
    compact_width: usize,

    #[serde(default = "default_per_line")]
    per_line: usize,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            compact_width: default_compact_width(),
            per_line: default_per_line(),
        }
    }
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                mods_dir,
                extension,
                disabled_suffix,
                state_dir,
                state_extension,
                cascade_dependents,
                display,
            } => Self {
                mods_dir,
                extension,
                disabled_suffix,
                state_dir,
                state_extension,
                cascade_dependents,
                compact_width: display.compact_width,
                per_line: display.per_line,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            mods_dir: config.mods_dir,
            extension: config.extension,
            disabled_suffix: config.disabled_suffix,
            state_dir: config.state_dir,
            state_extension: config.state_extension,
            cascade_dependents: config.cascade_dependents,
            display: Display {
                compact_width: config.compact_width,
                per_line: config.per_line,
            },
        }
    }
}
