use std::path::PathBuf;

use bisect::{Config, Session, Workspace};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::instrument;

use super::{
    Scope,
    terminal::{Colorize, columns},
};

/// Command arguments for `bisect list`.
#[derive(Debug, Parser)]
#[command(about = "List mods")]
pub struct List {
    /// Which mods to list (default: all).
    #[arg(long, value_enum, default_value_t)]
    filter: Scope,

    /// One mod per line, with file names and requirements.
    #[arg(long)]
    detail: bool,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    position: usize,
    index: usize,
    id: &'a str,
    enabled: bool,
    excluded: bool,
    candidate: bool,
    dependents: Vec<&'a str>,
    prerequisites: Vec<&'a str>,
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let workspace = Workspace::open(root)?;
        let session = workspace.session();
        let displayed = self.filter.displayed(session.entries());

        match self.output {
            OutputFormat::Json => Self::output_json(session, &displayed)?,
            OutputFormat::Table if displayed.is_empty() => println!("{}", "No mods".dim()),
            OutputFormat::Table if self.detail => {
                Self::output_detail(session, workspace.config(), &displayed);
            }
            OutputFormat::Table => Self::output_compact(session, workspace.config(), &displayed),
        }

        Ok(())
    }

    fn rows<'a, T>(session: &'a Session<T>, displayed: &[usize]) -> Vec<Row<'a>> {
        let window = session.history().top();
        displayed
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let entry = &session.entries()[index];
                Row {
                    position,
                    index,
                    id: entry.id().as_str(),
                    enabled: entry.is_enabled(),
                    excluded: entry.is_excluded(),
                    candidate: window.contains(index),
                    dependents: session
                        .dependent_ids(index)
                        .into_iter()
                        .map(|id| id.as_str())
                        .collect(),
                    prerequisites: session
                        .prerequisite_ids(index)
                        .into_iter()
                        .map(|id| id.as_str())
                        .collect(),
                }
            })
            .collect()
    }

    fn output_json<T>(session: &Session<T>, displayed: &[usize]) -> anyhow::Result<()> {
        let rows = Self::rows(session, displayed);
        println!("{}", serde_json::to_string_pretty(&rows)?);
        Ok(())
    }

    fn output_detail<T>(session: &Session<T>, config: &Config, displayed: &[usize]) {
        for row in Self::rows(session, displayed) {
            let file = if row.enabled {
                row.id.to_string()
            } else {
                format!("{}{}", row.id, config.disabled_suffix())
            };
            let mut line = format!("{} - {}", row.position, paint(&file, &row));
            if row.excluded {
                line.push_str(&format!(" {}", "(excluded)".info()));
            }
            if !row.dependents.is_empty() {
                line.push_str(&format!(
                    " {}",
                    format!("[required by {}]", row.dependents.join(", ")).dim()
                ));
            }
            if !row.prerequisites.is_empty() {
                line.push_str(&format!(
                    " {}",
                    format!("[requires {}]", row.prerequisites.join(", ")).dim()
                ));
            }
            println!("{line}");
        }
    }

    fn output_compact<T>(session: &Session<T>, config: &Config, displayed: &[usize]) {
        let per_line = columns(config.compact_width, config.per_line);
        let rows = Self::rows(session, displayed);

        for chunk in rows.chunks(per_line) {
            let cells: Vec<_> = chunk
                .iter()
                .map(|row| {
                    let name = compact(row.id, config);
                    format!("{:03}: {}", row.position, paint(&name, row))
                })
                .collect();
            println!("{}", cells.join(" "));
        }
    }
}

fn paint(text: &str, row: &Row<'_>) -> String {
    if row.excluded {
        text.info()
    } else if !row.enabled {
        text.dim()
    } else if row.candidate {
        text.warning()
    } else {
        text.to_string()
    }
}

/// The id without its extension, cut or padded to the compact width.
fn compact(id: &str, config: &Config) -> String {
    let suffix = format!(".{}", config.extension());
    let name = id.strip_suffix(&suffix).unwrap_or(id);
    let width = config.compact_width;
    let cut: String = name.chars().take(width).collect();
    format!("{cut:<width$}")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::cli::tests::workspace;

    #[test_case("jei.jar", "jei             "; "padded")]
    #[test_case("JustEnoughItems-1.20.jar", "JustEnoughItems-"; "truncated")]
    #[test_case("notes.zip", "notes.zip       "; "foreign extension kept")]
    fn compact_names(id: &str, expected: &str) {
        assert_eq!(compact(id, &Config::default()), expected);
    }

    #[test]
    fn rows_follow_filter_and_window() {
        let tmp = workspace(&["a.jar", "b.jar", "c.jar.disabled", "d.jar"]);
        let mut workspace = Workspace::open(tmp.path().to_path_buf()).unwrap();
        workspace.session_mut().add_dependent(0, 1).unwrap();
        workspace.session_mut().narrow(false);

        let session = workspace.session();
        let displayed = Scope::Enabled.displayed(session.entries());
        let rows = List::rows(session, &displayed);

        let ids: Vec<_> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec!["a.jar", "b.jar"]);
        assert!(rows.iter().all(|row| row.candidate));
        assert_eq!(rows[0].dependents, vec!["b.jar"]);
        assert_eq!(rows[1].prerequisites, vec!["a.jar"]);
        assert!(rows[1].dependents.is_empty());
    }

    #[test]
    fn run_prints_every_format() {
        let tmp = workspace(&["a.jar", "b.jar.disabled"]);
        let root = tmp.path().to_path_buf();

        for (detail, output) in [
            (false, OutputFormat::Table),
            (true, OutputFormat::Table),
            (false, OutputFormat::Json),
        ] {
            List {
                filter: Scope::All,
                detail,
                output,
            }
            .run(root.clone())
            .unwrap();
        }
    }

    #[test]
    fn compact_listing_survives_zero_per_line() {
        let tmp = workspace(&["a.jar", "b.jar", "c.jar"]);
        let meta = tmp.path().join(bisect::storage::META_DIR);
        std::fs::create_dir(&meta).unwrap();
        std::fs::write(
            meta.join("config.toml"),
            "_version = \"1\"\n\n[display]\nper_line = 0\n",
        )
        .unwrap();

        List {
            filter: Scope::All,
            detail: false,
            output: OutputFormat::Table,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();
    }
}
