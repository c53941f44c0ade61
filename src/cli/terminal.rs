//! Terminal capability detection and utilities

use owo_colors::{OwoColorize, colors::css};

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Number of compact columns that fit, capped at `per_line`.
///
/// Falls back to `per_line` when the width is unknown. Never less than one.
pub fn columns(compact_width: usize, per_line: usize) -> usize {
    let per_line = per_line.max(1);
    // "NNN " prefix plus a separating space
    let cell = compact_width + 5;
    terminal_width().map_or(per_line, |w| (usize::from(w) / cell).clamp(1, per_line))
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as error (red)
    fn error(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn error(&self) -> String {
        if supports_color() {
            self.fg::<css::Red>().to_string()
        } else {
            self.to_string()
        }
    }

    fn info(&self) -> String {
        if supports_color() {
            self.fg::<css::LightBlue>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn error(&self) -> String {
        self.as_str().error()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(16, 0, 1..=1; "zero per line")]
    #[test_case(16, 1, 1..=1; "single column")]
    #[test_case(16, 5, 1..=5; "capped at per line")]
    #[test_case(0, 3, 1..=3; "zero width cells")]
    fn columns_stay_in_range(
        compact_width: usize,
        per_line: usize,
        expected: std::ops::RangeInclusive<usize>,
    ) {
        assert!(expected.contains(&columns(compact_width, per_line)));
    }
}
