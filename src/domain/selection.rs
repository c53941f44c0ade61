//! Selection strings such as `7,2-5,jei`.
//!
//! A selection is a comma separated list of tokens. A token is either a
//! position in the list the user is looking at (`7`), an inclusive range of
//! positions (`2-5`), or a case-insensitive name query (`jei`). Any token
//! containing a letter or an underscore is a name query.

use std::{str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::domain::Entry;

static NAME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[A-Za-z_]").expect("static regex is valid"));

/// One token of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A single position.
    Index(usize),
    /// An inclusive range of positions.
    Range(usize, usize),
    /// A name query.
    Name(String),
}

/// A parsed selection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    tokens: Vec<Token>,
}

/// A selection could not be turned into entries.
///
/// Resolution is all-or-nothing: when any token fails, nothing is selected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The selection contained no tokens.
    #[error("nothing selected")]
    Empty,

    /// A token is neither a number, a range nor a name.
    #[error("invalid selection token '{0}'")]
    InvalidToken(String),

    /// A position lies past the end of the displayed list.
    #[error("index {index} is out of range (only {len} entries listed)")]
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// The length of the displayed list.
        len: usize,
    },

    /// A name query matched no entry.
    #[error("no entries found matching '{0}'")]
    NoMatch(String),

    /// A name query matched several entries and none exactly.
    #[error("'{query}' matches several entries: {}", .candidates.join(", "))]
    Ambiguous {
        /// The query.
        query: String,
        /// Ids of the matching entries.
        candidates: Vec<String>,
    },
}

impl Selection {
    /// The parsed tokens, in input order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Resolve the selection to registry indices.
    ///
    /// Positions address `displayed`, a list of registry indices such as
    /// "every enabled entry". Name queries search all of `entries`. The
    /// result keeps the order of first appearance and has no duplicates.
    ///
    /// # Errors
    ///
    /// Returns the first [`SelectionError`] encountered.
    pub fn resolve(
        &self,
        entries: &[Entry],
        displayed: &[usize],
    ) -> Result<Vec<usize>, SelectionError> {
        let mut selected = Vec::new();

        for token in &self.tokens {
            match token {
                Token::Index(index) => selected.push(lookup(displayed, *index)?),
                Token::Range(start, end) => {
                    for index in *start..=*end {
                        selected.push(lookup(displayed, index)?);
                    }
                }
                Token::Name(query) => selected.push(find_by_name(entries, query)?),
            }
        }

        let mut seen = std::collections::HashSet::new();
        selected.retain(|index| seen.insert(*index));
        Ok(selected)
    }
}

impl FromStr for Selection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let tokens = compact
            .split(',')
            .filter(|token| !token.is_empty())
            .map(parse_token)
            .collect::<Result<Vec<_>, _>>()?;

        if tokens.is_empty() {
            return Err(SelectionError::Empty);
        }

        Ok(Self { tokens })
    }
}

fn parse_token(token: &str) -> Result<Token, SelectionError> {
    if NAME_TOKEN.is_match(token) {
        return Ok(Token::Name(token.to_string()));
    }

    let invalid = || SelectionError::InvalidToken(token.to_string());
    match token.split_once('-') {
        None => token.parse().map(Token::Index).map_err(|_| invalid()),
        Some((start, end)) => {
            let start: usize = start.parse().map_err(|_| invalid())?;
            let end: usize = end.parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            Ok(Token::Range(start, end))
        }
    }
}

fn lookup(displayed: &[usize], index: usize) -> Result<usize, SelectionError> {
    displayed
        .get(index)
        .copied()
        .ok_or(SelectionError::IndexOutOfRange {
            index,
            len: displayed.len(),
        })
}

fn find_by_name(entries: &[Entry], query: &str) -> Result<usize, SelectionError> {
    if let Some(exact) = entries.iter().position(|entry| entry.matches_id(query)) {
        return Ok(exact);
    }

    let needle = query.to_lowercase();
    let matches: Vec<_> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.id().to_lowercase().contains(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(SelectionError::NoMatch(query.to_string())),
        [(index, _)] => Ok(*index),
        _ => Err(SelectionError::Ambiguous {
            query: query.to_string(),
            candidates: matches
                .iter()
                .map(|(_, entry)| entry.id().to_string())
                .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::EntryId;

    fn entries(ids: &[&str]) -> Vec<Entry> {
        ids.iter()
            .map(|id| Entry::new(EntryId::try_from(*id).unwrap(), true))
            .collect()
    }

    #[test]
    fn parses_mixed_tokens() {
        let selection: Selection = " 7, 2 - 5 ,jei".parse().unwrap();
        assert_eq!(
            selection.tokens(),
            &[
                Token::Index(7),
                Token::Range(2, 5),
                Token::Name("jei".to_string())
            ]
        );
    }

    #[test_case(""; "empty")]
    #[test_case(" , "; "only separators")]
    fn empty_selection_is_rejected(input: &str) {
        assert_eq!(input.parse::<Selection>(), Err(SelectionError::Empty));
    }

    #[test_case("5-2"; "reversed range")]
    #[test_case("1-2-3"; "too many dashes")]
    #[test_case("-3"; "missing start")]
    #[test_case("4."; "punctuation")]
    fn invalid_tokens_are_rejected(input: &str) {
        assert!(matches!(
            input.parse::<Selection>(),
            Err(SelectionError::InvalidToken(_))
        ));
    }

    #[test]
    fn positions_address_the_displayed_list() {
        let entries = entries(&["a.jar", "b.jar", "c.jar", "d.jar"]);
        // only b and d are displayed
        let displayed = [1, 3];

        let selection: Selection = "1,0".parse().unwrap();
        assert_eq!(selection.resolve(&entries, &displayed).unwrap(), vec![3, 1]);
    }

    #[test]
    fn ranges_are_inclusive_and_deduplicated() {
        let entries = entries(&["a.jar", "b.jar", "c.jar", "d.jar"]);
        let displayed = [0, 1, 2, 3];

        let selection: Selection = "1-2,2,b".parse().unwrap();
        assert_eq!(selection.resolve(&entries, &displayed).unwrap(), vec![1, 2]);
    }

    #[test]
    fn out_of_range_abandons_whole_selection() {
        let entries = entries(&["a.jar", "b.jar"]);
        let displayed = [0, 1];

        let selection: Selection = "0,1-2".parse().unwrap();
        assert_eq!(
            selection.resolve(&entries, &displayed),
            Err(SelectionError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn names_match_case_insensitively() {
        let entries = entries(&["JustEnoughItems.jar", "create.jar"]);
        let selection: Selection = "justenough".parse().unwrap();
        assert_eq!(selection.resolve(&entries, &[]).unwrap(), vec![0]);
    }

    #[test]
    fn exact_name_beats_partial_matches() {
        let entries = entries(&["lib.jar", "lib.jar.extra", "mylib.jar"]);
        let selection: Selection = "lib.jar".parse().unwrap();
        assert_eq!(selection.resolve(&entries, &[]).unwrap(), vec![0]);
    }

    #[test]
    fn ambiguous_names_are_rejected() {
        let entries = entries(&["create.jar", "create-addon.jar", "jei.jar"]);
        let selection: Selection = "create".parse().unwrap();
        assert_eq!(
            selection.resolve(&entries, &[]),
            Err(SelectionError::Ambiguous {
                query: "create".to_string(),
                candidates: vec!["create.jar".to_string(), "create-addon.jar".to_string()],
            })
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        let entries = entries(&["jei.jar"]);
        let selection: Selection = "sodium".parse().unwrap();
        assert_eq!(
            selection.resolve(&entries, &[]),
            Err(SelectionError::NoMatch("sodium".to_string()))
        );
    }
}
