//! Bracket-aware neighbor matching for context-sensitive productions.
//!
//! Given a position in the word and a direction, [`match_pattern`] decides
//! whether a literal context pattern sits adjacent to that position. Two
//! depth counters drive the scan:
//!
//! - `branch_depth` — depth of *any* bracket nesting met while scanning,
//!   used to skip sub-branches the pattern never asked about;
//! - `explicit_depth` — depth inside a sub-branch the pattern itself opened
//!   with a bracket token, so a pattern like `G[H]M` matches bracket
//!   structure literally while `DEF` sails straight over `[branch]`es.
//!
//! Symbols in the ignored set are transparent regardless of branch state.

use std::collections::HashSet;

use crate::symbol::Sequence;

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// Which neighbor side of the rewrite position to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Outcome of a context match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// Sequence indices of the symbols that matched pattern tokens, in scan
    /// order (descending for left matches). Bracket tokens consumed from the
    /// pattern are not recorded.
    pub matched_indices: Vec<usize>,
}

/// Options for [`crate::LSystem::match_context`]. Fields left `None` fall
/// back to the engine's configuration and current sequence.
pub struct MatchOptions<'a> {
    pub direction: Direction,
    /// The literal context pattern, written in left-to-right reading order
    /// for both directions.
    pub pattern: &'a str,
    /// Index of the symbol under rewrite; scanning starts beside it.
    pub index: usize,
    pub branch_symbols: Option<(char, char)>,
    pub ignored_symbols: Option<&'a str>,
    pub sequence: Option<&'a Sequence>,
}

// ─────────────────────────────────────────────
// Scan
// ─────────────────────────────────────────────

/// Match `pattern` against the neighbors of `index` in `tokens`.
///
/// For [`Direction::Right`] the scan walks forward from `index + 1` with the
/// pattern cursor at the front; for [`Direction::Left`] it walks backward
/// from `index - 1` with the cursor at the back and the bracket roles
/// swapped. The match succeeds the moment the cursor leaves the pattern and
/// fails immediately on a top-level mismatch that is neither a bracket nor
/// an ignored symbol, or when the scan runs off the sequence.
pub(crate) fn match_pattern(
    tokens: &[char],
    pattern: &[char],
    index: usize,
    direction: Direction,
    branch_symbols: Option<(char, char)>,
    ignored: &HashSet<char>,
) -> MatchResult {
    let mut matched_indices = Vec::new();
    if pattern.is_empty() {
        return MatchResult { matched: true, matched_indices };
    }

    // Signed cursors mirror the two scan directions with one loop.
    let (step, mut seq_i, mut pat_i, overflow, branch_open, branch_close): (
        isize,
        isize,
        isize,
        isize,
        Option<char>,
        Option<char>,
    ) = match direction {
        Direction::Right => (
            1,
            index as isize + 1,
            0,
            pattern.len() as isize,
            branch_symbols.map(|(open, _)| open),
            branch_symbols.map(|(_, close)| close),
        ),
        Direction::Left => (
            -1,
            index as isize - 1,
            pattern.len() as isize - 1,
            -1,
            branch_symbols.map(|(_, close)| close),
            branch_symbols.map(|(open, _)| open),
        ),
    };

    let mut branch_depth = 0usize;
    let mut explicit_depth = 0usize;

    while seq_i >= 0 && (seq_i as usize) < tokens.len() {
        let sym = tokens[seq_i as usize];
        let pat = pattern[pat_i as usize];

        if sym == pat {
            if branch_depth == 0 || explicit_depth > 0 {
                if Some(sym) == branch_open {
                    // The pattern asked for this bracket: consume it.
                    explicit_depth += 1;
                    branch_depth += 1;
                    pat_i += step;
                } else if Some(sym) == branch_close {
                    explicit_depth = explicit_depth.saturating_sub(1);
                    branch_depth = branch_depth.saturating_sub(1);
                    // The closing bracket only advances the cursor once the
                    // explicitly requested branch is fully closed.
                    if explicit_depth == 0 {
                        pat_i += step;
                    }
                } else {
                    matched_indices.push(seq_i as usize);
                    pat_i += step;
                }
            }
            if pat_i == overflow {
                return MatchResult { matched: true, matched_indices };
            }
        } else if Some(sym) == branch_open {
            // A branch the pattern did not ask about: skip it transparently.
            branch_depth += 1;
            if explicit_depth > 0 {
                explicit_depth += 1;
            }
        } else if Some(sym) == branch_close {
            branch_depth = branch_depth.saturating_sub(1);
            if explicit_depth > 0 {
                explicit_depth = explicit_depth.saturating_sub(1);
            }
        } else if (branch_depth == 0 || (explicit_depth > 0 && Some(pat) != branch_close))
            && !ignored.contains(&sym)
        {
            return MatchResult { matched: false, matched_indices };
        }

        seq_i += step;
    }

    MatchResult { matched: false, matched_indices }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn run(
        word: &str,
        pattern: &str,
        index: usize,
        direction: Direction,
        branch: Option<(char, char)>,
        ignored: &str,
    ) -> MatchResult {
        let ignored: HashSet<char> = ignored.chars().collect();
        match_pattern(&chars(word), &chars(pattern), index, direction, branch, &ignored)
    }

    #[test]
    fn right_match_of_adjacent_symbols() {
        let r = run("ABCDE", "DE", 2, Direction::Right, None, "");
        assert!(r.matched);
        assert_eq!(r.matched_indices, vec![3, 4]);
    }

    #[test]
    fn left_match_reads_pattern_in_classic_order() {
        // Pattern "AB" written left-to-right must match the symbols before
        // index 2 of "ABC".
        let r = run("ABC", "AB", 2, Direction::Left, None, "");
        assert!(r.matched);
        assert_eq!(r.matched_indices, vec![1, 0]);
    }

    #[test]
    fn mismatch_fails_immediately() {
        let r = run("ABCDE", "DX", 2, Direction::Right, None, "");
        assert!(!r.matched);
    }

    #[test]
    fn running_off_the_sequence_fails() {
        let r = run("ABC", "CD", 1, Direction::Right, None, "");
        assert!(!r.matched);
        let r = run("ABC", "XA", 0, Direction::Left, None, "");
        assert!(!r.matched);
    }

    #[test]
    fn unrequested_branch_is_skipped() {
        // "DEF" matches to the right of C across the [XY] sub-branch.
        let r = run("ABC[XY]DEF", "DEF", 2, Direction::Right, Some(('[', ']')), "");
        assert!(r.matched);
        assert_eq!(r.matched_indices, vec![7, 8, 9]);
    }

    #[test]
    fn nested_branches_are_skipped_as_one() {
        let r = run("AC[X[Y]Z]D", "D", 1, Direction::Right, Some(('[', ']')), "");
        assert!(r.matched);
    }

    #[test]
    fn explicit_bracket_pattern_matches_structure() {
        // Pattern G[H]M requires the bracketed H literally.
        let r = run("AG[H]M", "G[H]M", 0, Direction::Right, Some(('[', ']')), "");
        assert!(r.matched);
        // Bracket tokens are consumed, not recorded.
        assert_eq!(r.matched_indices, vec![1, 3, 5]);
    }

    #[test]
    fn explicit_bracket_pattern_rejects_wrong_interior() {
        let r = run("AG[X]M", "G[H]M", 0, Direction::Right, Some(('[', ']')), "");
        assert!(!r.matched);
    }

    #[test]
    fn branch_skipping_applies_on_the_left() {
        // Left context A holds for B in "A[X]B" once branches are skipped.
        let r = run("A[X]B", "A", 4, Direction::Left, Some(('[', ']')), "");
        assert!(r.matched);
        assert_eq!(r.matched_indices, vec![0]);
    }

    #[test]
    fn ignored_symbols_are_transparent() {
        let r = run("A++B", "A", 3, Direction::Left, None, "+-");
        assert!(r.matched);
        let r = run("A++B", "B", 0, Direction::Right, None, "+-");
        assert!(r.matched);
    }

    #[test]
    fn non_ignored_symbol_still_blocks() {
        let r = run("AZB", "A", 2, Direction::Left, None, "+-");
        assert!(!r.matched);
    }

    #[test]
    fn empty_pattern_matches_trivially() {
        let r = run("ABC", "", 1, Direction::Right, None, "");
        assert!(r.matched);
        assert!(r.matched_indices.is_empty());
    }
}
