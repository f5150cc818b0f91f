//! Thompson NFA pattern compiler with a subset-simulation matcher.
//!
//! Based on Russ Cox's article <https://swtch.com/~rsc/regexp/regexp1.html>
//! (Thompson NFA construction and simulation).  Counted repetitions
//! (`{min,max}`) are expanded into structural copies of the repeated
//! sub-automaton rather than tracked with counters.
//!
//! # Architecture
//!
//! The pipeline is:
//!
//! ```text
//! pattern  ──Parser──>  Fragment + anchors  ──NfaBuilder::finish──>  Nfa  ──Matcher──>  Match
//! ```
//!
//! The parser is a recursive-descent compiler that emits fragments
//! through the composition primitives of [`nfa`] as it reads, so no syntax
//! tree is built.  The finished [`Nfa`] is owned by a [`Regex`] and never
//! modified again.
//!
//! Matching is done by [`Matcher`], which tracks the set of live states
//! instead of backtracking.  Its scratch sets live in a [`MatcherMemory`]
//! owned by the caller, so a single [`Regex`] can be shared between
//! threads.
//!
//! ## Supported syntax
//!
//! | Syntax            | Meaning                                               |
//! |-------------------|-------------------------------------------------------|
//! | `x`               | the literal character `x`                             |
//! | `.`               | any character, newline included                       |
//! | `ab`, `a\|b`      | concatenation, alternation                            |
//! | `(…)`             | grouping (no capture)                                 |
//! | `*`, `+`, `?`     | zero or more, one or more, zero or one (greedy)       |
//! | `{n}`, `{n,}`, `{n,m}`, `{,m}` | counted repetition                       |
//! | `[abc]`, `[a-z]`, `[^…]` | character class, range, negation               |
//! | `\d`, `\w`, `\s`  | digit, word character, whitespace                     |
//! | `\x`              | any other escaped character is literal                |
//! | `^`, `$`          | anchor at the start of the pattern / end of a branch  |
//!
//! Negated classes are complemented against printable ASCII plus `\t`,
//! `\n`, `\r`, `\x0b` and `\x0c`.
//!
//! ## Match semantics
//!
//! Matches are greedy: from a given start the longest accepted prefix is
//! reported.  Searching tries every start position in order and returns
//! the first one that matches.  A zero-width match is only reported when
//! there is no input left at the start position, so `""` matches the empty
//! haystack but not `"a"`.
//!
//! All offsets are byte offsets into the haystack.
//!
//! ```
//! use nfa_regex::Regex;
//!
//! let re = Regex::new(r"\d{2,3}-\w+").unwrap();
//! let m = re.search("call 555-help now").unwrap();
//! assert_eq!(m.as_str(), "555-help");
//! assert_eq!(m.range(), 5..13);
//! ```

use std::fmt;
use std::iter::FusedIterator;
use std::str::FromStr;

use log::debug;

mod error;
mod matcher;
mod matches;
pub mod nfa;
mod parser;

pub use crate::error::{Error, NoSuchGroup};
pub use crate::matcher::{Matcher, MatcherMemory};
pub use crate::matches::Match;
pub use crate::nfa::Nfa;

use crate::parser::Parser;

// ---------------------------------------------------------------------------
// Compiled pattern
// ---------------------------------------------------------------------------

/// A compiled pattern ready for matching.
///
/// A `Regex` is immutable; every matching method allocates its own
/// [`MatcherMemory`].  Callers matching in a hot loop can reuse one memory
/// through [`MatcherMemory::matcher`].
#[derive(Debug)]
pub struct Regex {
    pattern: String,
    nfa: Nfa,
    anchor_start: bool,
    anchor_end: bool,
}

impl Regex {
    /// Compile `pattern` with the default [`RegexBuilder`] limits.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        RegexBuilder::default().build(pattern)
    }

    /// The source pattern.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// `true` if the pattern starts with `^`.
    pub fn anchored_start(&self) -> bool {
        self.anchor_start
    }

    /// `true` if the pattern ends with a pattern-level `$`.
    pub fn anchored_end(&self) -> bool {
        self.anchor_end
    }

    /// The compiled automaton.
    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// Match at the very start of `haystack` only, returning the longest
    /// match there.
    pub fn match_prefix<'h>(&self, haystack: &'h str) -> Option<Match<'h>> {
        let mut memory = MatcherMemory::default();
        let end = memory.matcher(self).match_from(haystack, 0)?;
        Some(Match::new(haystack, 0, end))
    }

    /// Find the match with the lowest start offset.
    pub fn search<'h>(&self, haystack: &'h str) -> Option<Match<'h>> {
        let mut memory = MatcherMemory::default();
        let (start, end) = memory.matcher(self).search(haystack)?;
        Some(Match::new(haystack, start, end))
    }

    /// `true` if the pattern matches anywhere in `haystack`.
    pub fn is_match(&self, haystack: &str) -> bool {
        let mut memory = MatcherMemory::default();
        memory.matcher(self).search(haystack).is_some()
    }

    /// Iterate over successive non-overlapping matches, left to right.
    ///
    /// After a match ending at `e`, scanning resumes at `e`; after a
    /// zero-width match or a failed attempt, it resumes one character
    /// further on.  A pattern anchored with `^` yields at most one match,
    /// at offset 0.
    pub fn find_iter<'r, 'h>(&'r self, haystack: &'h str) -> Matches<'r, 'h> {
        Matches {
            regex: self,
            haystack,
            pos: Some(0),
            memory: MatcherMemory::default(),
        }
    }

    /// All non-overlapping matches; see [`find_iter`](Self::find_iter).
    pub fn find_all<'h>(&self, haystack: &'h str) -> Vec<Match<'h>> {
        self.find_iter(haystack).collect()
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for Regex {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Self, Error> {
        Self::new(pattern)
    }
}

/// Iterator returned by [`Regex::find_iter`].
#[derive(Debug)]
pub struct Matches<'r, 'h> {
    regex: &'r Regex,
    haystack: &'h str,
    /// Next start offset to try; `None` once the haystack is exhausted.
    pos: Option<usize>,
    memory: MatcherMemory,
}

impl<'h> Iterator for Matches<'_, 'h> {
    type Item = Match<'h>;

    fn next(&mut self) -> Option<Match<'h>> {
        loop {
            let pos = self.pos?;
            if self.regex.anchor_start && pos > 0 {
                self.pos = None;
                return None;
            }
            let end = self.memory.matcher(self.regex).match_from(self.haystack, pos);
            let next_char = self
                .haystack
                .get(pos..)
                .and_then(|rest| rest.chars().next())
                .map(|c| pos + c.len_utf8());
            match end {
                Some(end) => {
                    self.pos = if end > pos { Some(end) } else { next_char };
                    return Some(Match::new(self.haystack, pos, end));
                }
                None => self.pos = next_char,
            }
        }
    }
}

impl FusedIterator for Matches<'_, '_> {}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Compiles patterns with configurable resource limits.
#[derive(Clone, Debug)]
pub struct RegexBuilder {
    nest_limit: u32,
    state_limit: usize,
    edge_limit: usize,
}

impl Default for RegexBuilder {
    fn default() -> Self {
        Self {
            nest_limit: 250,
            state_limit: 1_000_000,
            edge_limit: 4_000_000,
        }
    }
}

impl RegexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum depth of nested groups.  Each `(` past this depth fails with
    /// [`Error::NestLimitExceeded`].  The default is 250.
    pub fn nest_limit(&mut self, limit: u32) -> &mut Self {
        self.nest_limit = limit;
        self
    }

    /// Maximum number of automaton states.  Counted repetitions multiply
    /// the size of their operand, so `a{1000000}` would otherwise allocate
    /// millions of states.  The default is 1,000,000.
    pub fn state_limit(&mut self, limit: usize) -> &mut Self {
        self.state_limit = limit;
        self
    }

    /// Maximum number of automaton edges.  A character class adds one edge
    /// per member, so `[ -\u{FFFF}]{100}` stays within a few hundred states
    /// but needs millions of edges.  The default is 4,000,000.
    pub fn edge_limit(&mut self, limit: usize) -> &mut Self {
        self.edge_limit = limit;
        self
    }

    /// Compile `pattern`.
    pub fn build(&self, pattern: &str) -> Result<Regex, Error> {
        let compiled =
            Parser::new(pattern, self.nest_limit, self.state_limit, self.edge_limit).parse()?;
        debug!(
            "compiled {pattern:?}: {} states, {} edges, anchored start={} end={}",
            compiled.nfa.len(),
            compiled.nfa.edge_count(),
            compiled.anchor_start,
            compiled.anchor_end,
        );
        Ok(Regex {
            pattern: pattern.to_owned(),
            nfa: compiled.nfa,
            anchor_start: compiled.anchor_start,
            anchor_end: compiled.anchor_end,
        })
    }
}

// ---------------------------------------------------------------------------
// One-shot helpers
// ---------------------------------------------------------------------------

/// Compile `pattern` and report whether it matches anywhere in `haystack`.
pub fn is_match(pattern: &str, haystack: &str) -> Result<bool, Error> {
    Ok(Regex::new(pattern)?.is_match(haystack))
}

/// Compile `pattern` and [`search`](Regex::search) `haystack`.
pub fn find<'h>(pattern: &str, haystack: &'h str) -> Result<Option<Match<'h>>, Error> {
    Ok(Regex::new(pattern)?.search(haystack))
}

/// Compile `pattern` and match it at the start of `haystack`.
pub fn match_prefix<'h>(pattern: &str, haystack: &'h str) -> Result<Option<Match<'h>>, Error> {
    Ok(Regex::new(pattern)?.match_prefix(haystack))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
