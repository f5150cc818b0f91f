//! Subset simulation of a compiled [`Regex`].
//!
//! The simulator tracks the set of live states (by [`StateIdx`]) instead of
//! determinizing the automaton.  All ambiguity is explored in parallel, so
//! there is no backtracking: one pass over the input decides every start
//! position it is asked about.
//!
//! All mutable state lives in a [`MatcherMemory`] owned by the caller; the
//! compiled automaton is only ever read, which is what lets one [`Regex`]
//! be shared between threads.

use indexmap::IndexSet;
use log::trace;

use crate::Regex;
use crate::nfa::{Label, State, StateIdx, add_closure};

/// Reusable memory for [`Matcher`].  Create once, call
/// [`matcher`](Self::matcher) for each run.
#[derive(Clone, Debug, Default)]
pub struct MatcherMemory {
    /// Current and next live sets (swapped each step).
    clist: IndexSet<StateIdx>,
    nlist: IndexSet<StateIdx>,
    /// Worklist for epsilon closures.
    stack: Vec<StateIdx>,
}

impl MatcherMemory {
    /// Bind this memory to `regex`.  The returned matcher starts in the
    /// epsilon closure of the start state.
    pub fn matcher<'a>(&'a mut self, regex: &'a Regex) -> Matcher<'a> {
        let nfa = regex.nfa();
        let mut m = Matcher {
            states: nfa.states(),
            start: nfa.start(),
            accept: nfa.accept(),
            anchor_start: regex.anchored_start(),
            anchor_end: regex.anchored_end(),
            clist: &mut self.clist,
            nlist: &mut self.nlist,
            stack: &mut self.stack,
        };
        m.reset();
        m
    }
}

/// Runs the subset simulation of one compiled pattern.
#[derive(Debug)]
pub struct Matcher<'a> {
    states: &'a [State],
    start: StateIdx,
    accept: StateIdx,
    anchor_start: bool,
    anchor_end: bool,
    /// Live set.
    clist: &'a mut IndexSet<StateIdx>,
    /// Live set under construction during [`step`](Self::step).
    nlist: &'a mut IndexSet<StateIdx>,
    stack: &'a mut Vec<StateIdx>,
}

impl<'a> Matcher<'a> {
    /// Return to the initial live set: the epsilon closure of the start
    /// state.
    pub fn reset(&mut self) {
        self.clist.clear();
        add_closure(self.states, self.start, self.clist, self.stack);
    }

    /// Advance the simulation by one input character.
    ///
    /// The next live set is the union of the epsilon closures of every
    /// state reachable from a live state over a `Wildcard` edge or a
    /// `Literal(ch)` edge.
    pub fn step(&mut self, ch: char) {
        self.nlist.clear();
        for &idx in self.clist.iter() {
            let state = &self.states[idx];
            let targets = state
                .targets(Label::Wildcard)
                .iter()
                .chain(state.targets(Label::Literal(ch)));
            for &target in targets {
                add_closure(self.states, target, self.nlist, self.stack);
            }
        }
        std::mem::swap(self.clist, self.nlist);
    }

    /// `true` once no state is live; no further input can produce a match.
    pub fn is_dead(&self) -> bool {
        self.clist.is_empty()
    }

    /// `true` if the accept state is live.
    pub fn is_accepting(&self) -> bool {
        self.clist.contains(&self.accept)
    }

    /// The live states, in the order they were reached.
    pub fn live_states(&self) -> impl Iterator<Item = StateIdx> + '_ {
        self.clist.iter().copied()
    }

    /// Run the automaton from byte offset `start` and return the end of the
    /// longest match beginning there.
    ///
    /// The simulation stops as soon as the live set empties.  When the
    /// pattern is anchored at the end, a match must consume the rest of the
    /// haystack.  Otherwise the longest end recorded after a step wins; a
    /// zero-width match is only reported when there was no input left to
    /// step over.
    ///
    /// Returns `None` if `start` is out of bounds or not on a character
    /// boundary.
    pub fn match_from(&mut self, haystack: &str, start: usize) -> Option<usize> {
        let rest = haystack.get(start..)?;
        self.reset();

        let mut pos = start;
        let mut best = None;
        for ch in rest.chars() {
            self.step(ch);
            if self.is_dead() {
                trace!("automaton died at offset {pos} (started at {start})");
                break;
            }
            pos += ch.len_utf8();
            if self.is_accepting() {
                best = Some(pos);
            }
        }

        if self.anchor_end {
            (pos == haystack.len() && self.is_accepting()).then_some(pos)
        } else {
            best.or_else(|| (pos == start && self.is_accepting()).then_some(start))
        }
    }

    /// Find the match with the lowest start offset, as `(start, end)`.
    ///
    /// A pattern anchored at the start is only tried at offset 0.
    pub fn search(&mut self, haystack: &str) -> Option<(usize, usize)> {
        if self.anchor_start {
            return self.match_from(haystack, 0).map(|end| (0, end));
        }
        let starts = haystack
            .char_indices()
            .map(|(i, _)| i)
            .chain([haystack.len()]);
        for start in starts {
            trace!("search attempt at offset {start}");
            if let Some(end) = self.match_from(haystack, start) {
                return Some((start, end));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(m: &Matcher<'_>) -> Vec<StateIdx> {
        let mut v: Vec<_> = m.live_states().collect();
        v.sort();
        v
    }

    #[test]
    fn test_initial_set_is_closure_of_start() {
        let re = Regex::new("a*b").unwrap();
        let mut mem = MatcherMemory::default();
        let m = mem.matcher(&re);
        let mut expected: Vec<_> = re.nfa().epsilon_closure([re.nfa().start()]).into_iter().collect();
        expected.sort();
        assert_eq!(live(&m), expected);
        assert!(!m.is_accepting());
        assert!(!m.is_dead());
    }

    #[test]
    fn test_step_literal_and_wildcard() {
        let re = Regex::new("a.c").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        m.step('a');
        assert!(!m.is_dead());
        m.step('\n');
        assert!(!m.is_dead(), "`.` consumes newlines too");
        m.step('c');
        assert!(m.is_accepting());
        m.step('c');
        assert!(m.is_dead());
    }

    #[test]
    fn test_step_dies_on_mismatch() {
        let re = Regex::new("ab").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        m.step('x');
        assert!(m.is_dead());
        assert!(!m.is_accepting());
        m.reset();
        assert!(!m.is_dead());
    }

    #[test]
    fn test_match_from_greedy() {
        let re = Regex::new("a+").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        assert_eq!(m.match_from("baaab", 1), Some(4));
        assert_eq!(m.match_from("baaab", 0), None);
        assert_eq!(m.match_from("baaab", 4), None);
        assert_eq!(m.match_from("baaab", 6), None);
    }

    #[test]
    fn test_match_from_keeps_longest_after_dying() {
        // After "ab" the automaton accepts; "abx" kills it but the earlier
        // accept is kept.
        let re = Regex::new("ab|abcd").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        assert_eq!(m.match_from("abcx", 0), Some(2));
        assert_eq!(m.match_from("abcd", 0), Some(4));
    }

    #[test]
    fn test_match_from_zero_width_only_at_end() {
        let re = Regex::new("a*").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        assert_eq!(m.match_from("", 0), Some(0));
        assert_eq!(m.match_from("b", 0), None);
        assert_eq!(m.match_from("b", 1), Some(1));
    }

    #[test]
    fn test_match_from_anchor_end() {
        let re = Regex::new("ab*$").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        assert_eq!(m.match_from("abb", 0), Some(3));
        assert_eq!(m.match_from("abbc", 0), None);
        assert_eq!(m.match_from("xab", 1), Some(3));
    }

    #[test]
    fn test_match_from_non_char_boundary() {
        let re = Regex::new(".").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        assert_eq!(m.match_from("é", 1), None);
        assert_eq!(m.match_from("é", 0), Some(2));
    }

    #[test]
    fn test_search_lowest_start() {
        let re = Regex::new("b+|ab").unwrap();
        let mut mem = MatcherMemory::default();
        let mut m = mem.matcher(&re);
        assert_eq!(m.search("xxabbb"), Some((2, 4)));

        let re = Regex::new("^b").unwrap();
        let mut m = mem.matcher(&re);
        assert_eq!(m.search("ab"), None);
        assert_eq!(m.search("ba"), Some((0, 1)));
    }

    #[test]
    fn test_memory_reuse_across_patterns() {
        let mut mem = MatcherMemory::default();
        let first = Regex::new("(ab)+").unwrap();
        let second = Regex::new("[0-9]{2}").unwrap();
        assert_eq!(mem.matcher(&first).search("xabab"), Some((1, 5)));
        assert_eq!(mem.matcher(&second).search("a123"), Some((1, 3)));
        assert_eq!(mem.matcher(&first).search("ba"), None);
    }
}
