//! The automaton model: labelled states stored in an arena, the
//! `(start, accept)` fragments used during construction, and the Thompson
//! composition primitives that wire fragments together.
//!
//! Every state of a compiled pattern lives in a single arena owned by the
//! [`Nfa`]; a [`StateIdx`] is the identity of a state.  Two states with
//! identical transitions are still distinct states, so all sets and maps
//! keyed by state use the index, never the contents.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::ops::{Index, IndexMut};

use indexmap::{IndexMap, IndexSet};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Transition labels
// ---------------------------------------------------------------------------

/// The label of an NFA edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    /// Followed without consuming input.
    Epsilon,
    /// Consumes exactly one character equal to the payload.
    Literal(char),
    /// Consumes any one character, newline included.
    Wildcard,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsilon => f.write_str("ε"),
            Self::Literal(c) => write!(f, "{}", c.escape_default()),
            Self::Wildcard => f.write_str("."),
        }
    }
}

// ---------------------------------------------------------------------------
// NFA states
// ---------------------------------------------------------------------------

/// Index into the NFA state arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateIdx(u32);

impl StateIdx {
    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }

    /// Return the raw arena index.
    pub fn as_usize(self) -> usize {
        self.idx()
    }
}

impl fmt::Display for StateIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single NFA state: an ordered map from edge label to the ordered list of
/// destination states.  A label may lead to several states, which is where
/// the nondeterminism comes from.
#[derive(Clone, Debug, Default)]
pub struct State {
    transitions: IndexMap<Label, Vec<StateIdx>>,
}

impl State {
    fn add_transition(&mut self, label: Label, to: StateIdx) {
        self.transitions.entry(label).or_default().push(to);
    }

    /// The destinations reachable over edges labelled `label`.
    #[inline]
    pub fn targets(&self, label: Label) -> &[StateIdx] {
        self.transitions.get(&label).map_or(&[], Vec::as_slice)
    }

    /// All outgoing edges, grouped by label, in insertion order.
    pub fn transitions(&self) -> impl Iterator<Item = (Label, &[StateIdx])> {
        self.transitions
            .iter()
            .map(|(label, targets)| (*label, targets.as_slice()))
    }

    /// All outgoing edges flattened to `(label, destination)` pairs.
    fn edges(&self) -> impl Iterator<Item = (Label, StateIdx)> + '_ {
        self.transitions()
            .flat_map(|(label, targets)| targets.iter().map(move |&t| (label, t)))
    }
}

/// `states[state_idx]`: typed access to the state arena.
impl Index<StateIdx> for [State] {
    type Output = State;

    #[inline]
    fn index(&self, idx: StateIdx) -> &State {
        &self[idx.idx()]
    }
}

impl IndexMut<StateIdx> for [State] {
    #[inline]
    fn index_mut(&mut self, idx: StateIdx) -> &mut State {
        &mut self[idx.idx()]
    }
}

// ---------------------------------------------------------------------------
// NFA fragment (used during construction)
// ---------------------------------------------------------------------------

/// A sub-automaton with exactly one entry and one exit state.
///
/// The accept state never has outgoing edges of its own; composition adds
/// them when the fragment is wired into a larger one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Fragment {
    pub(crate) start: StateIdx,
    pub(crate) accept: StateIdx,
}

impl Fragment {
    fn new(start: StateIdx, accept: StateIdx) -> Self {
        Self { start, accept }
    }
}

// ---------------------------------------------------------------------------
// Compiled automaton
// ---------------------------------------------------------------------------

struct StateList(Box<[State]>);

impl fmt::Debug for StateList {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_map().entries(self.0.iter().enumerate()).finish()
    }
}

impl std::ops::Deref for StateList {
    type Target = [State];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A compiled, immutable NFA with a single start and a single accept state.
#[derive(Debug)]
pub struct Nfa {
    states: StateList,
    start: StateIdx,
    accept: StateIdx,
}

impl Nfa {
    /// The entry state.
    pub fn start(&self) -> StateIdx {
        self.start
    }

    /// The single accepting state.
    pub fn accept(&self) -> StateIdx {
        self.accept
    }

    /// Number of states in the arena.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Total number of edges, epsilon edges included.
    pub fn edge_count(&self) -> usize {
        self.states
            .iter()
            .map(|state| state.transitions.values().map(Vec::len).sum::<usize>())
            .sum()
    }

    /// Always `false`: even the empty pattern compiles to two states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Look up a state.  Panics if `idx` does not belong to this NFA.
    pub fn state(&self, idx: StateIdx) -> &State {
        &self.states[idx]
    }

    pub(crate) fn states(&self) -> &[State] {
        &self.states
    }

    /// Compute the epsilon closure of `seeds`: every state reachable from
    /// them through epsilon edges alone, the seeds included.
    pub fn epsilon_closure(&self, seeds: impl IntoIterator<Item = StateIdx>) -> IndexSet<StateIdx> {
        let mut closure = IndexSet::new();
        let mut stack = Vec::new();
        for seed in seeds {
            add_closure(&self.states, seed, &mut closure, &mut stack);
        }
        closure
    }

    /// Emit a Graphviz DOT representation of the NFA.
    pub fn to_dot(&self, mut buffer: impl Write) -> io::Result<()> {
        let mut visited = vec![false; self.states.len()];
        writeln!(buffer, "digraph nfa {{")?;
        writeln!(buffer, "\trankdir=LR;")?;
        writeln!(buffer, "\t{} [shape=box];", self.start)?;
        writeln!(buffer, "\t{} [shape=doublecircle];", self.accept)?;
        let mut stack = vec![self.start];
        while let Some(s) = stack.pop() {
            if visited[s.idx()] {
                continue;
            }
            visited[s.idx()] = true;
            for (label, target) in self.states[s].edges() {
                writeln!(buffer, "\t{s} -> {target} [label=\"{label}\"];")?;
                if !visited[target.idx()] {
                    stack.push(target);
                }
            }
        }
        writeln!(buffer, "}}")
    }
}

/// Add `seed` and everything epsilon-reachable from it to `set`.
///
/// `set` is expected to be epsilon-closed on entry; it is again on return.
/// `stack` is scratch space and is left empty.
#[inline]
pub(crate) fn add_closure(
    states: &[State],
    seed: StateIdx,
    set: &mut IndexSet<StateIdx>,
    stack: &mut Vec<StateIdx>,
) {
    if !set.insert(seed) {
        return;
    }
    stack.push(seed);
    while let Some(idx) = stack.pop() {
        for &next in states[idx].targets(Label::Epsilon) {
            if set.insert(next) {
                stack.push(next);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Growing state arena plus the fragment composition primitives.
///
/// Primitives only ever allocate new states and add edges; the states of an
/// input fragment are reused by the fragment it is composed into.
#[derive(Debug)]
pub(crate) struct NfaBuilder {
    states: Vec<State>,
    state_limit: usize,
    /// Edges added so far, counted against `edge_limit`.
    edges: usize,
    edge_limit: usize,
}

impl NfaBuilder {
    pub(crate) fn new(state_limit: usize, edge_limit: usize) -> Self {
        Self {
            states: Vec::new(),
            state_limit,
            edges: 0,
            edge_limit,
        }
    }

    /// Push a new, edgeless state and return its index.
    fn state(&mut self) -> Result<StateIdx, Error> {
        let len = self.states.len();
        let idx = u32::try_from(len)
            .ok()
            .filter(|_| len < self.state_limit)
            .ok_or(Error::StateLimitExceeded {
                limit: self.state_limit,
            })?;
        let idx = StateIdx(idx);
        self.states.push(State::default());
        Ok(idx)
    }

    fn edge(&mut self, from: StateIdx, label: Label, to: StateIdx) -> Result<(), Error> {
        if self.edges >= self.edge_limit {
            return Err(Error::EdgeLimitExceeded {
                limit: self.edge_limit,
            });
        }
        self.edges += 1;
        self.states.as_mut_slice()[from].add_transition(label, to);
        Ok(())
    }

    fn single(&mut self, label: Label) -> Result<Fragment, Error> {
        let start = self.state()?;
        let accept = self.state()?;
        self.edge(start, label, accept)?;
        Ok(Fragment::new(start, accept))
    }

    /// Matches the empty string.
    pub(crate) fn empty(&mut self) -> Result<Fragment, Error> {
        self.single(Label::Epsilon)
    }

    pub(crate) fn literal(&mut self, ch: char) -> Result<Fragment, Error> {
        self.single(Label::Literal(ch))
    }

    pub(crate) fn wildcard(&mut self) -> Result<Fragment, Error> {
        self.single(Label::Wildcard)
    }

    /// One `Literal` edge per distinct member, all between the same pair of
    /// states.  An empty set yields a fragment that never matches.
    ///
    /// Every member costs an edge, so a range wider than the remaining
    /// edge budget fails before any of its edges is added.
    pub(crate) fn class(&mut self, members: impl IntoIterator<Item = char>) -> Result<Fragment, Error> {
        let members: IndexSet<char> = members.into_iter().collect();
        if self.edges.saturating_add(members.len()) > self.edge_limit {
            return Err(Error::EdgeLimitExceeded {
                limit: self.edge_limit,
            });
        }
        let start = self.state()?;
        let accept = self.state()?;
        for ch in members {
            self.edge(start, Label::Literal(ch), accept)?;
        }
        Ok(Fragment::new(start, accept))
    }

    pub(crate) fn concat(&mut self, a: Fragment, b: Fragment) -> Result<Fragment, Error> {
        self.edge(a.accept, Label::Epsilon, b.start)?;
        Ok(Fragment::new(a.start, b.accept))
    }

    pub(crate) fn alternate(&mut self, a: Fragment, b: Fragment) -> Result<Fragment, Error> {
        let start = self.state()?;
        let accept = self.state()?;
        self.edge(start, Label::Epsilon, a.start)?;
        self.edge(start, Label::Epsilon, b.start)?;
        self.edge(a.accept, Label::Epsilon, accept)?;
        self.edge(b.accept, Label::Epsilon, accept)?;
        Ok(Fragment::new(start, accept))
    }

    pub(crate) fn star(&mut self, a: Fragment) -> Result<Fragment, Error> {
        let start = self.state()?;
        let accept = self.state()?;
        self.edge(start, Label::Epsilon, a.start)?;
        self.edge(start, Label::Epsilon, accept)?;
        self.edge(a.accept, Label::Epsilon, a.start)?;
        self.edge(a.accept, Label::Epsilon, accept)?;
        Ok(Fragment::new(start, accept))
    }

    /// `a` followed by `star` of a fresh copy of `a`.
    pub(crate) fn plus(&mut self, a: Fragment) -> Result<Fragment, Error> {
        let looped = self.clone_fragment(a)?;
        let looped = self.star(looped)?;
        self.concat(a, looped)
    }

    pub(crate) fn optional(&mut self, a: Fragment) -> Result<Fragment, Error> {
        let start = self.state()?;
        let accept = self.state()?;
        self.edge(start, Label::Epsilon, a.start)?;
        self.edge(start, Label::Epsilon, accept)?;
        self.edge(a.accept, Label::Epsilon, accept)?;
        Ok(Fragment::new(start, accept))
    }

    /// Structural deep copy of `frag`.
    ///
    /// `copies` maps each original state to its copy and is filled lazily
    /// as the traversal discovers states, so shared states and cycles are
    /// copied exactly once.  Edges leaving `frag.accept` belong to whatever
    /// `frag` has since been wired into and are not followed.
    pub(crate) fn clone_fragment(&mut self, frag: Fragment) -> Result<Fragment, Error> {
        let mut copies: HashMap<StateIdx, StateIdx> = HashMap::new();
        let start = self.state()?;
        copies.insert(frag.start, start);
        let mut stack = vec![frag.start];
        while let Some(orig) = stack.pop() {
            if orig == frag.accept {
                continue;
            }
            let copy = copies[&orig];
            let edges: Vec<(Label, StateIdx)> = self.states.as_slice()[orig].edges().collect();
            for (label, target) in edges {
                let mapped = match copies.get(&target) {
                    Some(&mapped) => mapped,
                    None => {
                        let mapped = self.state()?;
                        copies.insert(target, mapped);
                        stack.push(target);
                        mapped
                    }
                };
                self.edge(copy, label, mapped)?;
            }
        }
        // An unreachable accept (e.g. the empty class `[]`) still needs a copy.
        let accept = match copies.get(&frag.accept) {
            Some(&accept) => accept,
            None => self.state()?,
        };
        Ok(Fragment::new(start, accept))
    }

    /// Counted repetition: `min` mandatory copies of `base`, then either
    /// `max - min` independently skippable copies or, when `max` is
    /// `None`, one starred copy.
    ///
    /// `base` itself is the first copy used; every further copy is a fresh
    /// clone of it, never an alias.
    pub(crate) fn repeat(&mut self, base: Fragment, min: usize, max: Option<usize>) -> Result<Fragment, Error> {
        debug_assert!(max.is_none_or(|max| min <= max));
        let mut base_used = false;
        let mut acc: Option<Fragment> = None;

        for _ in 0..min {
            let copy = self.fresh_copy(base, &mut base_used)?;
            acc = Some(self.chain(acc, copy)?);
        }

        match max {
            Some(max) => {
                for _ in min..max {
                    let copy = self.fresh_copy(base, &mut base_used)?;
                    let copy = self.optional(copy)?;
                    acc = Some(self.chain(acc, copy)?);
                }
            }
            None => {
                let copy = self.fresh_copy(base, &mut base_used)?;
                let copy = self.star(copy)?;
                acc = Some(self.chain(acc, copy)?);
            }
        }

        match acc {
            Some(frag) => Ok(frag),
            None => self.empty(),
        }
    }

    fn fresh_copy(&mut self, base: Fragment, base_used: &mut bool) -> Result<Fragment, Error> {
        if *base_used {
            self.clone_fragment(base)
        } else {
            *base_used = true;
            Ok(base)
        }
    }

    fn chain(&mut self, acc: Option<Fragment>, next: Fragment) -> Result<Fragment, Error> {
        match acc {
            Some(acc) => self.concat(acc, next),
            None => Ok(next),
        }
    }

    /// Freeze the arena into an [`Nfa`] whose entry and exit are those of
    /// `frag`.
    pub(crate) fn finish(self, frag: Fragment) -> Nfa {
        Nfa {
            states: StateList(self.states.into_boxed_slice()),
            start: frag.start,
            accept: frag.accept,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
