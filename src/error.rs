use thiserror::Error;

/// An error returned when a pattern cannot be compiled.
///
/// Every variant that originates in the parser carries `pos`, the index
/// (in characters, not bytes) of the pattern character the cursor was on
/// when compilation failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The pattern ended while more input was required.
    #[error("unexpected end of pattern at index {pos}{}", expecting(.expected))]
    UnexpectedEof { expected: Option<char>, pos: usize },

    /// A closing delimiter (`)`, `]` or `}`) was required but another
    /// character was found.
    #[error("expected {expected:?} but got {found:?} at index {pos}")]
    UnexpectedChar {
        expected: char,
        found: char,
        pos: usize,
    },

    /// A quantifier (`*`, `+`, `?` or `{`) appeared with no atom before it.
    #[error("nothing to repeat: {op:?} at index {pos}")]
    NothingToRepeat { op: char, pos: usize },

    /// Input remained after the pattern-level `$`, or a `)` had no
    /// matching `(`.
    #[error("unexpected {found:?} at index {pos}")]
    TrailingInput { found: char, pos: usize },

    /// A counted repetition whose maximum is below its minimum, e.g. `a{3,1}`.
    #[error("invalid repetition {{{min},{max}}} at index {pos}: max is less than min")]
    InvalidRepeat { min: usize, max: usize, pos: usize },

    /// A repetition count that does not fit in a `usize`.
    #[error("repetition count at index {pos} is too large")]
    RepeatOverflow { pos: usize },

    /// A character class range whose end precedes its start, e.g. `[z-a]`,
    /// or whose end is a shorthand class, e.g. `[a-\d]`.
    #[error("invalid character class range {start:?}-{end:?} at index {pos}")]
    InvalidClassRange { start: char, end: char, pos: usize },

    /// Groups are nested deeper than [`RegexBuilder::nest_limit`](crate::RegexBuilder::nest_limit).
    #[error("group at index {pos} exceeds the nesting limit of {limit}")]
    NestLimitExceeded { limit: u32, pos: usize },

    /// The automaton grew past [`RegexBuilder::state_limit`](crate::RegexBuilder::state_limit).
    #[error("compiled automaton exceeds the limit of {limit} states")]
    StateLimitExceeded { limit: usize },

    /// The automaton grew past [`RegexBuilder::edge_limit`](crate::RegexBuilder::edge_limit).
    /// Every member of a character class is one edge.
    #[error("compiled automaton exceeds the limit of {limit} edges")]
    EdgeLimitExceeded { limit: usize },
}

impl Error {
    /// The pattern index the error points at, if it has one.
    pub fn pos(&self) -> Option<usize> {
        match *self {
            Self::UnexpectedEof { pos, .. }
            | Self::UnexpectedChar { pos, .. }
            | Self::NothingToRepeat { pos, .. }
            | Self::TrailingInput { pos, .. }
            | Self::InvalidRepeat { pos, .. }
            | Self::RepeatOverflow { pos }
            | Self::InvalidClassRange { pos, .. }
            | Self::NestLimitExceeded { pos, .. } => Some(pos),
            Self::StateLimitExceeded { .. } | Self::EdgeLimitExceeded { .. } => None,
        }
    }
}

fn expecting(expected: &Option<char>) -> String {
    match expected {
        Some(c) => format!(", expected {c:?}"),
        None => String::new(),
    }
}

/// Returned by [`Match::group`](crate::Match::group) and friends when the
/// group index is out of range.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("no such group: {index} (match has {count} capture groups)")]
pub struct NoSuchGroup {
    pub index: usize,
    pub count: usize,
}
