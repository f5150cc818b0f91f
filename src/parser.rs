//! Recursive-descent pattern compiler.
//!
//! ```text
//! pattern    := '^'? expression '$'?
//! expression := term ('|' term)*
//! term       := factor*                 (stops at ')', '|', '$' or the end)
//! factor     := base quantifier*
//! quantifier := '*' | '+' | '?' | '{' range '}'
//! base       := '(' expression ')' | '\' escape | '.' | '[' class ']' | literal
//! ```
//!
//! Each production returns a [`Fragment`] built with the [`NfaBuilder`]
//! primitives, so the automaton is assembled while the pattern is read; no
//! syntax tree is materialized.

use indexmap::IndexSet;

use crate::error::Error;
use crate::nfa::{Fragment, Nfa, NfaBuilder};

// ---------------------------------------------------------------------------
// Character sets
// ---------------------------------------------------------------------------

const SPACE: [char; 6] = [' ', '\t', '\r', '\n', '\x0c', '\x0b'];

/// The universe a negated class is complemented against: printable ASCII
/// plus the ASCII whitespace controls.
fn universe() -> impl Iterator<Item = char> {
    (' '..='~').chain(['\t', '\n', '\r', '\x0b', '\x0c'])
}

/// What a `\x` escape stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Escape {
    Digit,
    Word,
    Space,
    Literal(char),
}

impl Escape {
    fn from_char(c: char) -> Self {
        match c {
            'd' => Self::Digit,
            'w' => Self::Word,
            's' => Self::Space,
            c => Self::Literal(c),
        }
    }

    fn members(self) -> Vec<char> {
        match self {
            Self::Digit => ('0'..='9').collect(),
            Self::Word => ('a'..='z')
                .chain('A'..='Z')
                .chain('0'..='9')
                .chain(['_'])
                .collect(),
            Self::Space => SPACE.to_vec(),
            Self::Literal(c) => vec![c],
        }
    }
}

/// A postfix operator following a base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quantifier {
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
    /// `{`; the range itself is read after dispatch.
    Counted,
}

impl Quantifier {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '*' => Some(Self::ZeroOrMore),
            '+' => Some(Self::OneOrMore),
            '?' => Some(Self::ZeroOrOne),
            '{' => Some(Self::Counted),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Output of a successful parse.
#[derive(Debug)]
pub(crate) struct Compiled {
    pub(crate) nfa: Nfa,
    pub(crate) anchor_start: bool,
    pub(crate) anchor_end: bool,
}

#[derive(Debug)]
pub(crate) struct Parser {
    chars: Vec<char>,
    /// Index of the next unread character.  Only ever increases.
    pos: usize,
    depth: u32,
    nest_limit: u32,
    builder: NfaBuilder,
    anchor_start: bool,
    anchor_end: bool,
}

impl Parser {
    pub(crate) fn new(pattern: &str, nest_limit: u32, state_limit: usize, edge_limit: usize) -> Self {
        Self {
            chars: pattern.chars().collect(),
            pos: 0,
            depth: 0,
            nest_limit,
            builder: NfaBuilder::new(state_limit, edge_limit),
            anchor_start: false,
            anchor_end: false,
        }
    }

    /// Parse the whole pattern.  The returned automaton is never modified
    /// again.
    pub(crate) fn parse(mut self) -> Result<Compiled, Error> {
        if self.peek() == Some('^') {
            self.pos += 1;
            self.anchor_start = true;
        }

        let frag = self.expression()?;

        if self.peek() == Some('$') {
            self.pos += 1;
            self.anchor_end = true;
        }
        if let Some(found) = self.peek() {
            return Err(Error::TrailingInput {
                found,
                pos: self.pos,
            });
        }

        Ok(Compiled {
            nfa: self.builder.finish(frag),
            anchor_start: self.anchor_start,
            anchor_end: self.anchor_end,
        })
    }

    // -- Productions ---------------------------------------------------------

    fn expression(&mut self) -> Result<Fragment, Error> {
        let mut frag = self.term()?;
        while self.peek() == Some('|') {
            self.pos += 1;
            let rhs = self.term()?;
            frag = self.builder.alternate(frag, rhs)?;
        }
        Ok(frag)
    }

    /// A possibly empty sequence of factors.  An empty term matches the
    /// empty string, which is what makes `""`, `a|` and `()` valid.
    fn term(&mut self) -> Result<Fragment, Error> {
        let mut acc: Option<Fragment> = None;
        while let Some(c) = self.peek() {
            if matches!(c, ')' | '|' | '$') {
                break;
            }
            let next = self.factor()?;
            acc = Some(match acc {
                Some(acc) => self.builder.concat(acc, next)?,
                None => next,
            });
        }
        match acc {
            Some(frag) => Ok(frag),
            None => self.builder.empty(),
        }
    }

    fn factor(&mut self) -> Result<Fragment, Error> {
        let mut frag = self.base()?;
        while let Some(quantifier) = self.peek().and_then(Quantifier::from_char) {
            self.pos += 1;
            frag = match quantifier {
                Quantifier::ZeroOrMore => self.builder.star(frag)?,
                Quantifier::OneOrMore => self.builder.plus(frag)?,
                Quantifier::ZeroOrOne => self.builder.optional(frag)?,
                Quantifier::Counted => {
                    let (min, max) = self.repeat_range()?;
                    self.builder.repeat(frag, min, max)?
                }
            };
        }
        Ok(frag)
    }

    fn base(&mut self) -> Result<Fragment, Error> {
        let pos = self.pos;
        match self.next_char()? {
            '(' => {
                if self.depth >= self.nest_limit {
                    return Err(Error::NestLimitExceeded {
                        limit: self.nest_limit,
                        pos,
                    });
                }
                self.depth += 1;
                let frag = self.expression()?;
                self.expect(')')?;
                self.depth -= 1;
                Ok(frag)
            }
            '\\' => match Escape::from_char(self.next_char()?) {
                Escape::Literal(c) => self.builder.literal(c),
                shorthand => self.builder.class(shorthand.members()),
            },
            '.' => self.builder.wildcard(),
            '[' => {
                let members = self.class()?;
                self.expect(']')?;
                self.builder.class(members)
            }
            op @ ('*' | '+' | '?' | '{') => Err(Error::NothingToRepeat { op, pos }),
            c => self.builder.literal(c),
        }
    }

    /// The body of `[...]` after the opening bracket, up to (not including)
    /// the closing one.
    fn class(&mut self) -> Result<IndexSet<char>, Error> {
        let negated = self.peek() == Some('^');
        if negated {
            self.pos += 1;
        }

        let mut members = IndexSet::new();
        while let Some(c) = self.peek() {
            if c == ']' {
                break;
            }
            let pos = self.pos;
            self.pos += 1;
            let start = match c {
                '\\' => match Escape::from_char(self.next_char()?) {
                    Escape::Literal(c) => c,
                    shorthand => {
                        members.extend(shorthand.members());
                        continue;
                    }
                },
                c => c,
            };

            // `-` is a range operator only between two items; first or
            // last in the class it is a plain member.
            let is_range = self.peek() == Some('-')
                && self.chars.get(self.pos + 1).is_some_and(|&c| c != ']');
            if !is_range {
                members.insert(start);
                continue;
            }
            self.pos += 1;
            let end = match self.next_char()? {
                '\\' => match Escape::from_char(self.next_char()?) {
                    Escape::Literal(c) => c,
                    _ => {
                        return Err(Error::InvalidClassRange {
                            start,
                            end: self.chars[self.pos - 1],
                            pos,
                        });
                    }
                },
                c => c,
            };
            if end < start {
                return Err(Error::InvalidClassRange { start, end, pos });
            }
            members.extend(start..=end);
        }

        if negated {
            members = universe().filter(|c| !members.contains(c)).collect();
        }
        Ok(members)
    }

    /// The body of `{...}` after the opening brace, including the closing
    /// one.  `{n}` is exact, `{n,}` is unbounded and a missing minimum is 0.
    fn repeat_range(&mut self) -> Result<(usize, Option<usize>), Error> {
        let open = self.pos - 1;
        let min = self.number()?.unwrap_or(0);
        let max = if self.peek() == Some(',') {
            self.pos += 1;
            self.number()?
        } else {
            Some(min)
        };
        self.expect('}')?;
        if let Some(max) = max
            && max < min
        {
            return Err(Error::InvalidRepeat {
                min,
                max,
                pos: open,
            });
        }
        Ok((min, max))
    }

    fn number(&mut self) -> Result<Option<usize>, Error> {
        let start = self.pos;
        let mut value: Option<usize> = None;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            let next = value
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit as usize))
                .ok_or(Error::RepeatOverflow { pos: start })?;
            value = Some(next);
            self.pos += 1;
        }
        Ok(value)
    }

    // -- Cursor --------------------------------------------------------------

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_char(&mut self) -> Result<char, Error> {
        let c = self.peek().ok_or(Error::UnexpectedEof {
            expected: None,
            pos: self.pos,
        })?;
        self.pos += 1;
        Ok(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(Error::UnexpectedChar {
                expected,
                found,
                pos: self.pos,
            }),
            None => Err(Error::UnexpectedEof {
                expected: Some(expected),
                pos: self.pos,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::Label;

    fn parse(pattern: &str) -> Result<Compiled, Error> {
        Parser::new(pattern, 250, usize::MAX, usize::MAX).parse()
    }

    fn parse_class(body: &str) -> Result<IndexSet<char>, Error> {
        Parser::new(body, 250, usize::MAX, usize::MAX).class()
    }

    fn range(pattern: &str) -> Result<(usize, Option<usize>), Error> {
        // Position the cursor just past the `{`, as `factor` does.
        let mut parser = Parser::new(pattern, 250, usize::MAX, usize::MAX);
        parser.pos = 1;
        parser.repeat_range()
    }

    /// Labels on the edges leaving the start state, in order.
    fn start_labels(compiled: &Compiled) -> Vec<Label> {
        let nfa = &compiled.nfa;
        nfa.state(nfa.start()).transitions().map(|(l, _)| l).collect()
    }

    #[test]
    fn test_anchor_flags() {
        let c = parse("^abc$").unwrap();
        assert!(c.anchor_start && c.anchor_end);
        let c = parse("abc").unwrap();
        assert!(!c.anchor_start && !c.anchor_end);
        let c = parse("^").unwrap();
        assert!(c.anchor_start && !c.anchor_end);
        let c = parse("$").unwrap();
        assert!(!c.anchor_start && c.anchor_end);
        // `^` is only an anchor in front; elsewhere it is a literal.
        let c = parse("a^").unwrap();
        assert!(!c.anchor_start);
    }

    #[test]
    fn test_empty_pattern_and_branches() {
        for pattern in ["", "()", "a|", "|a", "(|)", "^$"] {
            assert!(parse(pattern).is_ok(), "{pattern:?} should compile");
        }
    }

    #[test]
    fn test_unexpected_eof() {
        assert_eq!(
            parse("(ab").unwrap_err(),
            Error::UnexpectedEof {
                expected: Some(')'),
                pos: 3
            }
        );
        assert_eq!(
            parse("[ab").unwrap_err(),
            Error::UnexpectedEof {
                expected: Some(']'),
                pos: 3
            }
        );
        assert_eq!(
            parse("a{2").unwrap_err(),
            Error::UnexpectedEof {
                expected: Some('}'),
                pos: 3
            }
        );
        assert_eq!(
            parse("ab\\").unwrap_err(),
            Error::UnexpectedEof {
                expected: None,
                pos: 3
            }
        );
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(
            parse("(a$)").unwrap_err(),
            Error::UnexpectedChar {
                expected: ')',
                found: '$',
                pos: 2
            }
        );
        assert_eq!(
            parse("a{2x}").unwrap_err(),
            Error::UnexpectedChar {
                expected: '}',
                found: 'x',
                pos: 3
            }
        );
    }

    #[test]
    fn test_nothing_to_repeat() {
        assert_eq!(
            parse("*a").unwrap_err(),
            Error::NothingToRepeat { op: '*', pos: 0 }
        );
        assert_eq!(
            parse("a|+").unwrap_err(),
            Error::NothingToRepeat { op: '+', pos: 2 }
        );
        assert_eq!(
            parse("(?)").unwrap_err(),
            Error::NothingToRepeat { op: '?', pos: 1 }
        );
        assert_eq!(
            parse("^{2}").unwrap_err(),
            Error::NothingToRepeat { op: '{', pos: 1 }
        );
        // Escaped, they are ordinary literals.
        assert!(parse(r"\*\+\?\{").is_ok());
    }

    #[test]
    fn test_trailing_input() {
        assert_eq!(
            parse("a$b").unwrap_err(),
            Error::TrailingInput { found: 'b', pos: 2 }
        );
        assert_eq!(
            parse("a)").unwrap_err(),
            Error::TrailingInput { found: ')', pos: 1 }
        );
        assert_eq!(
            parse("a$$").unwrap_err(),
            Error::TrailingInput { found: '$', pos: 2 }
        );
    }

    #[test]
    fn test_repeat_ranges() {
        assert_eq!(range("{3}"), Ok((3, Some(3))));
        assert_eq!(range("{3,}"), Ok((3, None)));
        assert_eq!(range("{,4}"), Ok((0, Some(4))));
        assert_eq!(range("{2,4}"), Ok((2, Some(4))));
        assert_eq!(range("{}"), Ok((0, Some(0))));
        assert_eq!(range("{,}"), Ok((0, None)));
        assert_eq!(
            range("{4,2}"),
            Err(Error::InvalidRepeat {
                min: 4,
                max: 2,
                pos: 0
            })
        );
        assert_eq!(
            range("{99999999999999999999999}"),
            Err(Error::RepeatOverflow { pos: 1 })
        );
    }

    #[test]
    fn test_chained_quantifiers() {
        for pattern in ["a??", "a*+", "a+*", "a{2}{3}", "(ab)*?", "a{1,2}+"] {
            assert!(parse(pattern).is_ok(), "{pattern:?} should compile");
        }
    }

    #[test]
    fn test_class_members() {
        let set = parse_class("a-cx]").unwrap();
        assert_eq!(set.iter().copied().collect::<String>(), "abcx");

        // Leading and trailing `-` are literals.
        let set = parse_class("-a-]").unwrap();
        assert_eq!(set.iter().copied().collect::<String>(), "-a");

        // Shorthands and escaped literals inside a class.
        let set = parse_class(r"\d\]\\]").unwrap();
        assert_eq!(set.iter().copied().collect::<String>(), "0123456789]\\");

        // Duplicates collapse.
        let set = parse_class("aaa-c]").unwrap();
        assert_eq!(set.len(), 3);

        // Empty class.
        assert!(parse_class("]").unwrap().is_empty());
    }

    #[test]
    fn test_negated_class() {
        let set = parse_class("^a-z]").unwrap();
        assert_eq!(set.len(), 100 - 26);
        assert!(set.contains(&'A') && set.contains(&'\t') && set.contains(&'~'));
        assert!(!set.contains(&'m'));
        assert!(!set.contains(&'é'));

        // `[^]` is the whole universe.
        assert_eq!(parse_class("^]").unwrap().len(), 100);

        // `^` anywhere but first is a member.
        let set = parse_class("a^]").unwrap();
        assert_eq!(set.iter().copied().collect::<String>(), "a^");
    }

    #[test]
    fn test_reversed_class_range() {
        assert_eq!(
            parse("[z-a]").unwrap_err(),
            Error::InvalidClassRange {
                start: 'z',
                end: 'a',
                pos: 1
            }
        );
        assert_eq!(
            parse(r"[a-\d]").unwrap_err(),
            Error::InvalidClassRange {
                start: 'a',
                end: 'd',
                pos: 1
            }
        );
        // A single-character range is fine.
        assert!(parse("[a-a]").is_ok());
    }

    #[test]
    fn test_shorthand_expansion() {
        let digit = parse(r"\d").unwrap();
        assert_eq!(start_labels(&digit).len(), 10);

        let word = parse(r"\w").unwrap();
        let labels = start_labels(&word);
        assert_eq!(labels.len(), 63);
        assert!(labels.contains(&Label::Literal('_')));

        let space = parse(r"\s").unwrap();
        assert_eq!(
            start_labels(&space),
            SPACE.iter().map(|&c| Label::Literal(c)).collect::<Vec<_>>()
        );

        // Any other escaped character is itself.
        let lit = parse(r"\.").unwrap();
        assert_eq!(start_labels(&lit), vec![Label::Literal('.')]);
    }

    #[test]
    fn test_dot_is_wildcard() {
        let c = parse(".").unwrap();
        assert_eq!(start_labels(&c), vec![Label::Wildcard]);
    }

    #[test]
    fn test_nest_limit() {
        assert_eq!(
            Parser::new("((a))", 1, usize::MAX, usize::MAX).parse().unwrap_err(),
            Error::NestLimitExceeded { limit: 1, pos: 1 }
        );
        assert!(Parser::new("((a))", 2, usize::MAX, usize::MAX).parse().is_ok());

        let deep = format!("{}a{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(
            parse(&deep).unwrap_err(),
            Error::NestLimitExceeded {
                limit: 250,
                pos: 250
            }
        );
    }

    #[test]
    fn test_state_limit() {
        let err = Parser::new("a{1000}", 250, 100, usize::MAX).parse().unwrap_err();
        assert_eq!(err, Error::StateLimitExceeded { limit: 100 });
    }

    #[test]
    fn test_edge_limit() {
        // Two states per copy, but tens of thousands of edges.
        let err = Parser::new("[ -\u{FFFF}]{60}", 250, 10_000, 100_000)
            .parse()
            .unwrap_err();
        assert_eq!(err, Error::EdgeLimitExceeded { limit: 100_000 });

        let err = Parser::new(r"\w{100}", 250, usize::MAX, 1_000).parse().unwrap_err();
        assert_eq!(err, Error::EdgeLimitExceeded { limit: 1_000 });
        assert!(Parser::new(r"\w{10}", 250, usize::MAX, 1_000).parse().is_ok());
    }
}
