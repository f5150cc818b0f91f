use std::fmt;
use std::ops::Range;

use crate::error::NoSuchGroup;

/// A single match of a [`Regex`](crate::Regex) in a haystack.
///
/// Offsets are byte offsets into the haystack and always fall on character
/// boundaries.  Group 0 is the whole match.  Parentheses only group; they
/// record no captures, so every match has zero capture groups and asking
/// for group 1 or above is an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match<'h> {
    haystack: &'h str,
    start: usize,
    end: usize,
    /// Spans of capture groups 1.., owned by this match alone.
    groups: Vec<(usize, usize)>,
}

impl<'h> Match<'h> {
    pub(crate) fn new(haystack: &'h str, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= haystack.len());
        Self {
            haystack,
            start,
            end,
            groups: Vec::new(),
        }
    }

    /// The matched text.
    #[inline]
    pub fn as_str(&self) -> &'h str {
        &self.haystack[self.start..self.end]
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length of the match in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// `true` for a zero-width match.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The text of group `index`.  Group 0 is the whole match.
    pub fn group(&self, index: usize) -> Result<&'h str, NoSuchGroup> {
        let (start, end) = self.span_of(index)?;
        Ok(&self.haystack[start..end])
    }

    /// The `(start, end)` span of group `index`.
    pub fn span_of(&self, index: usize) -> Result<(usize, usize), NoSuchGroup> {
        match index {
            0 => Ok(self.span()),
            n => self.groups.get(n - 1).copied().ok_or(NoSuchGroup {
                index,
                count: self.group_count(),
            }),
        }
    }

    pub fn start_of(&self, index: usize) -> Result<usize, NoSuchGroup> {
        self.span_of(index).map(|(start, _)| start)
    }

    pub fn end_of(&self, index: usize) -> Result<usize, NoSuchGroup> {
        self.span_of(index).map(|(_, end)| end)
    }

    /// The `(start, end)` span of the whole match.
    #[inline]
    pub fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Texts of capture groups 1 and up, in order.  Always empty.
    pub fn groups(&self) -> Vec<&'h str> {
        self.groups
            .iter()
            .map(|&(start, end)| &self.haystack[start..end])
            .collect()
    }

    /// Number of capture groups, not counting group 0.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl fmt::Display for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Match span=({}, {}), match={:?}>",
            self.start,
            self.end,
            self.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let m = Match::new("xxabcyy", 2, 5);
        assert_eq!(m.as_str(), "abc");
        assert_eq!(m.start(), 2);
        assert_eq!(m.end(), 5);
        assert_eq!(m.range(), 2..5);
        assert_eq!(m.span(), (2, 5));
        assert_eq!(m.len(), 3);
        assert!(!m.is_empty());
    }

    #[test]
    fn test_group_zero_is_whole_match() {
        let m = Match::new("abc", 0, 3);
        assert_eq!(m.group(0), Ok("abc"));
        assert_eq!(m.start_of(0), Ok(0));
        assert_eq!(m.end_of(0), Ok(3));
        assert_eq!(m.span_of(0), Ok((0, 3)));
    }

    #[test]
    fn test_no_capture_groups() {
        let m = Match::new("abc", 0, 3);
        assert_eq!(m.group_count(), 0);
        assert!(m.groups().is_empty());
        let err = NoSuchGroup { index: 1, count: 0 };
        assert_eq!(m.group(1), Err(err));
        assert_eq!(m.start_of(1), Err(err));
        assert_eq!(m.end_of(1), Err(err));
    }

    #[test]
    fn test_empty_match() {
        let m = Match::new("ab", 2, 2);
        assert!(m.is_empty());
        assert_eq!(m.as_str(), "");
        assert_eq!(m.to_string(), r#"<Match span=(2, 2), match="">"#);
    }

    #[test]
    fn test_display() {
        let m = Match::new("abcdef", 0, 3);
        assert_eq!(m.to_string(), r#"<Match span=(0, 3), match="abc">"#);

        let m = Match::new("a\"b\n", 0, 4);
        assert_eq!(m.to_string(), r#"<Match span=(0, 4), match="a\"b\n">"#);
    }

    #[test]
    fn test_matches_do_not_share_groups() {
        let a = Match::new("abab", 0, 2);
        let b = Match::new("abab", 2, 4);
        assert_ne!(a, b);
        assert_eq!(a.groups(), b.groups());
    }
}
