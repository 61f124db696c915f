use serde::Serialize;
use unicode_width::UnicodeWidthChar;

/// Half-open byte range into the sentence under translation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset + 1,
        }
    }

    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Display width of the text preceding `offset`, so that carets line up even
/// when the sentence holds wide characters.
pub fn display_column(line: &str, offset: usize) -> usize {
    line[..offset.min(line.len())]
        .chars()
        .map(|chr| UnicodeWidthChar::width(chr).unwrap_or(0))
        .sum()
}
