//! Byte ranges of source lines.
//!
//! Blocks never copy source text. They refer to lines by index, and every
//! line is a `LineSpan` into the one input buffer.

/// A line's byte range in the source text, excluding its line feed.
///
/// Both `start` and `end` are inclusive-exclusive: `[start, end)`.
///
/// # Example
///
/// ```rust
/// use safemark_core::span::LineSpan;
///
/// let span = LineSpan::new(4, 10);
/// assert_eq!(span.len(), 6);
/// assert_eq!(span.slice("one\nsecond\n"), "second");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSpan {
    /// Starting byte offset (inclusive).
    pub start: u32,
    /// Ending byte offset (exclusive).
    pub end: u32,
}

impl LineSpan {
    /// Create a new span from byte offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Get the length of this span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if this span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Borrow the spanned text from the buffer it was produced from.
    #[inline]
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start as usize..self.end as usize]
    }
}
