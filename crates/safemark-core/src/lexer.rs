//! Line scanner with SIMD-accelerated newline search.
//!
//! The scanner cuts the input into [`LineSpan`]s for the block assembler.
//! Only line feeds split lines; a carriage return stays inside its span and
//! is dealt with by the classifier.
//!
//! # Performance
//!
//! - Zero-copy: spans are offsets into the input
//! - SIMD-accelerated newline scanning via `memchr`

use crate::span::LineSpan;
use memchr::memchr;

/// Iterator over the line spans of an input buffer.
///
/// Every input yields at least one span. Text ending in a line feed yields a
/// trailing empty span, so the spans always account for the whole buffer.
pub struct LineScanner<'a> {
    /// Input as bytes for efficient scanning.
    bytes: &'a [u8],
    /// Current byte offset.
    offset: usize,
    /// Set once the final (unterminated) line has been produced.
    done: bool,
}

impl<'a> LineScanner<'a> {
    /// Create a new scanner for the given input.
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            offset: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for LineScanner<'a> {
    type Item = LineSpan;

    #[inline]
    fn next(&mut self) -> Option<LineSpan> {
        if self.done {
            return None;
        }

        let start = self.offset;
        match memchr(b'\n', &self.bytes[start..]) {
            Some(pos) => {
                let end = start + pos;
                self.offset = end + 1;
                Some(LineSpan::new(start as u32, end as u32))
            }
            None => {
                self.done = true;
                self.offset = self.bytes.len();
                Some(LineSpan::new(start as u32, self.bytes.len() as u32))
            }
        }
    }
}

/// Split `text` into its line spans.
#[inline]
pub fn split_lines(text: &str) -> Vec<LineSpan> {
    let mut lines = Vec::with_capacity(memchr::memchr_iter(b'\n', text.as_bytes()).count() + 1);
    lines.extend(LineScanner::new(text));
    lines
}
