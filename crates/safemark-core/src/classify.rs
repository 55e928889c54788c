//! Line classification.
//!
//! The classifier looks at one line from a cursor position and reports the
//! role the line plays at that nesting level, together with the number of
//! marker bytes it consumed. It keeps no state: the block assembler calls it
//! again on the same line, from a later cursor, once an outer quote or list
//! marker has been stripped.

/// Structural role of a line at a given cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Nothing but an optional line terminator remains.
    Empty,
    /// Tab or four spaces: preformatted text.
    Indent,
    /// Ordinary text.
    Paragraph,
    /// `*`, `-` or `+` followed by a space or tab.
    List,
    /// `>` with an optional following space or tab.
    Quote,
}

/// Result of classifying a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub kind: LineKind,
    /// Bytes of marker (and leading whitespace) to skip past.
    pub consumed: usize,
}

impl Classified {
    #[inline(always)]
    const fn new(kind: LineKind, consumed: usize) -> Self {
        Self { kind, consumed }
    }
}

#[inline(always)]
fn is_separator(b: Option<&u8>) -> bool {
    matches!(b, Some(b' ') | Some(b'\t'))
}

/// Classify `line` starting at byte `pos`.
///
/// `consumed` is relative to `pos`. Paragraph lines consume their leading
/// spaces, so folded lines join with a single space.
pub fn classify(line: &str, pos: usize) -> Classified {
    let bytes = line.as_bytes();
    let mut i = pos;
    let mut spaces = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\t' => return Classified::new(LineKind::Indent, i + 1 - pos),
            b' ' => {
                spaces += 1;
                i += 1;
                if spaces == 4 {
                    return Classified::new(LineKind::Indent, i - pos);
                }
            }
            b'>' => {
                let end = if is_separator(bytes.get(i + 1)) { i + 2 } else { i + 1 };
                return Classified::new(LineKind::Quote, end - pos);
            }
            b'*' | b'-' | b'+' if is_separator(bytes.get(i + 1)) => {
                return Classified::new(LineKind::List, i + 2 - pos);
            }
            b'\r' | b'\n' => return Classified::new(LineKind::Empty, 0),
            _ => return Classified::new(LineKind::Paragraph, i - pos),
        }
    }

    Classified::new(LineKind::Empty, 0)
}
