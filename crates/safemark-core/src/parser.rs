//! Recursive block assembler.
//!
//! Lines are grouped into paragraphs, preformatted blocks, lists and
//! quotes. Blocks are ranges of line indices into one shared span table;
//! quote and list bodies are rendered by recursing over their range, with a
//! per-line cursor recording how much marker text outer levels stripped.

use log::{debug, trace, warn};

use crate::classify::{classify, LineKind};
use crate::error::{ConvertError, Result};
use crate::escape::escape_text;
use crate::inline::render_spans;
use crate::lexer::split_lines;
use crate::link::LinkFilter;
use crate::span::LineSpan;

/// Default limit on quote, list, emphasis and link nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Converter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Deepest nesting accepted before failing with
    /// [`ConvertError::TooComplex`].
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

type BoxedFilter = Box<dyn LinkFilter + Send + Sync>;

/// Per-call conversion state shared by the block, inline and link stages.
pub(crate) struct Ctx<'c> {
    filter: Option<&'c (dyn LinkFilter + Send + Sync)>,
    depth: usize,
    max_depth: usize,
}

impl<'c> Ctx<'c> {
    fn new(filter: Option<&'c (dyn LinkFilter + Send + Sync)>, max_depth: usize) -> Self {
        Self {
            filter,
            depth: 0,
            max_depth,
        }
    }

    pub(crate) fn filter(&self) -> Option<&'c (dyn LinkFilter + Send + Sync)> {
        self.filter
    }

    /// Run `f` one nesting level deeper, failing once the limit is reached.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            warn!("nesting limit of {} reached", self.max_depth);
            return Err(ConvertError::too_complex(self.max_depth));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// SafeMark to HTML converter with an optional link filter.
///
/// The converter is immutable once built, so one instance can serve any
/// number of conversions.
///
/// # Example
///
/// ```rust
/// use safemark_core::{Converter, FilterResult};
///
/// let converter = Converter::new().with_link_filter(|_: &safemark_core::Link| FilterResult::Accept);
/// let html = converter.convert("see http://example.com").unwrap();
/// assert_eq!(
///     html,
///     "<p>see <a href=\"http://example.com\">http://example.com</a></p>"
/// );
/// ```
#[derive(Default)]
pub struct Converter {
    options: Options,
    filter: Option<BoxedFilter>,
}

impl Converter {
    /// Create a converter with default options and no link filter.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the options.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Install the filter deciding which links become anchors.
    pub fn with_link_filter<F>(mut self, filter: F) -> Self
    where
        F: LinkFilter + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Get the options in effect.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Check whether a link filter is installed.
    pub fn has_link_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Convert `source` into an HTML fragment.
    pub fn convert(&self, source: &str) -> Result<String> {
        let lines = split_lines(source);
        debug!("converting {} bytes in {} lines", source.len(), lines.len());

        let mut assembler = Assembler::new(source, lines);
        let mut ctx = Ctx::new(self.filter.as_deref(), self.options.max_depth);
        let mut out = String::with_capacity(source.len() + source.len() / 4);
        let line_count = assembler.lines.len();
        assembler.render_range(&mut ctx, 0, line_count, &mut out)?;
        Ok(out)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

/// Convert `source` with default options and no link filter.
pub fn convert(source: &str) -> Result<String> {
    Converter::new().convert(source)
}

/// The block being accumulated at one nesting level.
enum Open {
    None,
    Preformatted(String),
    Paragraph(String),
    /// List whose current item starts at the given line.
    List(usize),
    /// Quote starting at the given line.
    Quote(usize),
}

impl Open {
    fn name(&self) -> &'static str {
        match self {
            Open::None => "none",
            Open::Preformatted(_) => "preformatted",
            Open::Paragraph(_) => "paragraph",
            Open::List(_) => "list",
            Open::Quote(_) => "quote",
        }
    }
}

struct Assembler<'a> {
    text: &'a str,
    lines: Vec<LineSpan>,
    /// Bytes of each line already consumed by enclosing markers.
    cursors: Vec<u32>,
}

impl<'a> Assembler<'a> {
    fn new(text: &'a str, lines: Vec<LineSpan>) -> Self {
        let cursors = vec![0; lines.len()];
        Self {
            text,
            lines,
            cursors,
        }
    }

    #[inline]
    fn line(&self, idx: usize) -> &'a str {
        self.lines[idx].slice(self.text)
    }

    /// Text of line `idx` past its cursor, without a trailing CR.
    #[inline]
    fn rest(&self, idx: usize) -> &'a str {
        let line = self.line(idx);
        let rest = &line[self.cursors[idx] as usize..];
        rest.strip_suffix('\r').unwrap_or(rest)
    }

    /// Classify line `idx` at its cursor without consuming anything.
    #[inline]
    fn peek_kind(&self, idx: usize) -> LineKind {
        classify(self.line(idx), self.cursors[idx] as usize).kind
    }

    /// Classify line `idx` and move its cursor past the marker.
    fn consume(&mut self, idx: usize) -> LineKind {
        let classified = classify(self.line(idx), self.cursors[idx] as usize);
        self.cursors[idx] += classified.consumed as u32;
        trace!("line {} classified as {:?}", idx, classified.kind);
        classified.kind
    }

    /// Render lines `start..end` into `out`.
    fn render_range(
        &mut self,
        ctx: &mut Ctx<'_>,
        start: usize,
        end: usize,
        out: &mut String,
    ) -> Result<()> {
        let mut open = Open::None;
        let mut blank_run = 0usize;

        for idx in start..=end {
            let kind = if idx == end {
                None
            } else {
                Some(self.consume(idx))
            };

            if kind == Some(LineKind::Empty) {
                blank_run += 1;
                continue;
            }

            let continues = match (&open, kind) {
                (Open::Preformatted(_), Some(LineKind::Indent)) => true,
                (Open::Paragraph(_), Some(LineKind::Paragraph)) => blank_run == 0,
                (Open::Quote(_), Some(LineKind::Quote)) => true,
                (Open::Quote(_), Some(LineKind::Paragraph)) => blank_run == 0,
                (Open::List(_), Some(LineKind::Paragraph)) => blank_run == 0,
                (Open::List(_), Some(LineKind::List)) => true,
                _ => false,
            };

            if continues {
                match &mut open {
                    Open::Preformatted(code) => {
                        for _ in 0..blank_run {
                            code.push('\n');
                        }
                        code.push_str(self.rest(idx));
                        code.push('\n');
                    }
                    Open::Paragraph(para) => {
                        para.push(' ');
                        para.push_str(self.rest(idx));
                    }
                    _ => {}
                }
                if let Open::List(item_start) = open {
                    if kind == Some(LineKind::List) {
                        self.render_item(ctx, item_start, idx, out)?;
                        open = Open::List(idx);
                    }
                }
                blank_run = 0;
                continue;
            }

            let flushed = !matches!(open, Open::None);
            let previous = std::mem::replace(&mut open, Open::None);
            self.flush(ctx, previous, idx, out)?;

            let Some(kind) = kind else {
                break;
            };

            if flushed && blank_run > 1 {
                for _ in 1..blank_run {
                    out.push_str("<br>");
                }
            }
            blank_run = 0;

            open = match kind {
                LineKind::Indent => {
                    let mut code = self.rest(idx).to_string();
                    code.push('\n');
                    Open::Preformatted(code)
                }
                LineKind::Paragraph => Open::Paragraph(self.rest(idx).to_string()),
                LineKind::Quote => Open::Quote(idx),
                LineKind::List => {
                    out.push_str("<ul>");
                    Open::List(idx)
                }
                LineKind::Empty => Open::None,
            };
        }

        Ok(())
    }

    /// Write out the block `open`, which ends just before line `end`.
    fn flush(&mut self, ctx: &mut Ctx<'_>, open: Open, end: usize, out: &mut String) -> Result<()> {
        if !matches!(open, Open::None) {
            debug!("closing {} block before line {}", open.name(), end);
        }

        match open {
            Open::None => {}
            Open::Preformatted(code) => {
                out.push_str("<pre><code>");
                escape_text(out, &code);
                out.push_str("</code></pre>");
            }
            Open::Paragraph(para) => {
                out.push_str("<p>");
                render_spans(ctx, para.trim_matches([' ', '\t']), false, out)?;
                out.push_str("</p>");
            }
            Open::List(item_start) => {
                self.render_item(ctx, item_start, end, out)?;
                out.push_str("</ul>");
            }
            Open::Quote(start) => {
                out.push_str("<blockquote>");
                ctx.nested(|ctx| self.render_range(ctx, start, end, out))?;
                out.push_str("</blockquote>");
            }
        }

        Ok(())
    }

    /// Render the list item on lines `start..end`.
    ///
    /// An item made only of text lines is written inline; anything else is
    /// rendered as nested blocks.
    fn render_item(
        &mut self,
        ctx: &mut Ctx<'_>,
        start: usize,
        end: usize,
        out: &mut String,
    ) -> Result<()> {
        let mut last = end;
        while last > start && self.peek_kind(last - 1) == LineKind::Empty {
            last -= 1;
        }
        let tight = (start..last).all(|idx| self.peek_kind(idx) == LineKind::Paragraph);

        out.push_str("<li>");
        if tight {
            let text = (start..last)
                .map(|idx| self.rest(idx))
                .collect::<Vec<_>>()
                .join(" ");
            ctx.nested(|ctx| render_spans(ctx, text.trim_matches([' ', '\t']), false, out))?;
        } else {
            ctx.nested(|ctx| self.render_range(ctx, start, end, out))?;
        }
        out.push_str("</li>");
        Ok(())
    }
}
