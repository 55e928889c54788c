//! Inline span renderer.
//!
//! Uses SIMD-accelerated scanning to jump between trigger characters and
//! writes HTML straight into the output buffer. Plain runs between triggers
//! are copied in one piece. Emphasis and link bodies are rendered by a
//! nested renderer over the matched slice.
//!
//! Trigger lookup, bracket pairing and link target scans are cached per
//! renderer, so unmatched brackets and parens do not rescan the rest of the
//! text.

use memchr::{memchr2, memchr3};

use crate::error::Result;
use crate::escape::entity_len;
use crate::link::{resolve, Link};
use crate::parser::Ctx;

const AUTOLINK_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Render the inline content of `text` into `out`.
///
/// With `in_link` set, links and autolinks are not recognized; it is used
/// for the body of a link that has already been resolved.
pub(crate) fn render_spans(
    ctx: &mut Ctx<'_>,
    text: &str,
    in_link: bool,
    out: &mut String,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }

    InlineRenderer::new(text, in_link).render(ctx, out)
}

#[inline(always)]
fn is_escapable(b: Option<&u8>) -> bool {
    matches!(b, Some(b'\\') | Some(b'*') | Some(b'['))
}

/// Find where an emphasis span opened before `start` closes.
///
/// In `double` mode the span closes at the first doubled marker that is not
/// needed to pair up a single marker seen earlier in the content. In single
/// mode doubled markers inside the content are skipped as nested pairs and
/// the span closes at the first lone marker. Content is never empty, and
/// escaped characters never close a span.
fn find_close(bytes: &[u8], start: usize, marker: u8, double: bool) -> Option<usize> {
    if !double && bytes.get(start) == Some(&marker) {
        return None;
    }

    let mut pending = false;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && is_escapable(bytes.get(i + 1)) {
            i += 2;
            continue;
        }
        if b != marker {
            i += 1;
            continue;
        }

        let doubled = bytes.get(i + 1) == Some(&marker);
        match (double, doubled) {
            (true, true) if !pending => return (i > start).then_some(i),
            // One marker of the pair closes the pending single.
            (true, true) => {
                pending = false;
                i += 1;
            }
            (true, false) => {
                pending = !pending;
                i += 1;
            }
            (false, true) => i += 2,
            (false, false) => return Some(i),
        }
    }

    None
}

/// Byte offset of the first whitespace at or after `from`.
fn run_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .map_or(bytes.len(), |offset| from + offset)
}

#[inline]
fn skip_blanks(bytes: &[u8], mut i: usize) -> usize {
    while matches!(bytes.get(i), Some(b' ') | Some(b'\t')) {
        i += 1;
    }
    i
}

/// Pair every `[` with the offset just past its matching `]`, allowing
/// nested brackets in between. Escaped brackets are skipped and unmatched
/// openers are left out. Sorted by opener.
fn bracket_pairs(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut open = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if is_escapable(bytes.get(i + 1)) => i += 1,
            b'[' => open.push(i),
            b']' => {
                if let Some(start) = open.pop() {
                    pairs.push((start, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    pairs.sort_unstable();
    pairs
}

/// The last forward search for one class of bytes.
///
/// Search offsets only grow during a render, so a search starting inside the
/// stretch already covered reuses its answer and no byte is scanned twice.
#[derive(Debug, Clone, Copy, Default)]
struct ScanMemo {
    from: usize,
    hit: Option<usize>,
    valid: bool,
}

impl ScanMemo {
    fn find(&mut self, bytes: &[u8], from: usize, stop: impl Fn(u8) -> bool) -> Option<usize> {
        if self.valid && from >= self.from && from <= self.hit.unwrap_or(bytes.len()) {
            return self.hit;
        }
        let hit = bytes[from..]
            .iter()
            .position(|&b| stop(b))
            .map(|offset| from + offset);
        *self = ScanMemo {
            from,
            hit,
            valid: true,
        };
        hit
    }
}

struct InlineRenderer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Start of the plain run not yet copied to the output.
    text_start: usize,
    in_link: bool,
    /// Next hit of each trigger group, or the text length when none is left.
    next_hits: [Option<usize>; 3],
    /// Bracket pairs, computed on the first `[`.
    brackets: Option<Vec<(usize, usize)>>,
    url_stop: ScanMemo,
    title_quote: ScanMemo,
    /// Outcome of the last title and paren parse, keyed by URL end.
    last_tail: Option<(usize, Option<usize>)>,
}

impl<'a> InlineRenderer<'a> {
    #[inline]
    fn new(text: &'a str, in_link: bool) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            text_start: 0,
            in_link,
            next_hits: [None; 3],
            brackets: None,
            url_stop: ScanMemo::default(),
            title_quote: ScanMemo::default(),
            last_tail: None,
        }
    }

    fn render(&mut self, ctx: &mut Ctx<'_>, out: &mut String) -> Result<()> {
        while self.pos < self.bytes.len() {
            let next_special = self.find_next_special();

            if next_special >= self.bytes.len() {
                break;
            }

            self.pos = next_special;
            let handled = match self.bytes[self.pos] {
                b'\\' => self.try_escape(out),
                b'*' | b'_' => self.try_emphasis(ctx, out)?,
                b'[' if !self.in_link => self.try_link(ctx, out)?,
                b'<' => self.replace(out, "&lt;"),
                b'>' => self.replace(out, "&gt;"),
                b'&' => self.ampersand(out),
                b':' if !self.in_link => self.try_autolink(ctx, out)?,
                _ => false,
            };

            if !handled {
                self.pos += 1;
            }
        }

        out.push_str(&self.text[self.text_start..]);
        Ok(())
    }

    #[inline(always)]
    fn find_next_special(&mut self) -> usize {
        let bytes = self.bytes;
        let pos = self.pos;
        let remaining = &bytes[pos..];

        // memchr only searches for up to three bytes at a time, so the
        // triggers are split into groups and the nearest hit wins. A group's
        // hit stays valid until the scan moves past it.
        for (group, hit) in self.next_hits.iter_mut().enumerate() {
            if hit.map_or(true, |at| at < pos) {
                let found = match group {
                    0 => memchr3(b'*', b'_', b'\\', remaining),
                    1 => memchr3(b'[', b'<', b'>', remaining),
                    _ => memchr2(b'&', b':', remaining),
                };
                *hit = Some(found.map_or(bytes.len(), |offset| pos + offset));
            }
        }

        self.next_hits
            .iter()
            .flatten()
            .copied()
            .min()
            .unwrap_or(bytes.len())
    }

    /// Offset just past the `]` matching the `[` at `open`.
    fn bracket_close(&mut self, open: usize) -> Option<usize> {
        let bytes = self.bytes;
        let pairs = self.brackets.get_or_insert_with(|| bracket_pairs(bytes));
        pairs
            .binary_search_by_key(&open, |&(start, _)| start)
            .ok()
            .map(|idx| pairs[idx].1)
    }

    /// Copy the pending plain run up to the current position.
    #[inline(always)]
    fn flush_text(&mut self, out: &mut String, upto: usize) {
        if self.text_start < upto {
            out.push_str(&self.text[self.text_start..upto]);
        }
    }

    #[inline(always)]
    fn resume_at(&mut self, pos: usize) {
        self.pos = pos;
        self.text_start = pos;
    }

    fn replace(&mut self, out: &mut String, entity: &str) -> bool {
        self.flush_text(out, self.pos);
        out.push_str(entity);
        self.resume_at(self.pos + 1);
        true
    }

    fn ampersand(&mut self, out: &mut String) -> bool {
        match entity_len(self.bytes, self.pos) {
            // Valid references stay part of the plain run.
            Some(len) => {
                self.pos += len;
                true
            }
            None => self.replace(out, "&amp;"),
        }
    }

    fn try_escape(&mut self, out: &mut String) -> bool {
        if !is_escapable(self.bytes.get(self.pos + 1)) {
            return false;
        }
        self.flush_text(out, self.pos);
        self.resume_at(self.pos + 1);
        // The escaped byte starts the next plain run; skip past it so it
        // is not treated as a trigger.
        self.pos += 1;
        true
    }

    fn try_emphasis(&mut self, ctx: &mut Ctx<'_>, out: &mut String) -> Result<bool> {
        let start = self.pos;
        let marker = self.bytes[start];

        if self.bytes.get(start + 1) == Some(&marker) {
            if let Some(close) = find_close(self.bytes, start + 2, marker, true) {
                self.emit_span(ctx, out, "strong", start + 2, close)?;
                self.resume_at(close + 2);
                return Ok(true);
            }
        }

        if let Some(close) = find_close(self.bytes, start + 1, marker, false) {
            self.emit_span(ctx, out, "em", start + 1, close)?;
            self.resume_at(close + 1);
            return Ok(true);
        }

        Ok(false)
    }

    fn emit_span(
        &mut self,
        ctx: &mut Ctx<'_>,
        out: &mut String,
        tag: &str,
        content_start: usize,
        content_end: usize,
    ) -> Result<()> {
        let marker_len = if tag == "strong" { 2 } else { 1 };
        self.flush_text(out, content_start - marker_len);

        out.push('<');
        out.push_str(tag);
        out.push('>');
        let content = &self.text[content_start..content_end];
        let in_link = self.in_link;
        ctx.nested(|ctx| render_spans(ctx, content, in_link, out))?;
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        Ok(())
    }

    /// `[label](url "title")` or `[label][refid]`.
    fn try_link(&mut self, ctx: &mut Ctx<'_>, out: &mut String) -> Result<bool> {
        let start = self.pos;
        let Some(label_end) = self.bracket_close(start) else {
            return Ok(false);
        };
        let text = self.text;
        let bytes = self.bytes;
        let label = &text[start + 1..label_end - 1];

        let (link, end) = match bytes.get(label_end) {
            Some(b'(') => match self.inline_target(label_end + 1) {
                Some((url, end)) => (
                    Link {
                        url: Some(url.to_string()),
                        text: label.to_string(),
                        ..Link::default()
                    },
                    end,
                ),
                None => return Ok(false),
            },
            Some(b'[') => {
                let refid = &bytes[label_end + 1..];
                match memchr2(b'[', b']', refid) {
                    Some(offset) if refid[offset] == b']' => {
                        (Link::inert(label), label_end + offset + 2)
                    }
                    _ => return Ok(false),
                }
            }
            _ => return Ok(false),
        };

        self.flush_text(out, start);
        resolve(ctx, link, out)?;
        self.resume_at(end);
        Ok(true)
    }

    /// Parse `url "title")` starting just past the `(`.
    ///
    /// Returns the URL and the offset past the closing paren. The title is
    /// recognized so that it is consumed, but it is not kept: only a filter
    /// may give a link a title.
    fn inline_target(&mut self, from: usize) -> Option<(&'a str, usize)> {
        let bytes = self.bytes;
        let url_start = skip_blanks(bytes, from);
        let url_end = self
            .url_stop
            .find(bytes, url_start, |b| {
                b.is_ascii_whitespace() || b == b')' || b == b'"'
            })
            .unwrap_or(bytes.len());
        if url_end == url_start {
            return None;
        }

        let end = match self.last_tail {
            Some((cached, end)) if cached == url_end => end,
            _ => {
                let end = self.target_tail(url_end);
                self.last_tail = Some((url_end, end));
                end
            }
        };
        let text = self.text;
        end.map(|end| (&text[url_start..url_end], end))
    }

    /// Parse the optional title and the closing paren after a URL.
    fn target_tail(&mut self, url_end: usize) -> Option<usize> {
        let bytes = self.bytes;
        let mut i = skip_blanks(bytes, url_end);
        if bytes.get(i) == Some(&b'"') {
            let close = self.title_quote.find(bytes, i + 1, |b| b == b'"')?;
            i = skip_blanks(bytes, close + 1);
        }
        (bytes.get(i) == Some(&b')')).then_some(i + 1)
    }

    /// Recognize `scheme:rest` where the scheme ends at the current colon.
    fn try_autolink(&mut self, ctx: &mut Ctx<'_>, out: &mut String) -> Result<bool> {
        let colon = self.pos;
        let scheme_start = self.bytes[self.text_start..colon]
            .iter()
            .rposition(|b| !b.is_ascii_alphabetic())
            .map_or(self.text_start, |offset| self.text_start + offset + 1);

        if scheme_start > 0 && self.bytes[scheme_start - 1].is_ascii_alphanumeric() {
            return Ok(false);
        }
        let scheme = &self.text[scheme_start..colon];
        if !AUTOLINK_SCHEMES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
        {
            return Ok(false);
        }

        let mut end = run_end(self.bytes, colon + 1);
        if self.bytes[end - 1] == b'.' {
            end -= 1;
        }
        if end <= colon + 1 {
            return Ok(false);
        }

        self.flush_text(out, scheme_start);
        let link = Link {
            url: Some(self.text[scheme_start..end].to_string()),
            ..Link::default()
        };
        resolve(ctx, link, out)?;
        self.resume_at(end);
        Ok(true)
    }
}
