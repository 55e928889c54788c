//! HTML escaping that leaves existing entity references alone.
//!
//! `<` and `>` always become `&lt;` and `&gt;`. An `&` becomes `&amp;`
//! unless it starts a well-formed entity reference, so escaping text twice
//! gives the same result as escaping it once.

use memchr::memchr3;

/// Longest named entity accepted, not counting `&` and `;`.
const MAX_NAME_LEN: usize = 32;

/// Length in bytes of the entity reference starting at `bytes[pos]`, if any.
///
/// Accepts `&name;`, `&#digits;` and `&#xhex;` (case-insensitive `x`). The
/// check is syntactic only: `&bogus;` is accepted, `& ;` and `&#x;` are not.
pub fn entity_len(bytes: &[u8], pos: usize) -> Option<usize> {
    if bytes.get(pos) != Some(&b'&') {
        return None;
    }
    let rest = &bytes[pos + 1..];

    let (body_start, max, accept): (usize, usize, fn(u8) -> bool) = match rest.first() {
        Some(b'#') => match rest.get(1) {
            Some(b'x') | Some(b'X') => (2, 6, |b| b.is_ascii_hexdigit()),
            _ => (1, 7, |b| b.is_ascii_digit()),
        },
        Some(b) if b.is_ascii_alphabetic() => (0, MAX_NAME_LEN, |b| b.is_ascii_alphanumeric()),
        _ => return None,
    };

    let body = rest[body_start..]
        .iter()
        .take(max + 1)
        .take_while(|&&b| accept(b))
        .count();
    if body == 0 || body > max {
        return None;
    }

    let semi = body_start + body;
    (rest.get(semi) == Some(&b';')).then_some(semi + 2)
}

/// Append `text` to `out`, escaping `<`, `>` and stray `&`.
pub fn escape_text(out: &mut String, text: &str) {
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut pos = 0;

    while let Some(offset) = memchr3(b'<', b'>', b'&', &bytes[pos..]) {
        pos += offset;
        let replacement = match bytes[pos] {
            b'<' => "&lt;",
            b'>' => "&gt;",
            _ => match entity_len(bytes, pos) {
                Some(len) => {
                    pos += len;
                    continue;
                }
                None => "&amp;",
            },
        };
        out.push_str(&text[start..pos]);
        out.push_str(replacement);
        pos += 1;
        start = pos;
    }

    out.push_str(&text[start..]);
}

/// Append `text` to `out` for use inside a double-quoted attribute value.
pub fn escape_attr(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(quote) = rest.find('"') {
        escape_text(out, &rest[..quote]);
        out.push_str("&quot;");
        rest = &rest[quote + 1..];
    }
    escape_text(out, rest);
}

/// Escape `text` into a new string.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    escape_text(&mut out, text);
    out
}
