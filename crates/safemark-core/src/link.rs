//! Link descriptors, the link filter hook, and URL mangling.
//!
//! Every link found in the input, explicit or automatic, ends up here. A link
//! only becomes a clickable anchor when the configured [`LinkFilter`] accepts
//! it. Without a filter, or when the filter says no, the URL is mangled into
//! text a person can still read but a browser will not follow.

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, warn};

use crate::error::Result;
use crate::escape::{escape_attr, escape_html};
use crate::inline::render_spans;
use crate::parser::Ctx;

/// A link as seen by the filter and the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Link {
    /// Target URL, entity-escaped. `None` renders the text without an anchor.
    /// A URL set by a filter is escaped and validated again before use.
    pub url: Option<String>,
    /// Markup source of the link body.
    pub text: String,
    /// Value for the `title` attribute.
    pub title: Option<String>,
    /// Value for the `onclick` attribute.
    pub click: Option<String>,
}

impl Link {
    /// Build a descriptor whose text is its (escaped) URL.
    pub fn from_url(url: &str) -> Self {
        let url = escape_html(url);
        Self {
            text: url.clone(),
            url: Some(url),
            title: None,
            click: None,
        }
    }

    /// Build a descriptor with no target.
    pub fn inert(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// A single field override in a [`LinkPatch`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch {
    /// Leave the field as it is.
    #[default]
    Keep,
    /// Clear the field.
    Null,
    /// Replace the field.
    Value(String),
}

impl Patch {
    fn apply(self, field: &mut Option<String>) {
        match self {
            Patch::Keep => {}
            Patch::Null => *field = None,
            Patch::Value(value) => *field = Some(value),
        }
    }
}

/// Field overrides returned by a filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkPatch {
    pub url: Patch,
    pub text: Patch,
    pub title: Patch,
    pub click: Patch,
}

impl LinkPatch {
    /// Apply the overrides to `link`. A cleared text becomes empty.
    pub fn apply(self, mut link: Link) -> Link {
        self.url.apply(&mut link.url);
        self.title.apply(&mut link.title);
        self.click.apply(&mut link.click);
        match self.text {
            Patch::Keep => {}
            Patch::Null => link.text.clear(),
            Patch::Value(text) => link.text = text,
        }
        link
    }
}

/// What a [`LinkFilter`] decided about a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterResult {
    /// Render the link as it is.
    Accept,
    /// Mangle the link.
    Reject,
    /// Render the link with these fields changed.
    Replace(LinkPatch),
}

/// Decides which links become anchors.
///
/// The filter sees each link with `text` equal to its URL, so the decision
/// is made on the destination rather than the label. A filter that panics
/// counts as a rejection.
pub trait LinkFilter {
    fn filter(&self, link: &Link) -> FilterResult;
}

impl<F> LinkFilter for F
where
    F: Fn(&Link) -> FilterResult,
{
    fn filter(&self, link: &Link) -> FilterResult {
        self(link)
    }
}

/// Defang `url`: the two characters after the first become `xx` and every
/// colon becomes a space, so `http://host` reads `hxxp //host`.
pub fn mangle_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for (i, c) in url.chars().enumerate() {
        match (i, c) {
            (1 | 2, _) => out.push('x'),
            (_, ':') => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Whether an escaped URL may be used as a link target at all.
fn is_valid_url(url: &str) -> bool {
    !url.is_empty() && !url.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn mangled(link: Link) -> Link {
    let text = link.url.as_deref().map(mangle_url).unwrap_or_default();
    Link {
        url: None,
        text,
        title: None,
        click: None,
    }
}

/// Escape and validate a URL a filter put in place. An unusable replacement
/// is mangled like a rejected link.
fn checked(mut link: Link) -> Link {
    let Some(url) = link.url.take() else {
        return link;
    };
    let url = escape_html(&url);
    if is_valid_url(&url) {
        link.url = Some(url);
        link
    } else {
        debug!("mangling malformed replacement url {:?}", url);
        mangled(Link {
            url: Some(url),
            ..link
        })
    }
}

fn run_filter(ctx: &Ctx<'_>, link: &Link) -> FilterResult {
    let Some(filter) = ctx.filter() else {
        return FilterResult::Reject;
    };
    catch_unwind(AssertUnwindSafe(|| filter.filter(link))).unwrap_or_else(|_| {
        warn!("link filter panicked, rejecting link");
        FilterResult::Reject
    })
}

/// Filter `link` and render it into `out`.
///
/// Links without a URL skip the filter and render as plain content.
pub(crate) fn resolve(ctx: &mut Ctx<'_>, link: Link, out: &mut String) -> Result<()> {
    let Some(url) = link.url.as_deref() else {
        return render(ctx, &link, out);
    };

    let link = Link::from_url(url);
    let link = if !is_valid_url(url) {
        debug!("mangling malformed url {:?}", url);
        mangled(link)
    } else {
        match run_filter(ctx, &link) {
            FilterResult::Accept => link,
            FilterResult::Reject => {
                debug!("mangling rejected url {:?}", url);
                mangled(link)
            }
            FilterResult::Replace(patch) => checked(patch.apply(link)),
        }
    };

    render(ctx, &link, out)
}

fn push_attr(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
}

fn render(ctx: &mut Ctx<'_>, link: &Link, out: &mut String) -> Result<()> {
    if link.url.is_none() && link.click.is_none() {
        return ctx.nested(|ctx| render_spans(ctx, &link.text, true, out));
    }

    out.push_str("<a");
    push_attr(out, "href", link.url.as_deref());
    push_attr(out, "title", link.title.as_deref());
    push_attr(out, "onclick", link.click.as_deref());
    out.push('>');
    ctx.nested(|ctx| render_spans(ctx, &link.text, true, out))?;
    out.push_str("</a>");
    Ok(())
}
