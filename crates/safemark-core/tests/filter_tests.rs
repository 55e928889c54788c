//! Link filter and nesting limit tests

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use safemark_core::{
    ConvertError, ConvertErrorKind, Converter, FilterResult, Link, LinkFilter, LinkPatch, Options,
    Patch, DEFAULT_MAX_DEPTH,
};

/// Accepts links to the listed hosts only.
struct HostFilter {
    hosts: Vec<&'static str>,
}

impl LinkFilter for HostFilter {
    fn filter(&self, link: &Link) -> FilterResult {
        let host = link
            .url
            .as_deref()
            .and_then(|url| url.split("://").nth(1))
            .and_then(|rest| rest.split('/').next());
        match host {
            Some(host) if self.hosts.contains(&host) => FilterResult::Accept,
            _ => FilterResult::Reject,
        }
    }
}

// ============================================================================
// Filter Decision Tests
// ============================================================================

#[test]
fn test_filter_sees_url_as_text() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let converter = Converter::new().with_link_filter(move |link: &Link| {
        log.lock().unwrap().push(link.clone());
        FilterResult::Reject
    });

    converter
        .convert("[label](http://a.b \"title\") and https://c.d")
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], Link::from_url("http://a.b"));
    assert_eq!(seen[0].text, "http://a.b");
    assert_eq!(seen[0].title, None);
    assert_eq!(seen[1].url.as_deref(), Some("https://c.d"));
}

#[test]
fn test_filter_not_called_for_reference_links() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let converter = Converter::new().with_link_filter(move |_: &Link| {
        *counter.lock().unwrap() += 1;
        FilterResult::Accept
    });

    assert_eq!(converter.convert("[a][b]").unwrap(), "<p>a</p>");
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[test]
fn test_host_filter() {
    let converter = Converter::new().with_link_filter(HostFilter {
        hosts: vec!["good.example"],
    });

    assert_eq!(
        converter
            .convert("http://good.example/page http://bad.example/page")
            .unwrap(),
        "<p><a href=\"http://good.example/page\">http://good.example/page</a> hxxp //bad.example/page</p>"
    );
}

#[test]
fn test_reject_mangles() {
    let converter = Converter::new().with_link_filter(|_: &Link| FilterResult::Reject);
    assert_eq!(
        converter.convert("https://x.y").unwrap(),
        "<p>hxxps //x.y</p>"
    );
}

#[test]
fn test_panicking_filter_counts_as_reject() {
    let converter = Converter::new().with_link_filter(|_: &Link| -> FilterResult {
        panic!("filter bug");
    });
    assert_eq!(
        converter.convert("see http://x.y").unwrap(),
        "<p>see hxxp //x.y</p>"
    );
}

#[test]
fn test_malformed_url_skips_filter() {
    let converter = Converter::new().with_link_filter(|_: &Link| FilterResult::Accept);
    assert_eq!(
        converter.convert("http://a\u{7}b").unwrap(),
        "<p>hxxp //a\u{7}b</p>"
    );
}

// ============================================================================
// Replacement Tests
// ============================================================================

#[test]
fn test_replace_adds_attributes() {
    let converter = Converter::new().with_link_filter(|_: &Link| {
        FilterResult::Replace(LinkPatch {
            title: Patch::Value("External".into()),
            click: Patch::Value("track(\"out\")".into()),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p><a href=\"http://x.y\" title=\"External\" onclick=\"track(&quot;out&quot;)\">http://x.y</a></p>"
    );
}

#[test]
fn test_replace_text_is_rendered_as_markup() {
    let converter = Converter::new().with_link_filter(|_: &Link| {
        FilterResult::Replace(LinkPatch {
            text: Patch::Value("*home* <page>".into()),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p><a href=\"http://x.y\"><em>home</em> &lt;page&gt;</a></p>"
    );
}

#[test]
fn test_replace_can_drop_the_target() {
    let converter = Converter::new().with_link_filter(|_: &Link| {
        FilterResult::Replace(LinkPatch {
            url: Patch::Null,
            text: Patch::Value("[link removed]".into()),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p>[link removed]</p>"
    );
}

#[test]
fn test_replace_click_without_url() {
    let converter = Converter::new().with_link_filter(|link: &Link| {
        FilterResult::Replace(LinkPatch {
            url: Patch::Null,
            click: Patch::Value(format!("confirmLeave('{}')", link.url.clone().unwrap_or_default())),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p><a onclick=\"confirmLeave('http://x.y')\">http://x.y</a></p>"
    );
}

#[test]
fn test_replacement_url_is_escaped() {
    let converter = Converter::new().with_link_filter(|_: &Link| {
        FilterResult::Replace(LinkPatch {
            url: Patch::Value("http://x.y/?a=1&b=<2>".into()),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p><a href=\"http://x.y/?a=1&amp;b=&lt;2&gt;\">http://x.y</a></p>"
    );
}

#[test]
fn test_malformed_replacement_url_is_mangled() {
    let converter = Converter::new().with_link_filter(|_: &Link| {
        FilterResult::Replace(LinkPatch {
            url: Patch::Value("javascript:alert(1) //".into()),
            title: Patch::Value("t".into()),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p>jxxascript alert(1) //</p>"
    );
}

#[test]
fn test_replacement_text_does_not_autolink() {
    let converter = Converter::new().with_link_filter(|_: &Link| {
        FilterResult::Replace(LinkPatch {
            url: Patch::Null,
            text: Patch::Value("moved to http://other.example".into()),
            ..LinkPatch::default()
        })
    });

    assert_eq!(
        converter.convert("http://x.y").unwrap(),
        "<p>moved to http://other.example</p>"
    );
}

// ============================================================================
// Nesting Limit Tests
// ============================================================================

#[test]
fn test_default_options() {
    let converter = Converter::new();
    assert_eq!(converter.options().max_depth, DEFAULT_MAX_DEPTH);
    assert!(!converter.has_link_filter());
}

#[test]
fn test_depth_limit_reports_too_complex() {
    let converter = Converter::new().with_max_depth(3);

    assert_eq!(
        converter.convert("> > x").unwrap(),
        "<blockquote><blockquote><p>x</p></blockquote></blockquote>"
    );

    let err = converter.convert("> > > > x").unwrap_err();
    assert_eq!(err, ConvertError::TooComplex { limit: 3 });
    assert_eq!(err.kind(), ConvertErrorKind::TooComplex);
    assert!(err.is_too_complex());
    assert_eq!(err.to_string(), "input too complex: nesting exceeds 3 levels");
}

#[test]
fn test_pathological_nesting_fails_gracefully() {
    let input = format!("{}x", "> ".repeat(10_000));
    let err = safemark_core::convert(&input).unwrap_err();
    assert!(err.is_too_complex());
}

#[test]
fn test_deep_list_nesting_fails_gracefully() {
    let input = format!("{}x", "* ".repeat(500));
    assert!(safemark_core::convert(&input).unwrap_err().is_too_complex());
}

#[test]
fn test_options_round_trip() {
    let converter = Converter::new().with_options(Options { max_depth: 2 });
    assert_eq!(converter.options().max_depth, 2);
    assert!(converter.convert("> > > x").is_err());
}
