//! Property tests: whatever the input, the output stays inside the tag
//! whitelist and never carries raw markup from the source.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use safemark_core::escape::escape_html;
use safemark_core::{Converter, FilterResult, Link, LinkPatch, Patch};

const ALLOWED_TAGS: &[&str] = &[
    "p", "strong", "em", "a", "ul", "li", "blockquote", "pre", "code", "br",
];
const ALLOWED_ATTRS: &[&str] = &["href", "title", "onclick"];

/// Check every tag in `html` against the whitelist and return a description
/// of the first violation.
fn find_violation(html: &str) -> Option<String> {
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            return Some(format!("unterminated tag {:?}", after));
        };
        let tag = &after[..close];
        let body = tag.strip_prefix('/').unwrap_or(tag);
        let (name, attrs) = body.split_once(' ').unwrap_or((body, ""));

        if !ALLOWED_TAGS.contains(&name) {
            return Some(format!("tag <{}>", tag));
        }
        if !attrs.is_empty() {
            if name != "a" {
                return Some(format!("attributes on <{}>", tag));
            }
            if let Some(bad) = check_attrs(attrs) {
                return Some(bad);
            }
        }
        rest = &after[close + 1..];
    }
    None
}

fn check_attrs(mut attrs: &str) -> Option<String> {
    while !attrs.is_empty() {
        let Some((name, value)) = attrs.split_once("=\"") else {
            return Some(format!("malformed attributes {:?}", attrs));
        };
        if !ALLOWED_ATTRS.contains(&name.trim_start()) {
            return Some(format!("attribute {:?}", name));
        }
        let Some(end) = value.find('"') else {
            return Some(format!("unterminated attribute {:?}", value));
        };
        attrs = &value[end + 1..];
    }
    None
}

fn markup() -> impl Strategy<Value = String> {
    proptest::string::string_regex(r#"[a-z<>&#;*_\\\[\]()"':/. \t\r\n>+-]{0,200}"#)
        .expect("valid regex")
}

fn accepting() -> Converter {
    Converter::new().with_link_filter(|_: &Link| FilterResult::Accept)
}

fn patching() -> Converter {
    Converter::new().with_link_filter(|link: &Link| {
        FilterResult::Replace(LinkPatch {
            title: Patch::Value(link.text.clone()),
            click: Patch::Value("x\"><script>".into()),
            ..LinkPatch::default()
        })
    })
}

proptest! {
    #[test]
    fn output_stays_in_whitelist(input in markup()) {
        for converter in [Converter::new(), accepting(), patching()] {
            match converter.convert(&input) {
                Ok(html) => {
                    prop_assert_eq!(find_violation(&html), None, "{:?} -> {:?}", input, html);
                }
                Err(err) => {
                    prop_assert!(err.is_too_complex());
                }
            }
        }
    }

    #[test]
    fn plain_text_keeps_no_raw_angle_brackets(input in "[a-z <>/=\"]{0,80}") {
        if let Ok(html) = safemark_core::convert(&input) {
            prop_assert_eq!(find_violation(&html), None);
            prop_assert!(!html.contains("<script"));
        }
    }

    #[test]
    fn escaping_is_idempotent(input in any::<String>()) {
        let once = escape_html(&input);
        prop_assert_eq!(escape_html(&once), once);
    }

    #[test]
    fn unfiltered_output_has_no_anchors(input in markup()) {
        if let Ok(html) = safemark_core::convert(&input) {
            prop_assert!(!html.contains("<a"));
        }
    }
}

#[test]
fn whitelist_checker_flags_foreign_tags() {
    assert_eq!(find_violation("<p>ok</p>"), None);
    assert_eq!(
        find_violation("<p><script>"),
        Some("tag <script>".to_string())
    );
    assert_eq!(
        find_violation("<a href=\"x\" style=\"y\">"),
        Some("attribute \" style\"".to_string())
    );
}

#[test]
fn unmatched_link_syntax_converts_in_linear_time() {
    for unit in ["[", "[a](", "[a][", "[a](b \"", "(\""] {
        let small = unit.repeat(20_000);
        let large = unit.repeat(160_000);

        let started = Instant::now();
        let html = safemark_core::convert(&small).unwrap();
        let small_time = started.elapsed();
        assert_eq!(html, format!("<p>{}</p>", small));

        let started = Instant::now();
        let html = safemark_core::convert(&large).unwrap();
        let large_time = started.elapsed();
        assert_eq!(html, format!("<p>{}</p>", large));

        // Eight times the input; quadratic scanning would take ~64x.
        assert!(
            large_time < small_time * 24 + Duration::from_millis(200),
            "{:?}: {:?} for 20k units, {:?} for 160k units",
            unit,
            small_time,
            large_time
        );
    }
}
