//! # SafeMark Core
//!
//! Converts a small lightweight-markup dialect into HTML that is safe to
//! embed, whatever the input. No input HTML ever reaches the output: `<`,
//! `>` and stray `&` are always escaped, and the only tags produced are
//! `p`, `strong`, `em`, `a`, `ul`, `li`, `blockquote`, `pre`, `code` and
//! `br`.
//!
//! ## Quick Start
//!
//! ```rust
//! let html = safemark_core::convert("Hello **world**\n\n> quoted").unwrap();
//! assert_eq!(
//!     html,
//!     "<p>Hello <strong>world</strong></p><blockquote><p>quoted</p></blockquote>"
//! );
//! ```
//!
//! ## Links
//!
//! Links are defanged unless a filter accepts them:
//!
//! ```rust
//! use safemark_core::{Converter, FilterResult, Link};
//!
//! assert_eq!(
//!     safemark_core::convert("http://example.com").unwrap(),
//!     "<p>hxxp //example.com</p>"
//! );
//!
//! let converter = Converter::new().with_link_filter(|link: &Link| {
//!     match link.url.as_deref() {
//!         Some(url) if url.starts_with("https://") => FilterResult::Accept,
//!         _ => FilterResult::Reject,
//!     }
//! });
//! assert_eq!(
//!     converter.convert("https://example.com").unwrap(),
//!     "<p><a href=\"https://example.com\">https://example.com</a></p>"
//! );
//! ```
//!
//! ## Errors
//!
//! Malformed markup never fails; it comes out as escaped text. The one
//! error is [`ConvertError::TooComplex`], returned when nesting exceeds
//! [`Options::max_depth`].

pub mod classify;
pub mod error;
pub mod escape;
mod inline;
pub mod lexer;
pub mod link;
pub mod parser;
pub mod span;

pub use error::{ConvertError, ConvertErrorKind};
pub use link::{FilterResult, Link, LinkFilter, LinkPatch, Patch};
pub use parser::{convert, Converter, Options, DEFAULT_MAX_DEPTH};
