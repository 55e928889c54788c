//! Python bindings for the SafeMark converter.
//!
//! The link filter is any Python callable. It receives a dict with the keys
//! `url`, `text`, `title` and `click`, and its return value is mapped onto
//! [`FilterResult`]:
//!
//! - `True` accepts the link
//! - a `dict` replaces fields; only `str` or `None` values for the four known
//!   keys are used, anything else is ignored
//! - anything else, or an exception, rejects it

use log::warn;
use pyo3::create_exception;
use pyo3::exceptions::{PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyString};
use safemark_core::{
    ConvertError, Converter as CoreConverter, FilterResult, Link, LinkFilter, LinkPatch, Patch,
    DEFAULT_MAX_DEPTH,
};

create_exception!(
    pysafemark,
    InputTooComplex,
    PyValueError,
    "Raised when input nests deeper than the converter's limit."
);

/// Option names accepted for the link filter.
const FILTER_KEYS: [&str; 2] = ["filterLinks", "filter_links"];

fn to_py_err(err: ConvertError) -> PyErr {
    InputTooComplex::new_err(err.to_string())
}

// ============================================================================
// Link filter
// ============================================================================

/// A Python callable used as a link filter.
struct PyLinkFilter {
    callback: Py<PyAny>,
}

fn link_to_dict<'py>(py: Python<'py>, link: &Link) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("url", link.url.as_deref())?;
    dict.set_item("text", link.text.as_str())?;
    dict.set_item("title", link.title.as_deref())?;
    dict.set_item("click", link.click.as_deref())?;
    Ok(dict)
}

/// Read one override from a replacement dict.
fn patch_field(dict: &Bound<'_, PyDict>, key: &str) -> Patch {
    match dict.get_item(key) {
        Ok(Some(value)) if value.is_none() => Patch::Null,
        Ok(Some(value)) if value.is_instance_of::<PyString>() => value
            .extract::<String>()
            .map(Patch::Value)
            .unwrap_or_default(),
        _ => Patch::Keep,
    }
}

fn to_filter_result(result: &Bound<'_, PyAny>) -> FilterResult {
    if let Ok(dict) = result.downcast::<PyDict>() {
        return FilterResult::Replace(LinkPatch {
            url: patch_field(dict, "url"),
            text: patch_field(dict, "text"),
            title: patch_field(dict, "title"),
            click: patch_field(dict, "click"),
        });
    }

    match result.downcast::<PyBool>() {
        Ok(flag) if flag.is_true() => FilterResult::Accept,
        Ok(_) => FilterResult::Reject,
        Err(_) => {
            warn!(
                "link filter returned {}, expected bool or dict",
                result.get_type()
            );
            FilterResult::Reject
        }
    }
}

impl LinkFilter for PyLinkFilter {
    fn filter(&self, link: &Link) -> FilterResult {
        Python::with_gil(|py| {
            let outcome = link_to_dict(py, link)
                .and_then(|dict| self.callback.call1(py, (dict,)));
            match outcome {
                Ok(result) => to_filter_result(result.bind(py)),
                Err(err) => {
                    warn!("link filter raised {}", err);
                    FilterResult::Reject
                }
            }
        })
    }
}

// ============================================================================
// Converter
// ============================================================================

/// SafeMark converter.
///
/// Keyword options:
///     filterLinks / filter_links: callable deciding which links stay links
///     max_depth: nesting limit (default 64)
///
/// Unknown options are ignored.
#[pyclass(frozen, name = "Converter")]
pub struct PyConverter {
    inner: CoreConverter,
}

fn build_converter(options: Option<&Bound<'_, PyDict>>) -> PyResult<CoreConverter> {
    let mut converter = CoreConverter::new();
    let Some(options) = options else {
        return Ok(converter);
    };

    for key in FILTER_KEYS {
        let Some(callback) = options.get_item(key)? else {
            continue;
        };
        if callback.is_none() {
            continue;
        }
        if !callback.is_callable() {
            return Err(PyTypeError::new_err(format!("{} must be callable", key)));
        }
        converter = converter.with_link_filter(PyLinkFilter {
            callback: callback.unbind(),
        });
    }

    if let Some(depth) = options.get_item("max_depth")? {
        converter = converter.with_max_depth(depth.extract::<usize>()?);
    }

    Ok(converter)
}

#[pymethods]
impl PyConverter {
    #[new]
    #[pyo3(signature = (**options), text_signature = "(**options)")]
    fn new(options: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        Ok(PyConverter {
            inner: build_converter(options)?,
        })
    }

    /// Convert a string to an HTML fragment. Raises InputTooComplex when
    /// nesting exceeds the limit.
    #[pyo3(text_signature = "(self, source)")]
    fn convert(&self, source: &str) -> PyResult<String> {
        self.inner.convert(source).map_err(to_py_err)
    }

    #[getter]
    fn max_depth(&self) -> usize {
        self.inner.options().max_depth
    }

    fn __repr__(&self) -> String {
        format!(
            "Converter(max_depth={}, filter={})",
            self.inner.options().max_depth,
            self.inner.has_link_filter()
        )
    }
}

// ============================================================================
// Module functions
// ============================================================================

/// Convert a SafeMark string to HTML.
///
/// Args:
///     source: Document string
///     **options: Same keyword options as Converter
///
/// Returns:
///     str: HTML fragment
///
/// Raises:
///     InputTooComplex: When nesting exceeds the limit
#[pyfunction]
#[pyo3(signature = (source, **options), text_signature = "(source, **options)")]
fn convert(source: &str, options: Option<&Bound<'_, PyDict>>) -> PyResult<String> {
    build_converter(options)?.convert(source).map_err(to_py_err)
}

// ============================================================================
// Module
// ============================================================================

/// SafeMark - markup to injection-safe HTML.
#[pymodule]
fn pysafemark(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyConverter>()?;
    m.add("InputTooComplex", m.py().get_type::<InputTooComplex>())?;
    m.add("DEFAULT_MAX_DEPTH", DEFAULT_MAX_DEPTH)?;
    m.add_function(wrap_pyfunction!(convert, m)?)?;
    Ok(())
}
