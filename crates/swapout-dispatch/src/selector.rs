//! Component selection.
//!
//! A [`ComponentSelector`] answers one question per render: which component
//! should this request get? The answer - the selector's `Target` - is opaque
//! to the dispatcher; it only has to match what the configured renderer
//! accepts (a template name, a component function, anything).
//!
//! # The error channel
//!
//! Selectors are consulted on two occasions: after a successful handler call
//! (with the result) and after a failed one (with the error). A selector that
//! does not know how to resolve a given error must decline by returning a
//! [`SelectionError`]; the dispatcher then propagates the *original* handler
//! error, unchanged, exactly as an undecorated route would have. Declining is
//! an expected outcome, not a defect.

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use crate::request::RequestParts;

/// Why a selector produced no target.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The selection header carried a value with no table entry and the
    /// selector has no default.
    #[error("no component is mapped to `{value}` in header `{header}` and no default is configured")]
    UnknownKey {
        /// The header the selector reads.
        header: String,
        /// The unmatched value the client sent.
        value: String,
    },

    /// The selection header was absent and the selector has no default.
    #[error("header `{header}` is missing and no default component is configured")]
    MissingHeader {
        /// The header the selector reads.
        header: String,
    },

    /// The selector does not resolve route errors (or not this one).
    #[error("this selector does not resolve route errors")]
    ErrorsUnsupported,

    /// Custom selection logic failed for another reason.
    #[error("{0}")]
    Other(String),
}

/// Resolves the component to render for one request.
///
/// `result` and `error` are mutually exclusive: the success path passes the
/// handler's result, the failure path passes the handler's error. Selectors
/// are shared across concurrent requests and must be stateless.
pub trait ComponentSelector<T>: Send + Sync {
    /// What this selector resolves to; must match the renderer's target type.
    type Target;

    /// Resolves the render target for the given request.
    fn select(
        &self,
        request: &RequestParts,
        result: Option<&T>,
        error: Option<&anyhow::Error>,
    ) -> Result<Self::Target, SelectionError>;
}

/// A selector that always resolves to the same target.
///
/// Ignores the request and the result. It also accepts the error channel:
/// when wired as an error selector it renders every handler error with its
/// one target, which is what a fixed error page wants.
#[derive(Debug, Clone)]
pub struct Fixed<C> {
    target: C,
}

impl<C> Fixed<C> {
    /// Creates a selector for the given constant target.
    pub fn new(target: C) -> Self {
        Self { target }
    }
}

impl<T, C> ComponentSelector<T> for Fixed<C>
where
    C: Clone + Send + Sync,
{
    type Target = C;

    fn select(
        &self,
        _request: &RequestParts,
        _result: Option<&T>,
        _error: Option<&anyhow::Error>,
    ) -> Result<C, SelectionError> {
        Ok(self.target.clone())
    }
}

/// Predicate deciding whether a header selector resolves a given route error.
pub type ErrorPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// A selector driven by a request header.
///
/// The client names the component it wants in a header; the selector looks
/// the value up in its table. An unmatched value or a missing header falls
/// back to the default when one is configured and fails the selection
/// otherwise. Lookups are case-insensitive unless configured otherwise.
///
/// Without an error predicate the selector declines every route error. With
/// one, it resolves exactly the errors the predicate accepts, through the
/// same header/table/default logic.
///
/// # Example
///
/// ```rust
/// use swapout_dispatch::HeaderSelector;
///
/// let selector = HeaderSelector::new(
///     "x-component",
///     [("list", "todos/list.html"), ("table", "todos/table.html")],
/// )
/// .with_default("todos/list.html");
/// ```
pub struct HeaderSelector<C> {
    header: String,
    entries: Vec<(String, C)>,
    default: Option<C>,
    case_sensitive: bool,
    errors: Option<ErrorPredicate>,
}

impl<C> HeaderSelector<C> {
    /// Creates a selector reading `header` and resolving through `entries`.
    pub fn new<K, I>(header: impl Into<String>, entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, C)>,
    {
        Self {
            header: header.into(),
            entries: entries
                .into_iter()
                .map(|(key, target)| (key.into(), target))
                .collect(),
            default: None,
            case_sensitive: false,
            errors: None,
        }
    }

    /// Sets the target used when the header is absent or unmatched.
    pub fn with_default(mut self, target: C) -> Self {
        self.default = Some(target);
        self
    }

    /// Makes key lookups case-sensitive (they are case-insensitive by default).
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Accepts route errors matching the given predicate.
    pub fn on_errors<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.errors = Some(Arc::new(predicate));
        self
    }

    /// Accepts route errors that downcast to `E`.
    pub fn on_errors_of<E>(self) -> Self
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.on_errors(|error| error.is::<E>())
    }

    fn lookup(&self, value: &str) -> Option<&C> {
        self.entries
            .iter()
            .find(|(key, _)| {
                if self.case_sensitive {
                    key == value
                } else {
                    key.eq_ignore_ascii_case(value)
                }
            })
            .map(|(_, target)| target)
    }
}

impl<T, C> ComponentSelector<T> for HeaderSelector<C>
where
    C: Clone + Send + Sync,
{
    type Target = C;

    fn select(
        &self,
        request: &RequestParts,
        _result: Option<&T>,
        error: Option<&anyhow::Error>,
    ) -> Result<C, SelectionError> {
        if let Some(error) = error {
            let accepted = self.errors.as_ref().is_some_and(|accepts| accepts(error));
            if !accepted {
                return Err(SelectionError::ErrorsUnsupported);
            }
        }

        match request.header(&self.header) {
            Some(value) => match self.lookup(value) {
                Some(target) => Ok(target.clone()),
                None => self
                    .default
                    .clone()
                    .ok_or_else(|| SelectionError::UnknownKey {
                        header: self.header.clone(),
                        value: value.to_string(),
                    }),
            },
            None => self
                .default
                .clone()
                .ok_or_else(|| SelectionError::MissingHeader {
                    header: self.header.clone(),
                }),
        }
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for HeaderSelector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderSelector")
            .field("header", &self.header)
            .field("entries", &self.entries)
            .field("default", &self.default)
            .field("case_sensitive", &self.case_sensitive)
            .field("handles_errors", &self.errors.is_some())
            .finish()
    }
}

/// A selector backed by a user-supplied function.
///
/// The escape hatch for selection logic the built-in variants don't cover:
/// routing on the result's shape, combining several headers, anything.
pub struct SelectWith<F, C> {
    f: F,
    _target: PhantomData<fn() -> C>,
}

/// Wraps a closure as a [`ComponentSelector`].
///
/// # Example
///
/// ```rust
/// use swapout_dispatch::{select_with, SelectionError};
///
/// // Pick a denser component for large results.
/// let selector = select_with(|_request, result: Option<&Vec<String>>, _error| {
///     let rows = result.map_or(0, |items| items.len());
///     Ok(if rows > 50 { "items/table.html" } else { "items/list.html" })
/// });
/// ```
pub fn select_with<T, F, C>(f: F) -> SelectWith<F, C>
where
    F: Fn(&RequestParts, Option<&T>, Option<&anyhow::Error>) -> Result<C, SelectionError>
        + Send
        + Sync,
{
    SelectWith {
        f,
        _target: PhantomData,
    }
}

impl<T, F, C> ComponentSelector<T> for SelectWith<F, C>
where
    F: Fn(&RequestParts, Option<&T>, Option<&anyhow::Error>) -> Result<C, SelectionError>
        + Send
        + Sync,
{
    type Target = C;

    fn select(
        &self,
        request: &RequestParts,
        result: Option<&T>,
        error: Option<&anyhow::Error>,
    ) -> Result<C, SelectionError> {
        (self.f)(request, result, error)
    }
}
