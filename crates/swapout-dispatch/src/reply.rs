//! Handler replies and final dispatch responses.
//!
//! A handler produces a [`Reply`]: its typed result plus any response
//! metadata it wants to survive rendering (status code, extra headers). The
//! dispatcher produces a [`DispatchOutcome`]: either that reply untouched
//! (passthrough) or an [`HtmlResponse`] carrying rendered markup with the
//! reply's metadata copied onto it.
//!
//! Neither type knows anything about a concrete web framework; the caller
//! converts them into its native response at the boundary.

use http::header::{HeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

/// A handler's result value plus optional response metadata.
///
/// Handlers usually return `Result<T, E>`, which converts into a `Reply<T>`
/// with no overrides. Building a `Reply` directly is the way to set an
/// explicit status code or extra headers that must survive rendering.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use swapout_dispatch::Reply;
///
/// let reply = Reply::new(vec!["a", "b"]).with_status(StatusCode::CREATED);
/// assert_eq!(reply.status(), Some(StatusCode::CREATED));
/// assert_eq!(reply.data(), &vec!["a", "b"]);
/// ```
#[derive(Debug, Clone)]
pub struct Reply<T> {
    data: T,
    status: Option<StatusCode>,
    headers: HeaderMap,
}

impl<T> Reply<T> {
    /// Creates a reply with no response overrides.
    pub fn new(data: T) -> Self {
        Self {
            data,
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// Sets an explicit status code for the final response.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a header that the final response must carry.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The handler's result value.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// The explicit status code, if the handler set one.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Headers the handler wants on the final response.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Consumes the reply, returning the result value.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> From<T> for Reply<T> {
    fn from(data: T) -> Self {
        Reply::new(data)
    }
}

/// A rendered markup response: body, status code and headers.
///
/// Defaults to status 200 with `Content-Type: text/html; charset=utf-8`.
/// Headers copied from a handler's [`Reply`] override same-named defaults.
#[derive(Debug, Clone)]
pub struct HtmlResponse {
    body: String,
    status: StatusCode,
    headers: HeaderMap,
}

impl HtmlResponse {
    /// Wraps markup in a response with default status and content type.
    pub fn new(body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Self {
            body: body.into(),
            status: StatusCode::OK,
            headers,
        }
    }

    /// Replaces the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Copies headers onto the response, overriding same-named entries.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// The markup body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Decomposes the response for conversion into a framework-native one.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, String) {
        (self.status, self.headers, self.body)
    }
}

/// What a dispatched route produced for one request.
#[derive(Debug, Clone)]
pub enum DispatchOutcome<T> {
    /// The handler's reply, untouched. The surrounding framework encodes it
    /// the way it encodes any undecorated route result.
    Data(Reply<T>),
    /// Rendered markup with response metadata already applied.
    Markup(HtmlResponse),
}

impl<T> DispatchOutcome<T> {
    /// Returns true if this is a passthrough data outcome.
    pub fn is_data(&self) -> bool {
        matches!(self, DispatchOutcome::Data(_))
    }

    /// Returns true if this is a rendered markup outcome.
    pub fn is_markup(&self) -> bool {
        matches!(self, DispatchOutcome::Markup(_))
    }

    /// The handler's reply, or `None` if markup was rendered.
    pub fn data(&self) -> Option<&Reply<T>> {
        match self {
            DispatchOutcome::Data(reply) => Some(reply),
            _ => None,
        }
    }

    /// The rendered response, or `None` for passthrough.
    pub fn markup(&self) -> Option<&HtmlResponse> {
        match self {
            DispatchOutcome::Markup(response) => Some(response),
            _ => None,
        }
    }

    /// Consumes the outcome, returning the rendered response if there is one.
    pub fn into_markup(self) -> Option<HtmlResponse> {
        match self {
            DispatchOutcome::Markup(response) => Some(response),
            _ => None,
        }
    }

    /// Consumes the outcome, returning the reply if it was passthrough.
    pub fn into_data(self) -> Option<Reply<T>> {
        match self {
            DispatchOutcome::Data(reply) => Some(reply),
            _ => None,
        }
    }
}
