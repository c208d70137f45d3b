//! Request metadata and render-or-passthrough classification.
//!
//! The dispatcher never owns the HTTP request; the surrounding framework does.
//! [`RequestParts`] captures the read-only slice of it the dispatch pipeline
//! needs: method, URI, and headers. Classification is a pure predicate over
//! that data - no I/O, no mutation, no failure path.
//!
//! # The trigger header
//!
//! Hypermedia clients (htmx and friends) mark their requests with an
//! `HX-Request: true` header. A request carrying that marker gets rendered
//! markup; any other request gets the route's raw data. This makes every
//! dispatched route bimodal by default: the same handler serves both the JSON
//! API and the UI.

use http::{HeaderMap, Method, Uri};

/// The header hypermedia clients use to mark their requests.
///
/// Header name lookups are case-insensitive per HTTP semantics; the constant
/// is lowercase because that is how `http` normalizes names.
pub const HX_REQUEST: &str = "hx-request";

/// Read-only request metadata captured from the surrounding framework.
///
/// The dispatcher only ever inspects this data - it is cloned out of the
/// framework's request object once, at the edge, and shared across the
/// pipeline via `Arc`.
///
/// # Example
///
/// ```rust
/// use http::{HeaderMap, Method, Uri};
/// use swapout_dispatch::RequestParts;
///
/// let request = RequestParts::new(
///     Method::GET,
///     "/todos?done=false".parse::<Uri>().unwrap(),
///     HeaderMap::new(),
/// );
///
/// assert_eq!(request.path(), "/todos");
/// assert_eq!(request.query(), Some("done=false"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestParts {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestParts {
    /// Creates request metadata from its components.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Captures the metadata of an `http::Request`, leaving the body behind.
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string.
    ///
    /// Returns `None` when the header is absent or its value is not valid
    /// visible ASCII. Name matching is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Returns true if the request carries the hypermedia trigger header.
///
/// This is the request classifier: a pure predicate that picks between the
/// render branch and the passthrough branch. A request without
/// `HX-Request: true` is a plain data request.
pub fn is_fragment_request(request: &RequestParts) -> bool {
    request
        .header(HX_REQUEST)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// When a dispatched route renders.
///
/// Chosen once when the route is wired up, not per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Render only for requests carrying the trigger header; serve raw data
    /// otherwise. This is the default and keeps the route bimodal.
    #[default]
    Fragment,
    /// Render every request, skipping classification entirely. For full-page
    /// routes that always answer with markup.
    Page,
}

impl DispatchMode {
    /// Returns true if this mode renders unconditionally.
    pub fn is_unconditional(&self) -> bool {
        matches!(self, DispatchMode::Page)
    }

    /// Decides whether the given request takes the render branch.
    pub fn wants_render(&self, request: &RequestParts) -> bool {
        match self {
            DispatchMode::Page => true,
            DispatchMode::Fragment => is_fragment_request(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn request_with_headers(pairs: &[(&'static str, &'static str)]) -> RequestParts {
        let mut headers = HeaderMap::new();
        for &(name, value) in pairs {
            headers.insert(name, HeaderValue::from_static(value));
        }
        RequestParts::new(Method::GET, Uri::from_static("/items"), headers)
    }

    #[test]
    fn test_trigger_header_present() {
        let request = request_with_headers(&[("hx-request", "true")]);
        assert!(is_fragment_request(&request));
    }

    #[test]
    fn test_trigger_header_absent() {
        let request = request_with_headers(&[]);
        assert!(!is_fragment_request(&request));
    }

    #[test]
    fn test_trigger_header_wrong_value() {
        let request = request_with_headers(&[("hx-request", "false")]);
        assert!(!is_fragment_request(&request));
    }

    #[test]
    fn test_trigger_value_case_insensitive() {
        let request = request_with_headers(&[("hx-request", "True")]);
        assert!(is_fragment_request(&request));
    }

    #[test]
    fn test_header_name_case_insensitive() {
        // http::HeaderMap normalizes names, so mixed-case lookups work too.
        let request = request_with_headers(&[("hx-request", "true")]);
        assert_eq!(request.header("HX-Request"), Some("true"));
    }

    #[test]
    fn test_missing_header_is_none() {
        let request = request_with_headers(&[]);
        assert_eq!(request.header("x-component"), None);
    }

    #[test]
    fn test_uri_accessors() {
        let request = RequestParts::new(
            Method::POST,
            Uri::from_static("/todos?done=true"),
            HeaderMap::new(),
        );
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.path(), "/todos");
        assert_eq!(request.query(), Some("done=true"));
    }

    #[test]
    fn test_mode_fragment_follows_classifier() {
        let mode = DispatchMode::Fragment;
        assert!(mode.wants_render(&request_with_headers(&[("hx-request", "true")])));
        assert!(!mode.wants_render(&request_with_headers(&[])));
    }

    #[test]
    fn test_mode_page_always_renders() {
        let mode = DispatchMode::Page;
        assert!(mode.is_unconditional());
        assert!(mode.wants_render(&request_with_headers(&[])));
    }

    #[test]
    fn test_default_mode_is_fragment() {
        assert_eq!(DispatchMode::default(), DispatchMode::Fragment);
    }

    #[test]
    fn test_from_request_captures_metadata() {
        let request = http::Request::builder()
            .method(Method::GET)
            .uri("/todos")
            .header("hx-request", "true")
            .body(())
            .unwrap();

        let parts = RequestParts::from_request(&request);
        assert_eq!(parts.path(), "/todos");
        assert!(is_fragment_request(&parts));
    }
}
