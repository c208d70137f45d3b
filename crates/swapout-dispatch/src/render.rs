//! The rendering capability.
//!
//! Defines the contract between dispatch and renderers. Dispatch doesn't know
//! about template engines or component trees - it just knows that for each
//! resolved target there is something that turns a result value and a context
//! into markup. Concrete engine adapters live in the `swapout` crate.
//!
//! Rendering may suspend (template lookup, component resolution); the
//! dispatcher awaits it like everything else in the pipeline. An immediately
//! ready implementation is just a future that resolves on first poll.

use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use thiserror::Error;

use crate::context::RenderContext;

/// Errors that can occur during rendering.
///
/// These are never retried and never replaced with a fallback; they surface
/// to the surrounding framework as rendering failures, distinct from handler
/// failures.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template compilation or evaluation failed.
    #[error("template error: {0}")]
    Template(String),

    /// The resolved template name is not registered with the engine.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A component function failed to produce markup.
    #[error("component error: {0}")]
    Component(String),

    /// Result or context serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        RenderError::Serialization(e.to_string())
    }
}

/// Renders a resolved target to markup.
///
/// `C` is the target type this renderer accepts and must match what the
/// route's selector produces. Renderers are shared across concurrent requests
/// and must not mutate shared state.
#[async_trait]
pub trait Renderer<C: Sync>: Send + Sync {
    /// Renders the route's result.
    ///
    /// `result` is the handler's output, serialized once by the dispatcher;
    /// `context` carries the route's dependencies, processor contributions
    /// and the current request.
    async fn render(
        &self,
        target: &C,
        result: &Value,
        context: &RenderContext,
    ) -> Result<String, RenderError>;

    /// Renders a route error.
    ///
    /// Called when an error selector resolved a target for a failed handler.
    /// The default implementation wraps the error message under an `error`
    /// key and feeds it through [`render`](Self::render); engine adapters
    /// with a richer error shape override this.
    async fn render_error(
        &self,
        target: &C,
        error: &anyhow::Error,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        let payload = serde_json::json!({ "error": { "message": error.to_string() } });
        self.render(target, &payload, context).await
    }
}

/// A renderer backed by a synchronous closure.
///
/// Handy for tests and for output that doesn't need an engine at all.
pub struct RenderWith<F, C> {
    f: F,
    _target: PhantomData<fn() -> C>,
}

/// Wraps a closure as a [`Renderer`].
///
/// # Example
///
/// ```rust
/// use swapout_dispatch::render_with;
///
/// let renderer = render_with(|target: &&str, result, _context| {
///     Ok(format!("<!-- {target} -->{result}"))
/// });
/// ```
pub fn render_with<F, C>(f: F) -> RenderWith<F, C>
where
    F: Fn(&C, &Value, &RenderContext) -> Result<String, RenderError> + Send + Sync,
{
    RenderWith {
        f,
        _target: PhantomData,
    }
}

#[async_trait]
impl<F, C> Renderer<C> for RenderWith<F, C>
where
    F: Fn(&C, &Value, &RenderContext) -> Result<String, RenderError> + Send + Sync,
    C: Sync,
{
    async fn render(
        &self,
        target: &C,
        result: &Value,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        (self.f)(target, result, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DependencyContext;
    use crate::request::RequestParts;
    use http::{HeaderMap, Method, Uri};
    use serde_json::json;
    use std::sync::Arc;

    fn context() -> RenderContext {
        let request = Arc::new(RequestParts::new(
            Method::GET,
            Uri::from_static("/items"),
            HeaderMap::new(),
        ));
        RenderContext::assemble(request, &DependencyContext::new(), &[]).unwrap()
    }

    #[tokio::test]
    async fn test_render_with_closure() {
        let renderer = render_with(|target: &&str, result: &Value, _context| {
            Ok(format!("[{target}] {result}"))
        });

        let output = renderer
            .render(&"list", &json!({"n": 1}), &context())
            .await
            .unwrap();
        assert_eq!(output, r#"[list] {"n":1}"#);
    }

    #[tokio::test]
    async fn test_default_error_rendering_wraps_message() {
        let renderer = render_with(|_target: &&str, result: &Value, _context| {
            let message = result["error"]["message"].as_str().unwrap_or("?");
            Ok(format!("<p>{message}</p>"))
        });

        let error = anyhow::anyhow!("bad input");
        let output = renderer
            .render_error(&"error", &error, &context())
            .await
            .unwrap();
        assert_eq!(output, "<p>bad input</p>");
    }

    #[tokio::test]
    async fn test_render_failure_surfaces() {
        let renderer = render_with(|target: &&str, _result: &Value, _context| {
            Err::<String, _>(RenderError::TemplateNotFound(target.to_string()))
        });

        let err = renderer
            .render(&"missing", &json!(null), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_serde_error_conversion() {
        // A map with a non-string key fails to serialize to JSON.
        let bad = std::collections::HashMap::from([(vec![1u8], "x")]);
        let err: RenderError = serde_json::to_value(&bad).unwrap_err().into();
        assert!(matches!(err, RenderError::Serialization(_)));
    }
}
