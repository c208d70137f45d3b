//! Component-function rendering.
//!
//! The second engine family: instead of a template name, a selector resolves
//! a [`ComponentFn`] - an async function that builds markup from the route's
//! result and the render context. Components compose in plain Rust, so there
//! is no template language between the data and the output.
//!
//! The selector machinery is shared with templates: a `HeaderSelector<ComponentFn>`
//! lets the client pick the component, a `Fixed` selector pins one down.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use swapout_dispatch::{RenderContext, RenderError, Renderer};

/// An async component: result value and render context in, markup out.
///
/// Arguments are owned so the component future can outlive the call site;
/// both are cheap to clone.
pub type ComponentFn =
    Arc<dyn Fn(Value, RenderContext) -> BoxFuture<'static, Result<String, RenderError>> + Send + Sync>;

/// Wraps an async closure as a [`ComponentFn`].
///
/// # Example
///
/// ```rust
/// use swapout::component;
///
/// let item_list = component(|result, _context| async move {
///     let items = result.as_array().cloned().unwrap_or_default();
///     let body: String = items
///         .iter()
///         .map(|v| format!("<li>{}</li>", v.as_str().unwrap_or_default()))
///         .collect();
///     Ok(format!("<ul>{body}</ul>"))
/// });
/// # let _ = item_list;
/// ```
pub fn component<F, Fut>(f: F) -> ComponentFn
where
    F: Fn(Value, RenderContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<String, RenderError>> + Send + 'static,
{
    Arc::new(move |result, context| Box::pin(f(result, context)))
}

/// Renderer that invokes the selected component function.
///
/// Stateless; the component itself carries everything it needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentRenderer;

impl ComponentRenderer {
    /// Creates the component renderer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer<ComponentFn> for ComponentRenderer {
    async fn render(
        &self,
        target: &ComponentFn,
        result: &Value,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        target(result.clone(), context.clone()).await
    }

    async fn render_error(
        &self,
        target: &ComponentFn,
        error: &anyhow::Error,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        // Error components receive the same shape the default contract
        // documents: the message under the `error` key.
        let payload = serde_json::json!({ "error": { "message": error.to_string() } });
        target(payload, context.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method, Uri};
    use serde_json::json;
    use std::sync::Arc as StdArc;
    use swapout_dispatch::{DependencyContext, RequestParts};

    fn context() -> RenderContext {
        let request = StdArc::new(RequestParts::new(
            Method::GET,
            Uri::from_static("/todos"),
            HeaderMap::new(),
        ));
        RenderContext::assemble(request, &DependencyContext::new(), &[]).unwrap()
    }

    #[tokio::test]
    async fn test_component_renders_result() {
        let badge = component(|result, _context| async move {
            Ok(format!("<span>{}</span>", result["count"]))
        });

        let output = ComponentRenderer::new()
            .render(&badge, &json!({"count": 3}), &context())
            .await
            .unwrap();
        assert_eq!(output, "<span>3</span>");
    }

    #[tokio::test]
    async fn test_component_reads_context() {
        let greeting = component(|_result, context: RenderContext| async move {
            let user = context
                .get("user")
                .and_then(Value::as_str)
                .unwrap_or("stranger");
            Ok(format!("<p>hello {user}</p>"))
        });

        let request = StdArc::new(RequestParts::new(
            Method::GET,
            Uri::from_static("/todos"),
            HeaderMap::new(),
        ));
        let deps = DependencyContext::new().with("user", &"alice").unwrap();
        let context = RenderContext::assemble(request, &deps, &[]).unwrap();

        let output = ComponentRenderer::new()
            .render(&greeting, &Value::Null, &context)
            .await
            .unwrap();
        assert_eq!(output, "<p>hello alice</p>");
    }

    #[tokio::test]
    async fn test_error_component_sees_the_message() {
        let error_box = component(|payload, _context| async move {
            let message = payload["error"]["message"].as_str().unwrap_or("?").to_string();
            Ok(format!("<div class=\"error\">{message}</div>"))
        });

        let output = ComponentRenderer::new()
            .render_error(&error_box, &anyhow::anyhow!("bad input"), &context())
            .await
            .unwrap();
        assert_eq!(output, "<div class=\"error\">bad input</div>");
    }

    #[tokio::test]
    async fn test_component_failure_surfaces() {
        let broken = component(|_result, _context| async move {
            Err::<String, _>(RenderError::Component("image cache offline".into()))
        });

        let err = ComponentRenderer::new()
            .render(&broken, &Value::Null, &context())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Component(_)));
    }
}
