//! The dispatch pipeline.
//!
//! [`Dispatcher`] wraps a route handler and decides, per request, whether to
//! return the handler's raw data or render it to markup. One dispatch is one
//! sequential pass:
//!
//! ```text
//! request + resolved dependencies
//!   → invoke handler
//!   → classify (skipped in page mode)
//!   → passthrough: return the result or error untouched
//!   → render:     selector → context assembly → renderer → response
//! ```
//!
//! # Error policy
//!
//! Nothing is retried and nothing is silently recovered. The single
//! deliberate interception point is a handler error on the render path, which
//! is offered to the error selector once: if it resolves a target, the error
//! is rendered like a result; if it declines (or none is configured), the
//! original error propagates exactly as an undecorated route would have
//! raised it. Selector and renderer failures are surfaced as their own error
//! kinds and left to the surrounding framework.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::context::{DependencyContext, RenderContext, RequestProcessor};
use crate::handler::Handler;
use crate::render::{RenderError, Renderer};
use crate::reply::{DispatchOutcome, HtmlResponse};
use crate::request::{DispatchMode, RequestParts};
use crate::selector::{ComponentSelector, SelectionError};

/// Errors a dispatched route can produce.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The wrapped handler (or a request processor) failed and no error
    /// component took over. Transparent: the message and the concrete error
    /// type are the handler's own, available for downcasting.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// No component target could be resolved for a render request.
    #[error("component selection failed: {0}")]
    Selection(#[source] SelectionError),

    /// The renderer failed to produce markup.
    #[error("rendering failed: {0}")]
    Render(#[source] RenderError),

    /// A fragment-only route received a request without the trigger header.
    /// Maps to a 400 at the framework boundary.
    #[error("this route only accepts fragment requests")]
    FragmentOnly,
}

impl DispatchError {
    /// The original handler error, if that is what this is.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            DispatchError::Handler(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true if this is a selection failure.
    pub fn is_selection(&self) -> bool {
        matches!(self, DispatchError::Selection(_))
    }

    /// Returns true if this is a rendering failure.
    pub fn is_render(&self) -> bool {
        matches!(self, DispatchError::Render(_))
    }
}

/// Error returned when a dispatcher is built with pieces missing.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No component selector was configured.
    #[error("no component selector was configured for this route")]
    MissingSelector,

    /// No renderer was configured.
    #[error("no renderer was configured for this route")]
    MissingRenderer,
}

/// Wraps a route handler with render-or-passthrough dispatch.
///
/// All configuration happens once, at build time; the dispatcher itself is
/// immutable and cheap to clone, so one instance serves concurrent requests.
///
/// `T` is the handler's output type, `C` the component target type shared by
/// the selectors and the renderer.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder(handler_fn(list_todos))
///     .component(Template::new("todos/list.html"))
///     .renderer(jinja.renderer())
///     .build()?;
///
/// // Per request, with the framework's resolved dependencies:
/// let outcome = dispatcher.dispatch(request, deps).await?;
/// ```
pub struct Dispatcher<T, C> {
    handler: Arc<dyn Handler<Output = T>>,
    selector: Arc<dyn ComponentSelector<T, Target = C>>,
    error_selector: Option<Arc<dyn ComponentSelector<T, Target = C>>>,
    renderer: Arc<dyn Renderer<C>>,
    processors: Vec<RequestProcessor>,
    mode: DispatchMode,
    fragment_only: bool,
}

impl<T, C> Clone for Dispatcher<T, C> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            selector: self.selector.clone(),
            error_selector: self.error_selector.clone(),
            renderer: self.renderer.clone(),
            processors: self.processors.clone(),
            mode: self.mode,
            fragment_only: self.fragment_only,
        }
    }
}

impl<T, C> Dispatcher<T, C>
where
    T: serde::Serialize + Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    /// Starts building a dispatcher around the given handler.
    pub fn builder<H>(handler: H) -> DispatcherBuilder<T, C>
    where
        H: Handler<Output = T> + 'static,
    {
        DispatcherBuilder {
            handler: Arc::new(handler),
            selector: None,
            error_selector: None,
            renderer: None,
            processors: Vec::new(),
            mode: DispatchMode::Fragment,
            fragment_only: false,
        }
    }

    /// Runs one request through the pipeline.
    ///
    /// `deps` is whatever the framework resolved for the route's parameters -
    /// possibly partial if resolution itself was cut short; error rendering
    /// works with what is there.
    pub async fn dispatch(
        &self,
        request: RequestParts,
        deps: DependencyContext,
    ) -> Result<DispatchOutcome<T>, DispatchError> {
        let request = Arc::new(request);
        let render = self.mode.wants_render(&request);
        debug!(
            path = request.path(),
            mode = ?self.mode,
            render,
            "dispatching route"
        );

        if self.fragment_only && !render {
            return Err(DispatchError::FragmentOnly);
        }

        let outcome = self.handler.call(request.clone(), deps.clone()).await;

        if !render {
            // Passthrough: the result or the error, exactly as the
            // undecorated handler produced it.
            return match outcome {
                Ok(reply) => Ok(DispatchOutcome::Data(reply)),
                Err(error) => Err(DispatchError::Handler(error)),
            };
        }

        match outcome {
            Ok(reply) => {
                let target = self
                    .selector
                    .select(&request, Some(reply.data()), None)
                    .map_err(DispatchError::Selection)?;
                let result = serde_json::to_value(reply.data())
                    .map_err(|e| DispatchError::Render(RenderError::from(e)))?;
                let context = self.assemble(request, &deps)?;
                let markup = self
                    .renderer
                    .render(&target, &result, &context)
                    .await
                    .map_err(DispatchError::Render)?;

                let mut response = HtmlResponse::new(markup);
                if let Some(status) = reply.status() {
                    response = response.with_status(status);
                }
                response = response.with_headers(reply.headers());
                Ok(DispatchOutcome::Markup(response))
            }
            Err(error) => {
                let Some(error_selector) = &self.error_selector else {
                    return Err(DispatchError::Handler(error));
                };
                let target = match error_selector.select(&request, None, Some(&error)) {
                    Ok(target) => target,
                    Err(declined) => {
                        // The selector cannot render this error; the original
                        // failure propagates unchanged.
                        debug!(reason = %declined, "error selector declined");
                        return Err(DispatchError::Handler(error));
                    }
                };
                let context = self.assemble(request, &deps)?;
                let markup = self
                    .renderer
                    .render_error(&target, &error, &context)
                    .await
                    .map_err(DispatchError::Render)?;
                Ok(DispatchOutcome::Markup(HtmlResponse::new(markup)))
            }
        }
    }

    fn assemble(
        &self,
        request: Arc<RequestParts>,
        deps: &DependencyContext,
    ) -> Result<RenderContext, DispatchError> {
        // A failing processor is a handler-tier error.
        RenderContext::assemble(request, deps, &self.processors).map_err(DispatchError::Handler)
    }
}

/// Builder for [`Dispatcher`].
///
/// A selector and a renderer are required; everything else has defaults
/// (fragment mode, no error selector, no processors).
pub struct DispatcherBuilder<T, C> {
    handler: Arc<dyn Handler<Output = T>>,
    selector: Option<Arc<dyn ComponentSelector<T, Target = C>>>,
    error_selector: Option<Arc<dyn ComponentSelector<T, Target = C>>>,
    renderer: Option<Arc<dyn Renderer<C>>>,
    processors: Vec<RequestProcessor>,
    mode: DispatchMode,
    fragment_only: bool,
}

impl<T, C> DispatcherBuilder<T, C>
where
    T: serde::Serialize + Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    /// Sets the dispatch mode.
    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Renders every request, skipping classification.
    pub fn page(self) -> Self {
        self.mode(DispatchMode::Page)
    }

    /// Rejects requests without the trigger header instead of serving data.
    pub fn fragment_only(mut self) -> Self {
        self.fragment_only = true;
        self
    }

    /// Sets the component selector for the success path.
    pub fn selector<S>(mut self, selector: S) -> Self
    where
        S: ComponentSelector<T, Target = C> + 'static,
    {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Shorthand: always render the given target.
    pub fn component(self, target: C) -> Self
    where
        C: Clone,
    {
        self.selector(crate::selector::Fixed::new(target))
    }

    /// Sets the component selector for the error path.
    pub fn error_selector<S>(mut self, selector: S) -> Self
    where
        S: ComponentSelector<T, Target = C> + 'static,
    {
        self.error_selector = Some(Arc::new(selector));
        self
    }

    /// Shorthand: render every handler error with the given target.
    pub fn error_component(self, target: C) -> Self
    where
        C: Clone,
    {
        self.error_selector(crate::selector::Fixed::new(target))
    }

    /// Sets the renderer.
    pub fn renderer<R>(mut self, renderer: R) -> Self
    where
        R: Renderer<C> + 'static,
    {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Registers a request processor. Processors run in registration order;
    /// later ones override earlier keys.
    pub fn processor(mut self, processor: RequestProcessor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Result<Dispatcher<T, C>, BuildError> {
        Ok(Dispatcher {
            handler: self.handler,
            selector: self.selector.ok_or(BuildError::MissingSelector)?,
            error_selector: self.error_selector,
            renderer: self.renderer.ok_or(BuildError::MissingRenderer)?,
            processors: self.processors,
            mode: self.mode,
            fragment_only: self.fragment_only,
        })
    }
}
