//! MiniJinja engine adapter.
//!
//! Bridges the dispatch core to MiniJinja: selectors resolve [`Template`]
//! names, [`JinjaRenderer`] turns them into markup, and [`Jinja`] is the
//! route-wiring sugar that owns the engine plus shared configuration.
//!
//! # Template context
//!
//! The rendering context handed to a template is built in layers, later
//! layers overriding earlier keys:
//!
//! 1. the route's dependency values and request processor output (as
//!    assembled by the dispatch core),
//! 2. the route result, shaped by the configured [`ContextFactory`],
//! 3. the reserved `request` object (method, path, query, headers).
//!
//! Engine errors never leak: they are mapped into [`RenderError`] at this
//! boundary so the public error surface stays engine-free.

use std::sync::Arc;

use async_trait::async_trait;
use minijinja::Environment;
use serde_json::{json, Value};
use tracing::debug;

use swapout_dispatch::{
    ContextMap, Dispatcher, DispatcherBuilder, Handler, RenderContext, RenderError, Renderer,
    RequestParts, RequestProcessor,
};

/// A template name to render, resolved by a component selector.
///
/// Relative names participate in the renderer's prefix/suffix composition;
/// rooted names are used verbatim. Rooting a name is how a route opts out of
/// a directory-wide prefix for one special template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    name: String,
    rooted: bool,
}

impl Template {
    /// A template name subject to prefix/suffix composition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rooted: false,
        }
    }

    /// A template name exempt from prefix/suffix composition.
    pub fn rooted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rooted: true,
        }
    }

    /// The raw template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this name skips composition.
    pub fn is_rooted(&self) -> bool {
        self.rooted
    }
}

impl From<&str> for Template {
    fn from(name: &str) -> Self {
        Template::new(name)
    }
}

impl From<String> for Template {
    fn from(name: String) -> Self {
        Template::new(name)
    }
}

/// Shapes a route result into template context entries.
///
/// The factory only sees the result; dependency values and processor output
/// are merged by the renderer itself.
pub type ContextFactory = Arc<dyn Fn(&Value) -> Result<ContextMap, RenderError> + Send + Sync>;

/// The default result shape: spread objects, wrap collections.
///
/// - objects contribute their fields as top-level keys,
/// - arrays land under `items`,
/// - unit results (`null`) contribute nothing,
/// - scalars are an error - wrap them with [`wrap_as`] instead.
pub fn unpack_result() -> ContextFactory {
    Arc::new(|result| match result {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()),
        Value::Array(_) => Ok(ContextMap::new().with("items", result.clone())),
        Value::Null => Ok(ContextMap::new()),
        other => Err(RenderError::Other(format!(
            "cannot build a template context from a scalar result: {other}"
        ))),
    })
}

/// Puts the whole route result under a single key.
///
/// # Example
///
/// ```rust
/// use swapout::wrap_as;
///
/// // Templates see the result as `{{ todo }}`.
/// let factory = wrap_as("todo");
/// # let _ = factory;
/// ```
pub fn wrap_as(key: impl Into<String>) -> ContextFactory {
    let key = key.into();
    Arc::new(move |result| Ok(ContextMap::new().with(key.clone(), result.clone())))
}

/// Maps engine errors into the dispatch core's error type.
fn engine_error(err: minijinja::Error) -> RenderError {
    match err.kind() {
        minijinja::ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(err.to_string()),
        minijinja::ErrorKind::BadSerialization => RenderError::Serialization(err.to_string()),
        _ => RenderError::Template(err.to_string()),
    }
}

/// The reserved `request` object templates can read.
fn request_value(request: &RequestParts) -> Value {
    let headers: serde_json::Map<String, Value> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), Value::String(v.to_string())))
        })
        .collect();

    json!({
        "method": request.method().as_str(),
        "path": request.path(),
        "query": request.query(),
        "headers": headers,
    })
}

/// Renders [`Template`] targets with a shared MiniJinja environment.
#[derive(Clone)]
pub struct JinjaRenderer {
    env: Arc<Environment<'static>>,
    prefix: Option<String>,
    suffix: Option<String>,
    factory: ContextFactory,
}

impl JinjaRenderer {
    /// Creates a renderer over the given environment with the default
    /// context factory and no name composition.
    pub fn new(env: Arc<Environment<'static>>) -> Self {
        Self {
            env,
            prefix: None,
            suffix: None,
            factory: unpack_result(),
        }
    }

    /// Prepends a directory prefix to non-rooted template names.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Appends a suffix (typically an extension) to non-rooted template
    /// names that don't already carry it.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Replaces the result-shaping context factory.
    pub fn with_context_factory(mut self, factory: ContextFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Resolves a template target into the full engine lookup name.
    fn resolve_name(&self, template: &Template) -> String {
        let name = template.name().trim_start_matches('/');
        if template.is_rooted() {
            return name.to_string();
        }

        let mut resolved = match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), name),
            None => name.to_string(),
        };
        if let Some(suffix) = &self.suffix {
            if !resolved.ends_with(suffix.as_str()) {
                resolved.push_str(suffix);
            }
        }
        resolved
    }

    /// Renders the resolved template with shaped entries merged over the
    /// assembled context, plus the reserved `request` object.
    fn render_shaped(
        &self,
        template: &Template,
        shaped: ContextMap,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        let name = self.resolve_name(template);
        debug!(template = %name, "rendering template");

        let tmpl = self.env.get_template(&name).map_err(engine_error)?;

        let mut merged = context.values().clone();
        merged.merge(shaped);
        let mut map = merged.into_json_map();
        map.insert("request".to_string(), request_value(context.request()));

        tmpl.render(Value::Object(map)).map_err(engine_error)
    }
}

#[async_trait]
impl Renderer<Template> for JinjaRenderer {
    async fn render(
        &self,
        target: &Template,
        result: &Value,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        let shaped = (self.factory)(result)?;
        self.render_shaped(target, shaped, context)
    }

    async fn render_error(
        &self,
        target: &Template,
        error: &anyhow::Error,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        // The error is not a route result, so it bypasses the context
        // factory and lands under the reserved `error` key.
        let shaped = ContextMap::new().with(
            "error",
            json!({ "message": error.to_string() }),
        );
        self.render_shaped(target, shaped, context)
    }
}

/// MiniJinja wiring for dispatched routes.
///
/// Owns the engine and the configuration shared by every route it wires:
/// name composition, the context factory, request processors, and the
/// fragment-only policy. [`fragment`](Self::fragment) and
/// [`page`](Self::page) hand back a pre-wired [`DispatcherBuilder`] so a
/// route can still attach an error template or a custom selector before
/// building.
///
/// # Example
///
/// ```rust,ignore
/// let mut env = Environment::new();
/// env.set_loader(minijinja::path_loader("templates"));
///
/// let jinja = Jinja::new(env).with_prefix("todos");
///
/// let list = jinja
///     .fragment(handler_fn(list_todos), "list.html")
///     .error_component(Template::rooted("error.html"))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct Jinja {
    env: Arc<Environment<'static>>,
    prefix: Option<String>,
    suffix: Option<String>,
    factory: ContextFactory,
    processors: Vec<RequestProcessor>,
    fragment_only: bool,
}

impl Jinja {
    /// Wraps a MiniJinja environment.
    pub fn new(env: Environment<'static>) -> Self {
        Self {
            env: Arc::new(env),
            prefix: None,
            suffix: None,
            factory: unpack_result(),
            processors: Vec::new(),
            fragment_only: false,
        }
    }

    /// Prepends a directory prefix to non-rooted template names.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Appends a suffix to non-rooted template names.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Replaces the default context factory for every route wired here.
    pub fn with_context_factory(mut self, factory: ContextFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Registers a request processor for every route wired here.
    pub fn with_processor(mut self, processor: RequestProcessor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Makes every fragment route reject non-fragment requests.
    pub fn fragment_only(mut self) -> Self {
        self.fragment_only = true;
        self
    }

    /// A renderer sharing this instance's engine and configuration.
    pub fn renderer(&self) -> JinjaRenderer {
        let mut renderer = JinjaRenderer::new(self.env.clone())
            .with_context_factory(self.factory.clone());
        if let Some(prefix) = &self.prefix {
            renderer = renderer.with_prefix(prefix.clone());
        }
        if let Some(suffix) = &self.suffix {
            renderer = renderer.with_suffix(suffix.clone());
        }
        renderer
    }

    /// Wires a bimodal route: markup for fragment requests, raw data
    /// otherwise.
    pub fn fragment<H>(
        &self,
        handler: H,
        template: impl Into<Template>,
    ) -> DispatcherBuilder<H::Output, Template>
    where
        H: Handler + 'static,
        H::Output: 'static,
    {
        let mut builder = Dispatcher::builder(handler)
            .component(template.into())
            .renderer(self.renderer());
        for processor in &self.processors {
            builder = builder.processor(processor.clone());
        }
        if self.fragment_only {
            builder = builder.fragment_only();
        }
        builder
    }

    /// Wires a page route: markup for every request.
    pub fn page<H>(
        &self,
        handler: H,
        template: impl Into<Template>,
    ) -> DispatcherBuilder<H::Output, Template>
    where
        H: Handler + 'static,
        H::Output: 'static,
    {
        let mut builder = Dispatcher::builder(handler)
            .component(template.into())
            .renderer(self.renderer())
            .page();
        for processor in &self.processors {
            builder = builder.processor(processor.clone());
        }
        builder
    }
}
