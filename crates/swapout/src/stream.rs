//! Ordered fragment streaming.
//!
//! Slow fragments should not serialize a whole page: independent pieces of
//! markup resolve concurrently, but the bytes a client sees must follow the
//! document structure. [`FragmentSequence`] does exactly that - fragments run
//! in the background up to a concurrency limit and are emitted strictly in
//! the order they were pushed, never in completion order.
//!
//! [`SequenceRenderer`] lifts the same behavior into the [`Renderer`]
//! contract so a dispatched route can render a list of components
//! concurrently, either collected into one response body or streamed
//! incrementally by the surrounding framework.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::component::ComponentFn;
use swapout_dispatch::{RenderContext, RenderError, Renderer};

/// A markup fragment still being resolved.
pub type FragmentFuture = BoxFuture<'static, Result<String, RenderError>>;

/// Boxes an async block as a [`FragmentFuture`].
pub fn fragment<Fut>(fut: Fut) -> FragmentFuture
where
    Fut: std::future::Future<Output = Result<String, RenderError>> + Send + 'static,
{
    Box::pin(fut)
}

/// Default number of fragments resolved concurrently.
const DEFAULT_CONCURRENCY: usize = 8;

/// Fragments in document order, resolved concurrently, emitted in order.
///
/// # Example
///
/// ```rust,ignore
/// let mut sequence = FragmentSequence::new();
/// sequence.push(fragment(render_header(user)));
/// sequence.push(fragment(render_feed(user)));
/// sequence.push(fragment(render_footer()));
///
/// // Items arrive header, feed, footer - however long each takes.
/// let mut stream = sequence.into_stream();
/// while let Some(chunk) = stream.next().await {
///     body.send(chunk?).await?;
/// }
/// ```
pub struct FragmentSequence {
    parts: Vec<FragmentFuture>,
    concurrency: usize,
}

impl FragmentSequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limits how many fragments resolve at once (at least one).
    pub fn buffer_size(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Appends a fragment at the end of the document order.
    pub fn push(&mut self, fragment: FragmentFuture) {
        self.parts.push(fragment);
    }

    /// Chaining variant of [`push`](Self::push).
    pub fn with(mut self, fragment: FragmentFuture) -> Self {
        self.push(fragment);
        self
    }

    /// The number of fragments queued.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if no fragments are queued.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Turns the sequence into a stream of markup chunks.
    ///
    /// Up to `buffer_size` fragments are polled concurrently; output order is
    /// push order. A failing fragment ends the stream with its error.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, RenderError>> + Send {
        stream::iter(self.parts).buffered(self.concurrency)
    }

    /// Resolves every fragment and concatenates the markup.
    pub async fn collect(self) -> Result<String, RenderError> {
        let parts: Vec<String> = self.into_stream().try_collect().await?;
        Ok(parts.concat())
    }
}

impl Default for FragmentSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a sequence of components concurrently, in document order.
///
/// The target is the component list itself: every component receives the
/// same result value and context, and the outputs are joined in list order.
/// Use [`render_stream`](Self::render_stream) when the framework supports
/// incremental response bodies.
#[derive(Debug, Clone, Copy)]
pub struct SequenceRenderer {
    concurrency: usize,
}

impl SequenceRenderer {
    /// Creates a sequence renderer with the default concurrency.
    pub fn new() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limits how many components resolve at once (at least one).
    pub fn buffer_size(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Streams each component's markup in list order.
    pub fn render_stream(
        &self,
        targets: &[ComponentFn],
        result: &Value,
        context: &RenderContext,
    ) -> impl Stream<Item = Result<String, RenderError>> + Send {
        let futures: Vec<FragmentFuture> = targets
            .iter()
            .map(|component| component(result.clone(), context.clone()))
            .collect();
        stream::iter(futures).buffered(self.concurrency)
    }
}

impl Default for SequenceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Renderer<Vec<ComponentFn>> for SequenceRenderer {
    async fn render(
        &self,
        target: &Vec<ComponentFn>,
        result: &Value,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        let parts: Vec<String> = self
            .render_stream(target, result, context)
            .try_collect()
            .await?;
        Ok(parts.concat())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::component;
    use http::{HeaderMap, Method, Uri};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use swapout_dispatch::{DependencyContext, RequestParts};
    use tokio::time::sleep;

    fn context() -> RenderContext {
        let request = Arc::new(RequestParts::new(
            Method::GET,
            Uri::from_static("/feed"),
            HeaderMap::new(),
        ));
        RenderContext::assemble(request, &DependencyContext::new(), &[]).unwrap()
    }

    fn slow_fragment(markup: &'static str, delay_ms: u64) -> FragmentFuture {
        fragment(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            Ok(markup.to_string())
        })
    }

    #[tokio::test]
    async fn test_fragments_emit_in_document_order() {
        // Completion order would be comp2, comp3, comp1.
        let sequence = FragmentSequence::new()
            .with(slow_fragment("<comp1/>", 30))
            .with(slow_fragment("<comp2/>", 10))
            .with(slow_fragment("<comp3/>", 20));

        let chunks: Vec<String> = sequence.into_stream().try_collect().await.unwrap();
        assert_eq!(chunks, vec!["<comp1/>", "<comp2/>", "<comp3/>"]);
    }

    #[tokio::test]
    async fn test_fragments_resolve_concurrently() {
        use tokio::time::Instant;

        let sequence = FragmentSequence::new()
            .with(slow_fragment("a", 40))
            .with(slow_fragment("b", 40))
            .with(slow_fragment("c", 40));

        let started = Instant::now();
        let body = sequence.collect().await.unwrap();
        assert_eq!(body, "abc");
        // Three 40ms fragments resolved together, not back to back.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_buffer_size_one_still_ordered() {
        let sequence = FragmentSequence::new()
            .buffer_size(1)
            .with(slow_fragment("a", 10))
            .with(slow_fragment("b", 1));

        let body = sequence.collect().await.unwrap();
        assert_eq!(body, "ab");
    }

    #[tokio::test]
    async fn test_failing_fragment_ends_the_stream() {
        let sequence = FragmentSequence::new()
            .with(slow_fragment("a", 1))
            .with(fragment(async {
                Err::<String, _>(RenderError::Component("boom".into()))
            }));

        let err = sequence.collect().await.unwrap_err();
        assert!(matches!(err, RenderError::Component(_)));
    }

    #[tokio::test]
    async fn test_empty_sequence_collects_empty() {
        let sequence = FragmentSequence::new();
        assert!(sequence.is_empty());
        assert_eq!(sequence.collect().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_sequence_renderer_joins_components_in_order() {
        let header = component(|result, _context| async move {
            sleep(Duration::from_millis(30)).await;
            Ok(format!("<h1>{}</h1>", result["title"].as_str().unwrap_or("")))
        });
        let body = component(|result, _context| async move {
            sleep(Duration::from_millis(5)).await;
            Ok(format!("<p>{}</p>", result["body"].as_str().unwrap_or("")))
        });

        let renderer = SequenceRenderer::new();
        let output = renderer
            .render(
                &vec![header, body],
                &json!({"title": "hi", "body": "there"}),
                &context(),
            )
            .await
            .unwrap();
        assert_eq!(output, "<h1>hi</h1><p>there</p>");
    }
}
