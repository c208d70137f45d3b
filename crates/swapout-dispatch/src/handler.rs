//! Route handler types.
//!
//! Handlers are the business logic layer: they receive the request metadata
//! and the route's resolved dependencies, and they return data. They know
//! nothing about rendering - whether their output becomes JSON or markup is
//! decided per request by the dispatcher wrapping them.
//!
//! Sync and async logic are handled uniformly: the [`Handler`] contract is
//! async, and a handler that never suspends simply resolves on first poll.
//! Closures adapt via [`handler_fn`].

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::context::DependencyContext;
use crate::reply::Reply;
use crate::request::RequestParts;

/// The result type for route handlers.
///
/// `anyhow::Error` is the error currency: the dispatcher never inspects
/// handler errors beyond handing them to an error selector, and `anyhow`
/// keeps the concrete type available for downcasting there.
pub type HandlerResult<T> = Result<Reply<T>, anyhow::Error>;

/// A wrapped route handler.
///
/// The output must be `Serialize` because on the render path it is converted
/// once to a JSON value for the renderer. Handlers are shared across
/// concurrent requests.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The data this handler produces.
    type Output: Serialize + Send + Sync;

    /// Executes the handler for one request.
    async fn call(
        &self,
        request: Arc<RequestParts>,
        deps: DependencyContext,
    ) -> HandlerResult<Self::Output>;
}

/// Trait for types that can be converted into a [`HandlerResult`].
///
/// This lets handler closures return either `Result<T, E>` directly
/// (auto-wrapped in a [`Reply`] with no response overrides) or the explicit
/// [`HandlerResult<T>`] when they need to set a status code or headers.
pub trait IntoReply<T> {
    /// Converts this value into a [`HandlerResult<T>`].
    fn into_reply(self) -> HandlerResult<T>;
}

/// `Result<T, E>` is auto-wrapped in a [`Reply`] with no overrides.
impl<T, E> IntoReply<T> for Result<T, E>
where
    T: Serialize,
    E: Into<anyhow::Error>,
{
    fn into_reply(self) -> HandlerResult<T> {
        self.map(Reply::new).map_err(Into::into)
    }
}

/// `HandlerResult<T>` passes through unchanged.
impl<T> IntoReply<T> for HandlerResult<T> {
    fn into_reply(self) -> HandlerResult<T> {
        self
    }
}

/// An infallible [`Reply`] converts directly.
impl<T> IntoReply<T> for Reply<T> {
    fn into_reply(self) -> HandlerResult<T> {
        Ok(self)
    }
}

/// A [`Handler`] backed by an async closure.
///
/// Built with [`handler_fn`]; the phantom parameters pin down the closure's
/// future and return types so the blanket impl stays coherent.
pub struct FnHandler<F, Fut, R, T> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, R, T)>,
}

/// Wraps an async closure as a [`Handler`].
///
/// The closure receives the request metadata and the resolved dependencies
/// and may return `Result<T, E>`, a bare [`Reply`], or a full
/// [`HandlerResult`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use swapout_dispatch::{handler_fn, DependencyContext, RequestParts};
///
/// let handler = handler_fn(|_request: Arc<RequestParts>, deps: DependencyContext| async move {
///     let user: String = deps.parse("user")?;
///     Ok::<_, anyhow::Error>(vec![format!("{user}'s first todo")])
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut, R, T>(f: F) -> FnHandler<F, Fut, R, T>
where
    F: Fn(Arc<RequestParts>, DependencyContext) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: IntoReply<T>,
    T: Serialize + Send + Sync,
{
    FnHandler {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, R, T> Handler for FnHandler<F, Fut, R, T>
where
    F: Fn(Arc<RequestParts>, DependencyContext) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: IntoReply<T> + Send,
    T: Serialize + Send + Sync,
{
    type Output = T;

    async fn call(
        &self,
        request: Arc<RequestParts>,
        deps: DependencyContext,
    ) -> HandlerResult<T> {
        (self.f)(request, deps).await.into_reply()
    }
}
