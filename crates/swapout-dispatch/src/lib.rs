//! Render-or-passthrough dispatch for hypermedia-driven routes.
//!
//! `swapout-dispatch` wraps a route handler so the same business logic serves
//! both a data API and an htmx-style UI. Per request, the dispatcher either
//! returns the handler's typed result untouched or renders it to markup
//! through a pluggable component selector and renderer.
//!
//! # Features
//!
//! - **Request classification**: the `HX-Request` trigger header decides
//!   render vs passthrough; page mode renders unconditionally
//! - **Component selection**: fixed targets, header-driven lookup tables
//!   with defaults, or custom selection functions - with an explicit
//!   contract for error-page selection
//! - **Context assembly**: route dependencies plus request processors merged
//!   with documented override precedence
//! - **Response fidelity**: status codes and headers set by the handler
//!   survive rendering
//!
//! This crate is engine-agnostic: it defines the [`Renderer`] capability and
//! leaves template engines and component trees to adapter crates (see
//! `swapout` for the MiniJinja and component-function adapters).
//!
//! # Dispatch flow
//!
//! ```text
//! request + resolved dependencies
//!   → invoke handler
//!   → classify (trigger header; skipped in page mode)
//!   → passthrough: raw result or error, untouched
//!   → render:     selector → context assembly → renderer → HtmlResponse
//! ```
//!
//! On the render path a failed handler is offered to the error selector
//! once; if it declines, the original error propagates exactly as an
//! undecorated route would have raised it.

// Core modules
mod context;
mod dispatch;
mod handler;
mod render;
mod reply;
mod request;
mod selector;

// Re-export core types
pub use context::{
    processor, ContextMap, DependencyContext, RenderContext, RequestProcessor,
};

pub use dispatch::{BuildError, DispatchError, Dispatcher, DispatcherBuilder};

pub use handler::{handler_fn, FnHandler, Handler, HandlerResult, IntoReply};

pub use render::{render_with, RenderError, RenderWith, Renderer};

pub use reply::{DispatchOutcome, HtmlResponse, Reply};

pub use request::{
    is_fragment_request, DispatchMode, RequestParts, HX_REQUEST,
};

pub use selector::{
    select_with, ComponentSelector, ErrorPredicate, Fixed, HeaderSelector, SelectWith,
    SelectionError,
};
