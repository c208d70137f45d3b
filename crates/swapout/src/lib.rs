//! # Swapout - one route, data or markup
//!
//! Swapout lets the same route handler serve a JSON API and an htmx-style
//! hypermedia UI. The handler returns typed data; per request, the
//! dispatcher either passes that data through untouched or renders it to
//! HTML through a selected component:
//!
//! - Requests carrying `HX-Request: true` get rendered markup
//! - Every other request gets the raw result, encoded by your framework
//! - Page routes render unconditionally
//!
//! The dispatch core (classification, selection, context assembly, the
//! response contract) lives in `swapout-dispatch` and is re-exported here.
//! This crate adds the engine adapters:
//!
//! - [`Jinja`] / [`JinjaRenderer`]: MiniJinja templates with name
//!   composition and pluggable result shaping
//! - [`component`] / [`ComponentRenderer`]: async component functions in
//!   plain Rust
//! - [`FragmentSequence`] / [`SequenceRenderer`]: concurrent fragment
//!   resolution with document-order output
//!
//! ## Quick start
//!
//! ```rust
//! use minijinja::Environment;
//! use swapout::{handler_fn, DependencyContext, Jinja, RequestParts};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let mut env = Environment::new();
//! env.add_template(
//!     "list.html",
//!     "<ul>{% for item in items %}<li>{{ item }}</li>{% endfor %}</ul>",
//! )
//! .unwrap();
//!
//! let jinja = Jinja::new(env);
//!
//! // The handler only knows about data.
//! let list_todos = handler_fn(|_req: Arc<RequestParts>, _deps: DependencyContext| async {
//!     Ok::<_, anyhow::Error>(vec!["walk the dog", "water the plants"])
//! });
//!
//! let route = jinja.fragment(list_todos, "list.html").build().unwrap();
//!
//! // A fragment request renders; a plain request would pass the Vec through.
//! let request = RequestParts::new(
//!     http::Method::GET,
//!     http::Uri::from_static("/todos"),
//!     [(http::header::HeaderName::from_static("hx-request"),
//!       http::HeaderValue::from_static("true"))]
//!         .into_iter()
//!         .collect(),
//! );
//! let outcome = route.dispatch(request, DependencyContext::new()).await.unwrap();
//! assert!(outcome.is_markup());
//! # });
//! ```
//!
//! ## Error pages
//!
//! A handler error on the render path can be turned into markup by wiring an
//! error component; everywhere else errors propagate exactly as the
//! undecorated handler would have raised them:
//!
//! ```rust,ignore
//! let route = jinja
//!     .fragment(load_todo, "todos/detail.html")
//!     .error_selector(
//!         HeaderSelector::new("x-error-view", [("inline", Template::new("errors/inline.html"))])
//!             .with_default(Template::new("errors/panel.html"))
//!             .on_errors_of::<NotFound>(),
//!     )
//!     .build()?;
//! ```

mod component;
mod jinja;
mod stream;

pub use component::{component, ComponentFn, ComponentRenderer};

pub use jinja::{unpack_result, wrap_as, ContextFactory, Jinja, JinjaRenderer, Template};

pub use stream::{fragment, FragmentFuture, FragmentSequence, SequenceRenderer};

// The dispatch core is part of the public surface.
pub use swapout_dispatch::*;
