//! Rendering context assembly.
//!
//! Renderers see a [`RenderContext`]: every dependency the framework resolved
//! for the route, plus whatever the registered request processors contribute,
//! plus the current request itself. Assembly happens once per render, on the
//! render path only.
//!
//! # Override precedence
//!
//! The context starts from the dependency values and then applies each
//! request processor in registration order. A later entry always overrides an
//! earlier one with the same key, so processors win over dependency values
//! and later processors win over earlier ones. The current request is not a
//! key at all - it travels next to the map, out of reach of collisions.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::request::RequestParts;

/// An ordered string-keyed value map with last-write-wins semantics.
///
/// Insertion order is preserved; inserting an existing key replaces its value
/// in place. This is the currency of context assembly - small, deterministic,
/// and cheap to merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextMap {
    entries: Vec<(String, Value)>,
}

impl ContextMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any existing entry with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Chaining variant of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns true if the map contains `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Merges another map on top of this one.
    ///
    /// Every entry of `other` is inserted in order, so `other` wins on key
    /// collisions.
    pub fn merge(&mut self, other: ContextMap) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Converts the map into a JSON object map for serialization.
    pub fn into_json_map(self) -> serde_json::Map<String, Value> {
        self.entries.into_iter().collect()
    }
}

impl FromIterator<(String, Value)> for ContextMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = ContextMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// The route's resolved dependencies for one invocation.
///
/// Built by the surrounding framework before dispatch: one entry per declared
/// route parameter, keyed by parameter name. When the handler fails mid-way,
/// whatever was resolved up to that point is still valid input for error
/// rendering - partial contexts are expected.
///
/// # Example
///
/// ```rust
/// use swapout_dispatch::DependencyContext;
///
/// let deps = DependencyContext::new()
///     .with("user", &"alice")?
///     .with("page", &3)?;
///
/// assert_eq!(deps.parse::<u32>("page")?, 3);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyContext {
    params: ContextMap,
}

impl DependencyContext {
    /// Creates an empty dependency context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an already-serialized parameter value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.params.insert(name, value);
    }

    /// Chaining variant of [`insert`](Self::insert).
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Serializes and inserts a parameter value.
    pub fn with<T: Serialize>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        self.params.insert(name, serde_json::to_value(value)?);
        Ok(self)
    }

    /// Returns the resolved value for a parameter, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Returns the resolved value for a parameter, or an error naming it.
    pub fn required(&self, name: &str) -> anyhow::Result<&Value> {
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("dependency missing: `{name}` was not resolved for this route"))
    }

    /// Deserializes the resolved value for a parameter into a concrete type.
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let value = self.required(name)?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("dependency `{name}` has an unexpected shape: {e}"))
    }

    /// The number of resolved parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameters were resolved.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The underlying parameter map.
    pub fn values(&self) -> &ContextMap {
        &self.params
    }
}

/// A function contributing extra context entries from the current request.
///
/// Processors run in registration order during context assembly; a failing
/// processor aborts the dispatch like a failing handler would. They must not
/// mutate shared state - the same processor serves concurrent requests.
pub type RequestProcessor =
    Arc<dyn Fn(&RequestParts) -> anyhow::Result<ContextMap> + Send + Sync>;

/// Wraps a closure as a [`RequestProcessor`].
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use swapout_dispatch::{processor, ContextMap};
///
/// let theme = processor(|request| {
///     let dark = request.header("x-theme").is_some_and(|v| v == "dark");
///     Ok(ContextMap::new().with("dark_mode", json!(dark)))
/// });
/// ```
pub fn processor<F>(f: F) -> RequestProcessor
where
    F: Fn(&RequestParts) -> anyhow::Result<ContextMap> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The fully assembled per-request rendering context.
///
/// Holds the merged value map and a handle to the current request. The
/// request deliberately lives outside the key space so no processor can
/// shadow it.
#[derive(Clone)]
pub struct RenderContext {
    request: Arc<RequestParts>,
    values: ContextMap,
}

impl RenderContext {
    /// Builds the context for one render: dependency values first, then each
    /// processor's output in registration order, later entries overriding
    /// earlier ones.
    ///
    /// A processor failure is reported as-is; the dispatcher treats it like a
    /// handler failure.
    pub fn assemble(
        request: Arc<RequestParts>,
        deps: &DependencyContext,
        processors: &[RequestProcessor],
    ) -> anyhow::Result<Self> {
        let mut values = deps.values().clone();
        for processor in processors {
            values.merge(processor(&request)?);
        }
        Ok(Self { request, values })
    }

    /// The current request.
    pub fn request(&self) -> &RequestParts {
        &self.request
    }

    /// The merged context values.
    pub fn values(&self) -> &ContextMap {
        &self.values
    }

    /// Returns the context value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("path", &self.request.path())
            .field("keys", &self.values.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}
