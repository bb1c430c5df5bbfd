//! Binding configuration and the flat binding table built from it.
//!
//! Users describe bindings as nested objects (`{ env: { MODE: "production" } }`);
//! [`BindingTable::build`] flattens them into dotted access paths
//! (`"env.MODE"`) once per build, rejecting malformed configuration before
//! any module is analysed.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::error::ConfigError;
use crate::literal::{LiteralValue, Value};

pub const PATH_SEPARATOR: char = '.';

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure reported by a resolver. Never escapes the analyzer; it becomes an
/// error diagnostic on the call expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResolverError {
    message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("resolver panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("resolver panicked: {}", s)
        } else {
            "resolver panicked".to_string()
        };
        Self { message }
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type ResolverResult = Result<Value, ResolverError>;

/// Positional arguments: `None` marks an argument that was not a literal.
pub type SyncResolverFn = dyn Fn(&[Option<LiteralValue>]) -> ResolverResult + Send + Sync;
pub type AsyncResolverFn =
    dyn Fn(Vec<Option<LiteralValue>>) -> BoxFuture<'static, ResolverResult> + Send + Sync;

#[derive(Clone)]
pub enum Resolver {
    Sync(Arc<SyncResolverFn>),
    Async(Arc<AsyncResolverFn>),
}

impl Resolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Option<LiteralValue>]) -> ResolverResult + Send + Sync + 'static,
    {
        Resolver::Sync(Arc::new(f))
    }

    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Option<LiteralValue>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Resolver::Async(Arc::new(move |args| f(args).boxed()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Resolver::Async(_))
    }

    /// Invokes the resolver on the current thread. Async resolvers are
    /// driven to completion with a local executor.
    pub(crate) fn call(&self, args: Vec<Option<LiteralValue>>) -> ResolverResult {
        match self {
            Resolver::Sync(f) => panic::catch_unwind(AssertUnwindSafe(|| f(&args)))
                .unwrap_or_else(|payload| Err(ResolverError::from_panic(payload))),
            Resolver::Async(_) => futures::executor::block_on(self.call_async(args)),
        }
    }

    pub(crate) async fn call_async(&self, args: Vec<Option<LiteralValue>>) -> ResolverResult {
        match self {
            Resolver::Sync(_) => self.call(args),
            Resolver::Async(f) => {
                let future = match panic::catch_unwind(AssertUnwindSafe(|| f(args))) {
                    Ok(future) => future,
                    Err(payload) => return Err(ResolverError::from_panic(payload)),
                };
                AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(ResolverError::from_panic(payload)))
            }
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Sync(_) => f.write_str("Resolver::Sync(..)"),
            Resolver::Async(_) => f.write_str("Resolver::Async(..)"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION TREE
// ═══════════════════════════════════════════════════════════════════════════════

/// A nested configuration record. Cloning shares the underlying node, so
/// the same object can appear in several places (and, by mistake, inside
/// itself).
///
/// A self-containing object is an `Arc` cycle and is never freed, even after
/// [`BindingTable::build`] rejects it with `ConfigError::Cycle`.
#[derive(Clone, Default)]
pub struct BindingObject(Arc<Mutex<Vec<(String, BindingNode)>>>);

impl BindingObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, node: impl Into<BindingNode>) -> &Self {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.into(), node.into()));
        self
    }

    pub fn with(self, key: impl Into<String>, node: impl Into<BindingNode>) -> Self {
        self.insert(key, node);
        self
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<(String, BindingNode)> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for BindingObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BindingObject({} entries)", self.len())
    }
}

impl<K, V> FromIterator<(K, V)> for BindingObject
where
    K: Into<String>,
    V: Into<BindingNode>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = BindingObject::new();
        for (key, node) in iter {
            object.insert(key, node);
        }
        object
    }
}

#[derive(Debug, Clone)]
pub enum BindingNode {
    Literal(LiteralValue),
    List(Vec<BindingNode>),
    Function(Resolver),
    Object(BindingObject),
    /// A host value with no literal form (a date, a map, a class...).
    Unsupported { type_name: String },
}

impl BindingNode {
    pub fn type_name(&self) -> String {
        match self {
            BindingNode::Literal(lit) => lit.type_name().to_string(),
            BindingNode::List(_) => "array".to_string(),
            BindingNode::Function(_) => "function".to_string(),
            BindingNode::Object(_) => "object".to_string(),
            BindingNode::Unsupported { type_name } => type_name.clone(),
        }
    }

    /// JSON objects nest, arrays become lists, scalars become literals.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => BindingNode::Literal(LiteralValue::Null),
            serde_json::Value::Bool(b) => BindingNode::Literal(LiteralValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => BindingNode::Literal(LiteralValue::Number(f)),
                None => BindingNode::Unsupported {
                    type_name: format!("number {}", n),
                },
            },
            serde_json::Value::String(s) => BindingNode::Literal(LiteralValue::String(s.clone())),
            serde_json::Value::Array(items) => {
                BindingNode::List(items.iter().map(BindingNode::from_json).collect())
            }
            serde_json::Value::Object(map) => BindingNode::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), BindingNode::from_json(value)))
                    .collect(),
            ),
        }
    }
}

macro_rules! impl_from_for_node {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BindingNode {
                fn from(value: $ty) -> Self {
                    BindingNode::Literal(LiteralValue::from(value))
                }
            }
        )*
    };
}

impl_from_for_node!(bool, f64, i32, u32, &str, String, num_bigint::BigInt, crate::literal::RegExpLiteral);

impl From<LiteralValue> for BindingNode {
    fn from(value: LiteralValue) -> Self {
        BindingNode::Literal(value)
    }
}

impl From<Vec<LiteralValue>> for BindingNode {
    fn from(values: Vec<LiteralValue>) -> Self {
        BindingNode::List(values.into_iter().map(BindingNode::Literal).collect())
    }
}

impl From<Resolver> for BindingNode {
    fn from(resolver: Resolver) -> Self {
        BindingNode::Function(resolver)
    }
}

impl From<BindingObject> for BindingNode {
    fn from(object: BindingObject) -> Self {
        BindingNode::Object(object)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub enum BindingEntry {
    Value(Value),
    Function(Resolver),
}

/// Immutable map from dotted access path to binding. Built once per build
/// and shared read-only by every transform.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    entries: BTreeMap<String, BindingEntry>,
}

impl BindingTable {
    pub fn build(root: &BindingObject) -> Result<Self, ConfigError> {
        let mut builder = TableBuilder {
            entries: BTreeMap::new(),
            path: Vec::new(),
            ancestors: Vec::new(),
        };
        builder.flatten(root)?;
        Ok(Self {
            entries: builder.entries,
        })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        match BindingNode::from_json(value) {
            BindingNode::Object(root) => Self::build(&root),
            other => Err(ConfigError::UnsupportedValue {
                path: "<root>".to_string(),
                type_name: other.type_name(),
            }),
        }
    }

    pub fn get(&self, path: &str) -> Option<&BindingEntry> {
        self.entries.get(path)
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        match self.entries.get(path) {
            Some(BindingEntry::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn resolver(&self, path: &str) -> Option<&Resolver> {
        match self.entries.get(path) {
            Some(BindingEntry::Function(resolver)) => Some(resolver),
            _ => None,
        }
    }

    /// Access paths in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct TableBuilder {
    entries: BTreeMap<String, BindingEntry>,
    path: Vec<String>,
    ancestors: Vec<usize>,
}

impl TableBuilder {
    fn current_path(&self) -> String {
        self.path.join(".")
    }

    fn flatten(&mut self, object: &BindingObject) -> Result<(), ConfigError> {
        let identity = object.identity();
        if self.ancestors.contains(&identity) {
            return Err(ConfigError::Cycle {
                path: self.current_path(),
            });
        }
        self.ancestors.push(identity);

        let mut seen = HashSet::new();
        for (key, node) in object.snapshot() {
            self.path.push(key.clone());

            if key.is_empty() || key.contains(PATH_SEPARATOR) {
                return Err(ConfigError::InvalidKey {
                    path: self.current_path(),
                    key,
                });
            }
            if !seen.insert(key) {
                return Err(ConfigError::DuplicateKey {
                    path: self.current_path(),
                });
            }

            match node {
                BindingNode::Object(child) => self.flatten(&child)?,
                leaf => {
                    let entry = self.leaf_entry(leaf)?;
                    let path = self.current_path();
                    self.entries.insert(path, entry);
                }
            }

            self.path.pop();
        }

        self.ancestors.pop();
        Ok(())
    }

    fn leaf_entry(&self, node: BindingNode) -> Result<BindingEntry, ConfigError> {
        match node {
            BindingNode::Literal(lit) if lit.is_valid() => Ok(BindingEntry::Value(Value::Literal(lit))),
            BindingNode::Function(resolver) => Ok(BindingEntry::Function(resolver)),
            BindingNode::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        BindingNode::Literal(lit) if lit.is_valid() => values.push(lit),
                        other => {
                            return Err(ConfigError::UnsupportedValue {
                                path: self.current_path(),
                                type_name: format!("array containing {}", other.type_name()),
                            })
                        }
                    }
                }
                Ok(BindingEntry::Value(Value::List(values)))
            }
            other => Err(ConfigError::UnsupportedValue {
                path: self.current_path(),
                type_name: other.type_name(),
            }),
        }
    }
}
