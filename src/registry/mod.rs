//! # Leaf Type Registry
//!
//! THE extension point for domain leaf types. A handler is a named triple of
//! (type-check predicate, serialize, deserialize) plus an inference function
//! emitting the descriptor that lets the consuming engine reconstruct the
//! value. Handlers are consulted in registration order, most specific first,
//! before the generic object-reflection fallback in [`crate::infer`].
//!
//! ## Concurrency
//!
//! The process-wide registry behind [`global()`] follows a single-writer,
//! many-reader discipline: populate it at startup (before any inference
//! runs), then treat it as read-only. [`crate::Migrator`] snapshots the
//! global registry at construction, so concurrent migrations never observe a
//! half-registered catalog.

use std::sync::LazyLock;

use parking_lot::RwLock;
use tracing::debug;

use crate::model::{Path, TypeDescriptor, Value};
use crate::{Error, Result};

mod builtin;

pub use builtin::{csr_matrix_handler, quantity_handler};

// ============================================================================
// Handler contract
// ============================================================================

/// Shape predicate: does this handler claim the value?
pub type CheckFn = fn(&Value) -> bool;

/// Emit the descriptor for a claimed value. Receives the path for handlers
/// that need positional context.
pub type InferFn = fn(&Value, &Path) -> TypeDescriptor;

/// Convert between a domain leaf and its plain-mapping wire form.
pub type CodecFn = fn(&Value) -> Result<Value>;

/// A registered leaf-type handler.
#[derive(Debug, Clone, Copy)]
pub struct LeafHandler {
    /// Registration key; re-registering the same name replaces the entry.
    pub name: &'static str,
    pub check: CheckFn,
    pub infer: InferFn,
    pub serialize: CodecFn,
    pub deserialize: CodecFn,
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered mapping from value-shape predicate to handler.
///
/// Order matters: `classify` returns the first handler whose predicate
/// matches, so register more specific handlers before general ones.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    handlers: Vec<LeafHandler>,
}

impl TypeRegistry {
    /// An empty registry with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in leaf catalog
    /// (`quantity`, `csr_matrix`).
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(quantity_handler());
        registry.register(csr_matrix_handler());
        registry
    }

    /// Register a handler. Idempotent upsert: a handler with an
    /// already-registered name replaces the prior entry in place, keeping
    /// its dispatch position. This supports incremental type-module loading.
    pub fn register(&mut self, handler: LeafHandler) {
        if let Some(existing) = self.handlers.iter_mut().find(|h| h.name == handler.name) {
            debug!(name = handler.name, "replacing registered leaf handler");
            *existing = handler;
        } else {
            self.handlers.push(handler);
        }
    }

    /// Find the first handler claiming `value`, in registration order.
    pub fn classify(&self, value: &Value) -> Option<&LeafHandler> {
        self.handlers.iter().find(|h| (h.check)(value))
    }

    /// Look up a handler by registration name.
    pub fn get(&self, name: &str) -> Option<&LeafHandler> {
        self.handlers.iter().find(|h| h.name == name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Serialize a leaf value through its classifying handler.
    pub fn serialize(&self, value: &Value) -> Result<Value> {
        let handler = self.classify(value).ok_or_else(|| Error::RegistryMiss {
            type_name: value.type_name().to_owned(),
            path: Path::root().to_string(),
        })?;
        (handler.serialize)(value)
    }

    /// Deserialize a wire-form mapping through a named handler.
    pub fn deserialize(&self, name: &str, state: &Value) -> Result<Value> {
        let handler = self.get(name).ok_or_else(|| Error::RegistryMiss {
            type_name: name.to_owned(),
            path: Path::root().to_string(),
        })?;
        (handler.deserialize)(state)
    }
}

// ============================================================================
// Process-wide registry
// ============================================================================

static GLOBAL: LazyLock<RwLock<TypeRegistry>> =
    LazyLock::new(|| RwLock::new(TypeRegistry::builtin()));

/// The process-wide registry.
///
/// Writes belong in the startup phase, before any inference runs; afterwards
/// callers should only read. Nothing enforces this beyond the lock — the
/// discipline is by convention.
pub fn global() -> &'static RwLock<TypeRegistry> {
    &GLOBAL
}

/// Register a handler on the process-wide registry.
pub fn register_global(handler: LeafHandler) {
    global().write().register(handler);
}
