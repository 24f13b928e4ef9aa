//! # bigraph-migrate — Legacy Composite Migration
//!
//! Translates a legacy, dynamically-typed simulation process tree into the
//! declarative migration document a bigraph-style execution engine consumes.
//!
//! ## Design Principles
//!
//! 1. **Closed value model**: every runtime shape the engine meets is a
//!    [`Value`] variant; extensible leaf types plug in through the registry
//! 2. **Total inference**: anything reachable from a defaults tree gets a
//!    type — unclassifiable values degrade to `any` and surface as
//!    queryable diagnostics, never as hard failures
//! 3. **Fail-fast wiring**: a wiring tree whose shape disagrees with its
//!    node tree aborts the migration instead of guessing
//! 4. **Pure traversals**: translation reads a snapshot and owns its
//!    output; no live references back into the source tree
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bigraph_migrate::{Migrator, NodeTree, ValueMap};
//! # fn nodes() -> (NodeTree, NodeTree) { unimplemented!() }
//!
//! # fn example() -> bigraph_migrate::Result<()> {
//! let (processes, steps) = nodes();
//!
//! let mut migrator = Migrator::new();
//! let document = migrator.migrate(&processes, None, &steps, None, ValueMap::new())?;
//!
//! for (name, record) in &document.state {
//!     println!("{name}: {record}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | Classify | `registry` | Leaf-type handlers, consulted most specific first |
//! | Infer | `infer` | Value shape → type descriptor |
//! | Translate ports | `ports` | Declared defaults → typed port schema |
//! | Translate graph | `graph` | Node + wiring trees → node records |
//! | Merge | `merge` | Processes + steps + initial state → document |

// ============================================================================
// Modules
// ============================================================================

pub mod graph;
pub mod infer;
pub mod merge;
pub mod model;
pub mod ports;
pub mod registry;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    ArrayValue, DescriptorMap, Dtype, ObjectValue, Path, Quantity, SparseMatrix, TypeDescriptor,
    UnitMap, Value, ValueMap,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use graph::{
    CompositeNode, Export, GraphTranslator, LegacyNode, Namespace, NodeAdapter, NodeKind,
    NodeRecord, NodeTree, ScanResult, WiringTree, node_address, scan_namespace,
};
pub use infer::{InferenceGap, SchemaInferrer};
pub use merge::{MigrationDocument, deep_merge, flatten_state, migrate};
pub use ports::{PortLeaf, PortsTree, collapse_defaults, extract_defaults, translate_ports};
pub use registry::{LeafHandler, TypeRegistry, register_global};

// ============================================================================
// Migrator
// ============================================================================

use tracing::debug;

/// The primary entry point. A `Migrator` snapshots the leaf-type registry
/// and drives translation plus merging for one or more migrations.
pub struct Migrator {
    registry: TypeRegistry,
    gaps: Vec<InferenceGap>,
}

impl Migrator {
    /// Create a migrator from the process-wide registry as currently
    /// populated. Register custom leaf handlers before calling this.
    pub fn new() -> Self {
        Self::with_registry(registry::global().read().clone())
    }

    /// Create a migrator over an explicit registry.
    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self { registry, gaps: Vec::new() }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Inference gaps recorded by migrations run so far.
    pub fn gaps(&self) -> &[InferenceGap] {
        &self.gaps
    }

    /// Translate both node trees and merge them with `initial_state` into
    /// the final migration document.
    pub fn migrate(
        &mut self,
        processes: &NodeTree,
        process_wiring: Option<&WiringTree>,
        steps: &NodeTree,
        step_wiring: Option<&WiringTree>,
        initial_state: ValueMap,
    ) -> Result<MigrationDocument> {
        let mut translator = GraphTranslator::new(&self.registry);
        let process_doc = into_state_map(translator.translate_tree(processes, process_wiring)?)?;
        let step_doc = into_state_map(translator.translate_tree(steps, step_wiring)?)?;
        self.gaps.extend(translator.take_gaps());

        debug!(
            processes = process_doc.len(),
            steps = step_doc.len(),
            "merging migration document"
        );
        Ok(merge::migrate(process_doc, step_doc, initial_state))
    }

    /// Migrate the nodes found by a namespace scan, each under its
    /// discovered name with its self-reported topology.
    pub fn migrate_scan(
        &mut self,
        scan: &ScanResult,
        initial_state: ValueMap,
    ) -> Result<MigrationDocument> {
        let processes = NodeTree::branch(
            scan.processes
                .iter()
                .map(|(name, node)| (name.clone(), NodeTree::edge(std::sync::Arc::clone(node)))),
        );
        let steps = NodeTree::branch(
            scan.steps
                .iter()
                .map(|(name, node)| (name.clone(), NodeTree::edge(std::sync::Arc::clone(node)))),
        );
        self.migrate(&processes, None, &steps, None, initial_state)
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

fn into_state_map(document: Value) -> Result<ValueMap> {
    match document {
        Value::Map(map) => Ok(map),
        other => Err(Error::StructuralMismatch {
            path: Path::root().to_string(),
            message: format!(
                "migration root must be a name-keyed tree, got {}",
                other.type_name()
            ),
        }),
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A wiring tree's shape disagrees with its node tree. Fatal for that
    /// migration: continuing would silently mis-wire ports.
    #[error("structural mismatch at {path}: {message}")]
    StructuralMismatch { path: String, message: String },

    /// Two distinct nodes discovered under one name.
    #[error("name collision: `{name}` is bound to two distinct nodes")]
    NameCollision { name: String },

    /// No handler is registered under the requested name or for the given
    /// value shape.
    #[error("no registered handler for `{type_name}` at {path}")]
    RegistryMiss { type_name: String, path: String },

    /// A leaf handler rejected a wire-form value.
    #[error("leaf codec failure for `{type_name}`: {message}")]
    LeafCodec { type_name: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
