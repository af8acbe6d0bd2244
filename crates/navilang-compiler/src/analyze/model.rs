//! The semantic model: everything the analysis passes learned, in one
//! serializable structure for downstream generators.

use indexmap::IndexMap;
use serde::Serialize;

use navilang_core::types::TypeInfo;

use super::dependencies::DependencyGraph;
use super::flow::{FlowGraph, NodeId};
use super::symbol_table::SymbolTable;

/// Per-context slice of the model.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextModel {
    /// Declared symbols, in declaration order.
    pub symbols: SymbolTable,
    /// Flow nodes this context mentions, in first-mention order.
    pub flow_nodes: Vec<NodeId>,
}

/// Result of analyzing a program.
///
/// Built fresh on every invocation; a partial model is still returned when
/// diagnostics were raised, with the faulty parts simply absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SemanticModel {
    /// One entry per analyzed context, in source order.
    pub contexts: IndexMap<String, ContextModel>,
    /// Global type map, keyed `Context.Name`.
    pub types: IndexMap<String, TypeInfo>,
    pub flow: FlowGraph,
    pub dependencies: DependencyGraph,
    /// Topological order over the dependency graph, dependencies first.
    /// Members of dependency cycles are absent.
    pub execution_order: Vec<String>,
}
