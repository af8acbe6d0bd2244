//! Semantic analysis passes and their orchestration.
//!
//! [`analyze`] runs the passes in a fixed order: context resolution, type
//! checking, flow validation, dependency resolution. Each pass writes into
//! its own `Diagnostics` and the results are concatenated afterwards, so the
//! reported sequence is deterministic for identical input no matter how the
//! passes themselves are evaluated. No pass mutates the syntax tree and no
//! pass aborts the run.

pub mod dependencies;
pub mod flow;
pub mod model;
pub mod symbol_table;
pub mod type_check;

#[cfg(test)]
mod analyze_tests;
#[cfg(test)]
mod dependencies_tests;

use indexmap::IndexMap;

use navilang_core::ast::{Context, Program};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

pub use dependencies::{DepEdge, DepId, DepKind, DepNode, DependencyGraph};
pub use flow::{EdgeKind, FlowEdge, FlowGraph, FlowNode, NodeId};
pub use model::{ContextModel, SemanticModel};
pub use symbol_table::{ContextTables, SymbolInfo, SymbolTable};

/// Analyze a parsed program.
///
/// Always produces a model; faults show up in the returned diagnostics and
/// as gaps in the model rather than as an error.
pub fn analyze(program: &Program) -> (SemanticModel, Diagnostics) {
    let mut resolve_diag = Diagnostics::new();
    let (tables, skipped) = symbol_table::resolve(program, &mut resolve_diag);

    let kept: Vec<&Context> = program
        .contexts
        .iter()
        .enumerate()
        .filter(|(index, _)| !skipped.contains(index))
        .map(|(_, context)| context)
        .collect();

    let mut type_diag = Diagnostics::new();
    let types = type_check::check(&kept, &tables, &mut type_diag);

    let mut flow_diag = Diagnostics::new();
    let (flow, flow_nodes) = FlowGraph::build(&kept);
    flow.validate(&mut flow_diag);

    let mut dep_diag = Diagnostics::new();
    let dependencies = DependencyGraph::build(&kept);
    let execution_order = dependencies.execution_order(&mut dep_diag);

    let mut contexts = IndexMap::new();
    for (context, nodes) in kept.iter().zip(flow_nodes) {
        let symbols = tables
            .table(&context.name)
            .cloned()
            .unwrap_or_default();
        contexts.insert(
            context.name.clone(),
            ContextModel {
                symbols,
                flow_nodes: nodes,
            },
        );
    }

    let mut diagnostics = resolve_diag;
    diagnostics.extend(type_diag);
    diagnostics.extend(flow_diag);
    diagnostics.extend(dep_diag);
    for &index in &skipped {
        let context = &program.contexts[index];
        diagnostics
            .report(DiagnosticKind::SkippedContext, context.name_span)
            .message(&context.name)
            .emit();
    }

    let model = SemanticModel {
        contexts,
        types,
        flow,
        dependencies,
        execution_order,
    };
    (model, diagnostics)
}
