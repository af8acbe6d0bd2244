//! Dependency graph and execution ordering.
//!
//! `CREATED BY`, `USES`, `CALLS`, `AFTER` and `BEFORE` statements all imply
//! that one thing must exist or run before another. Edges point from the
//! dependent to its dependency (`A BEFORE B` reverses: `B` depends on `A`).
//!
//! The execution order comes from Kahn's algorithm, emitting dependencies
//! before dependents and breaking ties by first appearance. Nodes left over
//! after Kahn's algorithm stalls sit on a cycle or downstream of one; the
//! cycles themselves are recovered as strongly connected components and
//! reported once each.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use navilang_core::Span;
use navilang_core::ast::{Context, Name, SeqRelation, Statement, StatementKind};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Index into [`DependencyGraph::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DepId(u32);

impl DepId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepNode {
    pub name: String,
    /// Span of the first mention.
    pub span: Span,
}

/// Which statement form produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepKind {
    CreatedBy,
    Uses,
    Calls,
    After,
    Before,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepEdge {
    pub dependent: DepId,
    pub dependency: DepId,
    pub kind: DepKind,
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    nodes: Vec<DepNode>,
    edges: Vec<DepEdge>,
    ids: IndexMap<String, DepId>,
}

impl DependencyGraph {
    pub fn build(contexts: &[&Context]) -> DependencyGraph {
        let mut graph = DependencyGraph::default();
        for context in contexts {
            graph.walk(&context.statements);
        }
        graph
    }

    pub fn node(&self, id: DepId) -> &DepNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[DepNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DepEdge] {
        &self.edges
    }

    pub fn node_id(&self, name: &str) -> Option<DepId> {
        self.ids.get(name).copied()
    }

    fn walk(&mut self, statements: &[Statement]) {
        for statement in statements {
            match &statement.kind {
                StatementKind::Creation { entity, creator } => {
                    self.edge(entity, creator, DepKind::CreatedBy, statement.span);
                }
                StatementKind::Usage { user, target } => {
                    self.edge(user, target, DepKind::Uses, statement.span);
                }
                StatementKind::Invocation { caller, callee } => {
                    self.edge(caller, callee, DepKind::Calls, statement.span);
                }
                StatementKind::Sequential {
                    first,
                    relation,
                    second,
                } => match relation {
                    SeqRelation::After => {
                        self.edge(first, second, DepKind::After, statement.span);
                    }
                    SeqRelation::Before => {
                        self.edge(second, first, DepKind::Before, statement.span);
                    }
                },
                StatementKind::Conditional {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    self.walk(std::slice::from_ref(then_branch));
                    if let Some(else_branch) = else_branch {
                        self.walk(std::slice::from_ref(else_branch));
                    }
                }
                StatementKind::Event { action, .. } => {
                    self.walk(std::slice::from_ref(action));
                }
                StatementKind::Parallel { statements, .. } | StatementKind::Loop { statements } => {
                    self.walk(statements);
                }
                _ => {}
            }
        }
    }

    fn edge(&mut self, dependent: &Name, dependency: &Name, kind: DepKind, span: Span) {
        let dependent = self.intern(dependent);
        let dependency = self.intern(dependency);
        self.edges.push(DepEdge {
            dependent,
            dependency,
            kind,
            span,
        });
    }

    fn intern(&mut self, name: &Name) -> DepId {
        let key = name.to_string();
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = DepId(self.nodes.len() as u32);
        self.nodes.push(DepNode {
            name: key.clone(),
            span: name.span,
        });
        self.ids.insert(key, id);
        id
    }

    /// Topological execution order, dependencies first.
    ///
    /// Ties are broken by first appearance, so the order is deterministic.
    /// Nodes caught in cycles (or behind them) are left out of the order and
    /// each distinct cycle is reported once, naming every member.
    pub fn execution_order(&self, diag: &mut Diagnostics) -> Vec<String> {
        let mut pending: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, _)| {
                self.edges
                    .iter()
                    .filter(|e| e.dependent.index() == i)
                    .count()
            })
            .collect();
        let mut emitted = vec![false; self.nodes.len()];
        let mut order = Vec::new();

        loop {
            let Some(next) = (0..self.nodes.len())
                .find(|&i| !emitted[i] && pending[i] == 0)
            else {
                break;
            };
            emitted[next] = true;
            order.push(self.nodes[next].name.clone());
            for edge in &self.edges {
                if edge.dependency.index() == next {
                    pending[edge.dependent.index()] -= 1;
                }
            }
        }

        if order.len() < self.nodes.len() {
            self.report_cycles(diag);
        }

        order
    }

    fn report_cycles(&self, diag: &mut Diagnostics) {
        for scc in DepSccFinder::find(self) {
            let is_cycle = scc.len() > 1
                || self
                    .edges
                    .iter()
                    .any(|e| e.dependent == scc[0] && e.dependency == scc[0]);
            if !is_cycle {
                continue;
            }

            let mut ordered = scc;
            ordered.sort_by_key(|id| id.index());

            let names = ordered
                .iter()
                .map(|&id| format!("`{}`", self.node(id).name))
                .collect::<Vec<_>>()
                .join(", ");

            let mut builder = diag
                .report(
                    DiagnosticKind::CircularDependency,
                    self.node(ordered[0]).span,
                )
                .message(names);
            for &id in &ordered[1..] {
                builder = builder.related_to(self.node(id).span, "part of the dependency cycle");
            }
            builder.emit();
        }
    }
}

/// Tarjan's strongly-connected-components search over the dependency graph.
struct DepSccFinder<'a> {
    graph: &'a DependencyGraph,
    index: usize,
    stack: Vec<DepId>,
    on_stack: IndexSet<DepId>,
    indices: IndexMap<DepId, usize>,
    lowlinks: IndexMap<DepId, usize>,
    sccs: Vec<Vec<DepId>>,
}

impl<'a> DepSccFinder<'a> {
    fn find(graph: &'a DependencyGraph) -> Vec<Vec<DepId>> {
        let mut finder = Self {
            graph,
            index: 0,
            stack: Vec::new(),
            on_stack: IndexSet::new(),
            indices: IndexMap::new(),
            lowlinks: IndexMap::new(),
            sccs: Vec::new(),
        };

        for id in (0..graph.nodes.len()).map(|i| DepId(i as u32)) {
            if !finder.indices.contains_key(&id) {
                finder.strongconnect(id);
            }
        }

        finder.sccs
    }

    fn strongconnect(&mut self, node: DepId) {
        self.indices.insert(node, self.index);
        self.lowlinks.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let successors: Vec<DepId> = self
            .graph
            .edges
            .iter()
            .filter(|e| e.dependent == node)
            .map(|e| e.dependency)
            .collect();
        for succ in successors {
            if !self.indices.contains_key(&succ) {
                self.strongconnect(succ);
                let succ_lowlink = self.lowlinks[&succ];
                let lowlink = self.lowlinks.get_mut(&node).expect("visited");
                *lowlink = (*lowlink).min(succ_lowlink);
            } else if self.on_stack.contains(&succ) {
                let succ_index = self.indices[&succ];
                let lowlink = self.lowlinks.get_mut(&node).expect("visited");
                *lowlink = (*lowlink).min(succ_index);
            }
        }

        if self.lowlinks[&node] == self.indices[&node] {
            let mut scc = Vec::new();
            loop {
                let member = self.stack.pop().expect("stack mirrors recursion");
                self.on_stack.swap_remove(&member);
                let done = member == node;
                scc.push(member);
                if done {
                    break;
                }
            }
            self.sccs.push(scc);
        }
    }
}
