//! Flow graph construction and validation.
//!
//! Nodes are states, keyed by the identifier as written (`Checkout` and
//! `Billing.Checkout` are distinct). Edges come from `GOES TO` transitions;
//! a transition nested under `IF`/`WHEN` keeps its guard text and arm kind,
//! and one nested under an explicit `LOOP` or `PARALLEL` block is
//! loop-scoped, which exempts the cycles it participates in. The
//! `A GOES TO B AND C` fan-out sugar stays on plain transition semantics.
//!
//! Validation reports, in order: cycles whose edges are not all loop-scoped,
//! states without an outgoing transition, and states unreachable from the
//! entry set.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use navilang_core::Span;
use navilang_core::ast::{Context, Name, Statement, StatementKind};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Index into [`FlowGraph::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A state in the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub name: String,
    /// Span of the first mention.
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    /// Plain `GOES TO`.
    Transition,
    /// `GOES TO` under the `THEN` arm of an `IF`.
    Then,
    /// `GOES TO` under the `ELSE` arm of an `IF`.
    Else,
    /// `GOES TO` under a `WHEN ... THEN`.
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// Condition or trigger text for guarded edges.
    pub guard: Option<String>,
    /// True for edges inside a `LOOP` or `PARALLEL` block.
    pub looped: bool,
    pub span: Span,
}

/// Arena flow graph: dense node storage plus a name index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    ids: IndexMap<String, NodeId>,
}

impl FlowGraph {
    /// Build the graph over the kept contexts.
    ///
    /// The second return value lists, per context, the nodes that context
    /// mentions, in first-mention order.
    pub fn build(contexts: &[&Context]) -> (FlowGraph, Vec<Vec<NodeId>>) {
        let mut builder = Builder {
            graph: FlowGraph::default(),
            touched: IndexSet::new(),
        };

        let mut per_context = Vec::with_capacity(contexts.len());
        for context in contexts {
            builder.touched.clear();
            builder.walk(&context.statements, Frame::top_level());
            per_context.push(builder.touched.iter().copied().collect());
        }

        (builder.graph, per_context)
    }

    pub fn node(&self, id: NodeId) -> &FlowNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.ids.get(name).copied()
    }

    fn intern(&mut self, name: &Name) -> NodeId {
        let key = name.to_string();
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(FlowNode {
            name: key.clone(),
            span: name.span,
        });
        self.ids.insert(key, id);
        id
    }

    /// Run all flow checks.
    pub fn validate(&self, diag: &mut Diagnostics) {
        self.check_cycles(diag);
        self.check_dead_ends(diag);
        self.check_reachability(diag);
    }

    fn check_cycles(&self, diag: &mut Diagnostics) {
        for scc in SccFinder::find(self) {
            let is_cycle = scc.len() > 1
                || self
                    .edges
                    .iter()
                    .any(|e| e.source == scc[0] && e.target == scc[0]);
            if !is_cycle {
                continue;
            }

            let members: IndexSet<NodeId> = scc.iter().copied().collect();
            let all_looped = self
                .edges
                .iter()
                .filter(|e| members.contains(&e.source) && members.contains(&e.target))
                .all(|e| e.looped);
            if all_looped {
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
                .report(DiagnosticKind::UnintendedCycle, self.node(ordered[0]).span)
                .message(names);
            for &id in &ordered[1..] {
                builder = builder.related_to(self.node(id).span, "part of the cycle");
            }
            builder
                .hint("wrap the cycle in a LOOP block if it is intentional")
                .emit();
        }
    }

    fn check_dead_ends(&self, diag: &mut Diagnostics) {
        let mut has_outgoing = vec![false; self.nodes.len()];
        let mut looped_incoming = vec![false; self.nodes.len()];
        for edge in &self.edges {
            has_outgoing[edge.source.index()] = true;
            if edge.looped {
                looped_incoming[edge.target.index()] = true;
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            // A loop interior target flows back around; not a dead end.
            if !has_outgoing[index] && !looped_incoming[index] {
                diag.report(DiagnosticKind::PossibleDeadEnd, node.span)
                    .message(&node.name)
                    .emit();
            }
        }
    }

    fn check_reachability(&self, diag: &mut Diagnostics) {
        let mut has_incoming = vec![false; self.nodes.len()];
        for edge in &self.edges {
            has_incoming[edge.target.index()] = true;
        }

        let roots: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| !has_incoming[i])
            .collect();
        // Everything-in-a-cycle has no entry state at all; the cycle report
        // already covers that shape.
        if roots.is_empty() {
            return;
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut queue: Vec<usize> = roots;
        for &root in &queue {
            visited[root] = true;
        }
        while let Some(current) = queue.pop() {
            for edge in &self.edges {
                let target = edge.target.index();
                if edge.source.index() == current && !visited[target] {
                    visited[target] = true;
                    queue.push(target);
                }
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if !visited[index] {
                diag.report(DiagnosticKind::UnreachableState, node.span)
                    .message(&node.name)
                    .emit();
            }
        }
    }
}

/// Guard and loop scope inherited from enclosing statements.
#[derive(Clone)]
struct Frame {
    kind: EdgeKind,
    guard: Option<String>,
    looped: bool,
}

impl Frame {
    fn top_level() -> Self {
        Self {
            kind: EdgeKind::Transition,
            guard: None,
            looped: false,
        }
    }
}

struct Builder {
    graph: FlowGraph,
    touched: IndexSet<NodeId>,
}

impl Builder {
    fn walk(&mut self, statements: &[Statement], frame: Frame) {
        for statement in statements {
            self.walk_statement(statement, frame.clone());
        }
    }

    fn walk_statement(&mut self, statement: &Statement, frame: Frame) {
        match &statement.kind {
            StatementKind::Transition { source, target } => {
                let source = self.intern(source);
                let target = self.intern(target);
                self.graph.edges.push(FlowEdge {
                    source,
                    target,
                    kind: frame.kind,
                    guard: frame.guard,
                    looped: frame.looped,
                    span: statement.span,
                });
            }
            StatementKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let guard = condition.to_string();
                self.walk_statement(
                    then_branch,
                    Frame {
                        kind: EdgeKind::Then,
                        guard: Some(guard.clone()),
                        looped: frame.looped,
                    },
                );
                if let Some(else_branch) = else_branch {
                    self.walk_statement(
                        else_branch,
                        Frame {
                            kind: EdgeKind::Else,
                            guard: Some(guard),
                            looped: frame.looped,
                        },
                    );
                }
            }
            StatementKind::Event { trigger, action } => {
                self.walk_statement(
                    action,
                    Frame {
                        kind: EdgeKind::Event,
                        guard: Some(trigger.to_string()),
                        looped: frame.looped,
                    },
                );
            }
            StatementKind::Parallel {
                statements,
                implicit,
            } => {
                // The `A GOES TO B AND C` sugar keeps plain transition
                // semantics; only an explicit block permits cycles.
                let looped = frame.looped || !implicit;
                self.walk(statements, Frame { looped, ..frame });
            }
            StatementKind::Loop { statements } => {
                self.walk(
                    statements,
                    Frame {
                        looped: true,
                        ..frame
                    },
                );
            }
            _ => {}
        }
    }

    fn intern(&mut self, name: &Name) -> NodeId {
        let id = self.graph.intern(name);
        self.touched.insert(id);
        id
    }
}

/// Tarjan's strongly-connected-components search over the flow graph.
struct SccFinder<'a> {
    graph: &'a FlowGraph,
    index: usize,
    stack: Vec<NodeId>,
    on_stack: IndexSet<NodeId>,
    indices: IndexMap<NodeId, usize>,
    lowlinks: IndexMap<NodeId, usize>,
    sccs: Vec<Vec<NodeId>>,
}

impl<'a> SccFinder<'a> {
    fn find(graph: &'a FlowGraph) -> Vec<Vec<NodeId>> {
        let mut finder = Self {
            graph,
            index: 0,
            stack: Vec::new(),
            on_stack: IndexSet::new(),
            indices: IndexMap::new(),
            lowlinks: IndexMap::new(),
            sccs: Vec::new(),
        };

        for id in (0..graph.nodes.len()).map(|i| NodeId(i as u32)) {
            if !finder.indices.contains_key(&id) {
                finder.strongconnect(id);
            }
        }

        finder.sccs
    }

    fn strongconnect(&mut self, node: NodeId) {
        self.indices.insert(node, self.index);
        self.lowlinks.insert(node, self.index);
        self.index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let successors: Vec<NodeId> = self
            .graph
            .edges
            .iter()
            .filter(|e| e.source == node)
            .map(|e| e.target)
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
