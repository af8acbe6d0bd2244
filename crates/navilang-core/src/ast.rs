//! Syntax tree for NaviLang programs.
//!
//! The tree is produced by the parser and consumed read-only by the semantic
//! analysis passes and by output generators. `StatementKind` is a closed sum
//! type: the grammar is fixed, and exhaustive matching keeps every pass
//! honest when a statement form is added.

use serde::{Deserialize, Serialize};

use crate::span::Span;
use crate::types::TypeInfo;

/// A whole source file: an ordered sequence of contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub contexts: Vec<Context>,
    pub span: Span,
}

/// A named scope. Contexts isolate identifiers: two contexts may declare the
/// same name without conflict, and only dotted-qualified references cross
/// the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    pub statements: Vec<Statement>,
    pub span: Span,
    /// Span of the context name token, for diagnostics.
    pub name_span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    /// Prefix modifiers (`RETRY 3`, `TIMEOUT 30s`, `ASYNC`, `BATCH 10`).
    /// Carried through for generators; the analyzer does not interpret them.
    pub modifiers: Vec<Modifier>,
    pub span: Span,
}

/// An identifier operand, optionally qualified with a foreign context:
/// `Invoice` or `Billing.Invoice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub context: Option<String>,
    pub name: String,
    pub span: Span,
}

impl Name {
    pub fn plain(name: impl Into<String>, span: Span) -> Self {
        Self {
            context: None,
            name: name.into(),
            span,
        }
    }

    pub fn qualified(context: impl Into<String>, name: impl Into<String>, span: Span) -> Self {
        Self {
            context: Some(context.into()),
            name: name.into(),
            span,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.context.is_some()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.context {
            Some(ctx) => write!(f, "{ctx}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// `VAR Name[: Type]`
    VarDeclaration {
        name: String,
        ty: Option<TypeInfo>,
        name_span: Span,
    },
    /// `A GOES TO B`
    Transition { source: Name, target: Name },
    /// `A CREATED BY B`
    Creation { entity: Name, creator: Name },
    /// `A DOES B`
    Action { actor: Name, action: Name },
    /// `A CALLS B`
    Invocation { caller: Name, callee: Name },
    /// `A RECEIVES B`
    Reception { receiver: Name, message: Name },
    /// `A RETURNS value`
    Return { subject: Name, value: Value },
    /// `A USES B`
    Usage { user: Name, target: Name },
    /// `IF cond THEN stmt [ELSE stmt]`
    Conditional {
        condition: Condition,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    /// `WHEN Trigger THEN stmt`
    Event {
        trigger: Name,
        action: Box<Statement>,
    },
    /// `PARALLEL { stmts }`, or the `A GOES TO B AND C` sugar.
    /// The grouped statements have no ordering constraint between them.
    /// `implicit` marks the sugar form, whose transitions keep plain
    /// transition semantics in flow analysis; only an explicit block
    /// permits cycles.
    Parallel {
        statements: Vec<Statement>,
        implicit: bool,
    },
    /// `A AFTER B` / `A BEFORE B` — ordering relations feeding the
    /// dependency graph rather than the flow graph.
    Sequential {
        first: Name,
        relation: SeqRelation,
        second: Name,
    },
    /// `LOOP { stmts }` — transitions inside may legitimately form cycles.
    Loop { statements: Vec<Statement> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeqRelation {
    After,
    Before,
}

impl std::fmt::Display for SeqRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeqRelation::After => write!(f, "AFTER"),
            SeqRelation::Before => write!(f, "BEFORE"),
        }
    }
}

/// A literal or symbolic operand value (`RETURNS "Deleted"`, `RETURNS Total`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub kind: ValueKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    /// A reference to another identifier; never evaluated at analysis time.
    Symbol(Name),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(String),
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Symbol(name) => write!(f, "{name}"),
            ValueKind::Str(s) => write!(f, "\"{s}\""),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Float(x) => write!(f, "{x}"),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::Duration(d) => f.write_str(d),
        }
    }
}

/// Guard condition of an `IF` statement: `subject [op value]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub subject: Name,
    pub op: Option<CmpOp>,
    pub value: Option<Value>,
    pub span: Span,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.subject)?;
        if let (Some(op), Some(value)) = (&self.op, &self.value) {
            write!(f, " {op} {}", value.kind)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl std::fmt::Display for CmpOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Statement prefix modifiers for advanced flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Modifier {
    Retry(u32),
    Timeout(String),
    Async,
    Batch(u32),
}
