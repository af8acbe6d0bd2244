//! Context resolution: per-context symbol tables and reference checking.
//!
//! Two-pass approach:
//! 1. Collect all `VAR` declarations into one table per context
//! 2. Check references: qualified names must name an existing context and
//!    member; unqualified `CALLS` callees and `RETURNS` subjects must be
//!    declared in the enclosing context
//!
//! Other relation operands (`GOES TO` endpoints, `CREATED BY` participants
//! and the like) name states and entities that need no declaration, so they
//! resolve opportunistically and are never reported.

use indexmap::IndexMap;
use serde::Serialize;

use navilang_core::Span;
use navilang_core::ast::{Context, Name, Program, Statement, StatementKind, ValueKind};
use navilang_core::types::TypeInfo;

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// A declared identifier: one `VAR` statement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SymbolInfo {
    pub name: String,
    /// Name of the context the symbol is declared in.
    pub context: String,
    pub ty: Option<TypeInfo>,
    /// Span of the declaring name token.
    pub span: Span,
}

/// Symbols of a single context, in declaration order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SymbolTable {
    symbols: IndexMap<String, SymbolInfo>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<&SymbolInfo> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolInfo)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert keeping the first declaration on conflict.
    ///
    /// Returns the span of the surviving declaration when `name` was already
    /// present.
    fn insert(&mut self, symbol: SymbolInfo) -> Option<Span> {
        match self.symbols.get(&symbol.name) {
            Some(existing) => Some(existing.span),
            None => {
                self.symbols.insert(symbol.name.clone(), symbol);
                None
            }
        }
    }
}

/// All symbol tables of a program, keyed by context name.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ContextTables {
    tables: IndexMap<String, SymbolTable>,
}

impl ContextTables {
    pub fn table(&self, context: &str) -> Option<&SymbolTable> {
        self.tables.get(context)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Resolve a possibly-qualified name from inside `current`.
    ///
    /// Unqualified lookups never cross context boundaries.
    pub fn resolve(&self, current: &str, name: &Name) -> Option<&SymbolInfo> {
        let context = name.context.as_deref().unwrap_or(current);
        self.tables.get(context)?.get(&name.name)
    }
}

/// Build the symbol tables and validate references.
///
/// Returns the tables plus the indices of contexts whose name duplicated an
/// earlier one; those contexts are excluded from the tables and from
/// reference checking, and the caller decides how to surface the skip.
pub fn resolve(program: &Program, diag: &mut Diagnostics) -> (ContextTables, Vec<usize>) {
    let mut tables = ContextTables::default();
    let mut skipped = Vec::new();
    let mut name_spans: IndexMap<&str, Span> = IndexMap::new();

    for (index, context) in program.contexts.iter().enumerate() {
        if let Some(&first_span) = name_spans.get(context.name.as_str()) {
            diag.report(DiagnosticKind::DuplicateDeclaration, context.name_span)
                .message(&context.name)
                .related_to(first_span, "a context with this name appears earlier")
                .emit();
            skipped.push(index);
            continue;
        }
        name_spans.insert(context.name.as_str(), context.name_span);

        let mut table = SymbolTable::default();
        collect_declarations(context, &context.statements, &mut table, diag);
        tables.tables.insert(context.name.clone(), table);
    }

    for (index, context) in program.contexts.iter().enumerate() {
        if skipped.contains(&index) {
            continue;
        }
        let mut checker = ReferenceChecker {
            current: &context.name,
            tables: &tables,
            diag,
        };
        checker.check_statements(&context.statements);
    }

    (tables, skipped)
}

fn collect_declarations(
    context: &Context,
    statements: &[Statement],
    table: &mut SymbolTable,
    diag: &mut Diagnostics,
) {
    for statement in statements {
        match &statement.kind {
            StatementKind::VarDeclaration { name, ty, name_span } => {
                let symbol = SymbolInfo {
                    name: name.clone(),
                    context: context.name.clone(),
                    ty: ty.clone(),
                    span: *name_span,
                };
                if let Some(first_span) = table.insert(symbol) {
                    diag.report(DiagnosticKind::DuplicateDeclaration, *name_span)
                        .message(name)
                        .related_to(first_span, "first declared here")
                        .emit();
                }
            }
            StatementKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                collect_declarations(
                    context,
                    std::slice::from_ref(then_branch),
                    table,
                    diag,
                );
                if let Some(else_branch) = else_branch {
                    collect_declarations(
                        context,
                        std::slice::from_ref(else_branch),
                        table,
                        diag,
                    );
                }
            }
            StatementKind::Event { action, .. } => {
                collect_declarations(context, std::slice::from_ref(action), table, diag);
            }
            StatementKind::Parallel { statements, .. } | StatementKind::Loop { statements } => {
                collect_declarations(context, statements, table, diag);
            }
            _ => {}
        }
    }
}

struct ReferenceChecker<'a, 'd> {
    current: &'a str,
    tables: &'a ContextTables,
    diag: &'d mut Diagnostics,
}

impl ReferenceChecker<'_, '_> {
    fn check_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::VarDeclaration { .. } => {}
            StatementKind::Transition { source, target } => {
                self.check_qualified(source);
                self.check_qualified(target);
            }
            StatementKind::Creation { entity, creator } => {
                self.check_qualified(entity);
                self.check_qualified(creator);
            }
            StatementKind::Action { actor, action } => {
                self.check_qualified(actor);
                self.check_qualified(action);
            }
            StatementKind::Invocation { caller, callee } => {
                self.check_qualified(caller);
                self.check_required(callee);
            }
            StatementKind::Reception { receiver, message } => {
                self.check_qualified(receiver);
                self.check_qualified(message);
            }
            StatementKind::Return { subject, value } => {
                self.check_required(subject);
                if let ValueKind::Symbol(name) = &value.kind {
                    self.check_qualified(name);
                }
            }
            StatementKind::Usage { user, target } => {
                self.check_qualified(user);
                self.check_qualified(target);
            }
            StatementKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_qualified(&condition.subject);
                if let Some(ValueKind::Symbol(name)) =
                    condition.value.as_ref().map(|v| &v.kind)
                {
                    self.check_qualified(name);
                }
                self.check_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_statement(else_branch);
                }
            }
            StatementKind::Event { trigger, action } => {
                self.check_qualified(trigger);
                self.check_statement(action);
            }
            StatementKind::Parallel { statements, .. } | StatementKind::Loop { statements } => {
                self.check_statements(statements);
            }
            StatementKind::Sequential { first, second, .. } => {
                self.check_qualified(first);
                self.check_qualified(second);
            }
        }
    }

    /// Qualified names must resolve; unqualified ones are left alone.
    fn check_qualified(&mut self, name: &Name) {
        let Some(context) = name.context.as_deref() else {
            return;
        };

        let Some(table) = self.tables.table(context) else {
            self.diag
                .report(DiagnosticKind::UnknownContext, name.span)
                .message(context)
                .emit();
            return;
        };

        if !table.contains(&name.name) {
            self.diag
                .report(DiagnosticKind::UnknownIdentifier, name.span)
                .message(name.to_string())
                .emit();
        }
    }

    /// `CALLS` callees and `RETURNS` subjects must be declared even when
    /// unqualified.
    fn check_required(&mut self, name: &Name) {
        if name.is_qualified() {
            self.check_qualified(name);
            return;
        }

        let declared = self
            .tables
            .table(self.current)
            .is_some_and(|t| t.contains(&name.name));
        if !declared {
            self.diag
                .report(DiagnosticKind::UnknownIdentifier, name.span)
                .message(&name.name)
                .emit();
        }
    }
}
