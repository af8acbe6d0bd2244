//! Type and constraint checking.
//!
//! Works entirely on declared types: symbols without a type annotation pass
//! every check, and operands the resolver could not resolve are skipped here
//! since the resolver already reported them. Only literal values are checked
//! against constraints; symbolic values have no analysis-time value to test.

use indexmap::IndexMap;
use regex::Regex;

use navilang_core::ast::{Context, Statement, StatementKind, Value, ValueKind};
use navilang_core::types::{Constraint, Primitive, TypeInfo};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

use super::symbol_table::{ContextTables, SymbolInfo};

/// Check declarations and typed relations across the kept contexts.
///
/// Returns the global type map, keyed `Context.Name`, containing every
/// symbol with a declared type.
pub fn check(
    contexts: &[&Context],
    tables: &ContextTables,
    diag: &mut Diagnostics,
) -> IndexMap<String, TypeInfo> {
    let mut types = IndexMap::new();

    for context in contexts {
        let Some(table) = tables.table(&context.name) else {
            continue;
        };
        for (name, symbol) in table.iter() {
            let Some(ty) = &symbol.ty else { continue };
            check_declaration(symbol, ty, diag);
            types.insert(format!("{}.{name}", context.name), ty.clone());
        }
    }

    for context in contexts {
        let mut checker = RelationChecker {
            current: &context.name,
            tables,
            diag,
        };
        checker.check_statements(&context.statements);
    }

    types
}

/// Structural validity of a declared type, independent of any use site.
fn check_declaration(symbol: &SymbolInfo, ty: &TypeInfo, diag: &mut Diagnostics) {
    if let TypeInfo::Enum(variants) = ty.base() {
        if variants.is_empty() {
            diag.report(DiagnosticKind::ConstraintViolation, symbol.span)
                .message(format!("enum `{}` has no variants", symbol.name))
                .emit();
        }
        for (i, variant) in variants.iter().enumerate() {
            if variants[..i].contains(variant) {
                diag.report(DiagnosticKind::ConstraintViolation, symbol.span)
                    .message(format!(
                        "enum `{}` lists variant `{variant}` more than once",
                        symbol.name
                    ))
                    .emit();
            }
        }
    }

    for constraint in ty.constraints() {
        check_constraint_shape(symbol, ty.base(), constraint, diag);
    }
}

fn check_constraint_shape(
    symbol: &SymbolInfo,
    base: &TypeInfo,
    constraint: &Constraint,
    diag: &mut Diagnostics,
) {
    let is_number = matches!(base, TypeInfo::Primitive(Primitive::Number));
    let is_string = matches!(base, TypeInfo::Primitive(Primitive::String));

    match constraint {
        Constraint::Range(min, max) => {
            if !is_number {
                constraint_error(symbol, "`Range` applies to Number", diag);
            } else if min > max {
                constraint_error(
                    symbol,
                    format!("`Range({min}, {max})` has min greater than max"),
                    diag,
                );
            }
        }
        Constraint::Length(min, max) => {
            if !is_string {
                constraint_error(symbol, "`Length` applies to String", diag);
            } else if min > max || *min < 0 {
                constraint_error(
                    symbol,
                    format!("`Length({min}, {max})` bounds are invalid"),
                    diag,
                );
            }
        }
        Constraint::Pattern(pattern) => {
            if !is_string {
                constraint_error(symbol, "`Pattern` applies to String", diag);
            } else if let Err(err) = Regex::new(pattern) {
                constraint_error(
                    symbol,
                    format!("`Pattern(\"{pattern}\")` is not a valid regex: {err}"),
                    diag,
                );
            }
        }
        Constraint::Positive => {
            if !is_number {
                constraint_error(symbol, "`Positive` applies to Number", diag);
            }
        }
        Constraint::Required | Constraint::Optional | Constraint::Auto => {}
    }
}

fn constraint_error(symbol: &SymbolInfo, detail: impl Into<String>, diag: &mut Diagnostics) {
    diag.report(DiagnosticKind::ConstraintViolation, symbol.span)
        .message(detail)
        .emit();
}

struct RelationChecker<'a, 'd> {
    current: &'a str,
    tables: &'a ContextTables,
    diag: &'d mut Diagnostics,
}

impl RelationChecker<'_, '_> {
    fn check_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Invocation { callee, .. } => {
                let Some(symbol) = self.tables.resolve(self.current, callee) else {
                    return;
                };
                let Some(ty) = &symbol.ty else { return };
                if !ty.is_callable() {
                    self.diag
                        .report(DiagnosticKind::TypeMismatch, callee.span)
                        .message(format!(
                            "`{callee}` is {} and cannot be called; only Service and \
                             Endpoint can",
                            ty.category()
                        ))
                        .related_to(symbol.span, "declared here")
                        .emit();
                }
            }
            StatementKind::Creation { creator, .. } => {
                let Some(symbol) = self.tables.resolve(self.current, creator) else {
                    return;
                };
                let Some(ty) = &symbol.ty else { return };
                if ty.is_primitive() {
                    self.diag
                        .report(DiagnosticKind::TypeMismatch, creator.span)
                        .message(format!(
                            "`{creator}` is {} and cannot create entities",
                            ty.category()
                        ))
                        .related_to(symbol.span, "declared here")
                        .emit();
                }
            }
            StatementKind::Return { subject, value } => {
                let Some(symbol) = self.tables.resolve(self.current, subject) else {
                    return;
                };
                let Some(ty) = symbol.ty.clone() else { return };
                self.check_return_value(subject.to_string(), &ty, value, symbol.span);
            }
            StatementKind::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                self.check_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_statement(else_branch);
                }
            }
            StatementKind::Event { action, .. } => self.check_statement(action),
            StatementKind::Parallel { statements, .. } | StatementKind::Loop { statements } => {
                self.check_statements(statements);
            }
            _ => {}
        }
    }

    fn check_return_value(
        &mut self,
        subject: String,
        ty: &TypeInfo,
        value: &Value,
        decl_span: navilang_core::Span,
    ) {
        // Symbolic values carry no literal to test.
        if matches!(value.kind, ValueKind::Symbol(_)) {
            return;
        }

        match ty.base() {
            TypeInfo::Enum(variants) => {
                let ValueKind::Str(text) = &value.kind else {
                    self.diag
                        .report(DiagnosticKind::TypeMismatch, value.span)
                        .message(format!(
                            "`{subject}` is an enum; returned values must be quoted \
                             variant names"
                        ))
                        .related_to(decl_span, "declared here")
                        .emit();
                    return;
                };
                if !variants.iter().any(|v| v == text) {
                    self.diag
                        .report(DiagnosticKind::ConstraintViolation, value.span)
                        .message(format!(
                            "`\"{text}\"` is not a variant of enum `{subject}`"
                        ))
                        .related_to(decl_span, "declared here")
                        .hint(format!("variants are: {}", variants.join(", ")))
                        .emit();
                }
            }
            TypeInfo::Primitive(primitive) => {
                if !literal_matches(primitive, &value.kind) {
                    self.diag
                        .report(DiagnosticKind::TypeMismatch, value.span)
                        .message(format!(
                            "`{subject}` is declared {primitive} but the returned \
                             value is {}",
                            literal_kind_name(&value.kind)
                        ))
                        .related_to(decl_span, "declared here")
                        .emit();
                    return;
                }
                for constraint in ty.constraints() {
                    self.check_literal_constraint(&subject, constraint, value);
                }
            }
            // Entity, Service, Endpoint, Object: any returned value shape is
            // acceptable at analysis time.
            _ => {}
        }
    }

    fn check_literal_constraint(
        &mut self,
        subject: &str,
        constraint: &Constraint,
        value: &Value,
    ) {
        match (constraint, &value.kind) {
            (Constraint::Range(min, max), ValueKind::Int(n)) => {
                if n < min || n > max {
                    self.violation(
                        value,
                        format!("`{n}` is outside `{subject}`'s range {min}..={max}"),
                    );
                }
            }
            (Constraint::Positive, ValueKind::Int(n)) => {
                if *n <= 0 {
                    self.violation(
                        value,
                        format!("`{n}` violates `{subject}`'s Positive constraint"),
                    );
                }
            }
            (Constraint::Positive, ValueKind::Float(x)) => {
                if *x <= 0.0 {
                    self.violation(
                        value,
                        format!("`{x}` violates `{subject}`'s Positive constraint"),
                    );
                }
            }
            (Constraint::Length(min, max), ValueKind::Str(s)) => {
                let len = s.chars().count() as i64;
                if len < *min || len > *max {
                    self.violation(
                        value,
                        format!(
                            "`\"{s}\"` has length {len}, outside `{subject}`'s \
                             {min}..={max}"
                        ),
                    );
                }
            }
            (Constraint::Pattern(pattern), ValueKind::Str(s)) => {
                // Invalid patterns were already reported at the declaration.
                if let Ok(re) = Regex::new(pattern)
                    && !re.is_match(s)
                {
                    self.violation(
                        value,
                        format!("`\"{s}\"` does not match `{subject}`'s pattern `{pattern}`"),
                    );
                }
            }
            _ => {}
        }
    }

    fn violation(&mut self, value: &Value, detail: String) {
        self.diag
            .report(DiagnosticKind::ConstraintViolation, value.span)
            .message(detail)
            .emit();
    }
}

fn literal_matches(primitive: &Primitive, kind: &ValueKind) -> bool {
    matches!(
        (primitive, kind),
        (Primitive::String, ValueKind::Str(_))
            | (Primitive::Number, ValueKind::Int(_))
            | (Primitive::Number, ValueKind::Float(_))
            | (Primitive::Boolean, ValueKind::Bool(_))
    )
}

fn literal_kind_name(kind: &ValueKind) -> &'static str {
    match kind {
        ValueKind::Symbol(_) => "a symbol",
        ValueKind::Str(_) => "a string",
        ValueKind::Int(_) | ValueKind::Float(_) => "a number",
        ValueKind::Bool(_) => "a boolean",
        ValueKind::Duration(_) => "a duration",
    }
}
