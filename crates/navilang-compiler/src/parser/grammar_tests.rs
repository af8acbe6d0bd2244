use indoc::indoc;
use navilang_core::ast::{CmpOp, Modifier, SeqRelation, StatementKind, ValueKind};
use navilang_core::types::{Constraint, Primitive, TypeInfo};

use super::parse;
use crate::diagnostics::DiagnosticKind;

#[track_caller]
fn parse_ok(source: &str) -> navilang_core::ast::Program {
    let (program, diag) = parse(source);
    assert!(diag.is_empty(), "unexpected diagnostics: {diag:?}");
    program
}

#[track_caller]
fn single_statement(source: &str) -> StatementKind {
    let program = parse_ok(source);
    assert_eq!(program.contexts.len(), 1);
    let context = &program.contexts[0];
    assert_eq!(context.statements.len(), 1);
    context.statements[0].kind.clone()
}

#[test]
fn empty_context() {
    let program = parse_ok("CONTEXT Checkout { }");
    assert_eq!(program.contexts.len(), 1);
    assert_eq!(program.contexts[0].name, "Checkout");
    assert!(program.contexts[0].statements.is_empty());
}

#[test]
fn quoted_context_name() {
    let program = parse_ok(r#"CONTEXT "Order Flow" { }"#);
    assert_eq!(program.contexts[0].name, "Order Flow");
}

#[test]
fn var_without_type() {
    let kind = single_statement("CONTEXT C { VAR Cart }");
    assert_eq!(
        kind,
        StatementKind::VarDeclaration {
            name: "Cart".into(),
            ty: None,
            name_span: kind_span(&kind),
        }
    );
}

// Helper so the VarDeclaration equality above doesn't hardcode the span.
fn kind_span(kind: &StatementKind) -> navilang_core::Span {
    match kind {
        StatementKind::VarDeclaration { name_span, .. } => *name_span,
        _ => panic!("not a declaration"),
    }
}

#[test]
fn var_with_primitive_type() {
    let kind = single_statement("CONTEXT C { VAR Total: Number }");
    match kind {
        StatementKind::VarDeclaration { name, ty, .. } => {
            assert_eq!(name, "Total");
            assert_eq!(ty, Some(TypeInfo::Primitive(Primitive::Number)));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn var_with_enum_type() {
    let kind = single_statement("CONTEXT C { VAR Status: Enum [Pending, Paid, Shipped] }");
    match kind {
        StatementKind::VarDeclaration { ty, .. } => {
            assert_eq!(
                ty,
                Some(TypeInfo::Enum(vec![
                    "Pending".into(),
                    "Paid".into(),
                    "Shipped".into(),
                ]))
            );
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn var_with_constraints() {
    let kind =
        single_statement(r#"CONTEXT C { VAR Email: String (Required, Pattern(".+@.+")) }"#);
    match kind {
        StatementKind::VarDeclaration { ty, .. } => {
            assert_eq!(
                ty,
                Some(TypeInfo::Constrained {
                    base: Box::new(TypeInfo::Primitive(Primitive::String)),
                    constraints: vec![
                        Constraint::Required,
                        Constraint::Pattern(".+@.+".into()),
                    ],
                })
            );
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn range_and_length_constraints() {
    let kind = single_statement("CONTEXT C { VAR Qty: Number (Range(1, 100), Positive) }");
    match kind {
        StatementKind::VarDeclaration { ty, .. } => {
            let Some(TypeInfo::Constrained { constraints, .. }) = ty else {
                panic!("expected constrained type");
            };
            assert_eq!(
                constraints,
                vec![Constraint::Range(1, 100), Constraint::Positive]
            );
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn transition_statement() {
    let kind = single_statement("CONTEXT C { Cart GOES TO Checkout }");
    match kind {
        StatementKind::Transition { source, target } => {
            assert_eq!(source.name, "Cart");
            assert_eq!(target.name, "Checkout");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn multi_target_transition_desugars_to_parallel() {
    let kind = single_statement("CONTEXT C { Start GOES TO A AND B AND C }");
    let StatementKind::Parallel {
        statements,
        implicit,
    } = kind
    else {
        panic!("expected parallel group");
    };
    assert!(implicit, "the sugar form is marked implicit");
    assert_eq!(statements.len(), 3);
    for (stmt, expected) in statements.iter().zip(["A", "B", "C"]) {
        match &stmt.kind {
            StatementKind::Transition { source, target } => {
                assert_eq!(source.name, "Start");
                assert_eq!(target.name, expected);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

#[test]
fn qualified_names_cross_contexts() {
    let kind = single_statement("CONTEXT C { Checkout CALLS Billing.Invoice }");
    match kind {
        StatementKind::Invocation { caller, callee } => {
            assert!(!caller.is_qualified());
            assert_eq!(callee.context.as_deref(), Some("Billing"));
            assert_eq!(callee.name, "Invoice");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn relation_statements() {
    let cases: &[(&str, fn(&StatementKind) -> bool)] = &[
        ("Order CREATED BY User", |k| {
            matches!(k, StatementKind::Creation { .. })
        }),
        ("User DOES Login", |k| {
            matches!(k, StatementKind::Action { .. })
        }),
        ("Api RECEIVES Request", |k| {
            matches!(k, StatementKind::Reception { .. })
        }),
        ("Checkout USES Cart", |k| {
            matches!(k, StatementKind::Usage { .. })
        }),
        ("Ship AFTER Pay", |k| {
            matches!(
                k,
                StatementKind::Sequential {
                    relation: SeqRelation::After,
                    ..
                }
            )
        }),
        ("Pack BEFORE Ship", |k| {
            matches!(
                k,
                StatementKind::Sequential {
                    relation: SeqRelation::Before,
                    ..
                }
            )
        }),
    ];

    for (stmt, check) in cases {
        let kind = single_statement(&format!("CONTEXT C {{ {stmt} }}"));
        assert!(check(&kind), "statement `{stmt}` parsed as {kind:?}");
    }
}

#[test]
fn return_with_literal_values() {
    let kind = single_statement(r#"CONTEXT C { Api RETURNS "Deleted" }"#);
    match kind {
        StatementKind::Return { subject, value } => {
            assert_eq!(subject.name, "Api");
            assert_eq!(value.kind, ValueKind::Str("Deleted".into()));
        }
        other => panic!("unexpected: {other:?}"),
    }

    let kind = single_statement("CONTEXT C { Api RETURNS 42 }");
    let StatementKind::Return { value, .. } = kind else {
        panic!("expected return");
    };
    assert_eq!(value.kind, ValueKind::Int(42));

    let kind = single_statement("CONTEXT C { Api RETURNS true }");
    let StatementKind::Return { value, .. } = kind else {
        panic!("expected return");
    };
    assert_eq!(value.kind, ValueKind::Bool(true));
}

#[test]
fn conditional_with_comparison_and_else() {
    let kind = single_statement(
        "CONTEXT C { IF Total > 100 THEN Cart GOES TO Discount ELSE Cart GOES TO Checkout }",
    );
    let StatementKind::Conditional {
        condition,
        then_branch,
        else_branch,
    } = kind
    else {
        panic!("expected conditional");
    };
    assert_eq!(condition.subject.name, "Total");
    assert_eq!(condition.op, Some(CmpOp::Gt));
    assert_eq!(
        condition.value.as_ref().map(|v| &v.kind),
        Some(&ValueKind::Int(100))
    );
    assert!(matches!(then_branch.kind, StatementKind::Transition { .. }));
    assert!(matches!(
        else_branch.as_deref().map(|s| &s.kind),
        Some(StatementKind::Transition { .. })
    ));
}

#[test]
fn bare_condition_subject() {
    let kind = single_statement("CONTEXT C { IF Valid THEN Form GOES TO Submitted }");
    let StatementKind::Conditional { condition, .. } = kind else {
        panic!("expected conditional");
    };
    assert_eq!(condition.subject.name, "Valid");
    assert!(condition.op.is_none());
    assert!(condition.value.is_none());
}

#[test]
fn event_statement() {
    let kind = single_statement("CONTEXT C { WHEN PaymentFailed THEN Order GOES TO Cancelled }");
    let StatementKind::Event { trigger, action } = kind else {
        panic!("expected event");
    };
    assert_eq!(trigger.name, "PaymentFailed");
    assert!(matches!(action.kind, StatementKind::Transition { .. }));
}

#[test]
fn parallel_and_loop_blocks() {
    let source = indoc! {"
        CONTEXT C {
            PARALLEL {
                A GOES TO B
                A GOES TO C
            }
            LOOP {
                Poll GOES TO Check
                Check GOES TO Poll
            }
        }
    "};
    let program = parse_ok(source);
    let statements = &program.contexts[0].statements;
    assert_eq!(statements.len(), 2);
    assert!(matches!(
        statements[0].kind,
        StatementKind::Parallel { ref statements, implicit: false } if statements.len() == 2
    ));
    assert!(matches!(
        statements[1].kind,
        StatementKind::Loop { ref statements } if statements.len() == 2
    ));
}

#[test]
fn modifier_prefixes() {
    let program = parse_ok("CONTEXT C { RETRY 3 TIMEOUT 30s ASYNC Api CALLS Gateway }");
    let stmt = &program.contexts[0].statements[0];
    assert_eq!(
        stmt.modifiers,
        vec![
            Modifier::Retry(3),
            Modifier::Timeout("30s".into()),
            Modifier::Async,
        ]
    );
    assert!(matches!(stmt.kind, StatementKind::Invocation { .. }));
}

#[test]
fn batch_modifier() {
    let program = parse_ok("CONTEXT C { BATCH 10 Worker DOES Process }");
    assert_eq!(
        program.contexts[0].statements[0].modifiers,
        vec![Modifier::Batch(10)]
    );
}

#[test]
fn unclosed_context_is_reported() {
    let (program, diag) = parse("CONTEXT C { Cart GOES TO Checkout");
    assert_eq!(program.contexts.len(), 1);
    assert_eq!(program.contexts[0].statements.len(), 1);
    assert!(
        diag.iter()
            .any(|d| d.kind() == DiagnosticKind::UnclosedContext)
    );
}

#[test]
fn missing_brace_recovers_at_next_context() {
    let source = indoc! {"
        CONTEXT First {
            A GOES TO B
        CONTEXT Second {
            C GOES TO D
        }
    "};
    let (program, diag) = parse(source);
    assert_eq!(program.contexts.len(), 2);
    assert_eq!(program.contexts[1].name, "Second");
    assert!(
        diag.iter()
            .any(|d| d.kind() == DiagnosticKind::UnclosedContext)
    );
}

#[test]
fn bad_statement_does_not_poison_the_rest() {
    let source = indoc! {"
        CONTEXT C {
            Cart GOES Checkout
            Cart GOES TO Done
        }
    "};
    let (program, diag) = parse(source);
    assert!(diag.has_errors());
    // The well-formed statement after the broken one still parses.
    assert!(program.contexts[0].statements.iter().any(|s| matches!(
        &s.kind,
        StatementKind::Transition { target, .. } if target.name == "Done"
    )));
}

#[test]
fn unknown_constraint_is_reported() {
    let (_, diag) = parse("CONTEXT C { VAR X: Number (Bogus) }");
    assert!(
        diag.iter()
            .any(|d| d.kind() == DiagnosticKind::InvalidTypeAnnotation)
    );
}

#[test]
fn statements_before_any_context_are_rejected() {
    let (program, diag) = parse("VAR X CONTEXT C { }");
    assert_eq!(program.contexts.len(), 1);
    assert!(
        diag.iter()
            .any(|d| d.kind() == DiagnosticKind::UnexpectedToken)
    );
}
