//! End-to-end checks over the whole analysis pipeline.

use indoc::indoc;

use super::analyze;
use crate::diagnostics::DiagnosticKind;
use crate::parser::parse;

fn run(source: &str) -> (super::SemanticModel, crate::diagnostics::Diagnostics) {
    let (program, diag) = parse(source);
    assert!(diag.is_empty(), "parse diagnostics: {diag:?}");
    analyze(&program)
}

#[test]
fn contexts_are_isolated() {
    // The same name declared in two contexts raises nothing.
    let (model, diag) = run(indoc! {"
        CONTEXT A { VAR X: Number }
        CONTEXT B { VAR X: String }
    "});
    assert!(diag.is_empty(), "diagnostics: {diag:?}");
    assert_eq!(model.contexts.len(), 2);
    assert!(model.contexts["A"].symbols.contains("X"));
    assert!(model.contexts["B"].symbols.contains("X"));
    assert_eq!(model.types.len(), 2);
}

#[test]
fn bare_transition_cycle_yields_exactly_one_report() {
    let (_, diag) = run(indoc! {"
        CONTEXT C {
            A GOES TO B
            B GOES TO A
        }
    "});
    assert_eq!(diag.len(), 1);
    assert_eq!(diag.as_slice()[0].kind(), DiagnosticKind::UnintendedCycle);
}

#[test]
fn mutual_creation_yields_exactly_one_report() {
    let (model, diag) = run(indoc! {"
        CONTEXT C {
            Order CREATED BY User
            User CREATED BY Order
        }
    "});
    assert_eq!(diag.len(), 1);
    let msg = &diag.as_slice()[0];
    assert_eq!(msg.kind(), DiagnosticKind::CircularDependency);
    assert_eq!(msg.message(), "circular dependency between `Order`, `User`");
    assert!(model.execution_order.is_empty());
}

#[test]
fn enum_mismatch_yields_exactly_one_report() {
    let (_, diag) = run(indoc! {r#"
        CONTEXT C {
            VAR Status: Enum [Active, Inactive]
            Status RETURNS "Deleted"
        }
    "#});
    assert_eq!(diag.len(), 1);
    assert_eq!(
        diag.as_slice()[0].kind(),
        DiagnosticKind::ConstraintViolation
    );
}

#[test]
fn diagnostics_are_deterministic_across_runs() {
    let source = indoc! {r#"
        CONTEXT Shop {
            VAR Status: Enum [Active, Inactive]
            Status RETURNS "Deleted"
            A GOES TO B
            B GOES TO A
            Order CREATED BY User
            User CREATED BY Order
        }
    "#};

    let render = |source| {
        let (model, diag) = run(source);
        (
            diag.printer().render(),
            model.execution_order.clone(),
        )
    };
    assert_eq!(render(source), render(source));
}

#[test]
fn diagnostics_follow_pass_order() {
    let (_, diag) = run(indoc! {r#"
        CONTEXT C {
            VAR Status: Enum [Active, Inactive]
            Checkout CALLS Missing
            Status RETURNS "Deleted"
            A GOES TO B
            B GOES TO A
            Order CREATED BY User
            User CREATED BY Order
        }
    "#});
    let kinds: Vec<DiagnosticKind> = diag.iter().map(|d| d.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::UnknownIdentifier,
            DiagnosticKind::ConstraintViolation,
            DiagnosticKind::UnintendedCycle,
            DiagnosticKind::CircularDependency,
        ]
    );
}

#[test]
fn duplicate_context_is_skipped_with_a_warning() {
    let (model, diag) = run(indoc! {"
        CONTEXT C { VAR A: Number }
        CONTEXT C { VAR B: Number }
    "});
    let kinds: Vec<DiagnosticKind> = diag.iter().map(|d| d.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::DuplicateDeclaration,
            DiagnosticKind::SkippedContext,
        ]
    );
    assert!(diag.as_slice()[1].is_warning());

    // Only the surviving context appears in the model.
    assert_eq!(model.contexts.len(), 1);
    assert!(model.contexts["C"].symbols.contains("A"));
    assert!(!model.contexts["C"].symbols.contains("B"));
}

#[test]
fn faulty_input_still_produces_a_model() {
    let (model, diag) = run(indoc! {"
        CONTEXT C {
            Checkout CALLS Missing
            Cart GOES TO Done
            Order CREATED BY User
        }
    "});
    assert!(diag.has_errors());
    assert!(model.flow.node_id("Cart").is_some());
    // The unresolved callee still participates in the dependency order.
    assert_eq!(
        model.execution_order,
        vec!["Missing", "Checkout", "User", "Order"]
    );
}

#[test]
fn execution_order_spans_contexts() {
    let (model, diag) = run(indoc! {"
        CONTEXT Shop { Order CREATED BY User }
        CONTEXT Billing { Invoice CREATED BY Order }
    "});
    assert!(!diag.has_errors());
    assert_eq!(model.execution_order, vec!["User", "Order", "Invoice"]);
}

#[test]
fn model_serializes_to_json() {
    let (model, _) = run(indoc! {"
        CONTEXT Shop {
            VAR Cart: Entity
            Cart GOES TO Checkout
            Order CREATED BY User
        }
    "});
    let value = serde_json::to_value(&model).expect("serializable model");
    assert!(value["contexts"]["Shop"]["symbols"].is_object());
    assert_eq!(value["execution_order"][0], "User");
}
