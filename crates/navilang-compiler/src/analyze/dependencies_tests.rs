use indoc::indoc;
use navilang_core::ast::{Context, Program};

use super::dependencies::{DepKind, DependencyGraph};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::parser::parse;

#[track_caller]
fn program(source: &str) -> Program {
    let (program, diag) = parse(source);
    assert!(diag.is_empty(), "parse diagnostics: {diag:?}");
    program
}

fn build(source: &str) -> DependencyGraph {
    let program = program(source);
    let kept: Vec<&Context> = program.contexts.iter().collect();
    DependencyGraph::build(&kept)
}

fn order_and_diags(source: &str) -> (Vec<String>, Diagnostics) {
    let graph = build(source);
    let mut diag = Diagnostics::new();
    let order = graph.execution_order(&mut diag);
    (order, diag)
}

#[test]
fn created_by_makes_the_creator_come_first() {
    let (order, diag) = order_and_diags("CONTEXT C { Order CREATED BY User }");
    assert!(diag.is_empty());
    assert_eq!(order, vec!["User", "Order"]);
}

#[test]
fn edge_kinds_follow_the_statement_form() {
    let graph = build(indoc! {"
        CONTEXT C {
            Order CREATED BY User
            Checkout USES Cart
            Checkout CALLS Gateway
            Ship AFTER Pay
        }
    "});
    let kinds: Vec<DepKind> = graph.edges().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DepKind::CreatedBy,
            DepKind::Uses,
            DepKind::Calls,
            DepKind::After,
        ]
    );
}

#[test]
fn before_reverses_the_edge() {
    let (order, diag) = order_and_diags("CONTEXT C { Pack BEFORE Ship }");
    assert!(diag.is_empty());
    // `Ship` depends on `Pack`.
    assert_eq!(order, vec!["Pack", "Ship"]);

    let graph = build("CONTEXT C { Pack BEFORE Ship }");
    let edge = &graph.edges()[0];
    assert_eq!(graph.node(edge.dependent).name, "Ship");
    assert_eq!(graph.node(edge.dependency).name, "Pack");
    assert_eq!(edge.kind, DepKind::Before);
}

#[test]
fn chains_order_dependencies_first() {
    let (order, diag) = order_and_diags(indoc! {"
        CONTEXT C {
            Invoice CREATED BY Order
            Order CREATED BY User
        }
    "});
    assert!(diag.is_empty());
    assert_eq!(order, vec!["User", "Order", "Invoice"]);
}

#[test]
fn independent_nodes_keep_first_appearance_order() {
    let (order, diag) = order_and_diags(indoc! {"
        CONTEXT C {
            A USES Lib
            B USES Lib
        }
    "});
    assert!(diag.is_empty());
    // `A` appeared before `Lib`; both are ready once `Lib` is emitted.
    assert_eq!(order, vec!["Lib", "A", "B"]);
}

#[test]
fn cycle_reported_once_naming_each_member() {
    let (order, diag) = order_and_diags(indoc! {"
        CONTEXT C {
            Order CREATED BY User
            User CREATED BY Order
        }
    "});
    assert!(order.is_empty());
    assert_eq!(diag.len(), 1);
    let msg = &diag.as_slice()[0];
    assert_eq!(msg.kind(), DiagnosticKind::CircularDependency);
    assert_eq!(
        msg.message(),
        "circular dependency between `Order`, `User`"
    );
}

#[test]
fn self_dependency_is_a_cycle() {
    let (order, diag) = order_and_diags("CONTEXT C { Cache USES Cache }");
    assert!(order.is_empty());
    assert_eq!(diag.len(), 1);
    assert_eq!(diag.as_slice()[0].kind(), DiagnosticKind::CircularDependency);
}

#[test]
fn nodes_behind_a_cycle_are_excluded_but_not_blamed() {
    let (order, diag) = order_and_diags(indoc! {"
        CONTEXT C {
            A USES B
            B USES A
            Report CREATED BY A
        }
    "});
    // `Report` waits on the cycle forever but is not itself cyclic.
    assert!(order.is_empty());
    assert_eq!(diag.len(), 1);
    let msg = &diag.as_slice()[0];
    assert_eq!(msg.message(), "circular dependency between `A`, `B`");
}

#[test]
fn two_distinct_cycles_get_two_reports() {
    let (_, diag) = order_and_diags(indoc! {"
        CONTEXT C {
            A USES B
            B USES A
            X USES Y
            Y USES X
        }
    "});
    let cycles = diag
        .iter()
        .filter(|d| d.kind() == DiagnosticKind::CircularDependency)
        .count();
    assert_eq!(cycles, 2);
}

#[test]
fn dependencies_nested_in_blocks_are_collected() {
    let (order, diag) = order_and_diags(indoc! {"
        CONTEXT C {
            IF Ready THEN Order CREATED BY User
        }
    "});
    assert!(diag.is_empty());
    assert_eq!(order, vec!["User", "Order"]);
}
