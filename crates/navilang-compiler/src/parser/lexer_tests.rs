use navilang_core::Span;

use super::lexer::{TokenKind, lex, token_text};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

fn kinds(source: &str) -> Vec<TokenKind> {
    let mut diag = Diagnostics::new();
    let tokens = lex(source, &mut diag);
    assert!(diag.is_empty(), "unexpected diagnostics: {diag:?}");
    tokens.into_iter().map(|t| t.kind).collect()
}

#[test]
fn keywords_are_case_insensitive() {
    assert_eq!(kinds("VAR var Var"), vec![TokenKind::Var; 3]);
    assert_eq!(
        kinds("goes TO Created bY"),
        vec![
            TokenKind::Goes,
            TokenKind::To,
            TokenKind::Created,
            TokenKind::By,
        ]
    );
}

#[test]
fn keywords_do_not_swallow_identifier_prefixes() {
    // `Total` starts with `To`, `Andrew` with `And`.
    assert_eq!(kinds("Total Andrew Byte"), vec![TokenKind::Identifier; 3]);
}

#[test]
fn transition_statement_tokens() {
    assert_eq!(
        kinds("Cart GOES TO Checkout"),
        vec![
            TokenKind::Identifier,
            TokenKind::Goes,
            TokenKind::To,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn numbers_floats_and_durations() {
    assert_eq!(
        kinds("42 3.14 30s 500ms"),
        vec![
            TokenKind::Number,
            TokenKind::Float,
            TokenKind::Duration,
            TokenKind::Duration,
        ]
    );
}

#[test]
fn comments_and_whitespace_are_skipped() {
    let source = "VAR X // trailing\n/* block\ncomment */ VAR Y";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Var,
            TokenKind::Identifier,
            TokenKind::Var,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn spans_slice_back_into_source() {
    let source = "VAR Amount: Number";
    let mut diag = Diagnostics::new();
    let tokens = lex(source, &mut diag);
    assert_eq!(token_text(source, &tokens[1]), "Amount");
    assert_eq!(tokens[1].span, Span::new(4, 10));
}

#[test]
fn quoted_strings_keep_escapes() {
    let source = r#""hello \"world\"""#;
    let mut diag = Diagnostics::new();
    let tokens = lex(source, &mut diag);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::QuotedString);
    assert_eq!(token_text(source, &tokens[0]), source);
}

#[test]
fn garbage_run_reported_once() {
    let mut diag = Diagnostics::new();
    let tokens = lex("VAR @@@ User", &mut diag);

    assert_eq!(
        tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
        vec![TokenKind::Var, TokenKind::Identifier]
    );
    assert_eq!(diag.len(), 1);
    let msg = &diag.as_slice()[0];
    assert_eq!(msg.kind(), DiagnosticKind::UnexpectedCharacter);
    // The span ends at the last bad character, not at the whitespace the
    // lexer skipped before `User`.
    assert_eq!(msg.span(), Span::new(4, 7));
    assert_eq!(msg.message(), "unexpected character: `@@@`");
}

#[test]
fn garbage_span_excludes_trailing_trivia() {
    let mut diag = Diagnostics::new();
    let tokens = lex("## // trailing comment\nVAR", &mut diag);

    assert_eq!(
        tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
        vec![TokenKind::Var]
    );
    assert_eq!(diag.len(), 1);
    let msg = &diag.as_slice()[0];
    assert_eq!(msg.span(), Span::new(0, 2));
    assert_eq!(msg.message(), "unexpected character: `##`");
}

#[test]
fn garbage_at_end_of_input_is_reported() {
    let mut diag = Diagnostics::new();
    let tokens = lex("VAR User $$", &mut diag);

    assert_eq!(tokens.len(), 2);
    assert_eq!(diag.len(), 1);
    assert_eq!(diag.as_slice()[0].span(), Span::new(9, 11));
}

#[test]
fn comparison_operators() {
    assert_eq!(
        kinds("= != < > <= >="),
        vec![
            TokenKind::Equals,
            TokenKind::NotEquals,
            TokenKind::LessThan,
            TokenKind::GreaterThan,
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
        ]
    );
}

#[test]
fn type_names_lex_as_type_tokens() {
    let ks = kinds("Entity Service Endpoint Object Enum String Number Boolean");
    assert!(ks.iter().all(|k| k.is_type_name()));
}
