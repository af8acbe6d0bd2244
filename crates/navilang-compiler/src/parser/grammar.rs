//! Recursive-descent parser producing the [`Program`] tree.
//!
//! Recovery is statement-level: when a statement goes wrong the parser
//! reports one diagnostic and resynchronizes at the next statement keyword
//! or closing brace, so a single mistake does not cascade through the rest
//! of the context.

use navilang_core::ast::{
    CmpOp, Condition, Context, Modifier, Name, Program, SeqRelation, Statement, StatementKind,
    Value, ValueKind,
};
use navilang_core::span::Span;
use navilang_core::types::{Constraint, Primitive, TypeInfo};

use super::lexer::{Token, TokenKind, lex, token_text};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Parse NaviLang source into a `Program` plus any diagnostics.
///
/// Always returns a tree; contexts or statements that failed to parse are
/// simply absent from it.
pub fn parse(source: &str) -> (Program, Diagnostics) {
    let mut diag = Diagnostics::new();
    let tokens = lex(source, &mut diag);
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        diag,
    };
    let program = parser.parse_program();
    (program, parser.diag)
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    diag: Diagnostics,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) { self.bump() } else { None }
    }

    /// Span of the current token, or an empty span at end of input.
    fn current_span(&self) -> Span {
        match self.peek() {
            Some(token) => token.span,
            None => Span::empty(self.source.len() as u32),
        }
    }

    fn text(&self, token: &Token) -> &'src str {
        token_text(self.source, token)
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if let Some(token) = self.eat(kind) {
            return Some(token);
        }
        let found = self
            .peek()
            .map(|t| t.kind.describe())
            .unwrap_or("end of input");
        self.diag
            .report(DiagnosticKind::UnexpectedToken, self.current_span())
            .message(format!("expected {}, found {found}", kind.describe()))
            .emit();
        None
    }

    // ------------------------------------------------------------------
    // Program / contexts
    // ------------------------------------------------------------------

    fn parse_program(&mut self) -> Program {
        let mut contexts = Vec::new();

        while !self.at_eof() {
            if self.at(TokenKind::Context) {
                if let Some(context) = self.parse_context() {
                    contexts.push(context);
                }
            } else {
                let token = self.peek().expect("not at eof");
                self.diag
                    .report(DiagnosticKind::UnexpectedToken, token.span)
                    .message(format!(
                        "expected `CONTEXT`, found {}",
                        token.kind.describe()
                    ))
                    .emit();
                self.bump();
            }
        }

        Program {
            contexts,
            span: Span::new(0, self.source.len() as u32),
        }
    }

    fn parse_context(&mut self) -> Option<Context> {
        let keyword = self.expect(TokenKind::Context)?;

        let (name, name_span) = match self.peek_kind() {
            Some(TokenKind::Identifier) => {
                let token = self.bump().expect("peeked");
                (self.text(&token).to_string(), token.span)
            }
            Some(TokenKind::QuotedString) => {
                let token = self.bump().expect("peeked");
                (self.string_content(&token), token.span)
            }
            _ => {
                self.diag
                    .report(DiagnosticKind::ExpectedIdentifier, self.current_span())
                    .message("context name")
                    .emit();
                self.recover_to_context();
                return None;
            }
        };

        if self.expect(TokenKind::LeftBrace).is_none() {
            self.recover_to_context();
            return None;
        }
        let statements = self.parse_block_statements();
        let end = match self.eat(TokenKind::RightBrace) {
            Some(brace) => brace.span,
            None => {
                self.diag
                    .report(DiagnosticKind::UnclosedContext, self.current_span())
                    .message(format!("context `{name}` is never closed"))
                    .related_to(keyword.span, "context opened here")
                    .emit();
                self.current_span()
            }
        };

        Some(Context {
            name,
            statements,
            span: keyword.span.cover(end),
            name_span,
        })
    }

    /// Statements until `}` or end of input. The brace itself is left for
    /// the caller.
    fn parse_block_statements(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !self.at_eof() && !self.at(TokenKind::RightBrace) {
            if self.at(TokenKind::Context) {
                // A stray `CONTEXT` inside a block means the `}` was forgotten.
                break;
            }
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.recover_to_statement(),
            }
        }
        statements
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Option<Statement> {
        let modifiers = self.parse_modifiers();
        let start = self.current_span();

        let kind = match self.peek_kind()? {
            TokenKind::Var => self.parse_var_declaration()?,
            TokenKind::If => self.parse_conditional()?,
            TokenKind::When => self.parse_event()?,
            TokenKind::Parallel => {
                self.bump();
                StatementKind::Parallel {
                    statements: self.parse_braced_block()?,
                    implicit: false,
                }
            }
            TokenKind::Loop => {
                self.bump();
                StatementKind::Loop {
                    statements: self.parse_braced_block()?,
                }
            }
            TokenKind::Identifier => self.parse_relation()?,
            other => {
                self.diag
                    .report(DiagnosticKind::UnexpectedToken, start)
                    .message(format!("{} cannot start a statement", other.describe()))
                    .emit();
                return None;
            }
        };

        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or(start);

        Some(Statement {
            kind,
            modifiers,
            span: start.cover(end),
        })
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Retry) => {
                    self.bump();
                    let count = self.parse_count();
                    modifiers.push(Modifier::Retry(count));
                }
                Some(TokenKind::Timeout) => {
                    self.bump();
                    let duration = match self.peek_kind() {
                        Some(TokenKind::Duration) | Some(TokenKind::Number) => {
                            let token = self.bump().expect("peeked");
                            self.text(&token).to_string()
                        }
                        _ => {
                            self.diag
                                .report(DiagnosticKind::UnexpectedToken, self.current_span())
                                .message("expected a duration after `TIMEOUT`")
                                .emit();
                            String::new()
                        }
                    };
                    modifiers.push(Modifier::Timeout(duration));
                }
                Some(TokenKind::Async) => {
                    self.bump();
                    modifiers.push(Modifier::Async);
                }
                Some(TokenKind::Batch) => {
                    self.bump();
                    let size = self.parse_count();
                    modifiers.push(Modifier::Batch(size));
                }
                _ => break,
            }
        }
        modifiers
    }

    fn parse_count(&mut self) -> u32 {
        match self.expect(TokenKind::Number) {
            Some(token) => self.text(&token).parse().unwrap_or_else(|_| {
                self.diag
                    .report(DiagnosticKind::UnexpectedToken, token.span)
                    .message("count out of range")
                    .emit();
                0
            }),
            None => 0,
        }
    }

    fn parse_var_declaration(&mut self) -> Option<StatementKind> {
        self.expect(TokenKind::Var)?;
        let name_token = self.expect_identifier("variable name")?;
        let name = self.text(&name_token).to_string();

        let ty = if self.eat(TokenKind::Colon).is_some() {
            Some(self.parse_type()?)
        } else {
            None
        };

        Some(StatementKind::VarDeclaration {
            name,
            ty,
            name_span: name_token.span,
        })
    }

    fn parse_type(&mut self) -> Option<TypeInfo> {
        let base = match self.peek_kind() {
            Some(TokenKind::Entity) => {
                self.bump();
                TypeInfo::Entity
            }
            Some(TokenKind::Service) => {
                self.bump();
                TypeInfo::Service
            }
            Some(TokenKind::Endpoint) => {
                self.bump();
                TypeInfo::Endpoint
            }
            Some(TokenKind::Object) => {
                self.bump();
                TypeInfo::Object
            }
            Some(TokenKind::StringType) => {
                self.bump();
                TypeInfo::Primitive(Primitive::String)
            }
            Some(TokenKind::NumberType) => {
                self.bump();
                TypeInfo::Primitive(Primitive::Number)
            }
            Some(TokenKind::BooleanType) => {
                self.bump();
                TypeInfo::Primitive(Primitive::Boolean)
            }
            Some(TokenKind::Enum) => {
                self.bump();
                TypeInfo::Enum(self.parse_enum_variants()?)
            }
            _ => {
                self.diag
                    .report(DiagnosticKind::InvalidTypeAnnotation, self.current_span())
                    .message("expected a type name after `:`")
                    .emit();
                return None;
            }
        };

        if self.at(TokenKind::LeftParen) {
            let constraints = self.parse_constraints()?;
            return Some(TypeInfo::Constrained {
                base: Box::new(base),
                constraints,
            });
        }

        Some(base)
    }

    fn parse_enum_variants(&mut self) -> Option<Vec<String>> {
        self.expect(TokenKind::LeftBracket)?;
        let mut variants = Vec::new();
        loop {
            let token = self.expect_identifier("enum variant")?;
            variants.push(self.text(&token).to_string());
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightBracket)?;
        Some(variants)
    }

    fn parse_constraints(&mut self) -> Option<Vec<Constraint>> {
        self.expect(TokenKind::LeftParen)?;
        let mut constraints = Vec::new();
        loop {
            constraints.push(self.parse_constraint()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        Some(constraints)
    }

    fn parse_constraint(&mut self) -> Option<Constraint> {
        let token = self.expect_identifier("constraint name")?;
        let name = self.text(&token);

        match name.to_ascii_lowercase().as_str() {
            "required" => Some(Constraint::Required),
            "optional" => Some(Constraint::Optional),
            "auto" => Some(Constraint::Auto),
            "positive" => Some(Constraint::Positive),
            "range" => {
                let (min, max) = self.parse_bounds()?;
                Some(Constraint::Range(min, max))
            }
            "length" => {
                let (min, max) = self.parse_bounds()?;
                Some(Constraint::Length(min, max))
            }
            "pattern" => {
                self.expect(TokenKind::LeftParen)?;
                let text_token = self.expect(TokenKind::QuotedString)?;
                let pattern = self.string_content(&text_token);
                self.expect(TokenKind::RightParen)?;
                Some(Constraint::Pattern(pattern))
            }
            _ => {
                self.diag
                    .report(DiagnosticKind::InvalidTypeAnnotation, token.span)
                    .message(format!("`{name}` is not a known constraint"))
                    .hint("known constraints: Required, Optional, Auto, Positive, Range, Length, Pattern")
                    .emit();
                None
            }
        }
    }

    fn parse_bounds(&mut self) -> Option<(i64, i64)> {
        self.expect(TokenKind::LeftParen)?;
        let min = self.parse_bound()?;
        self.expect(TokenKind::Comma)?;
        let max = self.parse_bound()?;
        self.expect(TokenKind::RightParen)?;
        Some((min, max))
    }

    fn parse_bound(&mut self) -> Option<i64> {
        let token = self.expect(TokenKind::Number)?;
        match self.text(&token).parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.diag
                    .report(DiagnosticKind::InvalidTypeAnnotation, token.span)
                    .message("bound out of range")
                    .emit();
                None
            }
        }
    }

    fn parse_conditional(&mut self) -> Option<StatementKind> {
        self.expect(TokenKind::If)?;
        let condition = self.parse_condition()?;
        self.expect(TokenKind::Then)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(TokenKind::Else).is_some() {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Some(StatementKind::Conditional {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_condition(&mut self) -> Option<Condition> {
        let subject = self.parse_name()?;
        let start = subject.span;

        let op = match self.peek_kind() {
            Some(TokenKind::Equals) => Some(CmpOp::Eq),
            Some(TokenKind::NotEquals) => Some(CmpOp::Ne),
            Some(TokenKind::LessThan) => Some(CmpOp::Lt),
            Some(TokenKind::GreaterThan) => Some(CmpOp::Gt),
            Some(TokenKind::LessEqual) => Some(CmpOp::Le),
            Some(TokenKind::GreaterEqual) => Some(CmpOp::Ge),
            _ => None,
        };

        if op.is_some() {
            self.bump();
            let value = self.parse_value()?;
            let span = start.cover(value.span);
            return Some(Condition {
                subject,
                op,
                value: Some(value),
                span,
            });
        }

        Some(Condition {
            subject,
            op: None,
            value: None,
            span: start,
        })
    }

    fn parse_event(&mut self) -> Option<StatementKind> {
        self.expect(TokenKind::When)?;
        let trigger = self.parse_name()?;
        self.expect(TokenKind::Then)?;
        let action = Box::new(self.parse_statement()?);
        Some(StatementKind::Event { trigger, action })
    }

    fn parse_braced_block(&mut self) -> Option<Vec<Statement>> {
        self.expect(TokenKind::LeftBrace)?;
        let statements = self.parse_block_statements();
        self.expect(TokenKind::RightBrace)?;
        Some(statements)
    }

    /// A statement starting with an identifier: one of the relation forms.
    fn parse_relation(&mut self) -> Option<StatementKind> {
        let first = self.parse_name()?;

        match self.peek_kind() {
            Some(TokenKind::Goes) => {
                self.bump();
                self.expect(TokenKind::To)?;
                self.parse_transition_targets(first)
            }
            Some(TokenKind::Created) => {
                self.bump();
                self.expect(TokenKind::By)?;
                let creator = self.parse_name()?;
                Some(StatementKind::Creation {
                    entity: first,
                    creator,
                })
            }
            Some(TokenKind::Does) => {
                self.bump();
                let action = self.parse_name()?;
                Some(StatementKind::Action {
                    actor: first,
                    action,
                })
            }
            Some(TokenKind::Calls) => {
                self.bump();
                let callee = self.parse_name()?;
                Some(StatementKind::Invocation {
                    caller: first,
                    callee,
                })
            }
            Some(TokenKind::Receives) => {
                self.bump();
                let message = self.parse_name()?;
                Some(StatementKind::Reception {
                    receiver: first,
                    message,
                })
            }
            Some(TokenKind::Returns) => {
                self.bump();
                let value = self.parse_value()?;
                Some(StatementKind::Return {
                    subject: first,
                    value,
                })
            }
            Some(TokenKind::Uses) => {
                self.bump();
                let target = self.parse_name()?;
                Some(StatementKind::Usage {
                    user: first,
                    target,
                })
            }
            Some(TokenKind::After) => {
                self.bump();
                let second = self.parse_name()?;
                Some(StatementKind::Sequential {
                    first,
                    relation: SeqRelation::After,
                    second,
                })
            }
            Some(TokenKind::Before) => {
                self.bump();
                let second = self.parse_name()?;
                Some(StatementKind::Sequential {
                    first,
                    relation: SeqRelation::Before,
                    second,
                })
            }
            _ => {
                let found = self
                    .peek()
                    .map(|t| t.kind.describe())
                    .unwrap_or("end of input");
                self.diag
                    .report(DiagnosticKind::UnexpectedToken, self.current_span())
                    .message(format!(
                        "expected a relation keyword after `{first}`, found {found}"
                    ))
                    .emit();
                None
            }
        }
    }

    /// `A GOES TO B` or the `A GOES TO B AND C` sugar, which groups sibling
    /// transitions from the same source into an implicit `Parallel`
    /// statement. The implicit marker keeps the sugar's transitions on
    /// plain transition semantics in flow analysis.
    fn parse_transition_targets(&mut self, source: Name) -> Option<StatementKind> {
        let first_target = self.parse_name()?;
        if !self.at(TokenKind::And) {
            return Some(StatementKind::Transition {
                source,
                target: first_target,
            });
        }

        let mut targets = vec![first_target];
        while self.eat(TokenKind::And).is_some() {
            targets.push(self.parse_name()?);
        }

        let statements = targets
            .into_iter()
            .map(|target| {
                let span = source.span.cover(target.span);
                Statement {
                    kind: StatementKind::Transition {
                        source: source.clone(),
                        target,
                    },
                    modifiers: Vec::new(),
                    span,
                }
            })
            .collect();

        Some(StatementKind::Parallel {
            statements,
            implicit: true,
        })
    }

    // ------------------------------------------------------------------
    // Operands
    // ------------------------------------------------------------------

    fn parse_name(&mut self) -> Option<Name> {
        let token = self.expect_identifier("a name")?;
        let text = self.text(&token).to_string();

        // Dotted-qualified form: `Context.Name`.
        if self.at(TokenKind::Dot) && self.nth_kind(1) == Some(TokenKind::Identifier) {
            self.bump();
            let member = self.bump().expect("peeked");
            return Some(Name {
                context: Some(text),
                name: self.text(&member).to_string(),
                span: token.span.cover(member.span),
            });
        }

        Some(Name {
            context: None,
            name: text,
            span: token.span,
        })
    }

    fn parse_value(&mut self) -> Option<Value> {
        let token = self.peek()?;
        let kind = match token.kind {
            TokenKind::QuotedString => {
                self.bump();
                ValueKind::Str(self.string_content(&token))
            }
            TokenKind::Number => {
                self.bump();
                match self.text(&token).parse() {
                    Ok(n) => ValueKind::Int(n),
                    Err(_) => {
                        self.diag
                            .report(DiagnosticKind::UnexpectedToken, token.span)
                            .message("number out of range")
                            .emit();
                        ValueKind::Int(0)
                    }
                }
            }
            TokenKind::Float => {
                self.bump();
                match self.text(&token).parse() {
                    Ok(x) => ValueKind::Float(x),
                    Err(_) => {
                        self.diag
                            .report(DiagnosticKind::UnexpectedToken, token.span)
                            .message("number out of range")
                            .emit();
                        ValueKind::Float(0.0)
                    }
                }
            }
            TokenKind::True => {
                self.bump();
                ValueKind::Bool(true)
            }
            TokenKind::False => {
                self.bump();
                ValueKind::Bool(false)
            }
            TokenKind::Duration => {
                self.bump();
                ValueKind::Duration(self.text(&token).to_string())
            }
            TokenKind::Identifier => {
                let name = self.parse_name()?;
                return Some(Value {
                    span: name.span,
                    kind: ValueKind::Symbol(name),
                });
            }
            other => {
                self.diag
                    .report(DiagnosticKind::UnexpectedToken, token.span)
                    .message(format!("expected a value, found {}", other.describe()))
                    .emit();
                return None;
            }
        };

        Some(Value {
            kind,
            span: token.span,
        })
    }

    fn expect_identifier(&mut self, what: &str) -> Option<Token> {
        if let Some(token) = self.eat(TokenKind::Identifier) {
            return Some(token);
        }
        self.diag
            .report(DiagnosticKind::ExpectedIdentifier, self.current_span())
            .message(what)
            .emit();
        None
    }

    /// Strips the surrounding quotes from a `QuotedString` token.
    fn string_content(&self, token: &Token) -> String {
        let text = self.text(token);
        text[1..text.len() - 1].to_string()
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    /// Skip ahead to the next plausible statement start or block boundary.
    fn recover_to_statement(&mut self) {
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::RightBrace
                | TokenKind::Context
                | TokenKind::Var
                | TokenKind::If
                | TokenKind::When
                | TokenKind::Parallel
                | TokenKind::Loop => return,
                // An identifier followed by a relation keyword starts a
                // statement; a lone identifier is part of the wreckage.
                TokenKind::Identifier if self.nth_is_relation(1) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn recover_to_context(&mut self) {
        while let Some(kind) = self.peek_kind() {
            if kind == TokenKind::Context {
                return;
            }
            self.bump();
        }
    }

    fn nth_is_relation(&self, n: usize) -> bool {
        matches!(
            self.nth_kind(n),
            Some(
                TokenKind::Goes
                    | TokenKind::Created
                    | TokenKind::Does
                    | TokenKind::Calls
                    | TokenKind::Receives
                    | TokenKind::Returns
                    | TokenKind::Uses
                    | TokenKind::After
                    | TokenKind::Before
            )
        )
    }
}
