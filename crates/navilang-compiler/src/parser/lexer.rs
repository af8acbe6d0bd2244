//! Lexer for NaviLang source text.
//!
//! Produces span-based tokens without storing text - text is sliced from
//! source only when needed. Keywords are case-insensitive (`VAR`, `var` and
//! `Var` all lex as [`TokenKind::Var`]); whitespace and comments are skipped
//! by the lexer itself.
//!
//! ## Error handling
//!
//! Runs of characters the lexer cannot match are coalesced into a single
//! `UnexpectedCharacter` diagnostic each, rather than one per character, so
//! malformed input stays readable.

use logos::Logos;
use navilang_core::Span;

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Zero-copy token: kind + span, text retrieved via [`token_text`] when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Retrieves the text slice for a token. O(1) slice into source.
#[inline]
pub fn token_text<'src>(source: &'src str, token: &Token) -> &'src str {
    &source[token.span.range()]
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\r\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum TokenKind {
    // Core keywords (case-insensitive)
    #[regex(r"(?i)var")]
    Var,
    #[regex(r"(?i)context")]
    Context,
    #[regex(r"(?i)goes")]
    Goes,
    #[regex(r"(?i)to")]
    To,
    #[regex(r"(?i)created")]
    Created,
    #[regex(r"(?i)by")]
    By,
    #[regex(r"(?i)if")]
    If,
    #[regex(r"(?i)then")]
    Then,
    #[regex(r"(?i)else")]
    Else,
    #[regex(r"(?i)when")]
    When,
    #[regex(r"(?i)calls")]
    Calls,
    #[regex(r"(?i)receives")]
    Receives,
    #[regex(r"(?i)returns")]
    Returns,
    #[regex(r"(?i)does")]
    Does,
    #[regex(r"(?i)uses")]
    Uses,
    #[regex(r"(?i)after")]
    After,
    #[regex(r"(?i)before")]
    Before,
    #[regex(r"(?i)parallel")]
    Parallel,
    #[regex(r"(?i)and")]
    And,

    // Advanced-flow keywords
    #[regex(r"(?i)retry")]
    Retry,
    #[regex(r"(?i)timeout")]
    Timeout,
    #[regex(r"(?i)async")]
    Async,
    #[regex(r"(?i)batch")]
    Batch,
    #[regex(r"(?i)loop")]
    Loop,

    // Punctuation and operators
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(":")]
    Colon,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token(".")]
    Dot,
    #[token("=")]
    Equals,
    #[token("!=")]
    NotEquals,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,

    // Type annotations (case-insensitive)
    #[regex(r"(?i)entity")]
    Entity,
    #[regex(r"(?i)service")]
    Service,
    #[regex(r"(?i)endpoint")]
    Endpoint,
    #[regex(r"(?i)object")]
    Object,
    #[regex(r"(?i)enum")]
    Enum,
    #[regex(r"(?i)string")]
    StringType,
    #[regex(r"(?i)number")]
    NumberType,
    #[regex(r"(?i)boolean")]
    BooleanType,

    // Literals
    #[regex(r"(?i)true")]
    True,
    #[regex(r"(?i)false")]
    False,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
    #[regex(r#""([^"\\]|\\.)*""#)]
    QuotedString,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,
    #[regex(r"[0-9]+s|[0-9]+ms|[0-9]+m|[0-9]+h")]
    Duration,
}

impl TokenKind {
    /// Display name used in parser diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Var => "`VAR`",
            TokenKind::Context => "`CONTEXT`",
            TokenKind::Goes => "`GOES`",
            TokenKind::To => "`TO`",
            TokenKind::Created => "`CREATED`",
            TokenKind::By => "`BY`",
            TokenKind::If => "`IF`",
            TokenKind::Then => "`THEN`",
            TokenKind::Else => "`ELSE`",
            TokenKind::When => "`WHEN`",
            TokenKind::Calls => "`CALLS`",
            TokenKind::Receives => "`RECEIVES`",
            TokenKind::Returns => "`RETURNS`",
            TokenKind::Does => "`DOES`",
            TokenKind::Uses => "`USES`",
            TokenKind::After => "`AFTER`",
            TokenKind::Before => "`BEFORE`",
            TokenKind::Parallel => "`PARALLEL`",
            TokenKind::And => "`AND`",
            TokenKind::Retry => "`RETRY`",
            TokenKind::Timeout => "`TIMEOUT`",
            TokenKind::Async => "`ASYNC`",
            TokenKind::Batch => "`BATCH`",
            TokenKind::Loop => "`LOOP`",
            TokenKind::LeftBrace => "`{`",
            TokenKind::RightBrace => "`}`",
            TokenKind::Colon => "`:`",
            TokenKind::LeftBracket => "`[`",
            TokenKind::RightBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::LeftParen => "`(`",
            TokenKind::RightParen => "`)`",
            TokenKind::Dot => "`.`",
            TokenKind::Equals => "`=`",
            TokenKind::NotEquals => "`!=`",
            TokenKind::LessThan => "`<`",
            TokenKind::GreaterThan => "`>`",
            TokenKind::LessEqual => "`<=`",
            TokenKind::GreaterEqual => "`>=`",
            TokenKind::Entity => "`Entity`",
            TokenKind::Service => "`Service`",
            TokenKind::Endpoint => "`Endpoint`",
            TokenKind::Object => "`Object`",
            TokenKind::Enum => "`Enum`",
            TokenKind::StringType => "`String`",
            TokenKind::NumberType => "`Number`",
            TokenKind::BooleanType => "`Boolean`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Identifier => "an identifier",
            TokenKind::QuotedString => "a quoted string",
            TokenKind::Number => "a number",
            TokenKind::Float => "a number",
            TokenKind::Duration => "a duration",
        }
    }

    /// Whether this token can start a type annotation.
    pub fn is_type_name(&self) -> bool {
        matches!(
            self,
            TokenKind::Entity
                | TokenKind::Service
                | TokenKind::Endpoint
                | TokenKind::Object
                | TokenKind::Enum
                | TokenKind::StringType
                | TokenKind::NumberType
                | TokenKind::BooleanType
        )
    }
}

/// Tokenizes source into a vector of span-based tokens.
///
/// Lexing never fails: unmatched characters are reported into `diag` and
/// dropped from the stream.
pub fn lex(source: &str, diag: &mut Diagnostics) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    // Start and end of the current error run. The end comes from the last
    // `Err` span, so skipped trivia after the run never leaks into it.
    let mut error_run: Option<(usize, usize)> = None;

    loop {
        match lexer.next() {
            Some(Ok(kind)) => {
                if let Some((start, end)) = error_run.take() {
                    report_garbage(source, start, end, diag);
                }
                tokens.push(Token::new(kind, lexer.span().into()));
            }
            Some(Err(())) => {
                let span = lexer.span();
                match &mut error_run {
                    Some((_, end)) => *end = span.end,
                    None => error_run = Some((span.start, span.end)),
                }
            }
            None => {
                if let Some((start, end)) = error_run.take() {
                    report_garbage(source, start, end, diag);
                }
                break;
            }
        }
    }

    tokens
}

fn report_garbage(source: &str, start: usize, end: usize, diag: &mut Diagnostics) {
    let span = Span::new(start as u32, end as u32);
    diag.report(DiagnosticKind::UnexpectedCharacter, span)
        .message(format!("`{}`", &source[span.range()]))
        .emit();
}
