use navilang_core::Span;

/// Diagnostic kinds, grouped by the pass that emits them.
///
/// The declaration order follows the fixed pass ordering (lexer/parser,
/// context resolver, type checker, flow validator, dependency resolver,
/// orchestrator), which is also the order diagnostics are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticKind {
    // Lexing and parsing
    UnexpectedCharacter,
    UnexpectedToken,
    ExpectedIdentifier,
    UnclosedContext,
    InvalidTypeAnnotation,

    // Context resolution
    DuplicateDeclaration,
    UnknownContext,
    UnknownIdentifier,

    // Type checking
    TypeMismatch,
    ConstraintViolation,

    // Flow validation
    UnintendedCycle,
    PossibleDeadEnd,
    UnreachableState,

    // Dependency resolution
    CircularDependency,

    // Orchestration
    SkippedContext,
}

impl DiagnosticKind {
    /// Default severity for this kind.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::PossibleDeadEnd | Self::UnreachableState | Self::SkippedContext => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Base message for this diagnostic kind, used when no detail is provided.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::UnexpectedCharacter => "unexpected character",
            Self::UnexpectedToken => "unexpected token",
            Self::ExpectedIdentifier => "expected an identifier",
            Self::UnclosedContext => "missing closing `}`",
            Self::InvalidTypeAnnotation => "invalid type annotation",

            Self::DuplicateDeclaration => "duplicate declaration",
            Self::UnknownContext => "unknown context",
            Self::UnknownIdentifier => "unknown identifier",

            Self::TypeMismatch => "type mismatch",
            Self::ConstraintViolation => "constraint violation",

            Self::UnintendedCycle => "transition cycle outside a loop",
            Self::PossibleDeadEnd => "possible dead end",
            Self::UnreachableState => "unreachable state",

            Self::CircularDependency => "circular dependency",

            Self::SkippedContext => "context skipped",
        }
    }

    /// Template for detailed messages. Contains `{}` for caller-provided detail.
    pub fn custom_message(&self) -> String {
        match self {
            Self::DuplicateDeclaration => "`{}` is already declared in this context".to_string(),
            Self::UnknownContext => "`{}` is not a known context".to_string(),
            Self::UnknownIdentifier => "`{}` is not declared".to_string(),
            Self::UnintendedCycle => {
                "states {} form a cycle outside a LOOP or PARALLEL block".to_string()
            }
            Self::PossibleDeadEnd => "`{}` has no outgoing transition".to_string(),
            Self::UnreachableState => "`{}` is not reachable from any entry state".to_string(),
            Self::CircularDependency => "circular dependency between {}".to_string(),
            Self::SkippedContext => "`{}` was not analyzed".to_string(),
            _ => format!("{}: {{}}", self.fallback_message()),
        }
    }

    /// Render the final message.
    ///
    /// - `None` → `fallback_message()`
    /// - `Some(detail)` → `custom_message()` with `{}` replaced by detail
    pub fn message(&self, detail: Option<&str>) -> String {
        match detail {
            None => self.fallback_message().to_string(),
            Some(detail) => self.custom_message().replace("{}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A secondary span attached to a diagnostic ("first declared here", cycle
/// chain steps, and the like).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) span: Span,
    pub(crate) message: String,
}

impl RelatedInfo {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticMessage {
    pub(crate) kind: DiagnosticKind,
    pub(crate) span: Span,
    pub(crate) message: String,
    pub(crate) related: Vec<RelatedInfo>,
    pub(crate) hints: Vec<String>,
}

impl DiagnosticMessage {
    pub(crate) fn new(kind: DiagnosticKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            related: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub(crate) fn with_default_message(kind: DiagnosticKind, span: Span) -> Self {
        Self::new(kind, span, kind.fallback_message())
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.kind.default_severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}: {}",
            self.severity(),
            self.span,
            self.message
        )?;
        for related in &self.related {
            write!(f, " (related: {} at {})", related.message, related.span)?;
        }
        for hint in &self.hints {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}
