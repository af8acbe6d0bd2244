//! Compiler front end for NaviLang: lexing, parsing, and semantic analysis
//! of declarative flow models.
//!
//! The pipeline is a pure function of the source text:
//!
//! ```text
//! source → lex → parse → analyze → (Program, SemanticModel, Diagnostics)
//! ```
//!
//! No stage aborts on faults; everything found along the way accumulates in
//! an ordered [`Diagnostics`] collection and the model comes back with the
//! faulty parts simply absent. [`Analysis::into_result`] converts an
//! error-bearing run into an [`Error`] for callers that want `?`.
//!
//! ```
//! let analysis = navilang_compiler::compile(
//!     "CONTEXT Shop { Cart GOES TO Checkout }",
//! );
//! assert!(!analysis.diagnostics.has_errors());
//! assert!(analysis.model.flow.node_id("Cart").is_some());
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod analyze;
pub mod diagnostics;
pub mod parser;


use navilang_core::ast::Program;

pub use analyze::{SemanticModel, analyze};
pub use diagnostics::{DiagnosticKind, DiagnosticMessage, Diagnostics, Severity};
pub use parser::parse;

/// Everything a compile run produces.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub program: Program,
    pub model: SemanticModel,
    /// All diagnostics, in pass order then discovery order.
    pub diagnostics: Diagnostics,
}

impl Analysis {
    /// Split into outputs and an error when any error-severity diagnostic
    /// was raised. Warnings alone do not fail the run.
    pub fn into_result(self) -> Result<(Program, SemanticModel), Error> {
        if !self.diagnostics.has_errors() {
            return Ok((self.program, self.model));
        }

        let parse_error = self
            .diagnostics
            .iter()
            .any(|d| d.is_error() && d.kind() <= DiagnosticKind::InvalidTypeAnnotation);
        if parse_error {
            Err(Error::ParseFailed(self.diagnostics))
        } else {
            Err(Error::AnalysisFailed(self.diagnostics))
        }
    }

    /// Render every diagnostic as an annotated snippet of `source`.
    pub fn render_diagnostics(&self, source: &str) -> String {
        self.diagnostics.render(source)
    }
}

/// Failure modes of [`compile`], carrying the full diagnostic list.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("parsing failed with {} error(s)", .0.error_count())]
    ParseFailed(Diagnostics),
    #[error("analysis failed with {} error(s)", .0.error_count())]
    AnalysisFailed(Diagnostics),
}

impl Error {
    pub fn diagnostics(&self) -> &Diagnostics {
        match self {
            Error::ParseFailed(diag) | Error::AnalysisFailed(diag) => diag,
        }
    }
}

/// Compile NaviLang source: lex, parse, and analyze.
///
/// Stateless; nothing is shared or cached between invocations.
pub fn compile(source: &str) -> Analysis {
    let (program, mut diagnostics) = parser::parse(source);
    let (model, analysis_diag) = analyze::analyze(&program);
    diagnostics.extend(analysis_diag);
    Analysis {
        program,
        model,
        diagnostics,
    }
}
