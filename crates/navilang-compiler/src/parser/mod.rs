//! Lexing and parsing of NaviLang source text.

pub mod lexer;

mod grammar;

pub use grammar::parse;

#[cfg(test)]
mod grammar_tests;
#[cfg(test)]
mod lexer_tests;
