//! Translate LaTeX tensor notation into symbolic component expressions.
//!
//! A [`Session`] holds the namespace, declarations and coordinate basis;
//! [`parse_latex`] runs a sentence of assignments and `%` configuration
//! directives against it, expanding Einstein-summed equations component by
//! component, and [`parse_expr`] translates a single expression.

pub mod algebra;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod session;
pub mod span;
pub mod tensor;

pub use algebra::Expr;
pub use error::{pretty_print::pretty_print, Result, RicciErr};
pub use parser::{parse_expr, parse_latex};
pub use session::{ParseOutput, Session, SessionOptions};
