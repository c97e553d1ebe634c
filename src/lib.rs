//! A small symbolic algebra system for multivariate polynomials.
//!
//! Polynomials are built out of [`Term`]s and combined into [`Expression`]
//! trees which can be simplified, evaluated, differentiated, integrated and
//! solved.
//!
//! ```rust
//! use polykit::Expression;
//!
//! let expr: Expression = "x^2 - 1".parse().unwrap();
//! let roots = expr.solve().unwrap();
//!
//! assert_eq!(roots.len(), 2);
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod calculus;
mod equations;
mod expr;
mod interpolate;
pub mod ops;
mod parse;
mod solve;
mod term;
mod vector;

pub use equations::Equation;
pub use expr::{BinaryOperation, Builtin, Expression};
pub use interpolate::{interpolate, InterpolationError};
pub use ops::EvaluationError;
pub use parse::{parse, ParseError, TokenKind};
pub use solve::{SolveError, SolveResult, Solver};
pub use term::Term;
pub use vector::Vector;
