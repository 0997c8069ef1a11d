//! XPath 1.0 Engine
//!
//! Full XPath 1.0 implementation with:
//! - All 13 axes (the namespace axis is always empty)
//! - The core function library
//! - Compiled expression caching
//!
//! Prefixed name tests resolve through a caller-supplied
//! [`PrefixRegistry`](crate::dom::PrefixRegistry).

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use cache::ExpressionCache;
pub use compiler::{compile, CompiledExpr};
pub use eval::evaluate_at;
#[cfg(test)]
pub(crate) use eval::{evaluate, evaluate_from_node};
pub use value::XPathValue;
