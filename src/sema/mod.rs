//! Semantic analysis
//!
//! Post-order expression typing and C constant-expression evaluation over
//! the parsed tree. The analyzer decorates every expression node with its
//! type and routes violations to the diagnostic sink; the folder rewrites
//! constant subtrees into integer-constant leaves.

pub mod expr;
pub mod fold;

pub use expr::Analyzer;
pub use fold::ConstFolder;
