//! # Quadc - C89/C99 semantic analysis and quadruple IR
//!
//! [![Crates.io](https://img.shields.io/crates/v/quadc.svg)](https://crates.io/crates/quadc)
//! [![Documentation](https://docs.rs/quadc/badge.svg)](https://docs.rs/quadc)
//! [![License: MIT](https://img.shields.io/badge/License-MIT-yellow.svg)](https://opensource.org/licenses/MIT)
//!
//! The semantic core of a C89/C99 compiler: expression type analysis over
//! a parsed syntax tree, C constant-expression evaluation, and lowering of
//! function bodies into three-address quadruples with a control-flow graph
//! over basic blocks.
//!
//! Lexing/parsing, the backend code emitters, and the driver are external
//! collaborators; this crate consumes their AST and produces a decorated
//! tree, a quad stream, an address table, and a CFG ready for dataflow
//! analysis.
//!
//! ## Architecture
//!
//! ```text
//! AST → Analyzer (types + diagnostics) → ConstFolder (folds constants)
//!     → IrGenerator (quads + addresses) → Cfg (blocks, PO/RPO orders)
//! ```
//!
//! ## Main components
//!
//! - [`Analyzer`] - post-order expression typing with the full C
//!   conversion and compatibility rules
//! - [`ConstFolder`] - integer and address-constant evaluation, memoized
//!   by rewriting folded nodes in place
//! - [`IrContext`] / [`IrGenerator`] - per-function lowering state and the
//!   statement/expression lowerer
//! - [`Cfg`] - basic blocks with forward and reverse DFS numberings
//! - [`Symbols`] / [`Diagnostics`] - in-memory collaborator
//!   implementations for tags, layouts, and diagnostics
//!
//! ## Quick start
//!
//! ```rust
//! use quadc::ast::{Declaration, ExecNode, SrcLoc, Token, TypeSpec, VarBinding};
//! use quadc::{Analyzer, Diagnostics, Symbols, TargetConfig};
//!
//! // int a; unsigned b;  analyze `a + b`
//! let loc = SrcLoc::new("demo.c", 1, 1);
//! let a = ExecNode::id(
//!     "a",
//!     Declaration::base(TypeSpec::Int),
//!     VarBinding::local(1),
//!     loc.clone(),
//! );
//! let b = ExecNode::id(
//!     "b",
//!     Declaration::base(TypeSpec::Unsigned),
//!     VarBinding::local(1),
//!     loc.clone(),
//! );
//! let mut sum = ExecNode::binary(Token::Plus, a, b, loc);
//!
//! let syms = Symbols::new();
//! let mut diags = Diagnostics::new();
//! let mut analyzer = Analyzer::new(&syms, &mut diags, TargetConfig::default());
//! analyzer.analyze(&mut sum);
//!
//! // the usual arithmetic conversions make the result unsigned
//! assert_eq!(sum.ty.category(), Token::Unsigned);
//! assert!(diags.is_clean());
//! ```

// Allow specific clippy warnings that are intentional design choices
#![allow(clippy::only_used_in_recursion)] // recursive tree walkers carry their context
#![allow(clippy::too_many_arguments)] // quad emission mirrors the instruction shape

/// Version of the quadc core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod arena;
pub mod ast;
pub mod diag;
pub mod error;
pub mod ir;
pub mod sema;
pub mod sym;
pub mod target;
pub mod types;

// Re-export main types
pub use arena::{Arena, NameRef};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, ErrorSeverity, Result};
pub use ir::{Address, BitSet, Cfg, CfgNode, IrContext, IrGenerator, OpKind, Quad, ENTRY_NODE};
pub use sema::{Analyzer, ConstFolder};
pub use sym::{LocationMap, StructDescriptor, SymbolTable, Symbols, TagKind};
pub use target::{TargetArch, TargetConfig};
