//! # Intermediate representation
//!
//! Function bodies lower into a linear stream of three-address quadruples
//! over an append-only address table, followed by control-flow-graph
//! construction over the resulting basic blocks.
//!
//! ## Module structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # this file - module definition and re-exports
//! ├── instruction.rs  # OpKind, Quad, Address
//! ├── generator.rs    # IrContext + IrGenerator (statement/expression lowering)
//! ├── cfg.rs          # BasicBlock-style CFG nodes, PO/RPO numbering, BitSet
//! └── debug.rs        # textual disassembly and JSON dumps
//! ```
//!
//! ## Key types
//!
//! - [`Quad`] - one `(op, type, target, arg1, arg2)` instruction
//! - [`Address`] - constant / string / identifier / temporary operand,
//!   referenced by stable `u32` indices
//! - [`IrContext`] - the owned per-function compilation state, reset
//!   between function definitions
//! - [`IrGenerator`] - lowers one analyzed function definition
//! - [`Cfg`] - basic blocks with adjacency lists and the four DFS
//!   orderings used by the downstream dataflow passes

pub mod cfg;
pub mod debug;
pub mod generator;
pub mod instruction;

pub use cfg::{BitSet, Cfg, CfgNode, ENTRY_NODE};
pub use debug::{disassemble, dump_json};
pub use generator::{IrContext, IrGenerator, PARAM_AREA_START};
pub use instruction::{AddrIdx, Address, OpKind, Quad};
