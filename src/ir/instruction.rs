//! Quadruple and address definitions

use crate::arena::NameRef;
use crate::ast::Declaration;
use std::sync::Arc;

/// Index into the per-function address table
///
/// Index 0 is reserved for the "empty" operand.
pub type AddrIdx = u32;

/// Operation of a quadruple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    // x = y op z
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Remainder
    Rem,
    /// Shift left
    SHL,
    /// Shift right
    SHR,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise xor
    Xor,
    /// Equality comparison
    EQ,
    /// Inequality comparison
    NEQ,
    /// Less-than comparison
    LT,
    /// Less-or-equal comparison
    LET,
    /// Greater-than comparison
    GT,
    /// Greater-or-equal comparison
    GET,

    // x = op y
    /// Arithmetic negation
    Neg,
    /// Bitwise complement
    Cmpl,
    /// Logical not
    Not,
    /// Narrow to signed char
    Ch,
    /// Narrow to unsigned char
    UCh,
    /// Narrow to signed short
    Sh,
    /// Narrow to unsigned short
    USh,
    /// Sign-extend to long long
    LLSX,
    /// Zero-extend to long long
    LLZX,
    /// Address-of
    AddrOf,
    /// Load through pointer
    Ind,
    /// Register move: x = y
    Asn,
    /// Store through pointer: *x = y
    IndAsn,

    // control
    /// Label definition
    Lab,
    /// Unconditional jump
    Jmp,
    /// Conditional branch: `CBr cond, Ltrue, Lfalse`
    CBr,
    /// Function return
    Ret,
    /// Switch dispatch selector
    Switch,
    /// One switch table entry: `Case value, label`
    Case,

    // calls
    /// Push one argument
    Arg,
    /// Direct call: x = y(), arg2 holds the argument count
    Call,
    /// Indirect call: x = (*y)()
    IndCall,
    /// Marks the start of an argument list
    BegArg,

    /// No operation
    NOp,
}

impl OpKind {
    /// Lowercase mnemonic used by the disassembler
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Div => "div",
            OpKind::Rem => "rem",
            OpKind::SHL => "shl",
            OpKind::SHR => "shr",
            OpKind::And => "and",
            OpKind::Or => "or",
            OpKind::Xor => "xor",
            OpKind::EQ => "eq",
            OpKind::NEQ => "neq",
            OpKind::LT => "lt",
            OpKind::LET => "let",
            OpKind::GT => "gt",
            OpKind::GET => "get",
            OpKind::Neg => "neg",
            OpKind::Cmpl => "cmpl",
            OpKind::Not => "not",
            OpKind::Ch => "ch",
            OpKind::UCh => "uch",
            OpKind::Sh => "sh",
            OpKind::USh => "ush",
            OpKind::LLSX => "llsx",
            OpKind::LLZX => "llzx",
            OpKind::AddrOf => "addrof",
            OpKind::Ind => "ind",
            OpKind::Asn => "asn",
            OpKind::IndAsn => "indasn",
            OpKind::Lab => "lab",
            OpKind::Jmp => "jmp",
            OpKind::CBr => "cbr",
            OpKind::Ret => "ret",
            OpKind::Switch => "switch",
            OpKind::Case => "case",
            OpKind::Arg => "arg",
            OpKind::Call => "call",
            OpKind::IndCall => "indcall",
            OpKind::BegArg => "begarg",
            OpKind::NOp => "nop",
        }
    }

    /// True for the ops that may end a basic block
    pub fn is_terminator(self) -> bool {
        matches!(self, OpKind::Jmp | OpKind::CBr)
    }
}

/// One three-address instruction
#[derive(Debug, Clone)]
pub struct Quad {
    /// Operation
    pub op: OpKind,
    /// Type the operation works at, when one is meaningful
    pub ty: Option<Declaration>,
    /// Target operand (address index)
    pub tar: AddrIdx,
    /// First source operand (address index)
    pub arg1: AddrIdx,
    /// Second source operand (address index)
    pub arg2: AddrIdx,
}

/// One entry of the address table
#[derive(Debug, Clone)]
pub enum Address {
    /// Reserved empty operand (index 0)
    Empty,
    /// Integer constant; also used for label numbers
    IConst {
        /// The constant's value
        val: i64,
    },
    /// String literal
    StrLit {
        /// Literal contents
        s: Arc<str>,
    },
    /// Named identifier
    Id {
        /// Mangled name (`name:scope`; parameters keep their plain name),
        /// allocated from the per-function name arena
        name: NameRef,
        /// Interned numeric identifier for the dataflow bit sets
        nid: u32,
        /// Stack offset within the current function (0 for statics)
        offset: i32,
        /// Declared type
        ty: Declaration,
    },
    /// Compiler temporary (`t1`, `t2`, ...)
    Temp {
        /// Arena-allocated name
        name: NameRef,
        /// Interned numeric identifier
        nid: u32,
    },
}

impl Address {
    /// True for constants and string literals
    pub fn is_const(&self) -> bool {
        matches!(self, Address::IConst { .. } | Address::StrLit { .. })
    }

    /// Interned identifier of identifiers and temporaries
    pub fn nid(&self) -> Option<u32> {
        match self {
            Address::Id { nid, .. } | Address::Temp { nid, .. } => Some(*nid),
            _ => None,
        }
    }

    /// Value of integer-constant addresses
    pub fn const_val(&self) -> Option<i64> {
        match self {
            Address::IConst { val } => Some(*val),
            _ => None,
        }
    }
}
