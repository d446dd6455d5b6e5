//! Size and alignment
//!
//! Both recurse through the declarator chain. The only target-dependent
//! inputs are the word size (pointers, `long`) and the alignment of
//! `long long`.

use crate::ast::{Declaration, Token};
use crate::sym::{round_up, SymbolTable};
use crate::target::TargetConfig;

/// Alignment requirement of a complete type, in bytes
pub fn alignment_of(ty: &Declaration, syms: &dyn SymbolTable, target: &TargetConfig) -> u32 {
    match ty.category() {
        Token::Struct | Token::Union => ty
            .specs
            .spec
            .tag()
            .and_then(|t| syms.struct_descriptor(t))
            .map(|d| d.alignment)
            .unwrap_or(1),
        Token::Subscript => alignment_of(&ty.inner(), syms, target),
        Token::LongLong | Token::UnsignedLongLong => target.llong_alignment(),
        Token::Star | Token::Long | Token::UnsignedLong => target.word_size(),
        Token::Enum | Token::Int | Token::Unsigned => 4,
        Token::Short | Token::UnsignedShort => 2,
        Token::Char | Token::SignedChar | Token::UnsignedChar => 1,
        _ => 1,
    }
}

/// Size of a complete type, in bytes
///
/// Incomplete types (and `void`, the error sentinel, and function
/// designators) measure 0; the analyzer rejects `sizeof` on them before
/// this is consulted.
pub fn size_of(ty: &Declaration, syms: &dyn SymbolTable, target: &TargetConfig) -> u32 {
    match ty.category() {
        Token::Union => {
            // widest member, rounded up to the union's alignment
            let Some(d) = ty.specs.spec.tag().and_then(|t| syms.struct_descriptor(t)) else {
                return 0;
            };
            let widest = d.members.iter().map(|m| m.size).max().unwrap_or(0);
            round_up(widest, d.alignment)
        }
        Token::Struct => ty
            .specs
            .spec
            .tag()
            .and_then(|t| syms.struct_descriptor(t))
            .map(|d| d.size)
            .unwrap_or(0),
        Token::Subscript => {
            let len = match ty.derived.first() {
                Some(crate::ast::DerivedDecl::Array { len }) => len.unwrap_or(0),
                _ => 0,
            };
            (len as u32).wrapping_mul(size_of(&ty.inner(), syms, target))
        }
        Token::LongLong | Token::UnsignedLongLong => 8,
        Token::Star | Token::Long | Token::UnsignedLong => target.word_size(),
        Token::Enum | Token::Int | Token::Unsigned => 4,
        Token::Short | Token::UnsignedShort => 2,
        Token::Char | Token::SignedChar | Token::UnsignedChar => 1,
        _ => 0,
    }
}
