//! Type model
//!
//! Categories, integer classification, conversion ranks, the integer
//! promotions, and the usual arithmetic conversions of C89/C99 (no
//! floating-point types, per the supported language subset). The primitive
//! type singletons live here; they are shared process-wide and immutable
//! by construction.

pub mod compat;
pub mod layout;

use crate::ast::{Declaration, Token};
use lazy_static::lazy_static;

/// Conversion rank of `char`, `signed char`, `unsigned char`
pub const CHAR_RANK: i32 = 1;
/// Conversion rank of `short`, `unsigned short`
pub const SHORT_RANK: i32 = 2;
/// Conversion rank of `int`, `unsigned`, `enum`
pub const INT_RANK: i32 = 3;
/// Conversion rank of `long`, `unsigned long`
pub const LONG_RANK: i32 = 4;
/// Conversion rank of `long long`, `unsigned long long`
pub const LLONG_RANK: i32 = 5;

/// True for the integer type categories (`enum` included)
pub fn is_integer(ty: Token) -> bool {
    matches!(
        ty,
        Token::LongLong
            | Token::UnsignedLongLong
            | Token::Long
            | Token::UnsignedLong
            | Token::Int
            | Token::Unsigned
            | Token::Short
            | Token::UnsignedShort
            | Token::Char
            | Token::SignedChar
            | Token::UnsignedChar
            | Token::Enum
    )
}

/// True for the signed integer categories (`enum` counts as signed)
pub fn is_signed_int(ty: Token) -> bool {
    matches!(
        ty,
        Token::Char
            | Token::SignedChar
            | Token::Short
            | Token::Int
            | Token::Long
            | Token::LongLong
            | Token::Enum
    )
}

/// True for the unsigned integer categories
pub fn is_unsigned_int(ty: Token) -> bool {
    matches!(
        ty,
        Token::UnsignedChar
            | Token::UnsignedShort
            | Token::Unsigned
            | Token::UnsignedLong
            | Token::UnsignedLongLong
    )
}

/// True for pointer categories
///
/// Array types count: they decay in every context the callers care about.
/// Function designators are checked for explicitly by the analyzer.
pub fn is_pointer(ty: Token) -> bool {
    matches!(ty, Token::Star | Token::Subscript)
}

/// True for scalar categories (integers and object pointers)
pub fn is_scalar(ty: Token) -> bool {
    is_integer(ty) || ty == Token::Star
}

/// True for the tagged-type categories
pub fn is_struct_union_enum(ty: Token) -> bool {
    matches!(ty, Token::Struct | Token::Union | Token::Enum)
}

/// Integer conversion rank
///
/// Panics on non-integer categories; callers classify first.
pub fn get_rank(ty: Token) -> i32 {
    match ty {
        Token::LongLong | Token::UnsignedLongLong => LLONG_RANK,
        Token::Long | Token::UnsignedLong => LONG_RANK,
        // the standard does not require enum to rank with int (6.7.2.2#4)
        Token::Int | Token::Unsigned | Token::Enum => INT_RANK,
        Token::Short | Token::UnsignedShort => SHORT_RANK,
        Token::Char | Token::SignedChar | Token::UnsignedChar => CHAR_RANK,
        other => unreachable!("rank of non-integer category {:?}", other),
    }
}

/// The integer promotions
///
/// `char`, `signed/unsigned char`, `short`, `unsigned short` promote to
/// `int`; everything else is already promoted.
pub fn get_promoted_type(ty: Token) -> Token {
    match ty {
        Token::Char
        | Token::UnsignedChar
        | Token::SignedChar
        | Token::Short
        | Token::UnsignedShort => Token::Int,
        other => other,
    }
}

/// The usual arithmetic conversions (6.3.1.8) on promoted operands
///
/// `arch64` selects the LP64 data model (`long` == 64 bits); otherwise
/// ILP32 is assumed.
pub fn get_result_type(ty1: Token, ty2: Token, arch64: bool) -> Token {
    // If both operands have the same type, no further conversion is needed.
    if ty1 == ty2 {
        return ty1;
    }

    let rank1 = get_rank(ty1);
    let rank2 = get_rank(ty2);
    let sign1 = is_signed_int(ty1);
    let sign2 = is_signed_int(ty2);

    // Same signedness: the lesser rank converts to the greater.
    if sign1 == sign2 {
        return if rank1 > rank2 { ty1 } else { ty2 };
    }

    // The unsigned operand's rank is greater or equal: unsigned wins.
    if !sign1 && rank1 >= rank2 {
        return ty1;
    }
    if !sign2 && rank2 >= rank1 {
        return ty2;
    }

    // The signed operand outranks the unsigned one. It wins iff it can
    // represent every value of the unsigned type, which depends on the
    // data model.
    if arch64 {
        if sign1 {
            if ty2 != Token::UnsignedLong {
                return ty1;
            }
        } else if ty1 != Token::UnsignedLong {
            return ty2;
        }
    } else if sign1 {
        if ty1 == Token::LongLong {
            return ty1;
        }
    } else if ty2 == Token::LongLong {
        return ty2;
    }

    // Both convert to the unsigned type corresponding to the signed one.
    let signed_ty = if sign1 { ty1 } else { ty2 };
    if signed_ty == Token::Long {
        Token::UnsignedLong
    } else {
        Token::UnsignedLongLong
    }
}

lazy_static! {
    static ref TY_CHAR: Declaration = Declaration::base(crate::ast::TypeSpec::Char);
    static ref TY_INT: Declaration = Declaration::base(crate::ast::TypeSpec::Int);
    static ref TY_UNSIGNED: Declaration = Declaration::base(crate::ast::TypeSpec::Unsigned);
    static ref TY_LONG: Declaration = Declaration::base(crate::ast::TypeSpec::Long);
    static ref TY_UNSIGNED_LONG: Declaration =
        Declaration::base(crate::ast::TypeSpec::UnsignedLong);
    static ref TY_LONG_LONG: Declaration = Declaration::base(crate::ast::TypeSpec::LongLong);
    static ref TY_UNSIGNED_LONG_LONG: Declaration =
        Declaration::base(crate::ast::TypeSpec::UnsignedLongLong);
    static ref TY_ERROR: Declaration = Declaration::base(crate::ast::TypeSpec::Error);
    static ref TY_VOID: Declaration = Declaration::base(crate::ast::TypeSpec::Void);
}

/// Shared immutable type node for a primitive category
///
/// `Enum` maps to the `int` node. Panics on categories that have no
/// primitive singleton.
pub fn get_type_node(ty: Token) -> &'static Declaration {
    match ty {
        Token::Char => &TY_CHAR,
        Token::Int | Token::Enum => &TY_INT,
        Token::Unsigned => &TY_UNSIGNED,
        Token::Long => &TY_LONG,
        Token::UnsignedLong => &TY_UNSIGNED_LONG,
        Token::LongLong => &TY_LONG_LONG,
        Token::UnsignedLongLong => &TY_UNSIGNED_LONG_LONG,
        Token::Error => &TY_ERROR,
        Token::Void => &TY_VOID,
        other => unreachable!("no singleton for category {:?}", other),
    }
}
