//! Type compatibility (6.2.7)
//!
//! Structural walk over two declarator chains and their base specifiers.
//! With `qualified == false` type qualifiers are ignored at every level,
//! which is how the analyzer consults this before applying its own
//! qualifier-discard warnings.

use crate::ast::{Declaration, DerivedDecl, TypeSpec};

/// True when the two types are compatible
///
/// Tag types are compatible only with the same tag identity. Prototyped
/// function types require matching arity, matching variadicity, and
/// pairwise-compatible parameter types (parameter qualifiers never
/// participate, 6.7.5.3#15). An incomplete array type is compatible with
/// any array of compatible element type.
pub fn are_compatible(a: &Declaration, b: &Declaration, qualified: bool) -> bool {
    if a.derived.len() != b.derived.len() {
        return false;
    }
    for (da, db) in a.derived.iter().zip(b.derived.iter()) {
        match (da, db) {
            (DerivedDecl::Pointer { qual: qa }, DerivedDecl::Pointer { qual: qb }) => {
                if qualified && qa != qb {
                    return false;
                }
            }
            (DerivedDecl::Array { len: la }, DerivedDecl::Array { len: lb }) => {
                if let (Some(x), Some(y)) = (la, lb) {
                    if x != y {
                        return false;
                    }
                }
            }
            (
                DerivedDecl::Function {
                    params: pa,
                    variadic: va,
                },
                DerivedDecl::Function {
                    params: pb,
                    variadic: vb,
                },
            ) => {
                if va != vb || pa.len() != pb.len() {
                    return false;
                }
                for (x, y) in pa.iter().zip(pb.iter()) {
                    if !are_compatible(&x.ty, &y.ty, false) {
                        return false;
                    }
                }
            }
            _ => return false,
        }
    }
    if qualified && a.specs.qual != b.specs.qual {
        return false;
    }
    specs_compatible(&a.specs.spec, &b.specs.spec)
}

fn specs_compatible(a: &TypeSpec, b: &TypeSpec) -> bool {
    match (a, b) {
        (TypeSpec::Struct(x), TypeSpec::Struct(y))
        | (TypeSpec::Union(x), TypeSpec::Union(y))
        | (TypeSpec::Enum(x), TypeSpec::Enum(y)) => x == y,
        _ => a == b,
    }
}
