//! Constant-expression evaluation
//!
//! `eval` tries to reduce a typed expression to a 64-bit value under two
//! contextual flags: `is_addr` marks the operand of `&` (explicit or the
//! implicit address-of on arrays and function designators), `is_iconst`
//! marks contexts that demand an *integer* constant expression (case
//! labels, array bounds, enumerator values).
//!
//! Successful evaluation rewrites the node into an integer-constant leaf,
//! so re-walking a folded tree is free. A handful of rules of thumb from
//! the address-constant model:
//!
//! - Addresses always evaluate to true.
//! - An address plus or minus an integer constant has an unknown value;
//!   any attempt to *use* that value is an error, but contexts that only
//!   need addressness accept it.

use crate::ast::{ExecNode, ExprKind, IntLit, Token};
use crate::error::{Error, Result};
use crate::sym::SymbolTable;
use crate::target::TargetConfig;
use crate::types::{is_integer, is_unsigned_int, layout};

/// Placeholder for address-constant arithmetic whose numeric value is
/// unknown at compile time
const DONT_CARE: i64 = 0xABCD;

/// Evaluator for C constant expressions
pub struct ConstFolder<'a> {
    syms: &'a dyn SymbolTable,
    target: TargetConfig,
}

impl<'a> ConstFolder<'a> {
    /// Create a folder over the given collaborators
    pub fn new(syms: &'a dyn SymbolTable, target: TargetConfig) -> Self {
        Self { syms, target }
    }

    fn err(&self, e: &ExecNode) -> Error {
        Error::ConstExpr {
            file: e.loc.file.to_string(),
            line: e.loc.line,
            col: e.loc.col,
        }
    }

    fn fold(&self, e: &mut ExecNode, v: i64) -> i64 {
        e.kind = ExprKind::IConst(IntLit::synthesized(v));
        e.children.clear();
        v
    }

    /// True for nodes that evaluated to an address computation rather than
    /// a folded constant
    fn unfolded_op(e: &ExecNode) -> bool {
        !e.is_iconst() && matches!(e.kind, ExprKind::Op(_))
    }

    /// Evaluate `e`; fold it in place when the value is known
    pub fn eval(&self, e: &mut ExecNode, is_addr: bool, is_iconst: bool) -> Result<i64> {
        match &e.kind {
            ExprKind::IConst(lit) => Ok(lit.val),
            ExprKind::StrLit(_) => {
                if is_iconst {
                    return Err(self.err(e));
                }
                Ok(1)
            }
            ExprKind::Id(name) => {
                if is_iconst {
                    return Err(self.err(e));
                }
                // An identifier is only allowed when its address is being
                // computed, explicitly or implicitly (arrays, function
                // designators)...
                let implicit_addr = matches!(
                    e.ty.derived.first(),
                    Some(crate::ast::DerivedDecl::Function { .. })
                        | Some(crate::ast::DerivedDecl::Array { .. })
                );
                if !is_addr && !implicit_addr {
                    return Err(self.err(e));
                }
                // ...and it must have static storage duration.
                if !self.syms.is_external_id(name) {
                    match e.ty.specs.storage {
                        Some(crate::ast::StorageClass::Static)
                        | Some(crate::ast::StorageClass::Extern) => {}
                        _ => return Err(self.err(e)),
                    }
                }
                Ok(1)
            }
            ExprKind::Op(op) => self.eval_op(e, *op, is_addr, is_iconst),
        }
    }

    fn eval_op(&self, e: &mut ExecNode, op: Token, is_addr: bool, is_iconst: bool) -> Result<i64> {
        let unsig = is_unsigned_int(e.ty.category());
        match op {
            Token::Subscript => {
                if is_iconst {
                    return Err(self.err(e));
                }
                let (pi, ii) = if is_integer(e.children[0].ty.category()) {
                    (1, 0)
                } else {
                    (0, 1)
                };
                let indx = self.eval(&mut e.children[ii], false, is_iconst)?;
                if !e.children[ii].is_iconst() {
                    return Err(self.err(e));
                }
                let ptr = self.eval(&mut e.children[pi], is_addr, is_iconst)?;
                if e.children[pi].is_iconst() {
                    let elem = e.children[pi].ty.inner();
                    let size = layout::size_of(&elem, self.syms, &self.target) as i64;
                    Ok(self.fold(e, ptr.wrapping_add(indx.wrapping_mul(size))))
                } else {
                    Ok(ptr)
                }
            }
            Token::Dot | Token::Arrow => {
                if is_iconst {
                    return Err(self.err(e));
                }
                let res = self.eval(&mut e.children[0], is_addr, is_iconst)?;
                if e.children[0].is_iconst() {
                    if e.children[0].ty.category() != Token::Union {
                        let tag = e.children[0]
                            .ty
                            .specs
                            .spec
                            .tag()
                            .cloned()
                            .ok_or_else(|| Error::internal("member access on untagged type"))?;
                        let member = e.children[1]
                            .ident()
                            .cloned()
                            .ok_or_else(|| Error::internal("member access without member name"))?;
                        let m = self
                            .syms
                            .member_descriptor(&tag, &member)
                            .ok_or_else(|| {
                                Error::internal(format!(
                                    "no descriptor for member `{}' of `{}'",
                                    member, tag
                                ))
                            })?;
                        Ok(self.fold(e, res.wrapping_add(m.offset as i64)))
                    } else {
                        // union members share the base address
                        Ok(self.fold(e, res))
                    }
                } else {
                    Ok(res)
                }
            }
            Token::SizeOf | Token::AlignOf => {
                let ty = match &e.type_arg {
                    Some(t) => t.clone(),
                    None => e.children[0].ty.clone(),
                };
                let n = if op == Token::SizeOf {
                    layout::size_of(&ty, self.syms, &self.target)
                } else {
                    layout::alignment_of(&ty, self.syms, &self.target)
                };
                Ok(self.fold(e, n as i64))
            }
            Token::AddressOf => {
                if is_iconst {
                    return Err(self.err(e));
                }
                let res = self.eval(&mut e.children[0], true, is_iconst)?;
                if e.children[0].is_iconst() {
                    Ok(self.fold(e, res))
                } else {
                    Ok(res)
                }
            }
            Token::Indirection => {
                if is_iconst {
                    return Err(self.err(e));
                }
                let res = self.eval(&mut e.children[0], is_addr, is_iconst)?;
                if e.children[0].is_iconst() {
                    Ok(self.fold(e, res))
                } else {
                    Ok(res)
                }
            }
            Token::UnaryPlus => {
                let v = self.eval_folded_child(e, 0, is_iconst)?;
                Ok(self.fold(e, v))
            }
            Token::UnaryMinus => {
                let v = self.eval_folded_child(e, 0, is_iconst)?;
                Ok(self.fold(e, v.wrapping_neg()))
            }
            Token::Complement => {
                let v = self.eval_folded_child(e, 0, is_iconst)?;
                Ok(self.fold(e, !v))
            }
            Token::Negation => {
                let v = self.eval_folded_child(e, 0, is_iconst)?;
                Ok(self.fold(e, (v == 0) as i64))
            }
            Token::Cast => {
                let dest = e
                    .type_arg
                    .as_ref()
                    .map(|t| t.category())
                    .unwrap_or(Token::Error);
                if is_iconst && !is_integer(dest) {
                    return Err(self.err(e));
                }
                let v = self.eval(&mut e.children[0], false, is_iconst)?;
                if e.children[0].is_iconst() {
                    let v = match dest {
                        Token::Short => v as i16 as i64,
                        Token::UnsignedShort => v as u16 as i64,
                        Token::Char | Token::SignedChar => v as i8 as i64,
                        Token::UnsignedChar => v as u8 as i64,
                        Token::Int | Token::Enum => v as i32 as i64,
                        Token::Unsigned => v as u32 as i64,
                        Token::Star => {
                            if self.target.arch64() {
                                v
                            } else {
                                v as u32 as i64
                            }
                        }
                        _ => v,
                    };
                    Ok(self.fold(e, v))
                } else {
                    // never truncate an address
                    match dest {
                        Token::Short
                        | Token::UnsignedShort
                        | Token::Char
                        | Token::SignedChar
                        | Token::UnsignedChar => Err(self.err(e)),
                        Token::Int | Token::Unsigned if self.target.arch64() => Err(self.err(e)),
                        _ => Ok(v),
                    }
                }
            }
            Token::Mul => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                Ok(self.fold(e, l.wrapping_mul(r)))
            }
            Token::Div => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                if r == 0 {
                    return Err(self.err(e));
                }
                let v = if unsig {
                    ((l as u64) / (r as u64)) as i64
                } else {
                    l.wrapping_div(r)
                };
                Ok(self.fold(e, v))
            }
            Token::Rem => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                if r == 0 {
                    return Err(self.err(e));
                }
                let v = if unsig {
                    ((l as u64) % (r as u64)) as i64
                } else {
                    l.wrapping_rem(r)
                };
                Ok(self.fold(e, v))
            }
            Token::Plus => {
                if is_integer(e.ty.category()) {
                    let l = self.eval(&mut e.children[0], false, is_iconst)?;
                    let r = self.eval(&mut e.children[1], false, is_iconst)?;
                    if e.children[0].is_iconst() && e.children[1].is_iconst() {
                        Ok(self.fold(e, l.wrapping_add(r)))
                    } else {
                        Ok(DONT_CARE)
                    }
                } else {
                    if is_iconst {
                        return Err(self.err(e));
                    }
                    let (pi, ii) = if is_integer(e.children[0].ty.category()) {
                        (1, 0)
                    } else {
                        (0, 1)
                    };
                    let l = self.eval(&mut e.children[0], false, is_iconst)?;
                    let r = self.eval(&mut e.children[1], false, is_iconst)?;
                    if !e.children[ii].is_iconst() {
                        return Err(self.err(e));
                    }
                    if e.children[pi].is_iconst() {
                        let elem = e.children[pi].ty.inner();
                        let size = layout::size_of(&elem, self.syms, &self.target) as i64;
                        let v = if pi == 0 {
                            l.wrapping_add(r.wrapping_mul(size))
                        } else {
                            l.wrapping_mul(size).wrapping_add(r)
                        };
                        Ok(self.fold(e, v))
                    } else {
                        Ok(DONT_CARE)
                    }
                }
            }
            Token::Minus => {
                if is_integer(e.children[0].ty.category()) {
                    let l = self.eval(&mut e.children[0], false, is_iconst)?;
                    let r = self.eval(&mut e.children[1], false, is_iconst)?;
                    if !e.children[1].is_iconst() {
                        return Err(self.err(e));
                    }
                    if e.children[0].is_iconst() {
                        Ok(self.fold(e, l.wrapping_sub(r)))
                    } else {
                        Ok(DONT_CARE)
                    }
                } else {
                    if is_iconst {
                        return Err(self.err(e));
                    }
                    let l = self.eval(&mut e.children[0], false, is_iconst)?;
                    let r = self.eval(&mut e.children[1], false, is_iconst)?;
                    if !e.children[1].is_iconst() {
                        return Err(self.err(e));
                    }
                    if e.children[0].is_iconst() {
                        let elem = e.children[0].ty.inner();
                        let size = layout::size_of(&elem, self.syms, &self.target) as i64;
                        if is_integer(e.children[1].ty.category()) {
                            Ok(self.fold(e, l.wrapping_sub(r.wrapping_mul(size))))
                        } else {
                            if size == 0 {
                                return Err(self.err(e));
                            }
                            Ok(self.fold(e, l.wrapping_sub(r) / size))
                        }
                    } else {
                        Ok(DONT_CARE)
                    }
                }
            }
            Token::LShift => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                Ok(self.fold(e, l.wrapping_shl(r as u32)))
            }
            Token::RShift => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                let v = if unsig {
                    ((l as u64).wrapping_shr(r as u32)) as i64
                } else {
                    l.wrapping_shr(r as u32)
                };
                Ok(self.fold(e, v))
            }
            Token::Lt | Token::Gt | Token::LessEq | Token::GreaterEq => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                let v = if unsig {
                    let (l, r) = (l as u64, r as u64);
                    match op {
                        Token::Lt => l < r,
                        Token::Gt => l > r,
                        Token::LessEq => l <= r,
                        _ => l >= r,
                    }
                } else {
                    match op {
                        Token::Lt => l < r,
                        Token::Gt => l > r,
                        Token::LessEq => l <= r,
                        _ => l >= r,
                    }
                };
                Ok(self.fold(e, v as i64))
            }
            Token::Eq | Token::NotEq => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                let v = if op == Token::Eq { l == r } else { l != r };
                Ok(self.fold(e, v as i64))
            }
            Token::BitAnd => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                Ok(self.fold(e, l & r))
            }
            Token::BitXor => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                Ok(self.fold(e, l ^ r))
            }
            Token::BitOr => {
                let (l, r) = self.eval_folded_pair(e, is_iconst)?;
                Ok(self.fold(e, l | r))
            }
            Token::LogAnd => {
                // x && y is fine; with an unknown address on one side the
                // other must be the constant 0
                let l = self.eval(&mut e.children[0], false, is_iconst)?;
                if Self::unfolded_op(&e.children[0]) {
                    let r = self.eval(&mut e.children[1], false, is_iconst)?;
                    if Self::unfolded_op(&e.children[1]) || r != 0 {
                        return Err(self.err(e));
                    }
                    return Ok(self.fold(e, 0));
                }
                if l == 0 {
                    return Ok(self.fold(e, 0));
                }
                let r = self.eval(&mut e.children[1], false, is_iconst)?;
                if Self::unfolded_op(&e.children[1]) {
                    return Err(self.err(e));
                }
                Ok(self.fold(e, (r != 0) as i64))
            }
            Token::LogOr => {
                // dually: with an unknown address the other side must be a
                // nonzero constant
                let l = self.eval(&mut e.children[0], false, is_iconst)?;
                if Self::unfolded_op(&e.children[0]) {
                    let r = self.eval(&mut e.children[1], false, is_iconst)?;
                    if Self::unfolded_op(&e.children[1]) || r == 0 {
                        return Err(self.err(e));
                    }
                    return Ok(self.fold(e, 1));
                }
                if l != 0 {
                    return Ok(self.fold(e, 1));
                }
                let r = self.eval(&mut e.children[1], false, is_iconst)?;
                if Self::unfolded_op(&e.children[1]) {
                    return Err(self.err(e));
                }
                Ok(self.fold(e, (r != 0) as i64))
            }
            Token::Conditional => {
                let cond = self.eval(&mut e.children[0], false, is_iconst)?;
                if !e.children[0].is_iconst() && matches!(e.children[0].kind, ExprKind::Op(_)) {
                    return Err(self.err(e));
                }
                let branch = if cond != 0 { 1 } else { 2 };
                let v = self.eval(&mut e.children[branch], false, is_iconst)?;
                if e.children[branch].is_iconst() {
                    Ok(self.fold(e, v))
                } else {
                    Ok(v)
                }
            }
            _ => Err(self.err(e)),
        }
    }

    fn eval_folded_child(&self, e: &mut ExecNode, idx: usize, is_iconst: bool) -> Result<i64> {
        let v = self.eval(&mut e.children[idx], false, is_iconst)?;
        if !e.children[idx].is_iconst() {
            return Err(self.err(e));
        }
        Ok(v)
    }

    fn eval_folded_pair(&self, e: &mut ExecNode, is_iconst: bool) -> Result<(i64, i64)> {
        let l = self.eval(&mut e.children[0], false, is_iconst)?;
        let r = self.eval(&mut e.children[1], false, is_iconst)?;
        if !e.children[0].is_iconst() || !e.children[1].is_iconst() {
            return Err(self.err(e));
        }
        Ok((l, r))
    }
}
