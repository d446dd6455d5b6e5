//! Expression analyzer
//!
//! Post-order pass over expression trees: computes the type of every node,
//! emits diagnostics for constraint violations, and rewrites enumeration
//! constants, integer literals, and `sizeof`/`__alignof__` into
//! integer-constant leaves. An operand that already carries the error type
//! silently propagates it, so only the node that caused a problem is
//! diagnosed.

use crate::ast::{
    DeclSpecs, Declaration, DerivedDecl, ExecNode, ExprKind, FunctionDef, IntLit, Qualifier,
    SizeSuffix, StmtNode, StorageClass, Stmt, Token,
};
use crate::diag::Diagnostics;
use crate::sym::SymbolTable;
use crate::target::TargetConfig;
use crate::types::{
    self, compat::are_compatible, get_promoted_type, get_rank, get_result_type, get_type_node,
    is_integer, is_pointer, is_scalar, is_signed_int, is_struct_union_enum, layout,
};
use std::sync::Arc;

fn error_ty() -> Declaration {
    get_type_node(Token::Error).clone()
}

/// Qualification of what a pointer type points to
///
/// For a one-step chain the pointee is the base specifier; for a pointer
/// to pointer it is the inner pointer's own qualifier; pointers to arrays
/// and functions carry none.
fn pointee_qual(ty: &Declaration) -> Option<Qualifier> {
    match ty.derived.get(1) {
        None => ty.specs.qual,
        Some(DerivedDecl::Pointer { qual }) => *qual,
        Some(_) => None,
    }
}

/// Rebuild a pointer type so its pointee carries qualification `q`
fn with_pointee_qual(ty: &Declaration, q: Qualifier) -> Declaration {
    match ty.derived.get(1) {
        None => Declaration {
            specs: Arc::new(DeclSpecs {
                storage: ty.specs.storage,
                qual: Some(q),
                spec: ty.specs.spec.clone(),
            }),
            derived: ty.derived.clone(),
        },
        Some(DerivedDecl::Pointer { .. }) => {
            let mut derived = ty.derived.clone();
            derived[1] = DerivedDecl::Pointer { qual: Some(q) };
            Declaration {
                specs: Arc::clone(&ty.specs),
                derived,
            }
        }
        Some(_) => ty.clone(),
    }
}

/// The expression analyzer
///
/// Holds the collaborators every rule consults: the symbol table for tags,
/// layouts and enum constants, the diagnostic sink, and the target word
/// size.
pub struct Analyzer<'a> {
    syms: &'a dyn SymbolTable,
    diags: &'a mut Diagnostics,
    target: TargetConfig,
    ret_ty: Option<Declaration>,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer over the given collaborators
    pub fn new(syms: &'a dyn SymbolTable, diags: &'a mut Diagnostics, target: TargetConfig) -> Self {
        Self {
            syms,
            diags,
            target,
            ret_ty: None,
        }
    }

    /// Analyze every expression of a function definition
    pub fn analyze_function(&mut self, f: &mut FunctionDef) {
        tracing::debug!("analyzing function `{}'", f.name);
        self.ret_ty = Some(f.return_type());
        self.analyze_stmt(&mut f.body);
        self.ret_ty = None;
    }

    fn analyze_stmt(&mut self, s: &mut StmtNode) {
        match &mut s.kind {
            Stmt::Compound(c) => {
                for group in &mut c.locals {
                    let specs = Arc::clone(&group.specs);
                    for d in &mut group.declarators {
                        if let Some(init) = &mut d.init {
                            self.analyze(init);
                            let lty = Declaration::of(Arc::clone(&specs), d.derived.clone());
                            if init.ty.category() != Token::Error
                                && !self.can_assign_to(&lty, init)
                            {
                                let msg = format!(
                                    "invalid initializer for variable of type `{}'",
                                    lty
                                );
                                self.diags.error(&init.loc, msg);
                            }
                        }
                    }
                }
                for st in &mut c.body {
                    self.analyze_stmt(st);
                }
            }
            Stmt::Expr(Some(e)) => self.analyze(e),
            Stmt::Expr(None) => {}
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                self.analyze(cond);
                self.analyze_stmt(then_stmt);
                if let Some(els) = else_stmt {
                    self.analyze_stmt(els);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                self.analyze(cond);
                self.analyze_stmt(body);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(e) = init {
                    self.analyze(e);
                }
                if let Some(e) = cond {
                    self.analyze(e);
                }
                if let Some(e) = step {
                    self.analyze(e);
                }
                self.analyze_stmt(body);
            }
            Stmt::Switch { cond, body } => {
                self.analyze(cond);
                self.analyze_stmt(body);
            }
            Stmt::Case { value, body } => {
                self.analyze(value);
                self.analyze_stmt(body);
            }
            Stmt::Default { body } | Stmt::Labeled { body, .. } => self.analyze_stmt(body),
            Stmt::Return(opt) => {
                if let Some(e) = opt {
                    self.analyze(e);
                    if let Some(ret) = self.ret_ty.clone() {
                        if e.ty.category() != Token::Error
                            && ret.category() != Token::Void
                            && !self.can_assign_to(&ret, e)
                        {
                            let msg = format!(
                                "incompatible types when returning type `{}' but `{}' was expected",
                                e.ty, ret
                            );
                            self.diags.error(&e.loc, msg);
                        }
                    }
                }
            }
            Stmt::Break | Stmt::Continue | Stmt::Goto(_) => {}
        }
    }


    /// Type one expression tree, post-order
    pub fn analyze(&mut self, e: &mut ExecNode) {
        match &e.kind {
            ExprKind::Op(op) => {
                let op = *op;
                match op {
                    // the second child of a member access is the member
                    // name, not an expression
                    Token::Dot | Token::Arrow => self.analyze(&mut e.children[0]),
                    _ => {
                        for c in e.children.iter_mut() {
                            self.analyze(c);
                        }
                    }
                }
                self.analyze_op(e, op);
            }
            _ => self.analyze_primary(e),
        }
    }

    fn analyze_op(&mut self, e: &mut ExecNode, op: Token) {
        match op {
            Token::Comma => self.analyze_comma(e),
            Token::Assign
            | Token::MulAssign
            | Token::DivAssign
            | Token::RemAssign
            | Token::PlusAssign
            | Token::MinusAssign
            | Token::LShiftAssign
            | Token::RShiftAssign
            | Token::AndAssign
            | Token::XorAssign
            | Token::OrAssign => self.analyze_assignment(e, op),
            Token::Conditional => self.analyze_conditional(e),
            Token::LogAnd | Token::LogOr => self.analyze_logical(e),
            Token::Eq | Token::NotEq | Token::Lt | Token::Gt | Token::LessEq | Token::GreaterEq => {
                self.analyze_relational_equality(e, op)
            }
            Token::BitAnd | Token::BitXor | Token::BitOr | Token::LShift | Token::RShift => {
                if self.error_binary(e) {
                    return;
                }
                let t = self.bitwise_type(op, e);
                e.ty = t;
            }
            Token::Plus | Token::Minus => {
                if self.error_binary(e) {
                    return;
                }
                let t = self.additive_type(op, e);
                e.ty = t;
            }
            Token::Mul | Token::Div | Token::Rem => {
                if self.error_binary(e) {
                    return;
                }
                let t = self.multiplicative_type(e);
                e.ty = t;
            }
            Token::Cast => self.analyze_cast(e),
            Token::PreInc
            | Token::PreDec
            | Token::SizeOf
            | Token::AlignOf
            | Token::AddressOf
            | Token::Indirection
            | Token::UnaryPlus
            | Token::UnaryMinus
            | Token::Complement
            | Token::Negation => self.analyze_unary(e, op),
            Token::Subscript | Token::Function | Token::Dot | Token::Arrow | Token::PostInc
            | Token::PostDec => self.analyze_postfix(e, op),
            other => unreachable!("operator {:?} is not an expression operator", other),
        }
    }

    // =========================================================================
    // Error-cascade suppression
    // =========================================================================

    /// Adopt the error type when either operand failed; no new diagnostic
    fn error_binary(&mut self, e: &mut ExecNode) -> bool {
        if e.children[0].ty.category() == Token::Error
            || e.children[1].ty.category() == Token::Error
        {
            e.ty = error_ty();
            return true;
        }
        false
    }

    fn set_error(&mut self, e: &mut ExecNode, msg: String) {
        self.diags.error(&e.loc, msg);
        e.ty = error_ty();
    }

    fn binary_op_error(&mut self, e: &mut ExecNode, op: Token) {
        let msg = format!(
            "invalid operands to binary {} (`{}' and `{}')",
            op.lexeme(),
            e.children[0].ty,
            e.children[1].ty
        );
        self.set_error(e, msg);
    }

    // =========================================================================
    // Primary expressions
    // =========================================================================

    fn analyze_primary(&mut self, e: &mut ExecNode) {
        match &e.kind {
            ExprKind::Id(name) => {
                // an identifier naming an enumeration constant becomes a
                // plain integer constant
                if let Some(val) = self.syms.enum_constant(name) {
                    e.kind = ExprKind::IConst(IntLit::synthesized(val));
                    e.ty = get_type_node(Token::Int).clone();
                    e.binding = None;
                }
                // otherwise the declared type was filled in by the parser
            }
            ExprKind::IConst(_) => self.analyze_iconst(e),
            ExprKind::StrLit(s) => {
                let len = s.len() as u64;
                e.ty = Declaration::of(
                    Arc::new(DeclSpecs::plain(crate::ast::TypeSpec::Char)),
                    vec![DerivedDecl::Array { len: Some(len + 1) }],
                );
            }
            ExprKind::Op(_) => unreachable!("operator node reached primary analysis"),
        }
    }

    /// Pick the type of an integer literal and cache its value
    ///
    /// Decimal constants walk `int` → `long` → `long long`; octal and
    /// hexadecimal constants may land in the unsigned types on the way.
    fn analyze_iconst(&mut self, e: &mut ExecNode) {
        let ExprKind::IConst(lit) = &e.kind else {
            unreachable!()
        };
        if lit.lexeme.is_empty() {
            // synthesized by the folder or the enum-constant rewrite
            if e.ty.category() == Token::Error {
                e.ty = get_type_node(Token::Int).clone();
            }
            return;
        }
        let s: &str = &lit.lexeme;
        let (digits, radix, decimal) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            (hex, 16, false)
        } else if s.len() > 1 && s.starts_with('0') {
            (&s[1..], 8, false)
        } else {
            (s, 10, true)
        };
        let parsed = u128::from_str_radix(if digits.is_empty() { "0" } else { digits }, radix)
            .unwrap_or(0);
        let unsigned = lit.suffix.unsigned;
        let size = lit.suffix.size;
        let arch64 = self.target.arch64();

        let mut overflow = false;
        let (ty, val): (Token, i64);
        if decimal && !unsigned {
            if parsed > i64::MAX as u128 {
                overflow = true;
                ty = Token::LongLong;
                val = i64::MAX;
            } else {
                val = parsed as i64;
                ty = if val <= i32::MAX as i64 {
                    match size {
                        SizeSuffix::None => Token::Int,
                        SizeSuffix::Long => Token::Long,
                        SizeSuffix::LongLong => Token::LongLong,
                    }
                } else if arch64 {
                    Token::Long
                } else {
                    Token::LongLong
                };
            }
        } else if decimal {
            if parsed > u64::MAX as u128 {
                overflow = true;
                ty = Token::UnsignedLongLong;
                val = u64::MAX as i64;
            } else {
                val = parsed as u64 as i64;
                ty = if parsed <= u32::MAX as u128 {
                    match size {
                        SizeSuffix::None => Token::Unsigned,
                        SizeSuffix::Long => Token::UnsignedLong,
                        SizeSuffix::LongLong => Token::UnsignedLongLong,
                    }
                } else if arch64 {
                    Token::UnsignedLong
                } else {
                    Token::UnsignedLongLong
                };
            }
        } else if !unsigned {
            if parsed > u64::MAX as u128 {
                overflow = true;
                ty = Token::UnsignedLongLong;
                val = u64::MAX as i64;
            } else if parsed > i64::MAX as u128 {
                val = parsed as u64 as i64;
                ty = if arch64 {
                    Token::UnsignedLong
                } else {
                    Token::UnsignedLongLong
                };
            } else {
                val = parsed as i64;
                ty = if val <= i32::MAX as i64 {
                    match size {
                        SizeSuffix::None => Token::Int,
                        SizeSuffix::Long => Token::Long,
                        SizeSuffix::LongLong => Token::LongLong,
                    }
                } else if parsed <= u32::MAX as u128 {
                    match size {
                        SizeSuffix::None => Token::Unsigned,
                        SizeSuffix::Long => Token::UnsignedLong,
                        SizeSuffix::LongLong => Token::UnsignedLongLong,
                    }
                } else if arch64 {
                    Token::Long
                } else {
                    Token::LongLong
                };
            }
        } else {
            if parsed > u64::MAX as u128 {
                overflow = true;
                ty = Token::UnsignedLongLong;
                val = u64::MAX as i64;
            } else {
                val = parsed as u64 as i64;
                ty = if parsed <= u32::MAX as u128 {
                    match size {
                        SizeSuffix::None => Token::Unsigned,
                        SizeSuffix::Long => Token::UnsignedLong,
                        SizeSuffix::LongLong => Token::UnsignedLongLong,
                    }
                } else if arch64 {
                    Token::UnsignedLong
                } else {
                    Token::UnsignedLongLong
                };
            }
        }
        if overflow {
            self.diags
                .warning(&e.loc, "integer constant is too large for its type");
        }
        if let ExprKind::IConst(lit) = &mut e.kind {
            lit.val = val;
        }
        e.ty = get_type_node(ty).clone();
    }

    // =========================================================================
    // Lvalues
    // =========================================================================

    /// 6.3.2.1 lvalue test
    pub fn is_lvalue(e: &ExecNode) -> bool {
        match &e.kind {
            ExprKind::Id(_) => !matches!(e.ty.derived.first(), Some(DerivedDecl::Function { .. })),
            ExprKind::Op(op) => match op {
                Token::Subscript | Token::Arrow | Token::Indirection => true,
                Token::Dot => Self::is_lvalue(&e.children[0]),
                _ => false,
            },
            ExprKind::StrLit(_) => true,
            ExprKind::IConst(_) => false,
        }
    }

    /// True when no member (recursively) is const-qualified
    fn is_modif_tag(&self, tag: &str) -> bool {
        let Some(def) = self.syms.lookup_tag(tag) else {
            return true;
        };
        for m in &def.members {
            let mut chain = &m.ty.derived[..];
            while matches!(chain.first(), Some(DerivedDecl::Array { .. })) {
                chain = &chain[1..];
            }
            match chain.first() {
                Some(DerivedDecl::Pointer { qual: Some(q) }) if q.has_const() => return false,
                Some(_) => {}
                None => {
                    if m.ty.specs.qual.map(Qualifier::has_const).unwrap_or(false) {
                        return false;
                    }
                    if let Some(t) = m.ty.specs.spec.tag() {
                        if matches!(
                            m.ty.specs.spec,
                            crate::ast::TypeSpec::Struct(_) | crate::ast::TypeSpec::Union(_)
                        ) && !self.is_modif_tag(t)
                        {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// 6.3.2.1#1 modifiable lvalue test
    pub fn is_modif_lvalue(&self, e: &ExecNode) -> bool {
        if !Self::is_lvalue(e) {
            return false;
        }
        let cat = e.ty.category();
        match cat {
            Token::Subscript => false,
            Token::Star => !e
                .ty
                .ptr_qual()
                .map(Qualifier::has_const)
                .unwrap_or(false),
            Token::Void => false,
            _ => {
                if e.ty.specs.qual.map(Qualifier::has_const).unwrap_or(false) {
                    return false;
                }
                if is_struct_union_enum(cat) {
                    let Some(tag) = e.ty.specs.spec.tag() else {
                        return false;
                    };
                    if !self.syms.is_complete(tag) {
                        return false;
                    }
                    if cat != Token::Enum && !self.is_modif_tag(tag) {
                        return false;
                    }
                }
                true
            }
        }
    }

    /// True for pointers to complete object types
    fn is_ptr2obj(&self, ty: &Declaration) -> bool {
        match ty.derived.get(1) {
            Some(DerivedDecl::Function { .. }) => false,
            Some(DerivedDecl::Array { len: None }) => false,
            Some(_) => true,
            None => match &ty.specs.spec {
                crate::ast::TypeSpec::Void => false,
                spec if spec.tag().is_some() => self
                    .syms
                    .is_complete(spec.tag().map(|t| &**t).unwrap_or("")),
                _ => true,
            },
        }
    }

    // =========================================================================
    // Assignment compatibility
    // =========================================================================

    /// 6.5.16.1: can expression `e` be stored into a `dest_ty` object?
    ///
    /// May emit warnings; returns false only for the hard constraint
    /// violations.
    pub fn can_assign_to(&mut self, dest_ty: &Declaration, e: &ExecNode) -> bool {
        let src_ty = e.ty.clone();
        let cat_d = dest_ty.category();
        let cat_s = src_ty.category();
        let arch64 = self.target.arch64();

        if is_integer(cat_d) {
            if is_integer(cat_s) {
                // literal sources get a value-fit check instead of the
                // rank-based warnings
                if e.is_iconst() {
                    let val = e.const_val().unwrap_or(0);
                    let narrowed: Option<i64> = match cat_d {
                        Token::UnsignedLongLong | Token::LongLong => None,
                        Token::UnsignedLong if arch64 => None,
                        Token::UnsignedLong | Token::Unsigned => {
                            if val < 0 || val > u32::MAX as i64 {
                                Some(val as u32 as i64)
                            } else {
                                None
                            }
                        }
                        Token::Long if arch64 => None,
                        Token::Long | Token::Int | Token::Enum => {
                            if val < i32::MIN as i64 || val > i32::MAX as i64 {
                                Some(val as i32 as i64)
                            } else {
                                None
                            }
                        }
                        Token::Short => {
                            if val < i16::MIN as i64 || val > i16::MAX as i64 {
                                Some(val as i16 as i64)
                            } else {
                                None
                            }
                        }
                        Token::UnsignedShort => {
                            if val < 0 || val > u16::MAX as i64 {
                                Some(val as u16 as i64)
                            } else {
                                None
                            }
                        }
                        Token::Char | Token::SignedChar => {
                            if val < i8::MIN as i64 || val > i8::MAX as i64 {
                                Some(val as i8 as i64)
                            } else {
                                None
                            }
                        }
                        Token::UnsignedChar => {
                            if val < 0 || val > u8::MAX as i64 {
                                Some(val as u8 as i64)
                            } else {
                                None
                            }
                        }
                        _ => None,
                    };
                    if let Some(final_val) = narrowed {
                        let msg = if is_signed_int(cat_s) {
                            format!(
                                "implicit conversion changes value from {} to {}",
                                val, final_val
                            )
                        } else {
                            format!(
                                "implicit conversion changes value from {} to {}",
                                val as u64, final_val
                            )
                        };
                        self.diags.warning(&e.loc, msg);
                    }
                    return true;
                }

                let mut rank_d = get_rank(cat_d);
                let mut rank_s = get_rank(cat_s);
                if arch64 {
                    // long and long long share a width
                    rank_d = if rank_d == types::LLONG_RANK {
                        types::LONG_RANK
                    } else {
                        rank_d
                    };
                    rank_s = if rank_s == types::LLONG_RANK {
                        types::LONG_RANK
                    } else {
                        rank_s
                    };
                } else {
                    // int and long share a width
                    rank_d = if rank_d == types::LONG_RANK {
                        types::INT_RANK
                    } else {
                        rank_d
                    };
                    rank_s = if rank_s == types::LONG_RANK {
                        types::INT_RANK
                    } else {
                        rank_s
                    };
                }
                if rank_s > rank_d {
                    let msg = format!(
                        "implicit conversion loses integer precision: `{}' to `{}'",
                        cat_s.lexeme(),
                        cat_d.lexeme()
                    );
                    self.diags.warning(&e.loc, msg);
                } else if rank_d == rank_s && is_signed_int(cat_d) != is_signed_int(cat_s) {
                    let msg = format!(
                        "implicit conversion changes signedness: `{}' to `{}'",
                        cat_s.lexeme(),
                        cat_d.lexeme()
                    );
                    self.diags.warning(&e.loc, msg);
                }
            } else if is_pointer(cat_s) || cat_s == Token::Function {
                self.diags
                    .warning(&e.loc, "pointer to integer conversion without a cast");
            } else {
                return false;
            }
        } else if cat_d == Token::Struct || cat_d == Token::Union {
            if cat_d != cat_s {
                return false;
            }
            let same_tag = match (dest_ty.specs.spec.tag(), src_ty.specs.spec.tag()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if !same_tag {
                return false;
            }
        } else if cat_d == Token::Star {
            if is_pointer(cat_s) || cat_s == Token::Function {
                let dest_pointee = dest_ty.inner();
                let src_pointee = if cat_s == Token::Function {
                    src_ty.clone()
                } else {
                    src_ty.inner()
                };
                if !are_compatible(&dest_pointee, &src_pointee, false) {
                    if dest_ty.is_void_ptr() {
                        if src_ty.is_func_ptr() {
                            self.diags.warning(
                                &e.loc,
                                "function pointer implicitly converted to void pointer",
                            );
                            return true;
                        }
                        // void* taking an object pointer: only the
                        // qualifier check below remains
                    } else if src_ty.is_void_ptr() {
                        if dest_ty.is_func_ptr() {
                            // func_ptr = (void *)0 is the null pointer constant
                            if e.is_cast_of_zero() {
                                return true;
                            }
                            self.diags.warning(
                                &e.loc,
                                "void pointer implicitly converted to function pointer",
                            );
                            return true;
                        }
                    } else {
                        self.diags
                            .warning(&e.loc, "assignment from incompatible pointer type");
                        return true;
                    }
                }

                // the left pointee must carry every qualifier of the right
                let q_d = pointee_qual(dest_ty);
                let q_s = pointee_qual(&src_ty);
                let discarded = match q_s {
                    Some(Qualifier::ConstVolatile) => match q_d {
                        None => Some("const volatile"),
                        Some(Qualifier::Const) => Some("volatile"),
                        Some(Qualifier::Volatile) => Some("const"),
                        Some(Qualifier::ConstVolatile) => None,
                    },
                    Some(Qualifier::Const) => match q_d {
                        None | Some(Qualifier::Volatile) => Some("const"),
                        _ => None,
                    },
                    Some(Qualifier::Volatile) => match q_d {
                        None | Some(Qualifier::Const) => Some("volatile"),
                        _ => None,
                    },
                    None => None,
                };
                if let Some(q) = discarded {
                    let msg = format!(
                        "assignment discards `{}' qualifier from pointer target type",
                        q
                    );
                    self.diags.warning(&e.loc, msg);
                }
            } else if is_integer(cat_s) {
                if !e.is_literal_zero() {
                    self.diags
                        .warning(&e.loc, "integer to pointer conversion without a cast");
                }
            } else {
                return false;
            }
        }

        true
    }

    // =========================================================================
    // Binary operators
    // =========================================================================

    fn analyze_comma(&mut self, e: &mut ExecNode) {
        // 6.5.17#2: the result has the type and value of the right operand
        if self.error_binary(e) {
            return;
        }
        e.ty = e.children[1].ty.clone();
    }

    fn multiplicative_type(&mut self, e: &mut ExecNode) -> Declaration {
        // 6.5.5#2: both operands shall have arithmetic type
        let ty1 = e.children[0].ty.category();
        let ty2 = e.children[1].ty.category();
        if !is_integer(ty1) || !is_integer(ty2) {
            let op = match e.kind {
                ExprKind::Op(o) => o,
                _ => unreachable!(),
            };
            self.binary_op_error(e, op);
            return error_ty();
        }
        get_type_node(get_result_type(
            get_promoted_type(ty1),
            get_promoted_type(ty2),
            self.target.arch64(),
        ))
        .clone()
    }

    fn additive_type(&mut self, op: Token, e: &mut ExecNode) -> Declaration {
        let ty_l = e.children[0].ty.category();
        let ty_r = e.children[1].ty.category();
        let arch64 = self.target.arch64();

        if op == Token::Plus {
            // 6.5.6#2: arithmetic + arithmetic, or pointer-to-object +
            // integer
            if is_integer(ty_l) {
                if is_integer(ty_r) {
                    return get_type_node(get_result_type(
                        get_promoted_type(ty_l),
                        get_promoted_type(ty_r),
                        arch64,
                    ))
                    .clone();
                }
                if is_pointer(ty_r) && self.is_ptr2obj(&e.children[1].ty) {
                    return e.children[1].ty.clone();
                }
            } else if is_pointer(ty_l) && is_integer(ty_r) && self.is_ptr2obj(&e.children[0].ty) {
                return e.children[0].ty.clone();
            }
            self.binary_op_error(e, op);
            return error_ty();
        }

        // 6.5.6#3: arithmetic - arithmetic, pointer - integer,
        // compatible-pointer - compatible-pointer
        if is_integer(ty_l) {
            if is_integer(ty_r) {
                return get_type_node(get_result_type(
                    get_promoted_type(ty_l),
                    get_promoted_type(ty_r),
                    arch64,
                ))
                .clone();
            }
        } else if is_pointer(ty_l) {
            if is_integer(ty_r) {
                if self.is_ptr2obj(&e.children[0].ty) {
                    return e.children[0].ty.clone();
                }
            } else if is_pointer(ty_r)
                && self.is_ptr2obj(&e.children[0].ty)
                && self.is_ptr2obj(&e.children[1].ty)
                && are_compatible(&e.children[0].ty.inner(), &e.children[1].ty.inner(), false)
            {
                // ptrdiff_t
                return get_type_node(Token::Long).clone();
            }
        }
        self.binary_op_error(e, op);
        error_ty()
    }

    fn bitwise_type(&mut self, op: Token, e: &mut ExecNode) -> Declaration {
        let ty1 = e.children[0].ty.category();
        let ty2 = e.children[1].ty.category();
        if !is_integer(ty1) || !is_integer(ty2) {
            self.binary_op_error(e, op);
            return error_ty();
        }
        if op == Token::LShift || op == Token::RShift {
            // the usual arithmetic conversions do not apply to shifts;
            // the result has the promoted left operand's type
            get_type_node(get_promoted_type(ty1)).clone()
        } else {
            get_type_node(get_result_type(
                get_promoted_type(ty1),
                get_promoted_type(ty2),
                self.target.arch64(),
            ))
            .clone()
        }
    }

    fn analyze_logical(&mut self, e: &mut ExecNode) {
        // 6.5.13/14#2: each operand shall have scalar type
        let ty1 = e.children[0].ty.category();
        let ty2 = e.children[1].ty.category();
        if self.error_binary(e) {
            return;
        }
        let ok = |t: Token| is_scalar(t) || t == Token::Subscript || t == Token::Function;
        if !ok(ty1) || !ok(ty2) {
            let op = match e.kind {
                ExprKind::Op(o) => o,
                _ => unreachable!(),
            };
            self.binary_op_error(e, op);
            return;
        }
        e.ty = get_type_node(Token::Int).clone();
    }

    fn analyze_relational_equality(&mut self, e: &mut ExecNode, op: Token) {
        let is_eq_op = op == Token::Eq || op == Token::NotEq;
        let ty1 = e.children[0].ty.category();
        let ty2 = e.children[1].ty.category();
        if self.error_binary(e) {
            return;
        }

        if is_integer(ty1) {
            if is_integer(ty2) {
                // OK
            } else if is_pointer(ty2) || ty2 == Token::Function {
                if !is_eq_op || !e.children[0].is_literal_zero() {
                    self.diags
                        .warning(&e.loc, "comparison between pointer and integer");
                }
            } else {
                self.binary_op_error(e, op);
                return;
            }
        } else if is_pointer(ty1) || ty1 == Token::Function {
            if is_integer(ty2) {
                if !is_eq_op || !e.children[1].is_literal_zero() {
                    self.diags
                        .warning(&e.loc, "comparison between pointer and integer");
                }
            } else if is_pointer(ty2) || ty2 == Token::Function {
                // ==/!= admit one void* operand without further checks
                if is_eq_op {
                    if e.children[0].ty.is_void_ptr() {
                        if !e.children[0].is_cast_of_zero()
                            && (ty2 == Token::Function || e.children[1].ty.is_func_ptr())
                        {
                            self.diags
                                .warning(&e.loc, "comparison of `void *' with function pointer");
                        }
                        e.ty = get_type_node(Token::Int).clone();
                        return;
                    } else if e.children[1].ty.is_void_ptr() {
                        if !e.children[1].is_cast_of_zero()
                            && (ty1 == Token::Function || e.children[0].ty.is_func_ptr())
                        {
                            self.diags
                                .warning(&e.loc, "comparison of `void *' with function pointer");
                        }
                        e.ty = get_type_node(Token::Int).clone();
                        return;
                    }
                }

                let p1 = if ty1 != Token::Function {
                    e.children[0].ty.inner()
                } else {
                    e.children[0].ty.clone()
                };
                let p2 = if ty2 != Token::Function {
                    e.children[1].ty.inner()
                } else {
                    e.children[1].ty.clone()
                };
                if !are_compatible(&p1, &p2, false) {
                    self.diags
                        .warning(&e.loc, "comparison of distinct pointer types");
                } else if !is_eq_op && p1.category() == Token::Function {
                    self.diags.warning(&e.loc, "comparison of function pointers");
                }
            } else {
                self.binary_op_error(e, op);
                return;
            }
        } else {
            self.binary_op_error(e, op);
            return;
        }

        // the result has type int
        e.ty = get_type_node(Token::Int).clone();
    }

    // =========================================================================
    // Conditional operator
    // =========================================================================

    fn analyze_conditional(&mut self, e: &mut ExecNode) {
        // 6.5.15#2: the first operand shall have scalar type
        let ty1 = e.children[0].ty.category();
        if ty1 == Token::Error {
            e.ty = error_ty();
            return;
        }
        if !is_scalar(ty1) && ty1 != Token::Subscript && ty1 != Token::Function {
            self.set_error(
                e,
                "invalid first operand for conditional operator".to_string(),
            );
            return;
        }

        // 6.5.15#3: bring the second and third operands to a common type
        let ty2 = e.children[1].ty.category();
        let ty3 = e.children[2].ty.category();
        if ty2 == Token::Error || ty3 == Token::Error {
            e.ty = error_ty();
            return;
        }

        if is_integer(ty2) {
            if is_integer(ty3) {
                e.ty = get_type_node(get_result_type(
                    get_promoted_type(ty2),
                    get_promoted_type(ty3),
                    self.target.arch64(),
                ))
                .clone();
                return;
            }
            if is_pointer(ty3) || ty3 == Token::Function {
                e.ty = e.children[2].ty.clone();
                if !e.children[1].is_literal_zero() {
                    self.diags.warning(
                        &e.loc,
                        "pointer/integer type mismatch in conditional expression",
                    );
                }
                return;
            }
            self.conditional_mismatch(e);
        } else if ty2 == Token::Struct || ty2 == Token::Union {
            if ty3 != ty2 {
                self.conditional_mismatch(e);
                return;
            }
            let same_tag = match (
                e.children[1].ty.specs.spec.tag(),
                e.children[2].ty.specs.spec.tag(),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if !same_tag {
                self.conditional_mismatch(e);
                return;
            }
            e.ty = e.children[1].ty.clone();
        } else if is_pointer(ty2) || ty2 == Token::Function {
            if is_integer(ty3) {
                e.ty = e.children[1].ty.clone();
                if !e.children[2].is_literal_zero() {
                    self.diags.warning(
                        &e.loc,
                        "pointer/integer type mismatch in conditional expression",
                    );
                }
                return;
            }
            if !(is_pointer(ty3) || ty3 == Token::Function) {
                self.conditional_mismatch(e);
                return;
            }
            // 6.5.15#6: qualifier union over the pointed-to types
            let then_ty = e.children[1].ty.clone();
            let else_ty = e.children[2].ty.clone();
            if are_compatible(&then_ty.inner(), &else_ty.inner(), false) {
                let tq1 = pointee_qual(&then_ty);
                let tq2 = pointee_qual(&else_ty);
                e.ty = match (tq1, tq2) {
                    (None, _) => else_ty,
                    (_, None) => then_ty,
                    (Some(a), Some(b)) if a == b || a == Qualifier::ConstVolatile => then_ty,
                    (_, Some(Qualifier::ConstVolatile)) => else_ty,
                    _ => with_pointee_qual(&then_ty, Qualifier::ConstVolatile),
                };
                return;
            }
            // incompatible pointees: one side must be void* (or the whole
            // thing degrades with a warning)
            let (void_side, other_side) = if then_ty.is_void_ptr() {
                if else_ty.is_func_ptr() {
                    self.diags.warning(
                        &e.loc,
                        "conditional expression between `void *' and function pointer",
                    );
                    e.ty = then_ty;
                    return;
                }
                (then_ty, else_ty)
            } else if else_ty.is_void_ptr() {
                if then_ty.is_func_ptr() {
                    self.diags.warning(
                        &e.loc,
                        "conditional expression between function pointer and `void *'",
                    );
                    e.ty = else_ty;
                    return;
                }
                (else_ty, then_ty)
            } else {
                self.diags
                    .warning(&e.loc, "pointer type mismatch in conditional expression");
                e.ty = then_ty;
                return;
            };
            // result: void* qualified with the union of both pointees'
            // qualifiers
            if matches!(
                other_side.derived.get(1),
                Some(DerivedDecl::Array { .. }) | Some(DerivedDecl::Function { .. })
            ) {
                e.ty = void_side;
                return;
            }
            let tq1 = pointee_qual(&void_side);
            let tq2 = pointee_qual(&other_side);
            e.ty = match (tq1, tq2) {
                (None, None) | (Some(_), None) => void_side,
                (None, Some(q)) => with_pointee_qual(&void_side, q),
                (Some(a), Some(b)) if a == b || a == Qualifier::ConstVolatile => void_side,
                _ => with_pointee_qual(&void_side, Qualifier::ConstVolatile),
            };
        } else if ty2 == Token::Void {
            if ty3 != Token::Void {
                self.conditional_mismatch(e);
                return;
            }
            e.ty = e.children[1].ty.clone();
        } else {
            self.conditional_mismatch(e);
        }
    }

    fn conditional_mismatch(&mut self, e: &mut ExecNode) {
        let msg = format!(
            "type mismatch in conditional expression (`{}' and `{}')",
            e.children[1].ty, e.children[2].ty
        );
        self.set_error(e, msg);
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    fn analyze_assignment(&mut self, e: &mut ExecNode, op: Token) {
        if self.error_binary(e) {
            return;
        }
        // 6.5.16#2: the left operand shall be a modifiable lvalue
        if !self.is_modif_lvalue(&e.children[0]) {
            self.set_error(e, "expression is not assignable".to_string());
            return;
        }

        if op == Token::Assign {
            let dest = e.children[0].ty.clone();
            if !self.can_assign_to(&dest, &e.children[1]) {
                let msg = format!(
                    "incompatible types when assigning to type `{}' from type `{}'",
                    dest, e.children[1].ty
                );
                self.set_error(e, msg);
                return;
            }
        } else {
            // E1 op= E2  ==>  E1 = E1 op (E2), with E1 evaluated only once
            let equiv = match op {
                Token::MulAssign => Token::Mul,
                Token::DivAssign => Token::Div,
                Token::RemAssign => Token::Rem,
                Token::PlusAssign => Token::Plus,
                Token::MinusAssign => Token::Minus,
                Token::LShiftAssign => Token::LShift,
                Token::RShiftAssign => Token::RShift,
                Token::AndAssign => Token::BitAnd,
                Token::XorAssign => Token::BitXor,
                Token::OrAssign => Token::BitOr,
                _ => unreachable!(),
            };
            let inter_ty = match equiv {
                Token::Mul | Token::Div | Token::Rem => self.multiplicative_type(e),
                Token::Plus | Token::Minus => self.additive_type(equiv, e),
                _ => self.bitwise_type(equiv, e),
            };
            if inter_ty.category() == Token::Error {
                e.ty = error_ty();
                return;
            }
            // re-check assignability of the intermediate result
            let shell = {
                let mut s = ExecNode::binary(
                    equiv,
                    ExecNode::iconst("", crate::ast::IntSuffix::default(), e.loc.clone()),
                    ExecNode::iconst("", crate::ast::IntSuffix::default(), e.loc.clone()),
                    e.loc.clone(),
                );
                s.children.clear();
                s.ty = inter_ty.clone();
                s
            };
            let dest = e.children[0].ty.clone();
            if !self.can_assign_to(&dest, &shell) {
                let msg = format!(
                    "incompatible types when assigning to type `{}' from type `{}'",
                    dest, inter_ty
                );
                self.set_error(e, msg);
                return;
            }
            // stash the intermediate result type for the lowerer
            e.compound_ty = Some(inter_ty);
        }

        e.ty = e.children[0].ty.clone();
    }

    // =========================================================================
    // Casts and unary operators
    // =========================================================================

    fn analyze_cast(&mut self, e: &mut ExecNode) {
        // 6.5.4#2: both sides scalar, or the target is void
        let ty_src = e.children[0].ty.category();
        if ty_src == Token::Error {
            e.ty = error_ty();
            return;
        }
        if !is_scalar(ty_src)
            && ty_src != Token::Subscript
            && ty_src != Token::Function
            && ty_src != Token::Void
        {
            self.set_error(e, "cast operand does not have scalar type".to_string());
            return;
        }

        let target = e.type_arg.clone().unwrap_or_else(Declaration::error);
        let ty_tgt = target.category();
        if ty_tgt == Token::Error {
            e.ty = error_ty();
            return;
        }
        if !is_scalar(ty_tgt) && ty_tgt != Token::Void {
            self.set_error(e, "cast specifies conversion to non-scalar type".to_string());
            return;
        }
        if ty_src == Token::Void && ty_tgt != Token::Void {
            self.set_error(
                e,
                "invalid cast of void expression to non-void type".to_string(),
            );
            return;
        }
        e.ty = target;
    }

    fn analyze_inc_dec(&mut self, e: &mut ExecNode, op: Token) {
        // 6.5.2.4#1 / 6.5.3.1#1
        let ty = e.children[0].ty.category();
        if ty == Token::Error {
            e.ty = error_ty();
            return;
        }
        if !is_integer(ty) && !is_pointer(ty) {
            let what = if op == Token::PostInc || op == Token::PreInc {
                "increment"
            } else {
                "decrement"
            };
            self.set_error(e, format!("wrong type argument to {}", what));
            return;
        }
        if !self.is_modif_lvalue(&e.children[0]) {
            self.set_error(e, "expression is not modifiable".to_string());
            return;
        }
        e.ty = e.children[0].ty.clone();
    }

    fn analyze_unary(&mut self, e: &mut ExecNode, op: Token) {
        match op {
            Token::PreInc | Token::PreDec => self.analyze_inc_dec(e, op),
            Token::SizeOf | Token::AlignOf => {
                // 6.5.3.4#1: no function or incomplete operands
                let ty = match &e.type_arg {
                    Some(t) => t.clone(),
                    None => e.children[0].ty.clone(),
                };
                let cat = ty.category();
                if cat == Token::Error {
                    e.ty = error_ty();
                    return;
                }
                let op_name = if op == Token::SizeOf {
                    "sizeof"
                } else {
                    "__alignof__"
                };
                if cat == Token::Function {
                    self.set_error(
                        e,
                        format!("invalid application of `{}' to a function type", op_name),
                    );
                    return;
                }
                let incomplete_array = cat == Token::Subscript
                    && matches!(ty.derived.first(), Some(DerivedDecl::Array { len: None }));
                let incomplete_tag = is_struct_union_enum(cat)
                    && ty
                        .specs
                        .spec
                        .tag()
                        .map(|t| !self.syms.is_complete(t))
                        .unwrap_or(true);
                if incomplete_array || incomplete_tag {
                    self.set_error(
                        e,
                        format!("invalid application of `{}' to incomplete type", op_name),
                    );
                    return;
                }
                // 6.5.3.4#2: the result is an integer constant
                let n = if op == Token::SizeOf {
                    layout::size_of(&ty, self.syms, &self.target)
                } else {
                    layout::alignment_of(&ty, self.syms, &self.target)
                };
                e.kind = ExprKind::IConst(IntLit::synthesized(n as i64));
                e.children.clear();
                e.type_arg = None;
                e.ty = get_type_node(Token::UnsignedLong).clone();
            }
            Token::AddressOf => {
                // 6.5.3.2#1
                let ty = e.children[0].ty.category();
                if ty == Token::Error {
                    e.ty = error_ty();
                    return;
                }
                if !Self::is_lvalue(&e.children[0]) && ty != Token::Function {
                    self.set_error(e, "invalid operand to &".to_string());
                    return;
                }
                if e.children[0].ty.specs.storage == Some(StorageClass::Register) {
                    self.set_error(e, "address of register variable requested".to_string());
                    return;
                }
                // 6.5.3.2#3: pointer to the operand's type
                e.ty = e.children[0].ty.pointer_to();
            }
            Token::Indirection => {
                // 6.5.3.2#2: the operand shall have pointer type
                let ty = e.children[0].ty.category();
                if ty == Token::Error {
                    e.ty = error_ty();
                    return;
                }
                if !is_pointer(ty) && ty != Token::Function {
                    self.set_error(e, "invalid operand to *".to_string());
                    return;
                }
                if ty != Token::Function {
                    if let Some(tag) = e.children[0].ty.specs.spec.tag() {
                        if !self.syms.is_complete(tag) {
                            self.set_error(
                                e,
                                "dereferencing pointer to incomplete type".to_string(),
                            );
                            return;
                        }
                    }
                }
                e.ty = if ty == Token::Function {
                    e.children[0].ty.clone()
                } else {
                    e.children[0].ty.inner()
                };
            }
            Token::UnaryPlus | Token::UnaryMinus | Token::Complement => {
                // 6.5.3.3#1
                let ty = e.children[0].ty.category();
                if ty == Token::Error {
                    e.ty = error_ty();
                    return;
                }
                if !is_integer(ty) {
                    self.set_error(e, format!("invalid operand to {}", op.lexeme()));
                    return;
                }
                e.ty = get_type_node(get_promoted_type(ty)).clone();
            }
            Token::Negation => {
                let ty = e.children[0].ty.category();
                if ty == Token::Error {
                    e.ty = error_ty();
                    return;
                }
                if !is_scalar(ty) && ty != Token::Function && ty != Token::Subscript {
                    self.set_error(e, "invalid operand to !".to_string());
                    return;
                }
                e.ty = get_type_node(Token::Int).clone();
            }
            _ => unreachable!("{:?} is not a unary operator", op),
        }
    }

    // =========================================================================
    // Postfix operators
    // =========================================================================

    fn analyze_postfix(&mut self, e: &mut ExecNode, op: Token) {
        match op {
            Token::Subscript => self.analyze_subscript(e),
            Token::Function => self.analyze_call(e),
            Token::Dot | Token::Arrow => self.analyze_member(e, op),
            Token::PostInc | Token::PostDec => self.analyze_inc_dec(e, op),
            _ => unreachable!(),
        }
    }

    fn analyze_subscript(&mut self, e: &mut ExecNode) {
        // 6.5.2.1#1: pointer-to-object plus integer
        let ty1 = e.children[0].ty.category();
        let ty2 = e.children[1].ty.category();
        if ty1 == Token::Error || ty2 == Token::Error {
            e.ty = error_ty();
            return;
        }

        let ptr_idx = if is_pointer(ty1) {
            if !is_integer(ty2) {
                self.set_error(e, "array subscript is not an integer".to_string());
                return;
            }
            0
        } else if is_pointer(ty2) {
            if !is_integer(ty1) {
                self.set_error(e, "array subscript is not an integer".to_string());
                return;
            }
            1
        } else {
            self.set_error(
                e,
                "subscripted value is neither array nor pointer".to_string(),
            );
            return;
        };

        let ptr_ty = e.children[ptr_idx].ty.clone();
        match ptr_ty.derived.get(1) {
            None => {
                if let Some(tag) = ptr_ty.specs.spec.tag() {
                    if !self.syms.is_complete(tag) {
                        self.set_error(
                            e,
                            "subscripting pointer to incomplete type".to_string(),
                        );
                        return;
                    }
                }
            }
            Some(DerivedDecl::Array { len: None }) => {
                self.set_error(e, "subscripting pointer to incomplete type".to_string());
                return;
            }
            Some(DerivedDecl::Function { .. }) => {
                self.set_error(e, "subscripting pointer to function".to_string());
                return;
            }
            Some(_) => {}
        }

        // the element type is the type of the [] node
        e.ty = ptr_ty.inner();
    }

    fn analyze_call(&mut self, e: &mut ExecNode) {
        // 6.5.2.2#1: the callee is a function or pointer to function
        if e.children[0].ty.category() == Token::Error {
            e.ty = error_ty();
            return;
        }
        let callee_ty = e.children[0].ty.clone();
        let fty = match callee_ty.derived.first() {
            Some(DerivedDecl::Function { .. }) => callee_ty.clone(),
            Some(DerivedDecl::Pointer { .. })
                if matches!(callee_ty.derived.get(1), Some(DerivedDecl::Function { .. })) =>
            {
                callee_ty.inner()
            }
            _ => {
                self.set_error(e, "called object is not a function".to_string());
                return;
            }
        };

        // the return type must be complete when the function is called
        if fty.derived.len() == 1 {
            if let Some(tag) = fty.specs.spec.tag() {
                if !self.syms.is_complete(tag) {
                    let msg = format!(
                        "calling function with incomplete return type `{} {}'",
                        fty.specs.spec.token().lexeme(),
                        tag
                    );
                    self.set_error(e, msg);
                    return;
                }
            }
        }

        // 6.5.2.2#2/#7: arguments convert as if by assignment to the
        // declared parameters; the ellipsis stops the checking
        let (params, variadic) = match fty.derived.first() {
            Some(DerivedDecl::Function { params, variadic }) => (Arc::clone(params), *variadic),
            _ => unreachable!(),
        };
        let nargs = e.children.len() - 1;
        for (i, p) in params.iter().enumerate() {
            let Some(arg) = e.children.get(i + 1) else {
                break;
            };
            if arg.ty.category() == Token::Error {
                e.ty = error_ty();
                return;
            }
            let p_ty = p.ty.clone();
            if !self.can_assign_to(&p_ty, &e.children[i + 1]) {
                let loc = e.children[i + 1].loc.clone();
                let msg = format!(
                    "parameter/argument type mismatch (parameter #{}; expected `{}', given `{}')",
                    i + 1,
                    p_ty,
                    e.children[i + 1].ty
                );
                self.diags.error(&loc, msg);
            }
        }
        if nargs < params.len() || (nargs > params.len() && !variadic) {
            self.set_error(e, "parameter/argument number mismatch".to_string());
            return;
        }
        for arg in &e.children[1 + params.len()..] {
            if arg.ty.category() == Token::Error {
                e.ty = error_ty();
                return;
            }
        }

        // the call has the function's return type
        e.ty = fty.inner();
    }

    fn analyze_member(&mut self, e: &mut ExecNode, op: Token) {
        // 6.5.2.3: struct/union operand (through a pointer for ->)
        if e.children[0].ty.category() == Token::Error {
            e.ty = error_ty();
            return;
        }
        let obj_ty = e.children[0].ty.clone();
        let ts = &obj_ty.specs.spec;
        let is_struct = matches!(ts, crate::ast::TypeSpec::Struct(_));
        let is_union = matches!(ts, crate::ast::TypeSpec::Union(_));
        if !is_struct && !is_union {
            let msg = format!(
                "left operand of {} has neither structure nor union type",
                op.lexeme()
            );
            self.set_error(e, msg);
            return;
        }
        if op == Token::Dot {
            if !obj_ty.derived.is_empty() {
                self.set_error(e, "invalid operand to .".to_string());
                return;
            }
        } else if !matches!(obj_ty.derived.first(), Some(DerivedDecl::Pointer { .. }))
            && !matches!(obj_ty.derived.first(), Some(DerivedDecl::Array { .. }))
        {
            self.set_error(e, "invalid operand to ->".to_string());
            return;
        }

        let tag = ts.tag().cloned().unwrap_or_else(|| Arc::from(""));
        let member = e.children[1]
            .ident()
            .cloned()
            .unwrap_or_else(|| Arc::from(""));

        let member_ty = {
            let Some(def) = self.syms.lookup_tag(&tag).filter(|d| d.complete) else {
                let msg = format!("left operand of {} has incomplete type", op.lexeme());
                self.set_error(e, msg);
                return;
            };
            let Some(m) = def.members.iter().find(|m| m.name == member) else {
                let msg = format!(
                    "`{} {}' has no member named `{}'",
                    ts.token().lexeme(),
                    tag,
                    member
                );
                self.set_error(e, msg);
                return;
            };
            m.ty.clone()
        };

        // 6.5.2.3#3/#4: a qualified first operand qualifies the member
        e.ty = match obj_ty.specs.qual {
            None => member_ty,
            Some(tq_l) => Self::qualify_member_type(&member_ty, tq_l),
        };
    }

    /// Propagate the object's qualification onto a member's type
    fn qualify_member_type(member_ty: &Declaration, tq_l: Qualifier) -> Declaration {
        // arrays inherit through their element type
        let n = member_ty
            .derived
            .iter()
            .take_while(|d| matches!(d, DerivedDecl::Array { .. }))
            .count();
        match member_ty.derived.get(n) {
            Some(DerivedDecl::Pointer { qual }) => {
                let new_q = match qual {
                    None => tq_l,
                    Some(q) if *q == tq_l || *q == Qualifier::ConstVolatile => *q,
                    Some(_) => Qualifier::ConstVolatile,
                };
                let mut derived = member_ty.derived.clone();
                derived[n] = DerivedDecl::Pointer { qual: Some(new_q) };
                Declaration {
                    specs: Arc::clone(&member_ty.specs),
                    derived,
                }
            }
            // struct members cannot have function type
            Some(DerivedDecl::Function { .. }) => member_ty.clone(),
            _ => {
                let merged = match member_ty.specs.qual {
                    None => tq_l,
                    Some(q) if q == tq_l || q == Qualifier::ConstVolatile => q,
                    Some(_) => Qualifier::ConstVolatile,
                };
                Declaration {
                    specs: Arc::new(DeclSpecs {
                        storage: member_ty.specs.storage,
                        qual: Some(merged),
                        spec: member_ty.specs.spec.clone(),
                    }),
                    derived: member_ty.derived.clone(),
                }
            }
        }
    }
}
