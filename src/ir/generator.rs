//! Intermediate code generator
//!
//! Lowers one analyzed function definition at a time into the quad stream.
//! The owned [`IrContext`] carries everything that grows while lowering
//! (instructions, addresses, the nid interner, the name arena, local
//! offsets) and is reset between function definitions; all indices handed
//! out before a reset are invalidated by it.

use crate::arena::{Arena, NameRef};
use crate::ast::{
    CompoundStmt, Declaration, DerivedDecl, ExecNode, ExprKind, FunctionDef, StmtNode,
    StorageClass, Stmt, Token, VarBinding,
};
use crate::diag::Diagnostics;
use crate::error::{Error, Result};
use crate::ir::cfg::Cfg;
use crate::ir::instruction::{AddrIdx, Address, OpKind, Quad};
use crate::sema::ConstFolder;
use crate::sym::{round_up, LocationMap, SymbolTable};
use crate::target::TargetConfig;
use crate::types::{
    get_promoted_type, get_result_type, get_type_node, is_integer, is_pointer, is_unsigned_int,
    layout, INT_RANK,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Stack offset of the first parameter (above the saved frame linkage)
pub const PARAM_AREA_START: i32 = 8;

/// Round a (possibly negative) offset down to a multiple of `align`
fn round_down(n: i32, align: i32) -> i32 {
    if align <= 1 {
        return n;
    }
    n.div_euclid(align) * align
}

/// Owned per-function compilation state
///
/// Created once per translation unit; [`IrContext::reset`] rewinds it
/// between function definitions. Quads, addresses, and CFG nodes live in
/// growing arrays addressed by stable `u32` indices.
#[derive(Debug)]
pub struct IrContext {
    /// Emitted instructions, in execution order
    pub quads: Vec<Quad>,
    /// Address table; index 0 is the reserved empty operand
    pub addrs: Vec<Address>,
    /// Control-flow graph of the last lowered function
    pub cfg: Cfg,
    /// Scoped name-to-stack-offset map
    pub locations: LocationMap,
    /// Static locals routed to the static-data collaborator
    pub static_locals: Vec<(Arc<str>, Declaration)>,
    /// Bytes of stack the lowered function's locals need
    pub size_of_local_area: i32,

    name_arena: Arena,
    nid_map: HashMap<Box<str>, u32>,
    nid_to_sid: Vec<NameRef>,
    label_counter: i64,
    tmp_counter: u32,
    true_addr: AddrIdx,
    false_addr: AddrIdx,
    local_offset: i32,
}

impl IrContext {
    /// Initialize the buffers; call once per translation unit
    pub fn new() -> Self {
        let mut ctx = Self {
            quads: Vec::with_capacity(1024),
            addrs: Vec::with_capacity(3 * 1024),
            cfg: Cfg::new(),
            locations: LocationMap::new(),
            static_locals: Vec::new(),
            size_of_local_area: 0,
            name_arena: Arena::new(1024),
            nid_map: HashMap::new(),
            nid_to_sid: Vec::new(),
            label_counter: 1,
            tmp_counter: 1,
            true_addr: 0,
            false_addr: 0,
            local_offset: 0,
        };
        ctx.seed();
        ctx
    }

    fn seed(&mut self) {
        self.addrs.push(Address::Empty);
        self.true_addr = self.new_addr(Address::IConst { val: 1 });
        self.false_addr = self.new_addr(Address::IConst { val: 0 });
    }

    /// Rewind between function definitions
    ///
    /// All quad/address/block indices handed out so far are invalidated;
    /// the state afterwards equals the freshly initialized one.
    pub fn reset(&mut self) {
        tracing::trace!("ir context reset");
        self.quads.clear();
        self.addrs.clear();
        self.cfg.reset();
        self.nid_map.clear();
        self.nid_to_sid.clear();
        self.label_counter = 1;
        self.tmp_counter = 1;
        self.local_offset = 0;
        self.size_of_local_area = 0;
        self.locations.clear();
        self.name_arena.reset();
        self.seed();
    }

    /// Append an instruction
    pub fn emit(&mut self, op: OpKind, ty: Option<Declaration>, tar: AddrIdx, arg1: AddrIdx, arg2: AddrIdx) -> u32 {
        self.quads.push(Quad {
            op,
            ty,
            tar,
            arg1,
            arg2,
        });
        (self.quads.len() - 1) as u32
    }

    fn new_addr(&mut self, a: Address) -> AddrIdx {
        self.addrs.push(a);
        (self.addrs.len() - 1) as AddrIdx
    }

    /// Integer-constant operand
    pub fn iconst_addr(&mut self, val: i64) -> AddrIdx {
        self.new_addr(Address::IConst { val })
    }

    /// String-literal operand
    pub fn strlit_addr(&mut self, s: Arc<str>) -> AddrIdx {
        self.new_addr(Address::StrLit { s })
    }

    /// The interned `1` used by the short-circuit lowerings
    pub fn true_addr(&self) -> AddrIdx {
        self.true_addr
    }

    /// The interned `0` used by the short-circuit lowerings
    pub fn false_addr(&self) -> AddrIdx {
        self.false_addr
    }

    /// Fresh temporary (`t1`, `t2`, ...); unique within a function
    pub fn new_temp(&mut self) -> AddrIdx {
        let name = format!("t{}", self.tmp_counter);
        self.tmp_counter += 1;
        let r = self.name_arena.alloc_str(&name);
        let nid = self.intern(&name, r);
        self.new_addr(Address::Temp { name: r, nid })
    }

    /// Fresh label operand
    pub fn new_label(&mut self) -> AddrIdx {
        let l = self.label_counter;
        self.label_counter += 1;
        self.new_addr(Address::IConst { val: l })
    }

    /// Identifier operand with the mangled `name:scope` spelling
    /// (parameters keep their plain name)
    pub fn id_addr(&mut self, name: &str, binding: &VarBinding, ty: &Declaration) -> AddrIdx {
        let mangled = if binding.is_param {
            name.to_string()
        } else {
            format!("{}:{}", name, binding.scope)
        };
        let r = self.name_arena.alloc_str(&mangled);
        let nid = self.intern(&mangled, r);
        let offset = self.locations.offset_of(name).unwrap_or(0);
        self.new_addr(Address::Id {
            name: r,
            nid,
            offset,
            ty: ty.clone(),
        })
    }

    fn intern(&mut self, sid: &str, r: NameRef) -> u32 {
        if let Some(&nid) = self.nid_map.get(sid) {
            return nid;
        }
        let nid = self.nid_to_sid.len() as u32;
        self.nid_map.insert(Box::from(sid), nid);
        self.nid_to_sid.push(r);
        nid
    }

    /// Spelling behind a name handle
    pub fn name(&self, r: NameRef) -> &str {
        self.name_arena.get(r)
    }

    /// Spelling of an interned identifier
    pub fn sid(&self, nid: u32) -> &str {
        self.name_arena.get(self.nid_to_sid[nid as usize])
    }

    /// Number of interned identifiers
    pub fn nid_count(&self) -> usize {
        self.nid_to_sid.len()
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

/// An lvalue's location: a directly named address or a computed pointer
enum LValue {
    /// The operand itself is addressable (identifier, string literal)
    Direct(AddrIdx),
    /// Address computed into an operand; access goes through `Ind`/`IndAsn`
    Indirect(AddrIdx),
}

struct SwitchFrame {
    cases: Vec<(i64, AddrIdx)>,
    default: Option<AddrIdx>,
}

/// Annotate a tree with Sethi-Ullman numbers
///
/// Leaves need one register; a unary operator needs one more than its
/// operand; a binary operator needs the larger operand count when they
/// differ, one more otherwise.
pub fn number_expression_tree(e: &mut ExecNode) -> u32 {
    let n = match &e.kind {
        ExprKind::IConst(_) | ExprKind::StrLit(_) | ExprKind::Id(_) => 1,
        ExprKind::Op(_) => {
            let mut ns = Vec::with_capacity(e.children.len());
            for c in e.children.iter_mut() {
                ns.push(number_expression_tree(c));
            }
            match ns.len() {
                0 => 1,
                1 => ns[0] + 1,
                2 => {
                    if ns[0] != ns[1] {
                        ns[0].max(ns[1])
                    } else {
                        ns[0] + 1
                    }
                }
                _ => ns.iter().copied().max().unwrap_or(0) + 1,
            }
        }
    };
    e.nreg = n;
    n
}

/// Lowers analyzed function definitions into the shared [`IrContext`]
pub struct IrGenerator<'a> {
    ctx: &'a mut IrContext,
    syms: &'a dyn SymbolTable,
    target: TargetConfig,
    break_targets: Vec<AddrIdx>,
    continue_targets: Vec<AddrIdx>,
    switch_frames: Vec<SwitchFrame>,
    named_labels: HashMap<Arc<str>, AddrIdx>,
    exit_label: AddrIdx,
    ret_ty: Declaration,
}

impl<'a> IrGenerator<'a> {
    /// Create a generator over the shared context and collaborators
    pub fn new(ctx: &'a mut IrContext, syms: &'a dyn SymbolTable, target: TargetConfig) -> Self {
        Self {
            ctx,
            syms,
            target,
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
            switch_frames: Vec::new(),
            named_labels: HashMap::new(),
            exit_label: 0,
            ret_ty: Declaration::base(crate::ast::TypeSpec::Void),
        }
    }

    /// Lower one function definition
    ///
    /// The function must have passed analysis with a clean diagnostic
    /// sink; the error sentinel never reaches generated IR.
    pub fn generate(&mut self, f: &mut FunctionDef, diags: &Diagnostics) -> Result<()> {
        if !diags.is_clean() {
            return Err(Error::UnresolvedTypeErrors {
                count: diags.error_count(),
            });
        }
        tracing::debug!("lowering function `{}'", f.name);

        self.ctx.locations.push_scope();
        let params = match f.derived.first() {
            Some(DerivedDecl::Function { params, .. }) => Arc::clone(params),
            _ => return Err(Error::internal("function definition without a prototype")),
        };
        let mut param_offs = PARAM_AREA_START;
        for p in params.iter() {
            if let Some(name) = &p.name {
                self.ctx.locations.insert(Arc::clone(name), param_offs);
                tracing::trace!("param `{}' at offset {}", name, param_offs);
            }
            param_offs += round_up(layout::size_of(&p.ty, self.syms, &self.target), 4) as i32;
        }

        self.ret_ty = f.return_type();
        let ret_cat = self.ret_ty.category();
        if ret_cat == Token::Struct || ret_cat == Token::Union {
            // hidden slot holding the address the caller wants the
            // returned aggregate copied to
            self.ctx.local_offset -= 4;
        }

        let entry = self.ctx.new_label();
        let exit = self.ctx.new_label();
        self.exit_label = exit;
        self.ctx.emit(OpKind::Jmp, None, entry, 0, 0);
        self.ctx.emit(OpKind::Lab, None, entry, 0, 0);
        if let Stmt::Compound(c) = &mut f.body.kind {
            self.compound_statement(c, false)?;
        } else {
            self.statement(&mut f.body)?;
        }
        self.ctx.emit(OpKind::Jmp, None, exit, 0, 0);
        self.ctx.emit(OpKind::Lab, None, exit, 0, 0);
        // epilogue marker; also terminates the exit block
        self.ctx.emit(OpKind::Ret, None, 0, 0, 0);
        self.ctx.locations.pop_scope();

        self.ctx.cfg = Cfg::build(&self.ctx.quads, &self.ctx.addrs)?;
        tracing::debug!(
            "lowered `{}': {} quads, {} blocks",
            f.name,
            self.ctx.quads.len(),
            self.ctx.cfg.block_count()
        );
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn statement(&mut self, s: &mut StmtNode) -> Result<()> {
        match &mut s.kind {
            Stmt::Compound(c) => self.compound_statement(c, true),
            Stmt::Expr(opt) => {
                if let Some(e) = opt {
                    number_expression_tree(e);
                    self.expression(e, false)?;
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                number_expression_tree(cond);
                let c = self.expression(cond, false)?;
                let cond_ty = cond.ty.clone();
                let l1 = self.ctx.new_label();
                let l2 = self.ctx.new_label();
                if let Some(els) = else_stmt {
                    let lend = self.ctx.new_label();
                    self.ctx.emit(OpKind::CBr, Some(cond_ty), c, l1, l2);
                    self.emit_label(l1);
                    self.statement(then_stmt)?;
                    self.ctx.emit(OpKind::Jmp, None, lend, 0, 0);
                    self.emit_label(l2);
                    self.statement(els)?;
                    self.ctx.emit(OpKind::Jmp, None, lend, 0, 0);
                    self.emit_label(lend);
                } else {
                    self.ctx.emit(OpKind::CBr, Some(cond_ty), c, l1, l2);
                    self.emit_label(l1);
                    self.statement(then_stmt)?;
                    self.ctx.emit(OpKind::Jmp, None, l2, 0, 0);
                    self.emit_label(l2);
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                // header-test canonical form: the single test block is both
                // the loop entry and the continue target
                let ltest = self.ctx.new_label();
                let lbody = self.ctx.new_label();
                let lend = self.ctx.new_label();
                self.ctx.emit(OpKind::Jmp, None, ltest, 0, 0);
                self.emit_label(ltest);
                number_expression_tree(cond);
                let c = self.expression(cond, false)?;
                let cond_ty = cond.ty.clone();
                self.ctx.emit(OpKind::CBr, Some(cond_ty), c, lbody, lend);
                self.emit_label(lbody);
                self.break_targets.push(lend);
                self.continue_targets.push(ltest);
                let r = self.statement(body);
                self.break_targets.pop();
                self.continue_targets.pop();
                r?;
                self.ctx.emit(OpKind::Jmp, None, ltest, 0, 0);
                self.emit_label(lend);
                Ok(())
            }
            Stmt::DoWhile { body, cond } => {
                let lbody = self.ctx.new_label();
                let lcond = self.ctx.new_label();
                let lend = self.ctx.new_label();
                self.ctx.emit(OpKind::Jmp, None, lbody, 0, 0);
                self.emit_label(lbody);
                self.break_targets.push(lend);
                self.continue_targets.push(lcond);
                let r = self.statement(body);
                self.break_targets.pop();
                self.continue_targets.pop();
                r?;
                self.ctx.emit(OpKind::Jmp, None, lcond, 0, 0);
                self.emit_label(lcond);
                number_expression_tree(cond);
                let c = self.expression(cond, false)?;
                let cond_ty = cond.ty.clone();
                self.ctx.emit(OpKind::CBr, Some(cond_ty), c, lbody, lend);
                self.emit_label(lend);
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(e) = init {
                    number_expression_tree(e);
                    self.expression(e, false)?;
                }
                let ltest = self.ctx.new_label();
                let lbody = self.ctx.new_label();
                let lstep = if step.is_some() {
                    Some(self.ctx.new_label())
                } else {
                    None
                };
                let lend = self.ctx.new_label();
                let loop_top = if cond.is_some() { ltest } else { lbody };

                self.ctx.emit(OpKind::Jmp, None, loop_top, 0, 0);
                if let Some(e) = cond {
                    self.emit_label(ltest);
                    number_expression_tree(e);
                    let c = self.expression(e, false)?;
                    let cond_ty = e.ty.clone();
                    self.ctx.emit(OpKind::CBr, Some(cond_ty), c, lbody, lend);
                }
                self.emit_label(lbody);
                self.break_targets.push(lend);
                self.continue_targets.push(lstep.unwrap_or(loop_top));
                let r = self.statement(body);
                self.break_targets.pop();
                self.continue_targets.pop();
                r?;
                if let (Some(lstep), Some(e)) = (lstep, step.as_mut()) {
                    self.ctx.emit(OpKind::Jmp, None, lstep, 0, 0);
                    self.emit_label(lstep);
                    number_expression_tree(e);
                    self.expression(e, false)?;
                }
                self.ctx.emit(OpKind::Jmp, None, loop_top, 0, 0);
                self.emit_label(lend);
                Ok(())
            }
            Stmt::Switch { cond, body } => self.switch_statement(cond, body),
            Stmt::Case { value, body } => {
                let folder = ConstFolder::new(self.syms, self.target);
                let val = folder.eval(value, false, true)?;
                let l = self.ctx.new_label();
                self.open_block(l);
                let frame = self
                    .switch_frames
                    .last_mut()
                    .ok_or_else(|| Error::internal("case label outside of a switch"))?;
                frame.cases.push((val, l));
                self.statement(body)
            }
            Stmt::Default { body } => {
                let l = self.ctx.new_label();
                self.open_block(l);
                let frame = self
                    .switch_frames
                    .last_mut()
                    .ok_or_else(|| Error::internal("default label outside of a switch"))?;
                if frame.default.replace(l).is_some() {
                    return Err(Error::internal("multiple default labels in one switch"));
                }
                self.statement(body)
            }
            Stmt::Break => {
                let t = *self
                    .break_targets
                    .last()
                    .ok_or_else(|| Error::internal("break outside of a loop or switch"))?;
                self.jump_and_reopen(t);
                Ok(())
            }
            Stmt::Continue => {
                let t = *self
                    .continue_targets
                    .last()
                    .ok_or_else(|| Error::internal("continue outside of a loop"))?;
                self.jump_and_reopen(t);
                Ok(())
            }
            Stmt::Return(opt) => {
                if let Some(e) = opt {
                    number_expression_tree(e);
                    let ret_ty = self.ret_ty.clone();
                    let v = self.expr_convert(e, &ret_ty)?;
                    self.ctx.emit(OpKind::Ret, Some(ret_ty), v, 0, 0);
                } else {
                    self.ctx.emit(OpKind::Ret, None, 0, 0, 0);
                }
                self.jump_and_reopen(self.exit_label);
                Ok(())
            }
            Stmt::Goto(label) => {
                let l = self.named_label(label);
                self.jump_and_reopen(l);
                Ok(())
            }
            Stmt::Labeled { label, body } => {
                let l = self.named_label(label);
                self.open_block(l);
                self.statement(body)
            }
        }
    }

    fn emit_label(&mut self, l: AddrIdx) {
        self.ctx.emit(OpKind::Lab, None, l, 0, 0);
    }

    /// Start the block at `l`, bridging with an explicit jump when control
    /// can fall through from the preceding code
    fn open_block(&mut self, l: AddrIdx) {
        let terminated = matches!(
            self.ctx.quads.last().map(|q| q.op),
            Some(OpKind::Jmp) | Some(OpKind::CBr) | Some(OpKind::Ret)
        );
        if !terminated {
            self.ctx.emit(OpKind::Jmp, None, l, 0, 0);
        }
        self.emit_label(l);
    }

    /// Jump to `target`, then open a fresh block for whatever follows
    fn jump_and_reopen(&mut self, target: AddrIdx) {
        self.ctx.emit(OpKind::Jmp, None, target, 0, 0);
        let fresh = self.ctx.new_label();
        self.emit_label(fresh);
    }

    fn named_label(&mut self, label: &Arc<str>) -> AddrIdx {
        if let Some(&l) = self.named_labels.get(label) {
            return l;
        }
        let l = self.ctx.new_label();
        self.named_labels.insert(Arc::clone(label), l);
        l
    }

    fn compound_statement(&mut self, c: &mut CompoundStmt, push_scope: bool) -> Result<()> {
        let old_local_offset = self.ctx.local_offset;
        if push_scope {
            self.ctx.locations.push_scope();
        }

        for group in &mut c.locals {
            match group.specs.storage {
                Some(StorageClass::Static) => {
                    for d in &group.declarators {
                        self.ctx.static_locals.push((
                            Arc::clone(&d.name),
                            Declaration::of(Arc::clone(&group.specs), d.derived.clone()),
                        ));
                    }
                    continue;
                }
                Some(StorageClass::Extern) | Some(StorageClass::Typedef) => continue,
                _ => {}
            }
            for d in &mut group.declarators {
                let lty = Declaration::of(Arc::clone(&group.specs), d.derived.clone());
                if lty.category() == Token::Function {
                    continue;
                }
                let align = layout::alignment_of(&lty, self.syms, &self.target) as i32;
                let size = layout::size_of(&lty, self.syms, &self.target) as i32;
                self.ctx.local_offset -= size;
                self.ctx.local_offset = round_down(self.ctx.local_offset, align);
                self.ctx
                    .locations
                    .insert(Arc::clone(&d.name), self.ctx.local_offset);
                tracing::trace!("var `{}' at offset {}", d.name, self.ctx.local_offset);
                if let Some(init) = &mut d.init {
                    // scalar initializers lower as assignments at the
                    // declaration point
                    number_expression_tree(init);
                    let v = self.expr_convert(init, &lty)?;
                    let binding = VarBinding::local(self.ctx.locations.depth() as u32);
                    let dst = self.ctx.id_addr(&d.name, &binding, &lty);
                    self.ctx.emit(OpKind::Asn, Some(lty.clone()), dst, v, 0);
                }
            }
        }

        for st in &mut c.body {
            self.statement(st)?;
        }

        if -self.ctx.local_offset > self.ctx.size_of_local_area {
            self.ctx.size_of_local_area = -self.ctx.local_offset;
        }
        if push_scope {
            self.ctx.local_offset = old_local_offset;
            self.ctx.locations.pop_scope();
        }
        Ok(())
    }

    fn switch_statement(&mut self, cond: &mut ExecNode, body: &mut StmtNode) -> Result<()> {
        number_expression_tree(cond);
        let c = self.expression(cond, false)?;
        let cond_ty = cond.ty.clone();
        let ldispatch = self.ctx.new_label();
        let lexit = self.ctx.new_label();
        self.ctx.emit(OpKind::Jmp, None, ldispatch, 0, 0);

        self.switch_frames.push(SwitchFrame {
            cases: Vec::new(),
            default: None,
        });
        self.break_targets.push(lexit);
        let r = self.statement(body);
        self.break_targets.pop();
        let frame = self
            .switch_frames
            .pop()
            .ok_or_else(|| Error::internal("switch frame stack underflow"))?;
        r?;

        // fall out of the last case
        self.ctx.emit(OpKind::Jmp, None, lexit, 0, 0);

        // dispatch block: selector, sorted table, default as terminator
        self.emit_label(ldispatch);
        let mut cases = frame.cases;
        cases.sort_by_key(|(v, _)| *v);
        let count = self.ctx.iconst_addr(cases.len() as i64);
        self.ctx.emit(OpKind::Switch, Some(cond_ty), c, count, 0);
        for (v, lab) in cases {
            let val = self.ctx.iconst_addr(v);
            self.ctx.emit(OpKind::Case, None, val, lab, 0);
        }
        let default = frame.default.unwrap_or(lexit);
        self.ctx.emit(OpKind::Jmp, None, default, 0, 0);
        self.emit_label(lexit);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Lower one expression; returns the address of its value
    ///
    /// With `is_addr` set the returned address designates the expression's
    /// storage instead of its value (the operand of `&`).
    pub fn expression(&mut self, e: &mut ExecNode, is_addr: bool) -> Result<AddrIdx> {
        if is_addr {
            return match self.lvalue(e)? {
                LValue::Direct(a) => {
                    let t = self.ctx.new_temp();
                    let pty = e.ty.pointer_to();
                    self.ctx.emit(OpKind::AddrOf, Some(pty), t, a, 0);
                    Ok(t)
                }
                LValue::Indirect(p) => Ok(p),
            };
        }

        match &e.kind {
            ExprKind::IConst(lit) => Ok(self.ctx.iconst_addr(lit.val)),
            ExprKind::StrLit(s) => {
                let s = Arc::clone(s);
                Ok(self.ctx.strlit_addr(s))
            }
            ExprKind::Id(name) => {
                let name = Arc::clone(name);
                let binding = e.binding.unwrap_or_else(VarBinding::file_scope);
                let a = self.ctx.id_addr(&name, &binding, &e.ty);
                // arrays and function designators decay to their address
                if matches!(e.ty.category(), Token::Subscript | Token::Function) {
                    let t = self.ctx.new_temp();
                    let pty = e.ty.pointer_to();
                    self.ctx.emit(OpKind::AddrOf, Some(pty), t, a, 0);
                    Ok(t)
                } else {
                    Ok(a)
                }
            }
            ExprKind::Op(op) => {
                let op = *op;
                self.lower_op(e, op)
            }
        }
    }

    fn lower_op(&mut self, e: &mut ExecNode, op: Token) -> Result<AddrIdx> {
        match op {
            Token::Comma => {
                self.expression(&mut e.children[0], false)?;
                self.expression(&mut e.children[1], false)
            }
            Token::Assign => {
                let dest_ty = e.ty.clone();
                let rhs = self.expr_convert(&mut e.children[1], &dest_ty)?;
                match self.lvalue_of_child0(e)? {
                    LValue::Direct(a) => {
                        self.ctx.emit(OpKind::Asn, Some(dest_ty), a, rhs, 0);
                        Ok(a)
                    }
                    LValue::Indirect(p) => {
                        self.ctx.emit(OpKind::IndAsn, Some(dest_ty), p, rhs, 0);
                        Ok(rhs)
                    }
                }
            }
            Token::MulAssign
            | Token::DivAssign
            | Token::RemAssign
            | Token::PlusAssign
            | Token::MinusAssign
            | Token::LShiftAssign
            | Token::RShiftAssign
            | Token::AndAssign
            | Token::XorAssign
            | Token::OrAssign => self.lower_compound_assign(e, op),
            Token::Conditional => {
                let l1 = self.ctx.new_label();
                let l2 = self.ctx.new_label();
                let lend = self.ctx.new_label();
                let t = self.ctx.new_temp();
                let result_ty = e.ty.clone();
                let c = self.expression(&mut e.children[0], false)?;
                let cond_ty = e.children[0].ty.clone();
                self.ctx.emit(OpKind::CBr, Some(cond_ty), c, l1, l2);
                self.emit_label(l1);
                let a = self.expression(&mut e.children[1], false)?;
                self.ctx.emit(OpKind::Asn, Some(result_ty.clone()), t, a, 0);
                self.ctx.emit(OpKind::Jmp, None, lend, 0, 0);
                self.emit_label(l2);
                let b = self.expression(&mut e.children[2], false)?;
                self.ctx.emit(OpKind::Asn, Some(result_ty), t, b, 0);
                self.ctx.emit(OpKind::Jmp, None, lend, 0, 0);
                self.emit_label(lend);
                Ok(t)
            }
            Token::LogAnd => {
                // canonical four-label sequence producing a 0/1 temporary
                let l1 = self.ctx.new_label();
                let l2 = self.ctx.new_label();
                let l3 = self.ctx.new_label();
                let l4 = self.ctx.new_label();
                let t = self.ctx.new_temp();
                let int_ty = get_type_node(Token::Int).clone();
                let a = self.expression(&mut e.children[0], false)?;
                let a_ty = e.children[0].ty.clone();
                self.ctx.emit(OpKind::CBr, Some(a_ty), a, l1, l2);
                self.emit_label(l1);
                let b = self.expression(&mut e.children[1], false)?;
                let b_ty = e.children[1].ty.clone();
                self.ctx.emit(OpKind::CBr, Some(b_ty), b, l3, l2);
                self.emit_label(l3);
                let true_a = self.ctx.true_addr();
                self.ctx.emit(OpKind::Asn, Some(int_ty.clone()), t, true_a, 0);
                self.ctx.emit(OpKind::Jmp, None, l4, 0, 0);
                self.emit_label(l2);
                let false_a = self.ctx.false_addr();
                self.ctx.emit(OpKind::Asn, Some(int_ty), t, false_a, 0);
                self.ctx.emit(OpKind::Jmp, None, l4, 0, 0);
                self.emit_label(l4);
                Ok(t)
            }
            Token::LogOr => {
                let l1 = self.ctx.new_label();
                let l2 = self.ctx.new_label();
                let l3 = self.ctx.new_label();
                let l4 = self.ctx.new_label();
                let t = self.ctx.new_temp();
                let int_ty = get_type_node(Token::Int).clone();
                let a = self.expression(&mut e.children[0], false)?;
                let a_ty = e.children[0].ty.clone();
                self.ctx.emit(OpKind::CBr, Some(a_ty), a, l2, l1);
                self.emit_label(l1);
                let b = self.expression(&mut e.children[1], false)?;
                let b_ty = e.children[1].ty.clone();
                self.ctx.emit(OpKind::CBr, Some(b_ty), b, l2, l3);
                self.emit_label(l2);
                let true_a = self.ctx.true_addr();
                self.ctx.emit(OpKind::Asn, Some(int_ty.clone()), t, true_a, 0);
                self.ctx.emit(OpKind::Jmp, None, l4, 0, 0);
                self.emit_label(l3);
                let false_a = self.ctx.false_addr();
                self.ctx.emit(OpKind::Asn, Some(int_ty), t, false_a, 0);
                self.ctx.emit(OpKind::Jmp, None, l4, 0, 0);
                self.emit_label(l4);
                Ok(t)
            }
            Token::Plus | Token::Minus => self.lower_additive(e, op),
            Token::Mul | Token::Div | Token::Rem | Token::BitAnd | Token::BitXor | Token::BitOr
            | Token::LShift | Token::RShift => {
                let kind = match op {
                    Token::Mul => OpKind::Mul,
                    Token::Div => OpKind::Div,
                    Token::Rem => OpKind::Rem,
                    Token::BitAnd => OpKind::And,
                    Token::BitXor => OpKind::Xor,
                    Token::BitOr => OpKind::Or,
                    Token::LShift => OpKind::SHL,
                    _ => OpKind::SHR,
                };
                let ty = e.ty.clone();
                let (l, r) = self.lower_operands(e)?;
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(ty), t, l, r);
                Ok(t)
            }
            Token::Eq | Token::NotEq | Token::Lt | Token::Gt | Token::LessEq | Token::GreaterEq => {
                let kind = match op {
                    Token::Eq => OpKind::EQ,
                    Token::NotEq => OpKind::NEQ,
                    Token::Lt => OpKind::LT,
                    Token::LessEq => OpKind::LET,
                    Token::Gt => OpKind::GT,
                    _ => OpKind::GET,
                };
                // the comparison runs at the operands' common type; that is
                // where signedness comes from
                let cat1 = e.children[0].ty.category();
                let cat2 = e.children[1].ty.category();
                let cmp_ty = if is_integer(cat1) && is_integer(cat2) {
                    get_type_node(get_result_type(
                        get_promoted_type(cat1),
                        get_promoted_type(cat2),
                        self.target.arch64(),
                    ))
                    .clone()
                } else {
                    // pointer comparisons are unsigned
                    get_type_node(Token::UnsignedLong).clone()
                };
                let (l, r) = self.lower_operands(e)?;
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(cmp_ty), t, l, r);
                Ok(t)
            }
            Token::UnaryPlus => self.expression(&mut e.children[0], false),
            Token::UnaryMinus | Token::Complement | Token::Negation => {
                let kind = match op {
                    Token::UnaryMinus => OpKind::Neg,
                    Token::Complement => OpKind::Cmpl,
                    _ => OpKind::Not,
                };
                let ty = e.ty.clone();
                let v = self.expression(&mut e.children[0], false)?;
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(ty), t, v, 0);
                Ok(t)
            }
            Token::AddressOf => self.expression(&mut e.children[0], true),
            Token::Indirection => {
                let p = self.expression(&mut e.children[0], false)?;
                if matches!(e.ty.category(), Token::Subscript | Token::Function) {
                    return Ok(p);
                }
                let t = self.ctx.new_temp();
                self.ctx.emit(OpKind::Ind, Some(e.ty.clone()), t, p, 0);
                Ok(t)
            }
            Token::Subscript | Token::Dot | Token::Arrow => {
                let p = match self.lvalue(e)? {
                    LValue::Indirect(p) => p,
                    LValue::Direct(a) => return Ok(a),
                };
                if matches!(e.ty.category(), Token::Subscript | Token::Function) {
                    return Ok(p);
                }
                let t = self.ctx.new_temp();
                self.ctx.emit(OpKind::Ind, Some(e.ty.clone()), t, p, 0);
                Ok(t)
            }
            Token::Function => self.lower_call(e),
            Token::PostInc | Token::PostDec | Token::PreInc | Token::PreDec => {
                self.lower_inc_dec(e, op)
            }
            Token::Cast => {
                let src_ty = e.children[0].ty.clone();
                let dest_ty = e.ty.clone();
                let v = self.expression(&mut e.children[0], false)?;
                self.convert_addr(v, &src_ty, &dest_ty)
            }
            Token::SizeOf | Token::AlignOf => {
                // the analyzer rewrites these; fold late just in case
                let folder = ConstFolder::new(self.syms, self.target);
                let mut copy = e.clone();
                let v = folder.eval(&mut copy, false, false)?;
                *e = copy;
                Ok(self.ctx.iconst_addr(v))
            }
            other => Err(Error::internal(format!(
                "operator {:?} cannot be lowered",
                other
            ))),
        }
    }

    /// Evaluate both operands, higher register pressure first
    fn lower_operands(&mut self, e: &mut ExecNode) -> Result<(AddrIdx, AddrIdx)> {
        if e.children[1].nreg > e.children[0].nreg {
            let r = self.expression(&mut e.children[1], false)?;
            let l = self.expression(&mut e.children[0], false)?;
            Ok((l, r))
        } else {
            let l = self.expression(&mut e.children[0], false)?;
            let r = self.expression(&mut e.children[1], false)?;
            Ok((l, r))
        }
    }

    fn lower_additive(&mut self, e: &mut ExecNode, op: Token) -> Result<AddrIdx> {
        let kind = if op == Token::Plus {
            OpKind::Add
        } else {
            OpKind::Sub
        };
        let cat_l = e.children[0].ty.category();
        let cat_r = e.children[1].ty.category();

        if is_pointer(e.ty.category()) {
            // pointer +/- integer: scale the integer by the pointee size
            let (p_idx, i_idx) = if is_pointer(cat_l) { (0, 1) } else { (1, 0) };
            let elem = e.children[p_idx].ty.inner();
            let size = layout::size_of(&elem, self.syms, &self.target) as i64;
            let iv = self.expression(&mut e.children[i_idx], false)?;
            let size_a = self.ctx.iconst_addr(size);
            let t1 = self.ctx.new_temp();
            let long_ty = get_type_node(Token::Long).clone();
            self.ctx.emit(OpKind::Mul, Some(long_ty), t1, iv, size_a);
            let pv = self.expression(&mut e.children[p_idx], false)?;
            let t2 = self.ctx.new_temp();
            self.ctx.emit(kind, Some(e.ty.clone()), t2, pv, t1);
            return Ok(t2);
        }
        if op == Token::Minus && is_pointer(cat_l) && is_pointer(cat_r) {
            // pointer difference: subtract, then divide by the element size
            let elem = e.children[0].ty.inner();
            let size = layout::size_of(&elem, self.syms, &self.target) as i64;
            let (l, r) = self.lower_operands(e)?;
            let long_ty = get_type_node(Token::Long).clone();
            let t1 = self.ctx.new_temp();
            self.ctx.emit(OpKind::Sub, Some(long_ty.clone()), t1, l, r);
            let size_a = self.ctx.iconst_addr(size);
            let t2 = self.ctx.new_temp();
            self.ctx.emit(OpKind::Div, Some(long_ty), t2, t1, size_a);
            return Ok(t2);
        }

        let ty = e.ty.clone();
        let (l, r) = self.lower_operands(e)?;
        let t = self.ctx.new_temp();
        self.ctx.emit(kind, Some(ty), t, l, r);
        Ok(t)
    }

    fn lower_compound_assign(&mut self, e: &mut ExecNode, op: Token) -> Result<AddrIdx> {
        let kind = match op {
            Token::MulAssign => OpKind::Mul,
            Token::DivAssign => OpKind::Div,
            Token::RemAssign => OpKind::Rem,
            Token::PlusAssign => OpKind::Add,
            Token::MinusAssign => OpKind::Sub,
            Token::LShiftAssign => OpKind::SHL,
            Token::RShiftAssign => OpKind::SHR,
            Token::AndAssign => OpKind::And,
            Token::XorAssign => OpKind::Xor,
            Token::OrAssign => OpKind::Or,
            _ => unreachable!(),
        };
        let inter_ty = e
            .compound_ty
            .clone()
            .ok_or_else(|| Error::internal("compound assignment without a result type"))?;
        let dest_ty = e.ty.clone();

        // pointer += integer scales like pointer addition
        let scale = if is_pointer(inter_ty.category())
            && matches!(kind, OpKind::Add | OpKind::Sub)
        {
            let elem = e.children[0].ty.inner();
            Some(layout::size_of(&elem, self.syms, &self.target) as i64)
        } else {
            None
        };

        let rhs_raw = self.expression(&mut e.children[1], false)?;
        let rhs = if let Some(size) = scale {
            let size_a = self.ctx.iconst_addr(size);
            let t = self.ctx.new_temp();
            let long_ty = get_type_node(Token::Long).clone();
            self.ctx.emit(OpKind::Mul, Some(long_ty), t, rhs_raw, size_a);
            t
        } else {
            rhs_raw
        };

        match self.lvalue_of_child0(e)? {
            LValue::Direct(a) => {
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(inter_ty.clone()), t, a, rhs);
                let v = self.convert_addr(t, &inter_ty, &dest_ty)?;
                self.ctx.emit(OpKind::Asn, Some(dest_ty), a, v, 0);
                Ok(a)
            }
            LValue::Indirect(p) => {
                let cur = self.ctx.new_temp();
                self.ctx
                    .emit(OpKind::Ind, Some(e.children[0].ty.clone()), cur, p, 0);
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(inter_ty.clone()), t, cur, rhs);
                let v = self.convert_addr(t, &inter_ty, &dest_ty)?;
                self.ctx.emit(OpKind::IndAsn, Some(dest_ty), p, v, 0);
                Ok(v)
            }
        }
    }

    fn lower_inc_dec(&mut self, e: &mut ExecNode, op: Token) -> Result<AddrIdx> {
        let kind = if op == Token::PostInc || op == Token::PreInc {
            OpKind::Add
        } else {
            OpKind::Sub
        };
        let ty = e.ty.clone();
        let delta = if is_pointer(ty.category()) {
            layout::size_of(&ty.inner(), self.syms, &self.target) as i64
        } else {
            1
        };
        let post = op == Token::PostInc || op == Token::PostDec;

        match self.lvalue_of_child0(e)? {
            LValue::Direct(a) => {
                let old = if post {
                    let t = self.ctx.new_temp();
                    self.ctx.emit(OpKind::Asn, Some(ty.clone()), t, a, 0);
                    Some(t)
                } else {
                    None
                };
                let d = self.ctx.iconst_addr(delta);
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(ty.clone()), t, a, d);
                self.ctx.emit(OpKind::Asn, Some(ty), a, t, 0);
                Ok(old.unwrap_or(a))
            }
            LValue::Indirect(p) => {
                let cur = self.ctx.new_temp();
                self.ctx.emit(OpKind::Ind, Some(ty.clone()), cur, p, 0);
                let d = self.ctx.iconst_addr(delta);
                let t = self.ctx.new_temp();
                self.ctx.emit(kind, Some(ty.clone()), t, cur, d);
                self.ctx.emit(OpKind::IndAsn, Some(ty), p, t, 0);
                Ok(if post { cur } else { t })
            }
        }
    }

    fn lower_call(&mut self, e: &mut ExecNode) -> Result<AddrIdx> {
        self.ctx.emit(OpKind::BegArg, None, 0, 0, 0);

        // fetch the prototype off the callee's type
        let callee_ty = e.children[0].ty.clone();
        let fty = match callee_ty.derived.first() {
            Some(DerivedDecl::Function { .. }) => callee_ty.clone(),
            _ => callee_ty.inner(),
        };
        let params = match fty.derived.first() {
            Some(DerivedDecl::Function { params, .. }) => Arc::clone(params),
            _ => return Err(Error::internal("call through a non-function type")),
        };

        // arguments are pushed right to left
        let nargs = e.children.len() - 1;
        for i in (1..=nargs).rev() {
            let pi = i - 1;
            if pi < params.len() {
                // declared parameter: convert as if by assignment
                let p_ty = params[pi].ty.clone();
                let v = self.expr_convert(&mut e.children[i], &p_ty)?;
                self.ctx.emit(OpKind::Arg, Some(p_ty), v, 0, 0);
            } else {
                // variadic tail: the default argument promotions apply
                let v = self.expression(&mut e.children[i], false)?;
                let cat = e.children[i].ty.category();
                let a_ty = if is_integer(cat) && crate::types::get_rank(cat) < INT_RANK {
                    get_type_node(Token::Int).clone()
                } else {
                    e.children[i].ty.clone()
                };
                self.ctx.emit(OpKind::Arg, Some(a_ty), v, 0, 0);
            }
        }

        let ret_ty = e.ty.clone();
        let t = if ret_ty.category() == Token::Void {
            0
        } else {
            self.ctx.new_temp()
        };
        let n_addr = self.ctx.iconst_addr(nargs as i64);

        // a plain function designator calls directly; everything else goes
        // through a pointer value
        let direct = matches!(e.children[0].kind, ExprKind::Id(_))
            && callee_ty.category() == Token::Function;
        if direct {
            let (name, binding) = match (&e.children[0].kind, e.children[0].binding) {
                (ExprKind::Id(n), b) => (Arc::clone(n), b.unwrap_or_else(VarBinding::file_scope)),
                _ => unreachable!(),
            };
            let f_addr = self.ctx.id_addr(&name, &binding, &callee_ty);
            self.ctx.emit(OpKind::Call, Some(ret_ty), t, f_addr, n_addr);
        } else {
            let p = self.expression(&mut e.children[0], false)?;
            self.ctx.emit(OpKind::IndCall, Some(ret_ty), t, p, n_addr);
        }
        Ok(t)
    }

    // =========================================================================
    // Lvalues and conversions
    // =========================================================================

    fn lvalue_of_child0(&mut self, e: &mut ExecNode) -> Result<LValue> {
        let (head, _) = e.children.split_at_mut(1);
        self.lvalue(&mut head[0])
    }

    /// Compute the location an lvalue expression designates
    fn lvalue(&mut self, e: &mut ExecNode) -> Result<LValue> {
        match &e.kind {
            ExprKind::Id(name) => {
                let name = Arc::clone(name);
                let binding = e.binding.unwrap_or_else(VarBinding::file_scope);
                Ok(LValue::Direct(self.ctx.id_addr(&name, &binding, &e.ty)))
            }
            ExprKind::StrLit(s) => {
                let s = Arc::clone(s);
                Ok(LValue::Direct(self.ctx.strlit_addr(s)))
            }
            ExprKind::Op(Token::Indirection) => {
                let p = self.expression(&mut e.children[0], false)?;
                Ok(LValue::Indirect(p))
            }
            ExprKind::Op(Token::Subscript) => {
                // base + index * sizeof(element)
                let (p_idx, i_idx) = if is_pointer(e.children[0].ty.category()) {
                    (0, 1)
                } else {
                    (1, 0)
                };
                let elem = e.children[p_idx].ty.inner();
                let size = layout::size_of(&elem, self.syms, &self.target) as i64;
                let iv = self.expression(&mut e.children[i_idx], false)?;
                let size_a = self.ctx.iconst_addr(size);
                let t1 = self.ctx.new_temp();
                let long_ty = get_type_node(Token::Long).clone();
                self.ctx.emit(OpKind::Mul, Some(long_ty), t1, iv, size_a);
                let pv = self.expression(&mut e.children[p_idx], false)?;
                let t2 = self.ctx.new_temp();
                let pty = e.ty.pointer_to();
                self.ctx.emit(OpKind::Add, Some(pty), t2, pv, t1);
                Ok(LValue::Indirect(t2))
            }
            ExprKind::Op(op @ (Token::Dot | Token::Arrow)) => {
                let op = *op;
                let base = if op == Token::Dot {
                    match self.lvalue_of_child0(e)? {
                        LValue::Indirect(p) => p,
                        LValue::Direct(a) => {
                            let t = self.ctx.new_temp();
                            let pty = e.children[0].ty.pointer_to();
                            self.ctx.emit(OpKind::AddrOf, Some(pty), t, a, 0);
                            t
                        }
                    }
                } else {
                    self.expression(&mut e.children[0], false)?
                };
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
                    .ok_or_else(|| Error::internal("member access without a member name"))?;
                let m = self.syms.member_descriptor(&tag, &member).ok_or_else(|| {
                    Error::internal(format!("no descriptor for `{}.{}'", tag, member))
                })?;
                if m.offset == 0 {
                    return Ok(LValue::Indirect(base));
                }
                let off = self.ctx.iconst_addr(m.offset as i64);
                let t = self.ctx.new_temp();
                let pty = e.ty.pointer_to();
                self.ctx.emit(OpKind::Add, Some(pty), t, base, off);
                Ok(LValue::Indirect(t))
            }
            _ => Err(Error::internal("expression is not an lvalue")),
        }
    }

    /// Lower `e` and bring the result to `dest`'s type
    pub fn expr_convert(&mut self, e: &mut ExecNode, dest: &Declaration) -> Result<AddrIdx> {
        let src_ty = e.ty.clone();
        let v = self.expression(e, false)?;
        self.convert_addr(v, &src_ty, dest)
    }

    /// Insert a narrowing (`Ch`/`UCh`/`Sh`/`USh`) or a long-long widening
    /// (`LLSX`/`LLZX`) when the categories demand one
    fn convert_addr(&mut self, v: AddrIdx, src: &Declaration, dest: &Declaration) -> Result<AddrIdx> {
        let cat_s = src.category();
        let cat_d = dest.category();
        let op = match cat_d {
            Token::Char | Token::SignedChar
                if !matches!(cat_s, Token::Char | Token::SignedChar) =>
            {
                Some(OpKind::Ch)
            }
            Token::UnsignedChar if cat_s != Token::UnsignedChar => Some(OpKind::UCh),
            Token::Short
                if !matches!(
                    cat_s,
                    Token::Char | Token::SignedChar | Token::UnsignedChar | Token::Short
                ) =>
            {
                Some(OpKind::Sh)
            }
            Token::UnsignedShort
                if !matches!(cat_s, Token::UnsignedChar | Token::UnsignedShort) =>
            {
                Some(OpKind::USh)
            }
            Token::LongLong | Token::UnsignedLongLong
                if !matches!(cat_s, Token::LongLong | Token::UnsignedLongLong) =>
            {
                // pointers sign-extend to match the usual ABI expectations
                if is_unsigned_int(cat_s) {
                    Some(OpKind::LLZX)
                } else {
                    Some(OpKind::LLSX)
                }
            }
            _ => None,
        };
        match op {
            Some(op) => {
                let t = self.ctx.new_temp();
                self.ctx.emit(op, Some(dest.clone()), t, v, 0);
                Ok(t)
            }
            None => Ok(v),
        }
    }
}
