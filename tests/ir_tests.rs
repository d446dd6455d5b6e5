//! Tests for statement/expression lowering into quads

use quadc::ast::{
    CompoundStmt, DeclGroup, Declaration, DerivedDecl, ExecNode, FunctionDef, IntSuffix,
    NamedDecl, SrcLoc, Stmt, StmtNode, Token, TypeSpec, VarBinding,
};
use quadc::ir::{disassemble, dump_json};
use quadc::{
    Address, Analyzer, Diagnostics, IrContext, IrGenerator, OpKind, Symbols, TargetArch,
    TargetConfig,
};
use std::sync::Arc;

fn loc() -> SrcLoc {
    SrcLoc::new("t.c", 1, 1)
}

fn int_ty() -> Declaration {
    Declaration::base(TypeSpec::Int)
}

fn local(name: &str, ty: Declaration) -> ExecNode {
    ExecNode::id(name, ty, VarBinding::local(1), loc())
}

fn lit(spelling: &str) -> ExecNode {
    ExecNode::iconst(spelling, IntSuffix::default(), loc())
}

fn expr_stmt(e: ExecNode) -> StmtNode {
    StmtNode::new(Stmt::Expr(Some(e)), loc())
}

fn assign(name: &str, ty: Declaration, value: ExecNode) -> StmtNode {
    expr_stmt(ExecNode::binary(
        Token::Assign,
        local(name, ty),
        value,
        loc(),
    ))
}

/// `void f(void)` with the given int-style locals and body
fn void_fn(locals: Vec<(&str, Declaration)>, body: Vec<StmtNode>) -> FunctionDef {
    let groups = locals
        .into_iter()
        .map(|(name, ty)| DeclGroup {
            specs: Arc::clone(&ty.specs),
            declarators: vec![NamedDecl {
                name: Arc::from(name),
                derived: ty.derived.clone(),
                init: None,
            }],
        })
        .collect();
    FunctionDef {
        name: Arc::from("f"),
        specs: Arc::new(quadc::ast::DeclSpecs::plain(TypeSpec::Void)),
        derived: vec![DerivedDecl::Function {
            params: Arc::new(Vec::new()),
            variadic: false,
        }],
        body: StmtNode::new(
            Stmt::Compound(CompoundStmt {
                locals: groups,
                body,
            }),
            loc(),
        ),
        loc: loc(),
    }
}

fn lower(f: &mut FunctionDef) -> IrContext {
    let syms = Symbols::new();
    let target = TargetConfig::new(TargetArch::X86);
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze_function(f);
    assert!(
        diags.is_clean(),
        "unexpected diagnostics: {:?}",
        diags.iter().map(|d| d.to_string()).collect::<Vec<_>>()
    );
    let mut ctx = IrContext::new();
    IrGenerator::new(&mut ctx, &syms, target)
        .generate(f, &diags)
        .expect("lowering failed");
    ctx
}

fn ops(ctx: &IrContext) -> Vec<OpKind> {
    ctx.quads.iter().map(|q| q.op).collect()
}

fn temp_names(ctx: &IrContext) -> Vec<String> {
    ctx.addrs
        .iter()
        .filter_map(|a| match a {
            Address::Temp { name, .. } => Some(ctx.name(*name).to_string()),
            _ => None,
        })
        .collect()
}

// ====================
// if lowering
// ====================

#[test]
fn test_if_else_lowering_shape() {
    // if (x) y = 1; else y = 2;
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![StmtNode::new(
            Stmt::If {
                cond: local("x", int_ty()),
                then_stmt: Box::new(assign("y", int_ty(), lit("1"))),
                else_stmt: Some(Box::new(assign("y", int_ty(), lit("2")))),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);
    let ops = ops(&ctx);

    // prologue: Jmp entry, Lab entry; then the branch diamond; then
    // Jmp exit, Lab exit, Ret
    assert_eq!(
        ops,
        vec![
            OpKind::Jmp,
            OpKind::Lab,
            OpKind::CBr,
            OpKind::Lab,
            OpKind::Asn,
            OpKind::Jmp,
            OpKind::Lab,
            OpKind::Asn,
            OpKind::Jmp,
            OpKind::Lab,
            OpKind::Jmp,
            OpKind::Lab,
            OpKind::Ret,
        ]
    );

    // the CBr targets the two Lab quads that follow it
    let cbr = &ctx.quads[2];
    let then_lab = &ctx.quads[3];
    let else_lab = &ctx.quads[6];
    assert_eq!(
        ctx.addrs[cbr.arg1 as usize].const_val(),
        ctx.addrs[then_lab.tar as usize].const_val()
    );
    assert_eq!(
        ctx.addrs[cbr.arg2 as usize].const_val(),
        ctx.addrs[else_lab.tar as usize].const_val()
    );

    // both stores hit the same mangled local
    let asn1 = &ctx.quads[4];
    let asn2 = &ctx.quads[7];
    match (&ctx.addrs[asn1.tar as usize], &ctx.addrs[asn2.tar as usize]) {
        (Address::Id { name: n1, .. }, Address::Id { name: n2, .. }) => {
            assert_eq!(ctx.name(*n1), "y:1");
            assert_eq!(ctx.name(*n2), "y:1");
        }
        other => panic!("expected Id targets, got {:?}", other),
    }
    assert_eq!(ctx.addrs[asn1.arg1 as usize].const_val(), Some(1));
    assert_eq!(ctx.addrs[asn2.arg1 as usize].const_val(), Some(2));
}

#[test]
fn test_if_else_cfg_shape() {
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![StmtNode::new(
            Stmt::If {
                cond: local("x", int_ty()),
                then_stmt: Box::new(assign("y", int_ty(), lit("1"))),
                else_stmt: Some(Box::new(assign("y", int_ty(), lit("2")))),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);
    let cfg = &ctx.cfg;
    // entry, then, else, join, exit
    assert_eq!(cfg.block_count(), 5);
    assert_eq!(cfg.node(1).out_edges, vec![2, 3]);
    assert_eq!(cfg.node(2).out_edges, vec![4]);
    assert_eq!(cfg.node(3).out_edges, vec![4]);
    assert_eq!(cfg.node(4).out_edges, vec![5]);
    assert!(cfg.node(1).in_edges.is_empty());
    assert_eq!(cfg.node(4).in_edges, vec![2, 3]);
}

// ====================
// pointer arithmetic
// ====================

#[test]
fn test_pointer_plus_integer_scales() {
    // int *p; p + 2;
    let mut f = void_fn(
        vec![("p", int_ty().pointer_to())],
        vec![expr_stmt(ExecNode::binary(
            Token::Plus,
            local("p", int_ty().pointer_to()),
            lit("2"),
            loc(),
        ))],
    );
    let ctx = lower(&mut f);

    let mul_at = ctx
        .quads
        .iter()
        .position(|q| q.op == OpKind::Mul)
        .expect("no scaling Mul emitted");
    let mul = &ctx.quads[mul_at];
    assert_eq!(ctx.addrs[mul.arg1 as usize].const_val(), Some(2));
    assert_eq!(ctx.addrs[mul.arg2 as usize].const_val(), Some(4));

    let add = &ctx.quads[mul_at + 1];
    assert_eq!(add.op, OpKind::Add);
    match &ctx.addrs[add.arg1 as usize] {
        Address::Id { name, .. } => assert_eq!(ctx.name(*name), "p:1"),
        other => panic!("expected the pointer operand, got {:?}", other),
    }
    assert_eq!(add.arg2, mul.tar);
    assert_eq!(add.ty.as_ref().map(|t| t.category()), Some(Token::Star));
}

#[test]
fn test_pointer_difference_divides_by_size() {
    let mut f = void_fn(
        vec![
            ("p", int_ty().pointer_to()),
            ("q", int_ty().pointer_to()),
        ],
        vec![expr_stmt(ExecNode::binary(
            Token::Minus,
            local("p", int_ty().pointer_to()),
            local("q", int_ty().pointer_to()),
            loc(),
        ))],
    );
    let ctx = lower(&mut f);
    let sub_at = ctx
        .quads
        .iter()
        .position(|q| q.op == OpKind::Sub)
        .expect("no Sub emitted");
    let div = &ctx.quads[sub_at + 1];
    assert_eq!(div.op, OpKind::Div);
    assert_eq!(div.arg1, ctx.quads[sub_at].tar);
    assert_eq!(ctx.addrs[div.arg2 as usize].const_val(), Some(4));
}

// ====================
// short-circuit lowering
// ====================

#[test]
fn test_logical_and_four_label_sequence() {
    // a && b
    let mut f = void_fn(
        vec![("a", int_ty()), ("b", int_ty())],
        vec![expr_stmt(ExecNode::binary(
            Token::LogAnd,
            local("a", int_ty()),
            local("b", int_ty()),
            loc(),
        ))],
    );
    let ctx = lower(&mut f);

    // two conditional branches and four labels beyond the function's
    // entry/exit pair
    let cbrs = ctx.quads.iter().filter(|q| q.op == OpKind::CBr).count();
    let labs = ctx.quads.iter().filter(|q| q.op == OpKind::Lab).count();
    assert_eq!(cbrs, 2);
    assert_eq!(labs, 4 + 2);

    // the result temporary is assigned from the interned true/false
    // sentinels, once each
    let asn: Vec<_> = ctx.quads.iter().filter(|q| q.op == OpKind::Asn).collect();
    assert_eq!(asn.len(), 2);
    assert_eq!(asn[0].tar, asn[1].tar);
    assert!(matches!(
        ctx.addrs[asn[0].tar as usize],
        Address::Temp { .. }
    ));
    let sources: Vec<_> = asn
        .iter()
        .map(|q| ctx.addrs[q.arg1 as usize].const_val().unwrap())
        .collect();
    assert!(sources.contains(&1) && sources.contains(&0));
    assert_eq!(asn[0].arg1, ctx.true_addr());
    assert_eq!(asn[1].arg1, ctx.false_addr());
}

// ====================
// loops
// ====================

#[test]
fn test_while_header_test_form() {
    // while (x) y = 1;
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![StmtNode::new(
            Stmt::While {
                cond: local("x", int_ty()),
                body: Box::new(assign("y", int_ty(), lit("1"))),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);
    assert_eq!(
        ops(&ctx),
        vec![
            OpKind::Jmp, // entry
            OpKind::Lab,
            OpKind::Jmp, // to the test block
            OpKind::Lab, // test
            OpKind::CBr,
            OpKind::Lab, // body
            OpKind::Asn,
            OpKind::Jmp, // back edge to the test
            OpKind::Lab, // loop exit
            OpKind::Jmp,
            OpKind::Lab, // function exit
            OpKind::Ret,
        ]
    );

    // blocks: entry, test, body, loop-exit, function-exit; the body jumps
    // back to the test block
    let cfg = &ctx.cfg;
    assert_eq!(cfg.block_count(), 5);
    assert_eq!(cfg.node(2).out_edges, vec![3, 4]);
    assert_eq!(cfg.node(3).out_edges, vec![2]);
    assert!(cfg.node(2).in_edges.contains(&3));
}

#[test]
fn test_do_while_tests_after_body() {
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![StmtNode::new(
            Stmt::DoWhile {
                body: Box::new(assign("y", int_ty(), lit("1"))),
                cond: local("x", int_ty()),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);
    let first_asn = ctx.quads.iter().position(|q| q.op == OpKind::Asn).unwrap();
    let cbr = ctx.quads.iter().position(|q| q.op == OpKind::CBr).unwrap();
    assert!(first_asn < cbr, "body must lower before the test");
}

#[test]
fn test_for_loop_with_break_and_continue() {
    // for (i = 0; i < 10; i = i + 1) { if (i == 5) continue; if (i == 8) break; }
    let init = ExecNode::binary(Token::Assign, local("i", int_ty()), lit("0"), loc());
    let cond = ExecNode::binary(Token::Lt, local("i", int_ty()), lit("10"), loc());
    let step = ExecNode::binary(
        Token::Assign,
        local("i", int_ty()),
        ExecNode::binary(Token::Plus, local("i", int_ty()), lit("1"), loc()),
        loc(),
    );
    let body = StmtNode::new(
        Stmt::Compound(CompoundStmt {
            locals: Vec::new(),
            body: vec![
                StmtNode::new(
                    Stmt::If {
                        cond: ExecNode::binary(Token::Eq, local("i", int_ty()), lit("5"), loc()),
                        then_stmt: Box::new(StmtNode::new(Stmt::Continue, loc())),
                        else_stmt: None,
                    },
                    loc(),
                ),
                StmtNode::new(
                    Stmt::If {
                        cond: ExecNode::binary(Token::Eq, local("i", int_ty()), lit("8"), loc()),
                        then_stmt: Box::new(StmtNode::new(Stmt::Break, loc())),
                        else_stmt: None,
                    },
                    loc(),
                ),
            ],
        }),
        loc(),
    );
    let mut f = void_fn(
        vec![("i", int_ty())],
        vec![StmtNode::new(
            Stmt::For {
                init: Some(init),
                cond: Some(cond),
                step: Some(step),
                body: Box::new(body),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);
    // lowering must terminate every block
    for (i, b) in ctx.cfg.nodes.iter().enumerate().skip(1) {
        let term = ctx.quads[b.last as usize].op;
        if i == ctx.cfg.nodes.len() - 1 {
            assert_eq!(term, OpKind::Ret);
        } else {
            assert!(
                matches!(term, OpKind::Jmp | OpKind::CBr),
                "block {} ends with {:?}",
                i,
                term
            );
        }
    }
}

// ====================
// switch
// ====================

#[test]
fn test_switch_dispatch_table() {
    // switch (x) { case 3: y = 1; break; case 1: y = 2; default: y = 3; }
    let case3 = StmtNode::new(
        Stmt::Case {
            value: lit("3"),
            body: Box::new(assign("y", int_ty(), lit("1"))),
        },
        loc(),
    );
    let brk = StmtNode::new(Stmt::Break, loc());
    let case1 = StmtNode::new(
        Stmt::Case {
            value: lit("1"),
            body: Box::new(assign("y", int_ty(), lit("2"))),
        },
        loc(),
    );
    let def = StmtNode::new(
        Stmt::Default {
            body: Box::new(assign("y", int_ty(), lit("3"))),
        },
        loc(),
    );
    let body = StmtNode::new(
        Stmt::Compound(CompoundStmt {
            locals: Vec::new(),
            body: vec![case3, brk, case1, def],
        }),
        loc(),
    );
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![StmtNode::new(
            Stmt::Switch {
                cond: local("x", int_ty()),
                body: Box::new(body),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);

    let sw_at = ctx
        .quads
        .iter()
        .position(|q| q.op == OpKind::Switch)
        .expect("no Switch emitted");
    let sw = &ctx.quads[sw_at];
    assert_eq!(ctx.addrs[sw.arg1 as usize].const_val(), Some(2));

    // the table entries follow the selector, sorted by case value
    let c1 = &ctx.quads[sw_at + 1];
    let c2 = &ctx.quads[sw_at + 2];
    assert_eq!(c1.op, OpKind::Case);
    assert_eq!(c2.op, OpKind::Case);
    assert_eq!(ctx.addrs[c1.tar as usize].const_val(), Some(1));
    assert_eq!(ctx.addrs[c2.tar as usize].const_val(), Some(3));

    // the dispatch block ends with a jump to the default label
    let jmp = &ctx.quads[sw_at + 3];
    assert_eq!(jmp.op, OpKind::Jmp);

    // dispatch block reaches all three labeled bodies
    let dispatch_block = ctx
        .cfg
        .nodes
        .iter()
        .position(|b| {
            (b.leader..=b.last).contains(&(sw_at as u32))
        })
        .unwrap();
    assert_eq!(ctx.cfg.nodes[dispatch_block].out_edges.len(), 3);
}

// ====================
// calls
// ====================

#[test]
fn test_call_pushes_arguments_right_to_left() {
    // g(a, b) with int g(int, int)
    let g_ty = Declaration::of(
        Arc::new(quadc::ast::DeclSpecs::plain(TypeSpec::Int)),
        vec![DerivedDecl::Function {
            params: Arc::new(vec![
                quadc::ast::ParamDecl {
                    name: Some(Arc::from("u")),
                    ty: int_ty(),
                },
                quadc::ast::ParamDecl {
                    name: Some(Arc::from("v")),
                    ty: int_ty(),
                },
            ]),
            variadic: false,
        }],
    );
    let call = ExecNode::call(
        ExecNode::id("g", g_ty, VarBinding::file_scope(), loc()),
        vec![local("a", int_ty()), local("b", int_ty())],
        loc(),
    );
    let mut f = void_fn(
        vec![("a", int_ty()), ("b", int_ty())],
        vec![expr_stmt(call)],
    );
    let ctx = lower(&mut f);

    let beg = ctx.quads.iter().position(|q| q.op == OpKind::BegArg).unwrap();
    let args: Vec<_> = ctx
        .quads
        .iter()
        .skip(beg)
        .filter(|q| q.op == OpKind::Arg)
        .collect();
    assert_eq!(args.len(), 2);
    // right to left: b first
    match &ctx.addrs[args[0].tar as usize] {
        Address::Id { name, .. } => assert_eq!(ctx.name(*name), "b:1"),
        other => panic!("expected b first, got {:?}", other),
    }
    match &ctx.addrs[args[1].tar as usize] {
        Address::Id { name, .. } => assert_eq!(ctx.name(*name), "a:1"),
        other => panic!("expected a second, got {:?}", other),
    }

    let call_q = ctx.quads.iter().find(|q| q.op == OpKind::Call).unwrap();
    assert_eq!(ctx.addrs[call_q.arg2 as usize].const_val(), Some(2));
    assert!(matches!(
        ctx.addrs[call_q.tar as usize],
        Address::Temp { .. }
    ));
}

#[test]
fn test_indirect_call_through_pointer() {
    // int (*fp)(void); fp();
    let fp_ty = Declaration::of(
        Arc::new(quadc::ast::DeclSpecs::plain(TypeSpec::Int)),
        vec![
            DerivedDecl::Pointer { qual: None },
            DerivedDecl::Function {
                params: Arc::new(Vec::new()),
                variadic: false,
            },
        ],
    );
    let call = ExecNode::call(local("fp", fp_ty.clone()), vec![], loc());
    let mut f = void_fn(vec![("fp", fp_ty)], vec![expr_stmt(call)]);
    let ctx = lower(&mut f);
    assert!(ctx.quads.iter().any(|q| q.op == OpKind::IndCall));
    assert!(!ctx.quads.iter().any(|q| q.op == OpKind::Call));
}

// ====================
// conversions
// ====================

#[test]
fn test_narrowing_assignment_inserts_conversion() {
    // char c; int i; c = i;
    let mut f = void_fn(
        vec![("c", Declaration::base(TypeSpec::Char)), ("i", int_ty())],
        vec![assign("c", Declaration::base(TypeSpec::Char), {
            local("i", int_ty())
        })],
    );
    let ctx = lower(&mut f);
    assert!(ctx.quads.iter().any(|q| q.op == OpKind::Ch));
}

#[test]
fn test_widening_to_long_long_extends() {
    // long long ll; int i; ll = i;  (sign extension)
    let mut f = void_fn(
        vec![
            ("ll", Declaration::base(TypeSpec::LongLong)),
            ("i", int_ty()),
        ],
        vec![assign(
            "ll",
            Declaration::base(TypeSpec::LongLong),
            local("i", int_ty()),
        )],
    );
    let ctx = lower(&mut f);
    assert!(ctx.quads.iter().any(|q| q.op == OpKind::LLSX));

    // unsigned sources zero-extend instead
    let mut f = void_fn(
        vec![
            ("ll", Declaration::base(TypeSpec::LongLong)),
            ("u", Declaration::base(TypeSpec::Unsigned)),
        ],
        vec![assign(
            "ll",
            Declaration::base(TypeSpec::LongLong),
            local("u", Declaration::base(TypeSpec::Unsigned)),
        )],
    );
    let ctx = lower(&mut f);
    assert!(ctx.quads.iter().any(|q| q.op == OpKind::LLZX));
}

#[test]
fn test_int_to_int_assignment_has_no_conversion() {
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![assign("x", int_ty(), local("y", int_ty()))],
    );
    let ctx = lower(&mut f);
    assert!(!ctx.quads.iter().any(|q| matches!(
        q.op,
        OpKind::Ch | OpKind::UCh | OpKind::Sh | OpKind::USh | OpKind::LLSX | OpKind::LLZX
    )));
}

// ====================
// stores through pointers
// ====================

#[test]
fn test_store_through_pointer_uses_ind_asn() {
    // int *p; *p = 3;
    let deref = ExecNode::unary(Token::Indirection, local("p", int_ty().pointer_to()), loc());
    let mut f = void_fn(
        vec![("p", int_ty().pointer_to())],
        vec![expr_stmt(ExecNode::binary(
            Token::Assign,
            deref,
            lit("3"),
            loc(),
        ))],
    );
    let ctx = lower(&mut f);
    let st = ctx.quads.iter().find(|q| q.op == OpKind::IndAsn).unwrap();
    match &ctx.addrs[st.tar as usize] {
        Address::Id { name, .. } => assert_eq!(ctx.name(*name), "p:1"),
        other => panic!("store target should be the pointer value, got {:?}", other),
    }
    assert_eq!(ctx.addrs[st.arg1 as usize].const_val(), Some(3));
}

#[test]
fn test_post_increment_preserves_old_value() {
    // int x; x++;
    let inc = ExecNode::unary(Token::PostInc, local("x", int_ty()), loc());
    let mut f = void_fn(vec![("x", int_ty())], vec![expr_stmt(inc)]);
    let ctx = lower(&mut f);
    // save old value, add, store back
    let seq: Vec<_> = ctx
        .quads
        .iter()
        .filter(|q| matches!(q.op, OpKind::Asn | OpKind::Add))
        .map(|q| q.op)
        .collect();
    assert_eq!(seq, vec![OpKind::Asn, OpKind::Add, OpKind::Asn]);
}

// ====================
// context lifecycle
// ====================

#[test]
fn test_temporaries_unique_within_function() {
    let sum = ExecNode::binary(
        Token::Plus,
        ExecNode::binary(Token::Mul, local("a", int_ty()), local("b", int_ty()), loc()),
        ExecNode::binary(Token::Mul, local("c", int_ty()), local("d", int_ty()), loc()),
        loc(),
    );
    let mut f = void_fn(
        vec![
            ("a", int_ty()),
            ("b", int_ty()),
            ("c", int_ty()),
            ("d", int_ty()),
        ],
        vec![expr_stmt(sum)],
    );
    let ctx = lower(&mut f);
    let mut names = temp_names(&ctx);
    let before = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), before);
}

#[test]
fn test_reset_restores_initial_state() {
    let mut f = void_fn(
        vec![("x", int_ty())],
        vec![assign("x", int_ty(), lit("1"))],
    );
    let mut ctx = {
        let syms = Symbols::new();
        let target = TargetConfig::new(TargetArch::X86);
        let mut diags = Diagnostics::new();
        Analyzer::new(&syms, &mut diags, target).analyze_function(&mut f);
        let mut ctx = IrContext::new();
        IrGenerator::new(&mut ctx, &syms, target)
            .generate(&mut f, &diags)
            .unwrap();
        ctx
    };
    assert!(!ctx.quads.is_empty());
    assert!(ctx.nid_count() > 0);

    ctx.reset();
    assert!(ctx.quads.is_empty());
    assert!(ctx.cfg.is_empty());
    assert_eq!(ctx.nid_count(), 0);
    // only the reserved empty operand and the true/false sentinels remain
    assert_eq!(ctx.addrs.len(), 3);
    assert!(matches!(ctx.addrs[0], Address::Empty));
    assert_eq!(ctx.addrs[ctx.true_addr() as usize].const_val(), Some(1));
    assert_eq!(ctx.addrs[ctx.false_addr() as usize].const_val(), Some(0));

    // temporaries restart at t1
    let t = ctx.new_temp();
    match &ctx.addrs[t as usize] {
        Address::Temp { name, .. } => assert_eq!(ctx.name(*name), "t1"),
        other => panic!("expected a temp, got {:?}", other),
    }
}

#[test]
fn test_generation_refuses_dirty_diagnostics() {
    let mut f = void_fn(vec![], vec![]);
    let syms = Symbols::new();
    let target = TargetConfig::default();
    let mut diags = Diagnostics::new();
    diags.error(&loc(), "expression is not assignable");
    let mut ctx = IrContext::new();
    let err = IrGenerator::new(&mut ctx, &syms, target)
        .generate(&mut f, &diags)
        .unwrap_err();
    assert!(matches!(
        err,
        quadc::Error::UnresolvedTypeErrors { count: 1 }
    ));
}

// ====================
// dumps
// ====================

#[test]
fn test_disassembly_and_json_dump() {
    let mut f = void_fn(
        vec![("x", int_ty()), ("y", int_ty())],
        vec![StmtNode::new(
            Stmt::If {
                cond: local("x", int_ty()),
                then_stmt: Box::new(assign("y", int_ty(), lit("1"))),
                else_stmt: Some(Box::new(assign("y", int_ty(), lit("2")))),
            },
            loc(),
        )],
    );
    let ctx = lower(&mut f);

    let text = disassemble(&ctx);
    assert!(text.contains("cbr x:1, L3, L4"), "got:\n{}", text);
    assert!(text.contains("y:1 = 1"));
    assert!(text.contains("jmp L"));

    let json = dump_json(&ctx);
    assert_eq!(
        json["quads"].as_array().unwrap().len(),
        ctx.quads.len()
    );
    assert_eq!(
        json["blocks"].as_array().unwrap().len(),
        ctx.cfg.block_count()
    );
    assert!(json["cfg_rpo"].as_array().is_some());
}
