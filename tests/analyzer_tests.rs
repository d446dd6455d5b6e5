//! Tests for expression type analysis and assignment compatibility

use quadc::ast::{
    DeclSpecs, Declaration, DerivedDecl, ExecNode, IntSuffix, ParamDecl, Qualifier, SrcLoc,
    Token, TypeSpec, VarBinding,
};
use quadc::{Analyzer, Diagnostics, Symbols, TargetArch, TargetConfig};
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

fn analyze_with(target: TargetConfig, e: &mut ExecNode) -> Diagnostics {
    let syms = Symbols::new();
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(e);
    diags
}

fn analyze(e: &mut ExecNode) -> Diagnostics {
    analyze_with(TargetConfig::new(TargetArch::X86), e)
}

fn warnings(diags: &Diagnostics) -> Vec<String> {
    diags
        .iter()
        .filter(|d| d.severity == quadc::Severity::Warning)
        .map(|d| d.message.clone())
        .collect()
}

// ====================
// usual arithmetic conversions
// ====================

#[test]
fn test_int_plus_unsigned_is_unsigned() {
    // int a; unsigned b; a + b
    let mut e = ExecNode::binary(
        Token::Plus,
        local("a", int_ty()),
        local("b", Declaration::base(TypeSpec::Unsigned)),
        loc(),
    );
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Unsigned);
    assert!(diags.is_clean());
    assert_eq!(diags.warning_count(), 0);
}

#[test]
fn test_shift_keeps_promoted_left_type() {
    // unsigned long ul; ul << 3 keeps unsigned long; c << 1 promotes to int
    let mut e = ExecNode::binary(
        Token::LShift,
        local("ul", Declaration::base(TypeSpec::UnsignedLong)),
        lit("3"),
        loc(),
    );
    analyze(&mut e);
    assert_eq!(e.ty.category(), Token::UnsignedLong);

    let mut e = ExecNode::binary(
        Token::LShift,
        local("c", Declaration::base(TypeSpec::Char)),
        lit("1"),
        loc(),
    );
    analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Int);
}

#[test]
fn test_pointer_difference_is_long() {
    let p = local("p", int_ty().pointer_to());
    let q = local("q", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::Minus, p, q, loc());
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Long);
}

#[test]
fn test_pointer_plus_pointer_rejected() {
    let p = local("p", int_ty().pointer_to());
    let q = local("q", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::Plus, p, q, loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert_eq!(diags.error_count(), 1);
}

// ====================
// assignment compatibility
// ====================

#[test]
fn test_assignment_discards_const_warns() {
    // const char *p; char *q; q = p;
    let char_specs = Arc::new(DeclSpecs::qualified(TypeSpec::Char, Qualifier::Const));
    let p_ty = Declaration::of(char_specs, vec![DerivedDecl::Pointer { qual: None }]);
    let q_ty = Declaration::base(TypeSpec::Char).pointer_to();

    let mut e = ExecNode::binary(Token::Assign, local("q", q_ty), local("p", p_ty), loc());
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    let w = warnings(&diags);
    assert_eq!(w.len(), 1);
    assert!(w[0].contains("discards `const'"), "got: {}", w[0]);
}

#[test]
fn test_int_max_literal_fits_silently() {
    let mut e = ExecNode::binary(
        Token::Assign,
        local("x", int_ty()),
        lit("0x7FFFFFFF"),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(diags.warning_count(), 0);
}

#[test]
fn test_overflowing_literal_warns_with_truncated_value() {
    // 0x80000000 has type unsigned; stored into int it changes value
    let mut e = ExecNode::binary(
        Token::Assign,
        local("x", int_ty()),
        lit("0x80000000"),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    let w = warnings(&diags);
    assert_eq!(w.len(), 1);
    assert!(
        w[0].contains("changes value from 2147483648 to -2147483648"),
        "got: {}",
        w[0]
    );
}

#[test]
fn test_char_init_from_300_warns_44() {
    let mut e = ExecNode::binary(
        Token::Assign,
        local("c", Declaration::base(TypeSpec::Char)),
        lit("300"),
        loc(),
    );
    let diags = analyze(&mut e);
    let w = warnings(&diags);
    assert_eq!(w.len(), 1);
    assert!(w[0].contains("changes value from 300 to 44"), "got: {}", w[0]);
}

#[test]
fn test_int_cast_into_long_long_no_warning_on_ilp32() {
    // long long l = (int)-1; int and long long differ in rank but the
    // value direction is widening
    let minus_one = ExecNode::unary(Token::UnaryMinus, lit("1"), loc());
    let cast = ExecNode::cast(int_ty(), minus_one, loc());
    let mut e = ExecNode::binary(
        Token::Assign,
        local("l", Declaration::base(TypeSpec::LongLong)),
        cast,
        loc(),
    );
    let diags = analyze_with(TargetConfig::new(TargetArch::X86), &mut e);
    assert!(diags.is_clean());
    assert_eq!(diags.warning_count(), 0);
}

#[test]
fn test_precision_loss_and_signedness_warnings() {
    // short s; long long ll; s = ll  loses precision
    let mut e = ExecNode::binary(
        Token::Assign,
        local("s", Declaration::base(TypeSpec::Short)),
        local("ll", Declaration::base(TypeSpec::LongLong)),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(warnings(&diags)[0].contains("loses integer precision"));

    // unsigned u; int i; u = i  changes signedness
    let mut e = ExecNode::binary(
        Token::Assign,
        local("u", Declaration::base(TypeSpec::Unsigned)),
        local("i", int_ty()),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(warnings(&diags)[0].contains("changes signedness"));
}

#[test]
fn test_void_pointer_zero_into_function_pointer_is_silent() {
    // int (*fp)(int); fp = (void *)0;
    let fp_ty = Declaration::of(
        Arc::new(DeclSpecs::plain(TypeSpec::Int)),
        vec![
            DerivedDecl::Pointer { qual: None },
            DerivedDecl::Function {
                params: Arc::new(vec![ParamDecl {
                    name: None,
                    ty: int_ty(),
                }]),
                variadic: false,
            },
        ],
    );
    let zero_cast = ExecNode::cast(
        Declaration::base(TypeSpec::Void).pointer_to(),
        lit("0"),
        loc(),
    );
    let mut e = ExecNode::binary(Token::Assign, local("fp", fp_ty), zero_cast, loc());
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(diags.warning_count(), 0);
}

#[test]
fn test_literal_zero_into_pointer_is_silent_other_ints_warn() {
    let p_ty = int_ty().pointer_to();
    let mut e = ExecNode::binary(Token::Assign, local("p", p_ty.clone()), lit("0"), loc());
    let diags = analyze(&mut e);
    assert_eq!(diags.warning_count(), 0);

    let mut e = ExecNode::binary(Token::Assign, local("p", p_ty), lit("5"), loc());
    let diags = analyze(&mut e);
    assert!(warnings(&diags)[0].contains("integer to pointer conversion"));
}

#[test]
fn test_assignment_to_non_lvalue_rejected() {
    let mut e = ExecNode::binary(Token::Assign, lit("3"), lit("4"), loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert_eq!(diags.error_count(), 1);
    assert!(diags.iter().next().unwrap().message.contains("not assignable"));
}

#[test]
fn test_const_qualified_lvalue_not_assignable() {
    let c_ty = Declaration::of(
        Arc::new(DeclSpecs::qualified(TypeSpec::Int, Qualifier::Const)),
        Vec::new(),
    );
    let mut e = ExecNode::binary(Token::Assign, local("c", c_ty), lit("1"), loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert_eq!(diags.error_count(), 1);
}

// ====================
// error-cascade suppression
// ====================

#[test]
fn test_single_diagnostic_for_nested_error() {
    // &0 + 1 : only the invalid & is diagnosed; + inherits silently
    let addr = ExecNode::unary(Token::AddressOf, lit("0"), loc());
    let mut e = ExecNode::binary(Token::Plus, addr, lit("1"), loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert_eq!(diags.error_count(), 1);
    assert!(diags.iter().next().unwrap().message.contains("invalid operand to &"));
}

// ====================
// sizeof / literals
// ====================

#[test]
fn test_sizeof_becomes_unsigned_long_constant() {
    // sizeof(int[3]) + 2 analyzes (and folds) to 14
    let arr_ty = Declaration::of(
        Arc::new(DeclSpecs::plain(TypeSpec::Int)),
        vec![DerivedDecl::Array { len: Some(3) }],
    );
    let szof = ExecNode::sizeof_type(Token::SizeOf, arr_ty, loc());
    let mut e = ExecNode::binary(Token::Plus, szof, lit("2"), loc());
    let syms = Symbols::new();
    let mut diags = Diagnostics::new();
    let target = TargetConfig::new(TargetArch::X86);
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::UnsignedLong);

    let folder = quadc::ConstFolder::new(&syms, target);
    assert_eq!(folder.eval(&mut e, false, true).unwrap(), 14);
    assert!(e.is_iconst());
    assert_eq!(e.ty.category(), Token::UnsignedLong);
}

#[test]
fn test_decimal_literal_type_progression() {
    let mut e = lit("2147483647");
    analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Int);

    let mut e = lit("2147483648");
    analyze(&mut e);
    // decimal constants skip the unsigned types
    assert_eq!(e.ty.category(), Token::LongLong);

    let mut e = lit("2147483648");
    let diags = analyze_with(TargetConfig::new(TargetArch::X64), &mut e);
    assert_eq!(e.ty.category(), Token::Long);
    assert!(diags.is_clean());
}

#[test]
fn test_unsigned_suffix_literal() {
    let mut e = ExecNode::iconst(
        "42",
        IntSuffix {
            unsigned: true,
            size: quadc::ast::SizeSuffix::None,
        },
        loc(),
    );
    analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Unsigned);
    assert_eq!(e.const_val(), Some(42));
}

#[test]
fn test_huge_literal_warns() {
    let mut e = lit("99999999999999999999999999");
    let diags = analyze(&mut e);
    assert_eq!(diags.warning_count(), 1);
    assert!(warnings(&diags)[0].contains("too large"));
}

// ====================
// string literals, subscripts, calls
// ====================

#[test]
fn test_string_literal_is_char_array() {
    let mut e = ExecNode::strlit("hello", loc());
    analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Subscript);
    assert_eq!(
        e.ty.derived.first(),
        Some(&DerivedDecl::Array { len: Some(6) })
    );
    assert_eq!(e.ty.specs.spec, TypeSpec::Char);
}

#[test]
fn test_subscript_types_as_element() {
    // int *p; p[4] has type int, 4[p] as well
    let p = local("p", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::Subscript, p, lit("4"), loc());
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Int);

    let p = local("p", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::Subscript, lit("4"), p, loc());
    assert!(analyze(&mut e).is_clean());
    assert_eq!(e.ty.category(), Token::Int);
}

#[test]
fn test_subscript_of_function_pointer_rejected() {
    let fp_ty = Declaration::of(
        Arc::new(DeclSpecs::plain(TypeSpec::Int)),
        vec![
            DerivedDecl::Pointer { qual: None },
            DerivedDecl::Function {
                params: Arc::new(Vec::new()),
                variadic: false,
            },
        ],
    );
    let mut e = ExecNode::binary(Token::Subscript, local("fp", fp_ty), lit("0"), loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert!(diags
        .iter()
        .next()
        .unwrap()
        .message
        .contains("subscripting pointer to function"));
}

fn func_ty(params: Vec<Declaration>, variadic: bool, ret: TypeSpec) -> Declaration {
    Declaration::of(
        Arc::new(DeclSpecs::plain(ret)),
        vec![DerivedDecl::Function {
            params: Arc::new(
                params
                    .into_iter()
                    .map(|ty| ParamDecl { name: None, ty })
                    .collect(),
            ),
            variadic,
        }],
    )
}

#[test]
fn test_call_argument_count_checked() {
    let f = ExecNode::id(
        "f",
        func_ty(vec![int_ty()], false, TypeSpec::Int),
        VarBinding::file_scope(),
        loc(),
    );
    let mut e = ExecNode::call(f, vec![lit("1"), lit("2")], loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert!(diags
        .iter()
        .any(|d| d.message.contains("parameter/argument number mismatch")));
}

#[test]
fn test_variadic_call_allows_extra_arguments() {
    let f = ExecNode::id(
        "printf",
        func_ty(
            vec![Declaration::base(TypeSpec::Char).pointer_to()],
            true,
            TypeSpec::Int,
        ),
        VarBinding::file_scope(),
        loc(),
    );
    let fmt = ExecNode::strlit("%d", loc());
    let mut e = ExecNode::call(f, vec![fmt, lit("1"), lit("2")], loc());
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Int);
}

#[test]
fn test_calling_non_function_rejected() {
    let mut e = ExecNode::call(local("x", int_ty()), vec![], loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert!(diags
        .iter()
        .next()
        .unwrap()
        .message
        .contains("called object is not a function"));
}

// ====================
// members and qualifiers
// ====================

fn point_symbols() -> (Symbols, TargetConfig) {
    let target = TargetConfig::new(TargetArch::X86);
    let mut syms = Symbols::new();
    syms.define_tag(
        "point",
        quadc::TagKind::Struct,
        vec![
            quadc::sym::MemberDef {
                name: Arc::from("x"),
                ty: int_ty(),
            },
            quadc::sym::MemberDef {
                name: Arc::from("y"),
                ty: int_ty(),
            },
        ],
        &target,
    );
    (syms, target)
}

#[test]
fn test_member_access_and_unknown_member() {
    let (syms, target) = point_symbols();
    let pt_ty = Declaration::base(TypeSpec::Struct(Arc::from("point")));

    let mut e = ExecNode::member(Token::Dot, local("pt", pt_ty.clone()), "x", loc());
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Int);

    let mut e = ExecNode::member(Token::Dot, local("pt", pt_ty), "z", loc());
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert!(diags
        .iter()
        .next()
        .unwrap()
        .message
        .contains("has no member named `z'"));
}

#[test]
fn test_qualified_object_qualifies_member() {
    // const struct point pt; pt.x is const int
    let (syms, target) = point_symbols();
    let const_pt = Declaration::of(
        Arc::new(DeclSpecs::qualified(
            TypeSpec::Struct(Arc::from("point")),
            Qualifier::Const,
        )),
        Vec::new(),
    );
    let mut e = ExecNode::member(Token::Dot, local("pt", const_pt), "x", loc());
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.specs.qual, Some(Qualifier::Const));

    // and assigning to it is rejected
    let mut asn = ExecNode::binary(Token::Assign, e, lit("1"), loc());
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(&mut asn);
    assert_eq!(asn.ty.category(), Token::Error);
}

#[test]
fn test_arrow_requires_pointer() {
    let (syms, target) = point_symbols();
    let pt_ty = Declaration::base(TypeSpec::Struct(Arc::from("point")));
    let mut e = ExecNode::member(Token::Arrow, local("pt", pt_ty.clone()), "x", loc());
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);

    let mut e = ExecNode::member(Token::Arrow, local("p", pt_ty.pointer_to()), "y", loc());
    let mut diags = Diagnostics::new();
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Int);
}

// ====================
// conditional operator
// ====================

#[test]
fn test_conditional_arithmetic_common_type() {
    let mut e = ExecNode::conditional(
        local("c", int_ty()),
        local("a", int_ty()),
        local("b", Declaration::base(TypeSpec::UnsignedLong)),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::UnsignedLong);
}

#[test]
fn test_conditional_qualifier_union_goes_const_volatile() {
    // c ? (const int *)p : (volatile int *)q  has type const volatile int *
    let const_int_p = Declaration::of(
        Arc::new(DeclSpecs::qualified(TypeSpec::Int, Qualifier::Const)),
        vec![DerivedDecl::Pointer { qual: None }],
    );
    let volatile_int_p = Declaration::of(
        Arc::new(DeclSpecs::qualified(TypeSpec::Int, Qualifier::Volatile)),
        vec![DerivedDecl::Pointer { qual: None }],
    );
    let mut e = ExecNode::conditional(
        local("c", int_ty()),
        local("p", const_int_p),
        local("q", volatile_int_p),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Star);
    assert_eq!(e.ty.specs.qual, Some(Qualifier::ConstVolatile));
}

#[test]
fn test_conditional_struct_tags_must_match() {
    let a = Declaration::base(TypeSpec::Struct(Arc::from("a")));
    let b = Declaration::base(TypeSpec::Struct(Arc::from("b")));
    let mut e = ExecNode::conditional(local("c", int_ty()), local("x", a), local("y", b), loc());
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert!(diags
        .iter()
        .next()
        .unwrap()
        .message
        .contains("type mismatch in conditional expression"));
}

// ====================
// compound assignment
// ====================

#[test]
fn test_compound_assignment_stashes_result_type() {
    // char c; c += 1  computes at int, assigns back to char
    let mut e = ExecNode::binary(
        Token::PlusAssign,
        local("c", Declaration::base(TypeSpec::Char)),
        lit("1"),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(e.ty.category(), Token::Char);
    assert_eq!(
        e.compound_ty.as_ref().map(|t| t.category()),
        Some(Token::Int)
    );
}

#[test]
fn test_pointer_plus_assign() {
    let mut e = ExecNode::binary(
        Token::PlusAssign,
        local("p", int_ty().pointer_to()),
        lit("2"),
        loc(),
    );
    let diags = analyze(&mut e);
    assert!(diags.is_clean());
    assert_eq!(
        e.compound_ty.as_ref().map(|t| t.category()),
        Some(Token::Star)
    );
}

#[test]
fn test_remainder_requires_integers() {
    let mut e = ExecNode::binary(
        Token::RemAssign,
        local("p", int_ty().pointer_to()),
        lit("2"),
        loc(),
    );
    let diags = analyze(&mut e);
    assert_eq!(e.ty.category(), Token::Error);
    assert_eq!(diags.error_count(), 1);
}

// ====================
// enum constants
// ====================

#[test]
fn test_enum_constant_rewrites_to_literal() {
    let mut syms = Symbols::new();
    syms.define_enum_constant("RED", 2);
    let mut diags = Diagnostics::new();
    let target = TargetConfig::default();
    let mut e = ExecNode::id("RED", int_ty(), VarBinding::file_scope(), loc());
    Analyzer::new(&syms, &mut diags, target).analyze(&mut e);
    assert!(e.is_iconst());
    assert_eq!(e.const_val(), Some(2));
    assert_eq!(e.ty.category(), Token::Int);
}

// ====================
// logical / relational
// ====================

#[test]
fn test_logical_and_relational_yield_int() {
    let p = local("p", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::LogAnd, p, local("x", int_ty()), loc());
    assert!(analyze(&mut e).is_clean());
    assert_eq!(e.ty.category(), Token::Int);

    let mut e = ExecNode::binary(
        Token::Lt,
        local("a", int_ty()),
        local("b", Declaration::base(TypeSpec::UnsignedLong)),
        loc(),
    );
    assert!(analyze(&mut e).is_clean());
    assert_eq!(e.ty.category(), Token::Int);
}

#[test]
fn test_pointer_integer_comparison_warns_except_null_eq() {
    let p = local("p", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::Eq, p, lit("0"), loc());
    let diags = analyze(&mut e);
    assert_eq!(diags.warning_count(), 0);

    let p = local("p", int_ty().pointer_to());
    let mut e = ExecNode::binary(Token::Lt, p, lit("0"), loc());
    let diags = analyze(&mut e);
    assert!(warnings(&diags)[0].contains("comparison between pointer and integer"));
}
