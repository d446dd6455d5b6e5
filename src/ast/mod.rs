//! Abstract syntax tree consumed by the semantic core
//!
//! The lexer/parser collaborator produces these trees; the analyzer
//! decorates every expression node with its type, the constant folder
//! rewrites foldable nodes into integer constants, and the IR generator
//! walks the decorated result.
//!
//! The original declarator/specifier representation is a linked list of
//! token-tagged nodes with an attribute union; here it is the
//! `(DeclSpecs, Vec<DerivedDecl>)` pair, pattern-matched instead of
//! token-switched.

use std::sync::Arc;

// =============================================================================
// TOKENS
// =============================================================================

/// Closed enumeration of the terminal and operator tags the core works with
///
/// One namespace covers type keywords, qualifiers, declarator constructors
/// and expression operators: `Subscript` tags both the array declarator and
/// the `a[b]` operator, `Function` both the function declarator and the
/// call operator, exactly as the analyzer treats them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // type specifiers
    /// `char`
    Char,
    /// `signed char`
    SignedChar,
    /// `unsigned char`
    UnsignedChar,
    /// `short`
    Short,
    /// `unsigned short`
    UnsignedShort,
    /// `int`
    Int,
    /// `unsigned`
    Unsigned,
    /// `long`
    Long,
    /// `unsigned long`
    UnsignedLong,
    /// `long long`
    LongLong,
    /// `unsigned long long`
    UnsignedLongLong,
    /// `void`
    Void,
    /// `struct` tag
    Struct,
    /// `union` tag
    Union,
    /// `enum` tag
    Enum,
    /// Sentinel type of expressions that failed analysis
    Error,

    // type qualifiers
    /// `const`
    Const,
    /// `volatile`
    Volatile,
    /// both qualifiers combined
    ConstVolatile,

    // declarator constructors (also postfix operators)
    /// pointer declarator / also the category of pointer types
    Star,
    /// array declarator and the subscript operator
    Subscript,
    /// function declarator and the call operator
    Function,

    // postfix operators
    /// `.`
    Dot,
    /// `->`
    Arrow,
    /// postfix `++`
    PostInc,
    /// postfix `--`
    PostDec,

    // unary operators
    /// prefix `++`
    PreInc,
    /// prefix `--`
    PreDec,
    /// `&` address-of
    AddressOf,
    /// unary `*`
    Indirection,
    /// unary `+`
    UnaryPlus,
    /// unary `-`
    UnaryMinus,
    /// `~`
    Complement,
    /// `!`
    Negation,
    /// `sizeof`
    SizeOf,
    /// `__alignof__`
    AlignOf,
    /// `(type)expr`
    Cast,

    // binary operators
    /// binary `+`
    Plus,
    /// binary `-`
    Minus,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// bitwise `&`
    BitAnd,
    /// `^`
    BitXor,
    /// bitwise `|`
    BitOr,
    /// `&&`
    LogAnd,
    /// `||`
    LogOr,

    // ternary / assignment / comma
    /// `?:`
    Conditional,
    /// `=`
    Assign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    RemAssign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `<<=`
    LShiftAssign,
    /// `>>=`
    RShiftAssign,
    /// `&=`
    AndAssign,
    /// `^=`
    XorAssign,
    /// `|=`
    OrAssign,
    /// `,`
    Comma,
}

impl Token {
    /// Source spelling used in diagnostics
    pub fn lexeme(self) -> &'static str {
        match self {
            Token::Char => "char",
            Token::SignedChar => "signed char",
            Token::UnsignedChar => "unsigned char",
            Token::Short => "short",
            Token::UnsignedShort => "unsigned short",
            Token::Int => "int",
            Token::Unsigned => "unsigned int",
            Token::Long => "long",
            Token::UnsignedLong => "unsigned long",
            Token::LongLong => "long long",
            Token::UnsignedLongLong => "unsigned long long",
            Token::Void => "void",
            Token::Struct => "struct",
            Token::Union => "union",
            Token::Enum => "enum",
            Token::Error => "<error>",
            Token::Const => "const",
            Token::Volatile => "volatile",
            Token::ConstVolatile => "const volatile",
            Token::Star | Token::Mul => "*",
            Token::Subscript => "[]",
            Token::Function => "()",
            Token::Dot => ".",
            Token::Arrow => "->",
            Token::PostInc | Token::PreInc => "++",
            Token::PostDec | Token::PreDec => "--",
            Token::AddressOf | Token::BitAnd => "&",
            Token::Indirection => "*",
            Token::UnaryPlus | Token::Plus => "+",
            Token::UnaryMinus | Token::Minus => "-",
            Token::Complement => "~",
            Token::Negation => "!",
            Token::SizeOf => "sizeof",
            Token::AlignOf => "__alignof__",
            Token::Cast => "(cast)",
            Token::Div => "/",
            Token::Rem => "%",
            Token::LShift => "<<",
            Token::RShift => ">>",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::LessEq => "<=",
            Token::GreaterEq => ">=",
            Token::Eq => "==",
            Token::NotEq => "!=",
            Token::BitXor => "^",
            Token::BitOr => "|",
            Token::LogAnd => "&&",
            Token::LogOr => "||",
            Token::Conditional => "?:",
            Token::Assign => "=",
            Token::MulAssign => "*=",
            Token::DivAssign => "/=",
            Token::RemAssign => "%=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::LShiftAssign => "<<=",
            Token::RShiftAssign => ">>=",
            Token::AndAssign => "&=",
            Token::XorAssign => "^=",
            Token::OrAssign => "|=",
            Token::Comma => ",",
        }
    }
}

// =============================================================================
// SOURCE LOCATIONS
// =============================================================================

/// Source location for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcLoc {
    /// Source file name
    pub file: Arc<str>,
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub col: u32,
}

impl SrcLoc {
    /// Create a new source location
    pub fn new(file: impl Into<Arc<str>>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }
}

impl std::fmt::Display for SrcLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// =============================================================================
// TYPE EXPRESSIONS
// =============================================================================

/// Base type specifier of a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// `char` (signed on every supported target)
    Char,
    /// `signed char`
    SignedChar,
    /// `unsigned char`
    UnsignedChar,
    /// `short`
    Short,
    /// `unsigned short`
    UnsignedShort,
    /// `int`
    Int,
    /// `unsigned`
    Unsigned,
    /// `long`
    Long,
    /// `unsigned long`
    UnsignedLong,
    /// `long long`
    LongLong,
    /// `unsigned long long`
    UnsignedLongLong,
    /// `void`
    Void,
    /// `struct tag`
    Struct(Arc<str>),
    /// `union tag`
    Union(Arc<str>),
    /// `enum tag`
    Enum(Arc<str>),
    /// Sentinel for failed analysis; suppresses cascading diagnostics
    Error,
}

impl TypeSpec {
    /// Token tag of this specifier
    pub fn token(&self) -> Token {
        match self {
            TypeSpec::Char => Token::Char,
            TypeSpec::SignedChar => Token::SignedChar,
            TypeSpec::UnsignedChar => Token::UnsignedChar,
            TypeSpec::Short => Token::Short,
            TypeSpec::UnsignedShort => Token::UnsignedShort,
            TypeSpec::Int => Token::Int,
            TypeSpec::Unsigned => Token::Unsigned,
            TypeSpec::Long => Token::Long,
            TypeSpec::UnsignedLong => Token::UnsignedLong,
            TypeSpec::LongLong => Token::LongLong,
            TypeSpec::UnsignedLongLong => Token::UnsignedLongLong,
            TypeSpec::Void => Token::Void,
            TypeSpec::Struct(_) => Token::Struct,
            TypeSpec::Union(_) => Token::Union,
            TypeSpec::Enum(_) => Token::Enum,
            TypeSpec::Error => Token::Error,
        }
    }

    /// Tag name for struct/union/enum specifiers
    pub fn tag(&self) -> Option<&Arc<str>> {
        match self {
            TypeSpec::Struct(t) | TypeSpec::Union(t) | TypeSpec::Enum(t) => Some(t),
            _ => None,
        }
    }
}

/// `const` / `volatile` qualification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// `const`
    Const,
    /// `volatile`
    Volatile,
    /// both
    ConstVolatile,
}

impl Qualifier {
    /// Token tag of this qualifier
    pub fn token(self) -> Token {
        match self {
            Qualifier::Const => Token::Const,
            Qualifier::Volatile => Token::Volatile,
            Qualifier::ConstVolatile => Token::ConstVolatile,
        }
    }

    /// True if `const` is part of the qualification
    pub fn has_const(self) -> bool {
        matches!(self, Qualifier::Const | Qualifier::ConstVolatile)
    }

    /// Union of two qualifications
    pub fn combine(a: Qualifier, b: Qualifier) -> Qualifier {
        if a == b {
            a
        } else {
            Qualifier::ConstVolatile
        }
    }

    /// Union of two optional qualifications
    pub fn merge(a: Option<Qualifier>, b: Option<Qualifier>) -> Option<Qualifier> {
        match (a, b) {
            (Some(x), Some(y)) => Some(Qualifier::combine(x, y)),
            (Some(x), None) | (None, Some(x)) => Some(x),
            (None, None) => None,
        }
    }
}

/// Storage class specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// `typedef`
    Typedef,
    /// `extern`
    Extern,
    /// `static`
    Static,
    /// `auto`
    Auto,
    /// `register`
    Register,
}

/// Declaration specifiers: storage class, qualification, base specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclSpecs {
    /// Optional storage class
    pub storage: Option<StorageClass>,
    /// Optional qualification
    pub qual: Option<Qualifier>,
    /// Base type specifier
    pub spec: TypeSpec,
}

impl DeclSpecs {
    /// Unqualified, storage-less specifiers
    pub fn plain(spec: TypeSpec) -> Self {
        Self {
            storage: None,
            qual: None,
            spec,
        }
    }

    /// Qualified specifiers
    pub fn qualified(spec: TypeSpec, qual: Qualifier) -> Self {
        Self {
            storage: None,
            qual: Some(qual),
            spec,
        }
    }
}

/// One parameter in a function prototype
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name, if declared with one
    pub name: Option<Arc<str>>,
    /// Parameter type
    pub ty: Declaration,
}

/// One derived-declarator step, outermost first
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedDecl {
    /// Pointer to the rest of the chain, optionally qualified
    Pointer {
        /// Qualification of the pointer itself (`int *const p`)
        qual: Option<Qualifier>,
    },
    /// Array of the rest of the chain
    Array {
        /// Element count; `None` for an incomplete array type
        len: Option<u64>,
    },
    /// Function returning the rest of the chain
    Function {
        /// Prototype parameters (empty together with `variadic == false`
        /// means `(void)`)
        params: Arc<Vec<ParamDecl>>,
        /// Trailing `...`
        variadic: bool,
    },
}

/// A complete type: declaration specifiers plus the derived-declarator chain
///
/// For `const int *a[3]` the chain reads `[Array(3), Pointer]` over
/// `const int`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Specifier part, shared between declarations
    pub specs: Arc<DeclSpecs>,
    /// Derived declarators, outermost first
    pub derived: Vec<DerivedDecl>,
}

impl Declaration {
    /// A non-derived type from a bare specifier
    pub fn base(spec: TypeSpec) -> Self {
        Self {
            specs: Arc::new(DeclSpecs::plain(spec)),
            derived: Vec::new(),
        }
    }

    /// A type from shared specifiers and a declarator chain
    pub fn of(specs: Arc<DeclSpecs>, derived: Vec<DerivedDecl>) -> Self {
        Self { specs, derived }
    }

    /// The sentinel error type
    pub fn error() -> Self {
        Self::base(TypeSpec::Error)
    }

    /// Pointer to `self`
    pub fn pointer_to(&self) -> Self {
        let mut derived = Vec::with_capacity(self.derived.len() + 1);
        derived.push(DerivedDecl::Pointer { qual: None });
        derived.extend(self.derived.iter().cloned());
        Self {
            specs: Arc::clone(&self.specs),
            derived,
        }
    }

    /// Outermost type constructor as a token tag
    ///
    /// `Error` dominates; otherwise the first derived declarator; otherwise
    /// the base specifier.
    pub fn category(&self) -> Token {
        if self.specs.spec == TypeSpec::Error {
            return Token::Error;
        }
        match self.derived.first() {
            Some(DerivedDecl::Pointer { .. }) => Token::Star,
            Some(DerivedDecl::Array { .. }) => Token::Subscript,
            Some(DerivedDecl::Function { .. }) => Token::Function,
            None => self.specs.spec.token(),
        }
    }

    /// Strip the outermost derived declarator (pointee / element / return
    /// type)
    pub fn inner(&self) -> Self {
        Self {
            specs: Arc::clone(&self.specs),
            derived: self.derived[1..].to_vec(),
        }
    }

    /// Qualification of the outermost pointer declarator, if any
    pub fn ptr_qual(&self) -> Option<Qualifier> {
        match self.derived.first() {
            Some(DerivedDecl::Pointer { qual }) => *qual,
            _ => None,
        }
    }

    /// True for `void *` (qualified or not)
    pub fn is_void_ptr(&self) -> bool {
        self.category() == Token::Star
            && self.derived.len() == 1
            && self.specs.spec == TypeSpec::Void
    }

    /// True for function designators and pointers to function
    pub fn is_func_ptr(&self) -> bool {
        match self.derived.first() {
            Some(DerivedDecl::Function { .. }) => true,
            Some(DerivedDecl::Pointer { .. }) => {
                matches!(self.derived.get(1), Some(DerivedDecl::Function { .. }))
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for Declaration {
    /// Brief C-like rendering used in diagnostics
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(q) = self.specs.qual {
            write!(f, "{} ", q.token().lexeme())?;
        }
        match &self.specs.spec {
            TypeSpec::Struct(t) => write!(f, "struct {}", t)?,
            TypeSpec::Union(t) => write!(f, "union {}", t)?,
            TypeSpec::Enum(t) => write!(f, "enum {}", t)?,
            other => write!(f, "{}", other.token().lexeme())?,
        }
        // render the chain inside-out so `*[3]int` prints as `int *[3]`
        for d in self.derived.iter().rev() {
            match d {
                DerivedDecl::Pointer { qual: None } => write!(f, " *")?,
                DerivedDecl::Pointer { qual: Some(q) } => {
                    write!(f, " *{}", q.token().lexeme())?
                }
                DerivedDecl::Array { len: Some(n) } => write!(f, " [{}]", n)?,
                DerivedDecl::Array { len: None } => write!(f, " []")?,
                DerivedDecl::Function { .. } => write!(f, " ()")?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

/// Integer literal suffix length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeSuffix {
    /// no suffix
    #[default]
    None,
    /// `l`
    Long,
    /// `ll`
    LongLong,
}

/// Parsed suffix of an integer literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntSuffix {
    /// `u` present
    pub unsigned: bool,
    /// `l` / `ll` part
    pub size: SizeSuffix,
}

/// Integer literal payload
///
/// The lexer hands over the spelling and suffix; analysis picks the type
/// and caches the value. Constants synthesized by the folder carry an empty
/// lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct IntLit {
    /// Original spelling without the suffix (`"0x1F"`), empty if synthesized
    pub lexeme: Arc<str>,
    /// Suffix stripped off by the lexer
    pub suffix: IntSuffix,
    /// Value, valid after analysis or folding
    pub val: i64,
}

impl IntLit {
    /// Literal as spelled in the source
    pub fn spelled(lexeme: impl Into<Arc<str>>, suffix: IntSuffix) -> Self {
        Self {
            lexeme: lexeme.into(),
            suffix,
            val: 0,
        }
    }

    /// Constant synthesized by analysis or folding
    pub fn synthesized(val: i64) -> Self {
        Self {
            lexeme: Arc::from(""),
            suffix: IntSuffix::default(),
            val,
        }
    }
}

/// Storage duration of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDuration {
    /// File-scope objects and `static`/`extern` locals
    Static,
    /// Block-scope objects
    Automatic,
}

/// Linkage of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// External linkage
    External,
    /// Internal linkage (`static` at file scope)
    Internal,
    /// No linkage (locals, parameters)
    None,
}

/// Resolution of an identifier reference, filled in by the parser from the
/// symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarBinding {
    /// Storage duration
    pub duration: StorageDuration,
    /// Linkage
    pub linkage: Linkage,
    /// Scope nesting depth; file scope is 0
    pub scope: u32,
    /// True for function parameters
    pub is_param: bool,
}

impl VarBinding {
    /// Binding of a file-scope object with external linkage
    pub fn file_scope() -> Self {
        Self {
            duration: StorageDuration::Static,
            linkage: Linkage::External,
            scope: 0,
            is_param: false,
        }
    }

    /// Binding of a block-scope automatic object
    pub fn local(scope: u32) -> Self {
        Self {
            duration: StorageDuration::Automatic,
            linkage: Linkage::None,
            scope,
            is_param: false,
        }
    }

    /// Binding of a function parameter
    pub fn param() -> Self {
        Self {
            duration: StorageDuration::Automatic,
            linkage: Linkage::None,
            scope: 1,
            is_param: true,
        }
    }
}

/// Shape of an expression node
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Operator node; children carry the operands
    Op(Token),
    /// Integer constant
    IConst(IntLit),
    /// String literal
    StrLit(Arc<str>),
    /// Identifier reference
    Id(Arc<str>),
}

/// Expression node
///
/// Children by operator: `a[b]` = `[a, b]`; calls = `[callee, args...]`;
/// `.`/`->` = `[object, member-id]`; casts carry the target type in
/// `type_arg` and the operand as the only child; `sizeof`/`__alignof__`
/// carry either a child or a `type_arg`; `?:` = `[cond, then, else]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecNode {
    /// Node shape
    pub kind: ExprKind,
    /// Operand subtrees in source order
    pub children: Vec<ExecNode>,
    /// Inferred type; the analyzer sets it on every node it visits
    pub ty: Declaration,
    /// Source location
    pub loc: SrcLoc,
    /// Identifier resolution, present on `Id` nodes
    pub binding: Option<VarBinding>,
    /// Type operand of casts and `sizeof (type)` forms
    pub type_arg: Option<Declaration>,
    /// Result type of the implied binary operator of `op=` forms, stashed
    /// by the analyzer for the lowerer
    pub compound_ty: Option<Declaration>,
    /// Register-pressure annotation (Sethi-Ullman number)
    pub nreg: u32,
}

impl ExecNode {
    fn bare(kind: ExprKind, loc: SrcLoc) -> Self {
        Self {
            kind,
            children: Vec::new(),
            ty: Declaration::error(),
            loc,
            binding: None,
            type_arg: None,
            compound_ty: None,
            nreg: 0,
        }
    }

    /// Integer-constant leaf as spelled in the source
    pub fn iconst(lexeme: impl Into<Arc<str>>, suffix: IntSuffix, loc: SrcLoc) -> Self {
        Self::bare(ExprKind::IConst(IntLit::spelled(lexeme, suffix)), loc)
    }

    /// String-literal leaf
    pub fn strlit(s: impl Into<Arc<str>>, loc: SrcLoc) -> Self {
        Self::bare(ExprKind::StrLit(s.into()), loc)
    }

    /// Identifier reference with its declared type and binding
    pub fn id(
        name: impl Into<Arc<str>>,
        ty: Declaration,
        binding: VarBinding,
        loc: SrcLoc,
    ) -> Self {
        let mut e = Self::bare(ExprKind::Id(name.into()), loc);
        e.ty = ty;
        e.binding = Some(binding);
        e
    }

    /// Unary operator node
    pub fn unary(op: Token, operand: ExecNode, loc: SrcLoc) -> Self {
        let mut e = Self::bare(ExprKind::Op(op), loc);
        e.children.push(operand);
        e
    }

    /// Binary operator node
    pub fn binary(op: Token, lhs: ExecNode, rhs: ExecNode, loc: SrcLoc) -> Self {
        let mut e = Self::bare(ExprKind::Op(op), loc);
        e.children.push(lhs);
        e.children.push(rhs);
        e
    }

    /// Conditional operator node
    pub fn conditional(cond: ExecNode, then: ExecNode, els: ExecNode, loc: SrcLoc) -> Self {
        let mut e = Self::bare(ExprKind::Op(Token::Conditional), loc);
        e.children.push(cond);
        e.children.push(then);
        e.children.push(els);
        e
    }

    /// Cast node
    pub fn cast(target: Declaration, operand: ExecNode, loc: SrcLoc) -> Self {
        let mut e = Self::bare(ExprKind::Op(Token::Cast), loc);
        e.children.push(operand);
        e.type_arg = Some(target);
        e
    }

    /// `sizeof (type)` / `__alignof__ (type)` node
    pub fn sizeof_type(op: Token, target: Declaration, loc: SrcLoc) -> Self {
        let mut e = Self::bare(ExprKind::Op(op), loc);
        e.type_arg = Some(target);
        e
    }

    /// Call node; `children[0]` is the callee
    pub fn call(callee: ExecNode, args: Vec<ExecNode>, loc: SrcLoc) -> Self {
        let mut e = Self::bare(ExprKind::Op(Token::Function), loc);
        e.children.push(callee);
        e.children.extend(args);
        e
    }

    /// Member access node (`.` or `->`)
    pub fn member(op: Token, object: ExecNode, member: impl Into<Arc<str>>, loc: SrcLoc) -> Self {
        let member_id = Self::bare(ExprKind::Id(member.into()), loc.clone());
        let mut e = Self::bare(ExprKind::Op(op), loc);
        e.children.push(object);
        e.children.push(member_id);
        e
    }

    /// True for folded/spelled integer constants
    pub fn is_iconst(&self) -> bool {
        matches!(self.kind, ExprKind::IConst(_))
    }

    /// Cached value of an integer-constant node
    pub fn const_val(&self) -> Option<i64> {
        match &self.kind {
            ExprKind::IConst(lit) => Some(lit.val),
            _ => None,
        }
    }

    /// Identifier spelling of `Id` nodes
    pub fn ident(&self) -> Option<&Arc<str>> {
        match &self.kind {
            ExprKind::Id(name) => Some(name),
            _ => None,
        }
    }

    /// True for `(void *)0` — a cast of the literal zero
    pub fn is_cast_of_zero(&self) -> bool {
        matches!(&self.kind, ExprKind::Op(Token::Cast))
            && self
                .children
                .first()
                .and_then(ExecNode::const_val)
                .map(|v| v == 0)
                .unwrap_or(false)
    }

    /// True for the null pointer constant in its literal form
    pub fn is_literal_zero(&self) -> bool {
        self.const_val() == Some(0)
    }
}

// =============================================================================
// STATEMENTS
// =============================================================================

/// One declarator of a local declaration line
#[derive(Debug, Clone, PartialEq)]
pub struct NamedDecl {
    /// Declared name
    pub name: Arc<str>,
    /// Derived declarator chain of this name
    pub derived: Vec<DerivedDecl>,
    /// Initializer expression, if present
    pub init: Option<ExecNode>,
}

/// One local declaration line: shared specifiers, several declarators
#[derive(Debug, Clone, PartialEq)]
pub struct DeclGroup {
    /// Declaration specifiers shared by the group
    pub specs: Arc<DeclSpecs>,
    /// Declared names
    pub declarators: Vec<NamedDecl>,
}

/// Compound statement: local declarations then statements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundStmt {
    /// Block-scope declarations
    pub locals: Vec<DeclGroup>,
    /// Statement list
    pub body: Vec<StmtNode>,
}

/// Statement node with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct StmtNode {
    /// Statement shape
    pub kind: Stmt,
    /// Source location
    pub loc: SrcLoc,
}

impl StmtNode {
    /// Wrap a statement with a location
    pub fn new(kind: Stmt, loc: SrcLoc) -> Self {
        Self { kind, loc }
    }
}

/// Statement shapes the lowerer understands
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `{ decls; stmts }`
    Compound(CompoundStmt),
    /// Expression statement; `None` for the empty statement `;`
    Expr(Option<ExecNode>),
    /// `if (cond) then else`
    If {
        /// Controlling expression
        cond: ExecNode,
        /// Then branch
        then_stmt: Box<StmtNode>,
        /// Optional else branch
        else_stmt: Option<Box<StmtNode>>,
    },
    /// `while (cond) body`
    While {
        /// Controlling expression
        cond: ExecNode,
        /// Loop body
        body: Box<StmtNode>,
    },
    /// `do body while (cond);`
    DoWhile {
        /// Loop body
        body: Box<StmtNode>,
        /// Controlling expression
        cond: ExecNode,
    },
    /// `for (init; cond; step) body`
    For {
        /// Initialization expression
        init: Option<ExecNode>,
        /// Controlling expression
        cond: Option<ExecNode>,
        /// Step expression
        step: Option<ExecNode>,
        /// Loop body
        body: Box<StmtNode>,
    },
    /// `switch (cond) body`
    Switch {
        /// Controlling expression
        cond: ExecNode,
        /// Switch body
        body: Box<StmtNode>,
    },
    /// `case value: body`
    Case {
        /// Case label value (integer constant expression)
        value: ExecNode,
        /// Labeled statement
        body: Box<StmtNode>,
    },
    /// `default: body`
    Default {
        /// Labeled statement
        body: Box<StmtNode>,
    },
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `return expr;`
    Return(Option<ExecNode>),
    /// `goto label;`
    Goto(Arc<str>),
    /// `label: body`
    Labeled {
        /// Label name
        label: Arc<str>,
        /// Labeled statement
        body: Box<StmtNode>,
    },
}

/// A function definition as handed over by the parser
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Function name
    pub name: Arc<str>,
    /// Return-type specifiers
    pub specs: Arc<DeclSpecs>,
    /// Declarator chain of the function; `derived[0]` is the
    /// [`DerivedDecl::Function`] carrying the parameters
    pub derived: Vec<DerivedDecl>,
    /// Function body (a compound statement)
    pub body: StmtNode,
    /// Definition location
    pub loc: SrcLoc,
}

impl FunctionDef {
    /// The function's prototype parameters
    pub fn params(&self) -> (&[ParamDecl], bool) {
        match self.derived.first() {
            Some(DerivedDecl::Function { params, variadic }) => (params, *variadic),
            _ => (&[], false),
        }
    }

    /// The function's return type
    pub fn return_type(&self) -> Declaration {
        Declaration::of(Arc::clone(&self.specs), self.derived[1..].to_vec())
    }
}
