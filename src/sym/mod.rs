//! Symbol-table and location collaborators
//!
//! The core consumes these through narrow interfaces: tag definitions and
//! struct layouts for member resolution and `sizeof`, enum constants for
//! identifier rewriting, external-id knowledge for address constants, and
//! a scoped name-to-stack-offset map for the IR generator. [`Symbols`] is
//! the in-memory implementation the driver (and the test suites) populate.

use crate::ast::{Declaration, Token};
use crate::target::TargetConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Kind of a tagged type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `struct`
    Struct,
    /// `union`
    Union,
    /// `enum`
    Enum,
}

impl TagKind {
    /// Token tag of this kind
    pub fn token(self) -> Token {
        match self {
            TagKind::Struct => Token::Struct,
            TagKind::Union => Token::Union,
            TagKind::Enum => Token::Enum,
        }
    }
}

/// One member of a struct or union definition
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDef {
    /// Member name
    pub name: Arc<str>,
    /// Member type
    pub ty: Declaration,
}

/// A tag definition
#[derive(Debug, Clone, PartialEq)]
pub struct TagDef {
    /// struct / union / enum
    pub kind: TagKind,
    /// Members in declaration order (empty for enums and incomplete tags)
    pub members: Vec<MemberDef>,
    /// False while only a forward declaration has been seen
    pub complete: bool,
}

/// Layout of one struct/union member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    /// Member name
    pub name: Arc<str>,
    /// Byte offset from the start of the object (0 for union members)
    pub offset: u32,
    /// Member size in bytes
    pub size: u32,
}

/// Size, alignment, and member layout of a struct or union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    /// Total size including padding
    pub size: u32,
    /// Alignment requirement
    pub alignment: u32,
    /// Per-member layout
    pub members: Vec<StructMember>,
}

/// What the semantic core asks of the symbol table
pub trait SymbolTable {
    /// Definition of a tagged type, if declared
    fn lookup_tag(&self, name: &str) -> Option<&TagDef>;

    /// Computed layout of a struct or union tag
    fn struct_descriptor(&self, name: &str) -> Option<&StructDescriptor>;

    /// Value of an enumeration constant, if `name` names one
    fn enum_constant(&self, name: &str) -> Option<i64>;

    /// True if `name` is declared at file scope
    fn is_external_id(&self, name: &str) -> bool;

    /// True once the tag has a completing definition
    fn is_complete(&self, name: &str) -> bool {
        self.lookup_tag(name).map(|t| t.complete).unwrap_or(false)
    }

    /// Offset and size of one member of a tagged type
    fn member_descriptor(&self, tag: &str, member: &str) -> Option<StructMember> {
        self.struct_descriptor(tag)
            .and_then(|d| d.members.iter().find(|m| &*m.name == member).cloned())
    }
}

/// In-memory symbol table
#[derive(Debug, Default)]
pub struct Symbols {
    tags: HashMap<Arc<str>, TagDef>,
    descriptors: HashMap<Arc<str>, StructDescriptor>,
    enum_constants: HashMap<Arc<str>, i64>,
    external_ids: HashMap<Arc<str>, ()>,
}

impl Symbols {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a forward declaration of a tag
    pub fn declare_tag(&mut self, name: impl Into<Arc<str>>, kind: TagKind) {
        self.tags.entry(name.into()).or_insert(TagDef {
            kind,
            members: Vec::new(),
            complete: false,
        });
    }

    /// Define a struct or union tag and compute its layout
    ///
    /// Struct members are laid out sequentially with alignment padding;
    /// union members all sit at offset 0 and the size is the widest member
    /// rounded up to the union's alignment.
    pub fn define_tag(
        &mut self,
        name: impl Into<Arc<str>>,
        kind: TagKind,
        members: Vec<MemberDef>,
        target: &TargetConfig,
    ) {
        let name = name.into();
        let descriptor = self.compute_layout(kind, &members, target);
        self.descriptors.insert(Arc::clone(&name), descriptor);
        self.tags.insert(
            name,
            TagDef {
                kind,
                members,
                complete: true,
            },
        );
    }

    fn compute_layout(
        &self,
        kind: TagKind,
        members: &[MemberDef],
        target: &TargetConfig,
    ) -> StructDescriptor {
        let mut laid_out = Vec::with_capacity(members.len());
        let mut alignment = 1u32;
        let mut offset = 0u32;
        let mut widest = 0u32;
        for m in members {
            let m_align = crate::types::layout::alignment_of(&m.ty, self, target);
            let m_size = crate::types::layout::size_of(&m.ty, self, target);
            alignment = alignment.max(m_align);
            let at = if kind == TagKind::Union {
                widest = widest.max(m_size);
                0
            } else {
                offset = round_up(offset, m_align);
                let at = offset;
                offset += m_size;
                at
            };
            laid_out.push(StructMember {
                name: Arc::clone(&m.name),
                offset: at,
                size: m_size,
            });
        }
        let size = if kind == TagKind::Union {
            round_up(widest, alignment)
        } else {
            round_up(offset, alignment)
        };
        StructDescriptor {
            size,
            alignment,
            members: laid_out,
        }
    }

    /// Record an enumeration constant
    pub fn define_enum_constant(&mut self, name: impl Into<Arc<str>>, value: i64) {
        self.enum_constants.insert(name.into(), value);
    }

    /// Record a file-scope identifier
    pub fn declare_external(&mut self, name: impl Into<Arc<str>>) {
        self.external_ids.insert(name.into(), ());
    }
}

impl SymbolTable for Symbols {
    fn lookup_tag(&self, name: &str) -> Option<&TagDef> {
        self.tags.get(name)
    }

    fn struct_descriptor(&self, name: &str) -> Option<&StructDescriptor> {
        self.descriptors.get(name)
    }

    fn enum_constant(&self, name: &str) -> Option<i64> {
        self.enum_constants.get(name).copied()
    }

    fn is_external_id(&self, name: &str) -> bool {
        self.external_ids.contains_key(name)
    }
}

/// Round `n` up to the next multiple of `align`
pub fn round_up(n: u32, align: u32) -> u32 {
    if align == 0 {
        return n;
    }
    n.div_ceil(align) * align
}

/// Scoped identifier-to-stack-offset map used while lowering one function
///
/// Scopes stack innermost-last; lookup walks outward so shadowed names
/// resolve to the nearest declaration.
#[derive(Debug, Default)]
pub struct LocationMap {
    scopes: Vec<HashMap<Arc<str>, i32>>,
}

impl LocationMap {
    /// Create an empty map with no open scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a nested scope
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Close the innermost scope
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Register `name` at `offset` in the innermost scope
    pub fn insert(&mut self, name: impl Into<Arc<str>>, offset: i32) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), offset);
        }
    }

    /// Stack offset of `name`, innermost declaration first
    pub fn offset_of(&self, name: &str) -> Option<i32> {
        for scope in self.scopes.iter().rev() {
            if let Some(off) = scope.get(name) {
                return Some(*off);
            }
        }
        None
    }

    /// Drop every scope
    pub fn clear(&mut self) {
        self.scopes.clear();
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
