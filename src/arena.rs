//! Scoped name arena
//!
//! Bump allocator for the short-lived strings the IR generator mints while
//! lowering one function (mangled identifiers, temporary names). Backed by
//! a list of fixed-capacity blocks; [`Arena::reset`] rewinds to the first
//! block in O(1) and keeps the blocks for reuse. Handles stay valid until
//! the reset *after* the one they were allocated under.

/// Handle into an [`Arena`]
///
/// Invalidated by the next [`Arena::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameRef {
    block: u32,
    start: u32,
    len: u32,
}

/// Block-chained string arena with scoped reset
#[derive(Debug)]
pub struct Arena {
    blocks: Vec<String>,
    block_size: usize,
    current: usize,
}

impl Arena {
    /// Create an arena whose blocks hold `block_size` bytes each
    pub fn new(block_size: usize) -> Self {
        assert!(block_size > 0, "arena block size must be non-zero");
        Self {
            blocks: vec![String::with_capacity(block_size)],
            block_size,
            current: 0,
        }
    }

    /// Copy `s` into the arena and return a handle to it
    ///
    /// Chains a new block when the current one runs out. Strings longer
    /// than the block size get a block of their own size.
    pub fn alloc_str(&mut self, s: &str) -> NameRef {
        if self.blocks[self.current].len() + s.len() > self.block_size {
            self.current += 1;
            if self.current == self.blocks.len() {
                self.blocks
                    .push(String::with_capacity(self.block_size.max(s.len())));
            } else {
                self.blocks[self.current].clear();
            }
        }
        let block = &mut self.blocks[self.current];
        let start = block.len();
        block.push_str(s);
        NameRef {
            block: self.current as u32,
            start: start as u32,
            len: s.len() as u32,
        }
    }

    /// Resolve a handle allocated since the last reset
    pub fn get(&self, r: NameRef) -> &str {
        &self.blocks[r.block as usize][r.start as usize..(r.start + r.len) as usize]
    }

    /// Rewind to the first block, retaining all blocks for reuse
    ///
    /// Invalidates every handle allocated so far.
    pub fn reset(&mut self) {
        self.current = 0;
        self.blocks[0].clear();
    }

    /// Bytes currently allocated since the last reset
    pub fn allocated(&self) -> usize {
        self.blocks[..=self.current].iter().map(String::len).sum()
    }
}
