//! Control-flow graph
//!
//! Built over the finished quad stream: every `Lab` instruction starts a
//! basic block, block edges come from the terminators (and from `Case`
//! table entries inside switch dispatch blocks), and the graph is numbered
//! depth-first twice, forward over successors and backward over
//! predecessors, for the dataflow passes that run downstream.

use crate::error::{Error, Result};
use crate::ir::instruction::{Address, OpKind, Quad};
use std::collections::HashMap;

/// Node index of the function entry block
///
/// Index 0 is the reserved null node.
pub const ENTRY_NODE: u32 = 1;

/// Dense bit set keyed by interned identifiers (nids)
///
/// Storage for the per-block dataflow sets; the passes that fill them are
/// out of this crate's scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `i`; grows as needed
    pub fn insert(&mut self, i: usize) {
        let w = i / 64;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1 << (i % 64);
    }

    /// Remove `i`
    pub fn remove(&mut self, i: usize) {
        if let Some(w) = self.words.get_mut(i / 64) {
            *w &= !(1 << (i % 64));
        }
    }

    /// Membership test
    pub fn contains(&self, i: usize) -> bool {
        self.words
            .get(i / 64)
            .map(|w| w & (1 << (i % 64)) != 0)
            .unwrap_or(false)
    }

    /// In-place union; returns true when `self` changed
    pub fn union_with(&mut self, other: &BitSet) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            let new = *w | *o;
            changed |= new != *w;
            *w = new;
        }
        changed
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no member is present
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Drop all members, keeping capacity
    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Iterate members in increasing order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, w)| {
            (0..64).filter_map(move |b| {
                if w & (1 << b) != 0 {
                    Some(wi * 64 + b)
                } else {
                    None
                }
            })
        })
    }
}

/// One basic block
#[derive(Debug, Clone, Default)]
pub struct CfgNode {
    /// Index of the block's first quad (always a `Lab`)
    pub leader: u32,
    /// Index of the block's last quad
    pub last: u32,
    /// Successor block indices
    pub out_edges: Vec<u32>,
    /// Predecessor block indices
    pub in_edges: Vec<u32>,
    /// Upward-exposed variables (filled by liveness)
    pub uevar: BitSet,
    /// Variables defined/killed in the block (filled by liveness)
    pub varkill: BitSet,
    /// Variables live on exit (filled by liveness)
    pub liveout: BitSet,
    /// Dominator set (filled by the dominance pass)
    pub dom: BitSet,
    /// Forward post-order number
    pub po: u32,
    /// Forward reverse-post-order number
    pub rpo: u32,
}

/// Control-flow graph plus its DFS orderings
#[derive(Debug, Default)]
pub struct Cfg {
    /// Blocks; index 0 is the reserved null node, index 1 the entry
    pub nodes: Vec<CfgNode>,
    /// Blocks in forward post-order
    pub cfg_po: Vec<u32>,
    /// Blocks in forward reverse post-order
    pub cfg_rpo: Vec<u32>,
    /// Blocks in reverse-graph post-order
    pub rcfg_po: Vec<u32>,
    /// Blocks in reverse-graph reverse post-order
    pub rcfg_rpo: Vec<u32>,
}

impl Cfg {
    /// An empty graph with only the reserved null node
    pub fn new() -> Self {
        Self {
            nodes: vec![CfgNode::default()],
            cfg_po: Vec::new(),
            cfg_rpo: Vec::new(),
            rcfg_po: Vec::new(),
            rcfg_rpo: Vec::new(),
        }
    }

    /// Drop every block and ordering, freeing the per-node bit sets
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(CfgNode::default());
        self.cfg_po.clear();
        self.cfg_rpo.clear();
        self.rcfg_po.clear();
        self.rcfg_rpo.clear();
    }

    /// Block by index
    pub fn node(&self, i: u32) -> &CfgNode {
        &self.nodes[i as usize]
    }

    /// Number of real blocks (the null node excluded)
    pub fn block_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// True when the graph holds no blocks
    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    fn add_edge(&mut self, from: u32, to: u32) {
        let out = &mut self.nodes[from as usize].out_edges;
        if !out.contains(&to) {
            out.push(to);
        }
        let inn = &mut self.nodes[to as usize].in_edges;
        if !inn.contains(&from) {
            inn.push(from);
        }
    }

    /// Build the graph for a finished quad stream
    ///
    /// Every branch target must be a label that begins some block; an
    /// unknown target is an internal error.
    pub fn build(quads: &[Quad], addrs: &[Address]) -> Result<Cfg> {
        let mut cfg = Cfg::new();
        if quads.is_empty() {
            return Ok(cfg);
        }

        // pass 1: every Lab marks a leader
        let mut label_to_block: HashMap<i64, u32> = HashMap::new();
        for (i, q) in quads.iter().enumerate() {
            if q.op == OpKind::Lab {
                let block = cfg.nodes.len() as u32;
                let label = addrs[q.tar as usize]
                    .const_val()
                    .ok_or_else(|| Error::internal("label operand is not a constant"))?;
                label_to_block.insert(label, block);
                cfg.nodes.push(CfgNode {
                    leader: i as u32,
                    ..CfgNode::default()
                });
            }
        }

        // pass 2: block extents and edges
        let nblocks = cfg.nodes.len();
        let block_of = |label_to_block: &HashMap<i64, u32>, addr: u32| -> Result<u32> {
            let label = addrs[addr as usize]
                .const_val()
                .ok_or_else(|| Error::internal("branch target is not a label constant"))?;
            label_to_block
                .get(&label)
                .copied()
                .ok_or_else(|| Error::internal(format!("branch to unknown label L{}", label)))
        };
        for b in 1..nblocks {
            let last = if b + 1 < nblocks {
                cfg.nodes[b + 1].leader - 1
            } else {
                (quads.len() - 1) as u32
            };
            cfg.nodes[b].last = last;

            let mut targets = Vec::new();
            // switch dispatch blocks list their case targets before the
            // terminator
            let leader = cfg.nodes[b].leader;
            for q in &quads[leader as usize..=last as usize] {
                if q.op == OpKind::Case {
                    targets.push(block_of(&label_to_block, q.arg1)?);
                }
            }
            let term = &quads[last as usize];
            match term.op {
                OpKind::CBr => {
                    targets.push(block_of(&label_to_block, term.arg1)?);
                    targets.push(block_of(&label_to_block, term.arg2)?);
                }
                OpKind::Jmp => {
                    targets.push(block_of(&label_to_block, term.tar)?);
                }
                // the exit block ends with Ret and has no successors
                _ => {}
            }
            for t in targets {
                cfg.add_edge(b as u32, t);
            }
        }

        cfg.number();
        Ok(cfg)
    }

    /// Depth-first numbering, forward and over the reverse graph
    fn number(&mut self) {
        if self.is_empty() {
            return;
        }

        fn dfs(
            nodes: &[CfgNode],
            at: u32,
            backward: bool,
            visited: &mut Vec<bool>,
            order: &mut Vec<u32>,
        ) {
            if visited[at as usize] {
                return;
            }
            visited[at as usize] = true;
            let edges = if backward {
                &nodes[at as usize].in_edges
            } else {
                &nodes[at as usize].out_edges
            };
            for &next in edges {
                dfs(nodes, next, backward, visited, order);
            }
            order.push(at);
        }

        // forward: post-order over successors from the entry
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        dfs(&self.nodes, ENTRY_NODE, false, &mut visited, &mut order);
        let n = order.len() as u32;
        for (po, &b) in order.iter().enumerate() {
            self.nodes[b as usize].po = po as u32;
            self.nodes[b as usize].rpo = n - 1 - po as u32;
        }
        self.cfg_po = order.clone();
        self.cfg_rpo = order.iter().rev().copied().collect();

        // backward: post-order over predecessors from the exit block
        let exit = (self.nodes.len() - 1) as u32;
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        dfs(&self.nodes, exit, true, &mut visited, &mut order);
        self.rcfg_po = order.clone();
        self.rcfg_rpo = order.iter().rev().copied().collect();
    }
}
