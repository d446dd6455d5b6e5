//! IR dumps
//!
//! Textual disassembly of the quad stream (labels print as `Ln`,
//! temporaries as `tN`, identifiers by their mangled spelling) and a JSON
//! rendering of the stream plus the CFG for external tooling.

use crate::ir::generator::IrContext;
use crate::ir::instruction::{Address, OpKind};
use serde::Serialize;

fn operand(ctx: &IrContext, a: u32) -> String {
    match &ctx.addrs[a as usize] {
        Address::Empty => "_".to_string(),
        Address::IConst { val } => val.to_string(),
        Address::StrLit { s } => format!("{:?}", s),
        Address::Id { name, .. } | Address::Temp { name, .. } => ctx.name(*name).to_string(),
    }
}

fn label(ctx: &IrContext, a: u32) -> String {
    match &ctx.addrs[a as usize] {
        Address::IConst { val } => format!("L{}", val),
        _ => "L?".to_string(),
    }
}

/// Render one instruction
fn quad_text(ctx: &IrContext, i: usize) -> String {
    let q = &ctx.quads[i];
    match q.op {
        OpKind::Lab => format!("{}:", label(ctx, q.tar)),
        OpKind::Jmp => format!("    jmp {}", label(ctx, q.tar)),
        OpKind::CBr => format!(
            "    cbr {}, {}, {}",
            operand(ctx, q.tar),
            label(ctx, q.arg1),
            label(ctx, q.arg2)
        ),
        OpKind::Switch => format!(
            "    switch {}, {}",
            operand(ctx, q.tar),
            operand(ctx, q.arg1)
        ),
        OpKind::Case => format!(
            "    case {}, {}",
            operand(ctx, q.tar),
            label(ctx, q.arg1)
        ),
        OpKind::Ret => {
            if q.tar == 0 {
                "    ret".to_string()
            } else {
                format!("    ret {}", operand(ctx, q.tar))
            }
        }
        OpKind::Arg => format!("    arg {}", operand(ctx, q.tar)),
        OpKind::BegArg => "    begarg".to_string(),
        OpKind::Call | OpKind::IndCall => {
            let callee = operand(ctx, q.arg1);
            let n = operand(ctx, q.arg2);
            let call = format!("{} {}, {}", q.op.mnemonic(), callee, n);
            if q.tar == 0 {
                format!("    {}", call)
            } else {
                format!("    {} = {}", operand(ctx, q.tar), call)
            }
        }
        OpKind::Asn => format!("    {} = {}", operand(ctx, q.tar), operand(ctx, q.arg1)),
        OpKind::IndAsn => format!("    *({}) = {}", operand(ctx, q.tar), operand(ctx, q.arg1)),
        OpKind::Ind => format!("    {} = *({})", operand(ctx, q.tar), operand(ctx, q.arg1)),
        OpKind::AddrOf => format!("    {} = &{}", operand(ctx, q.tar), operand(ctx, q.arg1)),
        OpKind::Neg
        | OpKind::Cmpl
        | OpKind::Not
        | OpKind::Ch
        | OpKind::UCh
        | OpKind::Sh
        | OpKind::USh
        | OpKind::LLSX
        | OpKind::LLZX => format!(
            "    {} = {} {}",
            operand(ctx, q.tar),
            q.op.mnemonic(),
            operand(ctx, q.arg1)
        ),
        OpKind::NOp => "    nop".to_string(),
        _ => format!(
            "    {} = {} {}, {}",
            operand(ctx, q.tar),
            q.op.mnemonic(),
            operand(ctx, q.arg1),
            operand(ctx, q.arg2)
        ),
    }
}

/// Render the whole quad stream
pub fn disassemble(ctx: &IrContext) -> String {
    let mut out = String::new();
    for i in 0..ctx.quads.len() {
        out.push_str(&quad_text(ctx, i));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct QuadDump {
    index: usize,
    op: &'static str,
    text: String,
    ty: Option<String>,
}

#[derive(Serialize)]
struct BlockDump {
    index: usize,
    leader: u32,
    last: u32,
    successors: Vec<u32>,
    predecessors: Vec<u32>,
    po: u32,
    rpo: u32,
}

#[derive(Serialize)]
struct IrDump {
    quads: Vec<QuadDump>,
    blocks: Vec<BlockDump>,
    cfg_po: Vec<u32>,
    cfg_rpo: Vec<u32>,
}

/// JSON rendering of the quad stream and the CFG
pub fn dump_json(ctx: &IrContext) -> serde_json::Value {
    let quads = (0..ctx.quads.len())
        .map(|i| QuadDump {
            index: i,
            op: ctx.quads[i].op.mnemonic(),
            text: quad_text(ctx, i).trim_start().to_string(),
            ty: ctx.quads[i].ty.as_ref().map(|t| t.to_string()),
        })
        .collect();
    let blocks = ctx
        .cfg
        .nodes
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, b)| BlockDump {
            index: i,
            leader: b.leader,
            last: b.last,
            successors: b.out_edges.clone(),
            predecessors: b.in_edges.clone(),
            po: b.po,
            rpo: b.rpo,
        })
        .collect();
    let dump = IrDump {
        quads,
        blocks,
        cfg_po: ctx.cfg.cfg_po.clone(),
        cfg_rpo: ctx.cfg.cfg_rpo.clone(),
    };
    serde_json::to_value(dump).unwrap_or(serde_json::Value::Null)
}
