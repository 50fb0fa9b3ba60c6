use std::io::Write;

use anyhow::Context;

pub mod addressing;
pub mod debug;
pub mod error;
pub mod labels;
pub mod literal;
pub mod model;
pub mod registers;
pub mod unparse;

pub use crate::{
    debug::{debug_instruction, debug_listing, opcode_bytes, DebugOptions},
    error::{LabelError, RenderError},
    labels::LabelMap,
    literal::format_integer,
    model::{Architecture, Expr, Instruction, IntegerValue, MemoryType},
    registers::{RegisterDescriptor, RegisterNames, X86Registers},
    unparse::{GenericUnparser, RenderConfig, Unparser},
};

/// Renders one x86 operand with the default register table.
pub fn render_operand(
    expr: &Expr,
    lea_mode: bool,
    labels: Option<&LabelMap>,
) -> Result<String, RenderError> {
    Unparser::new(&X86Registers, labels).unparse(expr, lea_mode)
}

/// Writes a debug listing of `blocks`. Nothing is written when any instruction fails to
/// render.
pub fn write_listing<'i, B, W, G>(
    blocks: B,
    output: &mut W,
    options: &DebugOptions,
    labels: Option<&LabelMap>,
    generic: &G,
) -> anyhow::Result<()>
where
    B: IntoIterator<Item = &'i [Instruction]>,
    W: Write,
    G: GenericUnparser + ?Sized,
{
    let unparser = Unparser::new(&X86Registers, labels);
    let listing =
        debug_listing(blocks, options, &unparser, generic).context("failed to render listing")?;
    output.write_all(listing.as_bytes())?;
    Ok(())
}
