use crate::{
    error::RenderError,
    model::Instruction,
    registers::RegisterNames,
    unparse::{unparse_expression, GenericUnparser, Unparser, NULL_OPERAND},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DebugOptions {
    /// Raw bytes shown per line; 0 hides the `; BYTES:` column.
    pub max_bytes: usize,
    /// Emit an empty line after each basic block of a listing.
    pub block_separators: bool,
}

impl Default for DebugOptions {
    fn default() -> Self {
        DebugOptions {
            max_bytes: 8,
            block_separators: true,
        }
    }
}

/// Upper-case hex of at most `max_bytes` bytes, with `+` appended when bytes were cut off.
pub fn opcode_bytes(data: &[u8], max_bytes: usize) -> String {
    let shown = data.len().min(max_bytes);
    let mut text: String = data[..shown].iter().map(|b| format!("{:02X}", b)).collect();
    if data.len() > max_bytes {
        text.push('+');
    }
    text
}

/// One listing line: `ADDRESS: mnemonic  op1, op2 ; BYTES: ...`.
///
/// Instructions of other architectures get the same layout, with operands from `generic`,
/// rather than an address followed by the architecture's own instruction text.
pub fn debug_instruction<R, G>(
    insn: &Instruction,
    options: &DebugOptions,
    unparser: &Unparser<'_, R>,
    generic: &G,
) -> Result<String, RenderError>
where
    R: RegisterNames + ?Sized,
    G: GenericUnparser + ?Sized,
{
    let lea_mode = insn.is_lea();
    let operands = insn
        .operands
        .iter()
        .map(|operand| match operand {
            Some(expr) => unparse_expression(insn.architecture, expr, lea_mode, unparser, generic),
            None => Ok(NULL_OPERAND.to_string()),
        })
        .collect::<Result<Vec<String>, RenderError>>()?
        .join(", ");

    let mut line = format!("{:X}: {:<9} {}", insn.address, insn.mnemonic, operands);
    if options.max_bytes > 0 {
        line.push_str(" ; BYTES: ");
        line.push_str(&opcode_bytes(&insn.raw_bytes, options.max_bytes));
    }
    Ok(line)
}

/// Renders basic blocks in the order given, one instruction per line.
pub fn debug_listing<'i, B, R, G>(
    blocks: B,
    options: &DebugOptions,
    unparser: &Unparser<'_, R>,
    generic: &G,
) -> Result<String, RenderError>
where
    B: IntoIterator<Item = &'i [Instruction]>,
    R: RegisterNames + ?Sized,
    G: GenericUnparser + ?Sized,
{
    let mut listing = String::new();
    for block in blocks {
        for insn in block {
            let line = debug_instruction(insn, options, unparser, generic).map_err(|e| {
                ::tracing::error!(address = insn.address, error = %e, "failed to render instruction");
                e
            })?;
            listing.push_str(&line);
            listing.push('\n');
        }
        if options.block_separators {
            listing.push('\n');
        }
    }
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        labels::LabelMap,
        model::{Architecture, Expr},
        registers::{Gpr, RegisterDescriptor, X86Registers},
    };

    struct NoGeneric;

    impl GenericUnparser for NoGeneric {
        fn unparse(&self, expr: &Expr, _labels: Option<&LabelMap>) -> Result<String, RenderError> {
            Err(RenderError::UnsupportedExpression {
                kind: expr.kind_name(),
            })
        }
    }

    fn insn(mnemonic: &str, operands: Vec<Option<Expr>>, raw_bytes: Vec<u8>) -> Instruction {
        Instruction {
            address: 0x401000,
            architecture: Architecture::X86_64,
            mnemonic: mnemonic.to_string(),
            operands,
            raw_bytes,
        }
    }

    #[test]
    fn byte_dump() {
        assert_eq!(opcode_bytes(&[0x48, 0x89, 0xe5], 8), "4889E5");
        assert_eq!(opcode_bytes(&[0x48, 0x89, 0xe5], 2), "4889+");
        assert_eq!(opcode_bytes(&[0x0f, 0x05], 2), "0F05");
        assert_eq!(opcode_bytes(&[], 4), "");
    }

    #[test]
    fn instruction_line() {
        let unparser = Unparser::new(&X86Registers, None);
        let mov = insn(
            "mov",
            vec![
                Some(Expr::reg(RegisterDescriptor::gpr(Gpr::Rbp, 64))),
                Some(Expr::reg(RegisterDescriptor::gpr(Gpr::Rsp, 64))),
            ],
            vec![0x48, 0x89, 0xe5],
        );
        let options = DebugOptions::default();
        assert_eq!(
            debug_instruction(&mov, &options, &unparser, &NoGeneric).unwrap(),
            "401000: mov       rbp, rsp ; BYTES: 4889E5"
        );

        let quiet = DebugOptions {
            max_bytes: 0,
            ..options
        };
        assert_eq!(
            debug_instruction(&mov, &quiet, &unparser, &NoGeneric).unwrap(),
            "401000: mov       rbp, rsp"
        );
    }

    #[test]
    fn missing_operand_renders_sentinel() {
        let unparser = Unparser::new(&X86Registers, None);
        let push = insn("push", vec![None], vec![0x50]);
        let options = DebugOptions {
            max_bytes: 0,
            block_separators: false,
        };
        assert_eq!(
            debug_instruction(&push, &options, &unparser, &NoGeneric).unwrap(),
            "401000: push      BOGUS:NULL"
        );
    }

    #[test]
    fn failing_operand_fails_the_line() {
        let unparser = Unparser::new(&X86Registers, None);
        let fld = insn("fld", vec![Some(Expr::FloatValue(1.0))], vec![0xd9, 0xe8]);
        assert!(debug_instruction(&fld, &DebugOptions::default(), &unparser, &NoGeneric).is_err());
    }

    #[test]
    fn listing_separates_blocks() {
        let unparser = Unparser::new(&X86Registers, None);
        let ret = insn("ret", vec![], vec![0xc3]);
        let blocks: Vec<Vec<Instruction>> = vec![vec![ret.clone()], vec![ret]];
        let options = DebugOptions {
            max_bytes: 1,
            block_separators: true,
        };
        let listing = debug_listing(
            blocks.iter().map(Vec::as_slice),
            &options,
            &unparser,
            &NoGeneric,
        )
        .unwrap();
        assert_eq!(
            listing,
            "401000: ret        ; BYTES: C3\n\n401000: ret        ; BYTES: C3\n\n"
        );
    }
}
