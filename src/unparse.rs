use crate::{
    addressing::IndirectAddress,
    error::RenderError,
    labels::LabelMap,
    literal::format_integer,
    model::{Architecture, Expr, MemoryType},
    registers::RegisterNames,
};

/// Rendered in place of an operand the lifter failed to produce.
pub const NULL_OPERAND: &str = "BOGUS:NULL";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Deepest expression nesting rendered before giving up on the operand.
    pub max_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { max_depth: 64 }
    }
}

/// Renders operands of instructions that are not x86.
pub trait GenericUnparser {
    fn unparse(&self, expr: &Expr, labels: Option<&LabelMap>) -> Result<String, RenderError>;
}

/// MASM-flavoured x86 operand renderer.
///
/// Holds everything a render call reads: the label table, the register-name resolver and
/// the limits. Rendering never mutates it, so one `Unparser` can serve many threads.
pub struct Unparser<'a, R: RegisterNames + ?Sized> {
    labels: Option<&'a LabelMap>,
    registers: &'a R,
    config: RenderConfig,
}
::static_assertions::assert_impl_all!(Unparser<'static, crate::registers::X86Registers>: Send, Sync);

impl<'a, R: RegisterNames + ?Sized> Unparser<'a, R> {
    pub fn new(registers: &'a R, labels: Option<&'a LabelMap>) -> Self {
        Unparser {
            labels,
            registers,
            config: RenderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn labels(&self) -> Option<&'a LabelMap> {
        self.labels
    }

    /// Renders one operand slot, which may be empty.
    pub fn unparse_operand(&self, expr: Option<&Expr>, lea_mode: bool) -> Result<String, RenderError> {
        match expr {
            Some(expr) => self.unparse(expr, lea_mode),
            None => Ok(NULL_OPERAND.to_string()),
        }
    }

    /// Renders an expression tree. `lea_mode` drops the size keyword and segment prefix of
    /// a top-level memory reference, as for the source operand of `lea`.
    pub fn unparse(&self, expr: &Expr, lea_mode: bool) -> Result<String, RenderError> {
        self.unparse_at(expr, lea_mode, self.labels, 0)
    }

    fn unparse_at(
        &self,
        expr: &Expr,
        lea_mode: bool,
        labels: Option<&LabelMap>,
        depth: usize,
    ) -> Result<String, RenderError> {
        if depth >= self.config.max_depth {
            ::tracing::error!(limit = self.config.max_depth, "expression nested too deeply");
            return Err(RenderError::DepthLimit {
                limit: self.config.max_depth,
            });
        }
        let child = |e: &Expr| self.unparse_at(e, false, labels, depth + 1);

        let text = match expr {
            Expr::Add(lhs, rhs) => {
                let (lhs, rhs) = (child(lhs)?, child(rhs)?);
                if rhs.starts_with('-') {
                    format!("{}{}", lhs, rhs)
                } else {
                    format!("{}+{}", lhs, rhs)
                }
            }
            Expr::Subtract(lhs, rhs) => format!("{}-{}", child(lhs)?, child(rhs)?),
            Expr::Multiply(lhs, rhs) => format!("{}*{}", child(lhs)?, child(rhs)?),
            Expr::MemoryReference {
                address,
                segment,
                ty,
            } => {
                if let Some(indirect) = IndirectAddress::recognize(address) {
                    return indirect.emit(self.registers);
                }
                ::tracing::trace!("no indirect addressing pattern, using generic memory text");

                let mut text = String::new();
                if !lea_mode {
                    if size_is_ambiguous(ty.as_ref()) {
                        text.push_str(&ptr_name(ty.as_ref())?);
                        text.push_str(" ptr ");
                    }
                    // Only fs overrides are printed; others are dropped.
                    if let Some(segment) = segment {
                        let segment = self.unparse_at(segment, false, None, depth + 1)?;
                        if segment == "fs" {
                            text.push_str(&segment);
                            text.push(':');
                        }
                    }
                }
                text.push('[');
                text.push_str(&child(address)?);
                text.push(']');
                text
            }
            Expr::DirectRegister(reg) => self.registers.register_name(*reg),
            // Placeholder: the index is not resolved to a register name.
            Expr::IndirectRegister { index } => format!("({})", index),
            Expr::Integer(int) => format_integer(*int, labels)?,
            unsupported @ (Expr::FloatValue(_) | Expr::RegisterList(_)) => {
                let kind = unsupported.kind_name();
                ::tracing::error!(kind, "unhandled expression kind");
                return Err(RenderError::UnsupportedExpression { kind });
            }
        };
        Ok(text)
    }
}

// Assemblers infer the operand size from the other operand in nearly every case, so the
// size keyword is never emitted. Real ambiguity detection is not implemented.
fn size_is_ambiguous(_ty: Option<&MemoryType>) -> bool {
    false
}

/// Size keyword for a memory reference; a reference without a type cannot be named.
pub fn ptr_name(ty: Option<&MemoryType>) -> Result<String, RenderError> {
    match ty {
        Some(ty) => ty.ptr_name(),
        None => {
            ::tracing::error!("size keyword requested for an untyped memory reference");
            Err(RenderError::MissingType)
        }
    }
}

/// Architecture dispatch: x86 operands go through [`Unparser`], everything else through
/// the generic collaborator.
pub fn unparse_expression<R, G>(
    architecture: Architecture,
    expr: &Expr,
    lea_mode: bool,
    unparser: &Unparser<'_, R>,
    generic: &G,
) -> Result<String, RenderError>
where
    R: RegisterNames + ?Sized,
    G: GenericUnparser + ?Sized,
{
    if architecture.is_x86() {
        unparser.unparse(expr, lea_mode)
    } else {
        generic.unparse(expr, unparser.labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{Gpr, RegisterDescriptor, SegmentReg, X86Registers};

    fn reg(r: Gpr) -> Expr {
        Expr::reg(RegisterDescriptor::gpr(r, 64))
    }

    fn fs() -> Expr {
        Expr::reg(RegisterDescriptor::segment(SegmentReg::FS))
    }

    fn render(expr: &Expr) -> String {
        Unparser::new(&X86Registers, None).unparse(expr, false).unwrap()
    }

    #[test]
    fn binary_operators() {
        assert_eq!(render(&Expr::add(reg(Gpr::Rax), Expr::int(4, 32))), "rax+0x4");
        assert_eq!(render(&Expr::sub(reg(Gpr::Rax), Expr::int(4, 32))), "rax-0x4");
        assert_eq!(render(&Expr::mul(reg(Gpr::Rcx), Expr::int(8, 8))), "rcx*0x8");
    }

    #[test]
    fn add_does_not_double_the_sign() {
        let expr = Expr::add(reg(Gpr::Rax), Expr::int(0xffff_fffc, 32));
        assert_eq!(render(&expr), "rax-0x4");
    }

    #[test]
    fn subtract_keeps_the_sign() {
        let expr = Expr::sub(reg(Gpr::Rax), Expr::int(0xfc, 8));
        assert_eq!(render(&expr), "rax--0x4");
    }

    #[test]
    fn memory_reference_with_pattern() {
        let address = Expr::add(
            Expr::add(reg(Gpr::Rbx), Expr::mul(reg(Gpr::Rcx), Expr::int(4, 8))),
            Expr::int(0x10, 32),
        );
        // the canonical form wins over the segment prefix
        let expr = Expr::mem_with(address, Some(fs()), None);
        assert_eq!(render(&expr), "[rbx+rcx*4+0x10]");
    }

    #[test]
    fn memory_reference_generic_fallback() {
        let address = Expr::add(
            Expr::add(Expr::add(reg(Gpr::Rax), reg(Gpr::Rbx)), reg(Gpr::Rcx)),
            Expr::int(4, 32),
        );
        assert_eq!(render(&Expr::mem(address)), "[rax+rbx+rcx+0x4]");

        let address = Expr::add(Expr::add(reg(Gpr::Rax), reg(Gpr::Rbx)), Expr::int(4, 32));
        assert_eq!(render(&Expr::mem(address)), "[rax+rbx+0x4]");

        assert_eq!(render(&Expr::mem(reg(Gpr::Rsp))), "[rsp]");
    }

    #[test]
    fn only_fs_segment_is_printed() {
        let expr = Expr::mem_with(Expr::int(0x28, 32), Some(fs()), None);
        assert_eq!(render(&expr), "fs:[0x28]");

        let gs = Expr::reg(RegisterDescriptor::segment(SegmentReg::GS));
        let expr = Expr::mem_with(Expr::int(0x28, 32), Some(gs), None);
        assert_eq!(render(&expr), "[0x28]");
    }

    #[test]
    fn lea_mode_drops_the_segment() {
        let expr = Expr::mem_with(reg(Gpr::Rax), Some(fs()), None);
        let unparser = Unparser::new(&X86Registers, None);
        assert_eq!(unparser.unparse(&expr, true).unwrap(), "[rax]");
        assert_eq!(unparser.unparse(&expr, false).unwrap(), "fs:[rax]");
    }

    #[test]
    fn size_keyword_is_never_emitted() {
        let ty = MemoryType::Integer { bits: 32 };
        let expr = Expr::mem_with(reg(Gpr::Rax), None, Some(ty));
        assert_eq!(render(&expr), "[rax]");
    }

    #[test]
    fn ptr_name_requires_a_type() {
        assert_eq!(ptr_name(None), Err(RenderError::MissingType));
        assert_eq!(ptr_name(Some(&MemoryType::Integer { bits: 16 })).unwrap(), "word");
    }

    #[test]
    fn registers_and_placeholders() {
        assert_eq!(render(&Expr::reg(RegisterDescriptor::gpr(Gpr::R9, 32))), "r9d");
        assert_eq!(render(&Expr::IndirectRegister { index: 3 }), "(3)");
    }

    #[test]
    fn labels_flow_into_literals() {
        let labels: LabelMap = [(0x404000, "g_table")].into_iter().collect();
        let unparser = Unparser::new(&X86Registers, Some(&labels));
        let expr = Expr::mem(Expr::add(reg(Gpr::Rax), Expr::int(0x404000, 32)));
        assert_eq!(unparser.unparse(&expr, false).unwrap(), "[rax+g_table]");
    }

    #[test]
    fn null_operand() {
        let unparser = Unparser::new(&X86Registers, None);
        assert_eq!(unparser.unparse_operand(None, false).unwrap(), "BOGUS:NULL");
    }

    #[test]
    fn unsupported_kinds_fail() {
        let unparser = Unparser::new(&X86Registers, None);
        assert_eq!(
            unparser.unparse(&Expr::FloatValue(1.5), false),
            Err(RenderError::UnsupportedExpression { kind: "FloatValue" })
        );
        // failure deep in the tree aborts the whole operand
        let expr = Expr::mem(Expr::add(reg(Gpr::Rax), Expr::RegisterList(vec![])));
        assert_eq!(
            unparser.unparse(&expr, false),
            Err(RenderError::UnsupportedExpression { kind: "RegisterList" })
        );
        let expr = Expr::add(reg(Gpr::Rax), Expr::int(1, 24));
        assert_eq!(
            unparser.unparse(&expr, false),
            Err(RenderError::UnsupportedWidth { bits: 24 })
        );
    }

    #[test]
    fn depth_is_bounded() {
        let mut expr = Expr::int(1, 8);
        for _ in 0..10 {
            expr = Expr::add(reg(Gpr::Rax), expr);
        }
        let shallow = Unparser::new(&X86Registers, None).with_config(RenderConfig { max_depth: 5 });
        assert_eq!(
            shallow.unparse(&expr, false),
            Err(RenderError::DepthLimit { limit: 5 })
        );
        let deep = Unparser::new(&X86Registers, None);
        assert!(deep.unparse(&expr, false).is_ok());
    }

    #[test]
    fn rendering_is_idempotent() {
        let expr = Expr::mem_with(
            Expr::add(reg(Gpr::Rbp), Expr::int(0xf0, 8)),
            Some(fs()),
            None,
        );
        assert_eq!(render(&expr), render(&expr));
        assert_eq!(render(&expr), "fs:[rbp-0x10]");
    }

    struct Echo;

    impl GenericUnparser for Echo {
        fn unparse(&self, expr: &Expr, _labels: Option<&LabelMap>) -> Result<String, RenderError> {
            Ok(format!("<{}>", expr.kind_name()))
        }
    }

    #[test]
    fn non_x86_goes_to_generic() {
        let unparser = Unparser::new(&X86Registers, None);
        let expr = reg(Gpr::Rax);
        let arm = unparse_expression(Architecture::Aarch64, &expr, false, &unparser, &Echo);
        assert_eq!(arm.unwrap(), "<DirectRegister>");
        let x86 = unparse_expression(Architecture::X86_64, &expr, false, &unparser, &Echo);
        assert_eq!(x86.unwrap(), "rax");
    }
}
