use crate::{
    error::RenderError,
    literal::{signed_magnitude, truncated},
    model::{Expr, IntegerValue},
    registers::{RegisterDescriptor, RegisterNames},
};

/// A memory address of the form `base + index*stride + offset`.
///
/// Decoders have nested this sum both as `(base + index*stride) + offset` and as
/// `base + (offset + index*stride)`, and in any leaf order. Recognition flattens either
/// nesting into three leaves and assigns each leaf a role, so the emitted text does not
/// depend on which shape the decoder produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndirectAddress {
    pub base: RegisterDescriptor,
    pub index: RegisterDescriptor,
    pub stride: IntegerValue,
    pub offset: IntegerValue,
}

#[derive(Default)]
struct Roles {
    base: Option<RegisterDescriptor>,
    offset: Option<IntegerValue>,
    scaled_index: Option<(RegisterDescriptor, IntegerValue)>,
}

impl Roles {
    // Claims a role for one leaf; `None` when the leaf fits no role or its role is taken.
    fn claim(mut self, leaf: &Expr) -> Option<Self> {
        match leaf {
            Expr::DirectRegister(reg) => {
                if self.base.replace(*reg).is_some() {
                    return None;
                }
            }
            Expr::Integer(int) => {
                if self.offset.replace(*int).is_some() {
                    return None;
                }
            }
            Expr::Multiply(lhs, rhs) => {
                let scaled = match (lhs.as_ref(), rhs.as_ref()) {
                    (Expr::DirectRegister(reg), Expr::Integer(stride))
                    | (Expr::Integer(stride), Expr::DirectRegister(reg)) => (*reg, *stride),
                    _ => return None,
                };
                if self.scaled_index.replace(scaled).is_some() {
                    return None;
                }
            }
            _ => return None,
        }
        Some(self)
    }
}

impl IndirectAddress {
    /// Matches the address child of a memory reference.
    pub fn recognize(address: &Expr) -> Option<IndirectAddress> {
        let Expr::Add(outer_lhs, outer_rhs) = address else {
            return None;
        };
        let leaves: [&Expr; 3] = match (outer_lhs.as_ref(), outer_rhs.as_ref()) {
            (Expr::Add(a, b), c) => [a.as_ref(), b.as_ref(), c],
            (a, Expr::Add(b, c)) => [a, b.as_ref(), c.as_ref()],
            _ => return None,
        };

        let roles = leaves
            .into_iter()
            .try_fold(Roles::default(), |roles, leaf| roles.claim(leaf))?;
        let (index, stride) = roles.scaled_index?;
        Some(IndirectAddress {
            base: roles.base?,
            index,
            stride,
            offset: roles.offset?,
        })
    }

    /// Canonical `[base+index*stride+offset]` text; the stride is dropped when it is 1.
    pub fn emit<R: RegisterNames + ?Sized>(&self, registers: &R) -> Result<String, RenderError> {
        let stride = match truncated(self.stride)? {
            1 => String::new(),
            scale => format!("*{:x}", scale),
        };
        let (negative, magnitude) = signed_magnitude(self.offset)?;
        let sign = if negative { '-' } else { '+' };
        Ok(format!(
            "[{}+{}{}{}{:#x}]",
            registers.register_name(self.base),
            registers.register_name(self.index),
            stride,
            sign,
            magnitude
        ))
    }
}
