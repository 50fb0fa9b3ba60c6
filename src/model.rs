use crate::error::RenderError;
use crate::registers::RegisterDescriptor;

/// A fixed-width integer as the decoder saw it: the raw bit pattern plus its declared width.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntegerValue {
    pub value: u64,
    pub bits: u32,
}
::static_assertions::assert_eq_size!(IntegerValue, [u8; 16]);

impl IntegerValue {
    pub fn new(value: u64, bits: u32) -> Self {
        IntegerValue { value, bits }
    }

    /// All-ones mask for widths 1..=64; `None` for anything else.
    pub fn mask(self) -> Option<u64> {
        match self.bits {
            64 => Some(u64::MAX),
            1..=63 => Some((1u64 << self.bits) - 1),
            _ => None,
        }
    }
}

/// Type of the datum a memory reference loads or stores.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryType {
    Integer { bits: u32 },
    Float { bits: u32 },
    Vector { count: u32, element: Box<MemoryType> },
}

impl MemoryType {
    /// Assembler size keyword used in front of `ptr`.
    pub fn ptr_name(&self) -> Result<String, RenderError> {
        let name = match self {
            MemoryType::Integer { bits: 8 } => "byte",
            MemoryType::Integer { bits: 16 } => "word",
            MemoryType::Integer { bits: 32 } => "dword",
            MemoryType::Integer { bits: 64 } => "qword",
            MemoryType::Float { bits: 32 } => "float",
            MemoryType::Float { bits: 64 } => "double",
            MemoryType::Float { bits: 80 } => "ldouble",
            MemoryType::Vector { count: 2, element }
                if matches!(**element, MemoryType::Integer { bits: 64 }) =>
            {
                "dqword"
            }
            MemoryType::Vector { count, element } => {
                return Ok(format!("V{}{}", count, element.ptr_name()?));
            }
            other => {
                ::tracing::error!(ty = ?other, "unhandled memory type");
                return Err(RenderError::UnhandledType(format!("{:?}", other)));
            }
        };
        Ok(name.to_string())
    }
}

/// One node of an operand expression tree. Children are owned; there is no sharing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Box<Expr>, Box<Expr>),
    MemoryReference {
        address: Box<Expr>,
        segment: Option<Box<Expr>>,
        ty: Option<MemoryType>,
    },
    DirectRegister(RegisterDescriptor),
    IndirectRegister {
        index: usize,
    },
    Integer(IntegerValue),

    // Produced by decoders for other instruction sets (x87 constants, ARM register lists).
    // The x86 renderer was never taught these and refuses them.
    FloatValue(f64),
    RegisterList(Vec<RegisterDescriptor>),
}

impl Expr {
    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Subtract(Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Multiply(Box::new(lhs), Box::new(rhs))
    }

    pub fn reg(reg: RegisterDescriptor) -> Expr {
        Expr::DirectRegister(reg)
    }

    pub fn int(value: u64, bits: u32) -> Expr {
        Expr::Integer(IntegerValue::new(value, bits))
    }

    pub fn mem(address: Expr) -> Expr {
        Expr::MemoryReference {
            address: Box::new(address),
            segment: None,
            ty: None,
        }
    }

    pub fn mem_with(address: Expr, segment: Option<Expr>, ty: Option<MemoryType>) -> Expr {
        Expr::MemoryReference {
            address: Box::new(address),
            segment: segment.map(Box::new),
            ty,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Add(..) => "BinaryAdd",
            Expr::Subtract(..) => "BinarySubtract",
            Expr::Multiply(..) => "BinaryMultiply",
            Expr::MemoryReference { .. } => "MemoryReference",
            Expr::DirectRegister(_) => "DirectRegister",
            Expr::IndirectRegister { .. } => "IndirectRegister",
            Expr::Integer(_) => "IntegerValue",
            Expr::FloatValue(_) => "FloatValue",
            Expr::RegisterList(_) => "RegisterList",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Architecture {
    X86,
    X86_64,
    Arm,
    Aarch64,
    Other,
}

impl Architecture {
    pub fn is_x86(self) -> bool {
        matches!(self, Architecture::X86 | Architecture::X86_64)
    }
}

/// A decoded instruction as handed over by the lifter.
///
/// Operands are optional because a lifter can leave holes for operands it failed to build;
/// those render as a sentinel instead of failing the whole line.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub address: u64,
    pub architecture: Architecture,
    pub mnemonic: String,
    pub operands: Vec<Option<Expr>>,
    pub raw_bytes: Vec<u8>,
}

impl Instruction {
    /// `lea` computes an address without touching memory, so its memory operand is rendered
    /// without size keyword or segment prefix.
    pub fn is_lea(&self) -> bool {
        self.architecture.is_x86() && self.mnemonic.eq_ignore_ascii_case("lea")
    }
}
