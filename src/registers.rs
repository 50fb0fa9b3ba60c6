// Register descriptors are opaque to the unparser: they are handed over by the decoder and
// turned into text by whatever `RegisterNames` implementation the caller supplies.

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    Gpr,
    Segment,
    InstructionPointer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    pub class: RegisterClass,
    pub number: u8,
    /// Bit offset inside the full register; 8 selects the legacy high byte (`ah`, `ch`, ...).
    pub offset: u8,
    pub bits: u16,
}
::static_assertions::assert_eq_size!(RegisterDescriptor, [u8; 6]);

// Numbering follows the ModRM/REX register encoding.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Gpr {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

// Page 4-21, "Segment register code", extended with fs/gs
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SegmentReg {
    ES = 0b000,
    CS = 0b001,
    SS = 0b010,
    DS = 0b011,
    FS = 0b100,
    GS = 0b101,
}

impl RegisterDescriptor {
    pub const fn gpr(reg: Gpr, bits: u16) -> Self {
        RegisterDescriptor {
            class: RegisterClass::Gpr,
            number: reg as u8,
            offset: 0,
            bits,
        }
    }

    /// `ah`, `ch`, `dh` or `bh`; only the first four GPRs have an addressable high byte.
    pub const fn gpr_high_byte(reg: Gpr) -> Self {
        RegisterDescriptor {
            class: RegisterClass::Gpr,
            number: reg as u8,
            offset: 8,
            bits: 8,
        }
    }

    pub const fn segment(reg: SegmentReg) -> Self {
        RegisterDescriptor {
            class: RegisterClass::Segment,
            number: reg as u8,
            offset: 0,
            bits: 16,
        }
    }

    pub const fn instruction_pointer(bits: u16) -> Self {
        RegisterDescriptor {
            class: RegisterClass::InstructionPointer,
            number: 0,
            offset: 0,
            bits,
        }
    }
}

/// Resolves register descriptors to their canonical short names (`rax`, `fs`, ...).
pub trait RegisterNames {
    fn register_name(&self, reg: RegisterDescriptor) -> String;
}

pub const REG_TABLE_64: &[&str; 16] = &[
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15",
];
pub const REG_TABLE_32: &[&str; 16] = &[
    "eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "r8d", "r9d", "r10d", "r11d",
    "r12d", "r13d", "r14d", "r15d",
];
pub const REG_TABLE_16: &[&str; 16] = &[
    "ax", "cx", "dx", "bx", "sp", "bp", "si", "di", "r8w", "r9w", "r10w", "r11w", "r12w",
    "r13w", "r14w", "r15w",
];
pub const REG_TABLE_8: &[&str; 16] = &[
    "al", "cl", "dl", "bl", "spl", "bpl", "sil", "dil", "r8b", "r9b", "r10b", "r11b", "r12b",
    "r13b", "r14b", "r15b",
];
pub const REG_TABLE_8_HIGH: &[&str; 4] = &["ah", "ch", "dh", "bh"];
pub const SEGMENT_REG_TABLE: &[&str; 6] = &["es", "cs", "ss", "ds", "fs", "gs"];

/// Default x86/x86-64 register table.
#[derive(Debug, Default, Copy, Clone)]
pub struct X86Registers;

impl X86Registers {
    fn lookup(reg: RegisterDescriptor) -> Option<&'static str> {
        let number = reg.number as usize;
        match (reg.class, reg.bits, reg.offset) {
            (RegisterClass::Gpr, 64, 0) => REG_TABLE_64.get(number).copied(),
            (RegisterClass::Gpr, 32, 0) => REG_TABLE_32.get(number).copied(),
            (RegisterClass::Gpr, 16, 0) => REG_TABLE_16.get(number).copied(),
            (RegisterClass::Gpr, 8, 0) => REG_TABLE_8.get(number).copied(),
            (RegisterClass::Gpr, 8, 8) => REG_TABLE_8_HIGH.get(number).copied(),
            (RegisterClass::Segment, 16, 0) => SEGMENT_REG_TABLE.get(number).copied(),
            (RegisterClass::InstructionPointer, 64, 0) => Some("rip"),
            (RegisterClass::InstructionPointer, 32, 0) => Some("eip"),
            (RegisterClass::InstructionPointer, 16, 0) => Some("ip"),
            _ => None,
        }
    }
}

impl RegisterNames for X86Registers {
    fn register_name(&self, reg: RegisterDescriptor) -> String {
        match X86Registers::lookup(reg) {
            Some(name) => name.to_string(),
            None => {
                ::tracing::debug!(?reg, "no x86 name for register descriptor");
                format!("bad_reg({:?}:{}@{}+{})", reg.class, reg.number, reg.offset, reg.bits)
            }
        }
    }
}
