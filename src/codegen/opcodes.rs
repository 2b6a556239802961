/// Stack VM opcodes emitted by the generator.
///
/// Only the subset the statement lowering and the reference expression
/// emitter produce; typed variants follow the JVM naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Constants
    Nop,
    AconstNull,
    Iconst0,
    Iconst1,

    // Stack operations
    Pop,
    Pop2,
    Dup,
    Dup2,
    Swap,

    // Conversions
    I2l,
    I2f,
    I2d,
    L2i,
    L2f,
    L2d,
    F2i,
    F2l,
    F2d,
    D2i,
    D2l,
    D2f,
    I2b,
    I2c,
    I2s,

    // Arithmetic
    Iadd,
    Ladd,
    Fadd,
    Dadd,
    Isub,
    Lsub,
    Fsub,
    Dsub,
    Imul,
    Lmul,
    Fmul,
    Dmul,
    Idiv,
    Ldiv,
    Fdiv,
    Ddiv,
    Irem,
    Lrem,
    Frem,
    Drem,
    Ineg,
    Lneg,
    Fneg,
    Dneg,

    // Bitwise
    Ishl,
    Lshl,
    Ishr,
    Lshr,
    Iushr,
    Lushr,
    Iand,
    Land,
    Ior,
    Lor,
    Ixor,
    Lxor,

    // Comparisons
    Lcmp,
    Fcmpl,
    Fcmpg,
    Dcmpl,
    Dcmpg,

    // Conditional branches
    Ifeq,
    Ifne,
    Iflt,
    Ifge,
    Ifgt,
    Ifle,
    IfIcmpeq,
    IfIcmpne,
    IfIcmplt,
    IfIcmpge,
    IfIcmpgt,
    IfIcmple,
    IfAcmpeq,
    IfAcmpne,
    Ifnull,
    Ifnonnull,

    // Unconditional branch
    Goto,

    // Returns
    Ireturn,
    Lreturn,
    Freturn,
    Dreturn,
    Areturn,
    Return,

    // Arrays
    Arraylength,
    Iaload,
    Laload,
    Faload,
    Daload,
    Aaload,
    Baload,
    Caload,
    Saload,

    // Objects
    Athrow,
    Monitorenter,
    Monitorexit,
}

impl Opcode {
    /// Branch with the opposite outcome; `None` for non-conditional opcodes
    pub fn negate(self) -> Option<Opcode> {
        use Opcode::*;
        Some(match self {
            Ifeq => Ifne,
            Ifne => Ifeq,
            Iflt => Ifge,
            Ifge => Iflt,
            Ifgt => Ifle,
            Ifle => Ifgt,
            IfIcmpeq => IfIcmpne,
            IfIcmpne => IfIcmpeq,
            IfIcmplt => IfIcmpge,
            IfIcmpge => IfIcmplt,
            IfIcmpgt => IfIcmple,
            IfIcmple => IfIcmpgt,
            IfAcmpeq => IfAcmpne,
            IfAcmpne => IfAcmpeq,
            Ifnull => Ifnonnull,
            Ifnonnull => Ifnull,
            _ => return None,
        })
    }

    /// Check if this opcode is a conditional branch
    pub fn is_conditional_branch(self) -> bool {
        self.negate().is_some()
    }

    /// Check if this opcode is a return instruction
    pub fn is_return(self) -> bool {
        matches!(
            self,
            Opcode::Ireturn | Opcode::Lreturn | Opcode::Freturn | Opcode::Dreturn | Opcode::Areturn | Opcode::Return
        )
    }

    /// Check if this opcode ends control flow
    pub fn is_terminal(self) -> bool {
        self.is_return() || matches!(self, Opcode::Athrow | Opcode::Goto)
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            AconstNull => "aconst_null",
            Iconst0 => "iconst_0",
            Iconst1 => "iconst_1",
            Pop => "pop",
            Pop2 => "pop2",
            Dup => "dup",
            Dup2 => "dup2",
            Swap => "swap",
            I2l => "i2l",
            I2f => "i2f",
            I2d => "i2d",
            L2i => "l2i",
            L2f => "l2f",
            L2d => "l2d",
            F2i => "f2i",
            F2l => "f2l",
            F2d => "f2d",
            D2i => "d2i",
            D2l => "d2l",
            D2f => "d2f",
            I2b => "i2b",
            I2c => "i2c",
            I2s => "i2s",
            Iadd => "iadd",
            Ladd => "ladd",
            Fadd => "fadd",
            Dadd => "dadd",
            Isub => "isub",
            Lsub => "lsub",
            Fsub => "fsub",
            Dsub => "dsub",
            Imul => "imul",
            Lmul => "lmul",
            Fmul => "fmul",
            Dmul => "dmul",
            Idiv => "idiv",
            Ldiv => "ldiv",
            Fdiv => "fdiv",
            Ddiv => "ddiv",
            Irem => "irem",
            Lrem => "lrem",
            Frem => "frem",
            Drem => "drem",
            Ineg => "ineg",
            Lneg => "lneg",
            Fneg => "fneg",
            Dneg => "dneg",
            Ishl => "ishl",
            Lshl => "lshl",
            Ishr => "ishr",
            Lshr => "lshr",
            Iushr => "iushr",
            Lushr => "lushr",
            Iand => "iand",
            Land => "land",
            Ior => "ior",
            Lor => "lor",
            Ixor => "ixor",
            Lxor => "lxor",
            Lcmp => "lcmp",
            Fcmpl => "fcmpl",
            Fcmpg => "fcmpg",
            Dcmpl => "dcmpl",
            Dcmpg => "dcmpg",
            Ifeq => "ifeq",
            Ifne => "ifne",
            Iflt => "iflt",
            Ifge => "ifge",
            Ifgt => "ifgt",
            Ifle => "ifle",
            IfIcmpeq => "if_icmpeq",
            IfIcmpne => "if_icmpne",
            IfIcmplt => "if_icmplt",
            IfIcmpge => "if_icmpge",
            IfIcmpgt => "if_icmpgt",
            IfIcmple => "if_icmple",
            IfAcmpeq => "if_acmpeq",
            IfAcmpne => "if_acmpne",
            Ifnull => "ifnull",
            Ifnonnull => "ifnonnull",
            Goto => "goto",
            Ireturn => "ireturn",
            Lreturn => "lreturn",
            Freturn => "freturn",
            Dreturn => "dreturn",
            Areturn => "areturn",
            Return => "return",
            Arraylength => "arraylength",
            Iaload => "iaload",
            Laload => "laload",
            Faload => "faload",
            Daload => "daload",
            Aaload => "aaload",
            Baload => "baload",
            Caload => "caload",
            Saload => "saload",
            Athrow => "athrow",
            Monitorenter => "monitorenter",
            Monitorexit => "monitorexit",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
