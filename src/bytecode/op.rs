use serde::{Deserialize, Serialize};

// =============================================================================
// OPCODE - single-byte instruction tags
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    // literals
    /// Operand: constant pool index (1 byte).
    Constant,
    Nil,
    True,
    False,

    // stack ops
    Pop,

    // variables
    /// Operand: stack slot (1 byte).
    GetLocal,
    /// Operand: stack slot (1 byte).
    SetLocal,
    /// Operand: name constant index (1 byte).
    GetGlobal,
    /// Operand: name constant index (1 byte).
    DefineGlobal,
    /// Operand: name constant index (1 byte).
    SetGlobal,

    // comparison
    Equal,
    Greater,
    Less,

    // arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,

    // I/O
    Print,

    // ==========================================================================
    // Control flow, operand is a big-endian u16 offset
    // ==========================================================================
    /// Unconditional forward jump.
    Jump,
    /// Forward jump if the top of stack is falsey. Does not pop.
    JumpIfFalse,
    /// Unconditional backward jump.
    Loop,

    Return,

    // host interaction
    Wait,
    Read,
    Write,
}

impl OpCode {
    const ALL: [OpCode; 27] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Pop,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::GetGlobal,
        OpCode::DefineGlobal,
        OpCode::SetGlobal,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Print,
        OpCode::Jump,
        OpCode::JumpIfFalse,
        OpCode::Loop,
        OpCode::Return,
        OpCode::Wait,
        OpCode::Read,
        OpCode::Write,
    ];

    /// Number of operand bytes following the opcode.
    pub fn operand_len(self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetGlobal
            | OpCode::DefineGlobal
            | OpCode::SetGlobal => 1,
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => 2,
            _ => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Nil => "OP_NIL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Pop => "OP_POP",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Print => "OP_PRINT",
            OpCode::Jump => "OP_JUMP",
            OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
            OpCode::Loop => "OP_LOOP",
            OpCode::Return => "OP_RETURN",
            OpCode::Wait => "OP_WAIT",
            OpCode::Read => "OP_READ",
            OpCode::Write => "OP_WRITE",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    /// Decodes an opcode byte, handing back the byte itself when unknown.
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL.get(byte as usize).copied().ok_or(byte)
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_encoding_matches_table_order() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(u8::from(*op) as usize, i, "{} out of place", op);
            assert_eq!(OpCode::try_from(i as u8), Ok(*op));
        }
    }

    #[test]
    fn test_unknown_byte() {
        assert_eq!(OpCode::try_from(200), Err(200));
        assert_eq!(OpCode::try_from(OpCode::ALL.len() as u8), Err(27));
    }

    #[test]
    fn test_operand_lengths() {
        assert_eq!(OpCode::Constant.operand_len(), 1);
        assert_eq!(OpCode::SetGlobal.operand_len(), 1);
        assert_eq!(OpCode::JumpIfFalse.operand_len(), 2);
        assert_eq!(OpCode::Loop.operand_len(), 2);
        assert_eq!(OpCode::Write.operand_len(), 0);
        assert_eq!(OpCode::Return.operand_len(), 0);
    }
}
