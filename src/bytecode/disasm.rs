use crate::bytecode::{Chunk, OpCode};

/// The decoded operand of one instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    /// Constant index, local slot or global name index.
    Byte(u8),
    /// Raw 16-bit offset and the absolute code offset it resolves to.
    Jump { offset: u16, target: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub line: usize,
    pub op: OpCode,
    pub operand: Operand,
}

impl Instruction {
    /// Encoded size in bytes, opcode included.
    pub fn size(&self) -> usize {
        1 + self.op.operand_len()
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.operand, Operand::Jump { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    UnknownOpcode { offset: usize, byte: u8 },
    Truncated { offset: usize, op: OpCode },
    /// A backward jump that would land before the start of the chunk.
    JumpOutOfRange { offset: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnknownOpcode { offset, byte } => {
                write!(f, "Unknown opcode {} at {:04}", byte, offset)
            }
            DecodeError::Truncated { offset, op } => {
                write!(f, "Truncated {} at {:04}", op, offset)
            }
            DecodeError::JumpOutOfRange { offset } => {
                write!(f, "Jump out of range at {:04}", offset)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode the instruction starting at `offset`.
pub fn decode_instruction(chunk: &Chunk, offset: usize) -> Result<Instruction, DecodeError> {
    let byte = chunk
        .byte(offset)
        .ok_or(DecodeError::UnknownOpcode { offset, byte: 0 })?;
    let op = OpCode::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { offset, byte })?;
    let truncated = DecodeError::Truncated { offset, op };

    let operand = match op {
        OpCode::Constant
        | OpCode::GetLocal
        | OpCode::SetLocal
        | OpCode::GetGlobal
        | OpCode::DefineGlobal
        | OpCode::SetGlobal => Operand::Byte(chunk.byte(offset + 1).ok_or(truncated)?),
        OpCode::Jump | OpCode::JumpIfFalse => {
            let jump = chunk.read_u16(offset + 1).ok_or(truncated)?;
            Operand::Jump {
                offset: jump,
                target: offset + 3 + jump as usize,
            }
        }
        OpCode::Loop => {
            let jump = chunk.read_u16(offset + 1).ok_or(truncated)?;
            let target = (offset + 3)
                .checked_sub(jump as usize)
                .ok_or(DecodeError::JumpOutOfRange { offset })?;
            Operand::Jump {
                offset: jump,
                target,
            }
        }
        _ => Operand::None,
    };

    Ok(Instruction {
        offset,
        line: chunk.line(offset).unwrap_or(0),
        op,
        operand,
    })
}

/// Decode a whole chunk front to back.
pub fn decode(chunk: &Chunk) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut offset = 0;

    while offset < chunk.len() {
        let instruction = decode_instruction(chunk, offset)?;
        offset += instruction.size();
        instructions.push(instruction);
    }

    Ok(instructions)
}

/// Offsets that some jump lands on, sorted and deduplicated.
pub fn jump_targets(instructions: &[Instruction]) -> Vec<usize> {
    let mut targets: Vec<usize> = instructions
        .iter()
        .filter_map(|i| match i.operand {
            Operand::Jump { target, .. } => Some(target),
            _ => None,
        })
        .collect();

    targets.sort_unstable();
    targets.dedup();
    targets
}

fn render(chunk: &Chunk, instruction: &Instruction, previous_line: Option<usize>) -> String {
    let mut out = format!("{:04} ", instruction.offset);

    if previous_line == Some(instruction.line) {
        out.push_str("   | ");
    } else {
        out.push_str(&format!("{:4} ", instruction.line));
    }

    let name = instruction.op.mnemonic();
    match instruction.operand {
        Operand::None => out.push_str(name),
        Operand::Byte(arg) => match instruction.op {
            OpCode::GetLocal | OpCode::SetLocal => {
                out.push_str(&format!("{:<16} {:4}", name, arg));
            }
            _ => {
                let constant = chunk
                    .constant(arg as usize)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "<bad constant>".to_string());
                out.push_str(&format!("{:<16} {:4} '{}'", name, arg, constant));
            }
        },
        Operand::Jump { target, .. } => {
            out.push_str(&format!("{:<16} {:4} -> {}", name, instruction.offset, target));
        }
    }

    out
}

/// Render the instruction at `offset` and return it with the next offset.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let previous_line = offset.checked_sub(1).and_then(|o| chunk.line(o));

    match decode_instruction(chunk, offset) {
        Ok(instruction) => {
            let next = offset + instruction.size();
            (render(chunk, &instruction, previous_line), next)
        }
        Err(e) => (format!("{:04} {}", offset, e), offset + 1),
    }
}

/// Render a whole chunk under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {} ==", name);
    let mut offset = 0;

    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push('\n');
        out.push_str(&line);
        offset = next;
    }

    out
}

/// Print a chunk with jump landing sites marked.
pub fn print_chunk(chunk: &Chunk, name: &str) {
    println!("════════════════════════════════════════");
    println!(" {}", name);
    println!(" {} bytes, {} constants", chunk.len(), chunk.constants().len());
    println!("════════════════════════════════════════");

    let instructions = match decode(chunk) {
        Ok(instructions) => instructions,
        Err(e) => {
            println!("{}", disassemble_chunk(chunk, name));
            println!("; {}", e);
            return;
        }
    };

    let targets = jump_targets(&instructions);
    let mut previous_line = None;

    for instruction in &instructions {
        let marker = if targets.contains(&instruction.offset) {
            println!("      ┌──────────────────────────────────");
            "► "
        } else {
            "  "
        };

        println!("{}{}", marker, render(chunk, instruction, previous_line));
        previous_line = Some(instruction.line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::value::Value;

    fn sample() -> Chunk {
        // 0: CONSTANT 0        line 1
        // 2: JUMP_IF_FALSE 1   line 1
        // 5: POP               line 2
        // 6: LOOP 9            line 2
        // 9: RETURN            line 3
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.5)) as u8;
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(idx, 1);
        chunk.write_op(OpCode::JumpIfFalse, 1);
        chunk.write(0, 1);
        chunk.write(1, 1);
        chunk.write_op(OpCode::Pop, 2);
        chunk.write_op(OpCode::Loop, 2);
        chunk.write(0, 2);
        chunk.write(9, 2);
        chunk.write_op(OpCode::Return, 3);
        chunk
    }

    #[test]
    fn test_decode_walks_every_instruction() {
        let insts = decode(&sample()).unwrap();
        let ops: Vec<OpCode> = insts.iter().map(|i| i.op).collect();
        assert_eq!(
            ops,
            vec![
                OpCode::Constant,
                OpCode::JumpIfFalse,
                OpCode::Pop,
                OpCode::Loop,
                OpCode::Return
            ]
        );
        assert_eq!(insts[0].operand, Operand::Byte(0));
        assert_eq!(
            insts[1].operand,
            Operand::Jump {
                offset: 1,
                target: 6
            }
        );
        assert_eq!(
            insts[3].operand,
            Operand::Jump {
                offset: 9,
                target: 0
            }
        );
        assert_eq!(insts[4].line, 3);
    }

    #[test]
    fn test_jump_targets() {
        let insts = decode(&sample()).unwrap();
        assert_eq!(jump_targets(&insts), vec![0, 6]);
    }

    #[test]
    fn test_disassemble_chunk_format() {
        let text = disassemble_chunk(&sample(), "test");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "== test ==");
        assert_eq!(lines[1], "0000    1 OP_CONSTANT         0 '1.5'");
        assert_eq!(lines[2], "0002    | OP_JUMP_IF_FALSE    2 -> 6");
        assert_eq!(lines[3], "0005    2 OP_POP");
        assert_eq!(lines[4], "0006    | OP_LOOP             6 -> 0");
        assert_eq!(lines[5], "0009    3 OP_RETURN");
    }

    #[test]
    fn test_local_slot_has_no_constant() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::GetLocal, 1);
        chunk.write(3, 1);
        let (text, next) = disassemble_instruction(&chunk, 0);
        assert_eq!(text, "0000    1 OP_GET_LOCAL        3");
        assert_eq!(next, 2);
    }

    #[test]
    fn test_unknown_opcode() {
        let mut chunk = Chunk::new();
        chunk.write(250, 1);
        assert_eq!(
            decode(&chunk),
            Err(DecodeError::UnknownOpcode {
                offset: 0,
                byte: 250
            })
        );
        let (text, next) = disassemble_instruction(&chunk, 0);
        assert_eq!(text, "0000 Unknown opcode 250 at 0000");
        assert_eq!(next, 1);
    }

    #[test]
    fn test_truncated_operand() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Jump, 1);
        chunk.write(0, 1);
        assert_eq!(
            decode(&chunk),
            Err(DecodeError::Truncated {
                offset: 0,
                op: OpCode::Jump
            })
        );
    }

    #[test]
    fn test_loop_before_start() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Loop, 1);
        chunk.write(0, 1);
        chunk.write(10, 1);
        assert_eq!(
            decode(&chunk),
            Err(DecodeError::JumpOutOfRange { offset: 0 })
        );
    }
}
