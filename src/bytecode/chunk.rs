use crate::bytecode::OpCode;
use crate::lang::value::Value;
use serde::{Deserialize, Serialize};

/// A compiled unit: encoded instructions, their constant pool, and one
/// source line per code byte.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chunk {
    code: Vec<u8>,
    constants: Vec<Value>,
    lines: Vec<usize>,
}

impl Chunk {
    /// Constant pool indices are encoded in a single byte.
    pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op.into(), line);
    }

    /// Appends a constant and returns its pool index.
    ///
    /// The pool itself is unbounded; callers reject indices that do not fit
    /// in an operand byte.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Overwrites a previously emitted 16-bit operand (big-endian).
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = self.byte(offset)?;
        let lo = self.byte(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    pub fn constant(&self, index: usize) -> Option<&Value> {
        self.constants.get(index)
    }

    pub fn line(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_tracks_lines() {
        let mut chunk = Chunk::new();
        assert!(chunk.is_empty());
        chunk.write_op(OpCode::Nil, 1);
        chunk.write_op(OpCode::Pop, 2);
        chunk.write_op(OpCode::Return, 2);

        assert!(!chunk.is_empty());
        assert_eq!(chunk.len(), 3);
        assert_eq!(chunk.code(), &[1, 4, 23]);
        assert_eq!(chunk.lines(), &[1, 2, 2]);
        assert_eq!(chunk.line(1), Some(2));
        assert_eq!(chunk.line(3), None);
    }

    #[test]
    fn test_add_constant_returns_index() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::string("x")), 1);
        assert_eq!(chunk.constant(1), Some(&Value::string("x")));
        assert_eq!(chunk.constant(2), None);
    }

    #[test]
    fn test_patch_and_read_u16() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Jump, 1);
        chunk.write(0xff, 1);
        chunk.write(0xff, 1);
        assert_eq!(chunk.read_u16(1), Some(0xffff));

        chunk.patch_u16(1, 0x0102);
        assert_eq!(chunk.code(), &[20, 0x01, 0x02]);
        assert_eq!(chunk.read_u16(1), Some(258));
        assert_eq!(chunk.read_u16(2), None);
    }
}
