//! # kotolang
//!
//! A small scripting language for driving a host device: a scanner, a
//! single-pass compiler to bytecode and a stack VM that can run a script to
//! completion or one instruction at a time under an external driver.
//!
//! ```
//! use kotolang::runtime::{InterpretResult, MemorySink, NullDevice, Vm};
//!
//! let mut vm = Vm::new(MemorySink::new(), NullDevice);
//! assert_eq!(vm.interpret("print 1 + 2 * 3;"), InterpretResult::Ok);
//! assert_eq!(vm.sink().lines, vec!["7"]);
//! ```

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

pub use bytecode::{Chunk, CompileError, CompileFailed, OpCode, compile};
pub use lang::Value;
pub use runtime::{Device, InterpretResult, LogSink, RuntimeError, Vm, VmConfig};
