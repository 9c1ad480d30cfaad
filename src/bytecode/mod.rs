pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod op;

pub use chunk::Chunk;
pub use compile::compile;
pub use compile_error::{CompileError, CompileFailed};
pub use op::OpCode;
