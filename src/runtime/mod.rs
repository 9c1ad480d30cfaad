pub mod driver;
pub mod host;
pub mod runtime_error;
pub mod vm;

pub use driver::PacedDriver;
pub use host::{ConsoleDevice, Device, LogSink, MemorySink, NullDevice, RecordingDevice, StdoutSink};
pub use runtime_error::RuntimeError;
pub use vm::{InterpretResult, Snapshot, Vm, VmConfig};
