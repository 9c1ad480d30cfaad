//! Collaborators the VM talks to: where output lines go and the device
//! behind the `wait`, `read` and `write` statements.
//!
//! Both are called synchronously from inside a step. Implementations must
//! not block and must not call back into the VM.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Receives one formatted line at a time: printed values and diagnostics.
pub trait LogSink {
    fn log(&mut self, line: &str);
}

impl<T: LogSink + ?Sized> LogSink for &mut T {
    fn log(&mut self, line: &str) {
        (**self).log(line);
    }
}

impl<T: LogSink + ?Sized> LogSink for Box<T> {
    fn log(&mut self, line: &str) {
        (**self).log(line);
    }
}

/// Writes each line to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogSink for MemorySink {
    fn log(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// The host device or simulation driven by the script.
pub trait Device {
    /// `write port, a, b;`
    fn send(&mut self, port: f64, a: f64, b: f64);

    /// `wait;`. Pacing belongs to the driver, so this is usually a no-op.
    fn wait(&mut self) {}

    /// `read port`
    fn read(&mut self, _port: f64) -> f64 {
        0.0
    }
}

impl<T: Device + ?Sized> Device for &mut T {
    fn send(&mut self, port: f64, a: f64, b: f64) {
        (**self).send(port, a, b);
    }

    fn wait(&mut self) {
        (**self).wait();
    }

    fn read(&mut self, port: f64) -> f64 {
        (**self).read(port)
    }
}

impl<T: Device + ?Sized> Device for Box<T> {
    fn send(&mut self, port: f64, a: f64, b: f64) {
        (**self).send(port, a, b);
    }

    fn wait(&mut self) {
        (**self).wait();
    }

    fn read(&mut self, port: f64) -> f64 {
        (**self).read(port)
    }
}

/// Ignores writes and reads zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDevice;

impl Device for NullDevice {
    fn send(&mut self, _port: f64, _a: f64, _b: f64) {}
}

/// Records every interaction; reads are served from a queue of inputs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingDevice {
    pub sent: Vec<(f64, f64, f64)>,
    pub waits: usize,
    pub reads: Vec<f64>,
    pub inputs: VecDeque<f64>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(inputs: impl IntoIterator<Item = f64>) -> Self {
        RecordingDevice {
            inputs: inputs.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Device for RecordingDevice {
    fn send(&mut self, port: f64, a: f64, b: f64) {
        self.sent.push((port, a, b));
    }

    fn wait(&mut self) {
        self.waits += 1;
    }

    fn read(&mut self, port: f64) -> f64 {
        self.reads.push(port);
        self.inputs.pop_front().unwrap_or(0.0)
    }
}

/// Console stand-in for real hardware, used by the CLI.
///
/// Writes are echoed to stderr. Reads prompt on stdin and fall back to 0
/// when the input is not a number.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDevice;

impl Device for ConsoleDevice {
    fn send(&mut self, port: f64, a: f64, b: f64) {
        eprintln!("[device] write port {} <- {}, {}", port, a, b);
    }

    fn wait(&mut self) {
        log::debug!("device wait");
    }

    fn read(&mut self, port: f64) -> f64 {
        eprint!("[device] read port {}> ", port);
        io::stderr().flush().ok();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line.trim().parse().unwrap_or(0.0),
            Err(e) => {
                log::warn!("device read failed: {}", e);
                0.0
            }
        }
    }
}
