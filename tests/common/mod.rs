//! Shared helpers for integration tests.

#![allow(dead_code)]

use kotolang::runtime::{InterpretResult, MemorySink, RecordingDevice, Snapshot, Vm};

pub type TestVm = Vm<MemorySink, RecordingDevice>;

pub fn new_vm() -> TestVm {
    Vm::new(MemorySink::new(), RecordingDevice::new())
}

/// Run source to completion and return the result plus every logged line
pub fn run(source: &str) -> (InterpretResult, Vec<String>) {
    let mut vm = new_vm();
    let result = vm.interpret(source);
    (result, vm.sink().lines.clone())
}

/// Run source that must succeed and return its output
pub fn run_ok(source: &str) -> Vec<String> {
    let (result, lines) = run(source);
    assert_eq!(result, InterpretResult::Ok, "source: {}\noutput: {:?}", source, lines);
    lines
}

/// Run source one instruction at a time, returning the final state
pub fn run_stepped(source: &str) -> (InterpretResult, Snapshot, Vec<String>) {
    let mut vm = new_vm();
    let mut result = vm.load(source);
    while result == InterpretResult::Stepping {
        result = vm.step();
    }
    (result, vm.snapshot(), vm.sink().lines.clone())
}

/// Run source with `run`, returning the final state
pub fn run_whole(source: &str) -> (InterpretResult, Snapshot, Vec<String>) {
    let mut vm = new_vm();
    let result = vm.interpret(source);
    (result, vm.snapshot(), vm.sink().lines.clone())
}
