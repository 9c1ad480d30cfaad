use crate::bytecode::OpCode;
use crate::runtime::host::{Device, LogSink};
use crate::runtime::vm::{InterpretResult, Vm};
use log::debug;
use std::time::Duration;

/// Drives a [`Vm`] one instruction per tick with a pause between ticks.
///
/// The VM never blocks; a `wait` in the script only shows up here, as an
/// extra pause after the instruction that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacedDriver {
    /// Pause after every instruction.
    pub interval: Duration,
    /// Extra pause after a `WAIT`.
    pub wait_interval: Duration,
}

impl Default for PacedDriver {
    fn default() -> Self {
        PacedDriver {
            interval: Duration::ZERO,
            wait_interval: Duration::from_millis(100),
        }
    }
}

impl PacedDriver {
    pub fn new(interval: Duration) -> Self {
        PacedDriver {
            interval,
            ..Self::default()
        }
    }

    pub fn with_wait_interval(mut self, wait_interval: Duration) -> Self {
        self.wait_interval = wait_interval;
        self
    }

    /// How long to pause after an instruction.
    pub fn pause_after(&self, op: Option<OpCode>) -> Duration {
        match op {
            Some(OpCode::Wait) => self.interval + self.wait_interval,
            _ => self.interval,
        }
    }

    /// Step until a terminal result, sleeping the thread between steps.
    pub fn drive<L: LogSink, D: Device>(&self, vm: &mut Vm<L, D>) -> InterpretResult {
        self.drive_with(vm, |pause| {
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
            true
        })
    }

    /// Step until a terminal result, handing each pause to `pause`.
    ///
    /// Returning `false` from `pause` stops driving; the VM is left between
    /// two instructions and the result is [`InterpretResult::Stepping`].
    pub fn drive_with<L: LogSink, D: Device>(
        &self,
        vm: &mut Vm<L, D>,
        mut pause: impl FnMut(Duration) -> bool,
    ) -> InterpretResult {
        let mut ticks = 0usize;

        loop {
            let result = vm.step();
            ticks += 1;

            if result.is_terminal() {
                debug!("driver finished after {} ticks: {:?}", ticks, result);
                return result;
            }

            if !pause(self.pause_after(vm.last_op())) {
                debug!("driver cancelled after {} ticks", ticks);
                return InterpretResult::Stepping;
            }
        }
    }
}
