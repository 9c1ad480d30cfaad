use crate::bytecode::{Chunk, OpCode, compile::compile, disasm::disassemble_instruction};
use crate::lang::value::Value;
use crate::runtime::host::{Device, LogSink, NullDevice, StdoutSink};
use crate::runtime::runtime_error::{
    RuntimeError, bad_add_operands, operand_must_be_number, operands_must_be_numbers,
    stack_underflow, undefined_variable,
};
use log::{Level, debug, log_enabled, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a step, a run or a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpretResult {
    /// Not finished; more steps may follow.
    Stepping,
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretResult {
    pub fn is_terminal(self) -> bool {
        self != InterpretResult::Stepping
    }
}

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Instruction budget for one loaded chunk.
    pub max_steps: Option<usize>,
    pub max_stack_size: usize,
    /// Log every instruction and the stack at `trace` level.
    pub trace_execution: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_steps: None,
            max_stack_size: 10_000,
            trace_execution: false,
        }
    }
}

/// Observable machine state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stack: Vec<Value>,
    /// Sorted by name.
    pub globals: Vec<(String, Value)>,
    pub ip: usize,
    pub state: InterpretResult,
    pub returned: Option<Value>,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Stack machine executing one [`Chunk`] at a time.
///
/// Execution is driven either to completion with [`Vm::run`] or one
/// instruction at a time with [`Vm::step`]. Both share the same step, so
/// they observe identical effects.
pub struct Vm<L: LogSink = StdoutSink, D: Device = NullDevice> {
    chunk: Option<Chunk>,
    ip: usize,
    stack: Vec<Value>,
    globals: HashMap<String, Value>,
    state: InterpretResult,
    last_op: Option<OpCode>,
    returned: Option<Value>,
    // Safety limits
    config: VmConfig,
    steps: usize,
    sink: L,
    device: D,
}

impl<L: LogSink, D: Device> Vm<L, D> {
    pub fn new(sink: L, device: D) -> Self {
        Self::with_config(VmConfig::default(), sink, device)
    }

    pub fn with_config(config: VmConfig, sink: L, device: D) -> Self {
        Self {
            chunk: None,
            ip: 0,
            stack: Vec::new(),
            globals: HashMap::new(),
            state: InterpretResult::Stepping,
            last_op: None,
            returned: None,
            config,
            steps: 0,
            sink,
            device,
        }
    }

    // =========================================================================
    // Loading and driving
    // =========================================================================

    /// Compile `source` and run it to completion.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        match self.load(source) {
            InterpretResult::Stepping => self.run(),
            other => other,
        }
    }

    /// Compile `source` and make it the current chunk without executing
    /// anything. Compile errors are reported through the log sink.
    pub fn load(&mut self, source: &str) -> InterpretResult {
        match compile(source) {
            Ok(chunk) => self.load_chunk(chunk),
            Err(failed) => {
                for error in &failed.errors {
                    self.sink.log(&error.to_string());
                }
                self.chunk = None;
                self.reset_execution_state();
                self.state = InterpretResult::CompileError;
                self.state
            }
        }
    }

    /// Make `chunk` current. Globals survive; everything else is reset.
    pub fn load_chunk(&mut self, chunk: Chunk) -> InterpretResult {
        debug!(
            "loaded chunk: {} bytes, {} constants",
            chunk.len(),
            chunk.constants().len()
        );

        self.chunk = Some(chunk);
        self.reset_execution_state();
        self.state = InterpretResult::Stepping;
        self.state
    }

    /// Forget everything about the previous run except globals.
    fn reset_execution_state(&mut self) {
        self.ip = 0;
        self.stack.clear();
        self.steps = 0;
        self.last_op = None;
        self.returned = None;
    }

    pub fn run(&mut self) -> InterpretResult {
        loop {
            let result = self.step();
            if result.is_terminal() {
                return result;
            }
        }
    }

    /// Execute exactly one instruction.
    ///
    /// A failing instruction leaves the stack as it was before the step and
    /// the instruction pointer on the failing instruction. Once a terminal
    /// result is reached, further calls return it again.
    pub fn step(&mut self) -> InterpretResult {
        if self.state.is_terminal() {
            return self.state;
        }

        let start = self.ip;
        match self.execute_instruction() {
            Ok(state) => self.state = state,
            Err(error) => {
                self.ip = start;
                let line = self
                    .chunk
                    .as_ref()
                    .and_then(|chunk| chunk.line(start))
                    .unwrap_or(0);
                self.runtime_error(error.at_line(line));
            }
        }

        self.state
    }

    fn runtime_error(&mut self, error: RuntimeError) {
        debug!("runtime error at line {}: {}", error.line, error.message);
        self.sink.log(&error.message);
        self.sink.log(&format!("[line {}] in script", error.line));
        self.state = InterpretResult::RuntimeError;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn globals(&self) -> &HashMap<String, Value> {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn state(&self) -> InterpretResult {
        self.state
    }

    /// The opcode of the most recently executed instruction.
    pub fn last_op(&self) -> Option<OpCode> {
        self.last_op
    }

    /// The value `RETURN` popped, if the stack held one.
    pub fn returned(&self) -> Option<&Value> {
        self.returned.as_ref()
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn chunk(&self) -> Option<&Chunk> {
        self.chunk.as_ref()
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn sink(&self) -> &L {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut L {
        &mut self.sink
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_parts(self) -> (L, D) {
        (self.sink, self.device)
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut globals: Vec<(String, Value)> = self
            .globals
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        globals.sort_by(|a, b| a.0.cmp(&b.0));

        Snapshot {
            stack: self.stack.clone(),
            globals,
            ip: self.ip,
            state: self.state,
            returned: self.returned.clone(),
        }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::new(&format!(
                    "execution step limit exceeded ({})",
                    max
                )));
            }
        }

        Ok(())
    }

    fn trace_instruction(&self) {
        if !self.config.trace_execution || !log_enabled!(Level::Trace) {
            return;
        }
        let Some(chunk) = &self.chunk else {
            return;
        };

        let stack: String = self.stack.iter().map(|v| format!("[ {} ]", v)).collect();
        trace!("          {}", stack);
        trace!("{}", disassemble_instruction(chunk, self.ip).0);
    }

    fn execute_instruction(&mut self) -> Result<InterpretResult, RuntimeError> {
        if self.chunk.is_none() {
            return Err(RuntimeError::new("No chunk loaded."));
        }

        self.check_limits()?;
        self.trace_instruction();

        let byte = self.read_byte()?;
        let op = OpCode::try_from(byte)
            .map_err(|byte| RuntimeError::new(&format!("Unknown opcode {}.", byte)))?;
        self.last_op = Some(op);

        match op {
            OpCode::Constant => {
                let value = self.read_constant()?;
                self.push(value)?;
            }
            OpCode::Nil => self.push(Value::Nil)?,
            OpCode::True => self.push(Value::Bool(true))?,
            OpCode::False => self.push(Value::Bool(false))?,
            OpCode::Pop => {
                self.pop()?;
            }

            OpCode::GetLocal => {
                let slot = self.read_byte()? as usize;
                let value = self.slot(slot)?.clone();
                self.push(value)?;
            }
            OpCode::SetLocal => {
                let slot = self.read_byte()? as usize;
                let value = self.peek(0)?.clone();
                *self.slot_mut(slot)? = value;
            }
            OpCode::GetGlobal => {
                let name = self.read_name()?;
                let value = self
                    .globals
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| undefined_variable(&name))?;
                self.push(value)?;
            }
            OpCode::DefineGlobal => {
                let name = self.read_name()?;
                let value = self.peek(0)?.clone();
                self.globals.insert(name, value);
                self.pop()?;
            }
            OpCode::SetGlobal => {
                let name = self.read_name()?;
                let value = self.peek(0)?.clone();
                match self.globals.get_mut(&name) {
                    Some(slot) => *slot = value,
                    None => return Err(undefined_variable(&name)),
                }
            }

            OpCode::Equal => {
                let (a, b) = self.pop_pair()?;
                self.push(Value::Bool(a == b))?;
            }
            OpCode::Greater => self.binary_number(|a, b| Value::Bool(a > b))?,
            OpCode::Less => self.binary_number(|a, b| Value::Bool(a < b))?,

            OpCode::Add => {
                let b = self.peek(0)?;
                let a = self.peek(1)?;
                let result = if a.is_string() && b.is_string() {
                    let mut joined = String::with_capacity(a.as_str().len() + b.as_str().len());
                    joined.push_str(a.as_str());
                    joined.push_str(b.as_str());
                    Value::string(joined)
                } else if a.is_number() && b.is_number() {
                    Value::Number(a.as_number() + b.as_number())
                } else {
                    return Err(bad_add_operands());
                };
                self.pop_pair()?;
                self.push(result)?;
            }
            OpCode::Subtract => self.binary_number(|a, b| Value::Number(a - b))?,
            OpCode::Multiply => self.binary_number(|a, b| Value::Number(a * b))?,
            OpCode::Divide => self.binary_number(|a, b| Value::Number(a / b))?,
            OpCode::Not => {
                let value = self.pop()?;
                self.push(Value::Bool(value.is_falsey()))?;
            }
            OpCode::Negate => {
                if !self.peek(0)?.is_number() {
                    return Err(operand_must_be_number());
                }
                let n = self.pop()?.as_number();
                self.push(Value::Number(-n))?;
            }

            OpCode::Print => {
                let value = self.pop()?;
                self.sink.log(&value.to_string());
            }

            OpCode::Jump => {
                let offset = self.read_u16()? as usize;
                self.ip += offset;
            }
            OpCode::JumpIfFalse => {
                let offset = self.read_u16()? as usize;
                if self.peek(0)?.is_falsey() {
                    self.ip += offset;
                }
            }
            OpCode::Loop => {
                let offset = self.read_u16()? as usize;
                self.ip = self
                    .ip
                    .checked_sub(offset)
                    .ok_or_else(|| RuntimeError::new("Loop jumps before start of chunk."))?;
            }

            OpCode::Return => {
                self.returned = self.stack.pop();
                return Ok(InterpretResult::Ok);
            }

            OpCode::Wait => self.device.wait(),
            OpCode::Read => {
                if !self.peek(0)?.is_number() {
                    return Err(operand_must_be_number());
                }
                let port = self.pop()?.as_number();
                let input = self.device.read(port);
                self.push(Value::Number(input))?;
            }
            OpCode::Write => {
                if self.stack.len() < 3 {
                    return Err(stack_underflow());
                }
                if !self.stack[self.stack.len() - 3..].iter().all(Value::is_number) {
                    return Err(operands_must_be_numbers());
                }
                let b = self.pop()?.as_number();
                let a = self.pop()?.as_number();
                let port = self.pop()?.as_number();
                self.device.send(port, a, b);
            }
        }

        Ok(InterpretResult::Stepping)
    }

    // =========================================================================
    // Operand decoding
    // =========================================================================

    fn current_chunk(&self) -> Result<&Chunk, RuntimeError> {
        self.chunk
            .as_ref()
            .ok_or_else(|| RuntimeError::new("No chunk loaded."))
    }

    fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        let byte = self
            .current_chunk()?
            .byte(self.ip)
            .ok_or_else(|| RuntimeError::new("Instruction pointer ran past the end of the chunk."))?;
        self.ip += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, RuntimeError> {
        let value = self
            .current_chunk()?
            .read_u16(self.ip)
            .ok_or_else(|| RuntimeError::new("Truncated jump operand."))?;
        self.ip += 2;
        Ok(value)
    }

    fn read_constant(&mut self) -> Result<Value, RuntimeError> {
        let index = self.read_byte()? as usize;
        self.current_chunk()?
            .constant(index)
            .cloned()
            .ok_or_else(|| RuntimeError::new(&format!("Bad constant index {}.", index)))
    }

    fn read_name(&mut self) -> Result<String, RuntimeError> {
        let value = self.read_constant()?;
        if !value.is_string() {
            return Err(RuntimeError::new("Variable name constant is not a string."));
        }
        Ok(value.as_str().to_string())
    }

    // =========================================================================
    // Stack
    // =========================================================================

    /// Fails before growing past `max_stack_size`, so the error belongs to
    /// the instruction doing the push.
    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_stack_size {
            return Err(RuntimeError::new(&format!(
                "stack size limit exceeded ({})",
                self.config.max_stack_size
            )));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    /// Pops `b` then `a`, returned in push order. Fails without popping
    /// anything when fewer than two values are present.
    fn pop_pair(&mut self) -> Result<(Value, Value), RuntimeError> {
        if self.stack.len() < 2 {
            return Err(stack_underflow());
        }
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    /// `depth` counts from the top; 0 is the top value.
    fn peek(&self, depth: usize) -> Result<&Value, RuntimeError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or_else(stack_underflow)
    }

    fn slot(&self, slot: usize) -> Result<&Value, RuntimeError> {
        self.stack
            .get(slot)
            .ok_or_else(|| RuntimeError::new(&format!("Bad local slot {}.", slot)))
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Value, RuntimeError> {
        self.stack
            .get_mut(slot)
            .ok_or_else(|| RuntimeError::new(&format!("Bad local slot {}.", slot)))
    }

    fn binary_number(&mut self, f: impl FnOnce(f64, f64) -> Value) -> Result<(), RuntimeError> {
        let b = self.peek(0)?;
        let a = self.peek(1)?;
        if !a.is_number() || !b.is_number() {
            return Err(operands_must_be_numbers());
        }

        let (a, b) = self.pop_pair()?;
        self.push(f(a.as_number(), b.as_number()))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new(StdoutSink, NullDevice)
    }
}
