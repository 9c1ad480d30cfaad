/// An error raised while executing a chunk. Ends the run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    /// Source line of the failing instruction, 0 when unknown.
    pub line: usize,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n[line {}] in script", self.message, self.line)
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn new(msg: &str) -> Self {
        RuntimeError {
            message: msg.to_string(),
            line: 0,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

pub fn stack_underflow() -> RuntimeError {
    RuntimeError::new("Stack underflow.")
}

pub fn undefined_variable(name: &str) -> RuntimeError {
    RuntimeError::new(&format!("Undefined variable '{}'.", name))
}

pub fn operands_must_be_numbers() -> RuntimeError {
    RuntimeError::new("Operands must be numbers.")
}

pub fn operand_must_be_number() -> RuntimeError {
    RuntimeError::new("Operand must be a number.")
}

pub fn bad_add_operands() -> RuntimeError {
    RuntimeError::new("Operands must be two numbers or two strings.")
}
