use log::{debug, log_enabled, Level};

use crate::{
    bytecode::{
        Chunk, OpCode,
        compile_error::{CompileError, CompileFailed},
        disasm::disassemble_chunk,
    },
    frontend::{
        lexer::Lexer,
        token::{Token, TokenKind},
    },
    lang::value::Value,
};

/// Local slots are addressed by a single operand byte.
const MAX_LOCALS: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! - read
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// The next-higher level, used for left-associative binary operators.
    fn next(self) -> Self {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call | Primary => Primary,
        }
    }
}

type ParseFn<'src> = fn(&mut Compiler<'src>, bool);

struct ParseRule<'src> {
    prefix: Option<ParseFn<'src>>,
    infix: Option<ParseFn<'src>>,
    precedence: Precedence,
}

struct Parser<'src> {
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
}

struct Local<'src> {
    name: &'src str,
    /// `None` while the variable's initializer is still being compiled.
    depth: Option<usize>,
}

/// Single-pass compiler: pulls tokens from the lexer and emits bytecode
/// straight into a [`Chunk`], with no intermediate syntax tree.
pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    parser: Parser<'src>,
    chunk: Chunk,
    locals: Vec<Local<'src>>,
    scope_depth: usize,
    errors: Vec<CompileError>,
}

/// Compile `source` into a chunk ready for the VM.
pub fn compile(source: &str) -> Result<Chunk, CompileFailed> {
    Compiler::new(source).compile()
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source),
            parser: Parser {
                previous: Token::synthetic(""),
                current: Token::synthetic(""),
                had_error: false,
                panic_mode: false,
            },
            chunk: Chunk::new(),
            locals: Vec::with_capacity(MAX_LOCALS),
            scope_depth: 0,
            errors: Vec::new(),
        }
    }

    pub fn compile(mut self) -> Result<Chunk, CompileFailed> {
        self.advance();

        while !self.matches(TokenKind::Eof) {
            self.declaration();
        }

        self.end_compiler();

        if self.parser.had_error {
            debug!("compilation failed with {} error(s)", self.errors.len());
            Err(CompileFailed {
                errors: self.errors,
            })
        } else {
            Ok(self.chunk)
        }
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    fn advance(&mut self) {
        self.parser.previous = self.parser.current;

        loop {
            self.parser.current = self.lexer.next_token();
            if self.parser.current.kind != TokenKind::Error {
                break;
            }

            let message = self.parser.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.parser.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // =========================================================================
    // Error reporting
    // =========================================================================

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;
        self.parser.had_error = true;
        self.errors.push(CompileError::at(&token, message));
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.parser.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.parser.current, message);
    }

    /// Skip tokens until a statement boundary so one mistake is reported once.
    fn synchronize(&mut self) {
        self.parser.panic_mode = false;

        while self.parser.current.kind != TokenKind::Eof {
            if self.parser.previous.kind == TokenKind::Semicolon {
                return;
            }
            if self.parser.current.kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit_byte(&mut self, byte: u8) {
        let line = self.parser.previous.line;
        self.chunk.write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_ops(&mut self, a: OpCode, b: OpCode) {
        self.emit_op(a);
        self.emit_op(b);
    }

    fn emit_op_arg(&mut self, op: OpCode, arg: u8) {
        self.emit_op(op);
        self.emit_byte(arg);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.chunk.add_constant(value);
        match u8::try_from(index) {
            Ok(index) => index,
            Err(_) => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_arg(OpCode::Constant, index);
    }

    /// Emits `op` with a placeholder offset and returns the placeholder's position.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        // -2 to adjust for the jump offset itself
        let jump = self.chunk.len() - offset - 2;

        match u16::try_from(jump) {
            Ok(jump) => self.chunk.patch_u16(offset, jump),
            Err(_) => self.error("Too much code to jump over."),
        }
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);

        let offset = self.chunk.len() - loop_start + 2;
        let offset = match u16::try_from(offset) {
            Ok(offset) => offset,
            Err(_) => {
                self.error("Loop body too large.");
                0
            }
        };

        let [hi, lo] = offset.to_be_bytes();
        self.emit_byte(hi);
        self.emit_byte(lo);
    }

    fn end_compiler(&mut self) {
        self.emit_op(OpCode::Return);

        if !self.parser.had_error && log_enabled!(Level::Debug) {
            debug!("{}", disassemble_chunk(&self.chunk, "code"));
        }
    }

    // =========================================================================
    // Declarations and statements
    // =========================================================================

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.parser.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");

        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );

        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else if self.matches(TokenKind::For) {
            self.for_statement();
        } else if self.matches(TokenKind::If) {
            self.if_statement();
        } else if self.matches(TokenKind::While) {
            self.while_statement();
        } else if self.matches(TokenKind::Wait) {
            self.wait_statement();
        } else if self.matches(TokenKind::Write) {
            self.write_statement();
        } else if self.matches(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn wait_statement(&mut self) {
        self.consume(TokenKind::Semicolon, "Expect ';' after 'wait'.");
        self.emit_op(OpCode::Wait);
    }

    /// `write port, a, b;` with optional commas.
    fn write_statement(&mut self) {
        self.expression();
        self.matches(TokenKind::Comma);
        self.expression();
        self.matches(TokenKind::Comma);
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after values.");
        self.emit_op(OpCode::Write);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk.len();

        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// Desugars `for (init; cond; incr) body` into jumps. The increment is
    /// laid out before the body and the body's back-edge targets it.
    fn for_statement(&mut self) {
        // the initializer may declare a variable scoped to the loop
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");

        if self.matches(TokenKind::Semicolon) {
            // no initializer
        } else if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk.len();

        let mut exit_jump = None;
        if !self.matches(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");

            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk.len();

            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }

        self.end_scope();
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    // =========================================================================
    // Scopes and variables
    // =========================================================================

    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.scope_depth -= 1;

        while let Some(local) = self.locals.last() {
            if local.depth.is_some_and(|depth| depth <= self.scope_depth) {
                break;
            }
            self.emit_op(OpCode::Pop);
            self.locals.pop();
        }
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);

        self.declare_variable();
        if self.scope_depth > 0 {
            return 0;
        }

        let name = self.parser.previous.lexeme;
        self.identifier_constant(name)
    }

    /// Interns a variable name in the constant pool, reusing an existing entry.
    fn identifier_constant(&mut self, name: &str) -> u8 {
        let existing = self
            .chunk
            .constants()
            .iter()
            .position(|c| c.is_string() && c.as_str() == name);

        match existing.map(u8::try_from) {
            Some(Ok(index)) => index,
            _ => self.make_constant(Value::string(name)),
        }
    }

    fn declare_variable(&mut self) {
        // globals are late bound
        if self.scope_depth == 0 {
            return;
        }

        let name = self.parser.previous.lexeme;

        let duplicate = self
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.is_none_or(|depth| depth >= self.scope_depth))
            .any(|local| local.name == name);

        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }

        self.add_local(name);
    }

    fn add_local(&mut self, name: &'src str) {
        if self.locals.len() == MAX_LOCALS {
            self.error("Too many local variables in scope.");
            return;
        }

        self.locals.push(Local { name, depth: None });
    }

    fn define_variable(&mut self, global: u8) {
        if self.scope_depth > 0 {
            self.mark_initialized();
            return;
        }

        self.emit_op_arg(OpCode::DefineGlobal, global);
    }

    fn mark_initialized(&mut self) {
        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let (slot, initialized) = self
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth.is_some()))?;

        if !initialized {
            self.error("Can't read local variable in its own initializer.");
        }

        // slot < MAX_LOCALS, so it always fits
        u8::try_from(slot).ok()
    }

    fn named_variable(&mut self, name: &'src str, can_assign: bool) {
        let (get_op, set_op, arg) = match self.resolve_local(name) {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => {
                let index = self.identifier_constant(name);
                (OpCode::GetGlobal, OpCode::SetGlobal, index)
            }
        };

        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op_arg(set_op, arg);
        } else {
            self.emit_op_arg(get_op, arg);
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();

        let Some(prefix) = Self::rule(self.parser.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= Self::rule(self.parser.current.kind).precedence {
            self.advance();
            if let Some(infix) = Self::rule(self.parser.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn rule(kind: TokenKind) -> ParseRule<'src> {
        use TokenKind::*;

        let (prefix, infix, precedence): (Option<ParseFn<'src>>, Option<ParseFn<'src>>, _) =
            match kind {
                LeftParen => (Some(Self::grouping), None, Precedence::None),
                Minus => (Some(Self::unary), Some(Self::binary), Precedence::Term),
                Plus => (None, Some(Self::binary), Precedence::Term),
                Slash | Star => (None, Some(Self::binary), Precedence::Factor),
                Bang => (Some(Self::unary), None, Precedence::None),
                BangEqual | EqualEqual => (None, Some(Self::binary), Precedence::Equality),
                Greater | GreaterEqual | Less | LessEqual => {
                    (None, Some(Self::binary), Precedence::Comparison)
                }
                Identifier => (Some(Self::variable), None, Precedence::None),
                String => (Some(Self::string), None, Precedence::None),
                Number => (Some(Self::number), None, Precedence::None),
                And => (None, Some(Self::and), Precedence::And),
                Or => (None, Some(Self::or), Precedence::Or),
                False | True | Nil => (Some(Self::literal), None, Precedence::None),
                Read => (Some(Self::read), None, Precedence::None),
                _ => (None, None, Precedence::None),
            };

        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self, _can_assign: bool) {
        match self.parser.previous.lexeme.parse::<f64>() {
            Ok(value) => self.emit_constant(Value::Number(value)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.parser.previous.lexeme;
        // strip the surrounding quotes
        let body = &lexeme[1..lexeme.len() - 1];

        match unescape(body) {
            Some(text) => self.emit_constant(Value::string(text)),
            None => self.error("Unknown escape sequence in string."),
        }
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.parser.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.parser.previous.lexeme;
        self.named_variable(name, can_assign);
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.parser.previous.kind;

        self.parse_precedence(Precedence::Unary);

        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => {}
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.parser.previous.kind;
        let rule = Self::rule(operator);
        self.parse_precedence(rule.precedence.next());

        match operator {
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            // a >= b is !(a < b)
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            // a <= b is !(a > b)
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => {}
        }
    }

    fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);

        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);

        self.patch_jump(end_jump);
    }

    fn or(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);

        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    /// `read port` pushes the value the device reports for `port`.
    fn read(&mut self, _can_assign: bool) {
        self.parse_precedence(Precedence::Unary);
        self.emit_op(OpCode::Read);
    }
}

/// Decodes backslash escapes in a string literal body.
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }

    Some(out)
}
