use crate::frontend::token::{Token, TokenKind};

/// Where in the source a compile error was detected.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorLocation {
    /// At the end of input.
    AtEnd,
    /// At a specific token; holds the token's lexeme.
    AtLexeme(String),
    /// A scanner error; the message already describes the problem.
    Lexical,
}

/// A single lexical or syntactic error.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub line: usize,
    pub location: ErrorLocation,
    pub message: String,
}

impl CompileError {
    /// Create an error reported at `token`
    pub fn at(token: &Token<'_>, message: impl Into<String>) -> Self {
        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::AtEnd,
            TokenKind::Error => ErrorLocation::Lexical,
            _ => ErrorLocation::AtLexeme(token.lexeme.to_string()),
        };

        CompileError {
            line: token.line,
            location,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CompileError {
    /// Formats as `[line N] Error at 'x': message`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            ErrorLocation::AtEnd => write!(f, " at end")?,
            ErrorLocation::AtLexeme(lexeme) => write!(f, " at '{}'", lexeme)?,
            ErrorLocation::Lexical => {}
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Compilation failed; holds one error per independent error location.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileFailed {
    pub errors: Vec<CompileError>,
}

impl CompileFailed {
    /// True if any recorded error carries `fragment` in its message.
    pub fn mentions(&self, fragment: &str) -> bool {
        self.errors.iter().any(|e| e.message.contains(fragment))
    }
}

impl std::fmt::Display for CompileFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileFailed {}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, lexeme: &str, line: usize) -> Token<'_> {
        Token {
            kind,
            lexeme,
            start: 0,
            line,
        }
    }

    #[test]
    fn test_display_at_lexeme() {
        let err = CompileError::at(&token(TokenKind::Identifier, "foo", 3), "Boom.");
        assert_eq!(err.to_string(), "[line 3] Error at 'foo': Boom.");
    }

    #[test]
    fn test_display_at_end() {
        let err = CompileError::at(&token(TokenKind::Eof, "", 7), "Expect expression.");
        assert_eq!(err.to_string(), "[line 7] Error at end: Expect expression.");
    }

    #[test]
    fn test_display_lexical() {
        let tok = token(TokenKind::Error, "Unexpected character.", 2);
        let err = CompileError::at(&tok, tok.lexeme);
        assert_eq!(err.to_string(), "[line 2] Error: Unexpected character.");
    }

    #[test]
    fn test_failed_lists_every_error() {
        let failed = CompileFailed {
            errors: vec![
                CompileError::at(&token(TokenKind::Identifier, "a", 1), "first"),
                CompileError::at(&token(TokenKind::Identifier, "b", 2), "second"),
            ],
        };
        assert_eq!(
            failed.to_string(),
            "[line 1] Error at 'a': first\n[line 2] Error at 'b': second"
        );
        assert!(failed.mentions("sec"));
        assert!(!failed.mentions("third"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = CompileError::at(&token(TokenKind::Eof, "", 1), "x");
        let _: &dyn std::error::Error = &err;
    }
}
