use crate::frontend::token::{Token, TokenKind};

/// On-demand scanner over a source string.
///
/// Each call to [`Lexer::next_token`] produces exactly one token. Once the end
/// of input has been reached every further call returns another `Eof` token.
pub struct Lexer<'src> {
    source: &'src str,
    start: usize,
    pos: usize,
    line: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            start: 0,
            pos: 0,
            line: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn current(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        if ch == '\n' {
            self.line += 1;
        }
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.pos],
            start: self.start,
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            start: self.start,
            line: self.line,
        }
    }

    /// Skips spaces, newlines and `//` line comments.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek() == Some('/') => {
                    // leave the newline for the next iteration so it is counted
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_string(&mut self) -> Token<'src> {
        loop {
            match self.current() {
                None => return self.error_token("Unterminated string."),
                Some('"') => break,
                Some('\\') => {
                    self.advance();
                    // the escaped character is taken verbatim here and decoded by the compiler
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        // closing quote
        self.advance();
        self.make_token(TokenKind::String)
    }

    fn read_number(&mut self) -> Token<'src> {
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Only treat '.' as a decimal point if followed by a digit
        if self.current() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn read_identifier(&mut self) -> Token<'src> {
        while self
            .current()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.source[self.start..self.pos];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    pub fn next_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.pos;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let Some(ch) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        if ch.is_alphabetic() || ch == '_' {
            return self.read_identifier();
        }
        if ch.is_ascii_digit() {
            return self.read_number();
        }

        match ch {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ';' => self.make_token(TokenKind::Semicolon),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            '-' => self.make_token(TokenKind::Minus),
            '+' => self.make_token(TokenKind::Plus),
            '/' => self.make_token(TokenKind::Slash),
            '*' => self.make_token(TokenKind::Star),
            '!' => {
                let kind = if self.matches('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            '=' => {
                let kind = if self.matches('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            '<' => {
                let kind = if self.matches('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            '>' => {
                let kind = if self.matches('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            '"' => self.read_string(),
            _ => self.error_token("Unexpected character."),
        }
    }

    /// Scans the whole input, including the trailing `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token<'src>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.lexeme.to_string())
            .collect()
    }

    #[test]
    fn test_print_statement() {
        assert_eq!(
            kinds(r#"print "Hello, World!";"#),
            vec![TokenKind::Print, TokenKind::String, TokenKind::Semicolon]
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            kinds("10 + 20 * (5 - 1) / 2"),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::LeftParen,
                TokenKind::Number,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::RightParen,
                TokenKind::Slash,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_one_and_two_character_operators() {
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
            ]
        );
    }

    #[test]
    fn test_keyword_vs_ident() {
        assert_eq!(
            kinds("print printer var variable wait waiter"),
            vec![
                TokenKind::Print,
                TokenKind::Identifier,
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Wait,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_host_keywords() {
        assert_eq!(
            kinds("wait read write"),
            vec![TokenKind::Wait, TokenKind::Read, TokenKind::Write]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(lexemes("3.14 42 7."), vec!["3.14", "42", "7", "."]);
        assert_eq!(
            kinds("1.5"),
            vec![TokenKind::Number],
            "fraction belongs to the number"
        );
    }

    #[test]
    fn test_minus_is_separate_token() {
        assert_eq!(kinds("-2"), vec![TokenKind::Minus, TokenKind::Number]);
    }

    #[test]
    fn test_string_lexeme_keeps_quotes() {
        let mut lexer = Lexer::new(r#""abc""#);
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.lexeme, r#""abc""#);
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let mut lexer = Lexer::new(r#""say \"hi\"" ;"#);
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::String);
        assert_eq!(token.lexeme, r#""say \"hi\"""#);
        assert_eq!(lexer.next_token().kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let mut lexer = Lexer::new("\"a\nb\nc\" x");
        let string = lexer.next_token();
        assert_eq!(string.kind, TokenKind::String);
        assert_eq!(string.line, 3);
        assert_eq!(lexer.next_token().line, 3);
    }

    #[test]
    fn test_unterminated_string_error() {
        let mut lexer = Lexer::new("\"hello\nworld");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "Unterminated string.");
    }

    #[test]
    fn test_unexpected_character_error() {
        let mut lexer = Lexer::new("@");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "Unexpected character.");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_comments_are_skipped_and_lines_counted() {
        let tokens = Lexer::new("// header\nvar x; // trailing\n\nprint x;").tokenize();
        let lines: Vec<(TokenKind, usize)> = tokens.iter().map(|t| (t.kind, t.line)).collect();
        assert_eq!(
            lines,
            vec![
                (TokenKind::Var, 2),
                (TokenKind::Identifier, 2),
                (TokenKind::Semicolon, 2),
                (TokenKind::Print, 4),
                (TokenKind::Identifier, 4),
                (TokenKind::Semicolon, 4),
                (TokenKind::Eof, 4),
            ]
        );
    }

    #[test]
    fn test_single_slash_is_division() {
        assert_eq!(
            kinds("6 / 3"),
            vec![TokenKind::Number, TokenKind::Slash, TokenKind::Number]
        );
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        for _ in 0..3 {
            assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn test_token_offsets() {
        let tokens = Lexer::new("var  answer = 42;").tokenize();
        let starts: Vec<usize> = tokens.iter().map(|t| t.start).collect();
        assert_eq!(starts, vec![0, 5, 12, 14, 16, 17]);
    }

    #[test]
    fn test_identifier_with_underscore_and_digits() {
        assert_eq!(lexemes("motor_1 _tmp"), vec!["motor_1", "_tmp"]);
    }
}
