use crate::frontend::token::{Token, TokenKind};

pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const RED: &'static str = "\x1b[31m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn dump(&self, tokens: &[Token<'_>]) {
        for token in tokens {
            println!("{}", self.render(token));
        }
    }

    pub fn render(&self, token: &Token<'_>) -> String {
        let colr = if self.color { self.color(token.kind) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        format!(
            "[{:04}] {}{:<8} {:<14} {}{}",
            token.line,
            colr,
            self.category(token.kind),
            format!("{:?}", token.kind),
            token.lexeme,
            reset
        )
    }

    fn category(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => "EOF",
            Error => "ERROR",
            Number => "NUMBER",
            String => "STRING",
            Identifier => "IDENT",
            LeftParen | RightParen | LeftBrace | RightBrace | Comma | Dot | Semicolon => "PUNCT",
            Minus | Plus | Slash | Star | Bang | Equal => "OP",
            BangEqual | EqualEqual | Greater | GreaterEqual | Less | LessEqual => "CMP",
            _ => "KEYWORD",
        }
    }

    fn color(&self, kind: TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => Self::DIM,
            Error => Self::RED,
            String => Self::GRN,
            Number | True | False | Nil => Self::CYN,
            Identifier => Self::YEL,
            Minus | Plus | Slash | Star | Bang | Equal => Self::MAG,
            BangEqual | EqualEqual | Greater | GreaterEqual | Less | LessEqual => Self::MAG,
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    #[test]
    fn test_render_without_color() {
        let tokens = Lexer::new("var x = 1;").tokenize();
        let dumper = TokenDumper::new().no_color();
        let lines: Vec<String> = tokens.iter().map(|t| dumper.render(t)).collect();

        assert!(lines[0].starts_with("[0001] KEYWORD"));
        assert!(lines[0].ends_with("var"));
        assert!(lines[1].contains("IDENT"));
        assert!(lines[3].contains("NUMBER"));
        assert!(lines[5].contains("EOF"));
        assert!(!lines[0].contains('\x1b'));
    }

    #[test]
    fn test_error_token_shows_message() {
        let tokens = Lexer::new("@").tokenize();
        let line = TokenDumper::new().no_color().render(&tokens[0]);
        assert!(line.contains("ERROR"));
        assert!(line.contains("Unexpected character."));
    }
}
