use thiserror::Error;

use super::ast::BinOp;

/// Lexical or grammatical failure while reading a snippet. Carries the
/// 1-based source line so rejection messages point at the offending spot.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kw {
    Def,
    Return,
    Pass,
    If,
    Elif,
    Else,
    Import,
    From,
    Global,
    Nonlocal,
    Class,
    Lambda,
    Async,
    While,
    For,
    In,
    Try,
    Except,
    Finally,
    With,
    As,
    Raise,
    Del,
    Not,
    And,
    Or,
    Is,
    None,
    True,
    False,
}

fn keyword(ident: &str) -> Option<Kw> {
    let kw = match ident {
        "def" => Kw::Def,
        "return" => Kw::Return,
        "pass" => Kw::Pass,
        "if" => Kw::If,
        "elif" => Kw::Elif,
        "else" => Kw::Else,
        "import" => Kw::Import,
        "from" => Kw::From,
        "global" => Kw::Global,
        "nonlocal" => Kw::Nonlocal,
        "class" => Kw::Class,
        "lambda" => Kw::Lambda,
        "async" => Kw::Async,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "try" => Kw::Try,
        "except" => Kw::Except,
        "finally" => Kw::Finally,
        "with" => Kw::With,
        "as" => Kw::As,
        "raise" => Kw::Raise,
        "del" => Kw::Del,
        "not" => Kw::Not,
        "and" => Kw::And,
        "or" => Kw::Or,
        "is" => Kw::Is,
        "None" => Kw::None,
        "True" => Kw::True,
        "False" => Kw::False,
        _ => return None,
    };
    Some(kw)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Kw),
    Int(i64),
    Float(f64),
    Str(String),
    Newline,
    Indent,
    Dedent,
    Eof,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Assign,
    AugAssign(BinOp),
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semi,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Indentation-aware tokenizer for the snippet grammar. Emits synthetic
/// Indent/Dedent/Newline tokens; newlines inside brackets are joined.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    indents: Vec<usize>,
    bracket_depth: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            indents: vec![0],
            bracket_depth: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            if self.bracket_depth == 0 {
                if !self.handle_line_start()? {
                    break;
                }
            }
            if !self.lex_logical_line()? {
                break;
            }
        }

        // Close any open blocks before Eof.
        if self
            .tokens
            .last()
            .map(|t| t.kind != TokenKind::Newline)
            .unwrap_or(false)
        {
            self.push(TokenKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::Eof);
        Ok(self.tokens)
    }

    /// Measure indentation at a physical line start, skipping blank and
    /// comment-only lines. Returns false at end of input.
    fn handle_line_start(&mut self) -> Result<bool, SyntaxError> {
        loop {
            if self.pos >= self.chars.len() {
                return Ok(false);
            }

            let mut width = 0usize;
            while let Some(&c) = self.chars.get(self.pos) {
                match c {
                    ' ' => {
                        width += 1;
                        self.pos += 1;
                    }
                    '\t' => {
                        width = (width / 8 + 1) * 8;
                        self.pos += 1;
                    }
                    _ => break,
                }
            }

            match self.chars.get(self.pos) {
                Option::None => return Ok(false),
                Some('\n') => {
                    self.pos += 1;
                    self.line += 1;
                    continue;
                }
                Some('\r') => {
                    self.pos += 1;
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                Some(_) => {
                    self.apply_indent(width)?;
                    return Ok(true);
                }
            }
        }
    }

    fn apply_indent(&mut self, width: usize) -> Result<(), SyntaxError> {
        let current = *self.indents.last().unwrap_or(&0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent);
            return Ok(());
        }
        while width < *self.indents.last().unwrap_or(&0) {
            self.indents.pop();
            self.push(TokenKind::Dedent);
        }
        if width != *self.indents.last().unwrap_or(&0) {
            return Err(SyntaxError::new(self.line, "inconsistent indentation"));
        }
        Ok(())
    }

    /// Lex tokens until the end of a logical line. Returns false at end of
    /// input.
    fn lex_logical_line(&mut self) -> Result<bool, SyntaxError> {
        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                ' ' | '\t' | '\r' => {
                    self.pos += 1;
                }
                '#' => {
                    self.skip_comment();
                }
                '\n' => {
                    self.pos += 1;
                    self.line += 1;
                    if self.bracket_depth == 0 {
                        self.push_at(TokenKind::Newline, self.line - 1);
                        return Ok(true);
                    }
                }
                '\'' | '"' => {
                    let s = self.lex_string(c)?;
                    self.push(TokenKind::Str(s));
                }
                c if c.is_ascii_digit() => {
                    let kind = self.lex_number()?;
                    self.push(kind);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident = self.lex_ident();
                    match keyword(&ident) {
                        Some(kw) => self.push(TokenKind::Keyword(kw)),
                        Option::None => self.push(TokenKind::Ident(ident)),
                    }
                }
                _ => {
                    let kind = self.lex_operator()?;
                    match kind {
                        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                            self.bracket_depth += 1;
                        }
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                            self.bracket_depth = self.bracket_depth.saturating_sub(1);
                        }
                        _ => {}
                    }
                    self.push(kind);
                }
            }
        }
        Ok(false)
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.chars.get(self.pos) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let start_line = self.line;
        self.pos += 1; // opening quote
        let mut out = String::new();
        loop {
            let Some(&c) = self.chars.get(self.pos) else {
                return Err(SyntaxError::new(start_line, "unterminated string literal"));
            };
            self.pos += 1;
            match c {
                '\n' => {
                    return Err(SyntaxError::new(start_line, "unterminated string literal"));
                }
                '\\' => {
                    let Some(&esc) = self.chars.get(self.pos) else {
                        return Err(SyntaxError::new(start_line, "unterminated string literal"));
                    };
                    self.pos += 1;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        other => {
                            // Unknown escapes pass through verbatim.
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.chars.get(self.pos) == Some(&'.')
            && self
                .chars
                .get(self.pos + 1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
        {
            is_float = true;
            self.pos += 1;
            while self
                .chars
                .get(self.pos)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
            {
                self.pos += 1;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| SyntaxError::new(self.line, format!("invalid number: {text}")))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| SyntaxError::new(self.line, format!("integer out of range: {text}")))
        }
    }

    fn lex_ident(&mut self) -> String {
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .map(|c| c.is_alphanumeric() || *c == '_')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn lex_operator(&mut self) -> Result<TokenKind, SyntaxError> {
        let c = self.chars[self.pos];
        self.pos += 1;

        let kind = match c {
            '+' => {
                if self.eat('=') {
                    TokenKind::AugAssign(BinOp::Add)
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('=') {
                    TokenKind::AugAssign(BinOp::Sub)
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        TokenKind::AugAssign(BinOp::Pow)
                    } else {
                        TokenKind::StarStar
                    }
                } else if self.eat('=') {
                    TokenKind::AugAssign(BinOp::Mul)
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('/') {
                    if self.eat('=') {
                        TokenKind::AugAssign(BinOp::FloorDiv)
                    } else {
                        TokenKind::SlashSlash
                    }
                } else if self.eat('=') {
                    TokenKind::AugAssign(BinOp::Div)
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::AugAssign(BinOp::Mod)
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(SyntaxError::new(self.line, "unexpected character: !"));
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semi,
            other => {
                return Err(SyntaxError::new(
                    self.line,
                    format!("unexpected character: {other}"),
                ));
            }
        };
        Ok(kind)
    }

    fn push(&mut self, kind: TokenKind) {
        self.push_at(kind, self.line);
    }

    fn push_at(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token { kind, line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_def_line_tokens() {
        let toks = kinds("def warn(x):\n    print('hi')\n");
        assert_eq!(toks[0], TokenKind::Keyword(Kw::Def));
        assert_eq!(toks[1], TokenKind::Ident("warn".into()));
        assert_eq!(toks[2], TokenKind::LParen);
        assert_eq!(toks[3], TokenKind::Ident("x".into()));
        assert_eq!(toks[4], TokenKind::RParen);
        assert_eq!(toks[5], TokenKind::Colon);
        assert_eq!(toks[6], TokenKind::Newline);
        assert_eq!(toks[7], TokenKind::Indent);
        assert!(toks.contains(&TokenKind::Str("hi".into())));
        assert!(toks.contains(&TokenKind::Dedent));
        assert_eq!(toks.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_string_escapes() {
        let toks = kinds(r#"print('a\'b\n')"#);
        assert!(toks.contains(&TokenKind::Str("a'b\n".into())));
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let toks = kinds("def f():\n\n    # nothing here\n    pass\n");
        let indents = toks.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = toks.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn test_newline_suppressed_inside_brackets() {
        let toks = kinds("print(1,\n      2)\n");
        let newlines = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_inconsistent_dedent_rejected() {
        let err = tokenize("def f():\n    pass\n  pass\n").unwrap_err();
        assert!(err.message.contains("indentation"));
    }

    #[test]
    fn test_numbers_and_operators() {
        let toks = kinds("1 + 2.5 ** 3 // 4");
        assert_eq!(toks[0], TokenKind::Int(1));
        assert_eq!(toks[1], TokenKind::Plus);
        assert_eq!(toks[2], TokenKind::Float(2.5));
        assert_eq!(toks[3], TokenKind::StarStar);
        assert_eq!(toks[5], TokenKind::SlashSlash);
    }

    #[test]
    fn test_augmented_assign_token() {
        let toks = kinds("x += 1");
        assert_eq!(toks[1], TokenKind::AugAssign(BinOp::Add));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("print('oops)\n").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }
}
