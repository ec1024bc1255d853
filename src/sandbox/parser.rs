use super::ast::{BinOp, BoolOp, CmpOp, Expr, NodeKind, Stmt, UnaryOp};
use super::lexer::{tokenize, Kw, SyntaxError, Token, TokenKind};

/// Parse a snippet into a list of top-level statements.
///
/// The grammar is deliberately wider than the whitelist: banned shapes
/// (imports, loops, classes, comprehensions, ...) parse successfully so the
/// validator can reject them with a named diagnostic instead of a generic
/// syntax error.
pub fn parse(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_module(mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::Eof) {
                return Ok(stmts);
            }
            stmts.push(self.parse_stmt()?);
        }
    }

    // ── Statements ──

    fn parse_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind().clone() {
            TokenKind::Keyword(Kw::Def) => self.parse_funcdef(false),
            TokenKind::Keyword(Kw::Async) => {
                self.advance();
                if !self.check(&TokenKind::Keyword(Kw::Def)) {
                    return Err(self.unexpected("expected `def` after `async`"));
                }
                self.parse_funcdef(true)
            }
            TokenKind::Keyword(Kw::Class) => self.parse_classdef(),
            TokenKind::Keyword(Kw::If) => self.parse_if(),
            TokenKind::Keyword(Kw::While) => self.parse_while(),
            TokenKind::Keyword(Kw::For) => self.parse_for(),
            TokenKind::Keyword(Kw::Try) => self.parse_try(),
            TokenKind::Keyword(Kw::With) => self.parse_with(),
            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.expect_end_of_stmt()?;
                Ok(stmt)
            }
        }
    }

    /// A statement that fits on one logical line.
    fn parse_simple_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind().clone() {
            TokenKind::Keyword(Kw::Return) => {
                self.advance();
                if self.at_end_of_stmt() {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.parse_expr_list()?)))
                }
            }
            TokenKind::Keyword(Kw::Pass) => {
                self.advance();
                Ok(Stmt::Pass)
            }
            TokenKind::Keyword(Kw::Import) => {
                self.advance();
                let mut names = vec![self.parse_dotted_name()?];
                while self.eat(&TokenKind::Comma) {
                    names.push(self.parse_dotted_name()?);
                }
                Ok(Stmt::Import(names))
            }
            TokenKind::Keyword(Kw::From) => {
                self.advance();
                let module = self.parse_dotted_name()?;
                if !self.eat(&TokenKind::Keyword(Kw::Import)) {
                    return Err(self.unexpected("expected `import` in from-import"));
                }
                let mut names = vec![self.parse_import_name()?];
                while self.eat(&TokenKind::Comma) {
                    names.push(self.parse_import_name()?);
                }
                Ok(Stmt::ImportFrom { module, names })
            }
            TokenKind::Keyword(Kw::Global) => {
                self.advance();
                Ok(Stmt::Global(self.parse_name_list()?))
            }
            TokenKind::Keyword(Kw::Nonlocal) => {
                self.advance();
                Ok(Stmt::Nonlocal(self.parse_name_list()?))
            }
            TokenKind::Keyword(Kw::Raise) => {
                self.advance();
                if self.at_end_of_stmt() {
                    Ok(Stmt::Raise(None))
                } else {
                    Ok(Stmt::Raise(Some(self.parse_expr()?)))
                }
            }
            TokenKind::Keyword(Kw::Del) => {
                self.advance();
                let mut targets = vec![self.parse_expr()?];
                while self.eat(&TokenKind::Comma) {
                    targets.push(self.parse_expr()?);
                }
                Ok(Stmt::Delete(targets))
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// Expression statement, possibly an assignment or augmented assignment.
    fn parse_expr_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let target = self.parse_expr_list()?;
        match self.peek_kind().clone() {
            TokenKind::Assign => {
                self.advance();
                let value = self.parse_expr_list()?;
                // Chained `a = b = c` collapses to the rightmost value; the
                // validator rejects any assignment regardless.
                while self.eat(&TokenKind::Assign) {
                    self.parse_expr_list()?;
                }
                Ok(Stmt::Assign { target, value })
            }
            TokenKind::AugAssign(op) => {
                self.advance();
                let value = self.parse_expr_list()?;
                Ok(Stmt::AugAssign { target, op, value })
            }
            _ => Ok(Stmt::Expr(target)),
        }
    }

    fn parse_funcdef(&mut self, is_async: bool) -> Result<Stmt, SyntaxError> {
        self.advance(); // def
        let name = self.expect_ident()?;
        if !self.eat(&TokenKind::LParen) {
            return Err(self.unexpected("expected `(` after function name"));
        }
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_ident()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if !self.eat(&TokenKind::RParen) {
            return Err(self.unexpected("expected `)` after parameters"));
        }
        let body = self.parse_suite()?;
        if is_async {
            Ok(Stmt::AsyncFunctionDef { name, params, body })
        } else {
            Ok(Stmt::FunctionDef { name, params, body })
        }
    }

    fn parse_classdef(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance(); // class
        let name = self.expect_ident()?;
        if self.eat(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    self.parse_expr()?;
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            if !self.eat(&TokenKind::RParen) {
                return Err(self.unexpected("expected `)` after base classes"));
            }
        }
        let body = self.parse_suite()?;
        Ok(Stmt::ClassDef { name, body })
    }

    fn parse_if(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance(); // if / elif
        let test = self.parse_expr()?;
        let body = self.parse_suite()?;
        let orelse = match self.peek_kind() {
            TokenKind::Keyword(Kw::Elif) => vec![self.parse_if()?],
            TokenKind::Keyword(Kw::Else) => {
                self.advance();
                self.parse_suite()?
            }
            _ => Vec::new(),
        };
        Ok(Stmt::If { test, body, orelse })
    }

    fn parse_while(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance();
        let test = self.parse_expr()?;
        let body = self.parse_suite()?;
        Ok(Stmt::While { test, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance();
        let target = self.parse_expr_list()?;
        if !self.eat(&TokenKind::Keyword(Kw::In)) {
            return Err(self.unexpected("expected `in` in for statement"));
        }
        let iter = self.parse_expr_list()?;
        let body = self.parse_suite()?;
        Ok(Stmt::For { target, iter, body })
    }

    fn parse_try(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance();
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        while self.check(&TokenKind::Keyword(Kw::Except)) {
            self.advance();
            if !self.check(&TokenKind::Colon) {
                self.parse_expr()?;
                if self.eat(&TokenKind::Keyword(Kw::As)) {
                    self.expect_ident()?;
                }
            }
            handlers.push(self.parse_suite()?);
        }
        let mut finally = Vec::new();
        if self.eat(&TokenKind::Keyword(Kw::Else)) {
            handlers.push(self.parse_suite()?);
        }
        if self.eat(&TokenKind::Keyword(Kw::Finally)) {
            finally = self.parse_suite()?;
        }
        if handlers.is_empty() && finally.is_empty() {
            return Err(self.unexpected("expected `except` or `finally` after try block"));
        }
        Ok(Stmt::Try {
            body,
            handlers,
            finally,
        })
    }

    fn parse_with(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance();
        let item = self.parse_expr()?;
        if self.eat(&TokenKind::Keyword(Kw::As)) {
            self.expect_ident()?;
        }
        let body = self.parse_suite()?;
        Ok(Stmt::With { item, body })
    }

    /// `: NEWLINE INDENT stmt+ DEDENT` or `: simple_stmt (; simple_stmt)*`.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        if !self.eat(&TokenKind::Colon) {
            return Err(self.unexpected("expected `:`"));
        }

        if self.eat(&TokenKind::Newline) {
            if !self.eat(&TokenKind::Indent) {
                return Err(self.unexpected("expected an indented block"));
            }
            let mut body = Vec::new();
            loop {
                self.skip_newlines();
                if self.eat(&TokenKind::Dedent) {
                    break;
                }
                if self.check(&TokenKind::Eof) {
                    return Err(self.unexpected("unexpected end of input in block"));
                }
                body.push(self.parse_stmt()?);
            }
            if body.is_empty() {
                return Err(self.unexpected("empty block"));
            }
            return Ok(body);
        }

        // Inline suite: one or more simple statements on the header line.
        let mut body = vec![self.parse_simple_stmt()?];
        while self.eat(&TokenKind::Semi) {
            if self.at_end_of_stmt() {
                break;
            }
            body.push(self.parse_simple_stmt()?);
        }
        self.expect_end_of_stmt()?;
        Ok(body)
    }

    // ── Expressions ──

    /// `expr (, expr)*` — a bare comma list becomes a tuple.
    fn parse_expr_list(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.parse_expr()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_end_of_stmt() || self.check(&TokenKind::Assign) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(&TokenKind::Keyword(Kw::Lambda)) {
            return self.parse_lambda();
        }
        self.parse_or()
    }

    fn parse_lambda(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // lambda
        let mut params = Vec::new();
        if !self.check(&TokenKind::Colon) {
            loop {
                params.push(self.expect_ident()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if !self.eat(&TokenKind::Colon) {
            return Err(self.unexpected("expected `:` in lambda"));
        }
        let body = Box::new(self.parse_expr()?);
        Ok(Expr::Lambda { params, body })
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Keyword(Kw::Or)) {
            let right = self.parse_and()?;
            left = Expr::BoolExpr {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::Keyword(Kw::And)) {
            let right = self.parse_not()?;
            left = Expr::BoolExpr {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&TokenKind::Keyword(Kw::Not)) {
            let operand = Box::new(self.parse_not()?);
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand,
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::LtEq => CmpOp::LtEq,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::GtEq => CmpOp::GtEq,
                TokenKind::Keyword(Kw::In) => CmpOp::In,
                TokenKind::Keyword(Kw::Is) => CmpOp::Is,
                _ => break,
            };
            self.advance();
            let right = self.parse_arith()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::SlashSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&TokenKind::Minus) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            });
        }
        if self.eat(&TokenKind::Plus) {
            return self.parse_unary();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.parse_postfix()?;
        if self.eat(&TokenKind::StarStar) {
            // Right-associative.
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exp),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    if !self.eat(&TokenKind::RParen) {
                        return Err(self.unexpected("expected `)` after arguments"));
                    }
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_ident()?;
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = Box::new(self.parse_expr()?);
                    if !self.eat(&TokenKind::RBracket) {
                        return Err(self.unexpected("expected `]` after subscript"));
                    }
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        index,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        let kind = self.peek_kind().clone();
        match kind {
            TokenKind::Int(v) => {
                self.advance();
                Ok(Expr::Int(v))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expr::Float(v))
            }
            TokenKind::Str(s) => {
                self.advance();
                // Adjacent string literals concatenate.
                let mut text = s;
                while let TokenKind::Str(next) = self.peek_kind().clone() {
                    self.advance();
                    text.push_str(&next);
                }
                Ok(Expr::Str(text))
            }
            TokenKind::Keyword(Kw::None) => {
                self.advance();
                Ok(Expr::NoneLit)
            }
            TokenKind::Keyword(Kw::True) => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::Keyword(Kw::False) => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_list_display(),
            TokenKind::LBrace => self.parse_brace_display(),
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    fn parse_paren(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // (
        if self.eat(&TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.check(&TokenKind::Keyword(Kw::For)) {
            self.skip_to_close(TokenKind::RParen, "generator expression")?;
            return Ok(Expr::Comprehension(NodeKind::GeneratorExp));
        }
        if self.eat(&TokenKind::Comma) {
            let mut items = vec![first];
            while !self.check(&TokenKind::RParen) {
                items.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            if !self.eat(&TokenKind::RParen) {
                return Err(self.unexpected("expected `)`"));
            }
            return Ok(Expr::Tuple(items));
        }
        if !self.eat(&TokenKind::RParen) {
            return Err(self.unexpected("expected `)`"));
        }
        Ok(first)
    }

    fn parse_list_display(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // [
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.check(&TokenKind::Keyword(Kw::For)) {
            self.skip_to_close(TokenKind::RBracket, "list comprehension")?;
            return Ok(Expr::Comprehension(NodeKind::ListComp));
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        if !self.eat(&TokenKind::RBracket) {
            return Err(self.unexpected("expected `]`"));
        }
        Ok(Expr::List(items))
    }

    fn parse_brace_display(&mut self) -> Result<Expr, SyntaxError> {
        self.advance(); // {
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.eat(&TokenKind::Colon) {
            let value = self.parse_expr()?;
            if self.check(&TokenKind::Keyword(Kw::For)) {
                self.skip_to_close(TokenKind::RBrace, "dict comprehension")?;
                return Ok(Expr::Comprehension(NodeKind::DictComp));
            }
            let mut entries = vec![(first, value)];
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let k = self.parse_expr()?;
                if !self.eat(&TokenKind::Colon) {
                    return Err(self.unexpected("expected `:` in dict entry"));
                }
                let v = self.parse_expr()?;
                entries.push((k, v));
            }
            if !self.eat(&TokenKind::RBrace) {
                return Err(self.unexpected("expected `}`"));
            }
            return Ok(Expr::Dict(entries));
        }
        if self.check(&TokenKind::Keyword(Kw::For)) {
            self.skip_to_close(TokenKind::RBrace, "set comprehension")?;
            return Ok(Expr::Comprehension(NodeKind::SetComp));
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        if !self.eat(&TokenKind::RBrace) {
            return Err(self.unexpected("expected `}`"));
        }
        Ok(Expr::Set(items))
    }

    /// Consume tokens up to and including the matching close bracket. Used
    /// for comprehensions, which only need to be identified for rejection.
    fn skip_to_close(&mut self, close: TokenKind, what: &str) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            let kind = self.peek_kind().clone();
            match kind {
                TokenKind::Eof => {
                    return Err(self.unexpected(&format!("unterminated {what}")));
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                k if k == close && depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Helpers ──

    fn parse_dotted_name(&mut self) -> Result<String, SyntaxError> {
        let mut name = self.expect_ident()?;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        if self.eat(&TokenKind::Keyword(Kw::As)) {
            self.expect_ident()?;
        }
        Ok(name)
    }

    fn parse_import_name(&mut self) -> Result<String, SyntaxError> {
        if self.eat(&TokenKind::Star) {
            return Ok("*".to_string());
        }
        let name = self.expect_ident()?;
        if self.eat(&TokenKind::Keyword(Kw::As)) {
            self.expect_ident()?;
        }
        Ok(name)
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut names = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.expect_ident()?);
        }
        Ok(names)
    }

    fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn current_line(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.line).unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("expected an identifier"))
        }
    }

    fn at_end_of_stmt(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semi | TokenKind::Eof | TokenKind::Dedent
        )
    }

    fn expect_end_of_stmt(&mut self) -> Result<(), SyntaxError> {
        while self.eat(&TokenKind::Semi) {}
        if self.eat(&TokenKind::Newline) || self.check(&TokenKind::Eof) {
            return Ok(());
        }
        Err(self.unexpected("unexpected trailing tokens"))
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn unexpected(&self, message: &str) -> SyntaxError {
        SyntaxError::new(
            self.current_line(),
            format!("{message}, found {:?}", self.peek_kind()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_funcdef() {
        let stmts = parse("def warn(x):\n    print('issue: ' + x)\n").expect("parse");
        assert_eq!(stmts.len(), 1);
        let Stmt::FunctionDef { name, params, body } = &stmts[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(name, "warn");
        assert_eq!(params, &["x".to_string()]);
        assert_eq!(body.len(), 1);
        let Stmt::Expr(Expr::Call { func, args }) = &body[0] else {
            panic!("expected a call statement");
        };
        assert_eq!(**func, Expr::Name("print".into()));
        assert!(matches!(args[0], Expr::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_import_statements() {
        let stmts = parse("import os\nfrom sys import path\n").expect("parse");
        assert_eq!(stmts[0], Stmt::Import(vec!["os".into()]));
        assert_eq!(
            stmts[1],
            Stmt::ImportFrom {
                module: "sys".into(),
                names: vec!["path".into()],
            }
        );
    }

    #[test]
    fn test_if_elif_else() {
        let src = "def f(x):\n    if x > 1:\n        print('big')\n    elif x:\n        print('one')\n    else:\n        print('small')\n";
        let stmts = parse(src).expect("parse");
        let Stmt::FunctionDef { body, .. } = &stmts[0] else {
            panic!("expected function");
        };
        let Stmt::If { orelse, .. } = &body[0] else {
            panic!("expected if");
        };
        assert!(matches!(orelse[0], Stmt::If { .. }));
    }

    #[test]
    fn test_attribute_and_subscript() {
        let stmts = parse("os.getcwd()[0]\n").expect("parse");
        let Stmt::Expr(Expr::Subscript { value, .. }) = &stmts[0] else {
            panic!("expected subscript");
        };
        assert!(matches!(**value, Expr::Call { .. }));
    }

    #[test]
    fn test_assignment_shapes() {
        let stmts = parse("x = 1\ny += 2\n").expect("parse");
        assert!(matches!(stmts[0], Stmt::Assign { .. }));
        assert!(matches!(
            stmts[1],
            Stmt::AugAssign { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_loops_and_try() {
        let src = "while True:\n    pass\nfor i in items:\n    pass\ntry:\n    pass\nexcept Exception as e:\n    pass\nfinally:\n    pass\n";
        let stmts = parse(src).expect("parse");
        assert!(matches!(stmts[0], Stmt::While { .. }));
        assert!(matches!(stmts[1], Stmt::For { .. }));
        assert!(matches!(stmts[2], Stmt::Try { .. }));
    }

    #[test]
    fn test_comprehension_identified() {
        let stmts = parse("[x for x in range(3)]\n").expect("parse");
        assert_eq!(
            stmts[0],
            Stmt::Expr(Expr::Comprehension(NodeKind::ListComp))
        );
    }

    #[test]
    fn test_lambda_and_displays() {
        let stmts = parse("lambda a, b: a + b\n[1, 2]\n{'k': 1}\n").expect("parse");
        assert!(matches!(stmts[0], Stmt::Expr(Expr::Lambda { .. })));
        assert!(matches!(stmts[1], Stmt::Expr(Expr::List(_))));
        assert!(matches!(stmts[2], Stmt::Expr(Expr::Dict(_))));
    }

    #[test]
    fn test_inline_suite() {
        let stmts = parse("def f(): return 1\n").expect("parse");
        let Stmt::FunctionDef { body, .. } = &stmts[0] else {
            panic!("expected function");
        };
        assert_eq!(body[0], Stmt::Return(Some(Expr::Int(1))));
    }

    #[test]
    fn test_async_def() {
        let stmts = parse("async def f():\n    pass\n").expect("parse");
        assert!(matches!(stmts[0], Stmt::AsyncFunctionDef { .. }));
    }

    #[test]
    fn test_syntax_error_carries_line() {
        let err = parse("def f(:\n    pass\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_precedence() {
        let stmts = parse("1 + 2 * 3\n").expect("parse");
        let Stmt::Expr(Expr::Binary { op, right, .. }) = &stmts[0] else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
    }
}
