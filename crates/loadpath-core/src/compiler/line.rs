//! Line-oriented compiler.
//!
//! Each non-blank line is one statement:
//!
//! ```text
//! pass
//! name = 42 | "text" | True | False | None | other.name
//! import a.b [as x], c
//! from ..pkg import a [as b], c
//! from . import *
//! raise "message"
//! ```
//!
//! `#` starts a comment outside string literals.

use super::{CodeObject, Compiler, Expr, ImportedName, Stmt, StmtKind};
use crate::error::SyntaxError;

const KEYWORDS: &[&str] = &["pass", "import", "from", "as", "raise", "True", "False", "None"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Eq,
    Dot,
    Comma,
    Star,
}

/// The default [`Compiler`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCompiler;

impl LineCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for LineCompiler {
    fn name(&self) -> &'static str {
        "line"
    }

    fn compile(&self, source: &str, origin: &str) -> Result<CodeObject, SyntaxError> {
        let mut body = Vec::new();
        for (idx, text) in source.lines().enumerate() {
            let line = idx + 1;
            let err = |message: String| SyntaxError::new(origin, Some(line), message);
            let tokens = tokenize(text).map_err(err)?;
            if tokens.is_empty() {
                continue;
            }
            for kind in parse(&tokens).map_err(err)? {
                body.push(Stmt { line, kind });
            }
        }
        Ok(CodeObject::new(origin, body))
    }
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '#' => break,
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::Str(scan_string(&mut chars, c)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                chars.next();
                let mut digits = String::from(c);
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| format!("invalid integer literal {digits:?}"))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("invalid character {other:?}")),
        }
    }

    Ok(tokens)
}

fn scan_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
) -> Result<String, String> {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            c if c == quote => return Ok(out),
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err("EOL while scanning string literal".to_string())
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if s == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn identifier(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(s)) if !KEYWORDS.contains(&s.as_str()) => Ok(s.clone()),
            _ => Err("invalid syntax".to_string()),
        }
    }

    fn dotted(&mut self) -> Result<String, String> {
        let mut name = self.identifier()?;
        while self.eat(&Token::Dot) {
            name.push('.');
            name.push_str(&self.identifier()?);
        }
        Ok(name)
    }

    fn alias(&mut self) -> Result<Option<String>, String> {
        if self.eat_keyword("as") {
            self.identifier().map(Some)
        } else {
            Ok(None)
        }
    }

    fn finish(&self) -> Result<(), String> {
        if self.at_end() {
            Ok(())
        } else {
            Err("invalid syntax".to_string())
        }
    }
}

fn parse(tokens: &[Token]) -> Result<Vec<StmtKind>, String> {
    let mut cur = Cursor { tokens, pos: 0 };

    if cur.eat_keyword("pass") {
        cur.finish()?;
        return Ok(vec![StmtKind::Pass]);
    }

    if cur.eat_keyword("import") {
        let mut stmts = Vec::new();
        loop {
            let module = cur.dotted()?;
            let alias = cur.alias()?;
            stmts.push(StmtKind::Import { module, alias });
            if !cur.eat(&Token::Comma) {
                break;
            }
        }
        cur.finish()?;
        return Ok(stmts);
    }

    if cur.eat_keyword("from") {
        let mut level = 0;
        while cur.eat(&Token::Dot) {
            level += 1;
        }
        let module = if matches!(cur.peek(), Some(Token::Ident(s)) if s == "import") {
            if level == 0 {
                return Err("invalid syntax".to_string());
            }
            String::new()
        } else {
            cur.dotted()?
        };
        if !cur.eat_keyword("import") {
            return Err("invalid syntax".to_string());
        }

        let mut names = Vec::new();
        if !cur.eat(&Token::Star) {
            loop {
                let name = cur.identifier()?;
                let alias = cur.alias()?;
                names.push(ImportedName { name, alias });
                if !cur.eat(&Token::Comma) {
                    break;
                }
            }
        }
        cur.finish()?;
        return Ok(vec![StmtKind::ImportFrom {
            module,
            level,
            names,
        }]);
    }

    if cur.eat_keyword("raise") {
        let message = match cur.next() {
            Some(Token::Str(s)) => s.clone(),
            _ => return Err("raise expects a string literal".to_string()),
        };
        cur.finish()?;
        return Ok(vec![StmtKind::Raise { message }]);
    }

    let target = cur.identifier()?;
    if !cur.eat(&Token::Eq) {
        return Err("invalid syntax".to_string());
    }
    let expr = match cur.peek() {
        Some(Token::Int(i)) => {
            cur.next();
            Expr::Int(*i)
        }
        Some(Token::Str(s)) => {
            cur.next();
            Expr::Str(s.clone())
        }
        Some(Token::Ident(s)) if s == "True" || s == "False" || s == "None" => {
            cur.next();
            match s.as_str() {
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                _ => Expr::None,
            }
        }
        _ => Expr::Name(cur.dotted()?),
    };
    cur.finish()?;
    Ok(vec![StmtKind::Assign { target, expr }])
}
