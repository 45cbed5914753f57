// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tokenizer and recursive-descent parser.

use crate::expr::{BinaryOp, Expr, ExprError, Result, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Str(String),
    Ident(String),
    And,
    Or,
    Not,
    In,
    True,
    False,
    Eq,
    Ne,
    Pipe,
    Caret,
    Amp,
    Minus,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Str(value) => format!("string {value:?}"),
            Self::Ident(name) => format!("identifier `{name}`"),
            Self::And => "`and`".into(),
            Self::Or => "`or`".into(),
            Self::Not => "`not`".into(),
            Self::In => "`in`".into(),
            Self::True => "`true`".into(),
            Self::False => "`false`".into(),
            Self::Eq => "`==`".into(),
            Self::Ne => "`!=`".into(),
            Self::Pipe => "`|`".into(),
            Self::Caret => "`^`".into(),
            Self::Amp => "`&`".into(),
            Self::Minus => "`-`".into(),
            Self::Comma => "`,`".into(),
            Self::LParen => "`(`".into(),
            Self::RParen => "`)`".into(),
            Self::LBrace => "`{`".into(),
            Self::RBrace => "`}`".into(),
        }
    }
}

/// Token paired with the 1-based column it starts at.
type Spanned = (Token, usize);

fn syntax(message: impl Into<String>, column: usize) -> ExprError {
    ExprError::Syntax {
        message: message.into(),
        column,
    }
}

fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let column = source[..idx].chars().count() + 1;
        let token = match ch {
            c if c.is_whitespace() => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            '|' => Token::Pipe,
            '^' => Token::Caret,
            '&' => Token::Amp,
            '-' => Token::Minus,
            '=' | '!' => match chars.next_if(|(_, next)| *next == '=') {
                Some(_) if ch == '=' => Token::Eq,
                Some(_) => Token::Ne,
                None => return Err(syntax(format!("expected `{ch}=`"), column)),
            },
            quote @ ('"' | '\'') => {
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, c @ ('\\' | '"' | '\''))) => value.push(c),
                            Some((_, c)) => {
                                return Err(syntax(format!("unknown escape `\\{c}`"), column))
                            }
                            None => return Err(syntax("unterminated string", column)),
                        },
                        Some((_, c)) => value.push(c),
                        None => return Err(syntax("unterminated string", column)),
                    }
                }
                Token::Str(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some((_, c)) =
                    chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
                {
                    word.push(c);
                }
                match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    _ => Token::Ident(word),
                }
            }
            c => return Err(syntax(format!("unexpected character `{c}`"), column)),
        };
        tokens.push((token, column));
    }

    Ok(tokens)
}

/// Deepest nesting of parentheses, set literals and `not` accepted.
pub(crate) const MAX_DEPTH: usize = 64;

/// Parse expression source into syntax tree.
pub(crate) fn parse(source: &str) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let end = source.chars().count() + 1;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
        depth: 0,
    };

    if parser.tokens.is_empty() {
        return Err(syntax("empty expression", 1));
    }

    let expr = parser.parse_or()?;
    match parser.tokens.get(parser.pos) {
        Some((token, column)) => Err(syntax(
            format!("unexpected {} after expression", token.describe()),
            *column,
        )),
        None => Ok(expr),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(token, _)| token)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |(_, column)| *column)
    }

    // INVARIANT: Every recursive descent goes through here, bounding stack use.
    fn nested<T>(
        &mut self,
        column: usize,
        parse: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax(
                format!("expression nested deeper than {MAX_DEPTH} levels"),
                column,
            ));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn eat(&mut self, expect: &Token) -> bool {
        if self.peek() == Some(expect) {
            self.pos += 1;
            return true;
        }

        false
    }

    fn expect(&mut self, expect: &Token) -> Result<()> {
        if self.eat(expect) {
            return Ok(());
        }

        let found = match self.peek() {
            Some(token) => token.describe(),
            None => "end of expression".into(),
        };
        Err(syntax(
            format!("expected {}, found {found}", expect.describe()),
            self.column(),
        ))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_not()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        let column = self.column();
        if self.eat(&Token::Not) {
            let inner = self.nested(column, Self::parse_not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }

        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr> {
        let lhs = self.parse_set_op(0)?;
        let op = match (self.peek(), self.peek_nth(1)) {
            (Some(Token::Eq), _) => BinaryOp::Eq,
            (Some(Token::Ne), _) => BinaryOp::Ne,
            (Some(Token::In), _) => BinaryOp::In,
            (Some(Token::Not), Some(Token::In)) => BinaryOp::NotIn,
            _ => return Ok(lhs),
        };
        self.pos += if op == BinaryOp::NotIn { 2 } else { 1 };
        let rhs = self.parse_set_op(0)?;

        Ok(Expr::binary(op, lhs, rhs))
    }

    // Precedence climbing, loosest first: `|`, `^`, `&`, `-`.
    fn parse_set_op(&mut self, level: usize) -> Result<Expr> {
        static LEVELS: [(Token, BinaryOp); 4] = [
            (Token::Pipe, BinaryOp::Union),
            (Token::Caret, BinaryOp::SymmetricDifference),
            (Token::Amp, BinaryOp::Intersection),
            (Token::Minus, BinaryOp::Difference),
        ];

        let Some((token, op)) = LEVELS.get(level) else {
            return self.parse_primary();
        };

        let mut lhs = self.parse_set_op(level + 1)?;
        while self.eat(token) {
            let rhs = self.parse_set_op(level + 1)?;
            lhs = Expr::binary(*op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let column = self.column();
        let Some((token, _)) = self.tokens.get(self.pos).cloned() else {
            return Err(syntax("unexpected end of expression", column));
        };
        self.pos += 1;

        match token {
            Token::Str(value) => Ok(Expr::Literal(Value::Str(value))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::LParen => self.nested(column, |parser| {
                let inner = parser.parse_or()?;
                parser.expect(&Token::RParen)?;
                Ok(inner)
            }),
            Token::LBrace => self.nested(column, |parser| {
                let mut items = Vec::new();
                while !parser.eat(&Token::RBrace) {
                    items.push(parser.parse_or()?);
                    if !parser.eat(&Token::Comma) {
                        parser.expect(&Token::RBrace)?;
                        break;
                    }
                }
                Ok(Expr::SetLiteral(items))
            }),
            other => Err(syntax(format!("unexpected {}", other.describe()), column)),
        }
    }
}
