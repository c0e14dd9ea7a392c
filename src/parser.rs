use crate::ast::{Expr, Transform, UnaryOp};
use crate::error::Error;
use crate::lexer::{Lexer, Token};
use crate::registry::Grammar;
use crate::types::Value;

/// Precedence-climbing parser over a [`Grammar`].
///
/// Binary operators, including word operators like `in`, are looked up in
/// the grammar, so the same source can parse differently under registries
/// with different operator tables. Transforms bind tighter than unary and
/// binary operators; the ternary binds loosest.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    grammar: &'a Grammar,
    lookahead: Token,
    look_pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, grammar: &'a Grammar, max_depth: usize) -> Result<Self, Error> {
        let mut lexer = Lexer::new(input, grammar.symbols());
        let lookahead = lexer.next_token()?;
        let look_pos = lexer.last_start();
        Ok(Self { lexer, grammar, lookahead, look_pos, depth: 0, max_depth })
    }

    fn bump(&mut self) -> Result<(), Error> {
        self.lookahead = self.lexer.next_token()?;
        self.look_pos = self.lexer.last_start();
        Ok(())
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<(), Error> {
        if self.lookahead == tok {
            self.bump()
        } else {
            self.err_here(&format!("Expected {}, found {}", what, self.lookahead))
        }
    }

    fn err_here<T>(&self, msg: &str) -> Result<T, Error> {
        Err(Error::parse(msg, Some(self.look_pos)))
    }

    fn descend(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    pub fn parse(&mut self) -> Result<Expr, Error> {
        if self.lookahead == Token::Eof {
            return self.err_here("Empty expression");
        }
        let expr = self.parse_expr()?;
        match self.lookahead {
            Token::Eof => Ok(expr),
            _ => self.err_here(&format!("Unexpected {}", self.lookahead)),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.descend()?;
        let expr = self.parse_ternary();
        self.depth -= 1;
        expr
    }

    fn parse_ternary(&mut self) -> Result<Expr, Error> {
        let test = self.parse_binary(0)?;
        if self.lookahead != Token::QMark {
            return Ok(test);
        }
        self.bump()?;
        let consequent = self.parse_expr()?;
        self.expect(Token::Colon, "':' in conditional expression")?;
        let alternate = self.parse_expr()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// The binary operator at the lookahead and its precedence, if any.
    fn peek_operator(&self) -> Option<(String, u8)> {
        let op = match &self.lookahead {
            Token::Operator(op) | Token::Identifier(op) => op,
            _ => return None,
        };
        self.grammar.precedence(op).map(|prec| (op.clone(), prec))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        // every fold nests `left` one level deeper, so it counts towards the cap
        let mut folds = 0;
        while let Some((op, prec)) = self.peek_operator() {
            if prec < min_prec {
                break;
            }
            self.bump()?;
            self.descend()?;
            folds += 1;
            // nothing binds tighter than the top precedence
            let right = match prec.checked_add(1) {
                Some(next) => self.parse_binary(next)?,
                None => self.parse_unary()?,
            };
            left = Expr::binary(op, left, right);
        }
        self.depth -= folds;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match &self.lookahead {
            Token::Bang => Some(UnaryOp::Not),
            Token::Operator(op) if op == "-" => Some(UnaryOp::Minus),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix();
        };
        self.bump()?;
        self.descend()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand?)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut node = self.parse_atom()?;
        let mut wraps = 0;
        loop {
            if matches!(self.lookahead, Token::Dot | Token::LBracket | Token::Pipe) {
                self.descend()?;
                wraps += 1;
            }
            match self.lookahead {
                Token::Dot => {
                    self.bump()?;
                    let name = match self.lookahead.clone() {
                        Token::Identifier(s) => s,
                        Token::True => "true".to_string(),
                        Token::False => "false".to_string(),
                        Token::Null => "null".to_string(),
                        _ => return self.err_here("Expected property name after '.'"),
                    };
                    self.bump()?;
                    node = Expr::Member {
                        target: Box::new(node),
                        property: Box::new(Expr::Literal(Value::String(name))),
                    };
                }
                Token::LBracket => {
                    self.bump()?;
                    let property = self.parse_expr()?;
                    self.expect(Token::RBracket, "']' after property expression")?;
                    node = Expr::Member { target: Box::new(node), property: Box::new(property) };
                }
                Token::Pipe => {
                    self.bump()?;
                    let name = match self.lookahead.clone() {
                        Token::Identifier(s) => s,
                        _ => return self.err_here("Expected transform name after '|'"),
                    };
                    self.bump()?;
                    let args = if self.lookahead == Token::LParen {
                        self.bump()?;
                        self.parse_list(Token::RParen, "')' or ',' in transform arguments")?
                    } else {
                        Vec::new()
                    };
                    node = Expr::Transform(Transform { name, subject: Box::new(node), args });
                }
                _ => break,
            }
        }
        self.depth -= wraps;
        Ok(node)
    }

    /// Comma separated expressions up to and including `close`.
    fn parse_list(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, Error> {
        let mut items = Vec::new();
        if self.lookahead == close {
            self.bump()?;
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if self.lookahead == Token::Comma {
                self.bump()?;
            } else if self.lookahead == close {
                self.bump()?;
                return Ok(items);
            } else {
                return self.err_here(&format!("Expected {}", what));
            }
        }
    }

    fn parse_object(&mut self) -> Result<Expr, Error> {
        let mut entries = Vec::new();
        if self.lookahead == Token::RBrace {
            self.bump()?;
            return Ok(Expr::Object(entries));
        }
        loop {
            let key = match self.lookahead.clone() {
                Token::Identifier(s) | Token::String(s) => s,
                _ => return self.err_here("Expected object key"),
            };
            self.bump()?;
            self.expect(Token::Colon, "':' after object key")?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            match self.lookahead {
                Token::Comma => self.bump()?,
                Token::RBrace => {
                    self.bump()?;
                    return Ok(Expr::Object(entries));
                }
                _ => return self.err_here("Expected ',' or '}' in object literal"),
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, Error> {
        match self.lookahead.clone() {
            Token::Number(n) => {
                self.bump()?;
                Ok(Expr::Literal(Value::Number(n)))
            }
            Token::String(s) => {
                self.bump()?;
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::True => {
                self.bump()?;
                Ok(Expr::Literal(Value::Boolean(true)))
            }
            Token::False => {
                self.bump()?;
                Ok(Expr::Literal(Value::Boolean(false)))
            }
            Token::Null => {
                self.bump()?;
                Ok(Expr::Literal(Value::Null))
            }
            Token::Identifier(name) => {
                self.bump()?;
                Ok(Expr::Identifier(name))
            }
            Token::LParen => {
                self.bump()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::LBracket => {
                self.bump()?;
                let items = self.parse_list(Token::RBracket, "',' or ']' in array literal")?;
                Ok(Expr::Array(items))
            }
            Token::LBrace => {
                self.bump()?;
                self.parse_object()
            }
            Token::Eof => self.err_here("Unexpected end of expression"),
            other => self.err_here(&format!("Unexpected {}", other)),
        }
    }
}

/// Parse `input` with the given operator table.
pub fn parse_with(input: &str, grammar: &Grammar, max_depth: usize) -> Result<Expr, Error> {
    Parser::new(input, grammar, max_depth)?.parse()
}
