use crate::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Identifier(String),
    String(String),
    True,
    False,
    Null,
    /// A symbolic operator from the grammar, e.g. `==` or `//`.
    Operator(String),
    Bang,
    Pipe,
    Dot,
    Comma,
    Colon,
    QMark,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Identifier(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::True => write!(f, "'true'"),
            Token::False => write!(f, "'false'"),
            Token::Null => write!(f, "'null'"),
            Token::Operator(op) => write!(f, "operator '{}'", op),
            Token::Bang => write!(f, "'!'"),
            Token::Pipe => write!(f, "'|'"),
            Token::Dot => write!(f, "'.'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::QMark => write!(f, "'?'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

/// Byte lexer. Symbolic operators are matched greedily against the operator
/// table it is given, so operators registered at runtime lex like built-ins.
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a [u8],
    symbols: &'a [String],
    pos: usize,
    last_start: usize,
    last_end: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, symbols: &'a [String]) -> Self {
        Self {
            input: input.as_bytes(),
            symbols,
            pos: 0,
            last_start: 0,
            last_end: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn number(&mut self, start: usize) -> Result<Token, Error> {
        let mut has_dot = self.input[start] == b'.';
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => self.pos += 1,
                // only a dot followed by a digit continues the number
                b'.' if !has_dot && matches!(self.peek_at(1), Some(b'0'..=b'9')) => {
                    has_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| Error::parse("Invalid number", Some(start)))?;
        let n: f64 = text
            .parse()
            .map_err(|_| Error::parse(format!("Invalid number '{}'", text), Some(start)))?;
        Ok(Token::Number(n))
    }

    fn identifier(&mut self, start: usize) -> Result<Token, Error> {
        while let Some(c) = self.peek() {
            match c {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$' => self.pos += 1,
                _ => break,
            }
        }
        let s = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| Error::parse("Invalid identifier", Some(start)))?;
        Ok(match s {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Identifier(s.to_string()),
        })
    }

    fn string(&mut self, quote: u8) -> Result<Token, Error> {
        // escapes: \" \' \\ \n \t; other bytes, including UTF-8, are kept as is
        let mut buf: Vec<u8> = Vec::new();
        while let Some(c) = self.bump() {
            if c == quote {
                return String::from_utf8(buf)
                    .map(Token::String)
                    .map_err(|_| Error::parse("Invalid UTF-8 in string", Some(self.last_start)));
            }
            if c == b'\\' {
                match self.bump() {
                    Some(b'n') => buf.push(b'\n'),
                    Some(b't') => buf.push(b'\t'),
                    Some(b'r') => buf.push(b'\r'),
                    Some(x) => buf.push(x),
                    None => return Err(Error::parse("Unterminated escape in string", Some(self.pos))),
                }
            } else {
                buf.push(c);
            }
        }
        Err(Error::parse("Unterminated string literal", Some(self.last_start)))
    }

    fn operator(&mut self) -> Option<Token> {
        let rest = &self.input[self.pos..];
        let op = self.symbols.iter().find(|op| rest.starts_with(op.as_bytes()))?;
        self.pos += op.len();
        Some(Token::Operator(op.clone()))
    }

    pub fn next_token(&mut self) -> Result<Token, Error> {
        self.skip_ws();
        self.last_start = self.pos;
        let token = self.scan()?;
        self.last_end = self.pos;
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, Error> {
        let start = self.pos;
        let ch = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'0'..=b'9' => return self.number(start),
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => {
                self.pos += 1;
                return self.number(start);
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => return self.identifier(start),
            b'"' | b'\'' => {
                self.pos += 1;
                return self.string(ch);
            }
            _ => {}
        }

        // grammar operators first so `||`, `!=` and `-` win over `|` and `!`
        if let Some(op) = self.operator() {
            return Ok(op);
        }

        self.pos += 1;
        Ok(match ch {
            b'!' => Token::Bang,
            b'|' => Token::Pipe,
            b'-' => Token::Operator("-".to_string()),
            b'.' => Token::Dot,
            b',' => Token::Comma,
            b':' => Token::Colon,
            b'?' => Token::QMark,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            _ => {
                let shown = std::str::from_utf8(&self.input[start..])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or('?');
                return Err(Error::parse(format!("Unexpected character '{}'", shown), Some(start)));
            }
        })
    }

    pub fn last_start(&self) -> usize {
        self.last_start
    }

    pub fn last_end(&self) -> usize {
        self.last_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn tokens(input: &str) -> Vec<Token> {
        let registry = Registry::new();
        let mut lexer = Lexer::new(input, registry.grammar().symbols());
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap();
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn pipe_versus_or() {
        assert_eq!(
            tokens(r#""a"|answer || 1.0|answer"#),
            vec![
                Token::String("a".into()),
                Token::Pipe,
                Token::Identifier("answer".into()),
                Token::Operator("||".into()),
                Token::Number(1.0),
                Token::Pipe,
                Token::Identifier("answer".into()),
            ]
        );
    }

    #[test]
    fn greedy_operators_and_bang() {
        assert_eq!(
            tokens("a != !b // 2"),
            vec![
                Token::Identifier("a".into()),
                Token::Operator("!=".into()),
                Token::Bang,
                Token::Identifier("b".into()),
                Token::Operator("//".into()),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn numbers_and_member_dots() {
        assert_eq!(tokens(".5"), vec![Token::Number(0.5)]);
        assert_eq!(
            tokens("info.form"),
            vec![Token::Identifier("info".into()), Token::Dot, Token::Identifier("form".into())]
        );
        assert_eq!(tokens("'it\\'s'"), vec![Token::String("it's".into())]);
    }

    #[test]
    fn positions_and_errors() {
        let registry = Registry::new();
        let mut lexer = Lexer::new("  foo", registry.grammar().symbols());
        lexer.next_token().unwrap();
        assert_eq!(lexer.last_start(), 2);
        assert_eq!(lexer.last_end(), 5);

        let mut lexer = Lexer::new("a = b", registry.grammar().symbols());
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.position(), Some(2));

        let mut lexer = Lexer::new("'open", registry.grammar().symbols());
        assert!(lexer.next_token().is_err());
    }
}
