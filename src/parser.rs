use super::ast::{Expr, Function, Prototype};
use super::error::{Error, ErrorKind, Result};
use super::lexer::Lexer;
use super::token::Token;
use std::collections::HashMap;

/// Binding strength of each binary operator character.
#[derive(Debug, Clone)]
pub struct PrecedenceTable(HashMap<char, i32>);

impl Default for PrecedenceTable {
    fn default() -> Self {
        let mut table = PrecedenceTable(HashMap::new());
        table.insert('<', 1);
        table.insert('+', 2);
        table.insert('-', 2);
        table.insert('*', 3);
        table.insert('/', 3);
        table
    }
}

impl PrecedenceTable {
    /// Precedences must be positive; other values are ignored.
    pub fn insert(&mut self, op: char, precedence: i32) {
        if precedence > 0 {
            self.0.insert(op, precedence);
        }
    }

    pub fn get(&self, op: char) -> Option<i32> {
        self.0.get(&op).cloned()
    }
}

fn unexpected(expected: &str, found: &Token) -> Error {
    Error::from(ErrorKind::UnexpectedToken {
        expected: expected.to_owned(),
        found: found.to_string(),
    })
}

/// Recursive-descent parser holding one token of lookahead.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    precedence: PrecedenceTable,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Result<Self> {
        Parser::with_precedence(lexer, PrecedenceTable::default())
    }

    pub fn with_precedence(mut lexer: Lexer<'a>, precedence: PrecedenceTable) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            precedence,
        })
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<()> {
        if self.current != token {
            return Err(unexpected(expected, &self.current));
        }
        self.advance()
    }

    fn token_precedence(&self) -> i32 {
        match self.current {
            Token::Kwd(op) => self.precedence.get(op).unwrap_or(-1),
            _ => -1,
        }
    }

    pub fn parse_primary(&mut self) -> Result<Expr> {
        match self.current {
            Token::Ident(_) => self.parse_identifier_expr(),
            Token::Number(_) => self.parse_number(),
            Token::LParen => self.parse_paren_expr(),
            Token::If => self.parse_conditional(),
            _ => Err(unexpected("an expression", &self.current)),
        }
    }

    fn parse_number(&mut self) -> Result<Expr> {
        match self.current {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            _ => Err(unexpected("a number", &self.current)),
        }
    }

    pub fn parse_identifier_expr(&mut self) -> Result<Expr> {
        let name = match &self.current {
            Token::Ident(id) => id.clone(),
            t => return Err(unexpected("an identifier", t)),
        };
        self.advance()?;

        if self.current != Token::LParen {
            return Ok(Expr::Variable(name));
        }
        self.advance()?;

        let mut args = Vec::new();
        if self.current != Token::RParen {
            loop {
                args.push(self.parse_expression()?);
                match self.current {
                    Token::RParen => break,
                    Token::Comma => self.advance()?,
                    _ => {
                        return Err(unexpected("`)` or `,` in argument list", &self.current));
                    }
                }
            }
        }
        self.advance()?;
        Ok(Expr::Call(name, args))
    }

    pub fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.expect(Token::LParen, "`(`")?;
        let e = self.parse_expression()?;
        self.expect(Token::RParen, "`)`")?;
        Ok(e)
    }

    pub fn parse_conditional(&mut self) -> Result<Expr> {
        self.expect(Token::If, "`if`")?;
        let cond = self.parse_expression()?;
        self.expect(Token::Then, "`then`")?;
        let then = self.parse_expression()?;
        self.expect(Token::Else, "`else`")?;
        let else_ = self.parse_expression()?;
        Ok(Expr::if_(cond, then, else_))
    }

    pub fn parse_expression(&mut self) -> Result<Expr> {
        let lhs = self.parse_primary()?;
        self.parse_binop_rhs(0, lhs)
    }

    /// Precedence climbing: folds operators binding at least `min_prec`
    /// onto `lhs`. Equal precedence associates to the left.
    pub fn parse_binop_rhs(&mut self, min_prec: i32, mut lhs: Expr) -> Result<Expr> {
        loop {
            let prec = self.token_precedence();
            let op = match self.current {
                Token::Kwd(op) if prec >= 0 && prec >= min_prec => op,
                _ => return Ok(lhs),
            };
            self.advance()?;

            let mut rhs = self.parse_primary()?;
            if prec < self.token_precedence() {
                rhs = self.parse_binop_rhs(prec + 1, rhs)?;
            }
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    /// `name ( params )`, where parameters may be separated by commas.
    pub fn parse_prototype(&mut self) -> Result<Prototype> {
        let name = match &self.current {
            Token::Ident(id) => id.clone(),
            t => return Err(unexpected("function name in prototype", t)),
        };
        self.advance()?;
        self.expect(Token::LParen, "`(` in prototype")?;

        let mut params = Vec::new();
        while let Token::Ident(id) = &self.current {
            params.push(id.clone());
            self.advance()?;
            if self.current == Token::Comma {
                self.advance()?;
                if let Token::Ident(_) = self.current {
                    continue;
                }
                return Err(unexpected("parameter name after `,`", &self.current));
            }
        }

        self.expect(Token::RParen, "`)` in prototype")?;
        Ok(Prototype(name, params))
    }

    pub fn parse_function_definition(&mut self) -> Result<Function> {
        self.expect(Token::Def, "`def`")?;
        let proto = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(Function(proto, body))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parser(s: &str) -> Parser<'_> {
        Parser::new(Lexer::new(s)).unwrap()
    }

    fn expr(s: &str) -> Result<Expr> {
        parser(s).parse_expression()
    }

    fn num(n: u32) -> Expr {
        Expr::Number(n)
    }

    fn var(s: &str) -> Expr {
        Expr::Variable(s.to_owned())
    }

    #[test]
    fn test_primary() {
        assert_eq!(parser("1").parse_primary().unwrap(), num(1));
        assert_eq!(parser("y").parse_primary().unwrap(), var("y"));
        assert_eq!(parser("(y)").parse_primary().unwrap(), var("y"));

        let e = parser(")").parse_primary().unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::UnexpectedToken {
                expected: "an expression".to_owned(),
                found: "`)`".to_owned()
            }
        );
    }

    #[test]
    fn test_expr() {
        assert_eq!(expr("1 + 2").unwrap(), Expr::binary('+', num(1), num(2)));

        assert_eq!(
            expr("1 + 2 * 3").unwrap(),
            Expr::binary('+', num(1), Expr::binary('*', num(2), num(3)))
        );

        assert_eq!(
            expr("(1 + 2) * 3").unwrap(),
            Expr::binary('*', Expr::binary('+', num(1), num(2)), num(3))
        );

        assert_eq!(
            expr("1 - 2 - 3").unwrap(),
            Expr::binary('-', Expr::binary('-', num(1), num(2)), num(3))
        );

        assert_eq!(
            expr("8 / 4 * 2").unwrap(),
            Expr::binary('*', Expr::binary('/', num(8), num(4)), num(2))
        );

        assert_eq!(
            expr("1 + 2 * 3 - 4").unwrap(),
            Expr::binary(
                '-',
                Expr::binary('+', num(1), Expr::binary('*', num(2), num(3))),
                num(4)
            )
        );

        assert_eq!(
            expr("a < b + 1").unwrap(),
            Expr::binary('<', var("a"), Expr::binary('+', var("b"), num(1)))
        );
    }

    #[test]
    fn test_expr_stops_at_non_operator() {
        let mut p = parser("x ; y");
        assert_eq!(p.parse_expression().unwrap(), var("x"));
        assert_eq!(p.current(), &Token::Kwd(';'));

        let mut p = parser("1 + 2 ) 3");
        assert_eq!(
            p.parse_expression().unwrap(),
            Expr::binary('+', num(1), num(2))
        );
        assert_eq!(p.current(), &Token::RParen);
    }

    #[test]
    fn test_custom_precedence() {
        let mut table = PrecedenceTable::default();
        table.insert('%', 3);
        table.insert('^', 0);
        let mut p = Parser::with_precedence(Lexer::new("1 + 2 % 3 ^ 4"), table).unwrap();
        assert_eq!(
            p.parse_expression().unwrap(),
            Expr::binary('+', num(1), Expr::binary('%', num(2), num(3)))
        );
        assert_eq!(p.current(), &Token::Kwd('^'));
    }

    #[test]
    fn test_call() {
        assert_eq!(
            expr("foo(y, 4)").unwrap(),
            Expr::Call("foo".to_owned(), vec![var("y"), num(4)])
        );
        assert_eq!(expr("foo()").unwrap(), Expr::Call("foo".to_owned(), vec![]));
        assert_eq!(
            expr("f(g(1), 2 + 3)").unwrap(),
            Expr::Call(
                "f".to_owned(),
                vec![
                    Expr::Call("g".to_owned(), vec![num(1)]),
                    Expr::binary('+', num(2), num(3))
                ]
            )
        );
    }

    #[test]
    fn test_malformed_call() {
        assert!(expr("foo(1,").is_err());
        assert!(expr("foo(1,)").is_err());
        assert!(expr("foo(1").is_err());
        assert!(expr("foo(1 2)").is_err());
    }

    #[test]
    fn test_paren() {
        assert!(expr("(1 + 2").is_err());
        assert_eq!(expr("((7))").unwrap(), num(7));
    }

    #[test]
    fn test_if() {
        assert_eq!(
            expr("if x < 3 then 1 else f(x)").unwrap(),
            Expr::if_(
                Expr::binary('<', var("x"), num(3)),
                num(1),
                Expr::Call("f".to_owned(), vec![var("x")])
            )
        );

        assert_eq!(
            expr("if a then if b then 1 else 2 else 3").unwrap(),
            Expr::if_(var("a"), Expr::if_(var("b"), num(1), num(2)), num(3))
        );

        let e = expr("if 1 then 2").unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::UnexpectedToken {
                expected: "`else`".to_owned(),
                found: "end of input".to_owned()
            }
        );
        assert!(expr("if 1 else 2").is_err());
    }

    #[test]
    fn test_prototype() {
        assert_eq!(
            parser("f()").parse_prototype().unwrap(),
            Prototype("f".to_owned(), vec![])
        );
        assert_eq!(
            parser("f(a b)").parse_prototype().unwrap(),
            Prototype("f".to_owned(), vec!["a".to_owned(), "b".to_owned()])
        );
        assert_eq!(
            parser("f(a, b, a)").parse_prototype().unwrap(),
            Prototype(
                "f".to_owned(),
                vec!["a".to_owned(), "b".to_owned(), "a".to_owned()]
            )
        );
        assert!(parser("f(a,)").parse_prototype().is_err());
        assert!(parser("f(1)").parse_prototype().is_err());
        assert!(parser("(a)").parse_prototype().is_err());
        assert!(parser("f a").parse_prototype().is_err());
    }

    #[test]
    fn test_definition() {
        let mut p = parser("def id(x) x 7");
        assert_eq!(
            p.parse_function_definition().unwrap(),
            Function(Prototype("id".to_owned(), vec!["x".to_owned()]), var("x"))
        );
        assert_eq!(p.current(), &Token::Number(7));

        assert!(parser("def (x) x").parse_function_definition().is_err());
        assert!(parser("def f(x)").parse_function_definition().is_err());
    }
}
