use super::error::{ErrorKind, Result};
use super::token::Token;
use combine::error::ParseError;
use combine::parser::char::{alpha_num, digit, letter, space};
use combine::parser::choice::or;
use combine::parser::EasyParser;
use combine::stream::Stream;
use combine::{any, choice, eof, many, many1, satisfy, skip_many, token, Parser};

fn number<Input>() -> impl Parser<Input, Output = Token>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    // Literals wrap to the 32-bit working width.
    many1(digit()).map(|digits: String| {
        Token::Number(digits.bytes().fold(0u32, |n, b| {
            n.wrapping_mul(10).wrapping_add(u32::from(b - b'0'))
        }))
    })
}

fn ident<Input>() -> impl Parser<Input, Output = Token>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    (letter(), many(alpha_num())).map(|(first, rest): (char, String)| {
        let mut s = String::with_capacity(rest.len() + 1);
        s.push(first);
        s.push_str(&rest);
        match s.as_ref() {
            "def" => Token::Def,
            "if" => Token::If,
            "then" => Token::Then,
            "else" => Token::Else,
            id => Token::Ident(id.to_string()),
        }
    })
}

fn comment<Input>() -> impl Parser<Input, Output = ()>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    token('#').with(skip_many(satisfy(|c: char| c != '\n' && c != '\r')))
}

fn trivia<Input>() -> impl Parser<Input, Output = ()>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    skip_many(or(space().map(|_| ()), comment()))
}

pub(crate) fn lex<Input>() -> impl Parser<Input, Output = Token>
where
    Input: Stream<Token = char>,
    Input::Error: ParseError<Input::Token, Input::Range, Input::Position>,
{
    trivia().with(choice((
        number(),
        ident(),
        token('(').map(|_| Token::LParen),
        token(')').map(|_| Token::RParen),
        token(',').map(|_| Token::Comma),
        eof().map(|_| Token::Eof),
        any().map(Token::Kwd),
    )))
}

/// Single-pass token source over a program text.
///
/// Each call to [`Lexer::next_token`] consumes exactly one token from the
/// unread input; once the input is exhausted every further call yields
/// [`Token::Eof`].
pub struct Lexer<'a> {
    source: &'a str,
    rest: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            rest: source,
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        match lex().easy_parse(self.rest) {
            Ok((token, rest)) => {
                self.rest = rest;
                Ok(token)
            }
            Err(e) => {
                let source = self.source;
                let e = e.map_position(|p| p.translate_position(source));
                self.rest = "";
                Err(ErrorKind::Lex(e.to_string()).into())
            }
        }
    }
}

/// Lexes a whole program; the result always ends with exactly one `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::token::Token::*;
    use super::*;

    #[test]
    fn test_number() {
        assert_eq!(number().easy_parse("42").map(|x| x.0), Ok(Number(42)));
        assert_eq!(
            number().easy_parse("4294967297").map(|x| x.0),
            Ok(Number(1))
        );
    }

    #[test]
    fn test_ident() {
        assert_eq!(
            ident().easy_parse("test1").map(|x| x.0),
            Ok(Ident("test1".to_owned()))
        );

        assert_eq!(ident().easy_parse("def").map(|x| x.0), Ok(Def));
        assert_eq!(ident().easy_parse("if").map(|x| x.0), Ok(If));
        assert_eq!(ident().easy_parse("then").map(|x| x.0), Ok(Then));
        assert_eq!(ident().easy_parse("else").map(|x| x.0), Ok(Else));
        assert_eq!(
            ident().easy_parse("define").map(|x| x.0),
            Ok(Ident("define".to_owned()))
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(comment().easy_parse("#x\n1"), Ok(((), "\n1")));
        assert_eq!(comment().easy_parse("# a b\r\n2"), Ok(((), "\r\n2")));
        assert_eq!(comment().easy_parse("#"), Ok(((), "")));
    }

    #[test]
    fn test_lex() {
        assert_eq!(
            lex()
                .easy_parse(
                    r#"#comment
42
"#
                )
                .map(|x| x.0),
            Ok(Number(42))
        );
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("def f(x, y) x + y*2 # trailing").unwrap(),
            vec![
                Def,
                Ident("f".to_owned()),
                LParen,
                Ident("x".to_owned()),
                Comma,
                Ident("y".to_owned()),
                RParen,
                Ident("x".to_owned()),
                Kwd('+'),
                Ident("y".to_owned()),
                Kwd('*'),
                Number(2),
                Eof
            ]
        );
    }

    #[test]
    fn test_comments_never_surface() {
        let tokens = tokenize("# one\n# two\r\n1 # three\n#four").unwrap();
        assert_eq!(tokens, vec![Number(1), Eof]);
    }

    #[test]
    fn test_digits_then_letters() {
        assert_eq!(
            tokenize("12ab").unwrap(),
            vec![Number(12), Ident("ab".to_owned()), Eof]
        );
    }

    #[test]
    fn test_unknown_characters() {
        assert_eq!(
            tokenize("a<b;").unwrap(),
            vec![
                Ident("a".to_owned()),
                Kwd('<'),
                Ident("b".to_owned()),
                Kwd(';'),
                Eof
            ]
        );
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("  ");
        assert_eq!(lexer.next_token().unwrap(), Eof);
        assert_eq!(lexer.next_token().unwrap(), Eof);
        assert_eq!(tokenize("").unwrap(), vec![Eof]);
    }
}
