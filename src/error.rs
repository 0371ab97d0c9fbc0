use failure::{Backtrace, Context, Fail};
use std::fmt;
use std::result;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum ErrorKind {
    #[fail(display = "{}", _0)]
    Lex(String),
    #[fail(display = "expected {}, found {}", expected, found)]
    UnexpectedToken { expected: String, found: String },
    #[fail(display = "unbound identifier `{}`", _0)]
    UnboundIdentifier(String),
    #[fail(display = "function `{}` is already defined", _0)]
    Redefinition(String),
    #[fail(
        display = "function `{}` redeclared with {} parameters, previously declared with {}",
        name, found, expected
    )]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[fail(display = "unknown binary operator '{}'", _0)]
    UnknownOperator(char),
    #[fail(display = "{}", _0)]
    Codegen(String),
    #[fail(display = "invalid function `{}`: {}", function, reason)]
    Verify { function: String, reason: String },
    #[fail(display = "{}", _0)]
    Eval(String),
    #[fail(display = "{}", _0)]
    Io(String),
}

/// The pipeline stage an error originates from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Lex,
    Parse,
    Codegen,
    Verify,
    Eval,
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Codegen => "codegen",
            Stage::Verify => "verify",
            Stage::Eval => "eval",
            Stage::Io => "io",
        };
        f.write_str(name)
    }
}

impl ErrorKind {
    pub fn stage(&self) -> Stage {
        match self {
            ErrorKind::Lex(_) => Stage::Lex,
            ErrorKind::UnexpectedToken { .. } => Stage::Parse,
            ErrorKind::UnboundIdentifier(_)
            | ErrorKind::Redefinition(_)
            | ErrorKind::ArityMismatch { .. }
            | ErrorKind::UnknownOperator(_)
            | ErrorKind::Codegen(_) => Stage::Codegen,
            ErrorKind::Verify { .. } => Stage::Verify,
            ErrorKind::Eval(_) => Stage::Eval,
            ErrorKind::Io(_) => Stage::Io,
        }
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.inner.get_context()
    }

    pub fn stage(&self) -> Stage {
        self.kind().stage()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Context::new(kind),
        }
    }
}
