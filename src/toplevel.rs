use super::codegen::Codegen;
use super::error::{Error, ErrorKind, Result};
use super::parser::Parser;
use super::sink::IrSink;
use super::token::Token;
use std::io::Write;

/// Counts of top-level units handled by a [`Driver`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub generated: usize,
    pub failed: usize,
}

/// Feeds top-level units from a parser to a code generator, one at a time.
///
/// A unit that fails to parse or generate is reported and abandoned; the run
/// continues with the next unit.
pub struct Driver<'a, 'w, S: IrSink> {
    parser: Parser<'a>,
    codegen: Codegen<S>,
    out: &'w mut dyn Write,
    err: &'w mut dyn Write,
    pub echo: bool,
    pub eval: bool,
}

fn io_error(e: std::io::Error) -> Error {
    Error::from(ErrorKind::Io(e.to_string()))
}

impl<'a, 'w, S: IrSink> Driver<'a, 'w, S> {
    pub fn new(
        parser: Parser<'a>,
        codegen: Codegen<S>,
        out: &'w mut dyn Write,
        err: &'w mut dyn Write,
    ) -> Self {
        Driver {
            parser,
            codegen,
            out,
            err,
            echo: true,
            eval: true,
        }
    }

    pub fn into_codegen(self) -> Codegen<S> {
        self.codegen
    }

    /// Runs until end of input. Only I/O failures on the output handles abort
    /// the run.
    pub fn main_loop(&mut self) -> Result<Summary> {
        let mut summary = Summary::default();
        loop {
            let handled = match self.parser.current().clone() {
                Token::Eof => break,
                Token::Kwd(';') | Token::Comma => {
                    self.step(|d| d.parser.advance())?;
                    continue;
                }
                Token::Def => self.handle_definition()?,
                _ => self.handle_toplevel_expression()?,
            };
            if handled {
                summary.generated += 1;
            } else {
                summary.failed += 1;
            }
        }
        Ok(summary)
    }

    /// Runs a parser action; a lexical failure is reported and ends the input.
    fn step<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if let Err(e) = f(self) {
            self.report(&e)?;
        }
        Ok(())
    }

    fn handle_definition(&mut self) -> Result<bool> {
        let func = match self.parser.parse_function_definition() {
            Ok(func) => func,
            Err(e) => return self.recover(&e),
        };
        match self.codegen.codegen_func(&func) {
            Ok(f) => {
                if self.echo {
                    writeln!(self.out, "Read function definition:").map_err(io_error)?;
                    let ir = self.codegen.sink().print_function(f);
                    write!(self.out, "{}", ir).map_err(io_error)?;
                }
                Ok(true)
            }
            Err(e) => {
                self.report(&e)?;
                Ok(false)
            }
        }
    }

    fn handle_toplevel_expression(&mut self) -> Result<bool> {
        let expr = match self.parser.parse_expression() {
            Ok(expr) => expr,
            Err(e) => return self.recover(&e),
        };
        let f = match self.codegen.codegen_toplevel(&expr) {
            Ok(f) => f,
            Err(e) => {
                self.report(&e)?;
                return Ok(false);
            }
        };
        if self.echo {
            writeln!(self.out, "Read top-level expression:").map_err(io_error)?;
            let ir = self.codegen.sink().print_function(f);
            write!(self.out, "{}", ir).map_err(io_error)?;
        }
        if !self.eval {
            return Ok(true);
        }
        match self.codegen.sink().run_function(f) {
            Some(Ok(v)) => {
                writeln!(self.out, "Evaluated to {}", v as i32).map_err(io_error)?;
                Ok(true)
            }
            Some(Err(e)) => {
                self.report(&e)?;
                Ok(false)
            }
            None => Ok(true),
        }
    }

    /// Reports a syntax error and abandons the rest of the unit: tokens are
    /// skipped up to the next `def`, `;` or end of input.
    fn recover(&mut self, e: &Error) -> Result<bool> {
        self.report(e)?;
        loop {
            match self.parser.current() {
                Token::Eof | Token::Def | Token::Kwd(';') => break,
                _ => {}
            }
            if let Err(e) = self.parser.advance() {
                self.report(&e)?;
                break;
            }
        }
        Ok(false)
    }

    fn report(&mut self, e: &Error) -> Result<()> {
        writeln!(self.err, "error[{}]: {}", e.stage(), e).map_err(io_error)
    }
}
