//! Front end for a tiny expression language: `def` functions over 32-bit
//! integers with `+ - * / <`, calls and `if`/`then`/`else`.
//!
//! Source text flows through [`lexer`] and [`parser`] into [`ast`] nodes,
//! which [`codegen`] lowers into any [`sink::IrSink`]. The crate ships its
//! own sink in [`ir`]; with the `llvm` feature an LLVM-backed one is
//! available as well.

pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod lexer;
#[cfg(feature = "llvm")]
pub mod llvm;
pub mod parser;
pub mod sink;
pub mod token;
pub mod toplevel;

pub use error::{Error, ErrorKind, Result};
