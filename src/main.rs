use std::env;
use std::fs;
use std::io::{stderr, stdout, Write};
use std::process;

use toyc::analysis;
use toyc::codegen::Codegen;
use toyc::ir::Module;
use toyc::lexer::{self, Lexer};
use toyc::parser::Parser;
use toyc::sink::IrSink;
use toyc::toplevel::Driver;

const USAGE: &str = "usage: toyc [--quiet] [--no-eval] [--stats] [--tokens] [--llvm] <file>";

#[derive(Debug, Default)]
struct Options {
    path: String,
    quiet: bool,
    no_eval: bool,
    stats: bool,
    tokens: bool,
    llvm: bool,
}

impl Options {
    fn parse<I: Iterator<Item = String>>(args: I) -> Result<Options, String> {
        let mut opts = Options::default();
        let mut path = None;
        for arg in args {
            match arg.as_str() {
                "-q" | "--quiet" => opts.quiet = true,
                "--no-eval" => opts.no_eval = true,
                "--stats" => opts.stats = true,
                "--tokens" => opts.tokens = true,
                "--llvm" => opts.llvm = true,
                flag if flag.starts_with('-') => return Err(format!("unknown option `{}`", flag)),
                _ if path.is_some() => return Err("expected a single input file".to_owned()),
                _ => path = Some(arg),
            }
        }
        opts.path = path.ok_or_else(|| "missing input file".to_owned())?;
        if opts.llvm && !cfg!(feature = "llvm") {
            return Err("this build does not include the LLVM backend".to_owned());
        }
        if opts.llvm && opts.stats {
            return Err("--stats is only available for the built-in IR".to_owned());
        }
        Ok(opts)
    }
}

fn fatal(message: &str) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn compile<S: IrSink>(opts: &Options, source: &str, sink: S) -> S {
    let parser = match Parser::new(Lexer::new(source)) {
        Ok(parser) => parser,
        Err(e) => fatal(&e.to_string()),
    };
    let stdout = stdout();
    let stderr = stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let mut driver = Driver::new(parser, Codegen::new(sink), &mut out, &mut err);
    driver.echo = !opts.quiet;
    driver.eval = !opts.no_eval;
    if let Err(e) = driver.main_loop() {
        fatal(&e.to_string());
    }
    driver.into_codegen().into_sink()
}

fn dump<S: IrSink>(sink: &S) {
    let mut out = stdout();
    let text = format!("================================\n{}", sink.print_module());
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        fatal(&e.to_string());
    }
}

#[cfg(feature = "llvm")]
fn run_llvm(opts: &Options, source: &str) {
    let sink = compile(opts, source, toyc::llvm::LlvmSink::new("my compiler"));
    dump(&sink);
}

#[cfg(not(feature = "llvm"))]
fn run_llvm(_opts: &Options, _source: &str) {
    fatal("this build does not include the LLVM backend");
}

fn main() {
    let opts = match Options::parse(env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    let source = match fs::read_to_string(&opts.path) {
        Ok(source) => source,
        Err(e) => fatal(&format!("unable to open {}: {}", opts.path, e)),
    };

    if opts.tokens {
        match lexer::tokenize(&source) {
            Ok(tokens) => {
                for token in tokens {
                    println!("{:?}", token);
                }
            }
            Err(e) => fatal(&e.to_string()),
        }
        return;
    }

    if opts.llvm {
        run_llvm(&opts, &source);
        return;
    }

    let module = compile(&opts, &source, Module::new("my compiler"));
    dump(&module);
    if opts.stats {
        for stats in analysis::function_stats(&module) {
            println!("{}", stats);
        }
    }
}
