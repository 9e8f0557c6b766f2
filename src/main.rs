//! Thin CLI driver around the compilation pipeline.
//!
//! The driver reads a source file (or a literal via `-raw`), then either
//! runs the full pipeline and prints assembly, or stops after a selected
//! stage and prints that stage's dump. Compile diagnostics go to stdout
//! with exit code 1; usage errors go to stderr.

use std::env;
use std::fs;
use std::process;

use a64cc::{CompileError, codegen, parser, tokenizer, ty};

/// Stage after which to stop and dump, instead of emitting assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopAfter {
  Tokenize,
  Parse,
  Annotate,
}

struct Options {
  source: String,
  stop_after: Option<StopAfter>,
}

fn parse_args() -> Options {
  let args: Vec<String> = env::args().collect();
  let program = args.first().map(String::as_str).unwrap_or("a64cc");

  let mut stop_after = None;
  let mut source = None;
  let mut i = 1;
  while i < args.len() {
    match args[i].as_str() {
      "-print-token" => stop_after = Some(StopAfter::Tokenize),
      "-print-syntax-tree" | "-print-synt" => stop_after = Some(StopAfter::Parse),
      "-print-syntax-tree-with-type" | "-print-syntty" => stop_after = Some(StopAfter::Annotate),
      "-raw" => {
        let Some(text) = args.get(i + 1) else {
          eprintln!("{program}: -raw option requires a source string");
          process::exit(1);
        };
        source = Some(text.clone());
        i += 1;
      }
      path => {
        match fs::read_to_string(path) {
          Ok(text) => source = Some(text),
          Err(err) => {
            eprintln!("{program}: {path}: {err}");
            process::exit(1);
          }
        }
      }
    }
    i += 1;
  }

  let Some(source) = source else {
    eprintln!("usage: {program} [-print-token|-print-synt|-print-syntty] <file | -raw <source>>");
    process::exit(1);
  };

  Options { source, stop_after }
}

fn run(options: &Options) -> Result<(), CompileError> {
  let source = &options.source;

  let tokens = tokenizer::tokenize(source)?;
  if options.stop_after == Some(StopAfter::Tokenize) {
    println!("{}", tokenizer::dump_tokens(&tokens, source));
    return Ok(());
  }

  let mut program = parser::parse(tokens, source)?;
  if options.stop_after == Some(StopAfter::Parse) {
    for func in &program {
      println!("{}", func.dump());
    }
    return Ok(());
  }

  ty::annotate(&mut program, source)?;
  if options.stop_after == Some(StopAfter::Annotate) {
    for func in &program {
      println!("{}", func.dump());
    }
    return Ok(());
  }

  let asm = codegen::generate(&program, source)?;
  print!("{asm}");
  Ok(())
}

fn main() {
  let options = parse_args();
  if let Err(err) = run(&options) {
    println!("{err}");
    process::exit(1);
  }
}
