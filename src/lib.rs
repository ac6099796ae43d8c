//! Compiler and stack virtual machine for Tiny-C.
//!
//! Tiny-C has one statement/expression grammar and 26 predeclared integer
//! variables `a`..`z`. A program runs through four phases:
//! - `lex` turns the source into tokens,
//! - `parse` builds an `ast` by recursive descent,
//! - `codegen` lowers the tree into a `vm::Chunk`,
//! - `vm` executes the chunk and exposes the final `vm::Variables`.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lex;
pub mod parse;
pub mod vm;

use log::{debug, trace};

pub use ast::{Expr, Stmt, Var};
pub use error::{CompileError, CompileResult, ErrorKind, Expected};
pub use lex::Lexer;
pub use parse::Parser;
pub use vm::{Chunk, Instruction, Variables, VM};

/// Parses `source` and generates code for it.
pub fn compile(source: &str) -> CompileResult<Chunk> {
    trace!("Parsing {source:?}");
    let program = parse::parse(source)?;
    trace!("Generating code for {program:#?}");
    let chunk = codegen::generate(&program);
    debug!("{}", chunk.disassemble("program"));
    Ok(chunk)
}

/// Compiles and runs `source` on a fresh machine, returning the final variables.
pub fn run(source: &str) -> CompileResult<Variables> {
    let chunk = compile(source)?;
    trace!("Executing {} instructions", chunk.len());
    let globals = vm::execute(&chunk);
    debug!("Final variables: {globals:?}");
    Ok(globals)
}
