use std::io::Read;

use clap::Parser;
use log::LevelFilter;
use miette::{Context, IntoDiagnostic, Result};

/// Compile and run a Tiny-C program, then print its nonzero variables.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Program to run; read from standard input when omitted.
    file: Option<std::path::PathBuf>,

    /// Print the token stream and exit.
    #[arg(long)]
    tokens: bool,

    /// Print the parsed program before running it.
    #[arg(long)]
    ast: bool,

    /// Print the generated instructions before running them.
    #[arg(long)]
    disassemble: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let content = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading '{}' failed", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .into_diagnostic()
                .wrap_err("reading standard input failed")?;
            buffer
        }
    };

    if args.tokens {
        for token in tinyc::lex::tokenize(&content)? {
            println!("{token}");
        }
        return Ok(());
    }

    run(&content, &args)
}

fn run(content: &str, args: &Args) -> Result<()> {
    let program = tinyc::parse::parse(content)?;
    if args.ast {
        println!("{program}");
    }

    let chunk = tinyc::codegen::generate(&program);
    if args.disassemble {
        print!("{}", chunk.disassemble("program"));
    }

    log::info!("running {} instructions", chunk.len());
    let globals = tinyc::vm::execute(&chunk);
    print!("{globals}");
    Ok(())
}
