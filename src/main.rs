//! Prosa Compiler CLI

use clap::Parser as ClapParser;
use prosa::diagnostics::Diagnostics;
use prosa::runtime::Interpreter;
use prosa::speech::CommandSpeaker;
use prosa::{codegen, lexer, CompileTarget, Surface, VERSION};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser, Debug)]
#[command(name = "prosa")]
#[command(version = VERSION)]
#[command(about = "Compiler and interpreter for the Prosa teaching language", long_about = None)]
struct Args {
    /// Source file: `.prosa` (script surface) or `.fala` (spoken surface)
    input: PathBuf,

    /// Compilation target: interpret, asm or ir
    #[arg(short, long, default_value = "asm")]
    target: String,

    /// Output file for generated code
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    if !run(&args) {
        process::exit(1);
    }
}

fn run(args: &Args) -> bool {
    // Both usage checks happen before any source is read.
    let surface = match args
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Surface::from_extension)
    {
        Some(surface) => surface,
        None => {
            eprintln!(
                "error: '{}' must end in '.prosa' (script surface) or '.fala' (spoken surface)",
                args.input.display()
            );
            return false;
        }
    };

    let target = match args.target.as_str() {
        "interpret" | "run" => CompileTarget::Interpret,
        "asm" => CompileTarget::Asm,
        "ir" => CompileTarget::Ir,
        other => {
            eprintln!(
                "error: unknown target '{}', expected interpret, asm or ir",
                other
            );
            return false;
        }
    };

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", args.input.display(), e);
            return false;
        }
    };

    if args.verbose {
        println!(
            "compiling {} ({:?} surface, {} bytes)",
            args.input.display(),
            surface,
            source.len()
        );
    }

    let clean = lexer::preprocess(&source);
    let filename = args.input.display().to_string();
    let diagnostics = Diagnostics::new(&clean, &filename);

    let program = {
        let lexer = match prosa::Lexer::new(&clean, surface) {
            Ok(lexer) => lexer,
            Err(error) => {
                eprintln!("{}", diagnostics.format_error(&error));
                return false;
            }
        };
        match prosa::Parser::new(lexer).parse() {
            Ok(program) => program,
            Err(error) => {
                eprintln!("{}", diagnostics.format_error(&error));
                return false;
            }
        }
    };

    match target {
        CompileTarget::Interpret => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut interpreter = Interpreter::new(
                surface.read_policy(),
                Box::new(stdin.lock()),
                Box::new(stdout.lock()),
                Box::new(CommandSpeaker::default()),
            );
            match interpreter.run(&program) {
                Ok(()) => {
                    if args.verbose {
                        println!("execution complete");
                    }
                    true
                }
                Err(error) => {
                    eprintln!("{}", diagnostics.format_error(&error));
                    false
                }
            }
        }
        CompileTarget::Asm | CompileTarget::Ir => {
            let (dialect, extension) = match target {
                CompileTarget::Asm => (codegen::Dialect::StackFrame, "asm"),
                _ => (codegen::Dialect::Ssa, "ll"),
            };
            let module = match codegen::generate(&program, dialect) {
                Ok(module) => module,
                Err(error) => {
                    eprintln!("{}", diagnostics.format_error(&error));
                    return false;
                }
            };
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension(extension));
            if let Err(e) = fs::write(&path, module) {
                eprintln!("error: failed to write {}: {}", path.display(), e);
                return false;
            }
            if args.verbose {
                println!("wrote {}", path.display());
            }
            true
        }
    }
}
