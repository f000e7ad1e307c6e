//! # Prosa - a small imperative teaching language
//!
//! One grammar, two keyword surfaces, three consumers:
//! 1. **Two surfaces** - the same language reads as symbolic script
//!    (`var`/`print`/`:=`) or as spoken words (`GUARDAR`/`EXIBIR`/`RECEBE`);
//!    a keyword table maps surface spellings onto shared grammar roles.
//! 2. **Interpreter** - tree-walking evaluation, the reference semantics.
//! 3. **Two codegen dialects** - a stack-frame machine (NASM-flavoured
//!    assembly) and an SSA-style virtual-register machine (LLVM-flavoured
//!    IR), both lowering the same AST.
//!
//! ## Example
//! ```prosa
//! {
//!     var n : i32 = read();
//!     while (n > 0) {
//!         print(n);
//!         n := n - 1;
//!     }
//!     speak("done" ++ true);
//! }
//! ```

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod span;
pub mod speech;
pub mod symbols;
pub mod types;

pub use error::{ProsaError, ProsaResult};
pub use lexer::Lexer;
pub use parser::Parser;
pub use span::Span;

/// Version of the Prosa language
pub const VERSION: &str = "0.1.0";
pub const LANGUAGE_NAME: &str = "Prosa";

/// Keyword surface of a source file. Each surface owns a keyword table
/// mapping its spellings to grammar roles, a required file extension, and
/// the policy for typing `read` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Symbolic spellings: `var`, `print`, `:=`, `{ }`, `.prosa` files
    Script,
    /// Word spellings: `GUARDAR`, `EXIBIR`, `RECEBE`, `INICIO`/`FIM`,
    /// `.fala` files
    Spoken,
}

impl Surface {
    pub fn extension(&self) -> &'static str {
        match self {
            Surface::Script => "prosa",
            Surface::Spoken => "fala",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Surface> {
        match extension {
            "prosa" => Some(Surface::Script),
            "fala" => Some(Surface::Spoken),
            _ => None,
        }
    }

    /// Script reads must parse as integers; spoken reads classify the line
    /// by content.
    pub fn read_policy(&self) -> runtime::ReadPolicy {
        match self {
            Surface::Script => runtime::ReadPolicy::IntegerOnly,
            Surface::Spoken => runtime::ReadPolicy::Classify,
        }
    }
}

/// What to do with a compiled unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileTarget {
    /// Run the AST now through the interpreter
    Interpret,
    /// Emit stack-frame dialect assembly
    Asm,
    /// Emit SSA dialect IR
    Ir,
}

/// Front half of the pipeline: preprocess, lex and parse one unit.
pub fn build_program(source: &str, surface: Surface) -> ProsaResult<ast::Program> {
    let clean = lexer::preprocess(source);
    let lexer = Lexer::new(&clean, surface)?;
    Parser::new(lexer).parse()
}

/// Compile Prosa source for the given surface and target. Interpretation
/// runs immediately against real stdin/stdout and the default speech
/// command; the generation targets return the emitted module text.
pub fn compile(source: &str, surface: Surface, target: CompileTarget) -> ProsaResult<Vec<u8>> {
    let program = build_program(source, surface)?;

    match target {
        CompileTarget::Interpret => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let mut interpreter = runtime::Interpreter::new(
                surface.read_policy(),
                Box::new(stdin.lock()),
                Box::new(stdout.lock()),
                Box::new(speech::CommandSpeaker::default()),
            );
            interpreter.run(&program)?;
            Ok(Vec::new())
        }
        CompileTarget::Asm => {
            codegen::generate(&program, codegen::Dialect::StackFrame).map(String::into_bytes)
        }
        CompileTarget::Ir => {
            codegen::generate(&program, codegen::Dialect::Ssa).map(String::into_bytes)
        }
    }
}
