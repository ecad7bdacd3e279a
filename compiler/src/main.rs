// External Modules
extern crate pest;
extern crate exitcode;
#[macro_use]
extern crate pest_derive;

// Internal Modules
mod compiler;
use compiler::{CompileError, Compiler};

use compiscript_common::RenderMode;

// Standard Imports
use clap::Parser;

// Basic Compiler Configuration
type PARSER = compiler::PestCompiscriptParser;
type ANALYSER = compiler::CompiscriptSemanticAnalyser;
type TAC = compiler::CompiscriptTacGenerator;
type GENERATOR = compiler::CompiscriptMipsGenerator;

/// Command Line interface struct
/// Describes possible arguments using the clap library
#[derive(Parser)]
struct CompilerCLIOptions {
    /// Path of file to compile. Compiscript source files end in .cps
    #[clap(parse(from_os_str))]
    path: std::path::PathBuf,

    /// Path to the output assembly file, default is program.s in the
    /// working directory
    #[clap(short, long, parse(from_os_str))]
    output: Option<std::path::PathBuf>,

    // Flags

    /// Additionally write the intermediate TAC listing to <path>.tac
    #[clap(long, action)]
    tac: bool,

    /// Rendering mode of the TAC listing: raw or pretty
    #[clap(long, default_value = "raw", parse(try_from_str))]
    tac_format: RenderMode,

    /// Write the assembly listing to stdout instead of output
    #[clap(long, action)]
    stdout: bool,
}

impl CompilerCLIOptions {
    /// Derives default values for empty arguments that cannot be set to
    /// constants.
    /// @return: Returns CompilerCLIOptions with modified empty arguments
    fn derive_defaults(mut self) -> Self {
        // The assembly lands in the working directory unless told otherwise
        if self.output.is_none() {
            self.output = Some(std::path::PathBuf::from("program.s"));
        }

        return self;
    }
}

fn exit_with_io_error(why: std::io::Error) -> ! {
    println!("Error de E/S: {}", why);
    std::process::exit(exitcode::IOERR);
}

fn main() {
    // Parse Command line arguments
    let cli_args = CompilerCLIOptions::parse().derive_defaults();

    let compiler: Compiler<PARSER, ANALYSER, TAC, GENERATOR> = Compiler::default();
    let source_path = cli_args.path.as_path();

    let output = match compiler.compile(source_path) {
        Ok(output) => output,
        Err(CompileError::Semantic { symbol_table, errors }) => {
            println!("Se encontraron errores semánticos:");
            for error in &errors {
                println!("  {}", error);
            }
            println!();
            println!("--- TABLA DE SÍMBOLOS ---");
            print!("{}", symbol_table);
            std::process::exit(exitcode::DATAERR);
        }
        Err(CompileError::Syntax(error)) => {
            println!("{}", error);
            std::process::exit(exitcode::DATAERR);
        }
        Err(CompileError::Io(why)) => exit_with_io_error(why),
    };

    println!("Análisis semántico completado sin errores.");
    println!();
    println!("--- TABLA DE SÍMBOLOS ---");
    print!("{}", output.symbol_table);

    if cli_args.tac {
        let listing_path = cli_args.path.with_extension("tac");
        let listing = output.tac.clone().rendered_as(cli_args.tac_format);
        if let Err(why) = std::fs::write(&listing_path, listing.to_string()) {
            exit_with_io_error(why);
        }
        println!("Listado intermedio escrito en {}", listing_path.display());
    }

    if cli_args.stdout {
        print!("{}", output.assembly);
    } else {
        let dest_path = cli_args.output.unwrap(); // Can unwrap as output will always be derived
        if let Err(why) = std::fs::write(&dest_path, output.assembly.to_string()) {
            exit_with_io_error(why);
        }
        println!("Archivo {} generado.", dest_path.display());
    }

    std::process::exit(exitcode::OK);
}
