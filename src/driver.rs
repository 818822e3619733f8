use std::{
    env::{self, Args},
    fs,
    path::PathBuf,
    process::{self, Command},
};

use anyhow::{bail, Context, Result};

use crate::{codegen, emit::EmitAsm, lexer, parser};

const ASSEMBLY_FILE: &str = "out.asm";
const OBJECT_FILE: &str = "out.o";
const OUTPUT_FILE: &str = "out";

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    #[default]
    Compile,
    Lex,
    Parse,
    Codegen,
    Assembly,
}

pub struct Options {
    stage: Stage,
    input_file: PathBuf,
}

fn print_usage(program: &str) -> ! {
    eprintln!("Incorrect usage. Correct usage is...");
    eprintln!("{} <file.aym> [--lex | --parse | --codegen | -S]", program);
    process::exit(1)
}

fn is_flag(string: &str) -> Option<Stage> {
    match string {
        "--lex" => Some(Stage::Lex),
        "--parse" => Some(Stage::Parse),
        "--codegen" => Some(Stage::Codegen),
        "-S" => Some(Stage::Assembly),
        _ => None,
    }
}

impl Options {
    /// This function exits the process if the args don't match what was
    /// expected.
    pub fn parse_args(mut args: Args) -> Self {
        let program = args.next().unwrap_or_else(|| "amayori".to_owned());

        let mut stage = Stage::default();
        let mut input_file: Option<PathBuf> = None;

        for arg in args {
            if let Some(found) = is_flag(&arg) {
                stage = found;
                continue;
            }

            if arg.starts_with('-') || input_file.is_some() {
                print_usage(&program);
            }
            input_file = Some(PathBuf::from(arg));
        }

        match input_file {
            Some(input_file) => Self { stage, input_file },
            None => print_usage(&program),
        }
    }
}

pub fn run() -> Result<()> {
    let options = Options::parse_args(env::args());

    let source = fs::read_to_string(&options.input_file)
        .with_context(|| format!("could not read {}", options.input_file.display()))?;

    let tokens = lexer::tokenize(source)?;

    if let Stage::Lex = options.stage {
        println!("{:#?}", tokens);
        return Ok(());
    }

    let mut parser = parser::Parser::new(tokens);
    let program = match parser.parse_program() {
        Ok(program) => program,
        Err(err) => {
            eprintln!("Invalid program");
            return Err(err.into());
        }
    };

    if let Stage::Parse = options.stage {
        println!("{:#?}", program);
        return Ok(());
    }

    let assembly = codegen::generate(&program)?;

    if let Stage::Codegen = options.stage {
        println!("{:#?}", assembly);
        return Ok(());
    }

    fs::write(ASSEMBLY_FILE, assembly.emit(0))
        .with_context(|| format!("could not write {}", ASSEMBLY_FILE))?;

    if let Stage::Assembly = options.stage {
        return Ok(());
    }

    run_assembler()?;
    run_linker()?;

    Ok(())
}

fn run_assembler() -> Result<()> {
    let status = Command::new("nasm")
        .arg("-felf64")
        .arg(ASSEMBLY_FILE)
        .status()
        .context("could not run nasm")?;

    if !status.success() {
        bail!("nasm exited with {}", status);
    }
    Ok(())
}

fn run_linker() -> Result<()> {
    let status = Command::new("ld")
        .arg("-o")
        .arg(OUTPUT_FILE)
        .arg(OBJECT_FILE)
        .status()
        .context("could not run ld")?;

    if !status.success() {
        bail!("ld exited with {}", status);
    }
    Ok(())
}
