use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;

/// Compile source programs for the register machine.
#[derive(ClapParser, Debug)]
#[command(name = "mirac", version, about)]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Write the instruction text here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Execute the compiled program instead of printing it. Input
    /// numbers are read from stdin, whitespace-separated.
    #[arg(long)]
    run: bool,

    /// Print the memory-cell assignment to stderr.
    #[arg(long)]
    dump_allocation: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = compile(cli) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn compile(cli: Cli) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&cli.input)?;
    let program = parser::parse(&source)?;
    let table = codegen::declare_program(&program)?;

    if cli.dump_allocation {
        let layout = codegen::usage::optimize(table.clone(), &program.body);
        for symbol in layout.symbols_by_cell() {
            eprintln!("{:>6}  {}", symbol.cell, symbol.name);
        }
    }

    if cli.run {
        let instrs = codegen::compile_to_instrs(&program, table)?;
        log::debug!("executing {} instructions", instrs.len());
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        let input = raw
            .split_whitespace()
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()?;
        for value in vm::run_program(&instrs, input)? {
            println!("{value}");
        }
        return Ok(());
    }

    let text = codegen::compile(&program, table)?;
    match &cli.output {
        Some(path) => fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}
