use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mini_awk::{Interpreter, read_records};

#[derive(Parser)]
#[command(name = "mini-awk", version, about = "Run a pattern-action program over the lines of a file")]
struct Cli {
    /// File containing the program source
    program_file: PathBuf,

    /// Input file; each line is one record
    input_file: Option<PathBuf>,

    /// Initial field separator (FS)
    #[arg(short = 'F', long = "field-separator", value_name = "FS")]
    field_separator: Option<String>,

    /// Set a global variable before BEGIN runs
    #[arg(short = 'v', long = "assign", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    assignments: Vec<(String, String)>,

    /// Print the token stream and exit
    #[arg(long)]
    dump_tokens: bool,

    /// Print the parsed program and exit
    #[arg(long)]
    dump_ast: bool,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("invalid variable assignment: {}", s)),
    }
}

fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never mix with program output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("mini-awk: {}", e);
            process::exit(2);
        }
    }
}

fn run(cli: Cli) -> mini_awk::Result<i32> {
    let source = fs::read_to_string(&cli.program_file)?;
    let tokens = mini_awk::tokenize(&source)?;

    if cli.dump_tokens {
        for token in &tokens {
            println!("{}", token);
        }
        return Ok(0);
    }

    let program = mini_awk::parse(tokens)?;

    if cli.dump_ast {
        println!("{:#?}", program);
        return Ok(0);
    }

    let mut interpreter = Interpreter::new(&program);
    if let Some(fs) = &cli.field_separator {
        interpreter.set_fs(fs);
    }
    for (name, value) in &cli.assignments {
        interpreter.set_variable(name, value);
    }

    let records = match &cli.input_file {
        Some(path) => {
            interpreter.set_filename(&path.to_string_lossy());
            read_records(BufReader::new(File::open(path)?))?
        }
        None => Vec::new(),
    };
    tracing::debug!(records = records.len(), "loaded input");

    let stdout = io::stdout();
    let mut output = stdout.lock();
    interpreter.run(records, &mut output)
}
