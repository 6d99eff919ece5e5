//! Demo program: declares a small file-splitter CLI and prints whatever
//! it parsed. Try `--help`, `--version`, or e.g.
//! `-i data.csv --output out.csv part1 part2`.

use cmdo::Program;
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    init_tracing();

    Program::new()
        .name("file-splitter")
        .description("CLI to split files into chunks.")
        .version("1.0.0")
        .option("i", "input", "input", "Input file", "./input.txt")
        .option("o", "output", "output", "Output file", "./output.txt")
        .action(|arguments, options| {
            println!("Arguments:");
            for (index, argument) in arguments.iter().enumerate() {
                println!("\tindex: {index}, argument: {argument}");
            }

            println!("Options:");
            for (key, value) in &options {
                println!("\tkey: {key}, option: {value}");
            }
        })
        .parse();
}
