use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lume::repl::repl;

#[derive(Parser)]
#[clap(name = "lume", version, about = "A tiny dynamically typed expression language")]
struct Args {
    /// Script to run; starts a repl when omitted
    file: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.file {
        Some(path) => {
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    eprintln!("{}: {}", path.display(), err);
                    process::exit(1);
                }
            };
            let name = path.display().to_string();
            if let Err(err) = lume::interpret(&name, &source) {
                eprintln!("{}", err);
                process::exit(1);
            }
        }
        None => repl(),
    }
}
