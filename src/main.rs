use std::{path::PathBuf, process};

use clap::Parser;
use miette::Report;
use tracing_subscriber::EnvFilter;

mod shell;
pub use shell::parser;
pub use parser::P;
use shell::{config::Config, Shell};


/// A small command shell with pipes, redirection and variables
#[derive(Debug, Parser)]
#[command(name = "techsh", version)]
struct Cli {
    /// Script to run instead of reading from the terminal
    script: Option<PathBuf>,

    /// Config file to use instead of the per-user one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TECHSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{:?}", Report::new(err));
            Config::default()
        }
    };

    let mut shell = Shell::new(config);
    let code = match cli.script {
        Some(script) => match shell.run_script(&script) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("{:?}", Report::new(err));
                1
            }
        },
        None => shell.run(),
    };
    process::exit(code);
}
