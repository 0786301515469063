mod check;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "A refinement type checker for array shapes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Typecheck a source file
    Check(check::Args),
}

pub fn exec() -> Result<(), Vec<miette::Report>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check(args) => check::exec(args),
    }
}
