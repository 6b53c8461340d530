/*!
Command line tools for mvclass.
*/

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::Command;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Mvclass {
    #[clap(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init();

    let args = Mvclass::parse();
    commands::run(args.command)
}
