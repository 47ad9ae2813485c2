// src/bin/cli.rs
use ranksnap::cli::{self, Command};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    match cli::parse_args(std::env::args().skip(1))? {
        Command::Help => print!("{}", cli::HELP),
        Command::Run(opts) => {
            cli::run(&opts)?;
        }
    }
    Ok(())
}
