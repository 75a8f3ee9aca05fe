mod cli;
mod compare;
mod config;
mod dump;
mod matrix;
mod norm;
mod output;
mod process;
mod source;
mod sweep;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli().with_context(|| "Error processing command line arguments")?;
    process::process_files(&cfg)
}
