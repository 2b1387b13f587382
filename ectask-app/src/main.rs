mod cli;
mod console;
mod input;
mod simulate;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(cli.run());
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_background();
    result
}
