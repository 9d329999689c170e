mod commands;
mod error;
mod util;

use commands::{HistqCli, HistqSubcommand};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = HistqCli::parse_args();
    util::init_tracing();

    match args.command {
        HistqSubcommand::Estimate { args } => commands::estimate(&args)?,

        HistqSubcommand::Report { args } => {
            commands::report(&args)?;
        }

        HistqSubcommand::Simulate { args } => {
            commands::simulate(&args).await?;
        }
    }
    Ok(())
}
