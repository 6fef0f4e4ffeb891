use anyhow::Result;
use clap::{CommandFactory, Parser};

use featuregen::app::App;
use featuregen::cli::Cli;
use featuregen::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match cli.command {
        Some(cmd) => {
            let mut app = App::new().await?;
            app.run_command(cmd).await?;
        }
        None => {
            // No subcommand: show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
