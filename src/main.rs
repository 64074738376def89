use clap::Parser;
use switchyard::cli::{run_cli, Cli};
use switchyard::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.app_config()?;
    init_logging(&config.log)?;
    run_cli(&cli, config)
}
