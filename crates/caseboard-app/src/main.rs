//! Main application entry point.

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = caseboard_app::Cli::parse();
    let config = cli.resolve_config()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();
    log::info!("Starting Caseboard");

    caseboard_app::run(cli, &config)
}
