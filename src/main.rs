use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use piazza_fetch::app::{self, Cli};
use piazza_fetch::FetcherConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(cli.log_level())
        .filter_module("selectors", LevelFilter::Warn)
        .filter_module("html5ever", LevelFilter::Error)
        .filter_module("hyper", LevelFilter::Warn)
        .init();

    let config = FetcherConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let config = cli.apply(config);

    app::run(cli, config).await
}
