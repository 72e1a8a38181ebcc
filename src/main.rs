mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("excerpt_features=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
