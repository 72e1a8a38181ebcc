// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates every piece of work to Layer 2.
//
// Two commands are supported:
//   1. `features` builds a per-document scalar feature CSV
//   2. `assemble` builds the training tensor and its artifacts

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AssembleArgs, Commands, FeaturesArgs};

#[derive(Parser, Debug)]
#[command(
    name = "excerpt-features",
    version = "0.1.0",
    about = "Turn annotated text excerpts into feature tables and training tensors."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. The CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Features(args) => run_features(args),
            Commands::Assemble(args) => run_assemble(args),
        }
    }
}

fn run_features(args: FeaturesArgs) -> Result<()> {
    use excerpt_features::application::feature_use_case::FeatureTableUseCase;

    tracing::info!("Building feature table from: {}", args.input.corpus);

    let output = args.output.clone();
    let rows = FeatureTableUseCase::new(args.into()).execute()?;

    println!("Wrote {rows} feature rows to {output}");
    Ok(())
}

fn run_assemble(args: AssembleArgs) -> Result<()> {
    use excerpt_features::application::assemble_use_case::AssembleUseCase;

    tracing::info!("Assembling training tensor from: {}", args.input.corpus);

    let artifacts = args.artifacts_dir.clone();
    let data = AssembleUseCase::new(args.into()).execute()?;

    println!(
        "Assembled {} examples, tensor shape {:?}, {} feature columns. Artifacts in {}",
        data.tensor.n_examples(),
        data.tensor.shape,
        data.schema.columns.len(),
        artifacts
    );
    Ok(())
}
