// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `prepare` — turns a molecule CSV into prepared datasets
//   2. `vocab`   — builds an atom vocabulary for pretraining

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, VocabArgs};

use crate::application::prepare_use_case::{PrepareConfig, PrepareUseCase};
use crate::application::vocab_use_case::VocabUseCase;

#[derive(Parser, Debug)]
#[command(
    name = "mol-data",
    version,
    about = "Prepare molecule datasets for property prediction and masked-atom pretraining."
)]
pub struct Cli {
    /// The subcommand to run (prepare or vocab)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => run_prepare(args),
            Commands::Vocab(args)   => run_vocab(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    tracing::info!("Preparing molecules from: {}", args.data_path.display());

    let config  = PrepareConfig::try_from(args)?;
    let out_dir = config.output_dir.clone();
    let summary = PrepareUseCase::new(config).execute()?;

    println!(
        "Prepared {} molecules ({} train / {} validation, {} skipped) into '{}'",
        summary.num_molecules,
        summary.num_train,
        summary.num_val,
        summary.num_skipped,
        out_dir.display()
    );
    Ok(())
}

fn run_vocab(args: VocabArgs) -> Result<()> {
    let use_case = VocabUseCase::new(
        args.data_path,
        args.output_dir,
        args.use_compound_names,
        args.max_rows,
    );
    let (path, size) = use_case.execute()?;
    println!("Saved vocabulary of {} entries to '{}'", size, path.display());
    Ok(())
}
