//! rl2 CLI
//!
//! Task generation, meta-training and evaluation of RL2 policies.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod args;
#[cfg(feature = "torch")]
mod driver;
mod generate;

use args::{GenerateArgs, RunArgs};

#[derive(Parser)]
#[command(name = "rl2")]
#[command(version, about = "RL2 - meta-reinforcement learning with recurrent policies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample tasks from a family and write them to a task file
    Generate(GenerateArgs),

    /// Meta-train a policy and save the checkpoint (requires --features torch)
    Train(RunArgs),

    /// Reload the checkpoint and run it on a fresh task (requires --features torch)
    Eval(RunArgs),

    /// Train, then evaluate (requires --features torch)
    Run(RunArgs),
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            let path = generate::generate(&args)?;
            println!("Tasks written to {}", path.display());
        }
        Commands::Train(args) => train(&args)?,
        Commands::Eval(args) => eval(&args)?,
        Commands::Run(args) => {
            train(&args)?;
            eval(&args)?;
        }
    }

    Ok(())
}

#[cfg(feature = "torch")]
fn train(args: &RunArgs) -> Result<()> {
    let report = driver::meta_train(args)?;
    println!("Checkpoint saved to {}", report.checkpoint.display());
    println!("rewards: {}", serde_json::to_string(&report.rewards)?);
    Ok(())
}

#[cfg(feature = "torch")]
fn eval(args: &RunArgs) -> Result<()> {
    let report = driver::evaluate(args)?;
    println!("{}", serde_json::to_string(&report.rewards)?);
    println!("{}", serde_json::to_string(&report.actions)?);
    Ok(())
}

#[cfg(not(feature = "torch"))]
fn train(_args: &RunArgs) -> Result<()> {
    tracing::error!("Training requires the 'torch' feature. Rebuild with:");
    tracing::error!("  cargo build --features torch");
    anyhow::bail!("rl2 was built without the torch feature")
}

#[cfg(not(feature = "torch"))]
fn eval(_args: &RunArgs) -> Result<()> {
    tracing::error!("Evaluation requires the 'torch' feature.");
    anyhow::bail!("rl2 was built without the torch feature")
}
