//! phash-robustness - measure how well a perceptual hash survives common image manipulations.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use phash_robustness::{
    EvaluationConfig,
    catalogue::ManipulationCatalogue,
    evaluation::Evaluator,
    manipulation::{GeneratorConfig, ManipulationGenerator},
    report::{ReportWriter, render_summary},
};

#[derive(Parser)]
#[command(name = "phash-robustness")]
#[command(author, version, about = "Perceptual hash robustness benchmark", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON catalogue replacing the built-in manipulation list
    #[arg(long, global = true, value_name = "FILE")]
    catalogue: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a manipulated variant of every original for every catalogue entry
    Manipulate {
        #[arg(long, default_value = "originals")]
        originals: PathBuf,

        #[arg(long, default_value = "manipulated")]
        output: PathBuf,

        /// Seed for the randomised manipulations (noise, collage)
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Score originals against their variants and write reports
    Detect {
        #[arg(long, default_value = "originals")]
        originals: PathBuf,

        #[arg(long, default_value = "manipulated")]
        manipulated: PathBuf,

        #[arg(long, default_value = "results")]
        output: PathBuf,

        /// Evaluate on a single thread
        #[arg(long)]
        sequential: bool,

        /// Skip the PNG charts
        #[arg(long)]
        no_plots: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let catalogue = match &cli.catalogue {
        Some(path) => ManipulationCatalogue::from_json_file(path)
            .with_context(|| format!("loading catalogue {}", path.display()))?,
        None => ManipulationCatalogue::reference(),
    };

    match cli.command {
        Commands::Manipulate {
            originals,
            output,
            seed,
        } => {
            let generator = ManipulationGenerator::new(&catalogue, GeneratorConfig::default().with_seed(seed))?;
            let written = generator.generate(&originals, &output)?;
            info!("Wrote {} manipulated images to {}", written, output.display());
        }
        Commands::Detect {
            originals,
            manipulated,
            output,
            sequential,
            no_plots,
        } => {
            let config = EvaluationConfig::default().with_parallel(!sequential);
            let table = Evaluator::new(catalogue)
                .with_config(config)
                .evaluate(&originals, &manipulated)
                .context("evaluation aborted")?;

            let paths = ReportWriter::new(&output).with_plots(!no_plots).write_all(&table)?;

            println!("{}", render_summary(&table));
            println!("Results saved to: {}", paths.csv.display());
            println!("Summary saved to: {}", paths.summary.display());
            if !paths.plots.is_empty() {
                println!("Visualizations saved to: {}", output.display());
            }
        }
    }

    Ok(())
}
