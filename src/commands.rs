//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::scheduler::OrderPolicy;

#[derive(Subcommand)]
pub enum Commands {
    /// Start the service, run every scenario in seeded order, shut it down
    Run {
        /// Directory searched for scenario files (default: scenarios.root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Seed for the run order (default: scenarios.seed)
        #[arg(long, conflicts_with = "random_seed")]
        seed: Option<u64>,

        /// Draw a fresh seed; it is printed so the run can be replayed
        #[arg(long)]
        random_seed: bool,

        /// Shuffle scenarios or run them in path order
        #[arg(long, value_enum)]
        order: Option<OrderPolicy>,

        /// Show the scenario engine's own output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Print the run order for a seed without starting the service
    Order {
        /// Directory searched for scenario files (default: scenarios.root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Seed for the run order (default: scenarios.seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Shuffle scenarios or run them in path order
        #[arg(long, value_enum)]
        order: Option<OrderPolicy>,
    },

    /// Measure bulk create/update/delete cost at increasing load sizes
    Bench {
        /// CSV file for the results (default: bench.results_file)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Collection endpoint to exercise, e.g. "projects" or "todos"
        #[arg(long)]
        resource: Option<String>,

        /// Load sizes, comma separated: --sizes 1,200,400
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Also print the records as JSON
        #[arg(long)]
        json: bool,
    },
}
