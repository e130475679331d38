//! Basic example of using the ILS-VRP library.
//!
//! Solves either a JSON instance (`ProblemData` serialisation) or a
//! built-in synthetic instance, and prints the resulting routes.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ils_vrp::config::SolveOptions;
use ils_vrp::problem::{ClientGroup, Location, ProblemData, VehicleType};
use ils_vrp::solve;

#[derive(Parser, Debug)]
#[command(about = "Iterated local search for rich vehicle routing problems")]
struct Args {
    /// JSON instance file; a built-in sample is solved when omitted.
    #[arg(long)]
    instance: Option<PathBuf>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Iteration limit.
    #[arg(long, default_value_t = 2000)]
    max_iterations: u64,

    /// Wall-clock limit in seconds.
    #[arg(long)]
    max_runtime: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let data = match &args.instance {
        Some(path) => {
            println!("Loading instance from: {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("cannot open instance {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("cannot parse instance {}", path.display()))?
        }
        None => {
            println!("Solving the built-in sample instance");
            sample_instance()?
        }
    };

    println!(
        "{} depots, {} clients, {} vehicles",
        data.num_depots(),
        data.num_clients(),
        data.num_vehicles()
    );

    let mut options = SolveOptions::new()
        .with_seed(args.seed)
        .with_max_iterations(args.max_iterations);
    if let Some(seconds) = args.max_runtime {
        options = options.with_max_runtime(seconds);
    }

    let result = solve(&data, &options)?;

    println!(
        "Finished after {} iterations in {:.2?}",
        result.num_iterations, result.runtime
    );
    println!(
        "Initial cost: {}, final cost: {}",
        result.stats.initial_cost, result.stats.final_cost
    );
    println!("{}", result.best);

    Ok(())
}

/// A small clustered instance: one depot, twenty clients on a grid, four
/// identical vehicles.
fn sample_instance() -> Result<ProblemData, ils_vrp::error::Error> {
    let depot = Location::new(0, 0);

    let mut clients = Vec::new();
    for i in 0..20 {
        let row = i / 5;
        let col = i % 5;
        clients.push(
            Location::new(10 + col * 10, 10 + row * 10)
                .with_delivery(vec![1])
                .with_name(format!("client-{}", i + 1)),
        );
    }

    let vehicles = vec![VehicleType::new(4, vec![6]).with_name("van")];

    ProblemData::with_euclidean_matrices(vec![depot], clients, vehicles, Vec::<ClientGroup>::new())
}
