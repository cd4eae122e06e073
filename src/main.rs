use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::{debug, error, info};
use thiserror::Error;

use colloscope::catalog::{self, CatalogError, SlotIndex};
use colloscope::config::{Config, ConfigError};
use colloscope::model::{ColleModel, Planning};
use colloscope::penalty;
use colloscope::report;
use colloscope::solver::{
    HighsEngine, ProgressObserver, SearchStats, SolveEngine, SolveError, SolveParams,
};

#[derive(Debug, Parser)]
#[command(version, about = "Builds and solves the weekly colle timetable")]
struct Args {
    /// JSON configuration file with penalty weights and solver settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the solved timetable.
    #[arg(short, long, default_value = "colloscope.csv")]
    output: PathBuf,

    /// Wall-clock solve budget in seconds, overrides the configuration.
    #[arg(long)]
    time_budget: Option<u64>,

    /// Number of parallel search workers, overrides the configuration.
    #[arg(long)]
    workers: Option<u32>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("cannot write the timetable: {0}")]
    Csv(#[from] csv::Error),
    #[error("cannot write the timetable: {0}")]
    Io(#[from] std::io::Error),
}

struct SolutionPrinter;

impl ProgressObserver for SolutionPrinter {
    fn on_solution(&mut self, objective: i64, stats: &SearchStats) {
        info!(
            "[{:7.2}s] solution #{} objective = {objective}",
            stats.elapsed.as_secs_f64(),
            stats.solutions
        );
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let planning = Planning::standard(&config.weights);
    let slots = catalog::expand(&catalog::standard_catalog(), &planning.weeks)?;
    let index = SlotIndex::new(slots);
    info!(
        "catalog: {} slots over {} weeks for {} groups",
        index.len(),
        planning.weeks.len(),
        planning.groups.len()
    );

    let mut model = ColleModel::build(&planning, &index);
    penalty::encode(&mut model, &index, &planning, &config.weights);
    info!(
        "model: {} variables, {} constraints, {} penalty terms",
        model.ilp.var_count(),
        model.ilp.constraints().len(),
        model.ilp.penalties().len()
    );

    let params = SolveParams {
        time_budget: Duration::from_secs(args.time_budget.unwrap_or(config.time_budget_secs)),
        workers: args.workers.unwrap_or(config.workers),
    };
    let outcome = HighsEngine.solve(&model.ilp, &params, Some(&mut SolutionPrinter))?;
    info!(
        "{:?} solution, objective = {} after {:.2}s",
        outcome.status,
        outcome.objective,
        outcome.stats.elapsed.as_secs_f64()
    );

    let audited = penalty::audit(&model, &index, &planning, &config.weights, &outcome.valuation);
    info!("audited penalty total = {}", audited.total);
    for violation in &audited.violations {
        debug!("{violation}");
    }

    let rows = report::extract(&model, &index, &outcome.valuation);
    report::write_csv(&rows, File::create(&args.output)?)?;
    info!("timetable written to {}", args.output.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        if matches!(e, AppError::Solve(SolveError::Timeout(_))) {
            error!("no feasible timetable within the budget, raise --time-budget or relax the weights");
        }
        std::process::exit(1);
    }
}
