use anyhow::{Context, Result};
use treemine::cli::{parse_args, setup_logging, Commands, MineArgs, RunArgs};
use treemine::data::loader::{LoaderConfig, TableLoader};
use treemine::experiment::Experiment;
use treemine::store::mining::{self, MiningReport};
use treemine::store::Store;
use treemine::tree::cart::CartInducer;
use tracing::{error, info};

fn main() {
    let cli = parse_args();

    setup_logging(cli.verbose);

    info!("{}", treemine::info());

    let result = match cli.command {
        Commands::Run(args) => run_experiment(args),
        Commands::Mine(args) => run_mine(args),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_experiment(args: RunArgs) -> Result<()> {
    info!("Input file: {:?}", args.input);
    info!("Database: {:?}", args.database);

    let config = args
        .experiment_config()
        .context("Invalid experiment configuration")?;

    info!("Loading feature table...");
    let loader = TableLoader::with_config(LoaderConfig {
        condition_column: args.condition_column.clone(),
        strip_versions: !args.keep_versions,
    });
    let table = loader
        .load(&args.input)
        .with_context(|| format!("Failed to load data from {:?}", args.input))?;
    info!("Loaded {} samples x {} genes", table.n_samples(), table.n_genes());

    treemine::utils::ensure_parent_dir(&args.database)?;
    let mut store = Store::open(&args.database)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;

    let inducer = CartInducer::new(config.cart);
    let experiment = Experiment::new(config, inducer).with_progress(!args.no_progress);
    let summary = experiment
        .run(&mut store, &table)
        .context("Experiment failed")?;

    summary.print();

    if let Some(output) = &args.importance_output {
        treemine::utils::ensure_parent_dir(output)?;
        summary
            .importances
            .write_json(output)
            .with_context(|| format!("Failed to write importance report to {:?}", output))?;
        info!("Importance report saved to: {:?}", output);
    }

    Ok(())
}

fn run_mine(args: MineArgs) -> Result<()> {
    let store = Store::open(&args.database)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;

    let Some(id) = args.experiment else {
        let experiments = mining::list_experiments(store.connection())?;
        if experiments.is_empty() {
            info!("No experiments in {:?}", args.database);
        }
        for e in experiments {
            println!("{:>5}  {}  {:>6} trees  {}", e.id, e.created_at, e.trees, e.description);
        }
        return Ok(());
    };

    let report = MiningReport::build(store.connection(), id, args.top)?
        .with_context(|| format!("Experiment {} not found", id))?;

    match &args.output {
        Some(output) => {
            treemine::utils::ensure_parent_dir(output)?;
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(output, json)?;
            info!("Mining report saved to: {:?}", output);
        }
        None => report.print(),
    }

    Ok(())
}
