use clap::Parser;
use phonon_runner::{
    cli::{Cli, Commands, JobArgs, ScanArgs},
    collector::Collector,
    error::Result,
    executors::{Executors, Outcome},
    logging,
    plan::JobPlan,
    status,
};
use std::process::exit;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app(Cli::parse()) {
        eprintln!("Error: {e}");
        exit(1);
    }
}

fn run_app(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("phonon-runner v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let result = run(cli.command);
    if let Err(ref e) = result {
        error!("Command failed: {e}");
    }

    result
}

fn plan(job: &JobArgs) -> Result<JobPlan> {
    Ok(JobPlan::from_config(&job.load()?)?)
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Generate(job) => {
            info!("Dispatching to 'generate' command.");
            if let Outcome::Script(path) = Executors::batch(plan(&job)?).execute()? {
                println!("{}", path.display());
            }
        }
        Commands::Run { job, workdir } => {
            info!("Dispatching to 'run' command.");
            let plan = JobPlan::from_config(&job.load_in(&workdir)?)?;
            if let Outcome::Run(summary) = Executors::local(plan, workdir).execute()? {
                println!(
                    "completed {} | skipped {} | failed {}",
                    summary.completed.len(),
                    summary.skipped.len(),
                    summary.failed.len()
                );
                if !summary.failed.is_empty() {
                    println!("failed: {}", summary.failed.join(" "));
                }
            }
        }
        Commands::Scan(ScanArgs { dir, prefix, width }) => {
            info!("Dispatching to 'scan' command.");
            let count = Collector::new(&prefix, width)?
                .scan(&dir)?
                .contiguous_count()?;
            println!("{count}");
        }
        Commands::Status { job, workdir } => {
            info!("Dispatching to 'status' command.");
            let plan = plan(&job)?;
            print!("{}", status::progress(&plan, &workdir)?);
        }
    }

    Ok(())
}
