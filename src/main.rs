use std::fs;
use std::io::{self, BufWriter, Result};
use std::sync::atomic::{self, AtomicBool};
use std::{process, result};

use fern::InitError;
use log::{error, info, warn};
use xpoints::cli::{self, CliOptions, DataSource};
use xpoints::provider::{UnderstatDump, XgMappingFile, XgProvider};
use xpoints::report::{self, ReportTable, SeasonSummary};
use xpoints::season::{FailurePolicy, Season, SeasonSettings};
use xpoints::simulation::TrialCount;

fn main() -> Result<()> {
    let cli_args = cli::parse_cli_arguments();

    if let Some(log_file_name) = &cli_args.log_file_name.as_ref() {
        setup_logger(log_file_name).map_err(|err| match err {
            InitError::Io(io_err) => io_err,
            InitError::SetLoggerError(_) => panic!("Logger already initialized"),
        })?;
    }
    info!("CLI args: {:?}", cli_args);

    // If user presses ctrl-c, finish the matches that are already being simulated
    let is_shutting_down: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(false)));

    ctrlc::set_handler(move || {
        // If is_shutting_down was already set, exit immediately
        if is_shutting_down.swap(true, atomic::Ordering::SeqCst) {
            process::exit(0)
        } else {
            println!("\nGot Ctrl-C, waiting for running simulations to finish...");
            println!("Press Ctrl-C again to exit immediately");
        }
    })
    .expect("Error setting Ctrl-C handler");

    run_season(cli_args, is_shutting_down)
}

fn setup_logger(file_name: &str) -> result::Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(fern::log_file(file_name)?)
        .apply()?;
    Ok(())
}

fn run_season(cli_args: CliOptions, is_shutting_down: &AtomicBool) -> Result<()> {
    let num_simulations = TrialCount::try_from(cli_args.simulations)
        .unwrap_or_else(|err| exit_with_error(&err.to_string()));

    let provider: Box<dyn XgProvider> = match &cli_args.source {
        DataSource::XgFile(path) => Box::new(XgMappingFile::new(path)),
        DataSource::UnderstatFile(path) => Box::new(UnderstatDump::new(path)),
    };
    let batch = provider
        .team_xg(&cli_args.team, &cli_args.season)
        .unwrap_or_else(|err| exit_with_error(&err.to_string()));
    if let (FailurePolicy::FailBatch, Some(failure)) =
        (cli_args.failure_policy, batch.malformed.first())
    {
        exit_with_error(&format!(
            "{}\nRerun with --skip-invalid to leave invalid matches out",
            failure
        ))
    }

    let settings = SeasonSettings {
        concurrency: cli_args.concurrency,
        num_simulations,
        seed: cli_args.seed,
    };
    let season = Season::new(batch.matches, settings);
    info!("Simulating season: {:?}", season);

    let mut outcome = season.simulate(is_shutting_down);

    let (rows, report_failures) = report::report_partitioned(&outcome.results);
    let mut failures = batch.malformed;
    failures.append(&mut outcome.failures);
    failures.extend(report_failures);
    outcome.failures = failures;

    if let Err(failure) = outcome.check(cli_args.failure_policy) {
        exit_with_error(&format!(
            "{}\nRerun with --skip-invalid to leave invalid matches out",
            failure
        ))
    }
    for failure in &outcome.failures {
        eprintln!("Skipped {}", failure);
        warn!("Skipped {}", failure);
    }
    if !outcome.unfinished.is_empty() {
        println!(
            "Stopped early, {} matches were not simulated.",
            outcome.unfinished.len()
        );
    }

    print!("{}", ReportTable(&rows));
    println!("{}", SeasonSummary::new(&rows, &outcome.results));

    if let Some(file_name) = cli_args.csv_out.as_ref() {
        let file = fs::File::create(file_name)?;
        report::write_csv(&rows, BufWriter::new(file))
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        info!("Wrote {} rows to {}", rows.len(), file_name);
    }
    Ok(())
}

/// Utility for quickly exiting, generally due to a user error or invalid input data
fn exit_with_error(error_message: &str) -> ! {
    eprintln!("{}", error_message);
    error!("{}", error_message);
    process::exit(1)
}
