use crate::season::FailurePolicy;
use clap::{self, Arg, ArgAction, ArgGroup, Command};
use std::{env, ffi::OsString};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    XgFile(String),
    UnderstatFile(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliOptions {
    pub team: String,
    pub season: String,
    pub source: DataSource,
    pub simulations: i64,
    pub concurrency: usize,
    pub seed: Option<u64>,
    pub csv_out: Option<String>,
    pub log_file_name: Option<String>,
    pub failure_policy: FailurePolicy,
}

pub fn parse_cli_arguments() -> CliOptions {
    parse_cli_arguments_from(&mut env::args_os()).unwrap_or_else(|err| err.exit())
}

pub fn parse_cli_arguments_from(
    itr: impl Iterator<Item = OsString>,
) -> Result<CliOptions, clap::Error> {
    let matches = Command::new("xpoints")
        .version("0.1.0")
        .about("Estimate expected points for a team's matches by simulating every shot's xG")
        .arg(Arg::new("team")
            .help("Team identifier, passed on to the data source. The team's side of each match is reported under this name.")
            .short('t')
            .long("team")
            .required(true)
            .num_args(1))
        .arg(Arg::new("season")
            .help("Season identifier, passed on to the data source.")
            .long("season")
            .required(true)
            .num_args(1))
        .arg(Arg::new("xg-file")
            .help("JSON file mapping each match id to its datetime and both teams' shot xG lists.")
            .long("xg-file")
            .value_name("file.json")
            .num_args(1))
        .arg(Arg::new("understat-file")
            .help("JSON dump of the team's Understat match data, with the shot data of every match.")
            .long("understat-file")
            .value_name("file.json")
            .num_args(1))
        .group(ArgGroup::new("source")
            .args(["xg-file", "understat-file"])
            .required(true))
        .arg(Arg::new("simulations")
            .help("Number of simulated playing-outs of every match.")
            .short('n')
            .long("simulations")
            .default_value("10000")
            .allow_hyphen_values(true)
            .value_parser(clap::value_parser!(i64)))
        .arg(Arg::new("concurrency")
            .help("Number of matches to simulate in parallel.")
            .default_value("1")
            .short('c')
            .long("concurrency")
            .value_name("n")
            .value_parser(clap::value_parser!(u64).range(1..=1024)))
        .arg(Arg::new("seed")
            .help("Seed for the random number generator. Runs with the same seed give the same results.")
            .long("seed")
            .num_args(1)
            .value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("csv")
            .help("Also write the results table to a CSV file. An existing file is overwritten.")
            .long("csv")
            .value_name("file.csv")
            .num_args(1))
        .arg(Arg::new("skip-invalid")
            .help("Leave invalid matches out of the report, instead of failing the whole run.")
            .long("skip-invalid")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("log")
            .short('l')
            .long("log")
            .value_name("xpoints.log")
            .help("Name of debug logfile. If not set, no debug log will be written.")
            .num_args(1),
        )
        .try_get_matches_from(itr)?;

    let source = if let Some(path) = matches.get_one::<String>("xg-file") {
        DataSource::XgFile(path.clone())
    } else {
        DataSource::UnderstatFile(matches.get_one::<String>("understat-file").unwrap().clone())
    };

    let failure_policy = if matches.get_flag("skip-invalid") {
        FailurePolicy::SkipInvalid
    } else {
        FailurePolicy::FailBatch
    };

    Ok(CliOptions {
        team: matches.get_one::<String>("team").unwrap().clone(),
        season: matches.get_one::<String>("season").unwrap().clone(),
        source,
        simulations: *matches.get_one::<i64>("simulations").unwrap(),
        concurrency: *matches.get_one::<u64>("concurrency").unwrap() as usize,
        seed: matches.get_one::<u64>("seed").copied(),
        csv_out: matches.get_one("csv").cloned(),
        log_file_name: matches.get_one::<String>("log").cloned(),
        failure_policy,
    })
}
