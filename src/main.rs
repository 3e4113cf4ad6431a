use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::debug;

use certsweep::config::read_hosts_file;
use certsweep::{dispatch, metrics, report, CheckError, Checker, Config, Settings, Status};

// from man sysexits: the command was used incorrectly
const EX_USAGE: i32 = 64;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Opts {
    /// Hostnames to check, host or host:port
    hosts: Vec<String>,

    /// Path of a file containing hostnames to check, one per line
    #[arg(long, value_name = "PATH")]
    hosts_file: Option<PathBuf>,

    /// Number of days to look into the future
    #[arg(short, long)]
    days: Option<u32>,

    /// Concurrent checks
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Handshake timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Output format: text, summary or json
    #[arg(short, long)]
    output: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Exit code when any host fails its check
    #[arg(long)]
    exit_code: Option<i32>,

    /// Push metrics to a Prometheus push gateway
    #[arg(long)]
    prometheus: bool,

    /// Prometheus push gateway address
    #[arg(long, value_name = "URL")]
    prometheus_address: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,
}

fn main() {
    pretty_env_logger::init();
    let opts = Opts::parse();

    if opts.example_config {
        println!("{}", Config::example_toml());
        return;
    }

    let settings = match resolve_settings(&opts) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {}", err);
            exit(EX_USAGE);
        }
    };
    debug!(
        "checking {} hosts with {} workers, {} day window",
        settings.hosts.len(),
        settings.concurrency,
        settings.days
    );

    let checker = Checker::new(settings.days, settings.timeout);
    let outcomes = match dispatch::run(&settings.hosts, checker, settings.concurrency) {
        Ok(outcomes) => outcomes,
        Err(err) => {
            eprintln!("error: {}", err);
            exit(EX_USAGE);
        }
    };

    let report = report::Report::from_outcomes(outcomes);
    report::render(&report, settings.output);

    if let Some(address) = &settings.prometheus {
        metrics::prom::push_report(&report, address);
    }

    if report.status() == Status::Fail {
        exit(settings.exit_code);
    }
}

/// Resolve defaults, config file and command line into validated settings.
/// Hostnames from the command line and the hosts file are combined.
fn resolve_settings(opts: &Opts) -> Result<Settings, CheckError> {
    let mut config = Config::default();
    if let Some(path) = &opts.config {
        config = config.merge_with(Config::from_file(path)?);
    }

    let mut hosts = opts.hosts.clone();
    if let Some(path) = &opts.hosts_file {
        hosts.extend(read_hosts_file(path)?);
    }

    let cli = Config::from_cli_args(
        if hosts.is_empty() { None } else { Some(hosts) },
        opts.days,
        opts.concurrency,
        opts.timeout,
        opts.output.clone(),
        opts.exit_code,
        if opts.prometheus { Some(true) } else { None },
        opts.prometheus_address.clone(),
    );

    Settings::from_config(config.merge_with(cli))
}
