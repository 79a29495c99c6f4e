use sizereport::config::{Config, GithubSettings, SheetsSettings};
use sizereport::console::RunSummary;
use sizereport::deltas::DeltasRun;
use sizereport::github::GithubClient;
use sizereport::http::HttpTransport;
use sizereport::logging::{self, Verbosity};
use sizereport::sheets::SheetsClient;
use sizereport::{trends, Error};

use log::{error, warn};
use std::{env, io, path::PathBuf, process};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Comments memory usage change reports on the repository's open pull requests
    Deltas {
        #[structopt(long, help = "print the reports instead of commenting them")]
        dry_run: bool,
    },
    /// Adds the sizes of the current build to the trends spreadsheet
    Trends,
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sizereport",
    about = "Memory usage reports for firmware pull requests"
)]
struct Opt {
    #[structopt(short, long, help = "log debug output")]
    verbose: bool,
    /// TOML settings file, the CI environment is read when omitted
    #[structopt(short, long, parse(from_os_str))]
    config_path: Option<PathBuf>,
    #[structopt(subcommand)]
    cmd: Cmd,
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn github_settings(config: Option<Config>) -> sizereport::Result<GithubSettings> {
    match config {
        Some(config) => config
            .github
            .ok_or_else(|| Error::Configuration("missing [github] section".to_owned())),
        None => GithubSettings::from_lookup(env_lookup),
    }
}

fn sheets_settings(config: Option<Config>) -> sizereport::Result<SheetsSettings> {
    match config {
        Some(config) => config
            .sheets
            .ok_or_else(|| Error::Configuration("missing [sheets] section".to_owned())),
        None => SheetsSettings::from_lookup(env_lookup),
    }
}

fn deltas(config: Option<Config>, dry_run: bool) -> anyhow::Result<()> {
    let settings = github_settings(config)?;
    let client = GithubClient::new(&settings, Box::new(HttpTransport::new()?));
    let mut run = DeltasRun::new(&client, &settings.artifact_name);
    if dry_run {
        run = run.dry_run(Box::new(io::stdout()));
    }
    let result = run.run();
    RunSummary::stdout().render(run.outcomes())?;
    Ok(result?)
}

fn trends(config: Option<Config>) -> anyhow::Result<()> {
    let settings = sheets_settings(config)?;
    let client = SheetsClient::new(&settings, Box::new(HttpTransport::new()?))?;
    trends::run(&settings, &client)?;
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    logging::init(Verbosity::from_flag(opt.verbose));

    let result = opt
        .config_path
        .as_ref()
        .map(Config::from_file)
        .transpose()
        .map_err(anyhow::Error::from)
        .and_then(|config| match opt.cmd {
            Cmd::Deltas { dry_run } => deltas(config, dry_run),
            Cmd::Trends => trends(config),
        });

    if let Err(err) = result {
        if let Some(Error::RateLimitExhausted) = err.downcast_ref::<Error>() {
            warn!("GitHub API request quota has been reached. Giving up for now.");
            return;
        }
        error!("{:#}", err);
        process::exit(1);
    }
}
