/// Build the clickhouse-server Docker image from a prebuilt binary.
use clap::{Parser, ValueEnum};
use log::{debug, error};
use thiserror::Error;

use crate::report::{JobReport, Stopwatch};
use crate::secret::Secret;

mod docker;
mod pipeline;
mod report;
mod secret;
mod shell;

const JOB_NAME: &str = "Docker server image";
const DOCKERHUB_PASSWORD_SECRET: &str = "dockerhub_robot_password";

/// Build the clickhouse-server image, both alpine and ubuntu versions.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Required tags for the resulting image.
    /// head - for master images (tag: head).
    /// release - for release images (tags: XX, XX.XX, XX.XX.XX, XX.XX.XX.XX).
    /// release-latest - for the latest release image (same tags plus latest).
    #[arg(long, value_enum, default_value_t = TagType::Head)]
    tag_type: TagType,

    /// Push the resulting image. For CI callers only, hence hidden.
    #[arg(long, hide = true)]
    push: bool,

    /// Image variants to build. Accepted for CI callers but not yet wired into
    /// Dockerfile selection.
    #[arg(long, hide = true, value_delimiter = ',', default_values_t = [String::from("ubuntu"), String::from("alpine")])]
    os: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum TagType {
    Head,
    Release,
    ReleaseLatest,
}

#[derive(Error, Debug)]
enum Error {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] pipeline::Error),

    #[error("report error: {0}")]
    Report(#[from] report::Error),
}

fn main() {
    match run() {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("fatal: {err}");
            std::process::exit(1)
        }
    }
}

fn run() -> Result<bool, Error> {
    env_logger::init();

    let stopwatch = Stopwatch::start();
    let args = Cli::parse();
    debug!("requested OS variants: {:?}", args.os);

    let credentials = Secret::AwsSsmVar {
        name: DOCKERHUB_PASSWORD_SECRET.to_string(),
    };

    let steps = pipeline::plan(args.tag_type, args.push);
    let results = pipeline::run(&steps, &credentials, true)?;

    let report = JobReport::from_results(JOB_NAME, results, &stopwatch);
    Ok(report.complete_job()?)
}
