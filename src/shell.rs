use std::fs::File;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use log::{debug, info};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Outcome of a command whose output was captured to a log file.
/// A non-zero exit status is data here, not an error.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub duration: Duration,
}

fn sh(command: &str) -> Command {
    let mut process = Command::new("sh");
    process.arg("-c").arg(command);
    process
}

/// Quiet probe: run a command and report whether it succeeded.
pub fn check(command: &str) -> bool {
    debug!("probing: {command}");
    sh(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a command verbosely, failing hard on any non-zero exit.
pub fn run_strict(command: &str) -> Result<(), Error> {
    info!("+ {command}");
    sh(command)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(Error::from)
        .and_then(|status| {
            if status.success() {
                Ok(())
            } else {
                Err(Error::Failed {
                    command: command.to_string(),
                    status,
                })
            }
        })
}

/// Run a command with stdout and stderr redirected to `log_file`,
/// timing its execution. Only spawn and filesystem problems are errors.
pub fn run_with_log(command: &str, log_file: &Path) -> Result<Captured, Error> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = File::create(log_file)?;

    info!("+ {command} &> {}", log_file.display());
    let started = Instant::now();
    let status = sh(command)
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log))
        .status()?;

    Ok(Captured {
        status,
        duration: started.elapsed(),
    })
}
