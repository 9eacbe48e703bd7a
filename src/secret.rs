use std::process::{Command, Stdio};

use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("environment variable {0} is not set")]
    EnvVarNotSet(String),

    #[error("ssm parameter {name} could not be fetched (exit status {status})")]
    SsmFetch {
        name: String,
        status: std::process::ExitStatus,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// A named secret and where to fetch it from. The resolved value is only ever
/// held in memory on its way to a consumer; it must not be logged.
#[derive(Debug, Clone)]
pub enum Secret {
    /// An SSM parameter, fetched with the aws cli using ambient credentials.
    AwsSsmVar { name: String },
    /// An environment variable on the job runner.
    EnvVar { name: String },
}

impl Secret {
    pub fn value(&self) -> Result<String, Error> {
        match self {
            Secret::AwsSsmVar { name } => {
                debug!("fetching SSM parameter {name}");
                let output = Command::new("aws")
                    .args(["ssm", "get-parameter"])
                    .arg("--name")
                    .arg(name)
                    .args(["--with-decryption", "--output", "text"])
                    .args(["--query", "Parameter.Value"])
                    .stderr(Stdio::inherit())
                    .output()?;
                if !output.status.success() {
                    return Err(Error::SsmFetch {
                        name: name.clone(),
                        status: output.status,
                    });
                }
                let value = String::from_utf8_lossy(&output.stdout);
                Ok(value.trim_end_matches('\n').to_string())
            }
            Secret::EnvVar { name } => {
                debug!("reading secret from environment variable {name}");
                std::env::var(name).map_err(|_| Error::EnvVarNotSet(name.clone()))
            }
        }
    }
}
