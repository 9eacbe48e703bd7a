use std::io::Write;
use std::process::{ExitStatus, Stdio};

use log::debug;
use thiserror::Error;

use crate::shell;

#[derive(Error, Debug)]
pub enum Error {
    #[error("docker login failed with exit code {0}")]
    Login(ExitStatus),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// Parameters for the single buildx invocation.
pub struct BuildParams<'a> {
    pub platform: &'a str,
    pub image: &'a str,
    pub context: &'a str,
    pub dockerfile: &'a str,
    pub cache_dir: &'a str,
}

/// Construct the buildx command line, importing and exporting layer cache
/// from the same local directory so repeated job runs stay incremental.
pub fn build_command(params: &BuildParams) -> String {
    format!(
        "docker buildx build --platform {} -t {} {} -f {} \
         --cache-from=type=local,src={} --cache-to=type=local,dest={}",
        params.platform,
        params.image,
        params.context,
        params.dockerfile,
        params.cache_dir,
        params.cache_dir,
    )
}

/// Whether the daemon already has registry credentials.
pub fn is_logged_in() -> bool {
    shell::check("docker system info | grep --quiet -E 'Username|Registry'")
}

/// Log in to Docker Hub. The password goes to the child process over stdin so
/// that it never shows up in process listings or job logs.
pub fn login(username: &str, password: &str) -> Result<(), Error> {
    debug!("logging in to Docker Hub as {username}");
    let mut child = std::process::Command::new("docker")
        .arg("login")
        .arg("--username")
        .arg(username)
        .arg("--password-stdin")
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()?;

    child.stdin.as_mut().unwrap().write_all(password.as_bytes())?;
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Login(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_shape() {
        let command = build_command(&BuildParams {
            platform: "linux/arm64",
            image: "clickhouse/clickhouse-server:tmp",
            context: "./ci/docker/clickhouse-server",
            dockerfile: "./ci/docker/clickhouse-server/from_binary/Dockerfile.ubuntu",
            cache_dir: "/tmp/build-cache",
        });
        assert_eq!(
            command,
            "docker buildx build --platform linux/arm64 \
             -t clickhouse/clickhouse-server:tmp ./ci/docker/clickhouse-server \
             -f ./ci/docker/clickhouse-server/from_binary/Dockerfile.ubuntu \
             --cache-from=type=local,src=/tmp/build-cache \
             --cache-to=type=local,dest=/tmp/build-cache"
        );
    }
}
