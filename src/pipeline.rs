use log::{debug, info};
use thiserror::Error;

use crate::docker;
use crate::report::{self, TaskResult};
use crate::secret::{self, Secret};
use crate::shell;
use crate::TagType;

/// Where the CI runner drops the prebuilt clickhouse binary.
const INPUT_BINARY: &str = "/tmp/praktika/input/clickhouse";
/// Build context directory, containing the Dockerfiles.
const IMAGE_PATH: &str = "./ci/docker/clickhouse-server";
const IMAGE_REPO: &str = "clickhouse/clickhouse-server";
/// The image is built under a temporary tag; final release tags are applied
/// by the release job, not here.
const TEMP_TAG: &str = "tmp";
const PLATFORM: &str = "linux/arm64";
/// Local layer cache, persisted across job runs on the same cache volume.
const CACHE_DIR: &str = "/tmp/build-cache";

const DOCKER_USERNAME: &str = "robotclickhouse";

#[derive(Error, Debug)]
pub enum Error {
    #[error("stage binary: {0}")]
    Shell(#[from] shell::Error),

    #[error("docker: {0}")]
    Docker(#[from] docker::Error),

    #[error("credential: {0}")]
    Secret(#[from] secret::Error),

    #[error("result capture: {0}")]
    Report(#[from] report::Error),
}

/// One sequential step of the job. Planned up front so the ordering is a
/// value that can be inspected, then executed strictly top to bottom.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Ensure the daemon is logged in to Docker Hub before anything pushes.
    Login,
    /// Copy the prebuilt binary into the build context.
    StageBinary { source: String, dest: String },
    /// Run the buildx command, capturing its outcome as a result entry.
    Build { name: String, command: String },
}

/// Plan the job. `tag_type` selects the final release tags and is accepted
/// here for the callers that pass it, but only the temporary image is built in
/// this job, so it does not change the plan. The alpine entry of `--os` is
/// likewise not wired up yet: only the ubuntu Dockerfile is built.
pub fn plan(tag_type: TagType, push: bool) -> Vec<Step> {
    debug!("planning build for tag type {tag_type:?}, push: {push}");

    let mut steps = Vec::new();
    steps.push(Step::StageBinary {
        source: INPUT_BINARY.to_string(),
        dest: format!("{IMAGE_PATH}/"),
    });
    if push {
        steps.push(Step::Login);
    }

    let image = format!("{IMAGE_REPO}:{TEMP_TAG}");
    let command = docker::build_command(&docker::BuildParams {
        platform: PLATFORM,
        image: &image,
        context: IMAGE_PATH,
        dockerfile: &format!("{IMAGE_PATH}/from_binary/Dockerfile.ubuntu"),
        cache_dir: CACHE_DIR,
    });
    steps.push(Step::Build {
        name: image,
        command,
    });
    steps
}

/// Execute the plan in order. Staging and login are strict: any failure aborts
/// the job. The build is captured as a result entry and handed to the reporter
/// to judge.
pub fn run(steps: &[Step], credentials: &Secret, relogin: bool) -> Result<Vec<TaskResult>, Error> {
    let mut results = Vec::new();
    for step in steps {
        match step {
            Step::StageBinary { source, dest } => {
                shell::run_strict(&format!("cp {source} {dest}"))?;
            }
            Step::Login => {
                if relogin || !docker::is_logged_in() {
                    let password = credentials.value()?;
                    docker::login(DOCKER_USERNAME, &password)?;
                } else {
                    info!("already logged in, skipping docker login");
                }
            }
            Step::Build { name, command } => {
                results.push(TaskResult::from_command(name, command)?);
            }
        }
    }
    Ok(results)
}
