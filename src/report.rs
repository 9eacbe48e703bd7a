use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info};
use serde::Serialize;
use thiserror::Error;

use crate::shell;

/// Directory the CI runner collects logs and the result file from.
const TEMP_DIR: &str = "/tmp/praktika";
const RESULT_FILE: &str = "/tmp/praktika/result.json";

#[derive(Error, Debug)]
pub enum Error {
    #[error("command execution: {0}")]
    Shell(#[from] shell::Error),

    #[error("write report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// Outcome of one executed command, consumed by the CI result aggregation.
#[derive(Serialize, Debug)]
pub struct TaskResult {
    pub name: String,
    pub status: Status,
    /// Wall-clock seconds.
    pub duration: f64,
    pub log_file: Option<PathBuf>,
}

impl TaskResult {
    /// Run `command` with its output captured to a per-task log file under the
    /// CI temp directory, and record the outcome. A failing command yields a
    /// `Failure` entry rather than an error.
    pub fn from_command(name: &str, command: &str) -> Result<Self, Error> {
        let log_file = Path::new(TEMP_DIR).join(format!("{}.log", sanitize(name)));
        let captured = shell::run_with_log(command, &log_file)?;
        Ok(Self {
            name: name.to_string(),
            status: if captured.status.success() {
                Status::Success
            } else {
                Status::Failure
            },
            duration: captured.duration.as_secs_f64(),
            log_file: Some(log_file),
        })
    }
}

/// Log file names are derived from image references; keep them path-safe.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// Started once at process start; the report carries its epoch start time and
/// total elapsed duration.
pub struct Stopwatch {
    start_time: i64,
    timer: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start_time: chrono::Utc::now().timestamp(),
            timer: Instant::now(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct JobReport {
    pub name: String,
    pub status: Status,
    /// Unix epoch seconds.
    pub start_time: i64,
    /// Wall-clock seconds for the whole job.
    pub duration: f64,
    pub results: Vec<TaskResult>,
}

impl JobReport {
    /// Aggregate child results: the job fails if any child failed.
    pub fn from_results(name: &str, results: Vec<TaskResult>, stopwatch: &Stopwatch) -> Self {
        let status = if results.iter().all(|r| r.status == Status::Success) {
            Status::Success
        } else {
            Status::Failure
        };
        Self {
            name: name.to_string(),
            status,
            start_time: stopwatch.start_time,
            duration: stopwatch.timer.elapsed().as_secs_f64(),
            results,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Success
    }

    pub fn write(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Finalize the job: persist the report where the CI runner expects it and
    /// log a per-entry summary. Returns the aggregate success for the caller to
    /// turn into an exit code.
    pub fn complete_job(&self) -> Result<bool, Error> {
        for result in &self.results {
            match result.status {
                Status::Success => info!("OK   {} ({:.1}s)", result.name, result.duration),
                Status::Failure => {
                    let log = result
                        .log_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    error!("FAIL {} ({:.1}s), log: {log}", result.name, result.duration)
                }
            }
        }
        self.write(Path::new(RESULT_FILE))?;
        info!("result written to {RESULT_FILE}");
        Ok(self.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, status: Status) -> TaskResult {
        TaskResult {
            name: name.to_string(),
            status,
            duration: 1.5,
            log_file: None,
        }
    }

    #[test]
    fn report_succeeds_when_all_results_succeed() {
        let stopwatch = Stopwatch::start();
        let report = JobReport::from_results(
            "job",
            vec![entry("a", Status::Success), entry("b", Status::Success)],
            &stopwatch,
        );
        assert_eq!(report.status, Status::Success);
        assert!(report.is_ok());
    }

    #[test]
    fn any_failed_result_fails_the_report() {
        let stopwatch = Stopwatch::start();
        let report = JobReport::from_results(
            "job",
            vec![entry("a", Status::Success), entry("b", Status::Failure)],
            &stopwatch,
        );
        assert_eq!(report.status, Status::Failure);
        assert!(!report.is_ok());
    }

    #[test]
    fn empty_report_is_successful() {
        let stopwatch = Stopwatch::start();
        let report = JobReport::from_results("job", vec![], &stopwatch);
        assert!(report.is_ok());
    }

    #[test]
    fn report_serializes_statuses_lowercase() {
        let stopwatch = Stopwatch::start();
        let report =
            JobReport::from_results("job", vec![entry("a", Status::Failure)], &stopwatch);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        report.write(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["results"][0]["name"], "a");
        assert_eq!(json["results"][0]["status"], "failure");
    }

    #[test]
    fn log_file_names_are_path_safe() {
        assert_eq!(
            sanitize("clickhouse/clickhouse-server:tmp"),
            "clickhouse_clickhouse-server_tmp"
        );
    }
}
