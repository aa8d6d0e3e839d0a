//! Running a build command inside a staged fixture project.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, instrument};

use crate::io::config::BuildConfig;
use crate::io::process::run_command_with_timeout;

/// Outcome of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub exit_code: Option<i32>,
    /// `false` when the process exited non-zero or was killed on timeout.
    pub success: bool,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Build command bound to a project directory.
///
/// Arguments are `command[1..]`, then per-call arguments, then
/// `extra_args` from the config.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    program: String,
    args: Vec<String>,
    workdir: PathBuf,
    env: BTreeMap<String, String>,
    timeout: Duration,
    output_limit_bytes: usize,
    log_path: Option<PathBuf>,
}

impl BuildRunner {
    pub fn new<S: AsRef<str>>(workdir: &Path, build: &BuildConfig, args: &[S]) -> Result<Self> {
        build.validate()?;
        let (program, leading) = build
            .command
            .split_first()
            .ok_or_else(|| anyhow!("build.command must be a non-empty array"))?;

        let mut all_args: Vec<String> = leading.to_vec();
        all_args.extend(args.iter().map(|arg| arg.as_ref().to_string()));
        all_args.extend(build.extra_args.iter().cloned());

        Ok(Self {
            program: program.clone(),
            args: all_args,
            workdir: workdir.to_path_buf(),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(build.timeout_secs),
            output_limit_bytes: build.output_limit_bytes,
            log_path: None,
        })
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Also write captured stdout/stderr to `path` after each run.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[instrument(skip_all, fields(program = %self.program, workdir = %self.workdir.display()))]
    pub fn run(&self) -> Result<BuildResult> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.workdir);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {} in {}", self.program, self.workdir.display()))?;

        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        stderr.push_str(&output.truncated_notice());
        let result = BuildResult {
            exit_code: output.status.code(),
            success: output.status.success() && !output.timed_out,
            timed_out: output.timed_out,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        };

        if let Some(log_path) = &self.log_path {
            write_build_log(log_path, &result)?;
        }

        info!(
            exit_code = ?result.exit_code,
            success = result.success,
            timed_out = result.timed_out,
            "build finished"
        );
        Ok(result)
    }

    /// Run and require success.
    pub fn build(&self) -> Result<BuildResult> {
        let result = self.run()?;
        if !result.success {
            bail!(
                "expected build to succeed: {}\n{}",
                self.describe(&result),
                render_output(&result)
            );
        }
        Ok(result)
    }

    /// Run and require failure.
    pub fn build_and_fail(&self) -> Result<BuildResult> {
        let result = self.run()?;
        if result.success {
            bail!(
                "expected build to fail: {}\n{}",
                self.describe(&result),
                render_output(&result)
            );
        }
        Ok(result)
    }

    fn describe(&self, result: &BuildResult) -> String {
        let status = match (result.timed_out, result.exit_code) {
            (true, _) => "timed out".to_string(),
            (false, Some(code)) => format!("exit code {code}"),
            (false, None) => "terminated by signal".to_string(),
        };
        format!(
            "`{} {}` in {} ({status})",
            self.program,
            self.args.join(" "),
            self.workdir.display()
        )
    }
}

fn render_output(result: &BuildResult) -> String {
    format!(
        "=== stdout ===\n{}\n=== stderr ===\n{}",
        result.stdout, result.stderr
    )
}

fn write_build_log(path: &Path, result: &BuildResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create build log dir {}", parent.display()))?;
    }
    let mut buf = render_output(result);
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write build log {}", path.display()))
}
