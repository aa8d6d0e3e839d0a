//! `testkit` command-line entry point.
//!
//! Writes and inspects the locator file and stages fixture projects from a
//! shell or a build script.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use testkit::container::ProjectContainer;
use testkit::exit_codes;
use testkit::generate::process_projects;
use testkit::io::config::{CONFIG_FILE_NAME, load_config};
use testkit::locator::{MarkerRecord, discover, read_locator, write_marker_file};
use testkit::logging;
use testkit::select::resolve_project;

#[derive(Parser)]
#[command(
    name = "testkit",
    version,
    about = "Locate and stage fixture projects for integration tests"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a locator file from explicit paths.
    WriteLocator {
        /// Locator file to (over)write.
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        staging_dir: PathBuf,
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Defaults to `simple`.
        #[arg(long, conflicts_with = "no_implicit_project")]
        implicit_project: Option<String>,
        /// Record an empty implicit project name.
        #[arg(long)]
        no_implicit_project: bool,
    },
    /// Copy fixture sources into the output dir and write the locator there.
    Process {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Defaults to `<root>/testkit.toml`.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the locator contents.
    Show {
        #[arg(long)]
        locator: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List fixture projects; the implicit one is marked with `*`.
    Projects {
        #[arg(long)]
        locator: Option<PathBuf>,
    },
    /// Stage a copy of a project, keep it, and print its path.
    Stage {
        name: Option<String>,
        #[arg(long)]
        locator: Option<PathBuf>,
    },
    /// Stage a project and run the configured build command in it.
    Run {
        name: Option<String>,
        #[arg(long)]
        locator: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Defaults to `<root>/testkit.toml`.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Keep the staged copy even when the build succeeds.
        #[arg(long)]
        keep: bool,
        /// Arguments passed to the build command.
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Remove the whole staging dir.
    Clean {
        #[arg(long)]
        locator: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::WriteLocator {
            file,
            staging_dir,
            base_dir,
            implicit_project,
            no_implicit_project,
        } => cmd_write_locator(
            &file,
            staging_dir,
            base_dir,
            implicit_project,
            no_implicit_project,
        ),
        Command::Process { root, config } => {
            cmd_process(&root, &config_path(&root, config.as_deref()))
        }
        Command::Show { locator, json } => cmd_show(locator.as_deref(), json),
        Command::Projects { locator } => cmd_projects(locator.as_deref()),
        Command::Stage { name, locator } => cmd_stage(name.as_deref(), locator.as_deref()),
        Command::Run {
            name,
            locator,
            root,
            config,
            keep,
            args,
        } => cmd_run(
            name.as_deref(),
            locator.as_deref(),
            &config_path(&root, config.as_deref()),
            keep,
            &args,
        ),
        Command::Clean { locator } => cmd_clean(locator.as_deref()),
    }
}

fn cmd_write_locator(
    file: &Path,
    staging_dir: PathBuf,
    base_dir: Option<PathBuf>,
    implicit_project: Option<String>,
    no_implicit_project: bool,
) -> Result<i32> {
    let mut record = MarkerRecord::new(absolute(&staging_dir)?);
    if let Some(base_dir) = base_dir {
        record = record.with_base_dir(absolute(&base_dir)?);
    }
    if no_implicit_project {
        record = record.with_implicit_project_name(None);
    } else if let Some(name) = implicit_project {
        record = record.with_implicit_project_name(Some(name));
    }
    write_marker_file(file, &record)?;
    println!("locator: {}", file.display());
    Ok(exit_codes::OK)
}

fn cmd_process(root: &Path, config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let outcome = process_projects(root, &cfg)?;
    println!("locator: {}", outcome.locator_path.display());
    println!("projects: {}", outcome.projects.join(", "));
    Ok(exit_codes::OK)
}

fn cmd_show(locator: Option<&Path>, json: bool) -> Result<i32> {
    let path = locate(locator)?;
    let parsed = read_locator(&path)?;
    if json {
        let mut payload = serde_json::to_string_pretty(&parsed).context("serialize locator")?;
        payload.push('\n');
        print!("{payload}");
        return Ok(exit_codes::OK);
    }
    println!("locator: {}", parsed.path.display());
    println!("base-dir: {}", parsed.resolved_base_dir().display());
    println!("staging-dir: {}", parsed.staging_dir.display());
    println!(
        "implicit-project-name: {}",
        parsed.implicit_project_name.as_deref().unwrap_or("")
    );
    Ok(exit_codes::OK)
}

fn cmd_projects(locator: Option<&Path>) -> Result<i32> {
    let container = load_container(locator)?;
    for name in container.project_names() {
        let marker = if container.implicit_project_name() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {name}");
    }
    Ok(exit_codes::OK)
}

fn cmd_stage(name: Option<&str>, locator: Option<&Path>) -> Result<i32> {
    let container = load_container(locator)?;
    let project = resolve_project(&container, &[name])?;
    let dir = container.project_scope(&project)?.keep();
    println!("{}", dir.display());
    Ok(exit_codes::OK)
}

fn cmd_run(
    name: Option<&str>,
    locator: Option<&Path>,
    config_path: &Path,
    keep: bool,
    args: &[String],
) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let container = load_container(locator)?.with_build_config(cfg.build);
    let project = resolve_project(&container, &[name])?;
    let scope = container.project_scope(&project)?;

    let runner = scope.create_runner(args)?;
    debug!(program = runner.program(), args = ?runner.arguments(), "running build");
    let result = runner.run()?;
    print!("{}", result.stdout);
    eprint!("{}", result.stderr);

    if result.success {
        if keep {
            println!("staged: {}", scope.keep().display());
        } else {
            scope.release()?;
        }
        return Ok(exit_codes::OK);
    }

    let dir = scope.keep();
    eprintln!(
        "build failed (exit code {}); staged project kept at {}",
        result
            .exit_code
            .map_or_else(|| "none".to_string(), |code| code.to_string()),
        dir.display()
    );
    Ok(exit_codes::BUILD_FAILED)
}

fn cmd_clean(locator: Option<&Path>) -> Result<i32> {
    let path = locate(locator)?;
    let parsed = read_locator(&path)?;
    if parsed.staging_dir.exists() {
        fs::remove_dir_all(&parsed.staging_dir)
            .with_context(|| format!("remove {}", parsed.staging_dir.display()))?;
    }
    println!("clean: {}", parsed.staging_dir.display());
    Ok(exit_codes::OK)
}

fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("resolve current directory")?;
            discover(&cwd)
        }
    }
}

/// `--config` when given, else `testkit.toml` under `--root`.
fn config_path(root: &Path, config: Option<&Path>) -> PathBuf {
    config.map_or_else(|| root.join(CONFIG_FILE_NAME), Path::to_path_buf)
}

fn load_container(locator: Option<&Path>) -> Result<ProjectContainer> {
    ProjectContainer::from_locator(&locate(locator)?)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("resolve {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_write_locator() {
        let cli = Cli::parse_from([
            "testkit",
            "write-locator",
            "--file",
            "/out/testkit_locator.properties",
            "--staging-dir",
            "/tmp/testKit",
        ]);
        match cli.command {
            Command::WriteLocator {
                base_dir,
                implicit_project,
                no_implicit_project,
                ..
            } => {
                assert!(base_dir.is_none());
                assert!(implicit_project.is_none());
                assert!(!no_implicit_project);
            }
            _ => panic!("expected write-locator"),
        }
    }

    #[test]
    fn implicit_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "testkit",
            "write-locator",
            "--file",
            "f",
            "--staging-dir",
            "/s",
            "--implicit-project",
            "simple",
            "--no-implicit-project",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn parse_run_with_trailing_args() {
        let cli = Cli::parse_from(["testkit", "run", "simple", "--", "--release", "-q"]);
        match cli.command {
            Command::Run { name, args, keep, .. } => {
                assert_eq!(name.as_deref(), Some("simple"));
                assert_eq!(args, vec!["--release", "-q"]);
                assert!(!keep);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn process_and_run_resolve_config_the_same_way() {
        for sub in ["process", "run"] {
            let cli = Cli::parse_from(["testkit", sub, "--root", "/proj"]);
            let (root, config) = match cli.command {
                Command::Process { root, config } => (root, config),
                Command::Run { root, config, .. } => (root, config),
                _ => panic!("expected process or run"),
            };
            assert_eq!(
                config_path(&root, config.as_deref()),
                PathBuf::from("/proj/testkit.toml")
            );
        }
        assert_eq!(
            config_path(Path::new("/proj"), Some(Path::new("/other/cfg.toml"))),
            PathBuf::from("/other/cfg.toml")
        );
    }
}
