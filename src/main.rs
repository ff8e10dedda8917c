// ABOUTME: Entry point for the dockhand CLI application.
// ABOUTME: Parses arguments, runs a task file or a one-shot task, and reports results.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use dockhand::config::{self, TaskFile};
use dockhand::error::Result;
use dockhand::locator::FsBlobStore;
use dockhand::metrics::{MetricRegistry, MetricsRecorder};
use dockhand::output::{Output, OutputMode};
use dockhand::pipeline::Workspace;
use dockhand::runner::{docker_connector, run_task_file};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else if cli.quiet || cli.json {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(cli.output_mode());
    output.start_timer();

    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let overrides = cli.connection.to_config();
    let metrics = Arc::new(MetricRegistry::new());

    match cli.command {
        Commands::Init { image, force } => {
            let path = config::init_config(&cwd, image.as_deref(), force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Run { file } => {
            let (path, base) = match file {
                Some(path) => {
                    let base = task_file_dir(&cwd, &path);
                    (path, base)
                }
                None => (TaskFile::discover(&cwd)?, cwd.clone()),
            };

            let mut file = TaskFile::load(&path)?;
            file.connection = file.connection.merged(Some(&overrides));

            let working_dir = file.working_dir(&base);
            let store = FsBlobStore::new(file.storage_root(&working_dir));
            let workspace = Workspace {
                working_dir: &working_dir,
                store: &store,
                metrics: Some(Arc::clone(&metrics) as Arc<dyn MetricsRecorder>),
            };

            output.progress(&format!(
                "Running {} task(s) from {}",
                file.tasks.len(),
                path.display()
            ));
            run_task_file(&file, &workspace, docker_connector, |entry, result| {
                output.task_result(entry.label(), result)
            })
            .await?;

            tracing::debug!(metrics = ?metrics.snapshot(), "pipeline metrics");
            if output.mode() == OutputMode::Normal {
                output.success("All tasks finished");
            }
            Ok(())
        }
        command => {
            let Some(task) = command.into_task() else {
                return Ok(());
            };
            let connector = docker_connector(&overrides)?;
            let store = FsBlobStore::new(cwd.join(config::DEFAULT_STORAGE_DIR));
            let workspace = Workspace {
                working_dir: &cwd,
                store: &store,
                metrics: Some(Arc::clone(&metrics) as Arc<dyn MetricsRecorder>),
            };

            let result = task.run(&workspace, &connector).await?;
            output.task_result(task.kind(), &result);
            Ok(())
        }
    }
}

/// Directory a task file's relative settings resolve against.
fn task_file_dir(cwd: &Path, path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd.to_path_buf(),
    }
}
