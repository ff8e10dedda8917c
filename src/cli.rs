// ABOUTME: CLI argument definitions using clap derive macros.
// ABOUTME: Defines the task-file runner, one-shot commands, and global connection flags.

use clap::{Args, Parser, Subcommand, ValueEnum};
use dockhand::config::{ConnectionConfig, CredentialsConfig, DockerConfigValue, EnvValue};
use dockhand::engine::PruneKind;
use dockhand::output::OutputMode;
use dockhand::tasks::{
    BuildTask, ComposeTask, ImageCommand, ImageTask, PruneTask, PullTask, PushTask, RmTask,
    StopTask, TagTask, Task,
};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(about = "Build, tag and push container images against a Docker Engine")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only final results
    #[arg(long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Engine and registry settings; on `run` they override the task file's `connection:` block.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Engine endpoint (unix://, tcp:// or http://)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Docker config: a path or inline JSON
    #[arg(long, global = true)]
    pub docker_config: Option<String>,

    /// Registry the credentials apply to
    #[arg(long, global = true)]
    pub registry: Option<String>,

    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,
}

impl ConnectionArgs {
    /// Connection block holding only the flags that were given.
    pub fn to_config(&self) -> ConnectionConfig {
        let literal = |value: &Option<String>| value.as_deref().map(EnvValue::from);

        let credentials = (self.registry.is_some()
            || self.username.is_some()
            || self.password.is_some())
        .then(|| CredentialsConfig {
            registry: literal(&self.registry),
            username: literal(&self.username),
            password: literal(&self.password),
            ..Default::default()
        });

        ConnectionConfig {
            host: literal(&self.host),
            config: literal(&self.docker_config).map(DockerConfigValue::Text),
            credentials,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a template dockhand.yml in the current directory
    Init {
        /// Image reference for the template's build task
        #[arg(long)]
        image: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run every task of a task file
    Run {
        /// Task file (defaults to dockhand.yml discovery)
        file: Option<PathBuf>,
    },

    /// Build an image, optionally pushing every tag
    Build {
        /// Inline Dockerfile, path, or storage:// URI
        #[arg(long)]
        dockerfile: String,

        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long = "platform")]
        platforms: Vec<String>,

        #[arg(long = "build-arg", value_parser = parse_key_val)]
        build_args: Vec<(String, String)>,

        #[arg(long = "label", value_parser = parse_key_val)]
        labels: Vec<(String, String)>,

        /// Do not pull newer base images
        #[arg(long)]
        no_pull: bool,

        #[arg(long)]
        push: bool,
    },

    /// Push already-built tags
    Push {
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Pull an image
    Pull { image: String },

    /// Tag an image
    Tag { source: String, target: String },

    /// Tag or remove an image
    Image {
        #[arg(value_enum)]
        command: ImageCommandArg,
        source: String,
        target: Option<String>,

        #[arg(long)]
        force: bool,
    },

    /// Remove containers, then images
    Rm {
        #[arg(long = "container")]
        containers: Vec<String>,

        #[arg(long = "image")]
        images: Vec<String>,

        #[arg(long)]
        force: bool,

        /// Remove the containers' anonymous volumes
        #[arg(long)]
        volumes: bool,
    },

    /// Remove unused objects of one kind
    Prune {
        #[arg(value_enum)]
        kind: PruneKindArg,

        /// Only dangling images
        #[arg(long)]
        dangling: bool,

        #[arg(long)]
        until: Option<String>,

        #[arg(long = "label")]
        labels: Vec<String>,
    },

    /// Stop (or kill) a container and remove it
    Stop {
        container: String,

        #[arg(long)]
        kill: bool,

        /// Keep the container after stopping it
        #[arg(long)]
        keep: bool,
    },

    /// Run docker compose with located compose files
    Compose {
        #[arg(short = 'f', long = "file")]
        files: Vec<String>,

        #[arg(short, long)]
        project_name: Option<String>,

        /// Arguments passed after the file flags
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ImageCommandArg {
    Tag,
    Remove,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PruneKindArg {
    Build,
    Containers,
    Images,
    Networks,
    Volumes,
}

impl From<PruneKindArg> for PruneKind {
    fn from(kind: PruneKindArg) -> Self {
        match kind {
            PruneKindArg::Build => PruneKind::Build,
            PruneKindArg::Containers => PruneKind::Containers,
            PruneKindArg::Images => PruneKind::Images,
            PruneKindArg::Networks => PruneKind::Networks,
            PruneKindArg::Volumes => PruneKind::Volumes,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

fn literal_map(pairs: Vec<(String, String)>) -> HashMap<String, EnvValue> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, EnvValue::Literal(v)))
        .collect()
}

impl Commands {
    /// The task a one-shot command runs; `None` for `init` and `run`.
    pub fn into_task(self) -> Option<Task> {
        let task = match self {
            Commands::Init { .. } | Commands::Run { .. } => return None,
            Commands::Build {
                dockerfile,
                tags,
                platforms,
                build_args,
                labels,
                no_pull,
                push,
            } => Task::Build(BuildTask {
                dockerfile,
                tags,
                platforms,
                build_args: literal_map(build_args),
                labels: literal_map(labels),
                pull: !no_pull,
                push,
            }),
            Commands::Push { tags } => Task::Push(PushTask { tags }),
            Commands::Pull { image } => Task::Pull(PullTask { image }),
            Commands::Tag { source, target } => Task::Tag(TagTask {
                source_image: source,
                target_image: target,
            }),
            Commands::Image {
                command,
                source,
                target,
                force,
            } => Task::Image(ImageTask {
                command: match command {
                    ImageCommandArg::Tag => ImageCommand::Tag,
                    ImageCommandArg::Remove => ImageCommand::Remove,
                },
                source_image: source,
                target_image: target,
                force,
            }),
            Commands::Rm {
                containers,
                images,
                force,
                volumes,
            } => Task::Rm(RmTask {
                container_ids: containers,
                image_ids: images,
                remove_volumes: volumes,
                force,
            }),
            Commands::Prune {
                kind,
                dangling,
                until,
                labels,
            } => Task::Prune(PruneTask {
                prune_type: kind.into(),
                dangling,
                until,
                label_filters: labels,
            }),
            Commands::Stop {
                container,
                kill,
                keep,
            } => Task::Stop(StopTask {
                container_id: container,
                kill,
                delete: !keep,
            }),
            Commands::Compose {
                files,
                project_name,
                args,
            } => Task::Compose(ComposeTask {
                compose_file: None,
                compose_files: files,
                project_name,
                args,
            }),
        };
        Some(task)
    }
}
