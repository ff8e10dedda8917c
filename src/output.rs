// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes for task results.

use crate::tasks::{ImageCommand, TaskOutput};
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => match self.duration() {
                Some(elapsed) => println!("{message} ({elapsed:.1}s)"),
                None => println!("{message}"),
            },
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => emit(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print the result of one task.
    ///
    /// Quiet mode prints only the essential value (the image id for builds);
    /// JSON mode prints the whole output as one line.
    pub fn task_result(&self, label: &str, output: &TaskOutput) {
        match self.mode {
            OutputMode::Normal => println!("✓ {label}: {}", summarize(output)),
            OutputMode::Quiet => {
                if let Some(value) = essential(output) {
                    println!("{value}");
                }
            }
            OutputMode::Json => emit(&JsonTaskEvent {
                event: "task",
                task: label,
                output,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}

/// One-line human description of a task result.
pub fn summarize(output: &TaskOutput) -> String {
    match output {
        TaskOutput::Build(result) => match &result.push {
            Some(push) => format!(
                "built {} and pushed {} tag(s), {} bytes",
                result.image_id.short(),
                push.pushed.len(),
                push.bytes
            ),
            None => format!("built {}", result.image_id.short()),
        },
        TaskOutput::Push(report) => {
            format!("pushed {} ({} bytes)", report.pushed.join(", "), report.bytes)
        }
        TaskOutput::Pull { image } => format!("pulled {image}"),
        TaskOutput::Tag { source, target } => format!("tagged {source} as {target}"),
        TaskOutput::Image {
            command: ImageCommand::Tag,
            source,
        } => format!("tagged image {source}"),
        TaskOutput::Image {
            command: ImageCommand::Remove,
            source,
        } => format!("removed image {source}"),
        TaskOutput::Rm { containers, images } => format!(
            "removed {} container(s), {} image(s)",
            containers.len(),
            images.len()
        ),
        TaskOutput::Prune(report) => format!(
            "pruned {} object(s), reclaimed {} bytes",
            report.deleted.len(),
            report.space_reclaimed
        ),
        TaskOutput::Stop {
            container,
            killed,
            deleted,
        } => {
            let verb = if *killed { "killed" } else { "stopped" };
            if *deleted {
                format!("{verb} and removed {container}")
            } else {
                format!("{verb} {container}")
            }
        }
        TaskOutput::Compose { exit_code } => format!("docker compose exited with {exit_code}"),
    }
}

fn essential(output: &TaskOutput) -> Option<String> {
    match output {
        TaskOutput::Build(result) => Some(result.image_id.to_string()),
        TaskOutput::Push(report) => Some(report.pushed.join("\n")),
        TaskOutput::Pull { image } => Some(image.clone()),
        TaskOutput::Tag { target, .. } => Some(target.clone()),
        _ => None,
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonTaskEvent<'a> {
    event: &'a str,
    task: &'a str,
    output: &'a TaskOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_summary_mentions_removal() {
        let output = TaskOutput::Stop {
            container: "web".to_string(),
            killed: true,
            deleted: true,
        };
        assert_eq!(summarize(&output), "killed and removed web");
    }

    #[test]
    fn quiet_prints_nothing_for_prune() {
        let output = TaskOutput::Prune(Default::default());
        assert_eq!(essential(&output), None);
    }
}
