// ABOUTME: Library root for dockhand - image build/push pipelines and one-shot Engine tasks.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod engine;
pub mod error;
pub mod locator;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod sink;
pub mod tasks;
pub mod types;
