// ABOUTME: Runs every task of a task file in order, each against its own Engine connection.
// ABOUTME: Stops at the first failing task and names it in the returned error.

use crate::config::{ConnectionConfig, TaskEntry, TaskFile};
use crate::engine::{Connector, DockerConnector};
use crate::error::{Error, Result};
use crate::pipeline::Workspace;
use crate::tasks::TaskOutput;

/// Connector for a resolved `connection:` block.
pub fn docker_connector(connection: &ConnectionConfig) -> Result<DockerConnector> {
    Ok(DockerConnector::new(connection.resolve()?))
}

/// Run the tasks of `file` sequentially.
///
/// `connector_for` receives the file-level connection with the task's
/// override applied; `on_output` is called after each successful task.
pub async fn run_task_file<C, F, R>(
    file: &TaskFile,
    workspace: &Workspace<'_>,
    connector_for: F,
    mut on_output: R,
) -> Result<Vec<TaskOutput>>
where
    C: Connector,
    F: Fn(&ConnectionConfig) -> Result<C>,
    R: FnMut(&TaskEntry, &TaskOutput),
{
    let mut outputs = Vec::with_capacity(file.tasks.len());

    for (index, entry) in file.tasks.iter().enumerate() {
        let label = entry.label();
        tracing::info!(index, task = label, kind = entry.task.kind(), "starting task");

        let result = match connector_for(&file.connection_for(entry)) {
            Ok(connector) => entry.task.run(workspace, &connector).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => {
                tracing::info!(task = label, "task finished");
                on_output(entry, &output);
                outputs.push(output);
            }
            Err(source) => {
                return Err(Error::Task {
                    task: label.to_string(),
                    source: Box::new(source),
                });
            }
        }
    }

    Ok(outputs)
}
