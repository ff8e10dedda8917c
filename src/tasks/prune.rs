// ABOUTME: The prune task: removes unused objects of one kind.
// ABOUTME: Dangling applies to images only; until to containers and images.

use super::TaskOutput;
use crate::config::one_or_many;
use crate::engine::{Connector, PruneFilters, PruneKind, PruneOps};
use crate::error::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PruneTask {
    pub prune_type: PruneKind,

    #[serde(default)]
    pub dangling: bool,

    #[serde(default)]
    pub until: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub label_filters: Vec<String>,
}

impl PruneTask {
    pub fn filters(&self) -> PruneFilters {
        PruneFilters {
            dangling: self.dangling,
            until: self.until.clone().filter(|u| !u.trim().is_empty()),
            labels: self.label_filters.clone(),
        }
    }

    pub async fn run<C: Connector>(&self, connector: &C) -> Result<TaskOutput> {
        let session = connector.open(None)?;
        let report = session
            .engine()
            .prune(self.prune_type, &self.filters())
            .await?;

        tracing::info!(
            kind = %self.prune_type,
            deleted = report.deleted.len(),
            reclaimed = report.space_reclaimed,
            "pruned"
        );
        Ok(TaskOutput::Prune(report))
    }
}
