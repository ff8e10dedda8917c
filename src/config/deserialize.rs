// ABOUTME: Custom serde deserializers for task-file types.
// ABOUTME: Handles one-or-many string lists and the non-empty task list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::TaskEntry;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accept either `key: value` or `key: [a, b]`.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

pub fn deserialize_tasks<'de, D>(deserializer: D) -> Result<NonEmpty<TaskEntry>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tasks: Vec<TaskEntry> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(tasks).ok_or_else(|| serde::de::Error::custom("at least one task is required"))
}
