use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub label: Option<Uuid>,
    /// Epoch milliseconds.
    pub due_date: Option<i64>,
    pub parent_task: Option<Uuid>,
    pub is_sub_task: bool,
    pub assignee: Option<Uuid>,
    pub project_id: Uuid,
    pub team_id: Uuid,
}

impl Record for Task {
    const TABLE: Table = Table::Tasks;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub name: String,
    pub color: String,
    pub project_id: Uuid,
    pub team_id: Uuid,
}

impl Record for Label {
    const TABLE: Table = Table::Labels;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub label: Option<Uuid>,
    pub team_id: Uuid,
}

impl Record for Template {
    const TABLE: Table = Table::Templates;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_kebab_case() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), "in-progress");
        assert_eq!(serde_json::from_str::<Priority>("\"urgent\"").unwrap(), Priority::Urgent);
    }
}
