//! Job DTOs

use serde::{Deserialize, Serialize};

use crate::domain::job::JobDefinition;

/// Page of job definitions returned by the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub items: Vec<JobListItem>,
}

/// A job as listed by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl From<JobListItem> for JobDefinition {
    fn from(item: JobListItem) -> Self {
        let display_name = item
            .name
            .filter(|n| !n.is_empty())
            .or(item.title.filter(|t| !t.is_empty()));
        JobDefinition::new(item.id, display_name)
    }
}
