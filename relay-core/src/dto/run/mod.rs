//! Run DTOs

use serde::{Deserialize, Serialize};

use crate::domain::run::{RunHandle, RunStatus, RunStatusReport};

/// Answer to a run submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCreated {
    pub id: String,
    #[serde(alias = "actId")]
    pub owner_job_id: String,
}

impl From<RunCreated> for RunHandle {
    fn from(created: RunCreated) -> Self {
        RunHandle {
            run_id: created.id,
            owner_job_id: created.owner_job_id,
        }
    }
}

/// Run record returned by the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    pub status: String,
    #[serde(default)]
    pub default_dataset_id: Option<String>,
}

impl From<RunDetails> for RunStatusReport {
    fn from(details: RunDetails) -> Self {
        RunStatusReport {
            status: RunStatus::from_remote(&details.status),
            default_dataset_id: details.default_dataset_id,
        }
    }
}
