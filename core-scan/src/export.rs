//! Missing-episode report

use chrono::NaiveDate;
use core_library::MediaId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::actions::ActionList;
use crate::error::{Result, ScanError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingReportItem {
    pub show_id: MediaId,
    pub title: String,
    pub season: u32,
    pub episode: u32,
    pub episode_name: String,
    pub description: String,
    pub air_date: Option<NaiveDate>,
    pub expected_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingReport {
    pub items: Vec<MissingReportItem>,
}

impl MissingReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)
            .await
            .map_err(|source| ScanError::ReportIo {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Missing items of `actions`, in list order.
pub fn export_missing(actions: &ActionList) -> MissingReport {
    MissingReport {
        items: actions
            .missing()
            .map(|item| MissingReportItem {
                show_id: item.show_id,
                title: item.show_name.clone(),
                season: item.season,
                episode: item.episode,
                episode_name: item.episode_name.clone(),
                description: item.overview.clone(),
                air_date: item.air_date,
                expected_path: item.expected_path.display().to_string(),
            })
            .collect(),
    }
}
