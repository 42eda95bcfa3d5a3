//! Clockify REST API client.
//!
//! Fetches workspace users, active projects, and per-user time entries
//! over a date window. Pagination termination is modeled explicitly with
//! [`PageOutcome`] so the loop's exit conditions stay enumerable.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.clockify.me/api/v1";

/// Page size for per-user time entry requests (API maximum).
const ENTRIES_PAGE_SIZE: u32 = 1000;
/// Hard ceiling on time-entry pages per user, guarding against runaway
/// pagination.
const ENTRIES_PAGE_LIMIT: u32 = 100;
/// Page size for project listing.
const PROJECTS_PAGE_SIZE: u32 = 500;
const PROJECTS_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct ClockifyUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockifyProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockifyTask {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockifyTimeEntry {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub task: Option<ClockifyTask>,
    pub time_interval: TimeInterval,
}

/// Outcome of fetching one page of time entries.
#[derive(Debug)]
enum PageOutcome {
    /// A non-empty page; keep going.
    Page(Vec<ClockifyTimeEntry>),
    /// Empty page: the sequence is exhausted.
    End,
    /// The request failed; the caller keeps what it has so far.
    Failed(String),
}

pub struct ClockifyClient {
    http: reqwest::Client,
    api_key: String,
    workspace_id: String,
    base_url: String,
}

impl ClockifyClient {
    pub fn new(api_key: &str, workspace_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            workspace_id: workspace_id.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::api(
                "Clockify",
                format!("{} returned {}", path, response.status()),
            ));
        }
        Ok(response.json().await?)
    }

    /// All users in the workspace. Failure here is fatal: without the
    /// user list there are no work units to process.
    pub async fn users(&self) -> Result<Vec<ClockifyUser>> {
        let path = format!("/workspaces/{}/users", self.workspace_id);
        self.get_json(&path, &[]).await
    }

    /// All active (non-archived) projects in the workspace, paged.
    pub async fn projects(&self) -> Result<Vec<ClockifyProject>> {
        let path = format!("/workspaces/{}/projects", self.workspace_id);
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("page", page.to_string()),
                ("page-size", PROJECTS_PAGE_SIZE.to_string()),
                ("archived", "false".to_string()),
            ];
            let projects: Vec<ClockifyProject> = self.get_json(&path, &query).await?;
            if projects.is_empty() {
                break;
            }
            let short_page = projects.len() < PROJECTS_PAGE_SIZE as usize;
            all.extend(projects);
            if short_page {
                break;
            }
            page += 1;
            if page > PROJECTS_PAGE_LIMIT {
                log::warn!("Reached page limit fetching Clockify projects");
                break;
            }
        }

        Ok(all)
    }

    /// Time entries for one user over `[start, end]`, fully hydrated.
    ///
    /// Fail-soft: a non-success page terminates this user's sequence with
    /// a warning, keeping the entries already fetched. One failing user
    /// must never abort the whole run.
    pub async fn time_entries(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ClockifyTimeEntry> {
        // Second-precision instants, the format the API expects.
        let start_str = start.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let end_str = end.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            match self
                .entries_page(user_id, &start_str, &end_str, page)
                .await
            {
                PageOutcome::Page(entries) => {
                    all.extend(entries);
                    page += 1;
                    if page > ENTRIES_PAGE_LIMIT {
                        log::warn!("Reached page limit for user {user_id}");
                        break;
                    }
                }
                PageOutcome::End => break,
                PageOutcome::Failed(message) => {
                    log::warn!(
                        "Error fetching time entries for user {user_id} page {page}: {message}"
                    );
                    break;
                }
            }
        }

        all
    }

    async fn entries_page(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
        page: u32,
    ) -> PageOutcome {
        let path = format!(
            "/workspaces/{}/user/{user_id}/time-entries",
            self.workspace_id
        );
        let query = [
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("page", page.to_string()),
            ("page-size", ENTRIES_PAGE_SIZE.to_string()),
            ("hydrated", "true".to_string()),
        ];

        match self.get_json::<Vec<ClockifyTimeEntry>>(&path, &query).await {
            Ok(entries) if entries.is_empty() => PageOutcome::End,
            Ok(entries) => PageOutcome::Page(entries),
            Err(e) => PageOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_entry_deserializes() {
        let json = r#"{
            "id": "entry1",
            "projectId": "proj1",
            "description": "Outreach emails",
            "task": {"name": "Link Building"},
            "timeInterval": {
                "start": "2025-03-03T09:00:00Z",
                "end": "2025-03-03T11:30:00Z",
                "duration": "PT2H30M"
            }
        }"#;
        let entry: ClockifyTimeEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, "entry1");
        assert_eq!(entry.project_id.as_deref(), Some("proj1"));
        assert_eq!(entry.task.as_ref().unwrap().name, "Link Building");
        assert_eq!(entry.time_interval.duration.as_deref(), Some("PT2H30M"));
    }

    #[test]
    fn test_time_entry_minimal_fields() {
        // Entries without a project or task are still valid (non-client work).
        let json = r#"{
            "id": "entry2",
            "timeInterval": {"start": "2025-03-04T10:00:00Z"}
        }"#;
        let entry: ClockifyTimeEntry = serde_json::from_str(json).unwrap();
        assert!(entry.project_id.is_none());
        assert!(entry.task.is_none());
        assert!(entry.time_interval.duration.is_none());
    }
}
