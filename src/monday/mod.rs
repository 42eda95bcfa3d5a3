//! Monday.com GraphQL API client.
//!
//! Two-phase board fetch: board + group metadata once, then one
//! cursor-paginated items query per group. Items carry typed column
//! values and nested subitems (sprints).

pub mod columns;

use serde::Deserialize;

pub use columns::{extract_sprint_number, ColumnValue, Columns};

use crate::error::{Error, Result};

const DEFAULT_API_URL: &str = "https://api.monday.com/v2";

/// Items per page for group item queries.
const ITEMS_PAGE_SIZE: u32 = 100;
/// Hard ceiling on item pages per group.
const ITEMS_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct MondayGroup {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MondayBoard {
    pub name: String,
    pub groups: Vec<MondayGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MondaySubitem {
    pub id: String,
    pub name: String,
    pub column_values: Vec<ColumnValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MondayItem {
    pub id: String,
    pub name: String,
    pub column_values: Vec<ColumnValue>,
    #[serde(default)]
    pub subitems: Vec<MondaySubitem>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct GraphQlResponse<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct BoardsData<T> {
    boards: Vec<T>,
}

#[derive(Deserialize)]
struct GroupsEnvelope {
    groups: Vec<ItemsGroup>,
}

#[derive(Deserialize)]
struct ItemsGroup {
    items_page: ItemsPage,
}

#[derive(Deserialize)]
struct ItemsPage {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    items: Vec<MondayItem>,
}

/// Outcome of fetching one page of group items.
enum PageOutcome {
    /// Items plus the cursor for the next page, if the server issued one.
    Page(Vec<MondayItem>, Option<String>),
    Failed(String),
}

pub struct MondayClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl MondayClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, query: &str) -> Result<T> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::api(
                "Monday",
                format!("query returned {}", response.status()),
            ));
        }

        let body: GraphQlResponse<T> = response.json().await?;
        if !body.errors.is_empty() {
            return Err(Error::api(
                "Monday",
                format!("GraphQL errors: {}", serde_json::Value::from(body.errors)),
            ));
        }
        body.data
            .ok_or_else(|| Error::api("Monday", "response carried no data"))
    }

    /// Board name and group list. Failure here is fatal for the board.
    pub async fn board_metadata(&self, board_id: &str) -> Result<MondayBoard> {
        let query = format!(
            "{{ boards(ids: [{board_id}]) {{ name groups {{ id title }} }} }}"
        );
        let data: BoardsData<MondayBoard> = self.query(&query).await?;
        data.boards
            .into_iter()
            .next()
            .ok_or_else(|| Error::api("Monday", format!("board {board_id} not found")))
    }

    /// All items in one group, following server-issued cursors until the
    /// server stops issuing one, an empty page arrives, or the page
    /// ceiling is hit.
    ///
    /// Fail-soft: a failed page logs a warning and returns the items
    /// accumulated so far, so the caller can move on to the next group.
    pub async fn group_items(&self, board_id: &str, group_id: &str) -> Vec<MondayItem> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages: u32 = 0;

        loop {
            match self.items_page(board_id, group_id, cursor.as_deref()).await {
                PageOutcome::Page(items, next_cursor) => {
                    if items.is_empty() {
                        break;
                    }
                    all.extend(items);
                    match next_cursor {
                        Some(c) => cursor = Some(c),
                        None => break,
                    }
                    pages += 1;
                    if pages >= ITEMS_PAGE_LIMIT {
                        log::warn!("Reached page limit for group {group_id}");
                        break;
                    }
                }
                PageOutcome::Failed(message) => {
                    log::warn!("Failed to fetch items for group {group_id}: {message}");
                    break;
                }
            }
        }

        all
    }

    async fn items_page(
        &self,
        board_id: &str,
        group_id: &str,
        cursor: Option<&str>,
    ) -> PageOutcome {
        let cursor_param = match cursor {
            Some(c) => format!(", cursor: \"{c}\""),
            None => String::new(),
        };
        let query = format!(
            "{{ boards(ids: [{board_id}]) {{ groups(ids: [\"{group_id}\"]) {{ \
             items_page(limit: {ITEMS_PAGE_SIZE}{cursor_param}) {{ cursor items {{ \
             id name \
             column_values {{ id column {{ title }} value text }} \
             subitems {{ id name column_values {{ id column {{ title }} value text }} }} \
             }} }} }} }} }}"
        );

        let data: Result<BoardsData<GroupsEnvelope>> = self.query(&query).await;
        match data {
            Ok(data) => {
                let page = data
                    .boards
                    .into_iter()
                    .next()
                    .and_then(|b| b.groups.into_iter().next())
                    .map(|g| g.items_page);
                match page {
                    Some(page) => PageOutcome::Page(page.items, page.cursor),
                    None => PageOutcome::Page(Vec::new(), None),
                }
            }
            Err(e) => PageOutcome::Failed(e.to_string()),
        }
    }
}
