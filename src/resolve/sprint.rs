//! Assignment of time-entry dates to sprint windows.
//!
//! Work logged before a client's first sprint is still billable to that
//! sprint within a bounded lookback window, but never before the
//! contractual campaign start. Dates that fit no window are classified
//! by a [`Tag`] instead.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::error::Result;
use crate::storage::repository;
use crate::storage::Database;

/// Days before a client's first sprint during which preparation work is
/// still attributed to that sprint.
pub const PRE_SPRINT_LOOKBACK_DAYS: i64 = 14;

/// Classification for a time entry that did not land inside a sprint
/// window exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    PreSprintPrep,
    PostSprintWork,
    GapBetweenSprints,
    NoSprints,
    BeforeCampaign,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::PreSprintPrep => "pre_sprint_prep",
            Tag::PostSprintWork => "post_sprint_work",
            Tag::GapBetweenSprints => "gap_between_sprints",
            Tag::NoSprints => "no_sprints",
            Tag::BeforeCampaign => "before_campaign",
        }
    }
}

/// One sprint's window, inclusive on both ends.
#[derive(Debug, Clone)]
pub struct SprintWindow {
    pub id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A client's sprints ordered by start date, plus its recorded campaign
/// start.
#[derive(Debug, Clone, Default)]
pub struct ClientSprints {
    pub sprints: Vec<SprintWindow>,
    pub campaign_start: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintResolution {
    pub sprint_id: Option<i64>,
    pub tag: Option<Tag>,
}

impl ClientSprints {
    /// Strict decision sequence:
    /// 1. exact containment (first matching sprint wins)
    /// 2. no sprints at all → `no_sprints`
    /// 3. before the first sprint → `pre_sprint_prep` inside the lookback
    ///    window (lower-bounded by the campaign start), else
    ///    `before_campaign`
    /// 4. after the last sprint → `post_sprint_work`
    /// 5. otherwise → `gap_between_sprints`
    pub fn resolve(&self, date: NaiveDate) -> SprintResolution {
        for sprint in &self.sprints {
            if sprint.start <= date && date <= sprint.end {
                return SprintResolution {
                    sprint_id: Some(sprint.id),
                    tag: None,
                };
            }
        }

        let (Some(first), Some(last)) = (self.sprints.first(), self.sprints.last()) else {
            return SprintResolution {
                sprint_id: None,
                tag: Some(Tag::NoSprints),
            };
        };

        if date < first.start {
            let mut lookback_start = first.start - Duration::days(PRE_SPRINT_LOOKBACK_DAYS);
            if let Some(campaign_start) = self.campaign_start {
                if campaign_start > lookback_start {
                    lookback_start = campaign_start;
                }
            }
            if date >= lookback_start {
                return SprintResolution {
                    sprint_id: Some(first.id),
                    tag: Some(Tag::PreSprintPrep),
                };
            }
            return SprintResolution {
                sprint_id: None,
                tag: Some(Tag::BeforeCampaign),
            };
        }

        if date > last.end {
            return SprintResolution {
                sprint_id: None,
                tag: Some(Tag::PostSprintWork),
            };
        }

        SprintResolution {
            sprint_id: None,
            tag: Some(Tag::GapBetweenSprints),
        }
    }
}

/// Per-run cache of each client's sprint list. Owned by a single sync
/// invocation and discarded at run end; never shared across runs.
#[derive(Debug, Default)]
pub struct SprintCache {
    by_client: HashMap<i64, ClientSprints>,
}

impl SprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, client_id: i64) -> bool {
        self.by_client.contains_key(&client_id)
    }

    pub fn insert(&mut self, client_id: i64, sprints: ClientSprints) {
        self.by_client.insert(client_id, sprints);
    }

    pub fn get(&self, client_id: i64) -> Option<&ClientSprints> {
        self.by_client.get(&client_id)
    }
}

/// Resolve `(client, date)` against the cache, loading the client's
/// sprint list from the database on first sight.
pub async fn resolve_sprint(
    db: &Database,
    cache: &mut SprintCache,
    client_id: i64,
    date: NaiveDate,
) -> Result<SprintResolution> {
    if !cache.contains(client_id) {
        let loaded = db
            .reader()
            .call(move |conn| repository::load_client_sprints(conn, client_id))
            .await?;
        cache.insert(client_id, loaded);
    }

    let resolution = match cache.get(client_id) {
        Some(client) => client.resolve(date),
        None => SprintResolution {
            sprint_id: None,
            tag: Some(Tag::NoSprints),
        },
    };
    Ok(resolution)
}
