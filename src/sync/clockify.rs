//! Time-tracking sync orchestrator.
//!
//! Init → FetchMetadata → ProcessUnits → Finalize. Work units are
//! workspace users, processed strictly sequentially; a failure inside one
//! unit or one record is logged and counted, never fatal to the run.

use std::collections::HashMap;

use chrono::{Duration, Utc};

use crate::clockify::{ClockifyClient, ClockifyProject, ClockifyTimeEntry};
use crate::date_util::{date_only, parse_date, parse_duration_to_hours};
use crate::error::{Error, Result};
use crate::resolve::identity;
use crate::resolve::sprint::{resolve_sprint, SprintCache};
use crate::storage::repository::{self, TimeEntryRecord};
use crate::storage::Database;
use crate::sync::{ClockifyReport, ClockifyStats, SyncOptions, SyncProgress};

pub async fn sync_clockify(
    db: &Database,
    client: &ClockifyClient,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<ClockifyReport> {
    let sync_start = Utc::now();
    log::info!("Starting Clockify sync (last {} days)", options.days_back);

    // Metadata failures are fatal: without the user and project lists
    // there is nothing to process.
    let users = client.users().await?;
    let projects = client.projects().await?;
    log::info!("Found {} users, {} projects", users.len(), projects.len());

    // Project id → client id, resolved once per run.
    let mut project_client_map: HashMap<String, i64> = HashMap::new();
    for project in &projects {
        let name = project.name.clone();
        let resolved = db
            .reader()
            .call(move |conn| identity::resolve_client(conn, &name))
            .await?;
        match resolved {
            Some(client_id) => {
                project_client_map.insert(project.id.clone(), client_id);
            }
            None => log::debug!("Could not map project '{}' to any client", project.name),
        }
    }

    let end = Utc::now();
    let start = end - Duration::days(options.days_back);

    let mut entries_synced: u64 = 0;
    let mut entries_skipped: u64 = 0;
    let mut stats = ClockifyStats::default();
    let mut cache = SprintCache::new();

    for user in &users {
        let Some(email) = user.email.clone().filter(|e| !e.is_empty()) else {
            continue;
        };
        let display_name = user.name.clone().unwrap_or_else(|| email.clone());

        let internal_user_id = db
            .reader()
            .call(move |conn| identity::find_user_by_email(conn, &email))
            .await?;
        let Some(user_id) = internal_user_id else {
            log::info!("Skipping user {display_name} - not in system");
            continue;
        };

        progress.on_user_start(&display_name);

        // Fail-soft inside the fetcher: a bad page ends this user's
        // sequence with whatever was already fetched.
        let entries = client.time_entries(&user.id, start, end).await;
        progress.on_entries_fetched(&display_name, entries.len());

        for entry in entries {
            match process_entry(
                db,
                &mut cache,
                &project_client_map,
                &projects,
                user_id,
                entry,
                &mut stats,
            )
            .await
            {
                Ok(true) => entries_synced += 1,
                Ok(false) => entries_skipped += 1,
                Err(e) => {
                    log::warn!("Error processing time entry: {e}");
                    entries_skipped += 1;
                }
            }
        }
    }

    let report = ClockifyReport {
        entries_synced,
        entries_skipped,
        stats,
    };

    let sync_end = Utc::now();
    db.writer()
        .call(move |conn| {
            repository::insert_sync_log(
                conn,
                "clockify",
                &sync_start.to_rfc3339(),
                &sync_end.to_rfc3339(),
                "success",
                entries_synced,
                None,
            )
        })
        .await?;

    log::info!(
        "Clockify sync complete: {} synced, {} skipped",
        report.entries_synced,
        report.entries_skipped
    );
    Ok(report)
}

/// Normalize, resolve, and upsert one time entry.
///
/// Returns `Ok(false)` for a deliberate skip (zero duration); any other
/// failure is an `Err` the caller logs and counts.
async fn process_entry(
    db: &Database,
    cache: &mut SprintCache,
    project_client_map: &HashMap<String, i64>,
    projects: &[ClockifyProject],
    user_id: i64,
    entry: ClockifyTimeEntry,
    stats: &mut ClockifyStats,
) -> Result<bool> {
    let hours = parse_duration_to_hours(entry.time_interval.duration.as_deref().unwrap_or(""));
    if hours == 0.0 {
        stats.no_hours += 1;
        return Ok(false);
    }

    let entry_date_str = date_only(&entry.time_interval.start).to_string();
    let entry_date = parse_date(&entry_date_str).ok_or_else(|| {
        Error::Other(format!(
            "entry {} has unparseable start '{}'",
            entry.id, entry.time_interval.start
        ))
    })?;

    let project_name = entry
        .project_id
        .as_deref()
        .and_then(|id| projects.iter().find(|p| p.id == id))
        .map(|p| p.name.clone());
    let client_id = entry
        .project_id
        .as_deref()
        .and_then(|id| project_client_map.get(id))
        .copied();

    let mut sprint_id = None;
    let mut tags = Vec::new();

    match client_id {
        Some(client_id) => {
            let resolution = resolve_sprint(db, cache, client_id, entry_date).await?;
            sprint_id = resolution.sprint_id;
            if let Some(tag) = resolution.tag {
                tags.push(tag.as_str().to_string());
                if sprint_id.is_some() {
                    stats.pre_sprint_prep += 1;
                } else {
                    stats.no_sprint += 1;
                }
            }
        }
        None => stats.non_client_work += 1,
    }

    let record = TimeEntryRecord {
        clockify_id: entry.id,
        client_id,
        sprint_id,
        user_id,
        entry_date: entry_date_str,
        hours,
        description: entry.description.unwrap_or_default(),
        task_category: entry.task.map(|t| t.name),
        project_name,
        tags,
    };

    db.writer()
        .call(move |conn| repository::upsert_time_entry(conn, &record))
        .await?;

    Ok(true)
}
