//! Project-management board sync orchestrator.
//!
//! One pass per configured region board: board + group metadata once,
//! then items (clients) and their subitems (sprints) per group. Failures
//! are isolated per board, per item, and per subitem.

use chrono::Utc;

use crate::monday::{extract_sprint_number, Columns, MondayClient, MondayItem, MondaySubitem};
use crate::resolve::identity;
use crate::storage::repository::{self, ClientRecord, SprintRecord};
use crate::storage::Database;
use crate::sync::{MondayReport, SyncProgress};

/// Group titles containing any of these mark their clients inactive.
const INACTIVE_KEYWORDS: &[&str] = &[
    "finished",
    "refunded",
    "cancelled",
    "canceled",
    "completed",
    "archived",
    "inactive",
    "paused",
];

/// Monthly hours are derived from the monthly rate at the standard
/// blended rate of $190/hour.
const HOURLY_RATE: f64 = 190.0;

pub async fn sync_monday(
    db: &Database,
    client: &MondayClient,
    boards: &[(&'static str, Option<&str>)],
    progress: &dyn SyncProgress,
) -> Result<MondayReport, crate::error::Error> {
    let sync_start = Utc::now();
    log::info!("Starting Monday.com sync");

    let mut report = MondayReport::default();

    for (region, board_id) in boards {
        let Some(board_id) = board_id else {
            log::info!("Skipping {region} board - no board id configured");
            continue;
        };

        match sync_board(db, client, region, board_id, progress).await {
            Ok((clients, sprints)) => {
                log::info!("{region} board complete: {clients} clients, {sprints} sprints");
                report.clients_synced += clients;
                report.sprints_synced += sprints;
            }
            Err(e) => {
                log::error!("Error syncing {region} board: {e}");
            }
        }
    }

    let records = report.clients_synced + report.sprints_synced;
    let sync_end = Utc::now();
    db.writer()
        .call(move |conn| {
            repository::insert_sync_log(
                conn,
                "monday",
                &sync_start.to_rfc3339(),
                &sync_end.to_rfc3339(),
                "success",
                records,
                None,
            )
        })
        .await?;

    log::info!(
        "Monday sync complete: {} clients, {} sprints",
        report.clients_synced,
        report.sprints_synced
    );
    Ok(report)
}

async fn sync_board(
    db: &Database,
    client: &MondayClient,
    region: &str,
    board_id: &str,
    progress: &dyn SyncProgress,
) -> Result<(u64, u64), crate::error::Error> {
    let board = client.board_metadata(board_id).await?;
    progress.on_board_start(region, &board.name);

    let mut clients_synced: u64 = 0;
    let mut sprints_synced: u64 = 0;

    for group in &board.groups {
        // Fail-soft inside the fetcher: a bad page yields the items
        // accumulated so far and we continue with the next group.
        let items = client.group_items(board_id, &group.id).await;
        progress.on_group_start(&group.title, items.len());

        for item in &items {
            match sync_client_item(db, item, &group.title, region).await {
                Ok(client_id) => {
                    clients_synced += 1;
                    for subitem in &item.subitems {
                        match sync_sprint_subitem(db, subitem, client_id).await {
                            Ok(true) => sprints_synced += 1,
                            Ok(false) => {} // missing dates, skipped
                            Err(e) => {
                                log::error!("Error syncing sprint {}: {e}", subitem.name);
                            }
                        }
                    }
                }
                Err(e) => {
                    log::error!("Error syncing client {}: {e}", item.name);
                }
            }
        }
    }

    Ok((clients_synced, sprints_synced))
}

/// Column fields of a client item before identity resolution.
#[derive(Debug, Clone)]
struct ParsedClient {
    lead_person_id: Option<i64>,
    support_person_ids: Vec<i64>,
    seo_lead_name: Option<String>,
    niche: Option<String>,
    agency_value: Option<f64>,
    client_priority: Option<String>,
    campaign_type: Option<String>,
    campaign_start_date: Option<String>,
    monthly_rate: Option<f64>,
    report_status: Option<String>,
    last_report_date: Option<String>,
    last_invoice_date: Option<String>,
    is_active: bool,
}

fn parse_client_columns(item: &MondayItem, group_title: &str) -> ParsedClient {
    let columns = Columns::new(&item.column_values);

    let group_lower = group_title.to_lowercase();
    let is_active = !INACTIVE_KEYWORDS
        .iter()
        .any(|keyword| group_lower.contains(keyword));

    ParsedClient {
        lead_person_id: columns.person("DPR Lead"),
        support_person_ids: columns.people("DPR Support"),
        seo_lead_name: columns.text("SEO Lead").map(String::from),
        niche: columns.text("Niches").map(String::from),
        agency_value: columns.numeric("Agency Value"),
        client_priority: columns.text("Client Priority").map(String::from),
        campaign_type: columns.text("Campaign Type").map(String::from),
        campaign_start_date: columns
            .date("Campaign Start Date")
            .map(|d| d.format("%Y-%m-%d").to_string()),
        monthly_rate: columns.numeric("Monthly Rate"),
        report_status: columns.text("Report Status").map(String::from),
        last_report_date: columns
            .date("Last Report Date")
            .map(|d| d.format("%Y-%m-%d").to_string()),
        last_invoice_date: columns
            .date("Last Invoice Date")
            .map(|d| d.format("%Y-%m-%d").to_string()),
        is_active,
    }
}

async fn sync_client_item(
    db: &Database,
    item: &MondayItem,
    group_title: &str,
    region: &str,
) -> Result<i64, crate::error::Error> {
    let monday_item_id: i64 = item
        .id
        .parse()
        .map_err(|_| crate::error::Error::Other(format!("item id '{}' is not numeric", item.id)))?;

    let parsed = parse_client_columns(item, group_title);

    // Board person references → internal user ids. Unknown persons are
    // simply dropped; the mapping table is a read-only input.
    let lead_user_id = match parsed.lead_person_id {
        Some(person_id) => {
            db.reader()
                .call(move |conn| identity::find_user_by_person_id(conn, person_id))
                .await?
        }
        None => None,
    };
    let mut support_user_ids = Vec::new();
    for person_id in parsed.support_person_ids {
        let user_id = db
            .reader()
            .call(move |conn| identity::find_user_by_person_id(conn, person_id))
            .await?;
        if let Some(user_id) = user_id {
            support_user_ids.push(user_id);
        }
    }

    let record = ClientRecord {
        monday_item_id,
        name: item.name.clone(),
        region: region.to_string(),
        lead_user_id,
        support_user_ids: if support_user_ids.is_empty() {
            None
        } else {
            serde_json::to_string(&support_user_ids).ok()
        },
        seo_lead_name: parsed.seo_lead_name,
        niche: parsed.niche,
        agency_value: parsed.agency_value,
        client_priority: parsed.client_priority,
        campaign_type: parsed.campaign_type,
        campaign_start_date: parsed.campaign_start_date,
        monthly_rate: parsed.monthly_rate,
        monthly_hours: parsed.monthly_rate.map(|rate| rate / HOURLY_RATE),
        report_status: parsed.report_status,
        last_report_date: parsed.last_report_date,
        last_invoice_date: parsed.last_invoice_date,
        is_active: parsed.is_active,
        group_name: group_title.to_string(),
    };

    let client_id = db
        .writer()
        .call(move |conn| repository::upsert_client(conn, &record))
        .await?;
    Ok(client_id)
}

/// Upsert one sprint subitem. Returns `Ok(false)` when the subitem has no
/// usable date window and is skipped.
async fn sync_sprint_subitem(
    db: &Database,
    subitem: &MondaySubitem,
    client_id: i64,
) -> Result<bool, crate::error::Error> {
    let columns = Columns::new(&subitem.column_values);

    let (Some(start_date), Some(end_date)) =
        (columns.date("Start Date"), columns.date("End Date"))
    else {
        log::info!("Skipping sprint {} - missing dates", subitem.name);
        return Ok(false);
    };

    let monday_subitem_id: i64 = subitem.id.parse().map_err(|_| {
        crate::error::Error::Other(format!("subitem id '{}' is not numeric", subitem.id))
    })?;

    let sprint_label = columns.text("Sprint").map(String::from);
    let sprint_number = sprint_label.as_deref().and_then(extract_sprint_number);

    let record = SprintRecord {
        monday_subitem_id,
        client_id,
        name: subitem.name.clone(),
        sprint_number,
        sprint_label,
        start_date: start_date.format("%Y-%m-%d").to_string(),
        end_date: end_date.format("%Y-%m-%d").to_string(),
        kpi_target: columns
            .numeric("Link KPI Per Quarter")
            .map(|v| v.floor() as i64)
            .unwrap_or(0),
        kpi_achieved: columns
            .numeric("Links Achieved Per Quarter")
            .map(|v| v.floor() as i64)
            .unwrap_or(0),
        monthly_rate: columns.numeric("Monthly Rate (AUD)"),
    };

    db.writer()
        .call(move |conn| repository::upsert_sprint(conn, &record))
        .await?;
    Ok(true)
}
