use rusqlite::{params, Connection, OptionalExtension};

use crate::date_util::parse_date;
use crate::resolve::sprint::{ClientSprints, SprintWindow};

// ── Identity-mapping lookups (read-only inputs) ────────────────────

pub fn find_user_id_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT id FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )
    .optional()
}

pub fn find_user_id_by_person_id(
    conn: &Connection,
    person_id: i64,
) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT id FROM users WHERE monday_person_id = ?1",
        params![person_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn get_project_override(
    conn: &Connection,
    project_name: &str,
) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT client_name FROM project_overrides WHERE project_name = ?1",
        params![project_name],
        |row| row.get(0),
    )
    .optional()
}

// ── Clients ────────────────────────────────────────────────────────

/// Case-insensitive exact match on the client name.
pub fn find_client_id_by_name(
    conn: &Connection,
    name: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row(
        "SELECT id FROM clients WHERE name = ?1 COLLATE NOCASE",
        params![name],
        |row| row.get(0),
    )
    .optional()
}

/// All clients as `(id, name)` pairs for the fuzzy-match scan.
pub fn list_clients(conn: &Connection) -> Result<Vec<(i64, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT id, name FROM clients")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

/// A client row as produced by the board sync. `None` fields were absent
/// from the board and must not clobber previously stored values.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub monday_item_id: i64,
    pub name: String,
    pub region: String,
    pub lead_user_id: Option<i64>,
    pub support_user_ids: Option<String>, // JSON array of user ids
    pub seo_lead_name: Option<String>,
    pub niche: Option<String>,
    pub agency_value: Option<f64>,
    pub client_priority: Option<String>,
    pub campaign_type: Option<String>,
    pub campaign_start_date: Option<String>,
    pub monthly_rate: Option<f64>,
    pub monthly_hours: Option<f64>,
    pub report_status: Option<String>,
    pub last_report_date: Option<String>,
    pub last_invoice_date: Option<String>,
    pub is_active: bool,
    pub group_name: String,
}

/// Upsert a client keyed by its board item id, returning the internal id.
///
/// Partial-field semantics: nullable columns only overwrite when the new
/// sync carried a value, so a later sync missing a column's source data
/// never clobbers a stored value to NULL.
pub fn upsert_client(conn: &Connection, client: &ClientRecord) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO clients (
            monday_item_id, name, region, lead_user_id, support_user_ids,
            seo_lead_name, niche, agency_value, client_priority, campaign_type,
            campaign_start_date, monthly_rate, monthly_hours, report_status,
            last_report_date, last_invoice_date, is_active, group_name, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, datetime('now'))
        ON CONFLICT(monday_item_id) DO UPDATE SET
            name=excluded.name, region=excluded.region,
            lead_user_id=COALESCE(excluded.lead_user_id, clients.lead_user_id),
            support_user_ids=COALESCE(excluded.support_user_ids, clients.support_user_ids),
            seo_lead_name=COALESCE(excluded.seo_lead_name, clients.seo_lead_name),
            niche=COALESCE(excluded.niche, clients.niche),
            agency_value=COALESCE(excluded.agency_value, clients.agency_value),
            client_priority=COALESCE(excluded.client_priority, clients.client_priority),
            campaign_type=COALESCE(excluded.campaign_type, clients.campaign_type),
            campaign_start_date=COALESCE(excluded.campaign_start_date, clients.campaign_start_date),
            monthly_rate=COALESCE(excluded.monthly_rate, clients.monthly_rate),
            monthly_hours=COALESCE(excluded.monthly_hours, clients.monthly_hours),
            report_status=COALESCE(excluded.report_status, clients.report_status),
            last_report_date=COALESCE(excluded.last_report_date, clients.last_report_date),
            last_invoice_date=COALESCE(excluded.last_invoice_date, clients.last_invoice_date),
            is_active=excluded.is_active, group_name=excluded.group_name,
            updated_at=excluded.updated_at",
        params![
            client.monday_item_id,
            client.name,
            client.region,
            client.lead_user_id,
            client.support_user_ids,
            client.seo_lead_name,
            client.niche,
            client.agency_value,
            client.client_priority,
            client.campaign_type,
            client.campaign_start_date,
            client.monthly_rate,
            client.monthly_hours,
            client.report_status,
            client.last_report_date,
            client.last_invoice_date,
            client.is_active as i32,
            client.group_name,
        ],
    )?;

    conn.query_row(
        "SELECT id FROM clients WHERE monday_item_id = ?1",
        params![client.monday_item_id],
        |row| row.get(0),
    )
}

// ── Sprints ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SprintRecord {
    pub monday_subitem_id: i64,
    pub client_id: i64,
    pub name: String,
    pub sprint_number: Option<i64>,
    pub sprint_label: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub kpi_target: i64,
    pub kpi_achieved: i64,
    pub monthly_rate: Option<f64>,
}

pub fn upsert_sprint(conn: &Connection, sprint: &SprintRecord) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sprints (
            monday_subitem_id, client_id, name, sprint_number, sprint_label,
            start_date, end_date, kpi_target, kpi_achieved, monthly_rate, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now'))
        ON CONFLICT(monday_subitem_id) DO UPDATE SET
            client_id=excluded.client_id, name=excluded.name,
            sprint_number=COALESCE(excluded.sprint_number, sprints.sprint_number),
            sprint_label=COALESCE(excluded.sprint_label, sprints.sprint_label),
            start_date=excluded.start_date, end_date=excluded.end_date,
            kpi_target=excluded.kpi_target, kpi_achieved=excluded.kpi_achieved,
            monthly_rate=COALESCE(excluded.monthly_rate, sprints.monthly_rate),
            updated_at=excluded.updated_at",
        params![
            sprint.monday_subitem_id,
            sprint.client_id,
            sprint.name,
            sprint.sprint_number,
            sprint.sprint_label,
            sprint.start_date,
            sprint.end_date,
            sprint.kpi_target,
            sprint.kpi_achieved,
            sprint.monthly_rate,
        ],
    )?;
    Ok(())
}

/// A client's sprint windows ordered by start date, plus its campaign
/// start date. Rows with unparseable dates are skipped rather than
/// failing the load.
pub fn load_client_sprints(
    conn: &Connection,
    client_id: i64,
) -> Result<ClientSprints, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, start_date, end_date FROM sprints
         WHERE client_id = ?1 ORDER BY start_date",
    )?;
    let rows = stmt.query_map(params![client_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut sprints = Vec::new();
    for row in rows {
        let (id, start, end) = row?;
        if let (Some(start), Some(end)) = (parse_date(&start), parse_date(&end)) {
            sprints.push(SprintWindow { id, start, end });
        } else {
            log::warn!("Sprint {id} has unparseable dates, skipping");
        }
    }

    let campaign_start: Option<String> = conn
        .query_row(
            "SELECT campaign_start_date FROM clients WHERE id = ?1",
            params![client_id],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    Ok(ClientSprints {
        sprints,
        campaign_start: campaign_start.as_deref().and_then(parse_date),
    })
}

// ── Time entries ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TimeEntryRecord {
    pub clockify_id: String,
    pub client_id: Option<i64>,
    pub sprint_id: Option<i64>,
    pub user_id: i64,
    pub entry_date: String,
    pub hours: f64,
    pub description: String,
    pub task_category: Option<String>,
    pub project_name: Option<String>,
    pub tags: Vec<String>,
}

/// Upsert a time entry keyed by its external id. Unlike the board upserts
/// this writes the full field set: an empty tags array is a meaningful
/// value, not "absent".
pub fn upsert_time_entry(
    conn: &Connection,
    entry: &TimeEntryRecord,
) -> Result<(), rusqlite::Error> {
    let tags_json =
        serde_json::to_string(&entry.tags).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO time_entries (
            clockify_id, client_id, sprint_id, user_id, entry_date,
            hours, description, task_category, project_name, tags, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, datetime('now'))
        ON CONFLICT(clockify_id) DO UPDATE SET
            client_id=excluded.client_id, sprint_id=excluded.sprint_id,
            user_id=excluded.user_id, entry_date=excluded.entry_date,
            hours=excluded.hours, description=excluded.description,
            task_category=excluded.task_category, project_name=excluded.project_name,
            tags=excluded.tags, updated_at=excluded.updated_at",
        params![
            entry.clockify_id,
            entry.client_id,
            entry.sprint_id,
            entry.user_id,
            entry.entry_date,
            entry.hours,
            entry.description,
            entry.task_category,
            entry.project_name,
            tags_json,
        ],
    )?;
    Ok(())
}

// ── Sync logs ──────────────────────────────────────────────────────

pub fn insert_sync_log(
    conn: &Connection,
    source: &str,
    sync_start: &str,
    sync_end: &str,
    status: &str,
    records_synced: u64,
    error_message: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO sync_logs (source, sync_start, sync_end, status, records_synced, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            source,
            sync_start,
            sync_end,
            status,
            records_synced as i64,
            error_message,
        ],
    )?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SyncLogRow {
    pub source: String,
    pub sync_end: String,
    pub status: String,
    pub records_synced: i64,
}

/// Most recent sync log row for a source (for the status command).
pub fn last_sync_log(
    conn: &Connection,
    source: &str,
) -> Result<Option<SyncLogRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT source, sync_end, status, records_synced FROM sync_logs
         WHERE source = ?1 ORDER BY id DESC LIMIT 1",
        params![source],
        |row| {
            Ok(SyncLogRow {
                source: row.get(0)?,
                sync_end: row.get(1)?,
                status: row.get(2)?,
                records_synced: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64, rusqlite::Error> {
    // Table names come from a fixed internal list, never user input.
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
}
