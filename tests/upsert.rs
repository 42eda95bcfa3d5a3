//! Idempotency and partial-field semantics of the repository upserts.

use agencydw::storage::repository::{
    self, ClientRecord, SprintRecord, TimeEntryRecord,
};
use agencydw::Database;

fn client_record(monday_item_id: i64) -> ClientRecord {
    ClientRecord {
        monday_item_id,
        name: "Luxo Living".to_string(),
        region: "AU".to_string(),
        lead_user_id: None,
        support_user_ids: None,
        seo_lead_name: None,
        niche: None,
        agency_value: None,
        client_priority: None,
        campaign_type: None,
        campaign_start_date: None,
        monthly_rate: None,
        monthly_hours: None,
        report_status: None,
        last_report_date: None,
        last_invoice_date: None,
        is_active: true,
        group_name: "AU Clients".to_string(),
    }
}

fn entry_record(clockify_id: &str, hours: f64) -> TimeEntryRecord {
    TimeEntryRecord {
        clockify_id: clockify_id.to_string(),
        client_id: None,
        sprint_id: None,
        user_id: 1,
        entry_date: "2025-03-03".to_string(),
        hours,
        description: "Outreach".to_string(),
        task_category: None,
        project_name: None,
        tags: Vec::new(),
    }
}

async fn seed_user(db: &Database) {
    db.writer()
        .call(|conn| {
            conn.execute(
                "INSERT INTO users (email, name) VALUES ('ana@agency.com', 'Ana')",
                [],
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_time_entry_upsert_is_idempotent() {
    let db = Database::open_memory().await.unwrap();
    seed_user(&db).await;

    db.writer()
        .call(|conn| {
            repository::upsert_time_entry(conn, &entry_record("e1", 2.5))?;
            // Re-sync of the same entry with corrected hours
            repository::upsert_time_entry(conn, &entry_record("e1", 3.0))?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap();

    let (count, hours) = db
        .reader()
        .call(|conn| {
            let count = repository::count_rows(conn, "time_entries")?;
            let hours: f64 = conn.query_row(
                "SELECT hours FROM time_entries WHERE clockify_id = 'e1'",
                [],
                |row| row.get(0),
            )?;
            Ok::<_, rusqlite::Error>((count, hours))
        })
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(hours, 3.0);
}

#[tokio::test]
async fn test_client_upsert_keeps_stored_values_when_source_is_absent() {
    let db = Database::open_memory().await.unwrap();

    let mut first = client_record(42);
    first.monthly_rate = Some(3800.0);
    first.monthly_hours = Some(20.0);
    first.niche = Some("Furniture".to_string());

    // Second sync carries no rate or niche (column missing upstream)
    // but flips the group and active flag.
    let mut second = client_record(42);
    second.is_active = false;
    second.group_name = "Finished Campaigns".to_string();

    let (first_id, second_id) = db
        .writer()
        .call(move |conn| {
            let a = repository::upsert_client(conn, &first)?;
            let b = repository::upsert_client(conn, &second)?;
            Ok::<_, rusqlite::Error>((a, b))
        })
        .await
        .unwrap();
    assert_eq!(first_id, second_id);

    let (rate, niche, is_active, group_name) = db
        .reader()
        .call(move |conn| {
            conn.query_row(
                "SELECT monthly_rate, niche, is_active, group_name
                 FROM clients WHERE id = ?1",
                rusqlite::params![first_id],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
        })
        .await
        .unwrap();

    assert_eq!(rate, Some(3800.0));
    assert_eq!(niche.as_deref(), Some("Furniture"));
    assert!(!is_active);
    assert_eq!(group_name, "Finished Campaigns");
}

#[tokio::test]
async fn test_sprint_upsert_and_ordered_load() {
    let db = Database::open_memory().await.unwrap();

    let client_id = db
        .writer()
        .call(|conn| repository::upsert_client(conn, &client_record(42)))
        .await
        .unwrap();

    let sprint = |subitem_id: i64, start: &str, end: &str| SprintRecord {
        monday_subitem_id: subitem_id,
        client_id,
        name: format!("Sprint {subitem_id}"),
        sprint_number: Some(subitem_id),
        sprint_label: None,
        start_date: start.to_string(),
        end_date: end.to_string(),
        kpi_target: 10,
        kpi_achieved: 0,
        monthly_rate: None,
    };

    // Inserted out of order; load must come back sorted by start date.
    let second = sprint(2, "2025-04-01", "2025-04-30");
    let first = sprint(1, "2025-03-01", "2025-03-31");
    let first_again = sprint(1, "2025-03-01", "2025-03-31");
    db.writer()
        .call(move |conn| {
            repository::upsert_sprint(conn, &second)?;
            repository::upsert_sprint(conn, &first)?;
            repository::upsert_sprint(conn, &first_again)?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap();

    let (count, loaded) = db
        .reader()
        .call(move |conn| {
            let count = repository::count_rows(conn, "sprints")?;
            let loaded = repository::load_client_sprints(conn, client_id)?;
            Ok::<_, rusqlite::Error>((count, loaded))
        })
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(loaded.sprints.len(), 2);
    assert!(loaded.sprints[0].start < loaded.sprints[1].start);
}

#[tokio::test]
async fn test_sync_log_round_trip() {
    let db = Database::open_memory().await.unwrap();

    db.writer()
        .call(|conn| {
            repository::insert_sync_log(
                conn,
                "clockify",
                "2025-03-03T00:00:00Z",
                "2025-03-03T00:01:00Z",
                "success",
                17,
                None,
            )?;
            repository::insert_sync_log(
                conn,
                "clockify",
                "2025-03-04T00:00:00Z",
                "2025-03-04T00:00:30Z",
                "error",
                0,
                Some("Clockify API error: /workspaces returned 500"),
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap();

    let last = db
        .reader()
        .call(|conn| repository::last_sync_log(conn, "clockify"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(last.status, "error");
    assert_eq!(last.records_synced, 0);
}
