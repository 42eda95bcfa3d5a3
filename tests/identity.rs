//! Identity resolution against a seeded in-memory warehouse.

use agencydw::resolve::identity;
use agencydw::Database;

async fn seed_client(db: &Database, monday_item_id: i64, name: &str) -> i64 {
    let name = name.to_string();
    db.writer()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO clients (monday_item_id, name, region, updated_at)
                 VALUES (?1, ?2, 'AU', datetime('now'))",
                rusqlite::params![monday_item_id, name],
            )?;
            Ok::<i64, rusqlite::Error>(conn.last_insert_rowid())
        })
        .await
        .unwrap()
}

async fn seed_override(db: &Database, project_name: &str, client_name: &str) {
    let project_name = project_name.to_string();
    let client_name = client_name.to_string();
    db.writer()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO project_overrides (project_name, client_name) VALUES (?1, ?2)",
                rusqlite::params![project_name, client_name],
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap()
}

async fn resolve(db: &Database, project_name: &str) -> Option<i64> {
    let project_name = project_name.to_string();
    db.reader()
        .call(move |conn| identity::resolve_client(conn, &project_name))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_exact_match_is_case_insensitive() {
    let db = Database::open_memory().await.unwrap();
    let id = seed_client(&db, 1, "Luxo Living").await;

    assert_eq!(resolve(&db, "luxo living").await, Some(id));
    assert_eq!(resolve(&db, "LUXO LIVING").await, Some(id));
}

#[tokio::test]
async fn test_override_beats_fuzzy_match() {
    let db = Database::open_memory().await.unwrap();
    let _similar = seed_client(&db, 1, "Grace Love").await;
    let intended = seed_client(&db, 2, "Grace Loves Lace").await;
    seed_override(&db, "Grace Love Lace", "Grace Loves Lace").await;

    assert_eq!(resolve(&db, "Grace Love Lace").await, Some(intended));
}

#[tokio::test]
async fn test_empty_override_means_intentionally_unmapped() {
    let db = Database::open_memory().await.unwrap();
    // Even though this client would fuzzy-match, the empty override
    // short-circuits resolution entirely.
    seed_client(&db, 1, "LVLY").await;
    seed_override(&db, "LVLY", "").await;

    assert_eq!(resolve(&db, "LVLY").await, None);
}

#[tokio::test]
async fn test_fuzzy_containment_both_directions() {
    let db = Database::open_memory().await.unwrap();
    let id = seed_client(&db, 1, "Nutrition Warehouse").await;

    // Normalized containment: project name with punctuation stripped
    assert_eq!(resolve(&db, "NutritionWarehouse").await, Some(id));
    // Project name containing the client name
    assert_eq!(resolve(&db, "Nutrition Warehouse - SEO").await, Some(id));
    // Client name containing the project name
    assert_eq!(resolve(&db, "Nutrition").await, Some(id));
}

#[tokio::test]
async fn test_fuzzy_prefers_longer_normalized_name() {
    let db = Database::open_memory().await.unwrap();
    // Both contain "icon"; the longer, more specific name must win
    // regardless of insertion order.
    let _short = seed_client(&db, 1, "Icon").await;
    let long = seed_client(&db, 2, "Icon By Design").await;

    assert_eq!(resolve(&db, "IconByDesign").await, Some(long));
}

#[tokio::test]
async fn test_unmatched_project_is_none() {
    let db = Database::open_memory().await.unwrap();
    seed_client(&db, 1, "Moonpig").await;

    assert_eq!(resolve(&db, "Internal Admin").await, None);
    assert_eq!(resolve(&db, "").await, None);
}

#[tokio::test]
async fn test_user_lookup_by_email_and_person_id() {
    let db = Database::open_memory().await.unwrap();
    db.writer()
        .call(|conn| {
            conn.execute(
                "INSERT INTO users (email, name, monday_person_id) VALUES ('ana@agency.com', 'Ana', 101)",
                [],
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .unwrap();

    let by_email = db
        .reader()
        .call(|conn| identity::find_user_by_email(conn, "Ana@Agency.com"))
        .await
        .unwrap();
    assert!(by_email.is_some());

    let by_person = db
        .reader()
        .call(|conn| identity::find_user_by_person_id(conn, 101))
        .await
        .unwrap();
    assert_eq!(by_person, by_email);

    let missing = db
        .reader()
        .call(|conn| identity::find_user_by_email(conn, "nobody@agency.com"))
        .await
        .unwrap();
    assert_eq!(missing, None);
}
