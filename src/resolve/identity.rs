//! Identity resolution: external person references to internal users,
//! external project names to internal clients.

use rusqlite::Connection;

use crate::storage::repository;

/// Lowercase a name and strip everything non-alphanumeric, so
/// `"Luxo Living"` and `"LuxoLiving"` compare equal.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Map a time-tracking user's email to an internal user id.
/// No match is not an error: the caller skips that user's records.
pub fn find_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    if email.is_empty() {
        return Ok(None);
    }
    repository::find_user_id_by_email(conn, &email.to_lowercase())
}

/// Map a board person id to an internal user id.
pub fn find_user_by_person_id(
    conn: &Connection,
    person_id: i64,
) -> Result<Option<i64>, rusqlite::Error> {
    repository::find_user_id_by_person_id(conn, person_id)
}

/// Resolve a project name to a client id, in strict priority order:
///
/// 1. Manual override table. An override mapping to the empty string is
///    an explicit "intentionally unmapped" marker and short-circuits all
///    further matching.
/// 2. Exact case-insensitive match on the client name.
/// 3. Fuzzy substring containment, either direction, under both the raw
///    lowercased names and their alphanumeric-normalized forms.
///
/// Fuzzy candidates are scanned in a deterministic order: normalized-name
/// length descending, then name. First match wins, so the most specific
/// client name takes precedence over a shorter name it happens to contain.
pub fn resolve_client(
    conn: &Connection,
    project_name: &str,
) -> Result<Option<i64>, rusqlite::Error> {
    if project_name.is_empty() {
        return Ok(None);
    }

    match repository::get_project_override(conn, project_name)? {
        Some(target) if target.is_empty() => return Ok(None),
        Some(target) => {
            if let Some(id) = repository::find_client_id_by_name(conn, &target)? {
                return Ok(Some(id));
            }
            // Override points at a client that doesn't exist; fall through
            // and try to match the original name.
        }
        None => {}
    }

    if let Some(id) = repository::find_client_id_by_name(conn, project_name)? {
        return Ok(Some(id));
    }

    let project_lower = project_name.to_lowercase();
    let project_normalized = normalize_name(project_name);

    let mut candidates: Vec<(i64, String, String)> = repository::list_clients(conn)?
        .into_iter()
        .map(|(id, name)| {
            let normalized = normalize_name(&name);
            (id, name, normalized)
        })
        .collect();
    candidates.sort_by(|a, b| b.2.len().cmp(&a.2.len()).then_with(|| a.1.cmp(&b.1)));

    for (id, name, normalized) in &candidates {
        let client_lower = name.to_lowercase();
        if project_lower.contains(&client_lower)
            || client_lower.contains(&project_lower)
            || project_normalized.contains(normalized.as_str())
            || normalized.contains(&project_normalized)
        {
            return Ok(Some(*id));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Luxo Living"), "luxoliving");
        assert_eq!(normalize_name("Pack & Send"), "packsend");
        assert_eq!(normalize_name("OSHC Australia Pty Ltd"), "oshcaustraliaptyltd");
        assert_eq!(normalize_name(""), "");
    }
}
