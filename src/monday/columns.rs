//! Typed decoding of Monday.com column values.
//!
//! Board columns arrive as `(title, value-json, display-text)` triples
//! whose shape depends on the column type. Each accessor here decodes one
//! field type and fails soft to `None`/empty on any shape mismatch.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use crate::date_util::parse_date;

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMeta {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnValue {
    pub column: ColumnMeta,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Column values of one item, indexed by column title.
pub struct Columns<'a> {
    by_title: HashMap<&'a str, &'a ColumnValue>,
}

#[derive(Deserialize)]
struct DateValue {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
struct PersonRef {
    id: i64,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeopleValue {
    #[serde(default)]
    persons_and_teams: Vec<PersonRef>,
}

static QUARTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Q(\d+)").unwrap());
static SPRINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Sprint\s*#?(\d+)").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());

impl<'a> Columns<'a> {
    pub fn new(values: &'a [ColumnValue]) -> Self {
        let by_title = values
            .iter()
            .map(|v| (v.column.title.as_str(), v))
            .collect();
        Self { by_title }
    }

    fn raw_value(&self, title: &str) -> Option<&'a str> {
        self.by_title.get(title)?.value.as_deref()
    }

    /// Display text of a column, `None` when absent or blank.
    pub fn text(&self, title: &str) -> Option<&'a str> {
        self.by_title
            .get(title)?
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    /// Date column: `{"date": "YYYY-MM-DD"}` value JSON.
    pub fn date(&self, title: &str) -> Option<NaiveDate> {
        let value: DateValue = serde_json::from_str(self.raw_value(title)?).ok()?;
        parse_date(&value.date?)
    }

    /// Numeric column, decoded from display text (quotes stripped).
    pub fn numeric(&self, title: &str) -> Option<f64> {
        let cleaned = self.text(title)?.replace(['\'', '"'], "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse().ok()
    }

    /// First person id in a person column.
    pub fn person(&self, title: &str) -> Option<i64> {
        let value: PeopleValue = serde_json::from_str(self.raw_value(title)?).ok()?;
        value.persons_and_teams.first().map(|p| p.id)
    }

    /// All person ids (kind `person`, teams excluded) in a people column.
    pub fn people(&self, title: &str) -> Vec<i64> {
        let Some(raw) = self.raw_value(title) else {
            return Vec::new();
        };
        let Ok(value) = serde_json::from_str::<PeopleValue>(raw) else {
            return Vec::new();
        };
        value
            .persons_and_teams
            .into_iter()
            .filter(|p| p.kind.as_deref() == Some("person"))
            .map(|p| p.id)
            .collect()
    }
}

/// Sprint ordinal from its label: `Q3` → 3, `Sprint #2` → 2, otherwise the
/// first number found.
pub fn extract_sprint_number(label: &str) -> Option<i64> {
    for re in [&*QUARTER_RE, &*SPRINT_RE, &*NUMBER_RE] {
        if let Some(captures) = re.captures(label) {
            if let Ok(n) = captures[1].parse() {
                return Some(n);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(title: &str, value: Option<&str>, text: Option<&str>) -> ColumnValue {
        ColumnValue {
            column: ColumnMeta {
                title: title.to_string(),
            },
            value: value.map(String::from),
            text: text.map(String::from),
        }
    }

    #[test]
    fn test_date_column() {
        let values = [column("Start Date", Some(r#"{"date":"2025-02-26"}"#), None)];
        let columns = Columns::new(&values);
        assert_eq!(
            columns.date("Start Date"),
            Some(NaiveDate::from_ymd_opt(2025, 2, 26).unwrap())
        );
    }

    #[test]
    fn test_date_column_fails_soft() {
        let values = [
            column("Start Date", Some("not json"), None),
            column("End Date", Some(r#"{"date":null}"#), None),
        ];
        let columns = Columns::new(&values);
        assert_eq!(columns.date("Start Date"), None);
        assert_eq!(columns.date("End Date"), None);
        assert_eq!(columns.date("Missing"), None);
    }

    #[test]
    fn test_numeric_column() {
        let values = [
            column("Monthly Rate", None, Some("3800")),
            column("Agency Value", None, Some("'12500'")),
            column("Blank", None, Some("  ")),
        ];
        let columns = Columns::new(&values);
        assert_eq!(columns.numeric("Monthly Rate"), Some(3800.0));
        assert_eq!(columns.numeric("Agency Value"), Some(12500.0));
        assert_eq!(columns.numeric("Blank"), None);
    }

    #[test]
    fn test_person_columns() {
        let raw = r#"{"personsAndTeams":[{"id":101,"kind":"person"},{"id":7,"kind":"team"},{"id":102,"kind":"person"}]}"#;
        let values = [column("DPR Support", Some(raw), None)];
        let columns = Columns::new(&values);
        assert_eq!(columns.person("DPR Support"), Some(101));
        assert_eq!(columns.people("DPR Support"), vec![101, 102]);
        assert_eq!(columns.people("Missing"), Vec::<i64>::new());
    }

    #[test]
    fn test_extract_sprint_number() {
        assert_eq!(extract_sprint_number("Q3"), Some(3));
        assert_eq!(extract_sprint_number("q2 2025"), Some(2));
        assert_eq!(extract_sprint_number("Sprint #4"), Some(4));
        assert_eq!(extract_sprint_number("sprint 12"), Some(12));
        assert_eq!(extract_sprint_number("Phase 2"), Some(2));
        assert_eq!(extract_sprint_number("Kickoff"), None);
    }
}
