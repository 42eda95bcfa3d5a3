use crate::error::{Error, Result};

/// Environment-provided configuration for the external APIs.
///
/// All fields are read leniently at startup; the sync that needs a value
/// validates it before any network I/O and aborts with `Error::Config`
/// when it is missing.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub clockify_api_key: Option<String>,
    pub clockify_workspace_id: Option<String>,
    pub monday_api_key: Option<String>,
    pub monday_au_board_id: Option<String>,
    pub monday_us_board_id: Option<String>,
    pub monday_uk_board_id: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            clockify_api_key: env_var("CLOCKIFY_API_KEY"),
            clockify_workspace_id: env_var("CLOCKIFY_WORKSPACE_ID"),
            monday_api_key: env_var("MONDAY_API_KEY"),
            monday_au_board_id: env_var("MONDAY_AU_BOARD_ID"),
            monday_us_board_id: env_var("MONDAY_US_BOARD_ID"),
            monday_uk_board_id: env_var("MONDAY_UK_BOARD_ID"),
        }
    }

    /// Required values for the Clockify sync, or a fatal config error.
    pub fn clockify(&self) -> Result<(&str, &str)> {
        let key = self
            .clockify_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("CLOCKIFY_API_KEY is not set".into()))?;
        let workspace = self
            .clockify_workspace_id
            .as_deref()
            .ok_or_else(|| Error::Config("CLOCKIFY_WORKSPACE_ID is not set".into()))?;
        Ok((key, workspace))
    }

    /// Required API key for the Monday sync, or a fatal config error.
    pub fn monday_key(&self) -> Result<&str> {
        self.monday_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("MONDAY_API_KEY is not set".into()))
    }

    /// Region boards in fixed sync order. Regions with no configured board
    /// id are skipped by the orchestrator, not treated as errors.
    pub fn monday_boards(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("AU", self.monday_au_board_id.as_deref()),
            ("US", self.monday_us_board_id.as_deref()),
            ("UK", self.monday_uk_board_id.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_clockify_config_is_fatal() {
        let config = Config::default();
        assert!(matches!(config.clockify(), Err(Error::Config(_))));
        assert!(matches!(config.monday_key(), Err(Error::Config(_))));
    }

    #[test]
    fn test_board_order_is_stable() {
        let config = Config {
            monday_au_board_id: Some("111".into()),
            monday_uk_board_id: Some("333".into()),
            ..Config::default()
        };
        let boards = config.monday_boards();
        assert_eq!(boards[0], ("AU", Some("111")));
        assert_eq!(boards[1], ("US", None));
        assert_eq!(boards[2], ("UK", Some("333")));
    }
}
