use crate::error::{Result, TaskingError};
use std::time::Duration;

/// Runtime configuration for the tasking core.
///
/// Defaults are suitable for development; `from_env` overrides individual
/// fields from `TASKING_*` environment variables.
#[derive(Debug, Clone)]
pub struct TaskingConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Role whose members are eligible for auto-assignment.
    pub reviewer_role: String,
    /// All roles the identity resolver batches display-name lookups over.
    pub known_roles: Vec<String>,
    pub name_cache_ttl: Duration,
    pub name_cache_max_entries: usize,
}

impl Default for TaskingConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/imagery_tasking_development".to_string(),
            max_connections: 10,
            reviewer_role: "reviewer".to_string(),
            known_roles: vec!["reviewer".to_string(), "verifier".to_string()],
            name_cache_ttl: Duration::from_secs(15 * 60),
            name_cache_max_entries: 4096,
        }
    }
}

impl TaskingConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(max_connections) = std::env::var("TASKING_MAX_CONNECTIONS") {
            config.max_connections = max_connections.parse().map_err(|e| {
                TaskingError::Configuration(format!("invalid max_connections: {e}"))
            })?;
        }

        if let Ok(role) = std::env::var("TASKING_REVIEWER_ROLE") {
            config.reviewer_role = role;
        }

        if let Ok(roles) = std::env::var("TASKING_KNOWN_ROLES") {
            config.known_roles = roles
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
            if config.known_roles.is_empty() {
                return Err(TaskingError::Configuration(
                    "TASKING_KNOWN_ROLES must name at least one role".to_string(),
                ));
            }
        }

        if let Ok(ttl) = std::env::var("TASKING_NAME_CACHE_TTL_SECS") {
            let secs: u64 = ttl.parse().map_err(|e| {
                TaskingError::Configuration(format!("invalid name_cache_ttl_secs: {e}"))
            })?;
            config.name_cache_ttl = Duration::from_secs(secs);
        }

        if let Ok(max) = std::env::var("TASKING_NAME_CACHE_MAX_ENTRIES") {
            config.name_cache_max_entries = max.parse().map_err(|e| {
                TaskingError::Configuration(format!("invalid name_cache_max_entries: {e}"))
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TaskingConfig::default();
        assert_eq!(config.reviewer_role, "reviewer");
        assert_eq!(config.known_roles.len(), 2);
        assert_eq!(config.name_cache_ttl, Duration::from_secs(900));
    }

    // Single test body: from_env reads every TASKING_* variable, so parallel
    // tests mutating the environment would race each other.
    #[test]
    fn test_env_overrides() {
        std::env::set_var("TASKING_KNOWN_ROLES", "reviewer, lead , ");
        let config = TaskingConfig::from_env().unwrap();
        assert_eq!(config.known_roles, vec!["reviewer", "lead"]);
        std::env::remove_var("TASKING_KNOWN_ROLES");

        std::env::set_var("TASKING_NAME_CACHE_TTL_SECS", "not-a-number");
        let result = TaskingConfig::from_env();
        assert!(matches!(result, Err(TaskingError::Configuration(_))));
        std::env::remove_var("TASKING_NAME_CACHE_TTL_SECS");
    }
}
