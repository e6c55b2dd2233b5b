use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = ".kpi-dashboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub verbose: bool,

    /// JSON snapshot carried between invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PathBuf>,
}

/// Who sees what beyond the plain role rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Coordinators listed here see the whole organization.
    #[serde(default = "default_global_coordinators")]
    pub global_coordinator_ids: Vec<u32>,

    /// Coordinator assigned to a team created by a supervisor import.
    #[serde(default = "default_coordinator_id")]
    pub default_coordinator_id: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            global_coordinator_ids: default_global_coordinators(),
            default_coordinator_id: default_coordinator_id(),
        }
    }
}

fn default_global_coordinators() -> Vec<u32> {
    vec![2]
}

fn default_coordinator_id() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// KPI watched by the notification feed.
    #[serde(default = "default_alert_kpi")]
    pub kpi: String,

    /// Team averages below critical + margin raise a coordinator alert.
    #[serde(default = "default_coordinator_margin")]
    pub coordinator_margin: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            kpi: default_alert_kpi(),
            coordinator_margin: default_coordinator_margin(),
        }
    }
}

fn default_alert_kpi() -> String {
    "CSAT".to_string()
}

fn default_coordinator_margin() -> f64 {
    5.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    #[serde(default = "default_colors")]
    pub colors: Vec<String>,

    /// Relative noise applied per period of distance from the present.
    #[serde(default = "default_max_step_variation")]
    pub max_step_variation: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            labels: default_labels(),
            colors: default_colors(),
            max_step_variation: default_max_step_variation(),
        }
    }
}

fn default_labels() -> Vec<String> {
    vec!["Week -4", "Week -3", "Week -2", "Week -1", "Current"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_colors() -> Vec<String> {
    vec!["#38bdf8", "#34d399", "#f87171", "#fbbf24", "#a78bfa", "#f472b6"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_step_variation() -> f64 {
    0.05
}

/// Demo credentials. Not a security control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_root_email")]
    pub root_email: String,

    #[serde(default = "default_root_password")]
    pub root_password: String,

    #[serde(default = "default_fallback_password")]
    pub fallback_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            root_email: default_root_email(),
            root_password: default_root_password(),
            fallback_password: default_fallback_password(),
        }
    }
}

fn default_root_email() -> String {
    "root@example.com".to_string()
}

fn default_root_password() -> String {
    "Adm*2@2026".to_string()
}

fn default_fallback_password() -> String {
    "password123".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path` when given, else `.kpi-dashboard.toml` if present, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to render default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_seed_organization() {
        let config = Config::default();
        assert_eq!(config.access.global_coordinator_ids, vec![2]);
        assert_eq!(config.access.default_coordinator_id, 2);
        assert_eq!(config.alerts.kpi, "CSAT");
        assert_eq!(config.history.labels.len(), 5);
        assert_eq!(config.history.colors.len(), 6);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let toml_content = r#"
[access]
global_coordinator_ids = []

[alerts]
coordinator_margin = 2.5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.access.global_coordinator_ids.is_empty());
        assert_eq!(config.access.default_coordinator_id, 2);
        assert_eq!(config.alerts.kpi, "CSAT");
        assert_eq!(config.alerts.coordinator_margin, 2.5);
        assert_eq!(config.auth.fallback_password, "password123");
    }

    #[test]
    fn default_toml_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, Config::default_toml().unwrap()).unwrap();

        let config = Config::resolve(Some(&path)).unwrap();
        assert_eq!(config.history.max_step_variation, 0.05);
        assert!(std::fs::read_to_string(&path).unwrap().contains("[access]"));
    }
}
