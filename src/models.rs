use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiType {
    Percentage,
    Number,
    /// Durations stored as whole seconds.
    TimeSeconds,
}

impl KpiType {
    pub fn format_value(&self, value: f64) -> String {
        match self {
            KpiType::Percentage => format!("{value:.1}%"),
            KpiType::Number => format!("{value:.1}"),
            KpiType::TimeSeconds => {
                let total = value.round() as i64;
                format!("{}:{:02}", total / 60, total % 60)
            }
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        match self {
            KpiType::Percentage => value.clamp(0.0, 100.0),
            KpiType::Number | KpiType::TimeSeconds => value.max(0.0),
        }
    }
}

impl fmt::Display for KpiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiType::Percentage => write!(f, "Percentage"),
            KpiType::Number => write!(f, "Number"),
            KpiType::TimeSeconds => write!(f, "Time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub regular: f64,
    pub critical: f64,
    /// Lower values are better.
    pub inverse: bool,
}

impl Thresholds {
    pub fn is_consistent(&self) -> bool {
        if self.inverse {
            self.regular <= self.critical
        } else {
            self.regular >= self.critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiDefinition {
    pub name: String,
    pub kpi_type: KpiType,
    #[serde(default)]
    pub description: String,
    pub active: bool,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub name: String,
    pub kpi_type: KpiType,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub team_id: u32,
    pub team_name: String,
    pub supervisor_id: u32,
    pub supervisor_name: String,
    pub coordinator_id: u32,
    pub kpis: Vec<Kpi>,
}

impl Operator {
    pub fn kpi_value(&self, name: &str) -> Option<f64> {
        self.kpis.iter().find(|kpi| kpi.name == name).map(|kpi| kpi.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Coordinator,
    Supervisor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "Administrator"),
            Role::Coordinator => write!(f, "Coordinator"),
            Role::Supervisor => write!(f, "Supervisor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Only supervisors own a team.
    #[serde(default)]
    pub team_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub supervisor_id: u32,
    pub supervisor_name: String,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedTeam {
    pub team: Team,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Good,
    Warning,
    Critical,
    Inactive,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Good => write!(f, "Good"),
            Tier::Warning => write!(f, "Warning"),
            Tier::Critical => write!(f, "Critical"),
            Tier::Inactive => write!(f, "Inactive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiAverage {
    pub name: String,
    pub kpi_type: KpiType,
    pub average: Option<f64>,
    pub tier: Option<Tier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u32,
    pub user_id: u32,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    pub kpi_name: String,
    pub kpi_type: KpiType,
    pub color: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiHistory {
    pub labels: Vec<String>,
    pub series: Vec<HistorySeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub batch_id: Uuid,
    pub updated: usize,
    pub created: usize,
    pub ignored: usize,
    /// Set when the whole file was rejected.
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackAppointment {
    pub operator_id: u32,
    pub operator_name: String,
    pub scheduled_for: NaiveDateTime,
    pub notes: String,
}
