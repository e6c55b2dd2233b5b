//! The store is unsynchronized. Concurrent writers need one lock around the
//! whole store.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::{Kpi, KpiDefinition, KpiType, Operator, Role, Thresholds, User};

pub trait UserStore {
    fn get_user(&self, id: u32) -> Option<User>;
    fn find_user_by_email(&self, email: &str) -> Option<User>;
    fn list_users(&self) -> Vec<User>;
    fn upsert_user(&mut self, user: User);
    fn delete_user(&mut self, id: u32) -> bool;
    fn replace_users(&mut self, users: Vec<User>);
}

pub trait OperatorStore {
    fn get_operator(&self, id: u32) -> Option<Operator>;
    fn list_operators(&self) -> Vec<Operator>;
    fn upsert_operator(&mut self, operator: Operator);
    fn delete_operator(&mut self, id: u32) -> bool;
    fn replace_operators(&mut self, operators: Vec<Operator>);
}

pub trait KpiDefinitionStore {
    fn get_definition(&self, name: &str) -> Option<KpiDefinition>;
    /// Definitions in registration order.
    fn list_definitions(&self) -> Vec<KpiDefinition>;
    fn upsert_definition(&mut self, definition: KpiDefinition);
    fn delete_definition(&mut self, name: &str) -> bool;

    fn active_definitions(&self) -> Vec<KpiDefinition> {
        self.list_definitions()
            .into_iter()
            .filter(|definition| definition.active)
            .collect()
    }
}

pub trait SetupStore {
    fn setup_complete(&self) -> bool;
    fn mark_setup_complete(&mut self);
}

/// Everything the dashboard engine reads and writes.
pub trait Store: UserStore + OperatorStore + KpiDefinitionStore + SetupStore {}

impl<T> Store for T where T: UserStore + OperatorStore + KpiDefinitionStore + SetupStore {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    users: Vec<User>,
    operators: Vec<Operator>,
    definitions: Vec<KpiDefinition>,
    #[serde(default)]
    setup_complete: bool,
}

impl InMemoryStore {
    pub fn new(users: Vec<User>, operators: Vec<Operator>, definitions: Vec<KpiDefinition>) -> Self {
        Self {
            users,
            operators,
            definitions,
            setup_complete: false,
        }
    }

    pub fn load_snapshot(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let store = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))?;
        Ok(store)
    }

    pub fn save_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self).context("failed to encode snapshot")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    /// Snapshot at `path` when it exists, seed data otherwise.
    pub fn open(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_snapshot(path),
            _ => Ok(seed()),
        }
    }
}

impl UserStore for InMemoryStore {
    fn get_user(&self, id: u32) -> Option<User> {
        self.users.iter().find(|user| user.id == id).cloned()
    }

    fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn list_users(&self) -> Vec<User> {
        self.users.clone()
    }

    fn upsert_user(&mut self, user: User) {
        match self.users.iter_mut().find(|existing| existing.id == user.id) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }

    fn delete_user(&mut self, id: u32) -> bool {
        let before = self.users.len();
        self.users.retain(|user| user.id != id);
        self.users.len() != before
    }

    fn replace_users(&mut self, users: Vec<User>) {
        self.users = users;
    }
}

impl OperatorStore for InMemoryStore {
    fn get_operator(&self, id: u32) -> Option<Operator> {
        self.operators.iter().find(|operator| operator.id == id).cloned()
    }

    fn list_operators(&self) -> Vec<Operator> {
        self.operators.clone()
    }

    fn upsert_operator(&mut self, operator: Operator) {
        match self
            .operators
            .iter_mut()
            .find(|existing| existing.id == operator.id)
        {
            Some(existing) => *existing = operator,
            None => self.operators.push(operator),
        }
    }

    fn delete_operator(&mut self, id: u32) -> bool {
        let before = self.operators.len();
        self.operators.retain(|operator| operator.id != id);
        self.operators.len() != before
    }

    fn replace_operators(&mut self, operators: Vec<Operator>) {
        self.operators = operators;
    }
}

impl KpiDefinitionStore for InMemoryStore {
    fn get_definition(&self, name: &str) -> Option<KpiDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.name == name)
            .cloned()
    }

    fn list_definitions(&self) -> Vec<KpiDefinition> {
        self.definitions.clone()
    }

    fn upsert_definition(&mut self, definition: KpiDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|existing| existing.name == definition.name)
        {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }

    fn delete_definition(&mut self, name: &str) -> bool {
        let before = self.definitions.len();
        self.definitions.retain(|definition| definition.name != name);
        self.definitions.len() != before
    }
}

impl SetupStore for InMemoryStore {
    fn setup_complete(&self) -> bool {
        self.setup_complete
    }

    fn mark_setup_complete(&mut self) {
        self.setup_complete = true;
    }
}

fn definition(
    name: &str,
    kpi_type: KpiType,
    description: &str,
    active: bool,
    regular: f64,
    critical: f64,
    inverse: bool,
) -> KpiDefinition {
    KpiDefinition {
        name: name.to_string(),
        kpi_type,
        description: description.to_string(),
        active,
        thresholds: Thresholds {
            regular,
            critical,
            inverse,
        },
    }
}

fn user(id: u32, name: &str, email: &str, role: Role, team_id: Option<u32>) -> User {
    User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        team_id,
    }
}

/// Demo organization: one coordinator, two supervised teams.
pub fn seed() -> InMemoryStore {
    let users = vec![
        user(1, "Admin", "admin@example.com", Role::Administrator, None),
        user(2, "Ana Coordinator", "ana.coordinator@example.com", Role::Coordinator, None),
        user(3, "Walter Supervisor", "walter.supervisor@example.com", Role::Supervisor, Some(101)),
        user(4, "Carlos Supervisor", "carlos.supervisor@example.com", Role::Supervisor, Some(102)),
        user(5, "Root Admin", "root@example.com", Role::Administrator, None),
    ];

    let definitions = vec![
        definition("CSAT", KpiType::Percentage, "Customer satisfaction score", true, 95.0, 85.0, false),
        definition("FCR", KpiType::Percentage, "First call resolution", true, 95.0, 85.0, false),
        definition("Callback 24h", KpiType::Percentage, "Calls returned within 24 hours", true, 5.0, 15.0, true),
        definition("Abs", KpiType::Percentage, "Absenteeism", false, 2.0, 5.0, true),
        definition("AHT", KpiType::TimeSeconds, "Average handling time in seconds", true, 180.0, 300.0, true),
    ];

    let roster = [
        (1001, "John Silva", "john.s@example.com", 101, [98.0, 95.0, 4.0, 1.0, 170.0]),
        (1002, "Maria Oliveira", "maria.o@example.com", 101, [84.0, 88.0, 16.0, 5.0, 310.0]),
        (1003, "Peter Souza", "peter.s@example.com", 101, [91.0, 92.0, 8.0, 2.0, 210.0]),
        (1004, "Beatrice Costa", "beatrice.c@example.com", 102, [96.0, 97.0, 3.0, 0.0, 160.0]),
        (1005, "Lucas Martins", "lucas.m@example.com", 102, [88.0, 90.0, 12.0, 3.0, 250.0]),
    ];

    let operators = roster
        .into_iter()
        .map(|(id, name, email, team_id, values)| {
            let (supervisor_id, supervisor_name, team_name) = if team_id == 101 {
                (3, "Walter Supervisor", "Team Walter")
            } else {
                (4, "Carlos Supervisor", "Team Carlos")
            };
            Operator {
                id,
                name: name.to_string(),
                email: email.to_string(),
                team_id,
                team_name: team_name.to_string(),
                supervisor_id,
                supervisor_name: supervisor_name.to_string(),
                coordinator_id: 2,
                kpis: definitions
                    .iter()
                    .zip(values)
                    .map(|(definition, value)| Kpi {
                        name: definition.name.clone(),
                        kpi_type: definition.kpi_type,
                        value,
                    })
                    .collect(),
            }
        })
        .collect();

    InMemoryStore::new(users, operators, definitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_consistent_thresholds() {
        let store = seed();
        assert_eq!(store.list_definitions().len(), 5);
        assert_eq!(store.active_definitions().len(), 4);
        assert!(store
            .list_definitions()
            .iter()
            .all(|definition| definition.thresholds.is_consistent()));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut store = seed();
        let mut operator = store.get_operator(1003).unwrap();
        operator.name = "Peter S.".to_string();
        store.upsert_operator(operator);

        let operators = store.list_operators();
        assert_eq!(operators.len(), 5);
        assert_eq!(operators[2].name, "Peter S.");
    }

    #[test]
    fn email_lookup_ignores_case() {
        let store = seed();
        let user = store.find_user_by_email("ANA.Coordinator@example.com").unwrap();
        assert_eq!(user.id, 2);
    }

    #[test]
    fn delete_reports_missing_rows() {
        let mut store = seed();
        assert!(store.delete_user(4));
        assert!(!store.delete_user(4));
        assert!(store.get_user(4).is_none());
    }

    #[test]
    fn deleting_operators_and_definitions_keeps_order() {
        let mut store = seed();
        assert!(store.delete_operator(1002));
        assert!(!store.delete_operator(1002));
        let ids: Vec<u32> = store.list_operators().iter().map(|op| op.id).collect();
        assert_eq!(ids, vec![1001, 1003, 1004, 1005]);

        assert!(store.delete_definition("Abs"));
        assert!(!store.delete_definition("abs"));
        let names: Vec<String> = store
            .list_definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names, vec!["CSAT", "FCR", "Callback 24h", "AHT"]);
        assert_eq!(store.active_definitions().len(), 4);
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = seed();
        store.mark_setup_complete();
        store.save_snapshot(&path).unwrap();

        let reopened = InMemoryStore::open(Some(&path)).unwrap();
        assert!(reopened.setup_complete());
        assert_eq!(reopened.list_operators(), store.list_operators());
    }

    #[test]
    fn open_without_snapshot_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryStore::open(Some(&dir.path().join("missing.json"))).unwrap();
        assert_eq!(store.list_users().len(), 5);
    }
}
