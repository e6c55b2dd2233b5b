use std::collections::{BTreeMap, HashSet};

use crate::config::AccessConfig;
use crate::models::{ExtendedTeam, Operator, Role, Team, User};
use crate::store::{OperatorStore, UserStore};

pub const UNASSIGNED_SUPERVISOR: &str = "Unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationGrant {
    Administrator,
    /// Coordinator listed in `access.global_coordinator_ids`.
    GlobalCoordinator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Organization(OrganizationGrant),
    Coordinator(u32),
    Supervisor(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessPolicy {
    pub user_id: u32,
    pub role: Role,
    pub scope: Scope,
}

impl AccessPolicy {
    pub fn for_user(user: &User, access: &AccessConfig) -> Self {
        let scope = match user.role {
            Role::Administrator => Scope::Organization(OrganizationGrant::Administrator),
            Role::Coordinator if access.global_coordinator_ids.contains(&user.id) => {
                Scope::Organization(OrganizationGrant::GlobalCoordinator)
            }
            Role::Coordinator => Scope::Coordinator(user.id),
            Role::Supervisor => Scope::Supervisor(user.id),
        };

        Self {
            user_id: user.id,
            role: user.role,
            scope,
        }
    }

    pub fn can_view(&self, operator: &Operator) -> bool {
        match self.scope {
            Scope::Organization(_) => true,
            Scope::Coordinator(id) => operator.coordinator_id == id,
            Scope::Supervisor(id) => operator.supervisor_id == id,
        }
    }

    /// Only supervisors may add operators, and only to their own team.
    pub fn can_create_operators(&self) -> bool {
        self.role == Role::Supervisor
    }

    pub fn can_manage_registry(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn visible_operators(&self, operators: &[Operator]) -> Vec<Operator> {
        operators
            .iter()
            .filter(|operator| self.can_view(operator))
            .cloned()
            .collect()
    }

    pub fn manageable_ids(&self, operators: &[Operator]) -> HashSet<u32> {
        operators
            .iter()
            .filter(|operator| self.can_view(operator))
            .map(|operator| operator.id)
            .collect()
    }

    pub fn visible_teams(&self, operators: &[Operator]) -> Vec<ExtendedTeam> {
        group_teams(&self.visible_operators(operators))
    }

    pub fn visible_users(&self, users: &[User]) -> Vec<User> {
        match self.scope {
            Scope::Organization(OrganizationGrant::Administrator) => users.to_vec(),
            _ => users
                .iter()
                .filter(|user| user.id == self.user_id)
                .cloned()
                .collect(),
        }
    }
}

/// Groups operators by team id, keeping first-appearance order.
pub fn group_teams(operators: &[Operator]) -> Vec<ExtendedTeam> {
    let mut teams: Vec<ExtendedTeam> = Vec::new();

    for operator in operators {
        match teams.iter_mut().find(|team| team.team.id == operator.team_id) {
            Some(team) => {
                team.team.member_count += 1;
                team.operators.push(operator.clone());
            }
            None => teams.push(ExtendedTeam {
                team: Team {
                    id: operator.team_id,
                    name: operator.team_name.clone(),
                    supervisor_id: operator.supervisor_id,
                    supervisor_name: operator.supervisor_name.clone(),
                    member_count: 1,
                },
                operators: vec![operator.clone()],
            }),
        }
    }

    teams
}

/// Organization-wide team listing with supervisor names taken from the user store.
pub fn all_teams<S>(store: &S) -> Vec<Team>
where
    S: OperatorStore + UserStore,
{
    let mut teams: BTreeMap<u32, Team> = BTreeMap::new();

    for operator in store.list_operators() {
        let team = teams.entry(operator.team_id).or_insert_with(|| Team {
            id: operator.team_id,
            name: operator.team_name.clone(),
            supervisor_id: operator.supervisor_id,
            supervisor_name: store
                .get_user(operator.supervisor_id)
                .map(|user| user.name)
                .unwrap_or_else(|| UNASSIGNED_SUPERVISOR.to_string()),
            member_count: 0,
        });
        team.member_count += 1;
    }

    teams.into_values().collect()
}
