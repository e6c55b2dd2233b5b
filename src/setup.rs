use tracing::info;

use crate::config::AuthConfig;
use crate::models::{Role, User};
use crate::registry::TEAM_ID_OFFSET;
use crate::store::{OperatorStore, SetupStore, UserStore};

/// Size of the demo roster; anything larger means setup already happened.
const SEED_USER_COUNT: usize = 5;

const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupPlan {
    pub coordinators: Vec<NewMember>,
    pub supervisors: Vec<NewMember>,
}

pub fn is_setup_needed<S: UserStore + SetupStore>(store: &S) -> bool {
    !store.setup_complete() && store.list_users().len() <= SEED_USER_COUNT
}

/// Replaces the demo organization: root admins stay, everyone else and all
/// operators are dropped, then the planned coordinators and supervisors are
/// created in order.
pub fn perform_initial_setup<S>(store: &mut S, auth: &AuthConfig, plan: SetupPlan) -> Vec<User>
where
    S: UserStore + OperatorStore + SetupStore,
{
    let mut users: Vec<User> = store
        .list_users()
        .into_iter()
        .filter(|user| {
            user.email.eq_ignore_ascii_case(BOOTSTRAP_ADMIN_EMAIL)
                || user.email.eq_ignore_ascii_case(&auth.root_email)
        })
        .collect();
    let mut next_id = users.iter().map(|user| user.id).max().unwrap_or(0) + 1;

    let planned = plan
        .coordinators
        .into_iter()
        .map(|member| (member, Role::Coordinator))
        .chain(plan.supervisors.into_iter().map(|member| (member, Role::Supervisor)));

    for (member, role) in planned {
        users.push(User {
            id: next_id,
            name: member.name,
            email: member.email,
            role,
            team_id: (role == Role::Supervisor).then_some(TEAM_ID_OFFSET + next_id),
        });
        next_id += 1;
    }

    info!(users = users.len(), "initial setup applied");
    store.replace_users(users.clone());
    store.replace_operators(Vec::new());
    store.mark_setup_complete();
    users
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed;

    fn member(name: &str) -> NewMember {
        NewMember {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[test]
    fn fresh_seed_needs_setup() {
        let mut store = seed();
        assert!(is_setup_needed(&store));
        store.mark_setup_complete();
        assert!(!is_setup_needed(&store));
    }

    #[test]
    fn setup_keeps_root_admins_and_rebuilds_roster() {
        let mut store = seed();
        let plan = SetupPlan {
            coordinators: vec![member("Clara")],
            supervisors: vec![member("Sam"), member("Rita")],
        };

        let users = perform_initial_setup(&mut store, &AuthConfig::default(), plan);
        let ids: Vec<u32> = users.iter().map(|user| user.id).collect();
        assert_eq!(ids, vec![1, 5, 6, 7, 8]);
        assert_eq!(users[2].role, Role::Coordinator);
        assert_eq!(users[2].team_id, None);
        assert_eq!(users[3].team_id, Some(107));
        assert_eq!(users[4].team_id, Some(108));

        assert!(store.list_operators().is_empty());
        assert_eq!(store.list_users(), users);
        assert!(!is_setup_needed(&store));
    }
}
