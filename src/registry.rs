use tracing::{info, warn};

use crate::error::RegistryError;
use crate::models::{KpiDefinition, Role, User};
use crate::store::{KpiDefinitionStore, OperatorStore, UserStore};

/// Offset between a supervisor's user id and the team id assigned to them.
pub const TEAM_ID_OFFSET: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    pub name: String,
    pub email: String,
    pub role: Role,
}

fn rejected<T>(err: RegistryError) -> Result<T, RegistryError> {
    warn!(error = %err, "registry change rejected");
    Err(err)
}

fn check_thresholds(definition: &KpiDefinition) -> Result<(), RegistryError> {
    let thresholds = definition.thresholds;
    if thresholds.is_consistent() {
        Ok(())
    } else {
        rejected(RegistryError::InconsistentThresholds {
            name: definition.name.clone(),
            regular: thresholds.regular,
            critical: thresholds.critical,
            inverse: thresholds.inverse,
        })
    }
}

pub fn add_kpi<S: KpiDefinitionStore>(store: &mut S, definition: KpiDefinition) -> Result<(), RegistryError> {
    let taken = store
        .list_definitions()
        .iter()
        .any(|existing| existing.name.to_lowercase() == definition.name.to_lowercase());
    if taken {
        return rejected(RegistryError::DuplicateKpi(definition.name));
    }
    check_thresholds(&definition)?;

    info!(kpi = %definition.name, "KPI added");
    store.upsert_definition(definition);
    Ok(())
}

/// Replaces the definition with the same (exact) name.
pub fn update_kpi<S: KpiDefinitionStore>(store: &mut S, definition: KpiDefinition) -> Result<(), RegistryError> {
    if store.get_definition(&definition.name).is_none() {
        return rejected(RegistryError::KpiNotFound(definition.name));
    }
    check_thresholds(&definition)?;

    info!(kpi = %definition.name, "KPI updated");
    store.upsert_definition(definition);
    Ok(())
}

pub fn set_kpi_active<S: KpiDefinitionStore>(store: &mut S, name: &str, active: bool) -> Result<(), RegistryError> {
    let Some(mut definition) = store.get_definition(name) else {
        return rejected(RegistryError::KpiNotFound(name.to_string()));
    };
    definition.active = active;
    info!(kpi = %name, active, "KPI toggled");
    store.upsert_definition(definition);
    Ok(())
}

fn email_taken<S: UserStore>(store: &S, email: &str, except: Option<u32>) -> bool {
    store
        .list_users()
        .iter()
        .any(|user| Some(user.id) != except && user.email.to_lowercase() == email.to_lowercase())
}

/// Adds a user with the next free id. Supervisors get team `100 + id`.
pub fn invite_user<S: UserStore>(store: &mut S, invitation: Invitation) -> Result<User, RegistryError> {
    if email_taken(store, &invitation.email, None) {
        return rejected(RegistryError::DuplicateEmail(invitation.email));
    }

    let id = store.list_users().iter().map(|user| user.id).max().unwrap_or(0) + 1;
    let user = User {
        id,
        name: invitation.name,
        email: invitation.email,
        role: invitation.role,
        team_id: (invitation.role == Role::Supervisor).then_some(TEAM_ID_OFFSET + id),
    };

    info!(user_id = id, email = %user.email, role = %user.role, "user invited");
    store.upsert_user(user.clone());
    Ok(user)
}

pub fn update_user<S: UserStore>(store: &mut S, user: User) -> Result<(), RegistryError> {
    if store.get_user(user.id).is_none() {
        return rejected(RegistryError::UserNotFound(user.id));
    }
    if email_taken(store, &user.email, Some(user.id)) {
        return rejected(RegistryError::DuplicateEmail(user.email));
    }

    info!(user_id = user.id, "user updated");
    store.upsert_user(user);
    Ok(())
}

/// Deletes a user nobody references. Operators pointing at the user as
/// supervisor or coordinator block the delete.
pub fn delete_user<S>(store: &mut S, user_id: u32) -> Result<(), RegistryError>
where
    S: UserStore + OperatorStore,
{
    if store.get_user(user_id).is_none() {
        return rejected(RegistryError::UserNotFound(user_id));
    }

    let operators = store
        .list_operators()
        .iter()
        .filter(|operator| operator.supervisor_id == user_id || operator.coordinator_id == user_id)
        .count();
    if operators > 0 {
        return rejected(RegistryError::UserInUse { user_id, operators });
    }

    info!(user_id, "user deleted");
    store.delete_user(user_id);
    Ok(())
}
