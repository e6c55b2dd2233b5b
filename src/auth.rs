use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::User;
use crate::store::UserStore;

/// Demo login: the root account has its own password, everyone else shares
/// the fallback one.
pub fn authenticate<S: UserStore>(
    store: &S,
    auth: &AuthConfig,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = store.find_user_by_email(email).ok_or(AuthError::UnknownUser)?;

    let expected = if user.email.eq_ignore_ascii_case(&auth.root_email) {
        &auth.root_password
    } else {
        &auth.fallback_password
    };

    if password == expected {
        debug!(user_id = user.id, "login accepted");
        Ok(user)
    } else {
        Err(AuthError::InvalidPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed;

    #[test]
    fn accepts_fallback_password_for_regular_accounts() {
        let store = seed();
        let user = authenticate(&store, &AuthConfig::default(), "Walter.Supervisor@example.com", "password123").unwrap();
        assert_eq!(user.id, 3);
    }

    #[test]
    fn root_account_uses_its_own_password() {
        let store = seed();
        let auth = AuthConfig::default();
        assert_eq!(
            authenticate(&store, &auth, "root@example.com", "password123"),
            Err(AuthError::InvalidPassword)
        );
        assert_eq!(authenticate(&store, &auth, "root@example.com", "Adm*2@2026").unwrap().id, 5);
    }

    #[test]
    fn unknown_email_is_reported() {
        let store = seed();
        assert_eq!(
            authenticate(&store, &AuthConfig::default(), "nobody@example.com", "password123"),
            Err(AuthError::UnknownUser)
        );
    }
}
