use thiserror::Error;

/// Rejected registry or lookup operation. The store is left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("KPI \"{0}\" already exists")]
    DuplicateKpi(String),

    #[error("KPI \"{0}\" not found")]
    KpiNotFound(String),

    #[error("KPI \"{name}\" has thresholds out of order (regular {regular}, critical {critical}, inverse {inverse})")]
    InconsistentThresholds {
        name: String,
        regular: f64,
        critical: f64,
        inverse: bool,
    },

    #[error("a user with email \"{0}\" already exists")]
    DuplicateEmail(String),

    #[error("user {0} not found")]
    UserNotFound(u32),

    #[error("user {user_id} is still referenced by {operators} operator(s)")]
    UserInUse { user_id: u32, operators: usize },

    #[error("operator {0} not found")]
    OperatorNotFound(u32),
}

/// The import file could not be read as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("missing header row")]
    MissingHeader,

    #[error("header must start with id,name,email (found \"{0}\")")]
    InvalidHeader(String),

    #[error("unreadable file: {0}")]
    Codec(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("user not found")]
    UnknownUser,

    #[error("invalid password")]
    InvalidPassword,
}
