pub mod access;
pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod feedback;
pub mod history;
pub mod import;
pub mod models;
pub mod notifications;
pub mod registry;
pub mod report;
pub mod setup;
pub mod store;
pub mod tier;
