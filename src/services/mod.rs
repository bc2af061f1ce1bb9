//! Service layer: every operation authorizes the caller through `access`
//! and then reads or writes records through the typed repositories.

pub mod access;
pub mod channels;
pub mod context;
pub mod documents;
pub mod labels;
pub mod members;
pub mod messages;
pub mod projects;
pub mod reports;
pub mod storages;
pub mod tasks;
pub mod teams;
pub mod templates;
pub mod users;
pub mod validation;

pub use context::RequestContext;
