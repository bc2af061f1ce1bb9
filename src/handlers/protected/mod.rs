// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route prefix: /api/*. The JWT middleware injects `AuthUser`; every handler
// extracts a `RequestContext` from it and delegates to the service layer,
// which performs team membership and role checks.

pub mod channels;
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
