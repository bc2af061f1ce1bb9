// handlers/mod.rs - HTTP handlers by security tier
//
// Public (no auth) → Protected (JWT bearer, /api/*)
//
// Handlers stay thin: extract path/query/body, call the matching
// `services::*` operation, wrap the result in `ApiResponse`.

pub mod protected;
pub mod public;
