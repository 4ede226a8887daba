// handlers/public/mod.rs - Public handlers (no authentication)
//
// Token acquisition and self-service firm signup.

pub mod auth;
