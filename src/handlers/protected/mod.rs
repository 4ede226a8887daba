// handlers/protected/mod.rs - Protected handlers (JWT + active tenant required)
//
// Every handler here receives a `TenantContext` from `validate_tenant_middleware`
// and runs its SQL against that tenant's schema only.

pub mod auth; // /api/auth/*
pub mod cash_flow; // /api/cash-flow/*
pub mod clients; // /api/clients/*
pub mod dashboard; // /api/dashboard
pub mod find; // /api/find/:resource
pub mod invoices; // /api/invoices/*
pub mod projects; // /api/projects/*
pub mod publications; // /api/publications/*
pub mod tasks; // /api/tasks/*
pub mod users; // /api/users/*
