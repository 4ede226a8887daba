// handlers/mod.rs - Handlers grouped by security tier
//
// Public (no auth) → Protected (JWT + active tenant) → Elevated (root JWT)

pub mod elevated; // /api/root/*
pub mod protected; // /api/*
pub mod public; // /auth/*
