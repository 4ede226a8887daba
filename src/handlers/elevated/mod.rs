// handlers/elevated/mod.rs - Elevated handlers (root JWT required)
//
// Platform administration that spans firms. Routes live under /api/root/* and sit
// behind jwt_auth_middleware + require_root_middleware.

pub mod root;
