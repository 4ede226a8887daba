// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login; // POST /auth/login
pub mod refresh; // POST /auth/refresh
pub mod register; // POST /auth/register

pub use login::login_post;
pub use refresh::refresh_post;
pub use register::register_post;
