// handlers/elevated/root/tenant/mod.rs - Firm lifecycle management

pub mod create;
pub mod delete;
pub mod health;
pub mod list;
pub mod migrate;
pub mod restore;
pub mod show;
pub mod update;

pub use create::tenant_create;
pub use delete::tenant_delete;
pub use health::tenant_health;
pub use list::tenant_list;
pub use migrate::tenant_migrate;
pub use restore::tenant_restore;
pub use show::tenant_show;
pub use update::tenant_update;
