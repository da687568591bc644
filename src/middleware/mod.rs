pub mod auth;
pub mod rbac;
pub mod maintenance;

pub use auth::{AuthUser, MaybeAuthUser};
pub use rbac::{RequireAdmin, RequireFormator};
pub use maintenance::maintenance_guard;
