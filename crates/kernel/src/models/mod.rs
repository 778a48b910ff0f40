//! Database models.

pub mod menu;
pub mod resource;
pub mod role;
pub mod user;

pub use menu::Menu;
pub use resource::Resource;
pub use role::Role;
pub use user::User;
