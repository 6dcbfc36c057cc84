pub mod events;
pub mod presence;
pub mod registry;
pub mod router;
pub mod server;
pub mod sessions;
