mod app;
mod config;
mod directory;
mod hub;
mod signaling;

pub use app::*;
pub use config::*;
pub use directory::*;
pub use hub::*;
pub use signaling::*;
