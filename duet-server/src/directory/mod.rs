mod connection_directory;
mod room_registry;

pub use connection_directory::*;
pub use room_registry::*;
