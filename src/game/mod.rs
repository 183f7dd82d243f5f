//! Game simulation modules

pub mod entities;
pub mod error;
pub mod physics;
pub mod publish;
pub mod registry;
pub mod room;
pub mod snapshot;
pub mod spawner;
pub mod task;

pub use entities::PlayerId;
pub use error::RoomError;
pub use publish::Publisher;
pub use registry::RoomRegistry;
pub use room::GameStatus;
pub use task::RoomInput;
