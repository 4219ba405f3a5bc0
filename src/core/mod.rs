pub mod config;
pub mod error;
pub mod events;

pub use config::TrashConfig;
pub use error::{Result, TrashError};
pub use events::{Event, EventBus, EventHandler, TrashEventKind};
