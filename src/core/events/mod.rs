pub mod base;
pub mod bus;

pub use base::{Event, TrashEventKind};
pub use bus::{EventBus, EventHandler};
