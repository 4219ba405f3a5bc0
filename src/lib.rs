pub mod core;
pub mod db;
pub mod survey;
pub mod trash;
pub mod utils;


pub use core::config::TrashConfig;
pub use core::error::{Result, TrashError};
pub use db::{DocumentStore, InMemoryStore, Repository, StoreError};
pub use trash::{Sweeper, TrashManager, TrashRecord, TrashStage, TrashTarget};
