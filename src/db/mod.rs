pub mod memory;
pub mod repository;
pub mod retry;
pub mod store;

pub use memory::InMemoryStore;
pub use repository::{Entity, Repository};
pub use retry::RetryingStore;
pub use store::{Collection, DocumentStore, Filter, StoreError};
