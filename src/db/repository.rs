use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::store::{Collection, DocumentStore, Filter, StoreError};


pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}


/// Typed access to a [`DocumentStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn get<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn require<T: Entity>(&self, id: &str) -> Result<T, StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(T::COLLECTION.name(), id.to_string()))
    }

    pub async fn find<T: Entity>(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn find_by<T: Entity>(&self, field: &str, value: impl Into<Value>) -> Result<Vec<T>, StoreError> {
        self.find(&Filter::by(field, value)).await
    }

    /// Upsert.
    pub async fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        self.store.insert(T::COLLECTION, serde_json::to_value(entity)?).await
    }

    pub async fn update<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        self.store.update(T::COLLECTION, serde_json::to_value(entity)?).await
    }

    pub async fn delete<T: Entity>(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        self.store.delete_where(collection, filter).await
    }

    pub async fn count(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        self.store.count(collection, filter).await
    }
}
