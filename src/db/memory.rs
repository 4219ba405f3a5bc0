use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;
use tracing::debug;

use super::store::{doc_id, Collection, DocumentStore, Filter, StoreError};


#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a snapshot shaped as `{ "<collection>": [doc, ...], ... }`.
    pub fn from_snapshot(snapshot: &Value) -> Result<Self, StoreError> {
        let store = Self::new();
        let Some(object) = snapshot.as_object() else {
            return Err(StoreError::Backend("snapshot must be a JSON object".to_string()));
        };

        {
            let mut collections = store.collections.write();
            for (name, docs) in object {
                let collection: Collection = name
                    .parse()
                    .map_err(|_| StoreError::Backend(format!("unknown collection: {}", name)))?;
                let entries = collections.entry(collection).or_default();
                for doc in docs.as_array().into_iter().flatten() {
                    entries.insert(doc_id(doc)?, doc.clone());
                }
            }
        }

        Ok(store)
    }

    pub fn snapshot(&self) -> Value {
        let collections = self.collections.read();
        let mut object = Map::new();
        for collection in Collection::iter() {
            if let Some(docs) = collections.get(&collection) {
                if !docs.is_empty() {
                    object.insert(
                        collection.name().to_string(),
                        Value::Array(docs.values().cloned().collect()),
                    );
                }
            }
        }
        Value::Object(object)
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .get(&collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: Collection, doc: Value) -> Result<(), StoreError> {
        let id = doc_id(&doc)?;
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .insert(id, doc);
        Ok(())
    }

    async fn update(&self, collection: Collection, doc: Value) -> Result<(), StoreError> {
        let id = doc_id(&doc)?;
        let mut collections = self.collections.write();
        match collections.get_mut(&collection).and_then(|docs| docs.get_mut(&id)) {
            Some(existing) => {
                *existing = doc;
                Ok(())
            }
            None => Err(StoreError::NotFound(collection.name(), id)),
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .collections
            .write()
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if !removed {
            debug!("delete {}/{}: already absent", collection.name(), id);
        }
        Ok(removed)
    }

    async fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::Backend(format!(
                "refusing unfiltered delete on {}",
                collection.name()
            )));
        }
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, d| !filter.matches(d));
        Ok(before - docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_and_delete_where() {
        let store = InMemoryStore::new();
        store.insert(Collection::Tags, json!({"id": "t1", "team": "a"})).await.unwrap();
        store.insert(Collection::Tags, json!({"id": "t2", "team": "a"})).await.unwrap();
        store.insert(Collection::Tags, json!({"id": "t3", "team": "b"})).await.unwrap();

        assert_eq!(store.count(Collection::Tags, &Filter::by("team", "a")).await.unwrap(), 2);
        assert_eq!(store.delete_where(Collection::Tags, &Filter::by("team", "a")).await.unwrap(), 2);
        assert_eq!(store.delete_where(Collection::Tags, &Filter::by("team", "a")).await.unwrap(), 0);
        assert!(store.delete(Collection::Tags, "t3").await.unwrap());
        assert!(!store.delete(Collection::Tags, "t3").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let store = InMemoryStore::new();
        let err = store
            .update(Collection::Teams, json!({"id": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("teams", _)));
    }

    #[tokio::test]
    async fn test_unfiltered_delete_rejected() {
        let store = InMemoryStore::new();
        assert!(store.delete_where(Collection::Tags, &Filter::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let store = InMemoryStore::new();
        store.insert(Collection::Surveys, json!({"id": "s1"})).await.unwrap();
        let restored = InMemoryStore::from_snapshot(&store.snapshot()).unwrap();
        assert_eq!(restored.len(Collection::Surveys), 1);
        assert!(InMemoryStore::from_snapshot(&json!({"nope": []})).is_err());
    }
}
