use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use conduit_common::Result;

use crate::traits::{entity_not_found, GraphStore};

struct Entity {
    labels: Vec<String>,
    properties: HashMap<String, String>,
}

/// Rule-based stand-in for a real graph database: entities and edges held
/// in memory, `search_entities` doing a substring match on id and property
/// values rather than anything semantic. Good enough to exercise the
/// Ingestion Orchestrator's graph-writing path without Neo4j running.
#[derive(Default)]
pub struct MockGraphStore {
    entities: RwLock<HashMap<String, Entity>>,
    edges: RwLock<Vec<(String, String, String)>>,
    episodes: RwLock<Vec<String>>,
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn add_entity(&self, id: &str, labels: &[String], properties: HashMap<String, String>) -> Result<()> {
        self.entities.write().unwrap().insert(
            id.to_string(),
            Entity {
                labels: labels.to_vec(),
                properties,
            },
        );
        Ok(())
    }

    async fn add_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
        _properties: HashMap<String, String>,
    ) -> Result<()> {
        let entities = self.entities.read().unwrap();
        if !entities.contains_key(source_id) {
            return Err(entity_not_found(source_id));
        }
        if !entities.contains_key(target_id) {
            return Err(entity_not_found(target_id));
        }
        drop(entities);
        self.edges.write().unwrap().push((
            source_id.to_string(),
            target_id.to_string(),
            relation_type.to_string(),
        ));
        Ok(())
    }

    async fn search_entities(&self, query: &str) -> Result<Vec<String>> {
        let needle = query.to_lowercase();
        let entities = self.entities.read().unwrap();
        let mut matches: Vec<String> = entities
            .iter()
            .filter(|(id, e)| {
                id.to_lowercase().contains(&needle)
                    || e.properties.values().any(|v| v.to_lowercase().contains(&needle))
            })
            .map(|(id, _)| id.clone())
            .collect();
        matches.sort();
        Ok(matches)
    }

    async fn get_neighbors(&self, id: &str) -> Result<Vec<String>> {
        let edges = self.edges.read().unwrap();
        let mut neighbors: HashSet<String> = HashSet::new();
        for (source, target, _) in edges.iter() {
            if source == id {
                neighbors.insert(target.clone());
            } else if target == id {
                neighbors.insert(source.clone());
            }
        }
        let mut out: Vec<String> = neighbors.into_iter().collect();
        out.sort();
        Ok(out)
    }

    async fn add_episode(&self, text: &str) -> Result<()> {
        self.episodes.write().unwrap().push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn relationship_to_missing_entity_is_rejected() {
        let store = MockGraphStore::new();
        store.add_entity("a", &["Service".to_string()], HashMap::new()).await.unwrap();
        let err = store
            .add_relationship("a", "missing", "CALLS", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, conduit_common::ConduitError::EntityNotFound { .. }));
    }

    #[tokio::test]
    async fn neighbors_are_symmetric_over_edges() {
        let store = MockGraphStore::new();
        store.add_entity("a", &[], HashMap::new()).await.unwrap();
        store.add_entity("b", &[], HashMap::new()).await.unwrap();
        store.add_relationship("a", "b", "CALLS", HashMap::new()).await.unwrap();
        assert_eq!(store.get_neighbors("a").await.unwrap(), vec!["b".to_string()]);
        assert_eq!(store.get_neighbors("b").await.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn search_matches_id_and_property_values() {
        let store = MockGraphStore::new();
        let mut props = HashMap::new();
        props.insert("name".to_string(), "User Service".to_string());
        store.add_entity("user-service", &["Service".to_string()], props).await.unwrap();
        assert_eq!(
            store.search_entities("user").await.unwrap(),
            vec!["user-service".to_string()]
        );
    }
}
