use std::collections::HashMap;

use async_trait::async_trait;
use conduit_common::{ConduitError, Result};
use neo4rs::{query, ConfigBuilder, Graph};

use crate::traits::GraphStore;

fn storage_error(operation: &str, e: neo4rs::Error) -> ConduitError {
    ConduitError::Storage {
        operation: operation.to_string(),
        message: e.to_string(),
        retryable: true,
        retry_after: None,
    }
}

/// Thin wrapper around `neo4rs::Graph`, mirroring the connection setup and
/// `query().param(...)` chaining idiom used by the graph client this is
/// modeled on.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .build()
            .map_err(|e| ConduitError::Config(e.to_string()))?;
        let graph = Graph::connect(config).await.map_err(|e| storage_error("connect", e))?;
        Ok(Neo4jGraphStore { graph })
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn add_entity(&self, id: &str, labels: &[String], properties: HashMap<String, String>) -> Result<()> {
        let label_clause = if labels.is_empty() {
            "Entity".to_string()
        } else {
            labels.join(":")
        };
        let q = query(&format!("MERGE (e:{label_clause} {{id: $id}}) SET e += $properties"))
            .param("id", id)
            .param("properties", properties);
        let mut stream = self.graph.execute(q).await.map_err(|e| storage_error("add_entity", e))?;
        while stream.next().await.map_err(|e| storage_error("add_entity", e))?.is_some() {}
        Ok(())
    }

    async fn add_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
        properties: HashMap<String, String>,
    ) -> Result<()> {
        let q = query(&format!(
            "MATCH (a {{id: $source}}), (b {{id: $target}})
             MERGE (a)-[r:{relation_type}]->(b) SET r += $properties
             RETURN a.id AS a"
        ))
        .param("source", source_id)
        .param("target", target_id)
        .param("properties", properties);
        let mut stream = self.graph.execute(q).await.map_err(|e| storage_error("add_relationship", e))?;
        let matched = stream
            .next()
            .await
            .map_err(|e| storage_error("add_relationship", e))?;
        if matched.is_none() {
            return Err(ConduitError::EntityNotFound {
                id: format!("{source_id} or {target_id}"),
            });
        }
        Ok(())
    }

    async fn search_entities(&self, query_text: &str) -> Result<Vec<String>> {
        let q = query("MATCH (e) WHERE e.id CONTAINS $q RETURN e.id AS id").param("q", query_text);
        let mut stream = self.graph.execute(q).await.map_err(|e| storage_error("search_entities", e))?;
        let mut ids = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| storage_error("search_entities", e))? {
            if let Ok(id) = row.get::<String>("id") {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn get_neighbors(&self, id: &str) -> Result<Vec<String>> {
        let q = query("MATCH (e {id: $id})--(n) RETURN DISTINCT n.id AS id").param("id", id);
        let mut stream = self.graph.execute(q).await.map_err(|e| storage_error("get_neighbors", e))?;
        let mut ids = Vec::new();
        while let Some(row) = stream.next().await.map_err(|e| storage_error("get_neighbors", e))? {
            if let Ok(id) = row.get::<String>("id") {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn add_episode(&self, text: &str) -> Result<()> {
        let q = query("CREATE (:Episode {text: $text, created_at: datetime()})").param("text", text);
        let mut stream = self.graph.execute(q).await.map_err(|e| storage_error("add_episode", e))?;
        while stream.next().await.map_err(|e| storage_error("add_episode", e))?.is_some() {}
        Ok(())
    }
}
