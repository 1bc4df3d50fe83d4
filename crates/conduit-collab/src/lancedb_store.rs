use std::sync::Arc;

use arrow_array::{Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use conduit_common::{ChunkId, ConduitError, Result};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};

use crate::traits::VectorStore;

fn storage_error(operation: &str, message: impl std::fmt::Display) -> ConduitError {
    ConduitError::Storage {
        operation: operation.to_string(),
        message: message.to_string(),
        retryable: false,
        retry_after: None,
    }
}

/// `LanceDB`-backed vector store. The table is created lazily on first
/// insert, once the embedding dimension is known.
pub struct LanceDbVectorStore {
    db: Connection,
    table_name: String,
    table: tokio::sync::Mutex<Option<Table>>,
    dimension: usize,
}

impl LanceDbVectorStore {
    pub async fn connect(uri: &str, table_name: &str, dimension: usize) -> Result<Self> {
        let db = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| storage_error("connect", e))?;
        let table = db.open_table(table_name).execute().await.ok();
        Ok(LanceDbVectorStore {
            db,
            table_name: table_name.to_string(),
            table: tokio::sync::Mutex::new(table),
            dimension,
        })
    }

    fn schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimension as i32),
                false,
            ),
        ]))
    }

    async fn ensure_table(&self) -> Result<Table> {
        let mut guard = self.table.lock().await;
        if let Some(t) = guard.as_ref() {
            return Ok(t.clone());
        }
        let schema = Self::schema(self.dimension);
        let empty = RecordBatchIterator::new(vec![].into_iter().map(Ok), schema.clone());
        let table = self
            .db
            .create_table(&self.table_name, Box::new(empty))
            .execute()
            .await
            .map_err(|e| storage_error("create_table", e))?;
        *guard = Some(table.clone());
        Ok(table)
    }
}

#[async_trait]
impl VectorStore for LanceDbVectorStore {
    async fn insert(&self, chunk_id: &ChunkId, vector: Vec<f32>, content: String) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(ConduitError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let table = self.ensure_table().await?;
        let schema = Self::schema(self.dimension);
        let id_array = StringArray::from(vec![chunk_id.as_str().to_string()]);
        let content_array = StringArray::from(vec![content]);
        let vector_array = Float32Array::from(vector);
        let vector_list = arrow_array::FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.dimension as i32,
            Arc::new(vector_array),
            None,
        )
        .map_err(|e| storage_error("insert", e))?;
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(id_array), Arc::new(content_array), Arc::new(vector_list)],
        )
        .map_err(|e| storage_error("insert", e))?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(Box::new(reader))
            .execute()
            .await
            .map_err(|e| storage_error("insert", e))?;
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<(ChunkId, f32)>> {
        let table = self.ensure_table().await?;
        let results = table
            .query()
            .nearest_to(query_vector)
            .map_err(|e| storage_error("search", e))?
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| storage_error("search", e))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| storage_error("search", e))?;

        let mut out = Vec::new();
        for batch in results {
            let ids = batch
                .column_by_name("chunk_id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| storage_error("search", "missing chunk_id column"))?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            for i in 0..batch.num_rows() {
                let id = ChunkId::from_raw(ids.value(i).to_string());
                let score = distances.map(|d| 1.0 - d.value(i)).unwrap_or(0.0);
                out.push((id, score));
            }
        }
        Ok(out)
    }

    async fn delete(&self, chunk_id: &ChunkId) -> Result<()> {
        let table = self.ensure_table().await?;
        table
            .delete(&format!("chunk_id = '{}'", chunk_id.as_str()))
            .await
            .map_err(|e| storage_error("delete", e))?;
        Ok(())
    }
}
