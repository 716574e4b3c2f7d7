// LanceDB-backed vector store
// Handles persistence and similarity search for embedded chunks


use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info};

use super::{ChunkRecord, ScoredChunk, VectorIndex};
use crate::{RagError, Result};

const TABLE_NAME: &str = "chunks";

// Placeholder until the real dimension is known from the first insert
const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// Persistent vector store over a LanceDB directory
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
    db_path: PathBuf,
}

impl VectorStore {
    /// Create (or overwrite) a store directory for indexing.
    ///
    /// Any existing chunks table is dropped, so re-indexing into the same
    /// directory replaces the previous contents.
    #[inline]
    pub async fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let db_path = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&db_path)
            .map_err(|e| RagError::Store(format!("Failed to create store directory: {}", e)))?;

        let connection = Self::connect(&db_path).await?;

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: None,
            db_path,
        };

        store.drop_table_if_exists().await?;
        store.create_table(DEFAULT_VECTOR_DIMENSION).await?;

        info!("Vector store created at {}", store.db_path.display());
        Ok(store)
    }

    /// Open an existing store directory.
    ///
    /// Fails with [`RagError::StoreMissing`] when the directory has never
    /// been indexed or contains no chunks, so callers can tell the user to
    /// run the indexer first. No embedding client is required to open a
    /// store; listing its contents is a plain table scan.
    #[inline]
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let db_path = dir.as_ref().to_path_buf();

        if !db_path.is_dir() {
            return Err(RagError::StoreMissing(db_path));
        }

        let connection = Self::connect(&db_path).await?;

        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;

        if !table_names.contains(&TABLE_NAME.to_string()) {
            return Err(RagError::StoreMissing(db_path));
        }

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: None,
            db_path,
        };

        if store.count().await? == 0 {
            return Err(RagError::StoreMissing(store.db_path));
        }

        store.vector_dimension = Some(store.detect_vector_dimension().await?);

        debug!(
            "Opened vector store at {} with dimension {:?}",
            store.db_path.display(),
            store.vector_dimension
        );
        Ok(store)
    }

    async fn connect(db_path: &Path) -> Result<Connection> {
        let uri = format!("file://{}", db_path.display());
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to connect to LanceDB: {}", e)))
    }

    async fn create_table(&mut self, vector_dim: usize) -> Result<()> {
        let schema = self.create_schema(vector_dim);

        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(vector_dim);
        debug!("Chunks table created with {} dimensions", vector_dim);
        Ok(())
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            debug!("Dropping existing chunks table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RagError::Store(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    /// Detect vector dimension from the existing table schema
    async fn detect_vector_dimension(&self) -> Result<usize> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RagError::Store(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(RagError::Store(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self, vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("page_number", DataType::UInt32, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to open table: {}", e)))
    }

    fn create_record_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| RagError::Store("Vector dimension not set".to_string()))?;

        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut page_numbers = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(RagError::Store(format!(
                    "Vector dimension mismatch: expected {}, got {}",
                    vector_dim,
                    record.vector.len()
                )));
            }
            ids.push(record.id.as_str());
            contents.push(record.content.as_str());
            sources.push(record.source.as_str());
            page_numbers.push(record.page_number);
            chunk_indices.push(record.chunk_index);
            created_ats.push(record.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let schema = self.create_schema(vector_dim);

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| RagError::Store(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(page_numbers)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| RagError::Store(format!("Failed to create record batch: {}", e)))
    }

    fn parse_scored_batch(batch: &RecordBatch) -> Result<Vec<ScoredChunk>> {
        let contents = string_column(batch, "content")?;
        let sources = string_column(batch, "source")?;
        let page_numbers = u32_column(batch, "page_number")?;
        let chunk_indices = u32_column(batch, "chunk_index")?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            results.push(ScoredChunk {
                content: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                page_number: page_numbers.value(row),
                chunk_index: chunk_indices.value(row),
                distance,
                // Higher is better
                similarity: 1.0 - distance,
            });
        }

        Ok(results)
    }

    fn parse_record_batch(batch: &RecordBatch) -> Result<Vec<ChunkRecord>> {
        let ids = string_column(batch, "id")?;
        let contents = string_column(batch, "content")?;
        let sources = string_column(batch, "source")?;
        let page_numbers = u32_column(batch, "page_number")?;
        let chunk_indices = u32_column(batch, "chunk_index")?;
        let created_ats = string_column(batch, "created_at")?;

        let vectors = batch
            .column_by_name("vector")
            .ok_or_else(|| RagError::Store("Missing vector column".to_string()))?
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| RagError::Store("Invalid vector column type".to_string()))?;

        let mut records = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let vector_values = vectors.value(row);
            let vector = vector_values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| RagError::Store("Invalid vector item type".to_string()))?
                .values()
                .to_vec();

            records.push(ChunkRecord {
                id: ids.value(row).to_string(),
                vector,
                content: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                page_number: page_numbers.value(row),
                chunk_index: chunk_indices.value(row),
                created_at: created_ats.value(row).to_string(),
            });
        }

        Ok(records)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Store(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Store(format!("Invalid {} column type", name)))
}

#[async_trait]
impl VectorIndex for VectorStore {
    #[inline]
    async fn add_chunks(&mut self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No chunks to store");
            return Ok(());
        }

        debug!("Storing batch of {} chunks", records.len());

        // The table is created with a placeholder dimension; recreate it once
        // the real dimension is known from the first batch
        let vector_dim = records[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            info!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.drop_table_if_exists().await?;
            self.create_table(vector_dim).await?;
        }

        let record_batch = self.create_record_batch(&records)?;
        let schema = record_batch.schema();

        let table = self.open_table().await?;
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to insert chunks: {}", e)))?;

        debug!("Stored {} chunks", records.len());
        Ok(())
    }

    #[inline]
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        let mut stream = query
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read result stream: {}", e)))?
        {
            results.extend(Self::parse_scored_batch(&batch)?);
        }

        debug!("Found {} search results", results.len());
        Ok(results)
    }

    #[inline]
    async fn all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        let table = self.open_table().await?;

        let mut stream = table
            .query()
            .execute()
            .await
            .map_err(|e| RagError::Store(format!("Failed to scan table: {}", e)))?;

        let mut records = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| RagError::Store(format!("Failed to read scan stream: {}", e)))?
        {
            records.extend(Self::parse_record_batch(&batch)?);
        }

        debug!("Scanned {} chunks", records.len());
        Ok(records)
    }

    #[inline]
    async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Store(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }
}
