//! End-to-end ingestion: source rows to vectors in the index.
//!
//! Records are processed in fixed-size batches. Within a batch, records run
//! concurrently on a bounded pool and each one resolves to a
//! [`RecordOutcome`]; a failing record is reported and never stops the run.
//! Only setup steps (sampling the embedding dimension, provisioning the
//! index, opening the source) abort.

use crate::batch::partition;
use crate::compose::{compose_fragments, FragmentTemplates};
use crate::config::Settings;
use crate::embedding::{embed_all, Embedder};
use crate::error::{Error, Result};
use crate::index::{IndexEntry, IndexGateway, RecipeMetadata};
use crate::source::{self, ExtractedFields, RawRecord};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Texts embedded once per run to learn the model's dimensionality
pub const SAMPLE_TEXTS: &[&str] = &[
    "Sample document text goes here",
    "there will be several phrases in each batch",
];

/// Metadata fields the index is told to make filterable
pub const INDEXED_FIELDS: &[&str] = &["name", "description"];

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub index_name: String,
    /// Only the first `record_limit` rows of the source are ingested
    pub record_limit: usize,
    pub batch_size: usize,
    /// Records of one batch in flight at once
    pub concurrency: usize,
    pub indexed_fields: Vec<String>,
    pub templates: FragmentTemplates,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            index_name: "recipes".to_string(),
            record_limit: 1600,
            batch_size: 32,
            concurrency: 32,
            indexed_fields: INDEXED_FIELDS.iter().map(|f| f.to_string()).collect(),
            templates: FragmentTemplates::default(),
        }
    }
}

impl IngestOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            index_name: settings.pinecone.index_name.clone(),
            record_limit: settings.ingest.record_limit,
            batch_size: settings.ingest.batch_size,
            concurrency: settings.ingest.concurrency,
            ..Default::default()
        }
    }
}

/// Pipeline stage a record failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Read,
    Compose,
    Embed,
    Upsert,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            FailureStage::Read => "read",
            FailureStage::Compose => "compose",
            FailureStage::Embed => "embed",
            FailureStage::Upsert => "upsert",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// Recipe id, or `row N` when the row could not be parsed
    pub record_id: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Result of processing one record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Indexed { record_id: String, vectors: usize },
    Failed(RecordFailure),
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub index_name: String,
    pub dimension: usize,
    pub index_created: bool,
    pub records_read: usize,
    pub records_indexed: usize,
    pub vectors_upserted: usize,
    pub batches: usize,
    pub failed: Vec<RecordFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.record_id.as_str()).collect()
    }
}

/// Drives the ingestion pipeline
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    gateway: IndexGateway,
    options: IngestOptions,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, gateway: IndexGateway, options: IngestOptions) -> Self {
        Self {
            embedder,
            gateway,
            options,
        }
    }

    /// Ingest the first `record_limit` rows of the file at `path`
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
        let started_at = Utc::now();
        let (dimension, index_created) = self.prepare().await?;

        let rows = source::read_prefix(path, self.options.record_limit).await?;

        self.process(rows, dimension, index_created, started_at).await
    }

    /// Ingest rows that were already read
    pub async fn run_records(&self, rows: Vec<Result<RawRecord>>) -> Result<IngestReport> {
        let started_at = Utc::now();
        let (dimension, index_created) = self.prepare().await?;

        let rows = rows.into_iter().take(self.options.record_limit).collect();

        self.process(rows, dimension, index_created, started_at).await
    }

    /// Embedding dimensionality, learned from one sample request
    pub async fn detect_dimension(&self) -> Result<usize> {
        let samples: Vec<String> = SAMPLE_TEXTS.iter().map(|s| s.to_string()).collect();
        let vectors = embed_all(self.embedder.as_ref(), &samples).await?;

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(Error::EmbeddingService {
                status: None,
                payload: "Sample embedding returned no dimensions".to_string(),
            });
        }

        Ok(dimension)
    }

    async fn prepare(&self) -> Result<(usize, bool)> {
        if self.options.batch_size == 0 || self.options.concurrency == 0 {
            return Err(Error::Validation(
                "Batch size and concurrency must be greater than zero".to_string(),
            ));
        }

        let dimension = self.detect_dimension().await?;
        info!(
            "Embedding model {} produces {} dimensions",
            self.embedder.model(),
            dimension
        );

        let created = self
            .gateway
            .ensure_index(&self.options.index_name, dimension, &self.options.indexed_fields)
            .await?;

        Ok((dimension, created))
    }

    async fn process(
        &self,
        rows: Vec<Result<RawRecord>>,
        dimension: usize,
        index_created: bool,
        started_at: DateTime<Utc>,
    ) -> Result<IngestReport> {
        let timer = Instant::now();
        let records_read = rows.len();
        let mut failed = Vec::new();
        let mut records = Vec::with_capacity(rows.len());

        for (row, result) in rows.into_iter().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Skipping row {}: {}", row + 1, e);
                    failed.push(RecordFailure {
                        record_id: format!("row {}", row + 1),
                        stage: FailureStage::Read,
                        message: e.to_string(),
                    });
                }
            }
        }

        let batches = partition(records, self.options.batch_size)?;
        let total_batches = batches.len();
        let mut records_indexed = 0;
        let mut vectors_upserted = 0;

        info!(
            "Ingesting {} records into {} in {} batches of up to {}",
            records_read - failed.len(),
            self.options.index_name,
            total_batches,
            self.options.batch_size
        );

        for (number, batch) in batches.into_iter().enumerate() {
            let outcomes: Vec<RecordOutcome> = stream::iter(batch)
                .map(|record| self.process_record(record, dimension))
                .buffer_unordered(self.options.concurrency)
                .collect()
                .await;

            let mut batch_indexed = 0;
            let mut batch_failed = 0;
            for outcome in outcomes {
                match outcome {
                    RecordOutcome::Indexed { vectors, .. } => {
                        batch_indexed += 1;
                        vectors_upserted += vectors;
                    }
                    RecordOutcome::Failed(failure) => {
                        batch_failed += 1;
                        failed.push(failure);
                    }
                }
            }
            records_indexed += batch_indexed;

            info!(
                "Batch {}/{} complete: {} indexed, {} failed",
                number + 1,
                total_batches,
                batch_indexed,
                batch_failed
            );
        }

        info!(
            "Ingestion finished in {:?}: {} records indexed, {} vectors upserted, {} failures",
            timer.elapsed(),
            records_indexed,
            vectors_upserted,
            failed.len()
        );

        Ok(IngestReport {
            index_name: self.options.index_name.clone(),
            dimension,
            index_created,
            records_read,
            records_indexed,
            vectors_upserted,
            batches: total_batches,
            failed,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Extract, compose, embed and upsert one record
    pub async fn process_record(&self, record: RawRecord, dimension: usize) -> RecordOutcome {
        let record_id = record.id.trim().to_string();
        let fail = |stage: FailureStage, message: String| {
            warn!("Record {} failed at {}: {}", record_id, stage, message);
            RecordOutcome::Failed(RecordFailure {
                record_id: record_id.clone(),
                stage,
                message,
            })
        };

        if record_id.is_empty() {
            return fail(FailureStage::Compose, "Record has no id".to_string());
        }

        let fields = ExtractedFields::from_record(&record);
        let fragments = compose_fragments(&record, &fields, &self.options.templates);
        if fragments.is_empty() {
            return fail(FailureStage::Compose, "Record produced no text fragments".to_string());
        }

        let embeddings = match embed_all(self.embedder.as_ref(), &fragments).await {
            Ok(embeddings) => embeddings,
            Err(e) => return fail(FailureStage::Embed, e.to_string()),
        };

        if embeddings.len() != fragments.len() {
            return fail(
                FailureStage::Embed,
                format!(
                    "Got {} embeddings for {} fragments",
                    embeddings.len(),
                    fragments.len()
                ),
            );
        }

        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimension) {
            return fail(
                FailureStage::Embed,
                format!("Embedding has {} dimensions, index expects {}", bad.len(), dimension),
            );
        }

        let metadata = RecipeMetadata::new(&record, fields);
        let entries: Vec<IndexEntry> = embeddings
            .into_iter()
            .enumerate()
            .map(|(slot, values)| IndexEntry {
                id: record_id.clone(),
                slot,
                values,
                metadata: metadata.clone(),
            })
            .collect();

        match self.gateway.upsert(&self.options.index_name, entries).await {
            Ok(vectors) => {
                debug!("Indexed record {} ({} vectors)", record_id, vectors);
                RecordOutcome::Indexed {
                    record_id: record_id.clone(),
                    vectors,
                }
            }
            Err(e) => fail(FailureStage::Upsert, e.to_string()),
        }
    }
}
