#![allow(dead_code)]

use async_trait::async_trait;
use recipe_search::config::{
    IngestConfig, OpenAiConfig, PineconeConfig, ServerConfig, Settings, UpstreamConfig,
};
use recipe_search::embedding::Embedder;
use recipe_search::index::{IndexEntry, IndexSpec, QueryMatch, VectorStore};
use recipe_search::source::RawRecord;
use recipe_search::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of embed starts and upsert completions shared by the fakes
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Deterministic embedder: each vector counts characters into `dimension` buckets
pub struct FakeEmbedder {
    pub dimension: usize,
    pub batch_limit: usize,
    /// Inputs containing this text make the whole request fail
    pub fail_on: Option<String>,
    /// Inputs containing this text get a vector of the wrong length
    pub short_on: Option<String>,
    pub delay: Duration,
    pub calls: Mutex<Vec<Vec<String>>>,
    pub events: Option<EventLog>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            batch_limit: 2048,
            fail_on: None,
            short_on: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            events: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn short_on(mut self, text: &str) -> Self {
        self.short_on = Some(text.to_string());
        self
    }

    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for c in text.to_lowercase().chars() {
            vector[c as usize % self.dimension] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() || inputs.len() > self.batch_limit {
            return Err(Error::Validation(format!(
                "Embedding batch of {} exceeds limit {}",
                inputs.len(),
                self.batch_limit
            )));
        }

        self.calls.lock().unwrap().push(inputs.to_vec());
        if let Some(events) = &self.events {
            events.lock().unwrap().push(format!("embed {}", inputs[0]));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(fail_on) = &self.fail_on {
            if inputs.iter().any(|input| input.contains(fail_on.as_str())) {
                return Err(Error::EmbeddingService {
                    status: Some(400),
                    payload: format!("refusing to embed {fail_on}"),
                });
            }
        }

        Ok(inputs
            .iter()
            .map(|input| match &self.short_on {
                Some(short) if input.contains(short.as_str()) => vec![1.0],
                _ => self.vector_for(input),
            })
            .collect())
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    fn model(&self) -> &str {
        "fake-embedding"
    }
}

#[derive(Default)]
struct StoredIndex {
    spec: Option<IndexSpec>,
    vectors: HashMap<String, IndexEntry>,
}

/// In-memory vector store with call accounting
#[derive(Default)]
pub struct MemoryStore {
    indexes: Mutex<HashMap<String, StoredIndex>>,
    pub create_calls: AtomicUsize,
    pub upserts: Mutex<Vec<Vec<IndexEntry>>>,
    /// Upserts for this recipe id fail
    pub reject_id: Option<String>,
    pub events: Option<EventLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(id: &str) -> Self {
        Self {
            reject_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn recording(events: EventLog) -> Self {
        Self {
            events: Some(events),
            ..Default::default()
        }
    }

    pub fn with_index(name: &str, dimension: usize) -> Self {
        let store = Self::default();
        store.indexes.lock().unwrap().insert(
            name.to_string(),
            StoredIndex {
                spec: Some(IndexSpec {
                    name: name.to_string(),
                    dimension,
                    metric: "cosine".to_string(),
                    indexed_fields: vec![],
                }),
                vectors: HashMap::new(),
            },
        );
        store
    }

    pub fn spec(&self, name: &str) -> Option<IndexSpec> {
        self.indexes
            .lock()
            .unwrap()
            .get(name)
            .and_then(|index| index.spec.clone())
    }

    pub fn stored_vectors(&self, name: &str) -> Vec<IndexEntry> {
        let indexes = self.indexes.lock().unwrap();
        let mut entries: Vec<IndexEntry> = indexes
            .get(name)
            .map(|index| index.vectors.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.vector_id());
        entries
    }

    pub fn upsert_batches(&self) -> Vec<Vec<IndexEntry>> {
        self.upserts.lock().unwrap().clone()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        Ok(self.indexes.lock().unwrap().keys().cloned().collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.indexes.lock().unwrap().insert(
            spec.name.clone(),
            StoredIndex {
                spec: Some(spec.clone()),
                vectors: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, index: &str, entries: &[IndexEntry]) -> Result<usize> {
        if let Some(reject) = &self.reject_id {
            if entries.iter().any(|e| &e.id == reject) {
                return Err(Error::IndexWrite {
                    message: format!("rejected {reject}"),
                    entries: entries.to_vec(),
                });
            }
        }

        let mut indexes = self.indexes.lock().unwrap();
        let stored = indexes
            .get_mut(index)
            .ok_or_else(|| Error::IndexService {
                status: Some(404),
                payload: format!("index {index} not found"),
            })?;

        let dimension = stored.spec.as_ref().map(|spec| spec.dimension);
        if let Some(bad) = entries
            .iter()
            .find(|e| Some(e.values.len()) != dimension)
        {
            return Err(Error::IndexService {
                status: Some(400),
                payload: format!(
                    "Vector dimension {} does not match the dimension of the index {:?}",
                    bad.values.len(),
                    dimension
                ),
            });
        }

        self.upserts.lock().unwrap().push(entries.to_vec());
        if let Some(events) = &self.events {
            let mut events = events.lock().unwrap();
            for id in entries.iter().map(|e| &e.id).collect::<std::collections::BTreeSet<_>>() {
                events.push(format!("upsert {id}"));
            }
        }

        for entry in entries {
            stored.vectors.insert(entry.vector_id(), entry.clone());
        }
        Ok(entries.len())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        let indexes = self.indexes.lock().unwrap();
        let stored = indexes.get(index).ok_or_else(|| Error::IndexService {
            status: Some(404),
            payload: format!("index {index} not found"),
        })?;

        let mut matches: Vec<QueryMatch> = stored
            .vectors
            .values()
            .map(|entry| {
                QueryMatch::from_vector_id(
                    entry.vector_id(),
                    cosine(vector, &entry.values),
                    include_metadata.then(|| entry.metadata.clone()),
                )
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }
}

pub fn record(id: &str, name: &str) -> RawRecord {
    RawRecord {
        id: id.to_string(),
        name: name.to_string(),
        minutes: "20".to_string(),
        tags: "['dinner']".to_string(),
        steps: "['cook it']".to_string(),
        ingredients: "['salt']".to_string(),
        description: String::new(),
    }
}

pub fn soup() -> RawRecord {
    RawRecord {
        id: "1".to_string(),
        name: "Soup".to_string(),
        minutes: "30".to_string(),
        tags: "'easy','quick'".to_string(),
        steps: "'boil water','add salt'".to_string(),
        ingredients: "'water','salt'".to_string(),
        description: "Simple soup".to_string(),
    }
}

pub fn test_settings() -> Settings {
    Settings {
        openai: OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "fake-embedding".to_string(),
            batch_limit: 2048,
        },
        pinecone: PineconeConfig {
            api_key: Some("pc-test".to_string()),
            environment: "test".to_string(),
            controller_url: "https://controller.test.pinecone.io".to_string(),
            index_host: None,
            index_name: "recipes".to_string(),
            upsert_batch_size: 100,
        },
        upstream: UpstreamConfig {
            timeout_seconds: 5,
            max_retries: 0,
            initial_backoff_ms: 1,
        },
        ingest: IngestConfig {
            source_file: "./data/RAW_recipes.csv".into(),
            record_limit: 1600,
            batch_size: 32,
            concurrency: 32,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_rate_limit: 100,
            max_request_body_size: 65536,
            top_k: 5,
            forward_upstream_errors: false,
        },
    }
}
