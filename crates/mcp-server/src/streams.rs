use crate::envelope::ScoredResult;
use crate::util::random_id;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StreamEntry {
    items: Arc<Vec<ScoredResult>>,
    chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub index: usize,
    pub chunk_count: usize,
    pub items: Vec<ScoredResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("unknown or expired streamId '{0}'")]
    UnknownStream(String),

    #[error("chunkIndex {index} is out of range for stream '{stream_id}' ({chunk_count} chunk(s))")]
    ChunkOutOfRange {
        stream_id: String,
        index: usize,
        chunk_count: usize,
    },
}

/// Streamed result sets, least recently used evicted first.
#[derive(Debug)]
pub struct StreamCache {
    entries: Mutex<LruCache<String, StreamEntry>>,
}

impl StreamCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn insert(&self, items: Vec<ScoredResult>, chunk_size: usize) -> String {
        let stream_id = random_id("stream");
        let entry = StreamEntry {
            items: Arc::new(items),
            chunk_size: chunk_size.max(1),
        };
        if let Some((evicted, _)) = self.lock().push(stream_id.clone(), entry) {
            log::debug!("stream cache evicted {evicted}");
        }
        stream_id
    }

    pub fn chunk(&self, stream_id: &str, index: usize) -> Result<StreamChunk, StreamError> {
        let entry = self
            .lock()
            .get(stream_id)
            .cloned()
            .ok_or_else(|| StreamError::UnknownStream(stream_id.to_string()))?;

        let chunk_count = entry.items.len().div_ceil(entry.chunk_size);
        let start = index.saturating_mul(entry.chunk_size);
        if index >= chunk_count {
            return Err(StreamError::ChunkOutOfRange {
                stream_id: stream_id.to_string(),
                index,
                chunk_count,
            });
        }
        let end = start.saturating_add(entry.chunk_size).min(entry.items.len());
        Ok(StreamChunk {
            index,
            chunk_count,
            items: entry.items[start..end].to_vec(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, StreamEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
