//! Parte el input en N chunks contiguos sin cortar palabras y los escribe
//! de vuelta en el store bajo `chunks/chunk_{i}.txt`.

use std::sync::Arc;

use common::{Chunk, ChunkStore, StoreError, TEXT_CONTENT_TYPE};
use tracing::{debug, info};

/// Estrategia para decidir cuántos chunks generar.
pub trait ChunkSizing: Send + Sync {
    fn chunk_count(&self, input_len: usize) -> usize;

    fn describe(&self) -> String;
}

/// N fijo, lo pasa quien llama.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCount(pub usize);

impl ChunkSizing for FixedCount {
    fn chunk_count(&self, _input_len: usize) -> usize {
        self.0.max(1)
    }

    fn describe(&self) -> String {
        format!("{} chunks fijos", self.0)
    }
}

/// Un chunk cada `bytes` bytes de input (al menos uno).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBytes(pub usize);

impl ChunkSizing for TargetBytes {
    fn chunk_count(&self, input_len: usize) -> usize {
        let target = self.0.max(1);
        input_len.div_ceil(target).max(1)
    }

    fn describe(&self) -> String {
        format!("~{} bytes por chunk", self.0)
    }
}

/// Posiciones (en bytes) donde empieza cada palabra, con el mismo criterio
/// que el mapper (`from_utf8_lossy` + `split_whitespace`): espacios Unicode
/// separan, y los bytes UTF-8 inválidos cuentan como parte de una palabra.
fn word_starts(input: &[u8]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_ws = true;
    let mut offset = 0;
    for chunk in input.utf8_chunks() {
        for (i, c) in chunk.valid().char_indices() {
            let ws = c.is_whitespace();
            if !ws && prev_ws {
                starts.push(offset + i);
            }
            prev_ws = ws;
        }
        offset += chunk.valid().len();

        if !chunk.invalid().is_empty() {
            if prev_ws {
                starts.push(offset);
            }
            prev_ws = false;
            offset += chunk.invalid().len();
        }
    }
    starts
}

/// Parte `input` en `n` rangos contiguos. El chunk `i` arranca en la palabra
/// `i*W/n`, así que ninguna palabra queda partida y concatenar los chunks en
/// orden reproduce el input exacto. Si `n > W` algunos chunks quedan vacíos.
pub fn partition(input: &[u8], n: usize) -> Vec<&[u8]> {
    let n = n.max(1);
    let starts = word_starts(input);
    let words = starts.len();

    let boundary = |i: usize| -> usize {
        if i == 0 {
            return 0;
        }
        if i >= n {
            return input.len();
        }
        let word = i * words / n;
        starts.get(word).copied().unwrap_or(input.len())
    };

    (0..n).map(|i| &input[boundary(i)..boundary(i + 1)]).collect()
}

pub struct Splitter {
    store: Arc<dyn ChunkStore>,
    bucket: String,
}

impl Splitter {
    pub fn new(store: Arc<dyn ChunkStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Lee `input_key`, lo parte y escribe cada chunk. Cualquier error del
    /// store corta el split en el acto.
    pub async fn split(
        &self,
        input_key: &str,
        sizing: &dyn ChunkSizing,
    ) -> Result<Vec<Chunk>, StoreError> {
        let input = self.store.get(&self.bucket, input_key).await?;
        let n = sizing.chunk_count(input.len());

        info!(
            "partiendo {}/{} ({} bytes) en {} chunks ({})",
            self.bucket,
            input_key,
            input.len(),
            n,
            sizing.describe()
        );

        let mut chunks = Vec::with_capacity(n);
        for (index, part) in partition(&input, n).into_iter().enumerate() {
            let chunk = Chunk::new(index);
            debug!("escribiendo {} ({} bytes)", chunk.input_key, part.len());
            self.store
                .put(&self.bucket, &chunk.input_key, part.to_vec(), TEXT_CONTENT_TYPE)
                .await?;
            chunks.push(chunk);
        }

        Ok(chunks)
    }
}
