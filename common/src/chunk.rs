use serde::{Deserialize, Serialize};

/// Prefijo de los chunks que escribe el splitter.
pub const CHUNK_PREFIX: &str = "chunks";
/// Prefijo de las salidas de mappers y reducer.
pub const RESULTS_PREFIX: &str = "results";
/// Clave fija donde el reducer deja el conteo final.
pub const FINAL_OUTPUT_KEY: &str = "results/final_counts.json";

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Una partición contigua del input, con índice estable dentro de la corrida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    /// Clave del chunk en el store, ej: "chunks/chunk_0.txt"
    pub input_key: String,
    /// Clave donde el mapper debe dejar su conteo, ej: "results/mapper_0.json"
    pub output_key: String,
}

impl Chunk {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            input_key: chunk_key(index),
            output_key: mapper_output_key(index),
        }
    }
}

pub fn chunk_key(index: usize) -> String {
    format!("{CHUNK_PREFIX}/chunk_{index}.txt")
}

pub fn mapper_output_key(index: usize) -> String {
    format!("{RESULTS_PREFIX}/mapper_{index}.json")
}

/// Ubicación legible de un objeto, ej: "s3://bucket/results/final_counts.json"
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}
