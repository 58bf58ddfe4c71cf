use serde::{Deserialize, Serialize};

/* --------- Contrato HTTP de los workers (mapper / reducer) --------- */

/// Query de `GET /map`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapQuery {
    pub bucket: String,
    pub key: String,
    pub output_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapResponse {
    pub message: String,
    /// Ubicación del conteo parcial, ej: "s3://bucket/results/mapper_0.json"
    pub output: String,
    pub unique_words: u64,
    pub total_words: u64,
}

/// Query de `GET /reduce`. `keys` viene separado por comas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceQuery {
    pub bucket: String,
    pub keys: String,
}

impl ReduceQuery {
    pub fn new(bucket: &str, keys: &[String]) -> Self {
        Self {
            bucket: bucket.to_string(),
            keys: keys.join(","),
        }
    }

    /// Claves individuales, sin espacios y sin entradas vacías.
    pub fn key_list(&self) -> Vec<String> {
        self.keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceResponse {
    pub message: String,
    pub output: String,
    pub unique_words: u64,
    pub mappers_processed: u64,
}

/// Cuerpo de cualquier respuesta no exitosa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Métricas de un worker (`GET /stats`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub role: WorkerRole,
    pub hostname: String,
    pub requests: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Rol de un proceso worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerRole {
    Mapper,
    Reducer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_query_joins_and_splits_keys() {
        let keys = vec![
            "results/mapper_0.json".to_string(),
            "results/mapper_1.json".to_string(),
        ];
        let q = ReduceQuery::new("b", &keys);

        assert_eq!(q.keys, "results/mapper_0.json,results/mapper_1.json");
        assert_eq!(q.key_list(), keys);
    }

    #[test]
    fn reduce_query_key_list_trims_and_skips_empty() {
        let q = ReduceQuery {
            bucket: "b".into(),
            keys: " a.json , ,b.json,".into(),
        };
        assert_eq!(q.key_list(), vec!["a.json".to_string(), "b.json".to_string()]);
    }

    #[test]
    fn map_response_matches_wire_shape() {
        let body = r#"{"message":"map complete","output":"s3://b/results/mapper_0.json","unique_words":10,"total_words":25}"#;
        let resp: MapResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.unique_words, 10);
        assert_eq!(resp.total_words, 25);
    }
}
