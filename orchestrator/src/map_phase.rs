//! Fase map: un despacho por chunk, todos a la vez, y una barrera que espera
//! a que cada uno llegue a su resultado terminal. No se cancela nada si un
//! chunk falla: se juntan todos los resultados para el reporte.

use std::sync::Arc;
use std::time::Duration;

use common::{Chunk, ChunkOutcome, FailureSummary, MapQuery, MapResponse, Phase, PhaseResult};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::client::{endpoint_url, WorkerApi};
use crate::dispatcher::TaskDispatcher;

#[derive(Debug, Clone)]
pub struct MapPhaseResult {
    /// Un resultado por chunk, en orden de índice
    pub outcomes: Vec<ChunkOutcome>,
    /// Primer despacho -> última finalización
    pub wall_time: Duration,
    /// Suma de los tiempos individuales
    pub task_time_sum: Duration,
}

impl MapPhaseResult {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    pub fn failed_chunks(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.index)
            .collect()
    }

    /// Resumen del fallo: todos los chunks caídos, pero intentos y último
    /// error sólo del de menor índice. El detalle de cada uno queda en
    /// `outcomes`.
    pub fn failure(&self) -> Option<FailureSummary> {
        let failed: Vec<&ChunkOutcome> = self.outcomes.iter().filter(|o| !o.succeeded).collect();
        let first = failed.first()?;
        Some(FailureSummary {
            phase: Phase::Map,
            chunk_indices: failed.iter().map(|o| o.index).collect(),
            attempts: first.attempts_used,
            last_error: first.error.clone().unwrap_or_default(),
        })
    }
}

pub struct MapPhase {
    api: Arc<dyn WorkerApi>,
    dispatcher: TaskDispatcher,
    bucket: String,
    endpoints: Vec<String>,
}

impl MapPhase {
    pub fn new(
        api: Arc<dyn WorkerApi>,
        dispatcher: TaskDispatcher,
        bucket: impl Into<String>,
        endpoints: Vec<String>,
    ) -> Self {
        Self {
            api,
            dispatcher,
            bucket: bucket.into(),
            endpoints,
        }
    }

    /// Round-robin: con un solo mapper todos los chunks van al mismo.
    pub fn endpoint_for(&self, index: usize) -> Option<&str> {
        if self.endpoints.is_empty() {
            return None;
        }
        Some(self.endpoints[index % self.endpoints.len()].as_str())
    }

    pub async fn run(&self, chunks: &[Chunk]) -> MapPhaseResult {
        info!(
            "map: {} chunks contra {} mapper(s)",
            chunks.len(),
            self.endpoints.len()
        );

        let started = Instant::now();
        let mut handles = Vec::with_capacity(chunks.len());

        // 1) Despachar todos sin esperar a ninguno
        for chunk in chunks {
            let endpoint = self.endpoint_for(chunk.index).unwrap_or_default().to_string();
            let query = MapQuery {
                bucket: self.bucket.clone(),
                key: chunk.input_key.clone(),
                output_key: chunk.output_key.clone(),
            };
            let task = self.dispatcher.task(
                format!("Mapper (chunk {})", chunk.index),
                endpoint_url(&endpoint, "/map", &query),
            );

            let api = self.api.clone();
            let dispatcher = self.dispatcher.clone();
            let call_endpoint = endpoint.clone();

            let handle = tokio::spawn(async move {
                dispatcher
                    .dispatch(task, move || {
                        let api = api.clone();
                        let endpoint = call_endpoint.clone();
                        let query = query.clone();
                        async move { api.map(&endpoint, &query).await }
                    })
                    .await
            });
            handles.push((chunk.index, endpoint, handle));
        }

        // 2) Barrera: esperar a todos, falle quien falle
        let mut outcomes = Vec::with_capacity(handles.len());
        let mut task_time_sum = Duration::ZERO;

        for (index, endpoint, handle) in handles {
            let outcome = match handle.await {
                Ok(result) => outcome_from(index, endpoint, result),
                Err(e) => {
                    warn!("la tarea del chunk {} terminó con panic: {}", index, e);
                    ChunkOutcome {
                        index,
                        endpoint,
                        succeeded: false,
                        attempts_used: 0,
                        duration: Duration::ZERO,
                        unique_words: None,
                        total_words: None,
                        error: Some(format!("tarea abortada: {e}")),
                    }
                }
            };
            task_time_sum += outcome.duration;
            outcomes.push(outcome);
        }

        let wall_time = started.elapsed();
        let result = MapPhaseResult {
            outcomes,
            wall_time,
            task_time_sum,
        };

        if result.succeeded() {
            info!(
                "map completo: wall {:.3}s, suma de tareas {:.3}s",
                wall_time.as_secs_f64(),
                task_time_sum.as_secs_f64()
            );
        } else {
            warn!(
                "⚠️  {} chunk(s) fallaron: {:?}",
                result.failed_chunks().len(),
                result.failed_chunks()
            );
        }

        result
    }
}

fn outcome_from(index: usize, endpoint: String, result: PhaseResult<MapResponse>) -> ChunkOutcome {
    let (unique_words, total_words) = match &result.response_payload {
        Some(resp) => (Some(resp.unique_words), Some(resp.total_words)),
        None => (None, None),
    };
    ChunkOutcome {
        index,
        endpoint,
        succeeded: result.succeeded,
        attempts_used: result.attempts_used,
        duration: result.duration,
        unique_words,
        total_words,
        error: result.error,
    }
}
