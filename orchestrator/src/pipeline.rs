//! Corre una pasada completa split -> map -> reduce y arma el reporte.
//!
//! El estado avanza de a una fase:
//! Idle -> Splitting -> Mapping -> Reducing -> Complete, y cualquier fase de
//! trabajo que falle salta a Failed (absorbente). Si el map falla el reduce
//! no se llama nunca.

use std::sync::Arc;

use chrono::Utc;
use common::{
    object_url, ChunkStore, DispatchError, FailureSummary, Phase, PipelineReport, PipelineState,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::client::WorkerApi;
use crate::config::OrchestratorConfig;
use crate::dispatcher::TaskDispatcher;
use crate::map_phase::MapPhase;
use crate::reduce_phase::ReducePhase;
use crate::splitter::{ChunkSizing, Splitter};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("transición inválida: {from} -> {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
}

pub struct PipelineRunner {
    store: Arc<dyn ChunkStore>,
    api: Arc<dyn WorkerApi>,
    dispatcher: TaskDispatcher,
    bucket: String,
    input_key: String,
    mapper_urls: Vec<String>,
    reducer_url: String,
    state: PipelineState,
}

impl PipelineRunner {
    pub fn new(
        config: &OrchestratorConfig,
        store: Arc<dyn ChunkStore>,
        api: Arc<dyn WorkerApi>,
    ) -> Self {
        Self {
            store,
            api,
            dispatcher: TaskDispatcher::new(config.retry),
            bucket: config.bucket.clone(),
            input_key: config.input_key.clone(),
            mapper_urls: config.mapper_urls.clone(),
            reducer_url: config.reducer_url.clone(),
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(&next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!("estado: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Una corrida por runner: volver a llamar `run` sobre un runner ya
    /// terminado da `InvalidTransition`.
    pub async fn run(&mut self, sizing: &dyn ChunkSizing) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let mut report = PipelineReport::new(&self.bucket, &self.input_key, self.mapper_urls.len());

        // ---------- Split ----------
        self.transition(PipelineState::Splitting)?;
        let splitter = Splitter::new(self.store.clone(), self.bucket.clone());
        let task = self
            .dispatcher
            .task("Split", object_url(&self.bucket, &self.input_key));
        let input_key = self.input_key.as_str();
        let split = self
            .dispatcher
            .dispatch(task, || async {
                splitter
                    .split(input_key, sizing)
                    .await
                    .map_err(DispatchError::from)
            })
            .await;
        report.split_time = Some(split.duration);

        let chunks = match split.response_payload {
            Some(chunks) if split.succeeded => chunks,
            _ => {
                let failure = FailureSummary {
                    phase: Phase::Split,
                    chunk_indices: Vec::new(),
                    attempts: split.attempts_used,
                    last_error: split.error.unwrap_or_default(),
                };
                return self.fail(report, failure, started);
            }
        };
        report.chunk_count = chunks.len();

        // ---------- Map ----------
        self.transition(PipelineState::Mapping)?;
        let map = MapPhase::new(
            self.api.clone(),
            self.dispatcher.clone(),
            self.bucket.clone(),
            self.mapper_urls.clone(),
        )
        .run(&chunks)
        .await;
        report.map_time = Some(map.wall_time);
        report.map_task_time_sum = Some(map.task_time_sum);
        let map_failure = map.failure();
        report.chunks = map.outcomes;

        if let Some(failure) = map_failure {
            return self.fail(report, failure, started);
        }

        // ---------- Reduce ----------
        self.transition(PipelineState::Reducing)?;
        let keys: Vec<String> = chunks.iter().map(|c| c.output_key.clone()).collect();
        let reduce = ReducePhase::new(
            self.api.clone(),
            self.dispatcher.clone(),
            self.bucket.clone(),
            self.reducer_url.clone(),
        )
        .run(&keys)
        .await;
        report.reduce_time = Some(reduce.duration);

        match reduce.response_payload {
            Some(resp) if reduce.succeeded => {
                report.unique_words = Some(resp.unique_words);
                report.output = Some(resp.output);
            }
            _ => {
                let failure = FailureSummary {
                    phase: Phase::Reduce,
                    chunk_indices: Vec::new(),
                    attempts: reduce.attempts_used,
                    last_error: reduce.error.unwrap_or_default(),
                };
                return self.fail(report, failure, started);
            }
        }

        self.transition(PipelineState::Complete)?;
        Ok(self.finish(report, started))
    }

    fn fail(
        &mut self,
        report: PipelineReport,
        failure: FailureSummary,
        started: Instant,
    ) -> Result<PipelineReport, PipelineError> {
        self.transition(PipelineState::Failed {
            phase: failure.phase,
        })?;
        warn!(
            "💀 pipeline detenido en {}: chunks {:?}, {} intento(s), último error: {}",
            failure.phase, failure.chunk_indices, failure.attempts, failure.last_error
        );
        let mut report = self.finish(report, started);
        report.failure = Some(failure);
        Ok(report)
    }

    fn finish(&self, mut report: PipelineReport, started: Instant) -> PipelineReport {
        report.state = self.state;
        report.total_time = started.elapsed();
        report.finished_at = self.state.is_terminal().then(Utc::now);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::splitter::FixedCount;
    use async_trait::async_trait;
    use common::{
        HealthResponse, MapQuery, MapResponse, MemoryStore, ReduceQuery, ReduceResponse,
        WorkerStats,
    };
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeWorkers {
        mapper_down: bool,
        reducer_down: bool,
        map_calls: Mutex<Vec<String>>,
        reduce_calls: Mutex<Vec<ReduceQuery>>,
    }

    #[async_trait]
    impl WorkerApi for FakeWorkers {
        async fn map(&self, _endpoint: &str, query: &MapQuery) -> Result<MapResponse, DispatchError> {
            self.map_calls.lock().unwrap().push(query.key.clone());
            if self.mapper_down {
                return Err(DispatchError::Transport("connection refused".into()));
            }
            Ok(MapResponse {
                message: "map complete".into(),
                output: format!("s3://{}/{}", query.bucket, query.output_key),
                unique_words: 2,
                total_words: 2,
            })
        }

        async fn reduce(
            &self,
            _endpoint: &str,
            query: &ReduceQuery,
        ) -> Result<ReduceResponse, DispatchError> {
            self.reduce_calls.lock().unwrap().push(query.clone());
            if self.reducer_down {
                return Err(DispatchError::Worker {
                    status: 503,
                    message: "reducer caído".into(),
                });
            }
            Ok(ReduceResponse {
                message: "reduce complete".into(),
                output: format!("s3://{}/results/final_counts.json", query.bucket),
                unique_words: 5,
                mappers_processed: query.key_list().len() as u64,
            })
        }

        async fn health(&self, _endpoint: &str) -> Result<HealthResponse, DispatchError> {
            Ok(HealthResponse::healthy())
        }

        async fn stats(&self, _endpoint: &str) -> Result<WorkerStats, DispatchError> {
            Err(DispatchError::Transport("sin stats".into()))
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            bucket: "b".into(),
            input_key: "input.txt".into(),
            mapper_urls: vec!["http://m1".into(), "http://m2".into()],
            reducer_url: "http://r".into(),
            retry: RetryPolicy::fixed(3, Duration::from_secs(2)),
            ..OrchestratorConfig::default()
        }
    }

    async fn store_with_input() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put("b", "input.txt", b"uno dos tres cuatro cinco seis".to_vec(), "text/plain")
            .await
            .unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn complete_run_fills_the_report() {
        let store = store_with_input().await;
        let fake = Arc::new(FakeWorkers::default());
        let mut runner = PipelineRunner::new(&config(), Arc::new(store.clone()), fake.clone());

        let report = runner.run(&FixedCount(3)).await.unwrap();

        assert_eq!(runner.state(), PipelineState::Complete);
        assert!(report.succeeded());
        assert_eq!(report.chunk_count, 3);
        assert_eq!(report.mapper_count, 2);
        assert_eq!(report.chunks.len(), 3);
        assert_eq!(report.unique_words, Some(5));
        assert_eq!(report.output.as_deref(), Some("s3://b/results/final_counts.json"));
        assert!(report.failure.is_none());
        assert!(report.finished_at.is_some());

        // los chunks quedaron en el store
        assert!(store.object("b", "chunks/chunk_2.txt").is_some());

        // el reduce recibió las salidas de los mappers en orden de chunk
        let reduces = fake.reduce_calls.lock().unwrap();
        assert_eq!(reduces.len(), 1);
        assert_eq!(
            reduces[0].key_list(),
            vec!["results/mapper_0.json", "results/mapper_1.json", "results/mapper_2.json"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dead_mapper_fails_at_map_and_never_reduces() {
        let store = store_with_input().await;
        let fake = Arc::new(FakeWorkers {
            mapper_down: true,
            ..FakeWorkers::default()
        });
        let mut runner = PipelineRunner::new(&config(), Arc::new(store), fake.clone());

        let report = runner.run(&FixedCount(2)).await.unwrap();

        assert_eq!(report.state, PipelineState::Failed { phase: Phase::Map });
        assert_eq!(runner.state(), report.state);
        assert!(fake.reduce_calls.lock().unwrap().is_empty());
        assert_eq!(fake.map_calls.lock().unwrap().len(), 6);

        let failure = report.failure.unwrap();
        assert_eq!(failure.phase, Phase::Map);
        assert_eq!(failure.chunk_indices, vec![0, 1]);
        assert_eq!(failure.attempts, 3);
        assert!(failure.last_error.contains("connection refused"));

        // 3 intentos separados por 2s
        assert_eq!(report.map_time, Some(Duration::from_secs(4)));
        assert_eq!(report.total_time, Duration::from_secs(4));
        assert!(report.reduce_time.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_input_fails_split_without_retry() {
        let fake = Arc::new(FakeWorkers::default());
        let mut runner = PipelineRunner::new(&config(), Arc::new(MemoryStore::new()), fake.clone());

        let report = runner.run(&FixedCount(3)).await.unwrap();

        assert_eq!(report.state, PipelineState::Failed { phase: Phase::Split });
        let failure = report.failure.unwrap();
        assert_eq!(failure.attempts, 1);
        assert!(failure.last_error.contains("input.txt"));
        assert_eq!(report.split_time, Some(Duration::ZERO));
        assert!(report.map_time.is_none());
        // sin split no hay chunks
        assert_eq!(report.chunk_count, 0);
        assert!(report.chunks.is_empty());
        assert!(report.finished_at.is_some());
        assert!(fake.map_calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dead_reducer_fails_at_reduce() {
        let store = store_with_input().await;
        let fake = Arc::new(FakeWorkers {
            reducer_down: true,
            ..FakeWorkers::default()
        });
        let mut runner = PipelineRunner::new(&config(), Arc::new(store), fake.clone());

        let report = runner.run(&FixedCount(2)).await.unwrap();

        assert_eq!(report.state, PipelineState::Failed { phase: Phase::Reduce });
        assert!(report.unique_words.is_none());
        let failure = report.failure.unwrap();
        assert!(failure.chunk_indices.is_empty());
        assert_eq!(failure.attempts, 3);
        assert!(failure.last_error.contains("reducer caído"));
        assert_eq!(fake.reduce_calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_runner_rejects_a_second_run() {
        let store = store_with_input().await;
        let mut runner = PipelineRunner::new(
            &config(),
            Arc::new(store),
            Arc::new(FakeWorkers::default()),
        );
        runner.run(&FixedCount(1)).await.unwrap();

        let err = runner.run(&FixedCount(1)).await.unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidTransition {
                from: PipelineState::Complete,
                to: PipelineState::Splitting,
            }
        );
    }
}
