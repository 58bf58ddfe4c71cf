use std::sync::Arc;

use common::{PhaseResult, ReduceQuery, ReduceResponse};
use tracing::info;

use crate::client::{endpoint_url, WorkerApi};
use crate::dispatcher::TaskDispatcher;

/// Fase reduce: una sola llamada con todas las claves de los mappers.
pub struct ReducePhase {
    api: Arc<dyn WorkerApi>,
    dispatcher: TaskDispatcher,
    bucket: String,
    endpoint: String,
}

impl ReducePhase {
    pub fn new(
        api: Arc<dyn WorkerApi>,
        dispatcher: TaskDispatcher,
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api,
            dispatcher,
            bucket: bucket.into(),
            endpoint: endpoint.into(),
        }
    }

    pub async fn run(&self, output_keys: &[String]) -> PhaseResult<ReduceResponse> {
        let query = ReduceQuery::new(&self.bucket, output_keys);
        info!("reduce: {} parciales contra {}", output_keys.len(), self.endpoint);

        let task = self
            .dispatcher
            .task("Reducer", endpoint_url(&self.endpoint, "/reduce", &query));

        self.dispatcher
            .dispatch(task, || async {
                self.api.reduce(&self.endpoint, &query).await
            })
            .await
    }
}
