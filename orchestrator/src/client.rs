use std::time::Duration;

use async_trait::async_trait;
use common::{
    DispatchError, ErrorResponse, HealthResponse, MapQuery, MapResponse, ReduceQuery,
    ReduceResponse, WorkerStats,
};
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Lo único que el orquestador sabe de los workers: su contrato HTTP.
/// `endpoint` es la URL base del worker, ej: "http://localhost:8081".
#[async_trait]
pub trait WorkerApi: Send + Sync {
    async fn map(&self, endpoint: &str, query: &MapQuery) -> Result<MapResponse, DispatchError>;

    async fn reduce(
        &self,
        endpoint: &str,
        query: &ReduceQuery,
    ) -> Result<ReduceResponse, DispatchError>;

    async fn health(&self, endpoint: &str) -> Result<HealthResponse, DispatchError>;

    async fn stats(&self, endpoint: &str) -> Result<WorkerStats, DispatchError>;
}

/// URL completa con query, para logs y para la Task.
pub fn endpoint_url<Q: Serialize>(base: &str, path: &str, query: &Q) -> String {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    let params = serde_json::to_value(query)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    let pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect();

    match Url::parse_with_params(&raw, &pairs) {
        Ok(url) => url.to_string(),
        Err(_) => raw,
    }
}

/// Cliente HTTP de los workers. Se construye uno por corrida y se pasa
/// explícitamente a las fases; no hay estado global.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    http: Client,
}

impl WorkerClient {
    /// `timeout` es el timeout de transporte de cada llamada.
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Transport(format!("no se pudo crear el cliente HTTP: {e}")))?;
        Ok(Self { http })
    }

    async fn get_json<Q, T>(&self, base: &str, path: &str, query: Option<&Q>) -> Result<T, DispatchError>
    where
        Q: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", base.trim_end_matches('/'), path);
        let mut request = self.http.get(&url);
        if let Some(q) = query {
            request = request.query(q);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(DispatchError::Worker {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| DispatchError::malformed(status.as_u16(), e))
    }
}

#[async_trait]
impl WorkerApi for WorkerClient {
    async fn map(&self, endpoint: &str, query: &MapQuery) -> Result<MapResponse, DispatchError> {
        self.get_json(endpoint, "/map", Some(query)).await
    }

    async fn reduce(
        &self,
        endpoint: &str,
        query: &ReduceQuery,
    ) -> Result<ReduceResponse, DispatchError> {
        self.get_json(endpoint, "/reduce", Some(query)).await
    }

    async fn health(&self, endpoint: &str) -> Result<HealthResponse, DispatchError> {
        self.get_json::<(), _>(endpoint, "/health", None).await
    }

    async fn stats(&self, endpoint: &str) -> Result<WorkerStats, DispatchError> {
        self.get_json::<(), _>(endpoint, "/stats", None).await
    }
}
