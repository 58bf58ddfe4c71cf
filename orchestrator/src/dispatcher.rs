//! Primitiva de reintentos compartida por todas las fases.
//!
//! Ejecuta una llamada (un closure sin argumentos), y si falla con un error
//! reintentable espera según la `RetryPolicy` y vuelve a intentar, hasta
//! `max_attempts` intentos en total. Los errores del store son fatales: se
//! corta en el intento en curso.

use std::future::Future;

use common::{AttemptRecord, DispatchError, PhaseResult, Task};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    policy: RetryPolicy,
}

impl TaskDispatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Arma una Task con el presupuesto de la política.
    pub fn task(&self, description: impl Into<String>, endpoint: impl Into<String>) -> Task {
        Task::new(description, endpoint, self.policy.max_attempts, self.policy.delay)
    }

    /// Ejecuta `call` con reintentos hasta un resultado terminal.
    pub async fn dispatch<T, F, Fut>(&self, mut task: Task, mut call: F) -> PhaseResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DispatchError>>,
    {
        let started = Instant::now();
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut last_error: Option<DispatchError> = None;

        while task.has_attempts_left() {
            task.attempt += 1;
            let attempt_started = Instant::now();

            match call().await {
                Ok(payload) => {
                    let elapsed = attempt_started.elapsed();
                    info!(
                        "✅ {} ok en {:.3}s (intento {}/{})",
                        task.description,
                        elapsed.as_secs_f64(),
                        task.attempt,
                        task.max_attempts
                    );
                    attempts.push(AttemptRecord {
                        attempt: task.attempt,
                        duration: elapsed,
                        error: None,
                    });
                    return PhaseResult {
                        succeeded: true,
                        duration: started.elapsed(),
                        attempts_used: task.attempt,
                        error: None,
                        response_payload: Some(payload),
                        attempts,
                        cause: None,
                    };
                }
                Err(err) => {
                    let elapsed = attempt_started.elapsed();
                    warn!(
                        "❌ {} falló en {:.3}s (intento {}/{}): {}",
                        task.description,
                        elapsed.as_secs_f64(),
                        task.attempt,
                        task.max_attempts,
                        err
                    );
                    attempts.push(AttemptRecord {
                        attempt: task.attempt,
                        duration: elapsed,
                        error: Some(err.to_string()),
                    });

                    let retryable = err.is_retryable();
                    last_error = Some(err);

                    if !retryable {
                        warn!("{}: error no reintentable, se corta", task.description);
                        break;
                    }

                    if task.has_attempts_left() {
                        let wait = self.policy.delay_after(task.attempt);
                        info!("🔄 reintentando {} en {:?}...", task.description, wait);
                        sleep(wait).await;
                    }
                }
            }
        }

        let cause = match last_error {
            Some(err) if err.is_retryable() => DispatchError::ExhaustedRetries {
                attempts: task.attempt,
                last_error: err.to_string(),
            },
            Some(err) => err,
            None => DispatchError::ExhaustedRetries {
                attempts: 0,
                last_error: "max_attempts = 0, no se hizo ningún intento".to_string(),
            },
        };

        warn!("💀 {} FALLÓ definitivamente: {}", task.description, cause);

        PhaseResult {
            succeeded: false,
            duration: started.elapsed(),
            attempts_used: task.attempt,
            error: Some(cause.to_string()),
            response_payload: None,
            attempts,
            cause: Some(cause),
        }
    }
}
