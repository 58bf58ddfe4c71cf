use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DispatchError;

/// Resultado de un intento individual, para el reporte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub duration: Duration,
    /// None si el intento fue exitoso
    pub error: Option<String>,
}

/// Resultado terminal de una tarea despachada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult<T> {
    pub succeeded: bool,
    /// Desde el primer intento hasta el resultado terminal (incluye esperas)
    pub duration: Duration,
    pub attempts_used: u32,
    pub error: Option<String>,
    pub response_payload: Option<T>,
    pub attempts: Vec<AttemptRecord>,
    /// Error tipado del resultado terminal (no viaja en el JSON del reporte)
    #[serde(skip)]
    pub cause: Option<DispatchError>,
}

impl<T> PhaseResult<T> {
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}
