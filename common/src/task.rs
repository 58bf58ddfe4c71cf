use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type TaskId = String;

/// Una llamada remota reintentable (un chunk del map, el reduce o el split).
/// Vive sólo mientras dura la llamada y sus reintentos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Descripción para logs y reporte, ej: "Mapper (chunk 3)"
    pub description: String,
    /// Intentos ya hechos (0 antes de arrancar). Sólo lo modifica el dispatcher.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Espera entre intentos consecutivos
    pub delay: Duration,
    /// URL con parámetros, ej: "http://mapper:8080/map?bucket=b&key=..."
    pub endpoint: String,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        endpoint: impl Into<String>,
        max_attempts: u32,
        delay: Duration,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            attempt: 0,
            max_attempts,
            delay,
            endpoint: endpoint.into(),
        }
    }

    /// ¿Queda presupuesto para otro intento?
    pub fn has_attempts_left(&self) -> bool {
        self.attempt < self.max_attempts
    }
}
