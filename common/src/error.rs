use thiserror::Error;

/// Errores del object store (lectura/escritura de blobs).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("objeto no encontrado: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("clave inválida: {0}")]
    InvalidKey(String),

    #[error("error de I/O en {key}: {message}")]
    Io { key: String, message: String },

    #[error("error del backend: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn io(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Io {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Error de una llamada remota (o local) despachada por el TaskDispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No se pudo hablar con el worker (conexión rechazada, timeout, DNS...).
    #[error("error de transporte: {0}")]
    Transport(String),

    /// El worker respondió, pero con status no exitoso o cuerpo inválido.
    #[error("el worker respondió {status}: {message}")]
    Worker { status: u16, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Terminal: se agotaron los intentos.
    #[error("falló tras {attempts} intentos: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },
}

impl DispatchError {
    /// Transport y Worker se reintentan; Store es fatal y ExhaustedRetries ya es terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Worker { .. })
    }

    /// Respuesta 2xx con cuerpo que no se pudo interpretar.
    pub fn malformed(status: u16, err: impl std::fmt::Display) -> Self {
        Self::Worker {
            status,
            message: format!("respuesta mal formada: {err}"),
        }
    }
}
