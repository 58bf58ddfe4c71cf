use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub type RunId = String;

/// Fases secuenciales del pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Split,
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Split => "Split",
            Phase::Map => "Map",
            Phase::Reduce => "Reduce",
        };
        f.write_str(name)
    }
}

/// Estado de una corrida:
/// Idle -> Splitting -> Mapping -> Reducing -> Complete,
/// y Failed (absorbente) desde cualquiera de los tres estados de trabajo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Idle,
    Splitting,
    Mapping,
    Reducing,
    Complete,
    Failed { phase: Phase },
}

impl PipelineState {
    /// Fase en curso, si el estado es de trabajo.
    pub fn working_phase(&self) -> Option<Phase> {
        match self {
            PipelineState::Splitting => Some(Phase::Split),
            PipelineState::Mapping => Some(Phase::Map),
            PipelineState::Reducing => Some(Phase::Reduce),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed { .. })
    }

    /// Transiciones válidas. Sólo se avanza de a una fase y sólo se falla
    /// en la fase que está corriendo.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Splitting) => true,
            (Splitting, Mapping) => true,
            (Mapping, Reducing) => true,
            (Reducing, Complete) => true,
            (current, Failed { phase }) => current.working_phase() == Some(*phase),
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("IDLE"),
            PipelineState::Splitting => f.write_str("SPLITTING"),
            PipelineState::Mapping => f.write_str("MAPPING"),
            PipelineState::Reducing => f.write_str("REDUCING"),
            PipelineState::Complete => f.write_str("COMPLETE"),
            PipelineState::Failed { phase } => write!(f, "FAILED ({phase})"),
        }
    }
}

/// Resultado de un chunk del map, exitoso o no.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkOutcome {
    pub index: usize,
    pub endpoint: String,
    pub succeeded: bool,
    pub attempts_used: u32,
    /// Tiempo total de la tarea (incluye reintentos)
    pub duration: Duration,
    pub unique_words: Option<u64>,
    pub total_words: Option<u64>,
    pub error: Option<String>,
}

/// Qué causó que la corrida terminara en Failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    pub phase: Phase,
    /// Chunks que agotaron reintentos (vacío fuera del map)
    pub chunk_indices: Vec<usize>,
    pub attempts: u32,
    pub last_error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub bucket: String,
    pub input_key: String,
    pub chunk_count: usize,
    pub mapper_count: usize,
    pub state: PipelineState,

    /// -------- Tiempos --------
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub split_time: Option<Duration>,
    /// Wall clock del map: primer despacho -> última finalización
    pub map_time: Option<Duration>,
    /// Suma de los tiempos individuales de cada chunk
    pub map_task_time_sum: Option<Duration>,
    pub reduce_time: Option<Duration>,
    pub total_time: Duration,

    pub chunks: Vec<ChunkOutcome>,

    /// -------- Resultado final --------
    pub unique_words: Option<u64>,
    pub output: Option<String>,
    pub failure: Option<FailureSummary>,
}

impl PipelineReport {
    /// `chunk_count` arranca en 0: lo fija el split.
    pub fn new(bucket: &str, input_key: &str, mapper_count: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            bucket: bucket.to_string(),
            input_key: input_key.to_string(),
            chunk_count: 0,
            mapper_count,
            state: PipelineState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            split_time: None,
            map_time: None,
            map_task_time_sum: None,
            reduce_time: None,
            total_time: Duration::ZERO,
            chunks: Vec::new(),
            unique_words: None,
            output: None,
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Complete
    }
}

/// Una fila de la tabla de escalamiento.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleRow {
    pub chunk_count: usize,
    pub mapper_count: usize,
    pub split_time: Duration,
    pub map_time: Duration,
    pub reduce_time: Duration,
    pub total_time: Duration,
    pub unique_words: Option<u64>,
}

impl ScaleRow {
    /// Sólo las corridas completas entran a la tabla.
    pub fn from_report(report: &PipelineReport) -> Option<Self> {
        if !report.succeeded() {
            return None;
        }
        Some(Self {
            chunk_count: report.chunk_count,
            mapper_count: report.mapper_count,
            split_time: report.split_time.unwrap_or_default(),
            map_time: report.map_time.unwrap_or_default(),
            reduce_time: report.reduce_time.unwrap_or_default(),
            total_time: report.total_time,
            unique_words: report.unique_words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_transitions_are_allowed() {
        use PipelineState::*;
        assert!(Idle.can_transition_to(&Splitting));
        assert!(Splitting.can_transition_to(&Mapping));
        assert!(Mapping.can_transition_to(&Reducing));
        assert!(Reducing.can_transition_to(&Complete));
    }

    #[test]
    fn phases_cannot_be_skipped_or_repeated() {
        use PipelineState::*;
        assert!(!Idle.can_transition_to(&Mapping));
        assert!(!Splitting.can_transition_to(&Reducing));
        assert!(!Mapping.can_transition_to(&Mapping));
        assert!(!Complete.can_transition_to(&Idle));
    }

    #[test]
    fn failed_is_absorbing_and_only_from_current_phase() {
        use PipelineState::*;
        assert!(Mapping.can_transition_to(&Failed { phase: Phase::Map }));
        assert!(!Mapping.can_transition_to(&Failed { phase: Phase::Reduce }));
        assert!(!Idle.can_transition_to(&Failed { phase: Phase::Split }));
        assert!(!Complete.can_transition_to(&Failed { phase: Phase::Reduce }));

        let failed = Failed { phase: Phase::Split };
        assert!(failed.is_terminal());
        for next in [Idle, Splitting, Mapping, Reducing, Complete] {
            assert!(!failed.can_transition_to(&next));
        }
    }

    #[test]
    fn state_serializes_like_job_status() {
        let json = serde_json::to_string(&PipelineState::Complete).unwrap();
        assert_eq!(json, "\"COMPLETE\"");
    }

    #[test]
    fn scale_row_skips_failed_reports() {
        let mut report = PipelineReport::new("b", "in.txt", 1);
        assert_eq!(report.chunk_count, 0);
        report.chunk_count = 3;
        report.state = PipelineState::Failed { phase: Phase::Map };
        assert!(ScaleRow::from_report(&report).is_none());

        report.state = PipelineState::Complete;
        report.map_time = Some(Duration::from_millis(1500));
        let row = ScaleRow::from_report(&report).unwrap();
        assert_eq!(row.chunk_count, 3);
        assert_eq!(row.map_time, Duration::from_millis(1500));
    }
}
